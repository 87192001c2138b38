//! Accounting entities and shared request/response types.
//!
//! Field names follow the API's PascalCase wire format. Optional fields are
//! omitted from outgoing JSON when unset, so a partially filled entity can be
//! sent as a sparse update.

use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::query::MAX_RESULTS_LIMIT;

// ─────────────────────────────────────────────────────────────────────────────
// Entity trait
// ─────────────────────────────────────────────────────────────────────────────

/// A queryable, writable accounting entity.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Entity name in queries and response envelopes.
    const NAME: &'static str;
    /// Field matched by [`ListParams::search`].
    const SEARCH_FIELD: &'static str;
    /// Default ordering for list queries.
    const ORDER_BY: &'static str;
    /// Whether the entity carries an `Active` flag.
    const HAS_ACTIVE: bool;

    fn id(&self) -> Option<&str>;
    fn sync_token(&self) -> Option<&str>;

    /// Resource path segment (`customer`, `invoice`, ...).
    fn path() -> String {
        Self::NAME.to_ascii_lowercase()
    }
}

macro_rules! entity {
    ($ty:ty, $name:literal, search = $search:literal, order = $order:literal, active = $active:literal) => {
        impl Entity for $ty {
            const NAME: &'static str = $name;
            const SEARCH_FIELD: &'static str = $search;
            const ORDER_BY: &'static str = $order;
            const HAS_ACTIVE: bool = $active;

            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }

            fn sync_token(&self) -> Option<&str> {
                self.sync_token.as_deref()
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Common types
// ─────────────────────────────────────────────────────────────────────────────

/// Reference to another entity by id, with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    #[serde(rename = "value")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Ref {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    /// A reference known only by name; the id is resolved before sending.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::named(String::new(), name)
    }

    pub fn is_resolved(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Creation and last-update timestamps, as sent by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetaData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailAddress {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhoneNumber {
    pub free_form_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhysicalAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_sub_division_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Customer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Customer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_email_addr: Option<EmailAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_phone: Option<PhoneNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_addr: Option<PhysicalAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Open balance; read-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
}

impl Customer {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, address: impl Into<String>) -> Self {
        self.primary_email_addr = Some(EmailAddress {
            address: address.into(),
        });
        self
    }
}

entity!(Customer, "Customer", search = "DisplayName", order = "DisplayName", active = true);

// ─────────────────────────────────────────────────────────────────────────────
// Item
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    Service,
    Inventory,
    NonInventory,
    Group,
    Category,
}

impl FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match normalize(s).as_str() {
            "service" => Ok(ItemType::Service),
            "inventory" => Ok(ItemType::Inventory),
            "noninventory" => Ok(ItemType::NonInventory),
            "group" => Ok(ItemType::Group),
            "category" => Ok(ItemType::Category),
            _ => Err(Error::InvalidRequest(format!("unknown item type '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_account_ref: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_account_ref: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
}

impl Item {
    pub fn service(name: impl Into<String>, unit_price: f64) -> Self {
        Self {
            name: Some(name.into()),
            item_type: Some(ItemType::Service),
            unit_price: Some(unit_price),
            ..Default::default()
        }
    }
}

entity!(Item, "Item", search = "Name", order = "Name", active = true);

// ─────────────────────────────────────────────────────────────────────────────
// Account
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Bank,
    #[serde(rename = "Other Current Asset")]
    OtherCurrentAsset,
    #[serde(rename = "Fixed Asset")]
    FixedAsset,
    #[serde(rename = "Other Asset")]
    OtherAsset,
    #[serde(rename = "Accounts Receivable")]
    AccountsReceivable,
    Equity,
    Expense,
    #[serde(rename = "Other Expense")]
    OtherExpense,
    #[serde(rename = "Cost of Goods Sold")]
    CostOfGoodsSold,
    #[serde(rename = "Accounts Payable")]
    AccountsPayable,
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "Long Term Liability")]
    LongTermLiability,
    #[serde(rename = "Other Current Liability")]
    OtherCurrentLiability,
    Income,
    #[serde(rename = "Other Income")]
    OtherIncome,
    /// Any type this client does not model.
    #[serde(other)]
    Other,
}

impl AccountType {
    const ALL: [AccountType; 15] = [
        AccountType::Bank,
        AccountType::OtherCurrentAsset,
        AccountType::FixedAsset,
        AccountType::OtherAsset,
        AccountType::AccountsReceivable,
        AccountType::Equity,
        AccountType::Expense,
        AccountType::OtherExpense,
        AccountType::CostOfGoodsSold,
        AccountType::AccountsPayable,
        AccountType::CreditCard,
        AccountType::LongTermLiability,
        AccountType::OtherCurrentLiability,
        AccountType::Income,
        AccountType::OtherIncome,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Bank => "Bank",
            AccountType::OtherCurrentAsset => "Other Current Asset",
            AccountType::FixedAsset => "Fixed Asset",
            AccountType::OtherAsset => "Other Asset",
            AccountType::AccountsReceivable => "Accounts Receivable",
            AccountType::Equity => "Equity",
            AccountType::Expense => "Expense",
            AccountType::OtherExpense => "Other Expense",
            AccountType::CostOfGoodsSold => "Cost of Goods Sold",
            AccountType::AccountsPayable => "Accounts Payable",
            AccountType::CreditCard => "Credit Card",
            AccountType::LongTermLiability => "Long Term Liability",
            AccountType::OtherCurrentLiability => "Other Current Liability",
            AccountType::Income => "Income",
            AccountType::OtherIncome => "Other Income",
            AccountType::Other => "Other",
        }
    }

    /// Classification the API derives from the type.
    pub fn classification(&self) -> Option<Classification> {
        use AccountType::*;
        match self {
            Bank | OtherCurrentAsset | FixedAsset | OtherAsset | AccountsReceivable => {
                Some(Classification::Asset)
            }
            Equity => Some(Classification::Equity),
            Expense | OtherExpense | CostOfGoodsSold => Some(Classification::Expense),
            AccountsPayable | CreditCard | LongTermLiability | OtherCurrentLiability => {
                Some(Classification::Liability)
            }
            Income | OtherIncome => Some(Classification::Revenue),
            Other => None,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the wire name in any case, with or without spaces
/// (`"Accounts Receivable"`, `"accounts-receivable"`, `"AccountsReceivable"`).
impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|t| normalize(t.as_str()) == wanted)
            .ok_or_else(|| Error::InvalidRequest(format!("unknown account type '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Asset,
    Equity,
    Expense,
    Liability,
    Revenue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<AccountType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_sub_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
}

impl Account {
    pub fn new(name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            name: Some(name.into()),
            account_type: Some(account_type),
            ..Default::default()
        }
    }
}

entity!(Account, "Account", search = "Name", order = "Name", active = true);

// ─────────────────────────────────────────────────────────────────────────────
// Invoice
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invoice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_ref: Option<Ref>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<InvoiceLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_email: Option<EmailAddress>,
    /// `NotSet`, `NeedToSend` or `EmailSent`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
}

impl Invoice {
    pub fn new(customer: Ref) -> Self {
        Self {
            customer_ref: Some(customer),
            ..Default::default()
        }
    }

    pub fn with_line(mut self, line: InvoiceLine) -> Self {
        self.line.push(line);
        self
    }
}

entity!(Invoice, "Invoice", search = "DocNumber", order = "TxnDate DESC", active = false);

/// One invoice line. The detail payload is keyed by `DetailType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvoiceLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: f64,
    #[serde(flatten)]
    pub detail: LineDetail,
}

impl InvoiceLine {
    /// A sales line for `quantity` units of `item` at `unit_price`.
    pub fn sales(item: Ref, quantity: f64, unit_price: f64) -> Self {
        Self {
            id: None,
            line_num: None,
            description: None,
            amount: round_cents(quantity * unit_price),
            detail: LineDetail::SalesItemLineDetail {
                detail: SalesItemDetail {
                    item_ref: Some(item),
                    qty: Some(quantity),
                    unit_price: Some(unit_price),
                    ..Default::default()
                },
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "DetailType")]
pub enum LineDetail {
    SalesItemLineDetail {
        #[serde(rename = "SalesItemLineDetail")]
        detail: SalesItemDetail,
    },
    SubTotalLineDetail {
        #[serde(rename = "SubTotalLineDetail", default)]
        detail: Value,
    },
    DiscountLineDetail {
        #[serde(rename = "DiscountLineDetail")]
        detail: DiscountDetail,
    },
    /// Line kinds this client does not model (description-only, group, ...).
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SalesItemDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_ref: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_code_ref: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiscountDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_based: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_account_ref: Option<Ref>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Payment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_ref: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unapplied_amt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_ref_num: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_to_account_ref: Option<Ref>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<PaymentLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
}

impl Payment {
    pub fn new(customer: Ref, total_amt: f64) -> Self {
        Self {
            customer_ref: Some(customer),
            total_amt: Some(total_amt),
            ..Default::default()
        }
    }

    /// Apply `amount` of this payment to an invoice.
    pub fn apply_to_invoice(mut self, invoice_id: impl Into<String>, amount: f64) -> Self {
        self.line.push(PaymentLine {
            amount,
            linked_txn: vec![LinkedTxn {
                txn_id: invoice_id.into(),
                txn_type: "Invoice".to_string(),
            }],
        });
        self
    }
}

entity!(Payment, "Payment", search = "PaymentRefNum", order = "TxnDate DESC", active = false);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentLine {
    pub amount: f64,
    #[serde(default)]
    pub linked_txn: Vec<LinkedTxn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinkedTxn {
    pub txn_id: String,
    pub txn_type: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Company
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompanyInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_addr: Option<PhysicalAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_phone: Option<PhoneNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiscal_year_start_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<MetaData>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Delete / pagination
// ─────────────────────────────────────────────────────────────────────────────

/// Body returned by a delete operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEntity {
    #[serde(rename = "Id")]
    pub id: String,
    /// `Deleted` on success.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Default page size for list operations.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Paging and filtering for list operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    /// 1-based page number.
    pub page: u32,
    /// Rows per page, `1..=1000`.
    pub page_size: u32,
    /// Substring match on the entity's search field.
    pub search: Option<String>,
    /// Include rows whose `Active` flag is false. Ignored for entities
    /// without one.
    pub include_inactive: bool,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            include_inactive: false,
        }
    }
}

impl ListParams {
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn include_inactive(mut self, include: bool) -> Self {
        self.include_inactive = include;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(Error::InvalidRequest("page starts at 1".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_RESULTS_LIMIT {
            return Err(Error::InvalidRequest(format!(
                "page_size must be between 1 and {}",
                MAX_RESULTS_LIMIT
            )));
        }
        Ok(())
    }

    /// 1-based position of the first row on this page.
    pub fn start_position(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size) + 1
    }
}

/// One page of a list operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub start_position: u64,
    /// Total rows matching the filter. Falls back to `items.len()` when the
    /// count query fails.
    pub total_count: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(u64::from(self.page_size))
    }

    pub fn has_more(&self) -> bool {
        self.start_position.saturating_sub(1) + (self.items.len() as u64) < self.total_count
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_sparse_serialization() {
        let customer = Customer::new("Acme Corp").with_email("billing@acme.test");
        let value = serde_json::to_value(&customer).unwrap();
        assert_eq!(
            value,
            json!({
                "DisplayName": "Acme Corp",
                "PrimaryEmailAddr": {"Address": "billing@acme.test"}
            })
        );
    }

    #[test]
    fn test_customer_deserialize() {
        let customer: Customer = serde_json::from_value(json!({
            "Id": "58",
            "SyncToken": "3",
            "DisplayName": "Bob's Burgers",
            "Balance": 12.5,
            "Active": true,
            "MetaData": {"CreateTime": "2024-01-01T10:00:00-08:00"},
            "domain": "QBO",
            "sparse": false
        }))
        .unwrap();

        assert_eq!(customer.id(), Some("58"));
        assert_eq!(customer.sync_token(), Some("3"));
        assert_eq!(customer.balance, Some(12.5));
        assert_eq!(Customer::path(), "customer");
    }

    #[test]
    fn test_invoice_line_detail_round_trip() {
        let line = InvoiceLine::sales(Ref::named("1", "Services"), 3.0, 33.333)
            .with_description("Consulting");
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["DetailType"], "SalesItemLineDetail");
        assert_eq!(value["Amount"], 100.0);
        assert_eq!(value["SalesItemLineDetail"]["ItemRef"]["value"], "1");
        assert_eq!(value["SalesItemLineDetail"]["Qty"], 3.0);

        let parsed: InvoiceLine = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, line);
    }

    #[test]
    fn test_invoice_lines_from_api() {
        let invoice: Invoice = serde_json::from_value(json!({
            "Id": "130",
            "CustomerRef": {"value": "58", "name": "Acme"},
            "TotalAmt": 100.0,
            "Line": [
                {
                    "Id": "1",
                    "LineNum": 1,
                    "Amount": 100.0,
                    "DetailType": "SalesItemLineDetail",
                    "SalesItemLineDetail": {"ItemRef": {"value": "1"}}
                },
                {"Amount": 100.0, "DetailType": "SubTotalLineDetail", "SubTotalLineDetail": {}},
                {"Amount": 0.0, "DetailType": "DescriptionOnly", "DescriptionLineDetail": {}}
            ]
        }))
        .unwrap();

        assert_eq!(invoice.line.len(), 3);
        assert!(matches!(
            invoice.line[0].detail,
            LineDetail::SalesItemLineDetail { .. }
        ));
        assert!(matches!(
            invoice.line[1].detail,
            LineDetail::SubTotalLineDetail { .. }
        ));
        assert_eq!(invoice.line[2].detail, LineDetail::Other);
        assert_eq!(invoice.customer_ref.unwrap().name.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_account_type_names() {
        let account = Account::new("Sales", AccountType::OtherIncome);
        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["AccountType"], "Other Income");

        let parsed: Account =
            serde_json::from_value(json!({"AccountType": "Non-Posting", "Name": "x"})).unwrap();
        assert_eq!(parsed.account_type, Some(AccountType::Other));

        assert_eq!(
            "accounts-receivable".parse::<AccountType>().unwrap(),
            AccountType::AccountsReceivable
        );
        assert_eq!(
            "CostOfGoodsSold".parse::<AccountType>().unwrap(),
            AccountType::CostOfGoodsSold
        );
        assert!("Nonsense".parse::<AccountType>().is_err());
        assert_eq!(
            AccountType::Income.classification(),
            Some(Classification::Revenue)
        );
    }

    #[test]
    fn test_payment_linking() {
        let payment = Payment::new(Ref::new("58"), 50.0).apply_to_invoice("130", 50.0);
        let value = serde_json::to_value(&payment).unwrap();
        assert_eq!(value["Line"][0]["LinkedTxn"][0]["TxnId"], "130");
        assert_eq!(value["Line"][0]["LinkedTxn"][0]["TxnType"], "Invoice");
    }

    #[test]
    fn test_list_params() {
        let params = ListParams::default();
        params.validate().unwrap();
        assert_eq!(params.start_position(), 1);

        let params = ListParams::default().page(3).page_size(50);
        assert_eq!(params.start_position(), 101);

        assert!(ListParams::default().page(0).validate().is_err());
        assert!(ListParams::default().page_size(0).validate().is_err());
        assert!(ListParams::default().page_size(1001).validate().is_err());
        ListParams::default().page_size(1000).validate().unwrap();
    }

    #[test]
    fn test_page_math() {
        let page = Page {
            items: vec![1, 2],
            page: 2,
            page_size: 2,
            start_position: 3,
            total_count: 5,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_more());

        let last = Page {
            items: vec![5],
            page: 3,
            page_size: 2,
            start_position: 5,
            total_count: 5,
        };
        assert!(!last.has_more());
    }

    #[test]
    fn test_page_with_zero_start_position() {
        let page = Page {
            items: vec![1, 2],
            page: 1,
            page_size: 2,
            start_position: 0,
            total_count: 3,
        };
        assert!(page.has_more());

        let empty: Page<u32> = Page {
            items: Vec::new(),
            page: 1,
            page_size: 20,
            start_position: 0,
            total_count: 0,
        };
        assert!(!empty.has_more());
        assert_eq!(empty.total_pages(), 0);
    }
}
