//! Entity API implementations.

mod accounts;
mod company;
mod customers;
mod invoices;
mod items;
mod payments;

pub use accounts::{AccountsApi, DUPLICATE_NAME_FAULT_CODE};
pub use company::CompanyApi;
pub use customers::CustomersApi;
pub use invoices::InvoicesApi;
pub use items::ItemsApi;
pub use payments::PaymentsApi;
