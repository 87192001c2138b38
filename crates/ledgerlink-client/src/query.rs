//! Builder for the accounting API's SQL-like query language.
//!
//! ```
//! use ledgerlink_client::query::Query;
//!
//! let sql = Query::select("Customer")
//!     .where_like("DisplayName", "O'Brien")
//!     .order_by("DisplayName")
//!     .paginate(21, 20)
//!     .to_sql();
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM Customer WHERE DisplayName LIKE '%O\\'Brien%' ORDERBY DisplayName STARTPOSITION 21 MAXRESULTS 20"
//! );
//! ```

use crate::types::Entity;

/// Upper bound the API accepts for `MAXRESULTS`.
pub const MAX_RESULTS_LIMIT: u32 = 1000;

/// Condition that includes inactive rows, which the API hides by default.
pub const INCLUDE_INACTIVE: &str = "Active IN (true, false)";

/// A `SELECT` over one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    entity: &'static str,
    conditions: Vec<String>,
    order_by: Option<String>,
    start_position: Option<u64>,
    max_results: Option<u32>,
}

impl Query {
    pub fn select(entity: &'static str) -> Self {
        Self {
            entity,
            conditions: Vec::new(),
            order_by: None,
            start_position: None,
            max_results: None,
        }
    }

    pub fn for_entity<E: Entity>() -> Self {
        Self::select(E::NAME)
    }

    /// `field = 'value'`
    pub fn where_eq(self, field: &str, value: &str) -> Self {
        let condition = format!("{} = {}", field, quote(value));
        self.where_raw(condition)
    }

    /// `field LIKE '%value%'`
    pub fn where_like(self, field: &str, value: &str) -> Self {
        let condition = format!("{} LIKE {}", field, quote(&format!("%{}%", value)));
        self.where_raw(condition)
    }

    /// Add a pre-rendered condition. Conditions are joined with `AND`.
    pub fn where_raw(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn include_inactive(self) -> Self {
        self.where_raw(INCLUDE_INACTIVE)
    }

    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    /// `start_position` is 1-based.
    pub fn paginate(mut self, start_position: u64, max_results: u32) -> Self {
        self.start_position = Some(start_position);
        self.max_results = Some(max_results);
        self
    }

    /// Row query.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {}", self.entity);
        self.push_where(&mut sql);
        if let Some(order) = &self.order_by {
            sql.push_str(" ORDERBY ");
            sql.push_str(order);
        }
        if let Some(start) = self.start_position {
            sql.push_str(&format!(" STARTPOSITION {}", start));
        }
        if let Some(max) = self.max_results {
            sql.push_str(&format!(" MAXRESULTS {}", max));
        }
        sql
    }

    /// Count query over the same conditions; ordering and paging are dropped.
    pub fn to_count_sql(&self) -> String {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.entity);
        self.push_where(&mut sql);
        sql
    }

    fn push_where(&self, sql: &mut String) {
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
    }
}

/// Render a string literal, escaping quotes and backslashes.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select() {
        assert_eq!(Query::select("Item").to_sql(), "SELECT * FROM Item");
        assert_eq!(
            Query::select("Item").to_count_sql(),
            "SELECT COUNT(*) FROM Item"
        );
    }

    #[test]
    fn test_conditions_joined_with_and() {
        let query = Query::select("Invoice")
            .where_eq("CustomerRef", "58")
            .where_raw("TotalAmt > '100'")
            .order_by("TxnDate DESC")
            .paginate(1, 50);

        assert_eq!(
            query.to_sql(),
            "SELECT * FROM Invoice WHERE CustomerRef = '58' AND TotalAmt > '100' ORDERBY TxnDate DESC STARTPOSITION 1 MAXRESULTS 50"
        );
        assert_eq!(
            query.to_count_sql(),
            "SELECT COUNT(*) FROM Invoice WHERE CustomerRef = '58' AND TotalAmt > '100'"
        );
    }

    #[test]
    fn test_quote_escaping() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("Bob's Burgers"), "'Bob\\'s Burgers'");
        assert_eq!(quote("a\\b"), "'a\\\\b'");
        assert_eq!(
            Query::select("Customer")
                .where_eq("DisplayName", "' OR '1'='1")
                .to_sql(),
            "SELECT * FROM Customer WHERE DisplayName = '\\' OR \\'1\\'=\\'1'"
        );
    }

    #[test]
    fn test_include_inactive() {
        assert_eq!(
            Query::select("Account").include_inactive().to_count_sql(),
            "SELECT COUNT(*) FROM Account WHERE Active IN (true, false)"
        );
    }
}
