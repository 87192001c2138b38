//! Typed QuickBooks Online accounting client.
//!
//! Translates entity operations into the accounting API's resource calls and
//! query language, and routes every call through a shared
//! [`ledgerlink_oauth::TokenSession`].
//!
//! # API Coverage
//!
//! - **Customers**: list, get, find, create, update, deactivate
//! - **Items**: list, get, find, create (income account by name), update, deactivate
//! - **Accounts**: list, get, find, create, update, resolve (find or create)
//! - **Invoices**: list, list per customer, get, create, update, delete, send
//! - **Payments**: list, list per customer, get, create, delete
//! - **Company**: company info
//!
//! List operations return a [`Page`] whose `total_count` comes from a
//! separate `COUNT(*)` query.

pub mod api;
pub mod client;
pub mod error;
pub mod query;
pub mod types;

pub use api::DUPLICATE_NAME_FAULT_CODE;
pub use client::{ClientBuilder, QuickBooksClient};
pub use error::{Error, Result};
pub use types::*;
