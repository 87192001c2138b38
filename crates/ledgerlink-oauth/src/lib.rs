//! OAuth 2.0 token session for the QuickBooks Online accounting API.
//!
//! Owns one set of vendor credentials and mediates every authenticated
//! upstream call through a uniform expiry-check / refresh / retry protocol.
//!
//! # Components
//!
//! - [`oauth`] - Authorization URL, client credentials, token endpoint exchange/refresh
//! - [`session`] - [`TokenSession`]: credential state, lazy refresh, single retry on 401
//! - [`fault`] - Normalization of the vendor's fault envelope
//! - [`token_store`] - Snapshot persistence for callers that keep sessions across runs

pub mod error;
pub mod fault;
pub mod oauth;
pub mod session;
pub mod token_store;

pub use error::{OAuthError, Result};
pub use fault::{FaultDetail, UpstreamFault};
pub use oauth::{OAuthConfig, RedirectParams, TokenResult};
pub use session::{ApiRequest, ApiResponse, SessionSnapshot, SessionStatus, TokenSession};
pub use token_store::{FileTokenStore, MemoryTokenStore, SharedTokenStore, TokenStore};
