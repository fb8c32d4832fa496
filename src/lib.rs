//! ERPX - ERP XML-RPC eXecution client
//!
//! Thin async client for business-management servers speaking the Odoo-style
//! XML-RPC object protocol: authenticate once, then forward generic
//! "execute method X on entity Y" calls, with convenience verbs for the
//! common operations and a POS-specific variant on top.

pub mod client;
pub mod config;
pub mod error;
pub mod pos;
pub mod session;
pub mod xmlrpc;

pub use client::{AuthOverrides, Client, SearchOptions, API_KEY_LOGIN};
pub use config::{ClientConfig, ConfigOverrides};
pub use error::{ErpxError, Result};
pub use pos::{PosClient, PosConfigRef};
pub use session::{CredentialKey, SessionCache};

/// ERPX version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
