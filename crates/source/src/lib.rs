//! Event-source access for the log relay.
//!
//! - [`CredentialCache`] -- TTL cache of short-lived access tokens with
//!   coalesced refreshes, one entry per token endpoint.
//! - [`ClientCredentialsExchanger`] -- HTTP client-credential grant.
//! - [`ManagementApiReader`] -- reads one page of log records over HTTP.
//! - [`LogSource`] -- cursor-based pagination on top of any [`LogReader`].

pub mod credentials;
pub mod exchange;
pub mod pagination;
pub mod reader;

pub use credentials::{Credential, CredentialCache, TokenEndpoint, TokenExchanger};
pub use exchange::ClientCredentialsExchanger;
pub use pagination::{LogSource, PAGE_SIZE};
pub use reader::{LogReader, ManagementApiReader};
