//! # Host Bridge Traits
//!
//! Abstraction traits between the sync engine and the outside world.
//!
//! ## Overview
//!
//! This crate defines the contract between the sync core and the concrete
//! adapters that talk to the network, the local disk and remote services. Each
//! trait represents a capability the core requires but that is implemented
//! elsewhere (desktop adapters, provider crates, test fakes).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and timeouts
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Local file I/O
//!
//! ### Remote services
//! - [`TableClient`](table::TableClient) - Paginated reads and row creation on a remote table
//! - [`ObjectStore`](storage::ObjectStore) - Staging uploads that yield a fetchable URL
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source and sleeping, injectable for deterministic tests
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Adapters
//! should convert their own errors into `BridgeError` and keep enough context
//! (status code, attempt count, file name) in the message to diagnose a failure
//! from the log alone.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared as
//! `Arc<dyn Trait>` between the service façade and the orchestrator.

pub mod error;
pub mod http;
pub mod storage;
pub mod table;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{FileSystemAccess, ObjectStore, StagedObject};
pub use table::{
    Attachment, FieldSchema, Page, Row, RowFetch, TableClient, TableSchema, ViewFetchError,
};
pub use time::{Clock, SystemClock};
