//! # Google Drive Provider
//!
//! Implements the `ObjectStore` trait on top of Google Drive API v3.
//!
//! ## Overview
//!
//! Files are staged by:
//! - a `multipart/related` upload (metadata + bytes) into an optional folder
//! - granting an `anyone` / `reader` permission so the table service can fetch
//!   the file without credentials
//!
//! The staged key is the Drive file ID; deleting it removes the file.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::DriveObjectStore;
pub use error::{GoogleDriveError, Result};
