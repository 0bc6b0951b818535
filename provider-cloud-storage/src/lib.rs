//! # Cloud Storage Provider
//!
//! Implements the `ObjectStore` trait for Google Cloud Storage buckets using
//! the JSON API.
//!
//! Objects are uploaded with a simple media upload under
//! `{prefix}/{filename}` and are expected to be publicly readable through the
//! bucket's own access policy. The public URL is
//! `https://storage.googleapis.com/{bucket}/{key}`.

pub mod connector;
pub mod error;

pub use connector::BucketObjectStore;
pub use error::{CloudStorageError, Result};
