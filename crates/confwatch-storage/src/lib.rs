//! Storage layer for confwatch.
//!
//! This crate provides the persistence primitives the snapshot engine is
//! built on:
//! - A key-value [`Storage`] abstraction for small JSON documents, with a
//!   file-backed ([`json::JsonStorage`]) and an in-memory
//!   ([`memory::MemoryStorage`]) backend
//! - A content-addressed [`objects::ObjectStore`] for file contents
//! - Atomic whole-file replacement ([`atomic`])

pub mod atomic;
pub mod error;
pub mod json;
pub mod memory;
pub mod objects;

pub use error::{StorageError, StorageResult};
pub use json::JsonStorage;
pub use memory::MemoryStorage;
pub use objects::{digest, ObjectStore};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// A trait for key-value storage backends.
///
/// Keys are represented as path segments, e.g., `["history", "<digest>"]`.
/// Values are serialized/deserialized as JSON.
///
/// A `write` replaces the whole value; readers observe either the previous
/// or the new value, never a mix of both.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a value from storage.
    ///
    /// Returns `None` if the key doesn't exist.
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>>;

    /// Write a value to storage.
    ///
    /// Creates parent directories if necessary.
    async fn write<T: Serialize + Send + Sync>(&self, key: &[&str], value: &T)
        -> StorageResult<()>;

    /// List all keys under a prefix.
    ///
    /// Returns the full key paths for each item.
    async fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>>;
}
