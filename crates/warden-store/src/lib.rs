//! # Warden Store
//!
//! The storage boundary shared by every Warden component.
//!
//! - **Path-addressed blobs**: [`Storage`] maps `/`-separated paths to opaque bytes
//! - **Atomic check-and-set**: [`Storage::compare_and_swap`] is the single-writer-wins
//!   primitive behind single-use tokens and use-limited credentials
//! - **Scoped views**: [`ScopedStore`] confines a component to its own prefix
//! - **Backends**: [`MemoryStorage`] for tests and embedding, [`FileStorage`] for a
//!   JSON snapshot on disk
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_store::{MemoryStorage, ScopedStore};
//!
//! let backend = Arc::new(MemoryStorage::new());
//! let tokens = ScopedStore::new(backend, "sys/token/").expect("valid prefix");
//!
//! assert!(tokens.compare_and_swap("id/abc", None, Some(b"entry".to_vec())).expect("cas"));
//! assert_eq!(tokens.get("id/abc").expect("get"), Some(b"entry".to_vec()));
//! assert_eq!(tokens.list("id/").expect("list"), vec!["abc".to_string()]);
//! ```

#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod file;
pub mod memory;
pub mod scoped;
pub mod sweep;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod traits;

pub use error::{Error, ErrorKind, Result};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use scoped::ScopedStore;
pub use sweep::{ExpirySweep, SweepReport};
#[cfg(any(test, feature = "test-util"))]
pub use testing::{FaultOp, FaultyStorage};
pub use traits::Storage;
