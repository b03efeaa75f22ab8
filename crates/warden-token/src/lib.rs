//! # Warden Token
//!
//! Bearer tokens and single-use response wrapping for Warden:
//!
//! - **Token/accessor registry**: [`TokenRegistry`] issues tokens with an
//!   independent non-secret [`Accessor`], enforces TTLs lazily and in the
//!   background, and renews, consumes and revokes them
//! - **Cubbyhole**: [`Cubbyhole`] holds one sealed payload per token and hands it
//!   out at most once
//! - **Response wrapping**: [`WrappingEngine`] turns any response into a
//!   [`WrapInfo`] whose token unwraps exactly once
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use warden_store::{MemoryStorage, ScopedStore};
//! use warden_token::{BarrierKey, Cubbyhole, Salt, TokenRegistry, TtlLimits, WrapRequest, WrappingEngine};
//!
//! let backend = Arc::new(MemoryStorage::new());
//! let registry = Arc::new(TokenRegistry::new(
//!     ScopedStore::new(backend.clone(), "sys/token/").expect("prefix"),
//!     Arc::new(Salt::generate()),
//!     TtlLimits::new(Duration::from_secs(3600), Duration::from_secs(86_400)),
//! ));
//! let cubbyhole = Arc::new(Cubbyhole::new(
//!     ScopedStore::new(backend, "cubbyhole/").expect("prefix"),
//!     Arc::new(BarrierKey::generate()),
//! ));
//! let engine = WrappingEngine::new(
//!     registry,
//!     cubbyhole,
//!     TtlLimits::new(Duration::from_secs(300), Duration::from_secs(86_400)),
//! );
//!
//! let info = engine
//!     .wrap(&serde_json::json!({"answer": 42}), WrapRequest::new("sys/wrapping/wrap"))
//!     .expect("wrap");
//! let payload = engine.unwrap(&info.token).expect("first unwrap");
//! assert_eq!(payload["answer"], 42);
//! assert!(engine.unwrap(&info.token).is_err());
//! ```
//!
//! ## Security Considerations
//!
//! - Raw tokens and accessors never appear in storage paths; see [`Salt`]
//! - Cubbyhole payloads are sealed with ChaCha20-Poly1305; see [`BarrierKey`]
//! - Token values are redacted in debug output and zeroized on drop

#![forbid(unsafe_code)]

pub mod barrier;
pub mod cubbyhole;
pub mod error;
pub mod registry;
pub mod salt;
pub mod ttl;
pub mod types;
pub mod wrapping;

pub use barrier::BarrierKey;
pub use cubbyhole::{Cubbyhole, Envelope};
pub use error::{Error, Result};
pub use registry::TokenRegistry;
pub use salt::Salt;
pub use ttl::{resolve_ttl, TtlLimits};
pub use types::{
    Accessor, IssuedToken, Token, TokenMetadata, TokenRequest, TokenState, WRAPPING_POLICY,
};
pub use wrapping::{WrapInfo, WrapLookup, WrapRequest, WrappingEngine};
