//! # Warden Core
//!
//! Wires the storage, token, policy and AppRole components into one
//! [`Core`], resolves bearer tokens into callers, and runs the background
//! expiry sweeper.
//!
//! ## Example
//!
//! ```rust
//! use warden_approle::{RoleRequest, SecretIdRequest};
//! use warden_core::{Core, WardenConfig};
//!
//! let core = Core::open(WardenConfig::default()).expect("core");
//! let root = core.create_root_token().expect("root token");
//! let admin = core.caller(&root.token).expect("caller");
//!
//! let approle = core.approle("approle").expect("mount");
//! approle.write_role(&admin, "web", RoleRequest::new()).expect("role");
//! let response = approle
//!     .issue_secret_id(&admin, "web", SecretIdRequest::new())
//!     .expect("secret id");
//! assert!(response.wrap_info().is_none());
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod instance;
pub mod keyfile;
pub mod sweeper;

pub use config::{
    AppRoleConfig, LogConfig, StorageConfig, SweepConfig, TokenConfig, WardenConfig, WrappingConfig,
};
pub use error::{Error, Result};
pub use instance::{Core, DEFAULT_WRAP_TTL_METADATA, KEY_FILE, STORE_FILE};
pub use sweeper::{spawn as spawn_sweeper, SweeperHandle};
