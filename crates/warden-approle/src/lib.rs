//! # Warden AppRole
//!
//! Machine authentication by role and secret-id.
//!
//! An [`Issuer`] owns one auth mount. Administrators write [`Role`]s and issue
//! secret-ids for them, optionally wrapped in a single-use token so the
//! secret value never passes through the administrator's hands. Machines
//! present the role name and secret-id to [`Issuer::login`] and receive a
//! client token carrying the role's policies.
//!
//! Secret-id use limits are spent with compare-and-swap, so concurrent logins
//! never spend more uses than a secret-id has. Exhausted, revoked and expired values
//! are tombstoned and can never be registered again for the same role.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use warden_approle::{Issuer, RoleRequest, SecretIdRequest};
//! use warden_policy::{CallerContext, PolicyEngine, PolicyStore};
//! use warden_store::{MemoryStorage, ScopedStore};
//! use warden_token::{BarrierKey, Cubbyhole, Salt, TokenRegistry, TtlLimits, WrappingEngine};
//!
//! let backend = Arc::new(MemoryStorage::new());
//! let view = |prefix: &str| ScopedStore::new(backend.clone(), prefix).expect("prefix");
//! let salt = Salt::generate();
//! let limits = TtlLimits::new(Duration::from_secs(3600), Duration::from_secs(86_400));
//!
//! let tokens = Arc::new(TokenRegistry::new(view("sys/token/"), Arc::new(salt.clone()), limits));
//! let cubbyhole = Arc::new(Cubbyhole::new(view("cubbyhole/"), Arc::new(BarrierKey::generate())));
//! let wrapping = Arc::new(WrappingEngine::new(Arc::clone(&tokens), cubbyhole, limits));
//! let policies = Arc::new(PolicyEngine::new(Arc::new(PolicyStore::new(view("sys/policy/")))));
//!
//! let issuer = Issuer::new("approle", view("auth/approle/"), &salt, policies, tokens, Arc::clone(&wrapping))
//!     .expect("issuer");
//! let admin = CallerContext::root();
//!
//! issuer
//!     .write_role(&admin, "web", RoleRequest::new().with_policies(["web"]).with_secret_id_num_uses(1))
//!     .expect("role");
//! let response = issuer
//!     .issue_secret_id(&admin, "web", SecretIdRequest::new().wrapped(Duration::from_secs(300)))
//!     .expect("secret id");
//!
//! let wrap_info = response.wrap_info().expect("wrapped");
//! let payload: warden_approle::SecretIdPayload = wrapping.unwrap_as(&wrap_info.token).expect("unwrap");
//!
//! let login = issuer.login("web", Some(&payload.secret_id), None).expect("login");
//! assert_eq!(login.policies, vec!["web"]);
//! assert!(issuer.login("web", Some(&payload.secret_id), None).is_err());
//! ```

#![forbid(unsafe_code)]

pub mod cidr;
pub mod error;
pub mod issuer;
pub mod role;
pub mod secret_id;

pub use error::{Error, Result};
pub use issuer::{Issuer, LoginResponse, ROLE_NAME_METADATA};
pub use role::{Role, RoleRequest};
pub use secret_id::{SecretIdInfo, SecretIdPayload, SecretIdRequest, SecretIdResponse};
