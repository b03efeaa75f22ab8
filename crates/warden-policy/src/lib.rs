//! # Warden Policy
//!
//! Role-scoped allow-list policies for Warden's administrative actions.
//!
//! A [`Policy`] is a named set of [`Rule`]s. Each rule names an auth mount
//! pattern, a set of [`Action`]s and a list of role [`Pattern`]s. A caller is
//! authorized when any rule of any attached policy matches; there are no deny
//! rules.
//!
//! ## Example
//!
//! ```rust
//! use warden_policy::{evaluate, Action, Pattern, Policy, Rule};
//!
//! let policy = Policy::new("issuer")
//!     .expect("valid name")
//!     .with_rule(
//!         Rule::new(Pattern::parse("approle").expect("pattern"))
//!             .allow([Action::UpdateRoleSecretId])
//!             .on_role(Pattern::parse("web-*").expect("pattern")),
//!     );
//!
//! assert!(evaluate([&policy], "approle", Action::UpdateRoleSecretId, "web-api"));
//! assert!(!evaluate([&policy], "approle", Action::DeleteRole, "web-api"));
//! ```

#![forbid(unsafe_code)]

pub mod action;
pub mod caller;
pub mod engine;
pub mod error;
pub mod name;
pub mod pattern;
pub mod policy;
pub mod store;

pub use action::Action;
pub use caller::CallerContext;
pub use engine::PolicyEngine;
pub use error::{Error, Result};
pub use name::{validate_name, RoleName};
pub use pattern::Pattern;
pub use policy::{evaluate, Policy, Rule, ROOT_POLICY};
pub use store::PolicyStore;
