//! CLI command implementations.
//!
//! Each submodule implements one command group:
//! - [`init`] - Data directory and root token setup
//! - [`policy`] - Policy administration
//! - [`mount`] - AppRole mounts
//! - [`role`] - Role management
//! - [`secret_id`] - Secret-id issuance, lookup and revocation
//! - [`token`] - Caller tokens
//! - [`wrapping`] - Unwrap, lookup and rewrap
//! - [`login`] - AppRole login
//! - [`sweep`] - Expiry sweeping

pub mod init;
pub mod login;
pub mod mount;
pub mod policy;
pub mod role;
pub mod secret_id;
pub mod sweep;
pub mod token;
pub mod wrapping;

pub use init::InitCommand;
pub use login::LoginCommand;
pub use mount::MountCommand;
pub use policy::PolicyCommand;
pub use role::RoleCommand;
pub use secret_id::SecretIdCommand;
pub use sweep::SweepCommand;
pub use token::TokenCommand;
pub use wrapping::WrappingCommand;
