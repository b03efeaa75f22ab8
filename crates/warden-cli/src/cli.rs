//! Command-line argument parsing with clap.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Warden - scoped machine credentials with response wrapping.
#[derive(Parser, Debug, Clone)]
#[command(name = "warden")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON config file.
    #[arg(short, long, env = "WARDEN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the store and barrier key. Overrides the config.
    #[arg(short, long, env = "WARDEN_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Caller token.
    #[arg(short, long, env = "WARDEN_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create the data directory, salt and barrier key, and print a root token.
    Init,

    /// Policy management.
    Policy {
        /// Policy subcommand to execute.
        #[command(subcommand)]
        command: PolicyCommands,
    },

    /// Auth mount management.
    Mount {
        /// Mount subcommand to execute.
        #[command(subcommand)]
        command: MountCommands,
    },

    /// Role management.
    Role {
        /// Role subcommand to execute.
        #[command(subcommand)]
        command: RoleCommands,
    },

    /// Secret-id issuance and management.
    SecretId {
        /// Secret-id subcommand to execute.
        #[command(subcommand)]
        command: SecretIdCommands,
    },

    /// Token management.
    Token {
        /// Token subcommand to execute.
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Unwrap a wrapping token. Works once.
    Unwrap {
        /// The wrapping token.
        wrapping_token: String,
    },

    /// Wrapping token inspection.
    Wrapping {
        /// Wrapping subcommand to execute.
        #[command(subcommand)]
        command: WrappingCommands,
    },

    /// Log in with a role and secret-id.
    Login(LoginArgs),

    /// Remove expired tokens, wrapped responses and secret-ids.
    Sweep {
        /// Keep sweeping on the configured interval until interrupted.
        #[arg(short, long)]
        watch: bool,
    },
}

/// Mount selection shared by role and secret-id commands.
#[derive(Args, Debug, Clone, Default)]
pub struct MountArg {
    /// AppRole mount. Defaults to the configured mount.
    #[arg(short, long)]
    pub mount: Option<String>,
}

/// Policy subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum PolicyCommands {
    /// Write a policy from a JSON file.
    Write {
        /// Policy name.
        name: String,
        /// JSON file holding the policy rules.
        file: PathBuf,
    },
    /// Show a policy.
    Read {
        /// Policy name.
        name: String,
    },
    /// Delete a policy.
    Delete {
        /// Policy name.
        name: String,
    },
    /// List policy names.
    List,
}

/// Mount subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum MountCommands {
    /// Enable a new AppRole mount.
    Enable {
        /// Mount name.
        name: String,
    },
    /// List enabled mounts.
    List,
}

/// Role subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum RoleCommands {
    /// Create or update a role.
    Write(RoleWriteArgs),
    /// Show a role.
    Read {
        /// Role name.
        name: String,
        #[command(flatten)]
        #[allow(missing_docs)]
        mount: MountArg,
    },
    /// Delete a role and all of its secret-ids.
    Delete {
        /// Role name.
        name: String,
        #[command(flatten)]
        #[allow(missing_docs)]
        mount: MountArg,
    },
    /// List roles you may read.
    List {
        #[command(flatten)]
        #[allow(missing_docs)]
        mount: MountArg,
    },
}

/// Arguments for `role write`.
#[derive(Args, Debug, Clone)]
pub struct RoleWriteArgs {
    /// Role name.
    pub name: String,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub mount: MountArg,

    /// Policies attached to login tokens (comma-separated).
    #[arg(short, long, value_delimiter = ',')]
    pub policies: Option<Vec<String>>,

    /// Secret-id lifetime, e.g. `10m`.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub secret_id_ttl: Option<Duration>,

    /// Logins allowed per secret-id.
    #[arg(long)]
    pub secret_id_num_uses: Option<u32>,

    /// Client CIDR allowed to log in (repeatable).
    #[arg(long = "bound-cidr")]
    pub bound_cidrs: Option<Vec<String>>,

    /// Login token TTL, e.g. `1h`.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub token_ttl: Option<Duration>,

    /// Login token lifetime cap.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub token_max_ttl: Option<Duration>,

    /// Allow login by CIDR alone, without a secret-id.
    #[arg(long)]
    pub no_bind_secret_id: bool,
}

/// Secret-id subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum SecretIdCommands {
    /// Issue a secret-id for a role.
    Issue(SecretIdIssueArgs),
    /// Show a secret-id by accessor.
    Lookup {
        /// Role name.
        role: String,
        /// Secret-id accessor.
        accessor: String,
        #[command(flatten)]
        #[allow(missing_docs)]
        mount: MountArg,
    },
    /// Destroy a secret-id by accessor.
    Revoke {
        /// Role name.
        role: String,
        /// Secret-id accessor.
        accessor: String,
        #[command(flatten)]
        #[allow(missing_docs)]
        mount: MountArg,
    },
    /// List accessors of a role's secret-ids.
    List {
        /// Role name.
        role: String,
        #[command(flatten)]
        #[allow(missing_docs)]
        mount: MountArg,
    },
}

/// Arguments for `secret-id issue`.
#[derive(Args, Debug, Clone)]
pub struct SecretIdIssueArgs {
    /// Role name.
    pub role: String,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub mount: MountArg,

    /// Wrap the response in a single-use token with this TTL, e.g. `5m`.
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub wrap_ttl: Option<Duration>,

    /// Metadata stored with the secret-id (KEY=VALUE, repeatable).
    #[arg(long, value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,

    /// Client CIDR allowed to use the secret-id (repeatable).
    #[arg(long = "cidr")]
    pub cidrs: Vec<String>,

    /// Register this value instead of generating one.
    #[arg(long)]
    pub value: Option<String>,
}

/// Token subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum TokenCommands {
    /// Create a token.
    Create {
        /// Policies to attach (comma-separated).
        #[arg(short, long, value_delimiter = ',')]
        policies: Vec<String>,
        /// Token TTL.
        #[arg(long, value_parser = humantime::parse_duration)]
        ttl: Option<Duration>,
        /// Wrap TTL applied to this token's requests that do not name one.
        #[arg(long, value_parser = humantime::parse_duration)]
        default_wrap_ttl: Option<Duration>,
    },
    /// Show the caller token.
    Lookup,
    /// Renew the caller token.
    Renew {
        /// Requested TTL.
        #[arg(long, value_parser = humantime::parse_duration)]
        increment: Option<Duration>,
    },
    /// Revoke the caller token.
    Revoke,
}

/// Wrapping subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum WrappingCommands {
    /// Show a wrapping token's creation details without unwrapping.
    Lookup {
        /// The wrapping token.
        wrapping_token: String,
    },
    /// Move a wrapped response to a new wrapping token.
    Rewrap {
        /// The wrapping token.
        wrapping_token: String,
    },
}

/// Arguments for `login`.
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Role name.
    pub role: String,

    /// Secret-id value.
    pub secret_id: Option<String>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub mount: MountArg,

    /// Client address checked against bound CIDRs.
    #[arg(long)]
    pub client_addr: Option<IpAddr>,
}
