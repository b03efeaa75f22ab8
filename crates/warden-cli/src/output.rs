//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use warden_approle::{LoginResponse, Role, SecretIdInfo, SecretIdResponse};
use warden_policy::Policy;
use warden_store::SweepReport;
use warden_token::{Accessor, IssuedToken, Token, TokenMetadata, WrapInfo, WrapLookup};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

fn or_dash(value: Option<impl std::fmt::Display>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn secs(value: Option<std::time::Duration>) -> String {
    or_dash(value.map(|d| humantime::format_duration(d).to_string()))
}

/// A freshly minted token, shown once.
#[derive(Debug, Clone, Serialize)]
pub struct TokenOutput {
    /// The bearer value.
    pub token: Token,
    /// Its metadata.
    #[serde(flatten)]
    pub metadata: TokenMetadata,
}

impl From<IssuedToken> for TokenOutput {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            metadata: issued.metadata,
        }
    }
}

impl TableDisplay for TokenOutput {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Token:            {}", self.token.expose())?;
        self.metadata.write_table(writer)
    }
}

impl TableDisplay for TokenMetadata {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Accessor:         {}", self.accessor)?;
        writeln!(writer, "Display Name:     {}", self.display_name)?;
        writeln!(writer, "Policies:         {}", self.policies.join(", "))?;
        writeln!(writer, "TTL:              {}", humantime::format_duration(self.ttl))?;
        writeln!(writer, "Expires:          {}", self.expire_time.to_rfc3339())?;
        writeln!(writer, "Renewable:        {}", self.renewable)?;
        writeln!(writer, "Creation Path:    {}", self.creation_path)?;
        for (key, value) in &self.metadata {
            writeln!(writer, "  {key}: {value}")?;
        }
        Ok(())
    }
}

/// Result of `warden init`.
#[derive(Debug, Clone, Serialize)]
pub struct InitOutput {
    /// Where state was created.
    pub data_dir: PathBuf,
    /// Enabled mounts.
    pub mounts: Vec<String>,
    /// The root token.
    pub root_token: Token,
    /// Its accessor.
    pub accessor: Accessor,
}

impl TableDisplay for InitOutput {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Initialized {}", self.data_dir.display())?;
        writeln!(writer, "Mounts:           {}", self.mounts.join(", "))?;
        writeln!(writer, "Root Token:       {}", self.root_token.expose())?;
        writeln!(writer, "Root Accessor:    {}", self.accessor)?;
        writeln!(writer)?;
        writeln!(writer, "Store the root token safely. It is not shown again.")?;
        Ok(())
    }
}

/// A list of names under a heading.
#[derive(Debug, Clone, Serialize)]
pub struct NameList {
    /// Column heading.
    #[serde(skip)]
    pub heading: &'static str,
    /// The names.
    pub names: Vec<String>,
}

impl NameList {
    /// Creates a list.
    #[must_use]
    pub const fn new(heading: &'static str, names: Vec<String>) -> Self {
        Self { heading, names }
    }
}

impl TableDisplay for NameList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.names.is_empty() {
            writeln!(writer, "No {} found.", self.heading.to_lowercase())?;
            return Ok(());
        }
        writeln!(writer, "{}", self.heading.to_uppercase())?;
        for name in &self.names {
            writeln!(writer, "{name}")?;
        }
        Ok(())
    }
}

/// A one-line confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// What happened.
    pub message: String,
}

impl Message {
    /// Creates a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.message)?;
        Ok(())
    }
}

impl TableDisplay for Role {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Role: {}", self.name)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Policies:           {}", self.policies.join(", "))?;
        writeln!(writer, "Bind Secret ID:     {}", self.bind_secret_id)?;
        writeln!(writer, "Secret ID TTL:      {}", secs(self.secret_id_ttl))?;
        writeln!(writer, "Secret ID Uses:     {}", or_dash(self.secret_id_num_uses))?;
        let cidrs: Vec<String> = self.secret_id_bound_cidrs.iter().map(ToString::to_string).collect();
        writeln!(writer, "Bound CIDRs:        {}", cidrs.join(", "))?;
        writeln!(writer, "Token TTL:          {}", secs(self.token_ttl))?;
        writeln!(writer, "Token Max TTL:      {}", secs(self.token_max_ttl))?;
        writeln!(writer, "Updated:            {}", self.updated_at.to_rfc3339())?;
        Ok(())
    }
}

impl TableDisplay for WrapInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Wrapping Token:           {}", self.token.expose())?;
        writeln!(writer, "Wrapping Accessor:        {}", self.accessor)?;
        writeln!(writer, "Wrapping TTL:             {}", humantime::format_duration(self.ttl))?;
        writeln!(writer, "Created:                  {}", self.creation_time.to_rfc3339())?;
        writeln!(writer, "Creation Path:            {}", self.creation_path)?;
        if let Some(wrapped) = &self.wrapped_accessor {
            writeln!(writer, "Wrapped Accessor:         {wrapped}")?;
        }
        Ok(())
    }
}

impl TableDisplay for WrapLookup {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Created:          {}", self.creation_time.to_rfc3339())?;
        writeln!(writer, "Creation TTL:     {}", humantime::format_duration(self.creation_ttl))?;
        writeln!(writer, "Creation Path:    {}", self.creation_path)?;
        Ok(())
    }
}

impl TableDisplay for SecretIdResponse {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match self {
            Self::Wrapped { wrap_info } => wrap_info.write_table(writer),
            Self::Raw(payload) => {
                writeln!(writer, "Secret ID:          {}", payload.secret_id)?;
                writeln!(writer, "Secret ID Accessor: {}", payload.secret_id_accessor)?;
                writeln!(writer, "Secret ID TTL:      {}s", payload.secret_id_ttl)?;
                writeln!(writer, "Secret ID Uses:     {}", payload.secret_id_num_uses)?;
                Ok(())
            }
        }
    }
}

impl TableDisplay for SecretIdInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Accessor:         {}", self.secret_id_accessor)?;
        writeln!(writer, "Role:             {}", self.role_name)?;
        writeln!(writer, "Created:          {}", self.creation_time.to_rfc3339())?;
        writeln!(
            writer,
            "Expires:          {}",
            or_dash(self.expiration_time.map(|t| t.to_rfc3339()))
        )?;
        writeln!(writer, "Uses Remaining:   {}", self.secret_id_num_uses)?;
        let cidrs: Vec<String> = self.cidr_list.iter().map(ToString::to_string).collect();
        writeln!(writer, "CIDRs:            {}", cidrs.join(", "))?;
        for (key, value) in &self.metadata {
            writeln!(writer, "  {key}: {value}")?;
        }
        Ok(())
    }
}

impl TableDisplay for LoginResponse {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Token:            {}", self.client_token.expose())?;
        writeln!(writer, "Accessor:         {}", self.accessor)?;
        writeln!(writer, "Policies:         {}", self.policies.join(", "))?;
        writeln!(writer, "Lease Duration:   {}s", self.lease_duration)?;
        writeln!(writer, "Renewable:        {}", self.renewable)?;
        for (key, value) in &self.metadata {
            writeln!(writer, "  {key}: {value}")?;
        }
        Ok(())
    }
}

impl TableDisplay for Policy {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Policy: {}", self.name)?;
        writeln!(writer, "{:<16} {:<24} ACTIONS", "MOUNT", "ROLES")?;
        for rule in &self.rules {
            let roles: Vec<String> = rule.roles.iter().map(ToString::to_string).collect();
            let actions: Vec<String> = rule.actions.iter().map(ToString::to_string).collect();
            writeln!(
                writer,
                "{:<16} {:<24} {}",
                rule.mount.to_string(),
                roles.join(","),
                actions.join(",")
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for SweepReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "Scanned {}, removed {}, failed {}",
            self.scanned, self.removed, self.failed
        )?;
        Ok(())
    }
}

impl TableDisplay for serde_json::Value {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match self {
            Self::Object(map) => {
                for (key, value) in map {
                    match value {
                        Self::String(s) => writeln!(writer, "{key}: {s}")?,
                        other => writeln!(writer, "{key}: {other}")?,
                    }
                }
            }
            other => writeln!(writer, "{other}")?,
        }
        Ok(())
    }
}
