//! Runtime configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no
//! file at all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tumen_types::MemberId;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    pub quorum: QuorumConfig,
    pub verification: VerificationConfig,
    pub notary: NotaryConfig,
}

/// Quorum document settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumConfig {
    /// Finalize and apply as soon as the threshold-reaching signature lands.
    /// When off, an explicit `finalize` call is required.
    pub auto_finalize: bool,
    /// Deadline applied to documents issued without an explicit one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_ttl_secs: Option<u64>,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            auto_finalize: true,
            default_ttl_secs: None,
        }
    }
}

/// Verification chain settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Peer attestations needed to verify a member
    pub peer_threshold: u32,
    /// Founder-mandate identities allowed to super-verify
    pub authorities: Vec<MemberId>,
    /// Cap on attestations a single verifier may give
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_verifications_per_verifier: Option<u32>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        let mut authorities = vec![MemberId::new("FOUNDER-001")];
        authorities.extend((2..=10).map(|n| MemberId::new(format!("MANDATE-{:03}", n))));
        Self {
            peer_threshold: 3,
            authorities,
            max_verifications_per_verifier: None,
        }
    }
}

/// Notary gate settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotaryConfig {
    /// A grant at a higher grade also authorizes every lower grade
    pub grades_are_monotonic: bool,
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            grades_are_monotonic: true,
        }
    }
}

impl HierarchyConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: HierarchyConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quorum.default_ttl_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "quorum.default_ttl_secs must be at least 1".into(),
            ));
        }
        if self.verification.peer_threshold == 0 {
            return Err(ConfigError::Invalid(
                "verification.peer_threshold must be at least 1".into(),
            ));
        }
        if self.verification.authorities.is_empty() {
            return Err(ConfigError::Invalid(
                "verification.authorities must not be empty".into(),
            ));
        }
        if self.verification.max_verifications_per_verifier == Some(0) {
            return Err(ConfigError::Invalid(
                "verification.max_verifications_per_verifier must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
