//! Verification limits and policy switches.
//!
//! Stored as a versioned JSON document:
//!
//! ```json
//! { "version": 1, "config": { "max_examined": 64, ... } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

// ── File format constants ─────────────────────────────────────────────────────

const CONFIG_FILE_VERSION: u32 = 1;

/// Default budget of objects examined in one top-level verification.
pub const DEFAULT_MAX_EXAMINED: usize = 64;

/// Default nesting allowed for constraint alternatives: alternatives may
/// hold plain constraints only.
pub const DEFAULT_MAX_ALTERNATIVE_DEPTH: usize = 1;

/// Limits applied to trust verification and constraint resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Objects (candidates and nested verifications) one top-level
    /// verification may examine before failing closed.
    pub max_examined: usize,
    /// Require a bootstrap candidate to be trusted by the context before
    /// asking it for its verifier.
    pub require_trusted_bootstrap: bool,
    /// How deeply constraint alternatives may nest before they resolve as
    /// unsupported.
    pub max_alternative_depth: usize,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            max_examined: DEFAULT_MAX_EXAMINED,
            require_trusted_bootstrap: false,
            max_alternative_depth: DEFAULT_MAX_ALTERNATIVE_DEPTH,
        }
    }
}

// ── On-disk structure ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    version: u32,
    config: TrustConfig,
}

impl TrustConfig {
    /// Load a config file.
    ///
    /// # Errors
    ///
    /// Returns `TrustError::Io` if the file cannot be read,
    /// `TrustError::Serialization` if it is not valid JSON, or
    /// `TrustError::InvalidData` for an unsupported version.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Parse a config document.
    pub fn from_json(data: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(data)?;
        if file.version != CONFIG_FILE_VERSION {
            return Err(TrustError::InvalidData(format!(
                "unsupported config version {}, expected {CONFIG_FILE_VERSION}",
                file.version
            )));
        }
        Ok(file.config)
    }

    /// Serialize to the versioned document form.
    pub fn to_json(&self) -> Result<String> {
        let file = ConfigFile {
            version: CONFIG_FILE_VERSION,
            config: self.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Write the config to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
