use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Knobs of the rule battery. `Default` is the production setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Ship-to state whose transactions need a valid customer license
    pub license_jurisdiction: String,

    /// State CS license numbers are exactly this many digits
    pub license_number_len: usize,

    /// Catalog codes are truncated to this length to find MME references
    pub reference_prefix_len: usize,

    /// Warehouse TINs are exactly this many digits once dashes are removed
    pub tax_id_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            license_jurisdiction: "NY".to_string(),
            license_number_len: 7,
            reference_prefix_len: 9,
            tax_id_len: 9,
        }
    }
}

/// Runtime configuration loaded from environment variables.
///
/// | Env Var                           | Default         |
/// |-----------------------------------|-----------------|
/// | `COMPLIANCE_DB_PATH`              | `compliance.db` |
/// | `COMPLIANCE_DATA_DIR`             | `data`          |
/// | `COMPLIANCE_LICENSE_JURISDICTION` | `NY`            |
/// | `COMPLIANCE_BUSY_TIMEOUT_MS`      | `5000`          |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub busy_timeout: Duration,
    pub validation: ValidationConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("COMPLIANCE_DB_PATH").unwrap_or_else(|| "compliance.db".into());
        let data_dir = lookup("COMPLIANCE_DATA_DIR").unwrap_or_else(|| "data".into());

        let busy_timeout_ms: u64 = lookup("COMPLIANCE_BUSY_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("COMPLIANCE_BUSY_TIMEOUT_MS must be a whole number of milliseconds")?;

        let mut validation = ValidationConfig::default();
        if let Some(jurisdiction) = lookup("COMPLIANCE_LICENSE_JURISDICTION") {
            let jurisdiction = jurisdiction.trim();
            if !jurisdiction.is_empty() {
                validation.license_jurisdiction = jurisdiction.to_string();
            }
        }

        Ok(AppConfig {
            db_path: PathBuf::from(db_path),
            data_dir: PathBuf::from(data_dir),
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            validation,
        })
    }
}
