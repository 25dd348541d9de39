use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::constants::{
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_LOG_DIR, DEFAULT_MARKER_PHRASE, DEFAULT_REPORT_TITLE,
};
use crate::error::{AuditError, Result};
use crate::pipeline::processing::classify::{RiskLookupTable, RiskPreset, RiskRule, DEFAULT_RISK_TABLE};
use crate::pipeline::processing::mapper::{HeaderRule, HeaderSynonym, SynonymTable, DEFAULT_SYNONYMS};
use crate::types::CanonicalField;

/// On-disk shape of `autoaudit.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    marker_phrase: Option<String>,
    sheet: Option<String>,
    #[serde(default)]
    required_fields: Vec<CanonicalField>,
    header_exact: Option<Vec<HeaderSynonym>>,
    header_keywords: Option<Vec<HeaderRule>>,
    risk_preset: Option<RiskPreset>,
    risk_rules: Option<Vec<RiskRule>>,
    #[serde(default)]
    report: ReportConfig,
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default = "default_report_title")]
    pub title: String,
}

fn default_report_title() -> String {
    DEFAULT_REPORT_TITLE.to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
        }
    }
}

/// Resolved, validated configuration. Tables are shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub marker_phrase: String,
    pub sheet: Option<String>,
    pub required_fields: Vec<CanonicalField>,
    pub synonyms: Arc<SynonymTable>,
    pub risk_table: Arc<RiskLookupTable>,
    pub report: ReportConfig,
    pub log_dir: PathBuf,
    /// File the configuration was read from, if any.
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marker_phrase: DEFAULT_MARKER_PHRASE.to_string(),
            sheet: None,
            required_fields: Vec::new(),
            synonyms: Arc::clone(&DEFAULT_SYNONYMS),
            risk_table: Arc::clone(&DEFAULT_RISK_TABLE),
            report: ReportConfig::default(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            source: None,
        }
    }
}

impl Config {
    /// Resolution order: explicit path, `$AUTOAUDIT_CONFIG`, `./autoaudit.toml`, built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Self::from_path(Path::new(path.trim()));
            }
        }
        let local = Path::new(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::from_path(local);
        }
        debug!("no configuration file found; using built-in tables");
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AuditError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "loaded configuration");
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(content)?;
        Self::resolve(file)
    }

    fn resolve(file: FileConfig) -> Result<Self> {
        let defaults = Self::default();

        let marker_phrase = match file.marker_phrase {
            Some(marker) if marker.trim().is_empty() => {
                return Err(AuditError::Config("marker_phrase must not be empty".into()));
            }
            Some(marker) => marker.trim().to_string(),
            None => defaults.marker_phrase,
        };

        if let Some(derived) = file.required_fields.iter().find(|f| f.is_derived()) {
            return Err(AuditError::Config(format!(
                "required_fields cannot include derived field '{}'",
                derived
            )));
        }

        let synonyms = match (file.header_exact, file.header_keywords) {
            (None, None) => defaults.synonyms,
            (exact, keywords) => {
                let builtin = SynonymTable::builtin();
                Arc::new(SynonymTable::new(
                    exact.unwrap_or_else(|| builtin.exact().to_vec()),
                    keywords.unwrap_or_else(|| builtin.keywords().to_vec()),
                )?)
            }
        };

        let risk_table = match (file.risk_rules, file.risk_preset) {
            (Some(rules), _) => Arc::new(RiskLookupTable::new(rules)?),
            (None, Some(RiskPreset::English)) => Arc::new(RiskPreset::English.table()),
            (None, _) => defaults.risk_table,
        };

        Ok(Self {
            marker_phrase,
            sheet: file.sheet.filter(|s| !s.trim().is_empty()),
            required_fields: file.required_fields,
            synonyms,
            risk_table,
            report: file.report,
            log_dir: file.log_dir.unwrap_or(defaults.log_dir),
            source: None,
        })
    }
}
