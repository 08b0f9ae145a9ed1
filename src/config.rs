use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;
use crate::sets::Span;
use crate::table::MISSING;

pub const CONFIG_FILE: &str = "kira-omics.json";
pub const DEFAULT_CATALOG_URL: &str = "https://api.gdc.cancer.gov";
pub const DEFAULT_COHORT_PREFIX: &str = "TCGA-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BarcodeLayout {
    pub case: Span,
    pub sample: Span,
    pub aliquot: Span,
    pub category: Span,
}

impl Default for BarcodeLayout {
    fn default() -> Self {
        Self {
            case: Span::new(0, 12),
            sample: Span::new(0, 16),
            aliquot: Span::new(0, 28),
            category: Span::new(13, 15),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub catalog_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub cohort_prefix: Option<String>,
    #[serde(default)]
    pub missing_marker: Option<String>,
    #[serde(default)]
    pub barcode: Option<BarcodeLayout>,
    #[serde(default)]
    pub access: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub schema_version: u32,
    pub catalog_url: String,
    pub timeout_secs: u64,
    pub cohort_prefix: String,
    pub missing_marker: String,
    pub barcode: BarcodeLayout,
    pub access: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: 1,
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            timeout_secs: 60,
            cohort_prefix: DEFAULT_COHORT_PREFIX.to_string(),
            missing_marker: MISSING.to_string(),
            barcode: BarcodeLayout::default(),
            access: "open".to_string(),
        }
    }
}

impl Settings {
    pub fn is_cohort_project(&self, project: &str) -> bool {
        project.starts_with(&self.cohort_prefix)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path` when given; otherwise `./kira-omics.json`, then the user
    /// config directory, then built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<Settings, KiraError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::candidates().into_iter().find(|path| path.exists()),
        };

        let Some(config_path) = config_path else {
            tracing::debug!("no config file found, using defaults");
            return Ok(Settings::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;
        tracing::debug!(path = %config_path.display(), "loaded config");

        Self::resolve_config(config)
    }

    fn candidates() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dirs) = BaseDirs::new() {
            candidates.push(dirs.config_dir().join("kira-omics").join(CONFIG_FILE));
        }
        candidates
    }

    pub fn resolve_config(config: Config) -> Result<Settings, KiraError> {
        let defaults = Settings::default();

        let catalog_url = config
            .catalog_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.catalog_url);
        if !catalog_url.starts_with("http://") && !catalog_url.starts_with("https://") {
            return Err(KiraError::ConfigParse(format!(
                "catalog_url must be an http(s) URL: {catalog_url}"
            )));
        }

        let barcode = config.barcode.unwrap_or(defaults.barcode);
        for (name, span) in [
            ("case", barcode.case),
            ("sample", barcode.sample),
            ("aliquot", barcode.aliquot),
            ("category", barcode.category),
        ] {
            if span.start > span.end {
                return Err(KiraError::ConfigParse(format!(
                    "barcode.{name} span starts after it ends"
                )));
            }
        }

        let cohort_prefix = config
            .cohort_prefix
            .map(|prefix| prefix.to_uppercase())
            .unwrap_or(defaults.cohort_prefix);

        Ok(Settings {
            schema_version: config.schema_version.unwrap_or(defaults.schema_version),
            catalog_url,
            timeout_secs: config.timeout_secs.unwrap_or(defaults.timeout_secs),
            cohort_prefix,
            missing_marker: config.missing_marker.unwrap_or(defaults.missing_marker),
            barcode,
            access: config.access.unwrap_or(defaults.access),
        })
    }
}
