use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_PREFIX: &str = "out_";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Accepts the names below or Python's `csv.QUOTE_*` codes (0-3), so
/// existing poller configs load unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "QuotingRepr")]
pub enum Quoting {
    /// Quote only fields that need it.
    #[default]
    Minimal,
    All,
    NonNumeric,
    Never,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuotingRepr {
    Code(u64),
    Name(String),
}

impl TryFrom<QuotingRepr> for Quoting {
    type Error = String;

    fn try_from(raw: QuotingRepr) -> Result<Self, Self::Error> {
        match raw {
            QuotingRepr::Code(0) => Ok(Self::Minimal),
            QuotingRepr::Code(1) => Ok(Self::All),
            QuotingRepr::Code(2) => Ok(Self::NonNumeric),
            QuotingRepr::Code(3) => Ok(Self::Never),
            QuotingRepr::Code(code) => Err(format!("unknown quoting code {code}, expected 0-3")),
            QuotingRepr::Name(name) => match name.trim().to_ascii_lowercase().as_str() {
                "minimal" => Ok(Self::Minimal),
                "all" => Ok(Self::All),
                "non_numeric" => Ok(Self::NonNumeric),
                "none" => Ok(Self::Never),
                other => Err(format!(
                    "unknown quoting {other:?}, expected minimal, all, non_numeric or none"
                )),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvDialect {
    pub delimiter: u8,
    pub quote: u8,
    pub quoting: Quoting,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            delimiter: b';',
            quote: b'"',
            quoting: Quoting::Minimal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub endpoint: Url,
    pub csv: CsvDialect,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "OUTPUT_FILE_DIR")]
    output_file_dir: PathBuf,
    #[serde(rename = "OUTPUT_FILE_PREFIX", default)]
    output_file_prefix: Option<String>,
    #[serde(rename = "ENDPOINT")]
    endpoint: String,
    #[serde(rename = "CSV_PARAMS", default)]
    csv_params: Option<CsvParams>,
    #[serde(rename = "REQUEST_TIMEOUT_SECONDS", default)]
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CsvParams {
    #[serde(default)]
    delimiter: Option<String>,
    #[serde(default)]
    quotechar: Option<String>,
    #[serde(default)]
    quoting: Option<Quoting>,
}

impl Config {
    /// Loads the YAML file named by `CONFIG_FILE` (default `config.yaml`).
    pub fn from_env() -> Result<Self> {
        let path = PathBuf::from(env_string("CONFIG_FILE", Some(DEFAULT_CONFIG_PATH.to_string()))?);
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let parsed: ConfigFile = serde_yaml::from_str(raw).context("parse config yaml")?;

        let endpoint = Url::parse(parsed.endpoint.trim()).context("invalid ENDPOINT")?;

        let defaults = CsvDialect::default();
        let params = parsed.csv_params.unwrap_or_default();
        let csv = CsvDialect {
            delimiter: match params.delimiter.as_deref() {
                Some(raw) => single_byte("CSV_PARAMS.delimiter", raw)?,
                None => defaults.delimiter,
            },
            quote: match params.quotechar.as_deref() {
                Some(raw) => single_byte("CSV_PARAMS.quotechar", raw)?,
                None => defaults.quote,
            },
            quoting: params.quoting.unwrap_or(defaults.quoting),
        };

        let timeout_secs = parsed
            .request_timeout_seconds
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(anyhow!("REQUEST_TIMEOUT_SECONDS must be positive"));
        }

        Ok(Self {
            output_dir: parsed.output_file_dir,
            output_prefix: parsed
                .output_file_prefix
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            endpoint,
            csv,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn single_byte(key: &str, raw: &str) -> Result<u8> {
    match raw.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(anyhow!("{key} must be a single ASCII character, got {raw:?}")),
    }
}

fn env_string(key: &str, default: Option<String>) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}
