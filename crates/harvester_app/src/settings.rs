use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use engine_logging::LogDestination;
use harvester_engine::{DriverSettings, ExportFormat, HarvestConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SETTINGS_FILE: &str = "harvester.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Terminal,
    File,
    #[default]
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub target: LogTarget,
    pub file: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            target: LogTarget::Both,
            file: PathBuf::from("harvester.log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub format: ExportFormat,
    /// Derived from the page URL when unset.
    pub filename: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            format: ExportFormat::Csv,
            filename: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub url: Option<String>,
    pub driver: DriverSettings,
    pub harvest: HarvestConfig,
    pub output: OutputSettings,
    pub log: LogSettings,
}

impl AppSettings {
    /// Reads RON, or JSON when the file ends in `.json`. A missing file yields defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading settings from {path:?}"));
            }
        };
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> anyhow::Result<Self> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let settings = if is_json {
            serde_json::from_str(content)
                .with_context(|| format!("parsing JSON settings {path:?}"))?
        } else {
            ron::from_str(content).with_context(|| format!("parsing RON settings {path:?}"))?
        };
        Ok(settings)
    }

    /// Command-line URL wins over the settings file.
    pub fn resolve_url(&self, cli_url: Option<String>) -> anyhow::Result<String> {
        match cli_url.or_else(|| self.url.clone()) {
            Some(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
            _ => bail!("no URL given: pass it as the second argument or set `url` in the settings file"),
        }
    }

    pub fn output_filename(&self, url: &str) -> String {
        self.output
            .filename
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| harvester_engine::output_filename(url, self.output.format))
    }
}
