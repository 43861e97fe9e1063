//! Project configuration loader for link rewriting and carousel timing.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::carousel::CarouselSettings;
use crate::href::HrefRewriter;
use crate::selection::DEFAULT_SELECTION_FILE;

/// File name searched for when no explicit configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "page-behaviors.json";

/// Discoverable configuration shared by the link rewriter and the carousel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// URL prefix identifying internally rewritable links.
    pub base_path: String,
    /// File extensions (without the dot) treated as HTML pages during a site pass.
    pub html_extensions: Vec<String>,
    /// Optional JSON file describing which pages a site pass should rewrite.
    pub selection_file: String,
    /// Carousel timing.
    pub carousel: CarouselConfig,
}

/// Carousel timing values in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    /// Period between automatic advances.
    pub autoplay_interval_ms: u64,
    /// How long navigation stays locked after a transition starts.
    pub settle_delay_ms: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            base_path: "/src/pages".into(),
            html_extensions: vec!["html".into(), "htm".into()],
            selection_file: DEFAULT_SELECTION_FILE.into(),
            carousel: CarouselConfig::default(),
        }
    }
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            autoplay_interval_ms: 3000,
            settle_delay_ms: 800,
        }
    }
}

impl BehaviorConfig {
    /// Attempt to load configuration from the provided directory.
    ///
    /// A missing file yields the defaults. A file that cannot be read or parsed is logged and
    /// also falls back to the defaults so callers can keep operating.
    pub fn discover(dir: &Path) -> Self {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if !candidate.exists() {
            return Self::default();
        }

        match Self::from_path(&candidate) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %candidate.display(), error = ?err, "ignoring configuration");
                Self::default()
            }
        }
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Link rewriter for the configured base path.
    pub fn rewriter(&self) -> HrefRewriter {
        HrefRewriter::new(self.base_path.clone())
    }

    /// Path of the selection file relative to the configuration directory.
    pub fn selection_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.selection_file)
    }

    /// Returns `true` when the file name carries one of the configured HTML extensions.
    pub fn is_html_page(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.html_extensions
                    .iter()
                    .any(|candidate| candidate.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}

impl From<CarouselConfig> for CarouselSettings {
    fn from(config: CarouselConfig) -> Self {
        CarouselSettings {
            autoplay_interval: Duration::from_millis(config.autoplay_interval_ms),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn discovers_defaults_when_missing() {
        let dir = tempdir().unwrap();
        let config = BehaviorConfig::discover(dir.path());

        assert_eq!(config, BehaviorConfig::default());
        assert_eq!(config.base_path, "/src/pages");
        assert_eq!(config.carousel.autoplay_interval_ms, 3000);
        assert_eq!(config.carousel.settle_delay_ms, 800);
    }

    #[test]
    fn partial_files_keep_remaining_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            r#"{"base_path": "/docs", "carousel": {"settle_delay_ms": 250}}"#,
        )
        .unwrap();

        let config = BehaviorConfig::discover(dir.path());
        assert_eq!(config.base_path, "/docs");
        assert_eq!(config.html_extensions, vec!["html", "htm"]);
        assert_eq!(config.carousel.autoplay_interval_ms, 3000);
        assert_eq!(config.carousel.settle_delay_ms, 250);
    }

    #[test]
    fn discover_falls_back_on_invalid_json() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "{ nope").unwrap();

        assert_eq!(BehaviorConfig::discover(dir.path()), BehaviorConfig::default());
        assert!(BehaviorConfig::from_path(&dir.path().join(DEFAULT_CONFIG_FILE)).is_err());
    }

    #[test]
    fn recognises_configured_page_extensions() {
        let config = BehaviorConfig {
            html_extensions: vec![".HTML".into()],
            ..BehaviorConfig::default()
        };

        assert!(config.is_html_page(Path::new("a/b/page.html")));
        assert!(!config.is_html_page(Path::new("page.htm")));
        assert!(!config.is_html_page(Path::new("README")));
    }

    #[test]
    fn converts_carousel_timing() {
        let settings = CarouselSettings::from(CarouselConfig {
            autoplay_interval_ms: 5000,
            settle_delay_ms: 400,
        });

        assert_eq!(settings.autoplay_interval, Duration::from_millis(5000));
        assert_eq!(settings.settle_delay, Duration::from_millis(400));
    }
}
