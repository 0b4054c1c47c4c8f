//! Engine configuration.
//!
//! Every type deserializes from camelCase JSON or TOML with defaults for
//! missing fields, so hosts can keep clustering settings in their own
//! settings files:
//!
//! ```
//! use horizon_cluster::{ClusterConfig, RecomputeTrigger};
//!
//! let config = ClusterConfig::from_json_str(
//!     r#"{ "behavior": { "recomputeOn": "zoom", "debounceMs": 250 } }"#,
//! )
//! .unwrap();
//! assert!(config.enabled);
//! assert_eq!(config.behavior.recompute_on, RecomputeTrigger::Zoom);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;
use crate::map::ViewportEvent;

/// Debounce window applied when none is configured.
pub const DEFAULT_DEBOUNCE_MS: i64 = 100;

/// Which viewport signal requests a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecomputeTrigger {
    /// The map finished moving.
    #[default]
    Idle,
    /// The visible bounds changed.
    Move,
    /// The zoom level changed.
    Zoom,
}

impl RecomputeTrigger {
    /// The host event this trigger listens to.
    pub fn event(self) -> ViewportEvent {
        match self {
            Self::Idle => ViewportEvent::Idle,
            Self::Move => ViewportEvent::BoundsChanged,
            Self::Zoom => ViewportEvent::ZoomChanged,
        }
    }
}

/// When and how often to recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BehaviorConfig {
    pub recompute_on: RecomputeTrigger,
    /// Quiet period in milliseconds. Negative values act as zero; fractional
    /// input is rounded to the nearest millisecond.
    #[serde(deserialize_with = "deserialize_millis")]
    pub debounce_ms: i64,
}

/// Accept integer or fractional milliseconds.
fn deserialize_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Whole(i64),
        Fractional(f64),
    }

    Ok(match Millis::deserialize(deserializer)? {
        Millis::Whole(ms) => ms,
        // Saturating cast; NaN becomes zero.
        Millis::Fractional(ms) => ms.round() as i64,
    })
}

impl BehaviorConfig {
    pub fn new(recompute_on: RecomputeTrigger, debounce_ms: i64) -> Self {
        Self {
            recompute_on,
            debounce_ms,
        }
    }

    /// The effective debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.max(0).unsigned_abs())
    }

    /// Clamp out-of-range values, logging what was changed.
    pub fn normalized(self) -> Self {
        if self.debounce_ms < 0 {
            horizon_cluster_core::cluster_warn!(
                debounce_ms = self.debounce_ms,
                "negative debounce clamped to zero"
            );
            return Self {
                debounce_ms: 0,
                ..self
            };
        }
        self
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self::new(RecomputeTrigger::Idle, DEFAULT_DEBOUNCE_MS)
    }
}

/// How much cluster membership to hand to render callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterDataConfig {
    pub include_items: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items_in_cluster: Option<usize>,
}

impl ClusterDataConfig {
    /// Strip membership lists entirely.
    pub fn counts_only() -> Self {
        Self {
            include_items: false,
            max_items_in_cluster: None,
        }
    }

    /// Keep at most `max` members per cluster.
    pub fn with_max_items(max: usize) -> Self {
        Self {
            include_items: true,
            max_items_in_cluster: Some(max),
        }
    }
}

impl Default for ClusterDataConfig {
    fn default() -> Self {
        Self {
            include_items: true,
            max_items_in_cluster: None,
        }
    }
}

/// The non-algorithm configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterConfig {
    pub enabled: bool,
    pub behavior: BehaviorConfig,
    pub cluster_data: ClusterDataConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            behavior: BehaviorConfig::default(),
            cluster_data: ClusterDataConfig::default(),
        }
    }
}

impl ClusterConfig {
    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        Ok(config.normalized())
    }

    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        Ok(config.normalized())
    }

    /// Load a `.json` or `.toml` file, picking the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&source),
            Some("toml") => Self::from_toml_str(&source),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    fn normalized(self) -> Self {
        Self {
            behavior: self.behavior.normalized(),
            ..self
        }
    }
}
