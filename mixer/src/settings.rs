//! Mixer configuration loaded from TOML.
//!
//! ```toml
//! name = "dolly"
//!
//! [settings]
//! epsilon = 0.0001
//!
//! [[weights]]
//! source = "wide"
//! weight = 1.0
//!
//! [[weights]]
//! source = "close_up"
//! weight = 0.0
//! ```
//!
//! Weight rows name child sources; they are resolved against the list the
//! mixer's [`SourceProvider`] reports when the mixer is built.

use std::path::Path;

use mixcam_core::math::BLEND_EPSILON;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mixer::MixingCamera;
use crate::source::SourceProvider;
use crate::state::BlendState;
use crate::weights::WeightEntry;

/// Thresholds used by the blend pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    /// Weights at or below this value do not contribute, and a total at
    /// or below it reports 0% dominance.
    pub epsilon: f32,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            epsilon: BLEND_EPSILON,
        }
    }
}

/// One weight row of a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetWeight {
    /// Name of the child source.
    pub source: String,
    /// Weight to assign. Negative values are clamped on load.
    pub weight: f32,
}

/// Top-level mixer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Mixer name, also used in log messages.
    #[serde(default = "default_mixer_name")]
    pub name: String,
    /// Blend thresholds.
    #[serde(default)]
    pub settings: MixerSettings,
    /// Weight rows in blend order.
    #[serde(default)]
    pub weights: Vec<PresetWeight>,
}

fn default_mixer_name() -> String {
    "mixer".into()
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            name: default_mixer_name(),
            settings: MixerSettings::default(),
            weights: Vec::new(),
        }
    }
}

/// Parses a mixer configuration from TOML text.
pub fn parse_config(text: &str) -> Result<MixerConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Loads a mixer configuration from a TOML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<MixerConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

/// Loads a mixer configuration, falling back to the default if the file is
/// missing or invalid.
pub fn load_or_default(path: impl AsRef<Path>) -> MixerConfig {
    match load_config(path) {
        Ok(config) => {
            log::info!(
                "Loaded mixer config '{}' ({} weights)",
                config.name,
                config.weights.len()
            );
            config
        }
        Err(e) => {
            log::warn!("No mixer config ({e}), using defaults");
            MixerConfig::default()
        }
    }
}

impl<S: BlendState + Default + 'static> MixingCamera<S> {
    /// Builds a mixer from `config`, resolving weight rows by name against
    /// the children reported by `provider`.
    ///
    /// Rows naming an unknown child are logged and skipped; the first child
    /// with a matching name wins. Weights are validated after loading.
    pub fn from_config(config: &MixerConfig, provider: impl SourceProvider<S> + 'static) -> Self {
        let mixer =
            Self::with_settings(config.name.clone(), config.settings).with_provider(provider);

        let children = mixer.child_sources();
        let mut entries = Vec::with_capacity(config.weights.len());
        for row in &config.weights {
            let child = children
                .iter()
                .filter_map(|handle| handle.upgrade())
                .find(|child| child.name() == row.source);
            match child {
                Some(child) => entries.push(WeightEntry::new(&child, row.weight)),
                None => log::warn!(
                    "Mixer '{}': no child source named '{}'",
                    config.name,
                    row.source
                ),
            }
        }
        mixer.set_entries(entries);

        log::info!(
            "Mixer '{}' created with {} of {} configured sources",
            mixer.name(),
            mixer.entry_count(),
            config.weights.len()
        );
        mixer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, MixerConfig::default());
        assert_eq!(config.settings.epsilon, BLEND_EPSILON);
    }

    #[test]
    fn partial_settings_keep_other_defaults() {
        let config = parse_config(
            r#"
            name = "dolly"

            [settings]
            epsilon = 0.01

            [[weights]]
            source = "wide"
            weight = 1.0

            [[weights]]
            source = "close_up"
            weight = -2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "dolly");
        assert_eq!(config.settings.epsilon, 0.01);
        assert_eq!(config.weights.len(), 2);
        assert_eq!(config.weights[1].source, "close_up");
        assert_eq!(config.weights[1].weight, -2.0);
    }

    #[test]
    fn malformed_config_is_a_parse_error() {
        let err = parse_config("weights = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config("/nonexistent/mixer.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(load_or_default("/nonexistent/mixer.toml"), MixerConfig::default());
    }
}
