//! Optional JSON configuration. Every field has a default, so an empty object
//! (or no file at all) is a valid configuration.

use crate::error::ConfigError;
use crate::highlight::{Palette, ACCEPTED_COLOR, HIGHLIGHT_COLOR, PENDING_COLOR};
use crate::scene::{Rgba, DEFAULT_ID_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeoffConfig {
    /// Model id the viewer prefixes entity ids with.
    pub model_id: Option<String>,
    pub id_separator: String,
    pub highlight_color: Rgba,
    pub accepted_color: Rgba,
    pub pending_color: Rgba,
    /// Chapter ids whose budget has been accepted.
    pub accepted_chapters: HashSet<String>,
}

impl Default for TakeoffConfig {
    fn default() -> Self {
        Self {
            model_id: None,
            id_separator: DEFAULT_ID_SEPARATOR.to_string(),
            highlight_color: HIGHLIGHT_COLOR,
            accepted_color: ACCEPTED_COLOR,
            pending_color: PENDING_COLOR,
            accepted_chapters: HashSet::new(),
        }
    }
}

impl TakeoffConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::FileRead {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, color) in [
            ("highlight_color", &self.highlight_color),
            ("accepted_color", &self.accepted_color),
            ("pending_color", &self.pending_color),
        ] {
            if color.iter().any(|c| !(0.0..=1.0).contains(c)) {
                return Err(ConfigError::InvalidColor { name });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn palette(&self) -> Palette {
        Palette {
            highlight: self.highlight_color,
            accepted: self.accepted_color,
            pending: self.pending_color,
        }
    }

    #[must_use]
    pub fn is_chapter_accepted(&self, chapter_id: &str) -> bool {
        self.accepted_chapters.contains(chapter_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let config: TakeoffConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TakeoffConfig::default());
        assert_eq!(config.id_separator, "#");
    }

    #[test]
    fn test_out_of_range_colour_is_rejected() {
        let config: TakeoffConfig =
            serde_json::from_str(r#"{"highlight_color":[2.0,0.0,0.0,1.0]}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidColor {
                name: "highlight_color"
            })
        ));
    }
}
