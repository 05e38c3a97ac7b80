//! Renderer defaults with TOML preset support.
//!
//! Lighting, colors, draw flags, and quality settings are consolidated here
//! and serialize to/from TOML. A [`FrameParams`](crate::renderer::FrameParams)
//! is usually built from these plus the caller's camera and pointer.

mod colors;
mod flags;
mod lighting;
mod quality;

use std::path::Path;

pub use colors::ColorOptions;
pub use flags::DrawFlags;
pub use lighting::LightingOptions;
pub use quality::QualityOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[flags]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct RenderOptions {
    /// Light and shading parameters.
    pub lighting: LightingOptions,
    /// Background, rim, and overlay appearance.
    pub colors: ColorOptions,
    /// Per-frame feature toggles.
    pub flags: DrawFlags,
    /// Render target quality.
    pub quality: QualityOptions,
}

impl RenderOptions {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(RenderOptions)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Io`] if the file cannot be read and
    /// [`RenderError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::OptionsParse`] on malformed input.
    pub fn from_toml(content: &str) -> Result<Self, RenderError> {
        toml::from_str(content)
            .map_err(|e| RenderError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::OptionsParse`] if serialization fails and
    /// [`RenderError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), RenderError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RenderError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = RenderOptions::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed = RenderOptions::from_toml(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[flags]
show_floor = true
";
        let opts = RenderOptions::from_toml(toml_str).unwrap();
        assert!(opts.flags.show_floor);
        // Everything else should be default
        assert!(opts.flags.draw_rims);
        assert!(opts.flags.optimized_hit_test);
        assert_eq!(opts.colors.background, [0.89, 0.89, 0.89, 1.0]);
        assert_eq!(opts.quality.sample_count, 4);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = RenderOptions::from_toml("[flags\nhit_test = 1").unwrap_err();
        assert!(matches!(err, RenderError::OptionsParse(_)));
    }

    #[test]
    fn save_then_load_and_list() {
        let dir = std::env::temp_dir()
            .join(format!("rimrender-presets-{}", std::process::id()));
        let mut opts = RenderOptions::default();
        opts.colors.rim_thickness = 0.01;
        opts.flags.wireframe = true;
        opts.save(&dir.join("outline.toml")).unwrap();

        let loaded = RenderOptions::load(&dir.join("outline.toml")).unwrap();
        assert_eq!(loaded, opts);
        assert_eq!(RenderOptions::list_presets(&dir), vec!["outline".to_owned()]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(RenderOptions::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();

        assert!(props.contains_key("lighting"));
        assert!(props.contains_key("colors"));
        assert!(props.contains_key("flags"));
        assert!(props.contains_key("quality"));

        // Exposed fields present, skipped ones absent
        let colors = &props["colors"]["properties"];
        assert!(colors.get("rim_thickness").is_some());
        assert!(colors.get("normal_length").is_none());
        let lighting = &props["lighting"]["properties"];
        assert!(lighting.get("ambient_strength").is_some());
        assert!(lighting.get("shininess").is_none());
    }
}
