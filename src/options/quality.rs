use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Render target quality settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Quality", inline)]
#[serde(default)]
pub struct QualityOptions {
    /// MSAA samples per pixel for the scene targets.
    #[schemars(title = "MSAA Samples", range(min = 1, max = 16))]
    pub sample_count: u32,
}

impl Default for QualityOptions {
    fn default() -> Self {
        Self { sample_count: 4 }
    }
}
