use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Background, rim, and overlay appearance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Colors", inline)]
#[serde(default)]
pub struct ColorOptions {
    /// RGBA the color target is cleared to.
    #[schemars(title = "Background")]
    pub background: [f32; 4],
    /// RGBA of the rim overlay; alpha scales its opacity.
    #[schemars(title = "Rim Color")]
    pub rim_color: [f32; 4],
    /// Rim width as a fraction of the output width.
    #[schemars(title = "Rim Thickness", range(min = 0.0, max = 0.1), extend("step" = 0.0005))]
    pub rim_thickness: f32,
    /// Length of normal overlay lines in world units.
    #[schemars(skip)]
    pub normal_length: f32,
}

impl Default for ColorOptions {
    fn default() -> Self {
        Self {
            background: [0.89, 0.89, 0.89, 1.0],
            rim_color: [1.0, 0.4, 0.0, 0.85],
            rim_thickness: 0.0025,
            normal_length: 0.1,
        }
    }
}
