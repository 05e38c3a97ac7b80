use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Point light and Gouraud shading parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Lighting", inline)]
#[serde(default)]
pub struct LightingOptions {
    /// World-space position of the point light.
    #[schemars(title = "Light Position")]
    pub light_position: [f32; 3],
    /// Linear RGB light color.
    #[schemars(title = "Light Color")]
    pub light_color: [f32; 3],
    /// Fraction of the light color applied regardless of orientation.
    #[schemars(title = "Ambient", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub ambient_strength: f32,
    /// Weight of the specular highlight.
    #[schemars(title = "Specular", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub specular_strength: f32,
    /// Specular exponent.
    #[schemars(skip)]
    pub shininess: f32,
}

impl Default for LightingOptions {
    fn default() -> Self {
        Self {
            light_position: [1.5, 3.0, 0.0],
            light_color: [248.0 / 255.0, 247.0 / 255.0, 247.0 / 255.0],
            ambient_strength: 0.5,
            specular_strength: 0.1,
            shininess: 32.0,
        }
    }
}
