use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-frame feature toggles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Draw Flags", inline)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DrawFlags {
    /// Rasterize scene meshes as lines (needs `POLYGON_MODE_LINE`).
    #[schemars(title = "Wireframe")]
    pub wireframe: bool,
    /// Overlay a line along every vertex normal.
    #[schemars(title = "Show Normals")]
    pub show_normals: bool,
    /// Draw the chequered ground plane.
    #[schemars(title = "Show Floor")]
    pub show_floor: bool,
    /// Edge-detect the passthrough alpha into a rim overlay.
    #[schemars(title = "Draw Rims")]
    pub draw_rims: bool,
    /// Draw passthrough diagnostic quads in the top-right corner.
    #[schemars(title = "Diagnostics")]
    pub diagnostics: bool,
    /// Read back the passthrough id under the pointer.
    #[schemars(title = "Hit Test")]
    pub hit_test: bool,
    /// Read the hit-test pixel one frame late instead of stalling.
    #[schemars(title = "Delayed Hit Test")]
    pub optimized_hit_test: bool,
}

impl Default for DrawFlags {
    fn default() -> Self {
        Self {
            wireframe: false,
            show_normals: false,
            show_floor: false,
            draw_rims: true,
            diagnostics: false,
            hit_test: true,
            optimized_hit_test: true,
        }
    }
}
