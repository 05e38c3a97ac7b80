use std::borrow::Cow;
use std::collections::HashMap;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor,
    ShaderDefValue, ShaderLanguage, ShaderType,
};

use crate::error::RenderError;

/// Every shader the renderer builds pipelines from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shader {
    /// Instanced meshes into the color and passthrough targets.
    Scene,
    /// Chequered ground plane.
    Floor,
    /// Per-vertex normal line overlay.
    Normals,
    /// Copies the 3x3 passthrough region under the pointer.
    SampleSelect,
    /// Resolved color image onto the destination.
    Present,
    /// Edge-detected rim overlay from passthrough alpha.
    Rim,
    /// Corner quads visualising the passthrough image.
    Diagnostics,
}

impl Shader {
    /// All shaders, for composition checks.
    pub const ALL: [Self; 7] = [
        Self::Scene,
        Self::Floor,
        Self::Normals,
        Self::SampleSelect,
        Self::Present,
        Self::Rim,
        Self::Diagnostics,
    ];

    /// Path of the shader below `assets/shaders/`.
    pub fn file_path(self) -> &'static str {
        match self {
            Self::Scene => "raster/scene.wgsl",
            Self::Floor => "raster/floor.wgsl",
            Self::Normals => "raster/normals.wgsl",
            Self::SampleSelect => "screen/sample_select.wgsl",
            Self::Present => "screen/present.wgsl",
            Self::Rim => "screen/rim.wgsl",
            Self::Diagnostics => "screen/diagnostics.wgsl",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::Scene => {
                include_str!("../../assets/shaders/raster/scene.wgsl")
            }
            Self::Floor => {
                include_str!("../../assets/shaders/raster/floor.wgsl")
            }
            Self::Normals => {
                include_str!("../../assets/shaders/raster/normals.wgsl")
            }
            Self::SampleSelect => {
                include_str!("../../assets/shaders/screen/sample_select.wgsl")
            }
            Self::Present => {
                include_str!("../../assets/shaders/screen/present.wgsl")
            }
            Self::Rim => include_str!("../../assets/shaders/screen/rim.wgsl"),
            Self::Diagnostics => {
                include_str!("../../assets/shaders/screen/diagnostics.wgsl")
            }
        }
    }
}

/// Shared module definition registered with the composer.
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Shared modules, in dependency order.
const MODULES: [ModuleDef; 2] = [
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
        file_path: "modules/fullscreen.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/frame.wgsl"),
        file_path: "modules/frame.wgsl",
    },
];

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` and `#ifdef` support.
///
/// Consuming shaders use `#import rimrender::module_name` to pull in shared
/// code. The composer produces `naga::Module` IR directly, skipping a WGSL
/// re-parse inside wgpu. It is a validating composer: every module it
/// returns has passed `naga::valid::Validator`, and a module that fails
/// validation comes back as [`RenderError::ShaderBuild`] with the diagnostic.
pub struct ShaderComposer {
    composer: Composer,
}

impl ShaderComposer {
    /// Create a composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderBuild`] if a shared module fails to
    /// parse.
    pub fn new() -> Result<Self, RenderError> {
        let mut composer = Composer::default();
        for module in &MODULES {
            let added = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: module.source,
                    file_path: module.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map(|_| ());
            if let Err(e) = added {
                return Err(RenderError::ShaderBuild {
                    shader: module.file_path,
                    diagnostic: e.emit_to_string(&composer),
                });
            }
        }
        Ok(Self { composer })
    }

    /// Compose `shader` with the given boolean shader defs into a
    /// `wgpu::ShaderModule` ready for pipeline creation.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderBuild`] with the rendered diagnostic if
    /// composition or validation fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        shader: Shader,
        defs: &[&str],
    ) -> Result<wgpu::ShaderModule, RenderError> {
        let module = self.compose_naga(shader, defs)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.file_path()),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
        }))
    }

    /// Compose `shader` into a `naga::Module` without creating a wgpu shader
    /// module. Useful for testing shader composition without a GPU device.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderBuild`] if composition or validation
    /// fails.
    pub fn compose_naga(
        &mut self,
        shader: Shader,
        defs: &[&str],
    ) -> Result<naga::Module, RenderError> {
        self.make_module(shader.source(), shader.file_path(), defs)
    }

    fn make_module(
        &mut self,
        source: &str,
        file_path: &'static str,
        defs: &[&str],
    ) -> Result<naga::Module, RenderError> {
        let shader_defs: HashMap<String, ShaderDefValue> = defs
            .iter()
            .map(|&def| (def.to_owned(), ShaderDefValue::Bool(true)))
            .collect();
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                shader_defs,
                ..Default::default()
            })
            .map_err(|e| RenderError::ShaderBuild {
                shader: file_path,
                diagnostic: e.emit_to_string(&self.composer),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_shaders_compose() {
        let mut composer = ShaderComposer::new().unwrap();
        for shader in Shader::ALL {
            if let Err(e) = composer.compose_naga(shader, &[]) {
                panic!("{e}");
            }
        }
    }

    #[test]
    fn invalid_modules_fail_validation() {
        let mut composer = ShaderComposer::new().unwrap();
        assert!(composer.composer.validate);
        // Parses, but bool is not a valid fragment output type.
        let source = "@fragment\nfn fs_main() -> @location(0) bool {\n    return true;\n}\n";
        let err = composer.make_module(source, "invalid.wgsl", &[]).unwrap_err();
        let RenderError::ShaderBuild { shader, diagnostic } = err else {
            panic!("expected a shader build error");
        };
        assert_eq!(shader, "invalid.wgsl");
        assert!(!diagnostic.is_empty());
    }

    #[test]
    fn sample_select_composes_multisampled() {
        let mut composer = ShaderComposer::new().unwrap();
        let module = composer
            .compose_naga(Shader::SampleSelect, &["MULTISAMPLED"])
            .unwrap();
        let multisampled = module.types.iter().any(|(_, ty)| {
            matches!(
                ty.inner,
                naga::TypeInner::Image {
                    class: naga::ImageClass::Sampled { multi: true, .. },
                    ..
                }
            )
        });
        assert!(multisampled);
    }

    #[test]
    fn scene_shader_writes_two_targets() {
        let mut composer = ShaderComposer::new().unwrap();
        let module = composer.compose_naga(Shader::Scene, &[]).unwrap();
        let fragment = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == naga::ShaderStage::Fragment)
            .unwrap();
        let result = fragment.function.result.as_ref().unwrap();
        let naga::TypeInner::Struct { members, .. } =
            &module.types[result.ty].inner
        else {
            panic!("fragment output is not a struct");
        };
        assert_eq!(members.len(), 2);
    }
}
