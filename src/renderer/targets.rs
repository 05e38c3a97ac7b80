//! Size- and sample-count-dependent render targets, reallocated wholesale.

use crate::error::RenderError;
use crate::gpu::texture::RenderTexture;

/// Format of the shaded color target.
pub(crate) const COLOR_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Rgba8Unorm;
/// Format of the passthrough target: (b0, b1, unused, rim) as unorm bytes.
pub(crate) const PASSTHROUGH_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Rgba8Unorm;
/// Scene depth format.
pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Depth32Float;
/// Edge length of the square region sampled around the pointer.
pub(crate) const HIT_REGION_SIZE: u32 = 3;

/// A target drawn with N samples and read back single-sampled.
///
/// With one sample the scene draws straight into the resolved texture.
pub struct ResolvedTarget {
    multisampled: Option<RenderTexture>,
    resolved: RenderTexture,
}

impl ResolvedTarget {
    fn new(
        device: &wgpu::Device,
        label: &str,
        size: (u32, u32),
        format: wgpu::TextureFormat,
        sample_count: u32,
        multisampled_usage: wgpu::TextureUsages,
    ) -> Self {
        let multisampled = (sample_count > 1).then(|| {
            RenderTexture::new(
                device,
                &format!("{label} (MSAA)"),
                size,
                format,
                sample_count,
                wgpu::TextureUsages::RENDER_ATTACHMENT | multisampled_usage,
            )
        });
        let resolved = RenderTexture::new(
            device,
            label,
            size,
            format,
            1,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        );
        Self {
            multisampled,
            resolved,
        }
    }

    /// View to draw into and the view it resolves to, if any.
    pub fn attachment(&self) -> (&wgpu::TextureView, Option<&wgpu::TextureView>) {
        match &self.multisampled {
            Some(ms) => (&ms.view, Some(&self.resolved.view)),
            None => (&self.resolved.view, None),
        }
    }

    /// View holding every stored sample.
    pub fn samples_view(&self) -> &wgpu::TextureView {
        self.multisampled
            .as_ref()
            .map_or(&self.resolved.view, |ms| &ms.view)
    }

    /// Single-sampled (averaged) result.
    pub fn resolved(&self) -> &RenderTexture {
        &self.resolved
    }
}

/// Color, passthrough, depth, and hit-region targets for one size and
/// sample count.
pub struct RenderTargets {
    width: u32,
    height: u32,
    sample_count: u32,
    /// Shaded scene color.
    pub color: ResolvedTarget,
    /// Per-instance passthrough bytes.
    pub passthrough: ResolvedTarget,
    /// Scene depth.
    pub depth: RenderTexture,
    /// 3x3 copy of the passthrough samples around the pointer.
    pub hit_region: RenderTexture,
}

impl RenderTargets {
    /// Check a requested allocation before touching the device.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidTargetSize`] for a zero dimension and
    /// [`RenderError::UnsupportedSampleCount`] for a sample count outside
    /// `supported`.
    pub fn validate(
        width: u32,
        height: u32,
        sample_count: u32,
        supported: &[u32],
    ) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTargetSize { width, height });
        }
        if !supported.contains(&sample_count) {
            return Err(RenderError::UnsupportedSampleCount(sample_count));
        }
        Ok(())
    }

    /// Allocate every target. Callers validate the dimensions first.
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Self {
        let size = (width, height);
        log::debug!("allocating {width}x{height} targets, {sample_count}x MSAA");
        Self {
            width,
            height,
            sample_count,
            color: ResolvedTarget::new(
                device,
                "Scene Color",
                size,
                COLOR_FORMAT,
                sample_count,
                wgpu::TextureUsages::empty(),
            ),
            passthrough: ResolvedTarget::new(
                device,
                "Passthrough",
                size,
                PASSTHROUGH_FORMAT,
                sample_count,
                wgpu::TextureUsages::TEXTURE_BINDING,
            ),
            depth: RenderTexture::new(
                device,
                "Scene Depth",
                size,
                DEPTH_FORMAT,
                sample_count,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            hit_region: RenderTexture::new(
                device,
                "Hit Region",
                (HIT_REGION_SIZE, HIT_REGION_SIZE),
                PASSTHROUGH_FORMAT,
                1,
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_SRC,
            ),
        }
    }

    /// Width and height in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Samples per pixel of the scene targets.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Whether the scene targets are multisampled.
    pub fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_targets_are_rejected() {
        assert!(matches!(
            RenderTargets::validate(0, 10, 1, &[1, 4]),
            Err(RenderError::InvalidTargetSize { width: 0, height: 10 })
        ));
    }

    #[test]
    fn sample_count_must_be_supported() {
        assert!(RenderTargets::validate(8, 8, 4, &[1, 4]).is_ok());
        assert!(matches!(
            RenderTargets::validate(8, 8, 8, &[1, 4]),
            Err(RenderError::UnsupportedSampleCount(8))
        ));
    }
}
