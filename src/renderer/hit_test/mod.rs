//! GPU hit testing: which instance, if any, covers the pointer pixel.
//!
//! After the scene pass, a tiny pass copies the passthrough texels around
//! the pointer into a 3x3 target and one texel of that is copied to a
//! mappable buffer. The *optimized* mode reads the pixel a frame later
//! through a two-slot ring and never stalls; the synchronous mode waits for
//! the current frame.

mod readback;
mod region;
mod sample_select;

pub use readback::PixelTransferRing;
pub use region::HitRegion;
pub use sample_select::SampleSelectPass;

use readback::Transfer;

use super::frame::FrameParams;
use super::targets::RenderTargets;
use crate::error::RenderError;
use crate::gpu::shader_composer::ShaderComposer;

/// The first two passthrough bytes of the pixel under the pointer.
///
/// `(0, 0)` means no instance was hit (background, floor, or no pointer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HitTestResult {
    /// Low byte of the logical id.
    pub byte0: u8,
    /// High byte of the logical id.
    pub byte1: u8,
}

impl HitTestResult {
    /// No hit.
    pub const NONE: Self = Self { byte0: 0, byte1: 0 };

    /// Result carried by an RGBA8 passthrough pixel.
    #[must_use]
    pub fn from_pixel(pixel: [u8; 4]) -> Self {
        Self {
            byte0: pixel[0],
            byte1: pixel[1],
        }
    }

    /// The 16-bit logical id, little-endian over the two bytes.
    #[must_use]
    pub fn logical_id(self) -> u16 {
        u16::from_le_bytes([self.byte0, self.byte1])
    }

    /// Whether an instance was hit.
    #[must_use]
    pub fn is_hit(self) -> bool {
        self != Self::NONE
    }

    /// Index of the hit instance when ids were assigned by
    /// [`label_instances`](crate::scene::label::label_instances).
    #[must_use]
    pub fn instance_index(self) -> Option<usize> {
        self.logical_id().checked_sub(1).map(usize::from)
    }
}

/// Which readback path the current frame recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Delayed,
    Blocking,
}

impl Mode {
    fn from_params(params: &FrameParams) -> Self {
        if params.flags.optimized_hit_test {
            Self::Delayed
        } else {
            Self::Blocking
        }
    }
}

/// Sample-select pass, transfer ring, and the latest result.
pub struct HitTester {
    select: SampleSelectPass,
    ring: PixelTransferRing,
    result: HitTestResult,
    last_mode: Mode,
}

impl HitTester {
    /// Build the hit tester for `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::ShaderBuild`] if the sample-select shader
    /// fails to compose.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        targets: &RenderTargets,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            select: SampleSelectPass::new(device, composer, targets)?,
            ring: PixelTransferRing::new(device),
            result: HitTestResult::NONE,
            last_mode: Mode::Delayed,
        })
    }

    /// Follow a target reallocation. Transfers in flight refer to the old
    /// targets and are dropped along with the current result.
    pub fn rebind(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.ring.drain(device);
        self.select.rebind(device, targets);
        self.result = HitTestResult::NONE;
    }

    /// Record this frame's hit-test work. Returns whether a pixel copy was
    /// requested.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        params: &FrameParams,
    ) -> bool {
        let mode = Mode::from_params(params);
        if mode != self.last_mode {
            log::debug!("hit-test readback switched to {mode:?}");
            self.ring.drain(device);
            self.last_mode = mode;
        }
        if !params.flags.hit_test {
            return false;
        }
        let Some(region) = params
            .pointer
            .and_then(|pointer| HitRegion::around(pointer, targets.size()))
        else {
            return false;
        };
        self.select.encode(queue, encoder, targets, region);
        self.ring
            .request(encoder, &targets.hit_region.texture, region.pointer)
    }

    /// Collect whatever pixel became available for this frame's submission
    /// and update the stored result.
    pub fn after_submit(
        &mut self,
        device: &wgpu::Device,
        submission: wgpu::SubmissionIndex,
    ) {
        let transfer = match self.last_mode {
            Mode::Delayed => self.ring.advance(device, submission),
            Mode::Blocking => self.ring.read_now(device, submission),
        };
        match transfer {
            Transfer::Pixel(pixel) => {
                self.result = HitTestResult::from_pixel(pixel);
            }
            Transfer::Empty => self.result = HitTestResult::NONE,
            Transfer::Pending => {
                log::trace!("hit-test pixel still in flight; keeping result");
            }
        }
    }

    /// Latest hit-test result.
    #[must_use]
    pub fn result(&self) -> HitTestResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_the_zero_id() {
        assert_eq!(HitTestResult::NONE.logical_id(), 0);
        assert!(!HitTestResult::NONE.is_hit());
        assert_eq!(HitTestResult::NONE.instance_index(), None);
        assert_eq!(HitTestResult::default(), HitTestResult::NONE);
    }

    #[test]
    fn pixel_bytes_form_little_endian_id() {
        let hit = HitTestResult::from_pixel([0x34, 0x12, 0, 255]);
        assert_eq!(hit.logical_id(), 0x1234);
        assert!(hit.is_hit());
        assert_eq!(hit.instance_index(), Some(0x1233));
    }

    #[test]
    fn rim_byte_does_not_affect_result() {
        let a = HitTestResult::from_pixel([5, 0, 0, 0]);
        let b = HitTestResult::from_pixel([5, 0, 0, 255]);
        assert_eq!(a, b);
    }

    #[test]
    fn mode_follows_flag() {
        let mut params = FrameParams::default();
        params.flags.optimized_hit_test = true;
        assert_eq!(Mode::from_params(&params), Mode::Delayed);
        params.flags.optimized_hit_test = false;
        assert_eq!(Mode::from_params(&params), Mode::Blocking);
    }
}
