//! Placement of the sampled region around the pointer.

use crate::renderer::targets::HIT_REGION_SIZE;

/// Where the 3x3 hit-test region sits in the passthrough target, and which
/// of its texels lies under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitRegion {
    /// Top-left texel of the region in target pixels.
    pub origin: (u32, u32),
    /// Pointer texel relative to `origin`.
    pub pointer: (u32, u32),
}

impl HitRegion {
    /// Region centred on `pointer` where possible, shifted inward at the
    /// target's edges. `None` when the pointer is outside a `size` target.
    #[must_use]
    pub fn around(pointer: (u32, u32), size: (u32, u32)) -> Option<Self> {
        let (x, y) = pointer;
        if x >= size.0 || y >= size.1 {
            return None;
        }
        let ox = clamp_origin(x, size.0);
        let oy = clamp_origin(y, size.1);
        Some(Self {
            origin: (ox, oy),
            pointer: (x - ox, y - oy),
        })
    }
}

fn clamp_origin(coord: u32, extent: u32) -> u32 {
    let max_origin = extent.saturating_sub(HIT_REGION_SIZE);
    coord.saturating_sub(1).min(max_origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_pointer_is_centred() {
        let region = HitRegion::around((50, 20), (100, 100)).unwrap();
        assert_eq!(region.origin, (49, 19));
        assert_eq!(region.pointer, (1, 1));
    }

    #[test]
    fn edges_shift_the_region_inward() {
        let top_left = HitRegion::around((0, 0), (100, 100)).unwrap();
        assert_eq!(top_left.origin, (0, 0));
        assert_eq!(top_left.pointer, (0, 0));

        let bottom_right = HitRegion::around((99, 99), (100, 100)).unwrap();
        assert_eq!(bottom_right.origin, (97, 97));
        assert_eq!(bottom_right.pointer, (2, 2));
    }

    #[test]
    fn pointer_outside_target_has_no_region() {
        assert_eq!(HitRegion::around((100, 5), (100, 100)), None);
        assert_eq!(HitRegion::around((5, 480), (640, 480)), None);
    }

    #[test]
    fn tiny_targets_pin_region_to_origin() {
        let region = HitRegion::around((1, 0), (2, 1)).unwrap();
        assert_eq!(region.origin, (0, 0));
        assert_eq!(region.pointer, (1, 0));
    }
}
