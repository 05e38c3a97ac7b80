//! Logical-id labelling for hit testing and rim selection.
//!
//! Instance `i` of the caller's list is labelled with id `i + 1`, leaving 0
//! as "nothing under the pointer". The label survives sorting, so a hit-test
//! result maps straight back to the caller's original index.

use super::{MeshInstance, Passthrough};
use crate::error::RenderError;

/// Rim state of a labelled instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    /// No rim.
    #[default]
    None,
    /// Faint rim under the pointer.
    Hovered,
    /// Full rim on the selection.
    Selected,
}

impl Highlight {
    /// Rim intensity byte written to the passthrough alpha channel.
    #[must_use]
    pub fn rim_intensity(self) -> u8 {
        match self {
            Self::None => 0,
            // 0.2 of full intensity
            Self::Hovered => 51,
            Self::Selected => 255,
        }
    }
}

/// Logical id for the instance at `index`.
///
/// # Errors
///
/// Returns [`RenderError::TooManyInstances`] if `index + 1` does not fit in
/// 16 bits.
pub fn logical_id(index: usize) -> Result<u16, RenderError> {
    index
        .checked_add(1)
        .and_then(|id| u16::try_from(id).ok())
        .ok_or(RenderError::TooManyInstances(index.saturating_add(1)))
}

/// Write `index + 1` and the rim intensity chosen by `highlight` into each
/// instance's passthrough bytes.
///
/// # Errors
///
/// Returns [`RenderError::TooManyInstances`] if the list is longer than
/// the 16-bit id range can label; nothing is written in that case.
pub fn label_instances(
    instances: &mut [MeshInstance],
    highlight: impl Fn(usize) -> Highlight,
) -> Result<(), RenderError> {
    if instances.len() > usize::from(u16::MAX) {
        return Err(RenderError::TooManyInstances(instances.len()));
    }
    for (index, instance) in instances.iter_mut().enumerate() {
        let rim = highlight(index).rim_intensity();
        instance.passthrough = Passthrough::from_id(logical_id(index)?).with_rim(rim);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec4};

    use super::*;
    use crate::mesh::MeshId;

    #[test]
    fn labels_are_one_based_with_rims() {
        let mut list = vec![
            MeshInstance::new(MeshId(0), Mat4::IDENTITY, Vec4::ONE);
            3
        ];
        label_instances(&mut list, |i| match i {
            0 => Highlight::Selected,
            2 => Highlight::Hovered,
            _ => Highlight::None,
        })
        .unwrap();

        let ids: Vec<u16> =
            list.iter().map(|i| i.passthrough.logical_id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let rims: Vec<u8> = list.iter().map(|i| i.passthrough.rim).collect();
        assert_eq!(rims, vec![255, 0, 51]);
    }

    #[test]
    fn last_representable_index() {
        assert_eq!(logical_id(65534).unwrap(), u16::MAX);
        assert!(matches!(
            logical_id(65535),
            Err(RenderError::TooManyInstances(65536))
        ));
    }
}
