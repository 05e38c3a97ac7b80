//! Draw ordering and instanced batching.
//!
//! Instances are ordered opaque-first (alpha descending) and then by mesh,
//! so every maximal run of equal mesh ids becomes one instanced draw and
//! translucent geometry is blended over what is already drawn.

use std::cmp::Ordering;
use std::ops::Range;

use super::MeshInstance;
use crate::mesh::MeshId;

/// A contiguous run of instances sharing one mesh, drawn with a single
/// instanced call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Mesh shared by every instance in the run.
    pub mesh_id: MeshId,
    /// Index range into the sorted instance list.
    pub range: Range<usize>,
}

impl Batch {
    /// Number of instances in the run.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the run is empty (never true for yielded batches).
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Submission order: higher alpha first, then ascending mesh id.
pub fn draw_order(a: &MeshInstance, b: &MeshInstance) -> Ordering {
    b.rgba
        .w
        .total_cmp(&a.rgba.w)
        .then_with(|| a.mesh_id.cmp(&b.mesh_id))
}

/// Sort `instances` into submission order in place.
pub fn sort_for_drawing(instances: &mut [MeshInstance]) {
    instances.sort_by(draw_order);
}

/// Iterate the maximal runs of equal mesh id in `instances`.
pub fn batches(instances: &[MeshInstance]) -> Batches<'_> {
    Batches {
        instances,
        start: 0,
    }
}

/// Iterator over the runs of a sorted instance list; see [`batches`].
pub struct Batches<'a> {
    instances: &'a [MeshInstance],
    start: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let first = self.instances.get(self.start)?;
        let run = self.instances[self.start..]
            .iter()
            .take_while(|i| i.mesh_id == first.mesh_id)
            .count();
        let range = self.start..self.start + run;
        self.start = range.end;
        Some(Batch {
            mesh_id: first.mesh_id,
            range,
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec4};

    use super::*;

    fn instance(mesh: u32, alpha: f32) -> MeshInstance {
        MeshInstance::new(
            MeshId(mesh),
            Mat4::IDENTITY,
            Vec4::new(1.0, 1.0, 1.0, alpha),
        )
    }

    #[test]
    fn opaque_runs_merge_and_translucent_follows() {
        let mut list = vec![instance(0, 1.0), instance(1, 0.5), instance(0, 1.0)];
        sort_for_drawing(&mut list);

        let order: Vec<(u32, f32)> =
            list.iter().map(|i| (i.mesh_id.0, i.rgba.w)).collect();
        assert_eq!(order, vec![(0, 1.0), (0, 1.0), (1, 0.5)]);

        let runs: Vec<Batch> = batches(&list).collect();
        assert_eq!(
            runs,
            vec![
                Batch { mesh_id: MeshId(0), range: 0..2 },
                Batch { mesh_id: MeshId(1), range: 2..3 },
            ]
        );
    }

    #[test]
    fn sorted_lists_respect_alpha_then_mesh() {
        let mut list = vec![
            instance(3, 0.2),
            instance(1, 1.0),
            instance(2, 0.2),
            instance(0, 0.7),
            instance(1, 0.7),
        ];
        sort_for_drawing(&mut list);
        for pair in list.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.rgba.w >= b.rgba.w);
            if a.rgba.w == b.rgba.w {
                assert!(a.mesh_id <= b.mesh_id);
            }
        }
    }

    #[test]
    fn equal_meshes_split_by_alpha_form_separate_runs() {
        let mut list = vec![instance(0, 0.5), instance(1, 1.0), instance(0, 1.0)];
        sort_for_drawing(&mut list);
        let meshes: Vec<u32> = batches(&list).map(|b| b.mesh_id.0).collect();
        assert_eq!(meshes, vec![0, 1, 0]);
    }

    #[test]
    fn batches_cover_every_instance_once() {
        let mut list: Vec<MeshInstance> = (0..50)
            .map(|i| instance(i % 4, if i % 3 == 0 { 0.5 } else { 1.0 }))
            .collect();
        sort_for_drawing(&mut list);
        let mut covered = 0;
        for batch in batches(&list) {
            assert_eq!(batch.range.start, covered);
            assert!(!batch.is_empty());
            assert!(list[batch.range.clone()]
                .iter()
                .all(|i| i.mesh_id == batch.mesh_id));
            covered = batch.range.end;
        }
        assert_eq!(covered, list.len());
    }

    #[test]
    fn empty_list_has_no_batches() {
        assert_eq!(batches(&[]).count(), 0);
    }
}
