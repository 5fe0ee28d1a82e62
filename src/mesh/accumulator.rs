use std::collections::HashSet;

use glam::{Quat, Vec3};

use super::branch::{connect_rings, create_ring, RingId, RingRecord, TriStrip, TubeMesh, Vertex};

/// Geometry produced by one traversal, ready to append to a [`TubeMesh`]
#[derive(Debug, Clone, Default)]
pub struct MeshDelta {
    base_rows: usize,
    base_rings: usize,
    vertices: Vec<Vertex>,
    strips: Vec<TriStrip>,
    rings: Vec<RingRecord>,
    draw_flags: HashSet<u32>,
}

impl MeshDelta {
    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

/// Collects new rings on top of an already committed body mesh.
///
/// Reads go through to the committed mesh, writes stay in the accumulator
/// until [`MeshAccumulator::finish`] hands them back as a [`MeshDelta`].
pub struct MeshAccumulator<'a> {
    base: &'a TubeMesh,
    vertices: Vec<Vertex>,
    strips: Vec<TriStrip>,
    rings: Vec<RingRecord>,
    draw_flags: HashSet<u32>,
}

impl<'a> MeshAccumulator<'a> {
    pub fn continuing(base: &'a TubeMesh) -> Self {
        Self {
            base,
            vertices: Vec::new(),
            strips: Vec::new(),
            rings: Vec::new(),
            draw_flags: HashSet::new(),
        }
    }

    pub fn segments(&self) -> usize {
        self.base.segments
    }

    fn next_row(&self) -> u32 {
        (self.base.vertices.len() + self.vertices.len()) as u32
    }

    fn record(&self, id: RingId) -> Option<RingRecord> {
        let committed = self.base.rings.len();
        if id.0 < committed {
            self.base.rings.get(id.0).copied()
        } else {
            self.rings.get(id.0 - committed).copied()
        }
    }

    pub fn is_connectable(&self, id: RingId) -> bool {
        self.record(id)
            .map(|r| self.base.draw_flags.contains(&r.start_row) || self.draw_flags.contains(&r.start_row))
            .unwrap_or(false)
    }

    /// A ring that was written but cannot be bridged forward
    pub fn is_cap(&self, id: RingId) -> bool {
        self.record(id).is_some() && !self.is_connectable(id)
    }

    /// Texture V for a ring that continues the strand after `predecessor`.
    ///
    /// Advances by one past a connectable ring; repeats the value after a cap
    /// so a strand resumed from a cap does not skip a texture row.
    pub fn strand_v(&self, predecessor: Option<RingId>) -> f32 {
        match predecessor.and_then(|id| self.record(id).map(|r| (id, r))) {
            Some((id, record)) if self.is_connectable(id) => record.v + 1.0,
            Some((_, record)) => record.v,
            None => 0.0,
        }
    }

    /// Write a ring and connect it back to its strand predecessor
    pub fn push_ring(
        &mut self,
        center: Vec3,
        orientation: Quat,
        radius: f32,
        connectable: bool,
        predecessor: Option<RingId>,
    ) -> RingId {
        let segments = self.segments();
        let start_row = self.next_row();
        let v = self.strand_v(predecessor);

        if let Some(prev) = predecessor.filter(|&p| self.is_connectable(p)) {
            if let Some(record) = self.record(prev) {
                self.strips.push(connect_rings(record.start_row, start_row, segments));
            }
        }

        self.vertices.extend(create_ring(center, orientation, radius, segments, v));
        if connectable {
            self.draw_flags.insert(start_row);
        }

        let id = RingId(self.base.rings.len() + self.rings.len());
        self.rings.push(RingRecord { start_row, v });
        id
    }

    pub fn finish(self) -> MeshDelta {
        MeshDelta {
            base_rows: self.base.vertices.len(),
            base_rings: self.base.rings.len(),
            vertices: self.vertices,
            strips: self.strips,
            rings: self.rings,
            draw_flags: self.draw_flags,
        }
    }
}

impl TubeMesh {
    /// Append geometry staged against this mesh.
    ///
    /// Returns `false` without touching the mesh if the delta was staged
    /// against a different buffer length.
    pub fn apply(&mut self, delta: MeshDelta) -> bool {
        if delta.base_rows != self.vertices.len() || delta.base_rings != self.rings.len() {
            return false;
        }
        self.vertices.extend(delta.vertices);
        self.strips.extend(delta.strips);
        self.rings.extend(delta.rings);
        self.draw_flags.extend(delta.draw_flags);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stem(mesh: &TubeMesh) -> MeshDelta {
        let mut acc = MeshAccumulator::continuing(mesh);
        let a = acc.push_ring(Vec3::ZERO, Quat::IDENTITY, 1.0, true, None);
        let b = acc.push_ring(Vec3::Z, Quat::IDENTITY, 0.8, true, Some(a));
        acc.push_ring(Vec3::Z * 2.0, Quat::IDENTITY, 0.6, false, Some(b));
        acc.finish()
    }

    #[test]
    fn test_first_ring_starts_at_zero() {
        let mesh = TubeMesh::new(8);
        let mut acc = MeshAccumulator::continuing(&mesh);
        let a = acc.push_ring(Vec3::ZERO, Quat::IDENTITY, 1.0, true, None);
        assert_eq!(acc.record(a).unwrap().v, 0.0);
        assert_eq!(acc.record(a).unwrap().start_row, 0);
    }

    #[test]
    fn test_v_advances_along_strand() {
        let mut mesh = TubeMesh::new(8);
        let delta = stem(&mesh);
        assert_eq!(delta.ring_count(), 3);
        assert_eq!(delta.vertex_count(), 3 * 9);
        assert!(mesh.apply(delta));

        let vs: Vec<f32> = mesh.rings().iter().map(|r| r.v).collect();
        assert_eq!(vs, vec![0.0, 1.0, 2.0]);
        assert_eq!(mesh.vertex_count(), 3 * 9);
        assert_eq!(mesh.strips().len(), 2);
        assert_eq!(mesh.connectable_ring_count(), 2);

        assert!(mesh.is_connectable(RingId(0)));
        assert!(mesh.is_connectable(RingId(1)));
        assert!(!mesh.is_connectable(RingId(2)));
        assert!(!mesh.is_connectable(RingId(3)));

        let cap = mesh.ring_vertices(RingId(2)).unwrap();
        assert_eq!(cap.len(), 9);
        assert!(cap.iter().all(|v| v.uv[1] == 2.0));
        assert!(mesh.ring_vertices(RingId(3)).is_none());
    }

    #[test]
    fn test_cap_is_not_bridged_forward() {
        let mesh = TubeMesh::new(8);
        let mut acc = MeshAccumulator::continuing(&mesh);
        let root = acc.push_ring(Vec3::ZERO, Quat::IDENTITY, 1.0, true, None);
        let cap = acc.push_ring(Vec3::Z, Quat::IDENTITY, 0.5, false, Some(root));
        assert!(acc.is_cap(cap));

        // Resuming from the cap keeps its V and draws no strip
        let resumed = acc.push_ring(Vec3::Z, Quat::IDENTITY, 0.5, true, Some(cap));
        assert_eq!(acc.record(resumed).unwrap().v, acc.record(cap).unwrap().v);
        let delta = acc.finish();
        assert_eq!(delta.strips.len(), 1);
    }

    #[test]
    fn test_siblings_connect_to_parent() {
        let mesh = TubeMesh::new(4);
        let mut acc = MeshAccumulator::continuing(&mesh);
        let parent = acc.push_ring(Vec3::ZERO, Quat::IDENTITY, 1.0, true, None);
        let first = acc.push_ring(Vec3::Z, Quat::IDENTITY, 0.5, false, Some(parent));
        let second = acc.push_ring(Vec3::X, Quat::IDENTITY, 0.5, false, Some(parent));
        assert_eq!(acc.record(first).unwrap().v, 1.0);
        assert_eq!(acc.record(second).unwrap().v, 1.0);

        let delta = acc.finish();
        assert_eq!(delta.strips.len(), 2);
        // Both strips reference the parent ring rows 0..=4
        for strip in &delta.strips {
            assert_eq!(strip.indices[1], 0);
        }
    }

    #[test]
    fn test_reads_through_to_committed_mesh() {
        let mut mesh = TubeMesh::new(8);
        let delta = stem(&mesh);
        mesh.apply(delta);

        let mut acc = MeshAccumulator::continuing(&mesh);
        let cap = RingId(2);
        assert!(acc.is_cap(cap));
        let next = acc.push_ring(Vec3::Z * 2.0, Quat::IDENTITY, 0.6, true, Some(cap));
        assert_eq!(next, RingId(3));
        assert_eq!(next.index(), mesh.ring_count());
        assert_eq!(acc.record(next).unwrap().start_row, 27);
        assert_eq!(acc.strand_v(Some(next)), 3.0);
    }

    #[test]
    fn test_stale_delta_rejected() {
        let mut mesh = TubeMesh::new(8);
        let first = stem(&mesh);
        let second = stem(&mesh);
        assert!(mesh.apply(first));
        assert!(!mesh.apply(second));
        assert_eq!(mesh.ring_count(), 3);
    }
}
