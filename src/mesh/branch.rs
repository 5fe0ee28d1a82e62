use std::collections::HashSet;

use glam::{Quat, Vec3};

/// A vertex with position, normal and UV
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal,
            uv: [0.0, 0.0],
        }
    }

    pub fn with_uv(mut self, u: f32, v: f32) -> Self {
        self.uv = [u, v];
        self
    }

    /// Layout: position(3) + normal(3) + uv(2) = 8 floats
    pub fn to_array(&self) -> [f32; 8] {
        [
            self.position.x, self.position.y, self.position.z,
            self.normal.x, self.normal.y, self.normal.z,
            self.uv[0], self.uv[1],
        ]
    }
}

/// Index of a ring in the ring-index table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RingId(pub(crate) usize);

impl RingId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Where a ring lives in the vertex buffer and the texture V it was given
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingRecord {
    pub start_row: u32,
    pub v: f32,
}

/// Triangle strip between two rings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriStrip {
    pub indices: Vec<u32>,
}

impl TriStrip {
    /// Decompose into triangles, flipping every other one to keep winding
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.windows(3).enumerate().filter_map(|(i, w)| {
            if w[0] == w[1] || w[1] == w[2] || w[0] == w[2] {
                return None;
            }
            if i % 2 == 0 {
                Some([w[0], w[1], w[2]])
            } else {
                Some([w[1], w[0], w[2]])
            }
        })
    }
}

/// Committed tube geometry for the whole tree body.
///
/// Append-only: growth adds rings and strips but never removes them.
#[derive(Debug, Clone)]
pub struct TubeMesh {
    pub(crate) segments: usize,
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) strips: Vec<TriStrip>,
    pub(crate) rings: Vec<RingRecord>,
    /// Start rows of rings that may be bridged forward
    pub(crate) draw_flags: HashSet<u32>,
}

impl TubeMesh {
    pub fn new(segments: usize) -> Self {
        Self {
            segments,
            vertices: Vec::new(),
            strips: Vec::new(),
            rings: Vec::new(),
            draw_flags: HashSet::new(),
        }
    }

    /// Vertices around each ring, excluding the seam duplicate
    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn strips(&self) -> &[TriStrip] {
        &self.strips
    }

    pub fn rings(&self) -> &[RingRecord] {
        &self.rings
    }

    pub fn ring(&self, id: RingId) -> Option<&RingRecord> {
        self.rings.get(id.0)
    }

    /// Vertices of one ring, seam duplicate included
    pub fn ring_vertices(&self, id: RingId) -> Option<&[Vertex]> {
        let record = self.rings.get(id.0)?;
        let start = record.start_row as usize;
        self.vertices.get(start..start + self.segments + 1)
    }

    pub fn is_connectable(&self, id: RingId) -> bool {
        self.rings
            .get(id.0)
            .map(|r| self.draw_flags.contains(&r.start_row))
            .unwrap_or(false)
    }

    pub fn draw_flags(&self) -> &HashSet<u32> {
        &self.draw_flags
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    /// Rings that belong to a segment body rather than a cap
    pub fn connectable_ring_count(&self) -> usize {
        self.rings
            .iter()
            .filter(|r| self.draw_flags.contains(&r.start_row))
            .count()
    }

    pub fn triangle_count(&self) -> usize {
        self.strips.len() * self.segments * 2
    }

    /// Flat V3N3T2 vertex buffer
    pub fn vertex_data(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.to_array()).collect()
    }

    /// All strips decomposed into a triangle list
    pub fn triangle_indices(&self) -> Vec<u32> {
        self.strips
            .iter()
            .flat_map(|s| s.triangles())
            .flatten()
            .collect()
    }

    /// Bounding sphere (centroid, max distance)
    pub fn bounds(&self) -> (Vec3, f32) {
        if self.vertices.is_empty() {
            return (Vec3::ZERO, 0.0);
        }

        let center = self
            .vertices
            .iter()
            .fold(Vec3::ZERO, |acc, v| acc + v.position)
            / self.vertices.len() as f32;

        let radius = self
            .vertices
            .iter()
            .map(|v| v.position.distance(center))
            .fold(0.0f32, f32::max);

        (center, radius)
    }
}

/// Build one ring of `segments + 1` vertices around `center`.
///
/// The ring lies in the plane of the orientation's right (+X) and forward
/// (+Y) axes. The last vertex repeats the first one's position and normal so
/// U can run to 1.0 without wrapping.
pub fn create_ring(center: Vec3, orientation: Quat, radius: f32, segments: usize, v: f32) -> Vec<Vertex> {
    let right = orientation * Vec3::X;
    let forward = orientation * Vec3::Y;

    (0..=segments)
        .map(|i| {
            let angle = ((i % segments) as f32 / segments as f32) * std::f32::consts::TAU;
            let normal = right * angle.cos() + forward * angle.sin();
            let u = i as f32 / segments as f32;

            Vertex::new(center + normal * radius, normal).with_uv(u, v)
        })
        .collect()
}

/// Strip interleaving `current` ring vertices with `previous` ring vertices
pub fn connect_rings(previous_start: u32, current_start: u32, segments: usize) -> TriStrip {
    let mut indices = Vec::with_capacity((segments + 1) * 2);
    for i in 0..=segments as u32 {
        indices.push(current_start + i);
        indices.push(previous_start + i);
    }
    TriStrip { indices }
}
