use crate::{
    math::{bounds::Bounds, point::Point, vec::Vec3},
    scene::material::RayTracingMaterial,
};

/// Maximum number of triangles in a single [MeshChunk]
pub const TRIANGLE_LIMIT: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Point,
    pub b: Point,
    pub c: Point,
    pub normal_a: Vec3,
    pub normal_b: Vec3,
    pub normal_c: Vec3,
}

impl Triangle {
    /// Triangle whose vertex normals are all the face normal
    pub fn flat(a: Point, b: Point, c: Point) -> Self {
        let n = (b - a).cross(c - a).normalize_or_zero();
        Self {
            a,
            b,
            c,
            normal_a: n,
            normal_b: n,
            normal_c: n,
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::enclosing([self.a, self.b, self.c])
    }

    pub fn area(&self) -> f32 {
        0.5 * (self.b - self.a).cross(self.c - self.a).length()
    }
}

/// A contiguous range of triangles sharing a material
#[derive(Debug, Clone, PartialEq)]
pub struct MeshChunk {
    pub triangles: Vec<Triangle>,
    pub bounds: Bounds,
    /// Index into the materials of the owning [Mesh]
    pub material_index: usize,
}

impl MeshChunk {
    pub fn new(triangles: Vec<Triangle>, material_index: usize) -> Self {
        let bounds = triangles
            .iter()
            .fold(Bounds::EMPTY, |b, t| b.union(t.bounds()));
        Self {
            triangles,
            bounds,
            material_index,
        }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub label: String,
    pub chunks: Vec<MeshChunk>,
    pub materials: Vec<RayTracingMaterial>,
}

impl Mesh {
    /// Build a single material mesh, split into chunks of at most [TRIANGLE_LIMIT] triangles
    pub fn from_triangles(
        label: impl Into<String>,
        triangles: Vec<Triangle>,
        material: RayTracingMaterial,
    ) -> Self {
        let chunks = triangles
            .chunks(TRIANGLE_LIMIT)
            .map(|tris| MeshChunk::new(tris.to_vec(), 0))
            .collect();
        Self {
            label: label.into(),
            chunks,
            materials: vec![material],
        }
    }

    /// Chunks are taken as is, they are validated when the scene is assembled
    pub fn from_chunks(
        label: impl Into<String>,
        chunks: Vec<MeshChunk>,
        materials: Vec<RayTracingMaterial>,
    ) -> Self {
        Self {
            label: label.into(),
            chunks,
            materials,
        }
    }

    /// Material of a chunk. Out of range indices use the last material, as a sub mesh
    /// without a dedicated material would.
    pub fn material(&self, chunk: &MeshChunk) -> RayTracingMaterial {
        self.materials
            .get(chunk.material_index)
            .or_else(|| self.materials.last())
            .copied()
            .unwrap_or_default()
    }

    pub fn triangle_count(&self) -> usize {
        self.chunks.iter().map(MeshChunk::len).sum()
    }

    pub fn bounds(&self) -> Bounds {
        self.chunks
            .iter()
            .fold(Bounds::EMPTY, |b, c| b.union(c.bounds))
    }

    /// Two triangles spanning the parallelogram `origin, origin + u, origin + u + v, origin + v`
    pub fn quad_triangles(origin: Point, u: Vec3, v: Vec3) -> [Triangle; 2] {
        let p1 = origin + u;
        let p2 = origin + u + v;
        let p3 = origin + v;
        [
            Triangle::flat(origin, p1, p2),
            Triangle::flat(origin, p2, p3),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(n: usize) -> Vec<Triangle> {
        (0..n)
            .map(|i| {
                let x = i as f32;
                Triangle::flat(
                    Point::new(x, 0., 0.),
                    Point::new(x + 1., 0., 0.),
                    Point::new(x, 1., 0.),
                )
            })
            .collect()
    }

    #[test]
    fn flat_normal() {
        let t = Triangle::flat(
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(0., 1., 0.),
        );
        assert_eq!(t.normal_a, Vec3::Z);
        assert_eq!(t.area(), 0.5);
    }

    #[test]
    fn split_in_chunks() {
        let mesh = Mesh::from_triangles("strip", strip(3200), RayTracingMaterial::default());
        let sizes: Vec<_> = mesh.chunks.iter().map(MeshChunk::len).collect();
        assert_eq!(sizes, vec![1500, 1500, 200]);
        assert_eq!(mesh.triangle_count(), 3200);
        assert_eq!(mesh.chunks[1].bounds.min, Point::new(1500., 0., 0.));
        assert_eq!(mesh.chunks[1].bounds.max, Point::new(3000., 1., 0.));
        assert_eq!(mesh.bounds().max, Point::new(3200., 1., 0.));
    }

    #[test]
    fn material_lookup() {
        let red = RayTracingMaterial::diffuse(Vec3::X);
        let green = RayTracingMaterial::diffuse(Vec3::Y);
        let mesh = Mesh::from_chunks(
            "m",
            vec![MeshChunk::new(strip(1), 0), MeshChunk::new(strip(1), 5)],
            vec![red, green],
        );
        assert_eq!(mesh.material(&mesh.chunks[0]), red);
        assert_eq!(mesh.material(&mesh.chunks[1]), green);

        let bare = Mesh::from_chunks("bare", vec![MeshChunk::new(strip(1), 0)], vec![]);
        assert_eq!(bare.material(&bare.chunks[0]), RayTracingMaterial::default());
    }

    #[test]
    fn quad() {
        let [t0, t1] = Mesh::quad_triangles(Point::ORIGIN, Vec3::X, Vec3::Z);
        assert!((t0.area() + t1.area() - 1.0).abs() < 1e-6);
        assert_eq!(t0.normal_a, Vec3::NEG_Y);
    }
}
