//! Triangular meshes in the plane and functions defined on them.
//!
//! A [`MeshGeometry`] validates the vertex and triangle arrays once and owns
//! the KD-tree used to locate points. It is immutable and shared through an
//! `Arc`: any number of [`Discrete2DMesh`] (one value per triangle) and
//! [`Interpolator2DMesh`] (one value per vertex, blended linearly) instances
//! can evaluate different data over the same geometry without rebuilding it.

use super::acceleration::*;
use super::error::{Error, Result};
use super::fp;
use super::types::*;
use std::sync::Arc;

const BOX_PADDING: f64 = 1e-6;

/// Triangle found by a point query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    pub triangle: usize,
    /// Weights of the triangle's three vertices; each is non-negative and
    /// they sum to one.
    pub barycentric: [f64; 3],
}

#[derive(Debug)]
pub struct MeshGeometry {
    vertices: Vec<Point2d>,
    triangles: Vec<[usize; 3]>,
    tree: KdTree2D,
}

impl MeshGeometry {
    pub fn new(vertices: Vec<Point2d>, triangles: Vec<[usize; 3]>) -> Result<MeshGeometry> {
        MeshGeometry::with_info(vertices, triangles, &KdTreeCreateInfo::default())
    }

    /// Builds from flat arrays: `2 * N` vertex coordinates and `3 * M`
    /// vertex indices.
    pub fn from_flat(coordinates: &[f64], indices: &[usize]) -> Result<MeshGeometry> {
        if coordinates.len() % 2 != 0 {
            return Err(Error::Shape {
                name: "vertex coordinates",
                expected: "N x 2".into(),
                actual: coordinates.len(),
            });
        }
        if indices.len() % 3 != 0 {
            return Err(Error::Shape {
                name: "triangle indices",
                expected: "M x 3".into(),
                actual: indices.len(),
            });
        }
        let vertices = coordinates
            .chunks_exact(2)
            .map(|c| Point2d::new(c[0], c[1]))
            .collect();
        let triangles = indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
        MeshGeometry::new(vertices, triangles)
    }

    pub fn with_info(
        vertices: Vec<Point2d>,
        triangles: Vec<[usize; 3]>,
        info: &KdTreeCreateInfo,
    ) -> Result<MeshGeometry> {
        if let Some(i) = vertices.iter().position(|v| !v.x.is_finite() || !v.y.is_finite()) {
            return Err(Error::config(format!("vertex {} is not finite", i)));
        }
        for (t, tri) in triangles.iter().enumerate() {
            if let Some(&v) = tri.iter().find(|&&v| v >= vertices.len()) {
                return Err(Error::VertexOutOfRange {
                    triangle: t,
                    vertex: v,
                    count: vertices.len(),
                });
            }
            let (area, err) =
                fp::signed_area2_with_error(vertices[tri[0]], vertices[tri[1]], vertices[tri[2]]);
            if area.abs() <= err {
                return Err(Error::DegenerateTriangle(t));
            }
        }

        let boxes: Vec<BoundingBox2D> = triangles
            .iter()
            .map(|tri| {
                let bb = BoundingBox2D::from_points(&[
                    vertices[tri[0]],
                    vertices[tri[1]],
                    vertices[tri[2]],
                ]);
                bb.pad(BOX_PADDING.max(BOX_PADDING * bb.largest_extent()))
            })
            .collect();
        let tree = KdTree2D::build(&boxes, info)?;
        Ok(MeshGeometry {
            vertices,
            triangles,
            tree,
        })
    }

    pub fn vertices(&self) -> &[Point2d] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn bounds(&self) -> BoundingBox2D {
        self.tree.bounds()
    }

    /// Barycentric weights of `p` with respect to triangle `triangle`.
    pub fn barycentric(&self, triangle: usize, p: Point2d) -> [f64; 3] {
        let [i1, i2, i3] = self.triangles[triangle];
        let (v1, v2, v3) = (self.vertices[i1], self.vertices[i2], self.vertices[i3]);
        let norm = 1. / ((v2.y - v3.y) * (v1.x - v3.x) + (v3.x - v2.x) * (v1.y - v3.y));
        let alpha = norm * ((v2.y - v3.y) * (p.x - v3.x) + (v3.x - v2.x) * (p.y - v3.y));
        let beta = norm * ((v3.y - v1.y) * (p.x - v3.x) + (v1.x - v3.x) * (p.y - v3.y));
        [alpha, beta, 1. - alpha - beta]
    }

    /// First triangle, in leaf order, whose barycentric weights for `p` are
    /// all non-negative.
    pub fn locate(&self, p: Point2d) -> Option<TriangleHit> {
        self.tree.find_map(p, |triangle| {
            let barycentric = self.barycentric(triangle, p);
            if barycentric.iter().all(|&w| w >= 0.) {
                Some(TriangleHit {
                    triangle,
                    barycentric,
                })
            } else {
                None
            }
        })
    }

    pub fn is_contained(&self, p: Point2d) -> bool {
        self.locate(p).is_some()
    }
}

/// Field overrides for deriving one mesh function from another.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceOverrides {
    pub data: Option<Vec<f64>>,
    pub limit: Option<bool>,
    pub default_value: Option<f64>,
}

fn check_len(name: &'static str, data: &[f64], expected: usize, what: &str) -> Result<()> {
    if data.len() != expected {
        return Err(Error::Shape {
            name,
            expected: format!("{} ({})", expected, what),
            actual: data.len(),
        });
    }
    Ok(())
}

fn outside(limit: bool, default_value: f64, p: Point2d) -> Result<f64> {
    if limit {
        Err(Error::Domain { x: p.x, y: p.y })
    } else {
        Ok(default_value)
    }
}

/// Piecewise constant function: every triangle carries one value.
#[derive(Clone, Debug)]
pub struct Discrete2DMesh {
    geometry: Arc<MeshGeometry>,
    triangle_data: Vec<f64>,
    limit: bool,
    default_value: f64,
}

impl Discrete2DMesh {
    /// `limit` selects whether evaluating outside the mesh is an error or
    /// yields `default_value`.
    pub fn new(
        geometry: Arc<MeshGeometry>,
        triangle_data: Vec<f64>,
        limit: bool,
        default_value: f64,
    ) -> Result<Discrete2DMesh> {
        check_len("triangle data", &triangle_data, geometry.triangles.len(), "one per triangle")?;
        Ok(Discrete2DMesh {
            geometry,
            triangle_data,
            limit,
            default_value,
        })
    }

    /// A function sharing this one's geometry, with the given fields replaced.
    pub fn instance(&self, overrides: InstanceOverrides) -> Result<Discrete2DMesh> {
        Discrete2DMesh::new(
            Arc::clone(&self.geometry),
            overrides.data.unwrap_or_else(|| self.triangle_data.clone()),
            overrides.limit.unwrap_or(self.limit),
            overrides.default_value.unwrap_or(self.default_value),
        )
    }

    pub fn geometry(&self) -> &Arc<MeshGeometry> {
        &self.geometry
    }

    pub fn triangle_data(&self) -> &[f64] {
        &self.triangle_data
    }

    pub fn limit(&self) -> bool {
        self.limit
    }

    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Id of the triangle containing (x, y).
    pub fn locate(&self, x: f64, y: f64) -> Option<usize> {
        self.geometry.locate(Point2d::new(x, y)).map(|h| h.triangle)
    }

    pub fn evaluate(&self, x: f64, y: f64) -> Result<f64> {
        let p = Point2d::new(x, y);
        match self.geometry.locate(p) {
            Some(hit) => Ok(self.triangle_data[hit.triangle]),
            None => outside(self.limit, self.default_value, p),
        }
    }
}

/// Piecewise linear function: values at the vertices blended with the
/// barycentric weights of the containing triangle.
#[derive(Clone, Debug)]
pub struct Interpolator2DMesh {
    geometry: Arc<MeshGeometry>,
    vertex_data: Vec<f64>,
    limit: bool,
    default_value: f64,
}

impl Interpolator2DMesh {
    pub fn new(
        geometry: Arc<MeshGeometry>,
        vertex_data: Vec<f64>,
        limit: bool,
        default_value: f64,
    ) -> Result<Interpolator2DMesh> {
        check_len("vertex data", &vertex_data, geometry.vertices.len(), "one per vertex")?;
        Ok(Interpolator2DMesh {
            geometry,
            vertex_data,
            limit,
            default_value,
        })
    }

    pub fn instance(&self, overrides: InstanceOverrides) -> Result<Interpolator2DMesh> {
        Interpolator2DMesh::new(
            Arc::clone(&self.geometry),
            overrides.data.unwrap_or_else(|| self.vertex_data.clone()),
            overrides.limit.unwrap_or(self.limit),
            overrides.default_value.unwrap_or(self.default_value),
        )
    }

    pub fn geometry(&self) -> &Arc<MeshGeometry> {
        &self.geometry
    }

    pub fn evaluate(&self, x: f64, y: f64) -> Result<f64> {
        let p = Point2d::new(x, y);
        match self.geometry.locate(p) {
            Some(hit) => {
                let tri = self.geometry.triangles[hit.triangle];
                Ok(tri
                    .iter()
                    .zip(hit.barycentric.iter())
                    .map(|(&v, w)| self.vertex_data[v] * w)
                    .sum())
            }
            None => outside(self.limit, self.default_value, p),
        }
    }
}
