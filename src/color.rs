//! Face-corner color output
//!
//! Expands per-vertex occlusion into one RGBA quadruple per face corner and
//! hands the flat buffer to a [`ColorSink`] in a single bulk write.

use serde::{Deserialize, Serialize};

use crate::error::{BakeError, BakeResult};
use crate::estimator::OcclusionResult;
use crate::host::ColorSink;
use crate::mesh::Mesh;

/// Corner color attributes a bake can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorTarget {
    /// Tint color layer
    #[default]
    #[serde(rename = "VertexPaintTintColor")]
    TintColor,
    /// Blend parameter layer
    #[serde(rename = "VertexPaintBlendParams")]
    BlendParams,
}

impl ColorTarget {
    /// Attribute name as stored on the mesh
    pub fn attribute_name(&self) -> &'static str {
        match self {
            ColorTarget::TintColor => "VertexPaintTintColor",
            ColorTarget::BlendParams => "VertexPaintBlendParams",
        }
    }
}

/// Tone adjustments applied to occlusion before it becomes a color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AoGrading {
    /// Occlusion strength multiplier, [0, 2]
    pub intensity: f32,
    /// Contrast around mid-grey, [0.1, 2]
    pub contrast: f32,
    /// Brightening offset for crevices, [0, 0.5]
    pub bias: f32,
    /// Swap dark and light
    pub invert: bool,
    /// Color of fully occluded corners, RGB in [0, 1]
    pub tint: [f32; 3],
}

impl Default for AoGrading {
    fn default() -> Self {
        AoGrading {
            intensity: 1.0,
            contrast: 1.0,
            bias: 0.0,
            invert: false,
            tint: [0.0; 3],
        }
    }
}

impl AoGrading {
    /// Check parameter ranges
    pub fn validate(&self) -> BakeResult<()> {
        let in_range = |v: f32, lo: f32, hi: f32| (lo..=hi).contains(&v);
        if !in_range(self.intensity, 0.0, 2.0) {
            return Err(BakeError::invalid(format!("intensity must be in [0, 2], got {}", self.intensity)));
        }
        if !in_range(self.contrast, 0.1, 2.0) {
            return Err(BakeError::invalid(format!("contrast must be in [0.1, 2], got {}", self.contrast)));
        }
        if !in_range(self.bias, 0.0, 0.5) {
            return Err(BakeError::invalid(format!("bias must be in [0, 0.5], got {}", self.bias)));
        }
        if self.tint.iter().any(|&c| !in_range(c, 0.0, 1.0)) {
            return Err(BakeError::invalid(format!("tint components must be in [0, 1], got {:?}", self.tint)));
        }
        Ok(())
    }

    /// Graded scalar for one occlusion value
    ///
    /// Each stage is skipped at its neutral setting so the default grading
    /// returns its input unchanged.
    pub fn apply(&self, value: f32) -> f32 {
        let mut v = value;
        if self.bias != 0.0 {
            v = (v + self.bias).min(1.0);
        }
        if self.intensity != 1.0 {
            v = 1.0 - (1.0 - v) * self.intensity;
        }
        if self.contrast != 1.0 {
            v = (v - 0.5) * self.contrast + 0.5;
        }
        v = v.clamp(0.0, 1.0);
        if self.invert {
            v = 1.0 - v;
        }
        v
    }

    /// RGBA for one occlusion value
    pub fn color(&self, value: f32) -> [f32; 4] {
        let v = self.apply(value);
        let [r, g, b] = self.tint.map(|t| t + (1.0 - t) * v);
        [r, g, b, 1.0]
    }
}

/// Flat RGBA buffer, four floats per face corner
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBuffer {
    data: Vec<f32>,
}

impl ColorBuffer {
    /// Buffer with every corner set to `rgb` (alpha 1.0)
    pub fn filled(corner_count: usize, rgb: [f32; 3]) -> Self {
        let rgba = [rgb[0], rgb[1], rgb[2], 1.0];
        ColorBuffer {
            data: rgba.repeat(corner_count),
        }
    }

    /// Wrap an existing flat buffer
    pub fn from_raw(data: Vec<f32>) -> Self {
        ColorBuffer { data }
    }

    /// Flat float view
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Number of floats
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if no corners are stored
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of whole corners
    #[inline]
    pub fn corner_count(&self) -> usize {
        self.data.len() / 4
    }

    /// RGBA of one corner
    pub fn corner(&self, index: usize) -> Option<[f32; 4]> {
        let c = self.data.get(index * 4..index * 4 + 4)?;
        Some([c[0], c[1], c[2], c[3]])
    }

    /// Overwrite the corners of the given faces with `rgb`
    pub fn fill_faces(&mut self, mesh: &Mesh, faces: &[usize], rgb: [f32; 3]) -> BakeResult<()> {
        let rgba = [rgb[0], rgb[1], rgb[2], 1.0];
        let len = self.data.len();
        for &face_index in faces {
            let face = mesh.faces.get(face_index).ok_or_else(|| {
                BakeError::invalid(format!("face {face_index} out of range ({} faces)", mesh.faces.len()))
            })?;
            for &corner in &face.corners {
                let start = corner as usize * 4;
                let slot = self.data.get_mut(start..start + 4).ok_or(BakeError::TopologyMismatch {
                    expected: start + 4,
                    actual: len,
                })?;
                slot.copy_from_slice(&rgba);
            }
        }
        Ok(())
    }

    /// Bulk-write into `sink`; the length must be exactly 4 × its corners
    pub fn commit<S: ColorSink + ?Sized>(&self, sink: &mut S) -> BakeResult<()> {
        let expected = sink.corner_count() * 4;
        if self.data.len() != expected {
            return Err(BakeError::TopologyMismatch {
                expected,
                actual: self.data.len(),
            });
        }
        sink.set_all(&self.data)
    }
}

/// Expand per-vertex occlusion into per-corner colors
///
/// Every `(vertex, corner)` pair of every face receives the graded
/// vertex value as RGB with alpha 1.0. Fails with
/// [`BakeError::TopologyMismatch`] if a corner index lies outside the mesh's
/// corner range or some corner is never written.
///
/// `expected` is always the buffer length for the mesh's corners. For an
/// out-of-range corner, `actual` is the length that corner would need
/// (`4 × (corner + 1)`); for unwritten corners it is `4 ×` the corners covered.
pub fn write_corner_colors(mesh: &Mesh, occlusion: &OcclusionResult, grading: &AoGrading) -> BakeResult<ColorBuffer> {
    let corner_count = mesh.corner_count();
    let expected = corner_count * 4;
    let mut data = vec![0.0f32; expected];
    let mut written = vec![false; corner_count];

    for face in &mesh.faces {
        for (vertex, corner) in face.loops() {
            let value = occlusion.get(vertex as usize).ok_or_else(|| {
                BakeError::invalid(format!(
                    "no occlusion value for vertex {vertex} ({} computed)",
                    occlusion.len()
                ))
            })?;
            let start = corner as usize * 4;
            let slot = data.get_mut(start..start + 4).ok_or(BakeError::TopologyMismatch {
                expected,
                actual: start + 4,
            })?;
            slot.copy_from_slice(&grading.color(value));
            written[corner as usize] = true;
        }
    }

    // Duplicate corner indices leave other corners unwritten
    let covered = written.iter().filter(|&&w| w).count();
    if covered != corner_count {
        return Err(BakeError::TopologyMismatch {
            expected,
            actual: covered * 4,
        });
    }
    Ok(ColorBuffer { data })
}

/// Named corner color attribute storage
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAttribute {
    /// Attribute name
    pub name: String,
    corner_count: usize,
    data: Vec<f32>,
}

impl ColorAttribute {
    /// White attribute for `corner_count` corners
    pub fn new(name: impl Into<String>, corner_count: usize) -> Self {
        ColorAttribute {
            name: name.into(),
            corner_count,
            data: [1.0f32; 4].repeat(corner_count),
        }
    }

    /// Current values
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

impl ColorSink for ColorAttribute {
    fn corner_count(&self) -> usize {
        self.corner_count
    }

    fn set_all(&mut self, rgba: &[f32]) -> BakeResult<()> {
        if rgba.len() != self.corner_count * 4 {
            return Err(BakeError::TopologyMismatch {
                expected: self.corner_count * 4,
                actual: rgba.len(),
            });
        }
        self.data.copy_from_slice(rgba);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Face, Vertex};
    use glam::Vec3;

    fn single_triangle() -> Mesh {
        Mesh::from_polygons(vec![Vertex::new(Vec3::ZERO, Vec3::Z); 3], &[vec![0, 1, 2]])
    }

    #[test]
    fn test_triangle_corner_order() {
        let mesh = single_triangle();
        let occlusion = OcclusionResult::new(vec![1.0, 0.5, 0.0]);
        let buffer = write_corner_colors(&mesh, &occlusion, &AoGrading::default()).unwrap();

        assert_eq!(
            buffer.as_slice(),
            &[1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 1.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_shared_vertex_fills_every_corner() {
        let mesh = Mesh::from_polygons(vec![Vertex::new(Vec3::ZERO, Vec3::Z); 4], &[vec![0, 1, 2], vec![0, 2, 3]]);
        let occlusion = OcclusionResult::new(vec![0.25, 1.0, 0.75, 0.0]);
        let buffer = write_corner_colors(&mesh, &occlusion, &AoGrading::default()).unwrap();

        assert_eq!(buffer.corner_count(), 6);
        assert_eq!(buffer.corner(0), Some([0.25, 0.25, 0.25, 1.0]));
        assert_eq!(buffer.corner(3), Some([0.25, 0.25, 0.25, 1.0]));
        assert_eq!(buffer.corner(4), Some([0.75, 0.75, 0.75, 1.0]));
    }

    #[test]
    fn test_corner_out_of_range_is_mismatch() {
        let mut mesh = single_triangle();
        mesh.faces[0] = Face::new(vec![0, 1, 2], vec![0, 1, 5]);
        let occlusion = OcclusionResult::new(vec![1.0; 3]);
        // Corner 5 needs a 24-float buffer; the mesh has 3 corners
        assert_eq!(
            write_corner_colors(&mesh, &occlusion, &AoGrading::default()),
            Err(BakeError::TopologyMismatch { expected: 12, actual: 24 })
        );
    }

    #[test]
    fn test_duplicate_corner_is_mismatch() {
        let mut mesh = Mesh::from_polygons(vec![Vertex::new(Vec3::ZERO, Vec3::Z); 4], &[vec![0, 1, 2], vec![0, 2, 3]]);
        mesh.faces[1].corners[0] = 0;
        let occlusion = OcclusionResult::new(vec![1.0; 4]);
        assert_eq!(
            write_corner_colors(&mesh, &occlusion, &AoGrading::default()),
            Err(BakeError::TopologyMismatch { expected: 24, actual: 20 })
        );
    }

    #[test]
    fn test_commit_length_checked() {
        let buffer = ColorBuffer::filled(3, [0.5; 3]);
        let mut sink = ColorAttribute::new("VertexPaintTintColor", 4);
        assert_eq!(
            buffer.commit(&mut sink),
            Err(BakeError::TopologyMismatch { expected: 16, actual: 12 })
        );
        // Sink untouched
        assert!(sink.data().iter().all(|&v| v == 1.0));

        let mut sink = ColorAttribute::new("VertexPaintTintColor", 3);
        buffer.commit(&mut sink).unwrap();
        assert_eq!(sink.data(), buffer.as_slice());
    }

    #[test]
    fn test_fill_selected_faces() {
        let mesh = Mesh::from_polygons(vec![Vertex::new(Vec3::ZERO, Vec3::Z); 4], &[vec![0, 1, 2], vec![0, 2, 3]]);
        let mut buffer = ColorBuffer::filled(mesh.corner_count(), [1.0; 3]);
        buffer.fill_faces(&mesh, &[1], [0.0, 0.0, 1.0]).unwrap();

        assert_eq!(buffer.corner(2), Some([1.0, 1.0, 1.0, 1.0]));
        assert_eq!(buffer.corner(3), Some([0.0, 0.0, 1.0, 1.0]));
        assert_eq!(buffer.corner(5), Some([0.0, 0.0, 1.0, 1.0]));
        assert!(buffer.fill_faces(&mesh, &[9], [0.0; 3]).is_err());
    }

    #[test]
    fn test_fill_faces_short_buffer_is_mismatch() {
        let mesh = Mesh::from_polygons(vec![Vertex::new(Vec3::ZERO, Vec3::Z); 4], &[vec![0, 1, 2], vec![0, 2, 3]]);
        let mut buffer = ColorBuffer::filled(4, [1.0; 3]);
        assert_eq!(
            buffer.fill_faces(&mesh, &[1], [0.0; 3]),
            Err(BakeError::TopologyMismatch { expected: 20, actual: 16 })
        );
    }

    #[test]
    fn test_default_grading_is_identity() {
        let grading = AoGrading::default();
        for v in [0.0f32, 0.1, 0.333, 0.5, 0.97, 1.0] {
            assert_eq!(grading.apply(v), v);
        }
    }

    #[test]
    fn test_grading_stages() {
        let invert = AoGrading { invert: true, ..Default::default() };
        assert!((invert.apply(0.2) - 0.8).abs() < 1e-6);

        let bias = AoGrading { bias: 0.25, ..Default::default() };
        assert!((bias.apply(0.5) - 0.75).abs() < 1e-6);
        assert_eq!(bias.apply(0.9), 1.0);

        let strong = AoGrading { intensity: 2.0, ..Default::default() };
        assert!((strong.apply(0.75) - 0.5).abs() < 1e-6);
        assert_eq!(strong.apply(0.2), 0.0);

        let contrast = AoGrading { contrast: 2.0, ..Default::default() };
        assert!((contrast.apply(0.6) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_tint_colors_occluded_corners() {
        let grading = AoGrading { tint: [0.5, 0.0, 0.0], ..Default::default() };
        assert_eq!(grading.color(0.0), [0.5, 0.0, 0.0, 1.0]);
        assert_eq!(grading.color(1.0), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_grading_validate() {
        assert!(AoGrading::default().validate().is_ok());
        assert!(AoGrading { contrast: 0.0, ..Default::default() }.validate().is_err());
        assert!(AoGrading { tint: [1.5, 0.0, 0.0], ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_target_names() {
        assert_eq!(ColorTarget::TintColor.attribute_name(), "VertexPaintTintColor");
        assert_eq!(ColorTarget::BlendParams.attribute_name(), "VertexPaintBlendParams");
    }
}
