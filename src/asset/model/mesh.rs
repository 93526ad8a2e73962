use std::{path::PathBuf, sync::Arc};

use crate::asset::skeleton::BoneTable;

/// A contiguous run of a mesh's triangles drawn with one material.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceGroup {
    pub name: String,
    pub material_id: i32,
    pub diffuse_texture_path: Option<PathBuf>,
    pub specular_texture_path: Option<PathBuf>,
    pub first_triangle: usize,
    pub triangle_count: usize,
}

/// Bone indices and weights for one vertex. Weights are in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexInfluence {
    pub bone_indices: [u8; 4],
    pub weights: [f32; 4],
}

/// Per-vertex skinning for a run of a mesh's vertices.
#[derive(Debug, Clone)]
pub struct SkinGroup {
    pub(crate) stream_id: i32,
    pub(crate) vertex_id_start: usize,
    pub(crate) influences: Vec<VertexInfluence>,
    pub(crate) bones: Arc<BoneTable>,
}

impl SkinGroup {
    pub fn stream_id(&self) -> i32 {
        self.stream_id
    }

    /// First vertex the influences apply to.
    pub fn vertex_id_start(&self) -> usize {
        self.vertex_id_start
    }

    pub fn vertex_id_count(&self) -> usize {
        self.influences.len()
    }

    pub fn influences(&self) -> &[VertexInfluence] {
        &self.influences
    }

    /// The skeleton the bone indices point into, shared by every skin group of the scan.
    pub fn bones(&self) -> &Arc<BoneTable> {
        &self.bones
    }

    pub fn bone_name(&self, index: u8) -> Option<&str> {
        self.bones.name(index as usize)
    }
}

/// One vertex buffer with every face group that draws from it.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub(crate) name: String,
    pub(crate) position_stream: i32,
    pub(crate) positions: Vec<[f32; 3]>,
    pub(crate) uvs: Vec<[f32; 2]>,
    pub(crate) indices: Vec<u16>,
    pub(crate) face_groups: Vec<FaceGroup>,
    pub(crate) skin_groups: Vec<SkinGroup>,
}

impl Mesh {
    pub(crate) fn new(name: String, position_stream: i32) -> Mesh {
        Mesh {
            name,
            position_stream,
            positions: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            face_groups: Vec::new(),
            skin_groups: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// ID of the stream the vertices were decoded from.
    pub fn position_stream(&self) -> i32 {
        self.position_stream
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Texture coordinates, as stored. Empty if the mesh has none.
    pub fn uvs(&self) -> &[[f32; 2]] {
        &self.uvs
    }

    /// Flat triangle list, three indices per triangle.
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u16; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
    }

    pub fn face_groups(&self) -> &[FaceGroup] {
        &self.face_groups
    }

    pub fn skin_groups(&self) -> &[SkinGroup] {
        &self.skin_groups
    }
}
