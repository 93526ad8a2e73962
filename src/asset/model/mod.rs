pub mod mesh;

use std::{io::SeekFrom, sync::Arc};

use indexmap::IndexMap;

pub use mesh::{FaceGroup, Mesh, SkinGroup, VertexInfluence};

use crate::{
    asset::{
        material::MaterialTable,
        skeleton::BoneTable,
        stream::{StreamEntry, StreamTable},
    },
    context::ParseContext,
    cursor::{BinCursor, weight_from_byte},
    error::{DecodeError, DecodeResult},
};

pub const MESH_RECORD_FIELDS: usize = 36;

/// One entry of a mesh-info section: which streams and material a draw uses.
#[derive(Debug, Clone)]
pub struct MeshRecord {
    index: usize,
    fields: [i32; MESH_RECORD_FIELDS],
}

impl MeshRecord {
    pub fn new(index: usize, fields: [i32; MESH_RECORD_FIELDS]) -> MeshRecord {
        MeshRecord { index, fields }
    }

    /// Position of the record in its section's offset table.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn fields(&self) -> &[i32; MESH_RECORD_FIELDS] {
        &self.fields
    }

    pub fn material_id(&self) -> i32 {
        self.fields[3]
    }

    pub fn index_stream(&self) -> i32 {
        self.fields[11]
    }

    pub fn position_stream(&self) -> i32 {
        self.fields[15]
    }

    pub fn skin_stream(&self) -> i32 {
        self.fields[19]
    }

    pub fn uv_stream(&self) -> i32 {
        self.fields[23]
    }

    /// First index (not triangle) of the slice this record draws.
    pub fn index_start(&self) -> i32 {
        self.fields[29]
    }

    pub fn triangle_count(&self) -> i32 {
        self.fields[30]
    }
}

/// Reads a mesh-info section body.
///
/// The body starts with 15 unused fields and a 17-field header whose field 1 is the record
/// count. An offset table follows; record `m` lives `offset[m]` bytes past its own table
/// slot.
///
/// A slot pointing outside the buffer only fails its own record, so the outer result covers
/// the header and table while each record carries its own.
pub fn read_mesh_info(cur: &mut BinCursor) -> DecodeResult<Vec<DecodeResult<MeshRecord>>> {
    cur.i32_array::<15>()?;
    let header = cur.i32_array::<17>()?;

    let count = usize::try_from(header[1]).map_err(|_| DecodeError::NegativeField {
        what: "mesh record count",
        value: header[1],
    })?;

    let table_start = cur.tell() as i64;
    let offsets = cur.i32s(count)?;

    let records = offsets
        .iter()
        .enumerate()
        .map(|(m, offset)| {
            let target = table_start + m as i64 * 4 + i64::from(*offset);
            read_mesh_record(cur, m, target)
        })
        .collect();

    Ok(records)
}

fn read_mesh_record(cur: &mut BinCursor, index: usize, target: i64) -> DecodeResult<MeshRecord> {
    let start = u64::try_from(target).map_err(|_| DecodeError::SeekOutOfBounds {
        target,
        size: cur.size(),
    })?;

    cur.seek(SeekFrom::Start(start))?;

    Ok(MeshRecord::new(index, cur.i32_array::<MESH_RECORD_FIELDS>()?))
}

/// Takes the `triangle_count` triangles that start at index `start`.
pub fn slice_indices(indices: &[u16], start: i32, triangle_count: i32) -> DecodeResult<&[u16]> {
    let start = i64::from(start);
    let end = start + i64::from(triangle_count) * 3;

    if start < 0 || end < start || end > indices.len() as i64 {
        return Err(DecodeError::IndexRange {
            start,
            end,
            available: indices.len(),
        });
    }

    Ok(&indices[start as usize..end as usize])
}

fn decode_positions(bytes: &[u8], stream: &StreamEntry) -> DecodeResult<Vec<[f32; 3]>> {
    match stream.stride() {
        // Three halfs, then 10 bytes of other attributes we don't read.
        16 => stream.read_records(bytes, 6, |cur| cur.halfs::<3>()),
        12 => stream.read_records(bytes, 12, |cur| cur.f32s::<3>()),
        stride => Err(DecodeError::UnsupportedVertexLayout {
            stride,
            count: stream.record_count(),
        }),
    }
}

fn decode_uvs(bytes: &[u8], stream: &StreamEntry) -> DecodeResult<Vec<[f32; 2]>> {
    stream.read_records(bytes, 4, |cur| cur.halfs::<2>())
}

fn decode_influences(bytes: &[u8], stream: &StreamEntry) -> DecodeResult<Vec<VertexInfluence>> {
    stream.read_records(bytes, 8, |cur| {
        let bone_indices = cur.u8s::<4>()?;
        let weights = cur.u8s::<4>()?.map(weight_from_byte);

        Ok(VertexInfluence {
            bone_indices,
            weights,
        })
    })
}

/// Builds meshes out of mesh-info records.
///
/// Records that share a position stream share a vertex buffer, so they land in the same
/// [`Mesh`], one face group each. Meshes keep the order their position streams were first
/// seen in.
#[derive(Debug, Default)]
pub struct MeshAssembler {
    meshes: IndexMap<i32, Mesh>,
}

impl MeshAssembler {
    pub fn new() -> MeshAssembler {
        MeshAssembler::default()
    }

    /// Decodes everything `record` refers to and adds it to its mesh.
    ///
    /// Nothing is added unless the whole record decodes, so a rejected record leaves the
    /// meshes as they were.
    pub fn add_record(
        &mut self,
        ctx: &ParseContext,
        bytes: &[u8],
        streams: &StreamTable,
        materials: &MaterialTable,
        record: &MeshRecord,
    ) -> DecodeResult<()> {
        let index_stream = streams.resolve(record.index_stream())?;
        let position_stream = streams.resolve(record.position_stream())?;

        let all_indices = index_stream.read_indices(bytes)?;
        let indices = slice_indices(&all_indices, record.index_start(), record.triangle_count())?;

        let existing = self.meshes.get(&record.position_stream());

        // Vertex attributes come with the first record of a vertex buffer. Later records only
        // fill in UVs or skinning the buffer doesn't have yet.
        let uvs = match streams.get(record.uv_stream()) {
            Some(stream) if existing.is_none_or(|mesh| mesh.uvs.is_empty()) => {
                Some(decode_uvs(bytes, stream)?)
            }
            _ => None,
        };

        let skin_is_new = existing.is_none_or(|mesh| {
            mesh.skin_groups
                .iter()
                .all(|group| group.stream_id != record.skin_stream())
        });

        let skin = match streams.get(record.skin_stream()) {
            Some(stream) if skin_is_new => Some(SkinGroup {
                stream_id: record.skin_stream(),
                // Weights belong to the buffer's vertices, which start at 0 whether they are
                // appended by this record or were by an earlier one.
                vertex_id_start: 0,
                influences: decode_influences(bytes, stream)?,
                bones: Arc::default(),
            }),
            _ => None,
        };

        let positions = match existing {
            Some(_) => None,
            None => Some(decode_positions(bytes, position_stream)?),
        };

        let vertex_count = match (&positions, existing) {
            (Some(positions), _) => positions.len(),
            (None, Some(mesh)) => mesh.vertex_count(),
            (None, None) => 0,
        };

        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(DecodeError::VertexIndexOutOfRange {
                index,
                vertex_count,
            });
        }

        let binding = materials.get(record.material_id());

        let face_group = |first_triangle: usize| FaceGroup {
            name: format!("{}-mat-{}", ctx.model_name(), record.index()),
            material_id: record.material_id(),
            diffuse_texture_path: binding
                .and_then(|b| b.diffuse_texture_id)
                .map(|id| ctx.texture_path(id)),
            specular_texture_path: binding
                .and_then(|b| b.specular_texture_id)
                .map(|id| ctx.texture_path(id)),
            first_triangle,
            triangle_count: indices.len() / 3,
        };

        let mesh_number = self.meshes.len();
        let mesh = self
            .meshes
            .entry(record.position_stream())
            .or_insert_with(|| {
                let name = format!("{}-model-{}", ctx.model_name(), mesh_number);
                tracing::debug!(stream = record.position_stream(), "new mesh {}", name);
                Mesh::new(name, record.position_stream())
            });

        if let Some(positions) = positions {
            mesh.positions = positions;
        }

        if let Some(uvs) = uvs {
            mesh.uvs = uvs;
        }

        if let Some(skin) = skin {
            mesh.skin_groups.push(skin);
        }

        let first_triangle = mesh.triangle_count();
        mesh.indices.extend_from_slice(indices);
        mesh.face_groups.push(face_group(first_triangle));

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Hands the meshes over, pointing every skin group at the finished skeleton.
    pub fn finish(self, bones: Arc<BoneTable>) -> Vec<Mesh> {
        self.meshes
            .into_values()
            .map(|mut mesh| {
                for group in &mut mesh.skin_groups {
                    group.bones = Arc::clone(&bones);
                }
                mesh
            })
            .collect()
    }
}
