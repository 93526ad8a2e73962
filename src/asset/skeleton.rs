use crate::{
    cursor::BinCursor,
    error::{DecodeError, DecodeResult},
};

const RESERVED_BLOCK_SIZE: usize = 160;
const BONE_NAME_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bone {
    pub name: String,
}

/// Ordered bone names. A bone's position in the list is the index skin weights refer to.
///
/// Each bone also carries a quad of fixed-point values that looks like a bind-pose rotation.
/// Nothing in the container has been shown to use it that way, so it is exposed as decoded
/// and never applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneTable {
    bones: Vec<Bone>,
    raw_rotations: Vec<[f32; 4]>,
}

impl BoneTable {
    /// Reads a skeleton section body: 8-field header (field 1 = bone count), a 160-byte
    /// reserved block, the 64-byte names and then one half-float quad per bone.
    pub fn from_cursor(cur: &mut BinCursor) -> DecodeResult<BoneTable> {
        let header = cur.i32_array::<8>()?;

        let count = usize::try_from(header[1]).map_err(|_| DecodeError::NegativeField {
            what: "bone count",
            value: header[1],
        })?;

        cur.skip(RESERVED_BLOCK_SIZE)?;

        let mut bones = Vec::with_capacity(count);
        for _ in 0..count {
            bones.push(Bone {
                name: cur.fixed_string(BONE_NAME_SIZE)?,
            });
        }

        let mut raw_rotations = Vec::with_capacity(count);
        for _ in 0..count {
            raw_rotations.push(cur.halfs::<4>()?);
        }

        Ok(BoneTable {
            bones,
            raw_rotations,
        })
    }

    /// Appends the bones of another skeleton section.
    pub fn extend(&mut self, other: BoneTable) {
        self.bones.extend(other.bones);
        self.raw_rotations.extend(other.raw_rotations);
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.bones.get(index).map(|bone| bone.name.as_str())
    }

    pub fn raw_rotations(&self) -> &[[f32; 4]] {
        &self.raw_rotations
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}
