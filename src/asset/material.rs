use indexmap::IndexMap;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    cursor::BinCursor,
    error::{DecodeError, DecodeResult},
};

/// Sub-record tags of a material section that name a texture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum TextureSlot {
    Diffuse = -589273463,
    Specular = -1396934011,
}

/// Texture IDs bound to one material. A texture ID is the section ID of a texture section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialBinding {
    pub diffuse_texture_id: Option<i32>,
    pub specular_texture_id: Option<i32>,
}

impl MaterialBinding {
    /// Reads a material section body: an 8-field header whose field 4 counts the 8-field
    /// sub-records that follow. Sub-records with tags other than [`TextureSlot`] are skipped.
    pub fn from_cursor(cur: &mut BinCursor) -> DecodeResult<MaterialBinding> {
        let header = cur.i32_array::<8>()?;

        let count = usize::try_from(header[4]).map_err(|_| DecodeError::NegativeField {
            what: "material sub-record count",
            value: header[4],
        })?;

        let mut binding = MaterialBinding::default();

        for _ in 0..count {
            let record = cur.i32_array::<8>()?;

            match TextureSlot::try_from(record[0]) {
                Ok(TextureSlot::Diffuse) => binding.diffuse_texture_id = Some(record[6]),
                Ok(TextureSlot::Specular) => binding.specular_texture_id = Some(record[6]),
                Err(_) => {}
            }
        }

        Ok(binding)
    }
}

#[derive(Debug, Default)]
pub struct MaterialTable {
    materials: IndexMap<i32, MaterialBinding>,
}

impl MaterialTable {
    /// Binds a material. A later section with the same ID replaces the earlier binding.
    pub fn insert(&mut self, id: i32, binding: MaterialBinding) {
        if self.materials.insert(id, binding).is_some() {
            tracing::debug!(material = id, "material redefined");
        }
    }

    pub fn get(&self, id: i32) -> Option<&MaterialBinding> {
        self.materials.get(&id)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}
