//! Section payloads and the asset model built from them.
//!
//! Streams, materials and the skeleton are lookup tables filled while scanning. Mesh-info
//! records are turned into [`Mesh`] values against those tables, and texture sections are
//! turned into DDS files with the help of the companion payload file.

pub mod material;
pub mod model;
pub mod skeleton;
pub mod stream;
pub mod texture;

pub use material::{MaterialBinding, MaterialTable};
pub use model::{FaceGroup, Mesh, MeshAssembler, MeshRecord, SkinGroup, VertexInfluence};
pub use skeleton::{Bone, BoneTable};
pub use stream::{StreamEntry, StreamTable};
pub use texture::{DecodedTexture, ExtractedTexture, TextureDescriptor, TextureSize};
