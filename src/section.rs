use std::io::SeekFrom;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    asset::{
        material::MaterialBinding,
        model::{MeshRecord, read_mesh_info},
        skeleton::BoneTable,
        stream::StreamEntry,
        texture::TextureDescriptor,
    },
    cursor::BinCursor,
    error::{DecodeError, DecodeResult},
};

pub const LABEL_SIZE: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum SectionTag {
    Skeleton = -1742448933,
    Texture = -843079536,
    MeshInfo = 1845060531,
    Material = -168275601,
    Stream = 2056721529,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Known(SectionTag),
    Unknown(i32),
}

impl From<i32> for SectionKind {
    fn from(value: i32) -> Self {
        match SectionTag::try_from(value) {
            Ok(tag) => SectionKind::Known(tag),
            Err(_) => SectionKind::Unknown(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SectionHeader {
    /// Offset of the first header field.
    pub offset: u64,
    pub kind: SectionKind,
    pub length: i32,
    /// Third leading field. Carried as read; its meaning is unknown.
    pub unknown: i32,
    /// Bytes between the four leading fields and the ID block, counted in `length`.
    pub header_skip: i32,
    /// Where the section's length is counted from, right after the four leading fields.
    pub body_start: u64,
    pub ids: [i32; 7],
    pub label: String,
}

impl SectionHeader {
    /// The numeric ID other sections use to refer to this one.
    pub fn section_id(&self) -> i32 {
        self.ids[3]
    }

    pub fn end(&self) -> u64 {
        self.body_start + self.length as u64
    }
}

/// The decoded body of a section.
#[derive(Debug)]
pub enum SectionBody {
    Skeleton(BoneTable),
    Texture(TextureDescriptor),
    /// One entry per offset-table slot, so a bad slot doesn't hide its siblings.
    MeshInfo(Vec<DecodeResult<MeshRecord>>),
    Material(MaterialBinding),
    Stream(StreamEntry),
    Unknown(i32),
}

#[derive(Debug)]
pub struct Section {
    pub header: SectionHeader,
    /// Problems decoding the body only affect this section.
    pub body: DecodeResult<SectionBody>,
}

/// Walks a container one section at a time.
///
/// Whatever a body parser consumes, the scanner always resumes at the end the section
/// header declared. That is what lets it step over sections nobody understands yet.
#[derive(Debug)]
pub struct SectionScanner<'a> {
    cur: BinCursor<'a>,
}

impl<'a> SectionScanner<'a> {
    pub fn new(bytes: &'a [u8]) -> SectionScanner<'a> {
        SectionScanner {
            cur: BinCursor::new(bytes),
        }
    }

    pub fn tell(&self) -> u64 {
        self.cur.tell()
    }

    /// Returns the next section, or `None` once the cursor sits exactly on the end of the
    /// buffer.
    ///
    /// # Errors
    /// Stray trailing bytes, a length that reaches outside the buffer and any short read
    /// inside a body are fatal. Everything else is carried in [`Section::body`].
    pub fn next_section(&mut self) -> DecodeResult<Option<Section>> {
        if self.cur.is_at_end() {
            return Ok(None);
        }

        let header = self.read_header()?;

        let body = match self.read_body(&header) {
            Err(e) if e.is_fatal() => return Err(e),
            body => body,
        };

        self.cur.seek(SeekFrom::Start(header.end()))?;

        Ok(Some(Section { header, body }))
    }

    fn read_header(&mut self) -> DecodeResult<SectionHeader> {
        let offset = self.cur.tell();
        let [tag, length, unknown, header_skip] = self.cur.i32_array::<4>()?;
        let body_start = self.cur.tell();

        let malformed = |reason: String| DecodeError::MalformedSection { offset, reason };

        if length < 0 {
            return Err(malformed(format!("negative length {}", length)));
        }

        if body_start + length as u64 > self.cur.size() {
            return Err(malformed(format!(
                "length {} runs past the end of the buffer ({} bytes)",
                length,
                self.cur.size()
            )));
        }

        self.cur
            .seek(SeekFrom::Current(i64::from(header_skip)))
            .map_err(|_| malformed(format!("header skip {} leaves the buffer", header_skip)))?;

        let ids = self.cur.i32_array::<7>()?;
        let label = self.cur.fixed_string(LABEL_SIZE)?;

        let header = SectionHeader {
            offset,
            kind: SectionKind::from(tag),
            length,
            unknown,
            header_skip,
            body_start,
            ids,
            label,
        };

        tracing::debug!(
            "section {:?} id {} at 0x{:X}, {} bytes",
            header.kind,
            header.section_id(),
            offset,
            length
        );

        Ok(header)
    }

    fn read_body(&mut self, header: &SectionHeader) -> DecodeResult<SectionBody> {
        let cur = &mut self.cur;

        let body = match header.kind {
            SectionKind::Known(SectionTag::Skeleton) => {
                SectionBody::Skeleton(BoneTable::from_cursor(cur)?)
            }
            SectionKind::Known(SectionTag::Texture) => {
                SectionBody::Texture(TextureDescriptor::from_cursor(cur)?)
            }
            SectionKind::Known(SectionTag::MeshInfo) => {
                SectionBody::MeshInfo(read_mesh_info(cur)?)
            }
            SectionKind::Known(SectionTag::Material) => {
                SectionBody::Material(MaterialBinding::from_cursor(cur)?)
            }
            SectionKind::Known(SectionTag::Stream) => {
                SectionBody::Stream(StreamEntry::from_cursor(cur)?)
            }
            SectionKind::Unknown(tag) => SectionBody::Unknown(tag),
        };

        Ok(body)
    }
}
