use std::{
    fs::{self, File},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian, WriteBytesExt};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    context::ParseContext,
    cursor::BinCursor,
    d3d::CompressedFormat,
    error::{DecodeError, DecodeResult},
    images,
};

pub const TEXTURE_DESCRIPTOR_FIELDS: usize = 55;
pub const DDS_HEADER_SIZE: usize = 128;

const DDS_MAGIC: &[u8; 4] = b"DDS ";
// CAPS | HEIGHT | WIDTH | PIXELFORMAT | MIPMAPCOUNT | LINEARSIZE
const DDSD_FLAGS: u32 = 0x000A_1007;
// ALPHAPIXELS | FOURCC
const DDPF_FLAGS: u32 = 0x5;
// COMPLEX | TEXTURE | MIPMAP
const DDSCAPS: u32 = 0x0040_1008;

/// Square texture sizes, keyed by the size code of a texture section.
///
/// The codes were worked out from shipped files rather than documentation. 65541 in
/// particular was corrected by hand from a neighbouring code, and codes outside this range
/// have never been seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum TextureSize {
    S64 = 65541,
    S128 = 65542,
    S256 = 65543,
    S512 = 65544,
    S1024 = 65545,
    S2048 = 65546,
}

impl TextureSize {
    pub fn dimension(&self) -> u32 {
        match self {
            TextureSize::S64 => 64,
            TextureSize::S128 => 128,
            TextureSize::S256 => 256,
            TextureSize::S512 => 512,
            TextureSize::S1024 => 1024,
            TextureSize::S2048 => 2048,
        }
    }
}

/// The 55 int32 fields of a texture section body.
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    fields: [i32; TEXTURE_DESCRIPTOR_FIELDS],
}

impl TextureDescriptor {
    pub fn from_cursor(cur: &mut BinCursor) -> DecodeResult<TextureDescriptor> {
        Ok(TextureDescriptor {
            fields: cur.i32_array::<TEXTURE_DESCRIPTOR_FIELDS>()?,
        })
    }

    pub fn fields(&self) -> &[i32; TEXTURE_DESCRIPTOR_FIELDS] {
        &self.fields
    }

    pub fn codec(&self) -> i32 {
        self.fields[1]
    }

    pub fn size_code(&self) -> i32 {
        self.fields[4]
    }

    /// Absolute offset of the pixel data inside the companion file.
    pub fn payload_offset(&self) -> i32 {
        self.fields[12]
    }

    pub fn payload_size(&self) -> i32 {
        self.fields[13]
    }

    /// Edge length and block format, if both codes are ones this decoder knows.
    pub fn format(&self) -> DecodeResult<(u32, CompressedFormat)> {
        let unsupported = || DecodeError::UnsupportedTextureFormat {
            size_code: self.size_code(),
            codec: self.codec(),
        };

        let size = TextureSize::try_from(self.size_code()).map_err(|_| unsupported())?;
        let format = CompressedFormat::try_from(self.codec()).map_err(|_| unsupported())?;

        Ok((size.dimension(), format))
    }
}

/// A compressed texture lifted out of the companion file.
#[derive(Debug, Clone)]
pub struct DecodedTexture {
    pub width: u32,
    pub height: u32,
    pub format: CompressedFormat,
    pub payload: Vec<u8>,
}

impl DecodedTexture {
    pub fn fourcc(&self) -> [u8; 4] {
        self.format.fourcc()
    }

    /// Builds the legacy 128-byte DDS header for this texture.
    pub fn dds_header(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(DDS_HEADER_SIZE);

        bytes.write_all(DDS_MAGIC)?;
        bytes.write_u32::<LittleEndian>(DDS_HEADER_SIZE as u32 - 4)?;
        bytes.write_u32::<LittleEndian>(DDSD_FLAGS)?;
        // 0x0C
        bytes.write_u32::<LittleEndian>(self.height)?;
        // 0x10
        bytes.write_u32::<LittleEndian>(self.width)?;
        bytes.write_u32::<LittleEndian>(self.format.level_size(self.width, self.height) as u32)?;
        // Depth
        bytes.write_u32::<LittleEndian>(0)?;
        bytes.write_u32::<LittleEndian>(self.format.mip_levels(
            self.width,
            self.height,
            self.payload.len(),
        ))?;

        // Reserved
        bytes.resize(0x4C, 0);

        // Pixel format
        bytes.write_u32::<LittleEndian>(32)?;
        bytes.write_u32::<LittleEndian>(DDPF_FLAGS)?;
        // 0x54
        bytes.write_all(&self.fourcc())?;

        bytes.resize(0x6C, 0);
        bytes.write_u32::<LittleEndian>(DDSCAPS)?;
        bytes.resize(DDS_HEADER_SIZE, 0);

        Ok(bytes)
    }

    pub fn to_dds_bytes(&self) -> io::Result<Vec<u8>> {
        let mut bytes = self.dds_header()?;
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }

    /// Decompresses the top mip level and writes it out as a PNG.
    pub fn dump_png(&self, path: &Path) -> io::Result<()> {
        let top_level = self.format.level_size(self.width, self.height);

        if self.payload.len() < top_level {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Required {} bytes for the top mip level ({} available)",
                    top_level,
                    self.payload.len()
                ),
            ));
        }

        let rgba = images::transcode(
            self.width as usize,
            self.height as usize,
            self.format,
            &self.payload[..top_level],
        )?;

        images::write_png(path, self.width, self.height, &rgba)
    }
}

/// What the scan reports for each texture section it decoded.
#[derive(Debug, Clone)]
pub struct ExtractedTexture {
    pub section_id: i32,
    pub width: u32,
    pub height: u32,
    pub format: CompressedFormat,
    pub payload_len: usize,
    pub dds_path: Option<PathBuf>,
    pub png_path: Option<PathBuf>,
}

/// Reads the payload a texture section points at and writes `<id>.dds` (and optionally a
/// PNG preview) into the context's output directory.
pub fn extract_texture(
    ctx: &ParseContext,
    section_id: i32,
    descriptor: &TextureDescriptor,
) -> DecodeResult<ExtractedTexture> {
    let (dimension, format) = descriptor.format()?;

    let offset = u64::try_from(descriptor.payload_offset()).map_err(|_| {
        DecodeError::NegativeField {
            what: "texture payload offset",
            value: descriptor.payload_offset(),
        }
    })?;
    let size = usize::try_from(descriptor.payload_size()).map_err(|_| {
        DecodeError::NegativeField {
            what: "texture payload size",
            value: descriptor.payload_size(),
        }
    })?;

    let companion = ctx.companion_path().ok_or_else(|| {
        DecodeError::MissingCompanionFile(ctx.source_path().to_path_buf())
    })?;

    let payload = read_companion(&companion, offset, size)?;

    let texture = DecodedTexture {
        width: dimension,
        height: dimension,
        format,
        payload,
    };

    let mut extracted = ExtractedTexture {
        section_id,
        width: texture.width,
        height: texture.height,
        format,
        payload_len: texture.payload.len(),
        dds_path: None,
        png_path: None,
    };

    if ctx.writes_textures() {
        let path = ctx.texture_path(section_id);
        fs::write(&path, texture.to_dds_bytes()?)
            .map_err(|e| DecodeError::File(path.clone(), e))?;

        tracing::info!(
            texture = section_id,
            "wrote {}x{} {:?} to {}",
            texture.width,
            texture.height,
            format,
            path.display()
        );

        extracted.dds_path = Some(path);
    }

    if ctx.png_previews() {
        let path = ctx.texture_path(section_id).with_extension("png");
        texture
            .dump_png(&path)
            .map_err(|e| DecodeError::File(path.clone(), e))?;

        extracted.png_path = Some(path);
    }

    Ok(extracted)
}

fn read_companion(path: &Path, offset: u64, size: usize) -> DecodeResult<Vec<u8>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DecodeError::MissingCompanionFile(path.to_path_buf()));
        }
        Err(e) => return Err(DecodeError::File(path.to_path_buf(), e)),
    };

    let truncated = || DecodeError::CompanionTruncated {
        path: path.to_path_buf(),
        offset,
        wanted: size as u64,
    };

    let len = file
        .metadata()
        .map_err(|e| DecodeError::File(path.to_path_buf(), e))?
        .len();

    if offset.saturating_add(size as u64) > len {
        return Err(truncated());
    }

    file.seek(SeekFrom::Start(offset))
        .map_err(|e| DecodeError::File(path.to_path_buf(), e))?;

    let mut payload = vec![0u8; size];
    file.read_exact(&mut payload).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => truncated(),
        _ => DecodeError::File(path.to_path_buf(), e),
    })?;

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(codec: i32, size_code: i32, offset: i32, size: i32) -> TextureDescriptor {
        let mut fields = [0; TEXTURE_DESCRIPTOR_FIELDS];
        fields[1] = codec;
        fields[4] = size_code;
        fields[12] = offset;
        fields[13] = size;
        TextureDescriptor { fields }
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn size_codes() {
        let expected = [
            (65541, 64),
            (65542, 128),
            (65543, 256),
            (65544, 512),
            (65545, 1024),
            (65546, 2048),
        ];

        for (code, dimension) in expected {
            assert_eq!(
                TextureSize::try_from(code).unwrap().dimension(),
                dimension
            );
        }

        assert!(TextureSize::try_from(65540).is_err());
        assert!(TextureSize::try_from(65547).is_err());
    }

    #[test]
    fn unknown_codes_are_unsupported() {
        assert!(matches!(
            descriptor(1, 65540, 0, 0).format(),
            Err(DecodeError::UnsupportedTextureFormat {
                size_code: 65540,
                codec: 1
            })
        ));
        assert!(matches!(
            descriptor(4, 65543, 0, 0).format(),
            Err(DecodeError::UnsupportedTextureFormat { codec: 4, .. })
        ));
        assert_eq!(
            descriptor(3, 65546, 0, 0).format().unwrap(),
            (2048, CompressedFormat::Dxt5)
        );
    }

    #[test]
    fn header_layout() {
        let texture = DecodedTexture {
            width: 256,
            height: 256,
            format: CompressedFormat::Dxt1,
            payload: vec![0; CompressedFormat::Dxt1.level_size(256, 256)],
        };

        let header = texture.dds_header().unwrap();

        assert_eq!(header.len(), DDS_HEADER_SIZE);
        assert_eq!(&header[0..4], b"DDS ");
        assert_eq!(u32_at(&header, 0x04), 124);
        assert_eq!(u32_at(&header, 0x08), DDSD_FLAGS);
        assert_eq!(u32_at(&header, 0x0C), 256);
        assert_eq!(u32_at(&header, 0x10), 256);
        assert_eq!(u32_at(&header, 0x14), 32768);
        assert_eq!(u32_at(&header, 0x1C), 1);
        assert_eq!(u32_at(&header, 0x4C), 32);
        assert_eq!(u32_at(&header, 0x50), DDPF_FLAGS);
        assert_eq!(&header[0x54..0x58], b"DXT1");
        assert_eq!(u32_at(&header, 0x6C), DDSCAPS);

        let dds = texture.to_dds_bytes().unwrap();
        assert_eq!(dds.len(), DDS_HEADER_SIZE + texture.payload.len());
    }

    #[test]
    fn extracts_payload_range_from_companion() {
        let dir = tempfile::tempdir().unwrap();
        let perm = dir.path().join("chr.perm.bin");
        let temp = dir.path().join("chr.temp.bin");

        let mut companion = vec![0xAB; 16];
        companion.extend((0..32u8).collect::<Vec<_>>());
        companion.extend_from_slice(&[0xCD; 8]);
        fs::write(&temp, &companion).unwrap();

        let ctx = ParseContext::new(&perm);
        let extracted = extract_texture(&ctx, 77, &descriptor(1, 65541, 16, 32)).unwrap();

        assert_eq!(extracted.width, 64);
        assert_eq!(extracted.payload_len, 32);

        let path = extracted.dds_path.unwrap();
        assert_eq!(path, dir.path().join("77.dds"));

        let dds = fs::read(&path).unwrap();
        assert_eq!(&dds[0x54..0x58], b"DXT1");
        assert_eq!(&dds[DDS_HEADER_SIZE..], &companion[16..48]);
    }

    #[test]
    fn missing_companion_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ParseContext::new(dir.path().join("chr.perm.bin"));

        let result = extract_texture(&ctx, 5, &descriptor(1, 65543, 0, 8));

        assert!(matches!(result, Err(DecodeError::MissingCompanionFile(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn short_companion_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chr.temp.bin"), [0u8; 10]).unwrap();
        let ctx = ParseContext::new(dir.path().join("chr.perm.bin"));

        let result = extract_texture(&ctx, 5, &descriptor(2, 65543, 4, 8));

        assert!(matches!(result, Err(DecodeError::CompanionTruncated { .. })));
        assert!(!ctx.texture_path(5).exists());
    }

    #[test]
    fn decoding_without_output() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("chr.temp.bin"), [0u8; 8]).unwrap();
        let ctx = ParseContext::new(dir.path().join("chr.perm.bin")).with_texture_output(false);

        let extracted = extract_texture(&ctx, 5, &descriptor(1, 65541, 0, 8)).unwrap();

        assert!(extracted.dds_path.is_none());
        assert!(!ctx.texture_path(5).exists());
    }
}
