use std::{fs::File, io::BufWriter, path::Path};

use crate::d3d::CompressedFormat;

/// Decompresses a single block-compressed mip level into tightly packed RGBA8.
pub fn transcode(
    width: usize,
    height: usize,
    src_format: CompressedFormat,
    bytes: &[u8],
) -> Result<Vec<u8>, std::io::Error> {
    let encoding = match src_format {
        CompressedFormat::Dxt1 => bcndecode::BcnEncoding::Bc1,
        CompressedFormat::Dxt3 => bcndecode::BcnEncoding::Bc2,
        CompressedFormat::Dxt5 => bcndecode::BcnEncoding::Bc3,
    };

    bcndecode::decode(
        bytes,
        width,
        height,
        encoding,
        bcndecode::BcnDecoderFormat::RGBA,
    )
    .map_err(std::io::Error::other)
}

pub fn write_png(path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<(), std::io::Error> {
    let file = File::create(path)?;
    let w = &mut BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    writer.finish()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_dxt1_block_decodes_to_uniform_opaque_texels() {
        // colour0 = colour1 = pure red (RGB565 0xF800), every texel picks colour0.
        let block = [0x00, 0xF8, 0x00, 0xF8, 0, 0, 0, 0];

        let rgba = transcode(4, 4, CompressedFormat::Dxt1, &block).unwrap();

        assert_eq!(rgba.len(), 4 * 4 * 4);
        let first = &rgba[0..4];
        assert_eq!(first[3], 255);
        assert_eq!(first[1], 0);
        for texel in rgba.chunks(4) {
            assert_eq!(texel, first);
        }
    }

    #[test]
    fn png_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");

        write_png(&path, 2, 2, &[0x80; 16]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
