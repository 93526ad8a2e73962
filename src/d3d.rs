use num_enum::{IntoPrimitive, TryFromPrimitive};

type BitCount = usize;

pub trait PixelBits {
    fn bits_per_pixel(&self) -> BitCount;
}

/// Block-compressed formats a texture section can declare, keyed by its codec code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum CompressedFormat {
    Dxt1 = 1,
    Dxt3 = 2,
    Dxt5 = 3,
}

impl CompressedFormat {
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            CompressedFormat::Dxt1 => *b"DXT1",
            CompressedFormat::Dxt3 => *b"DXT3",
            CompressedFormat::Dxt5 => *b"DXT5",
        }
    }

    /// Bytes per 4x4 block.
    pub fn block_size(&self) -> usize {
        // 16 texels per block
        self.bits_per_pixel() * 16 / 8
    }

    /// Size in bytes of one mip level of `width` x `height` texels.
    pub fn level_size(&self, width: u32, height: u32) -> usize {
        let blocks_wide = width.div_ceil(4).max(1) as usize;
        let blocks_high = height.div_ceil(4).max(1) as usize;

        blocks_wide * blocks_high * self.block_size()
    }

    /// How many whole mip levels, starting at `width` x `height`, fit into `payload_len`
    /// bytes. Never less than one.
    pub fn mip_levels(&self, width: u32, height: u32, payload_len: usize) -> u32 {
        let (mut w, mut h) = (width, height);
        let mut used = 0usize;
        let mut levels = 0u32;

        loop {
            used += self.level_size(w, h);
            if used > payload_len {
                break;
            }

            levels += 1;

            if w <= 1 && h <= 1 {
                break;
            }

            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }

        levels.max(1)
    }
}

impl PixelBits for CompressedFormat {
    fn bits_per_pixel(&self) -> BitCount {
        match self {
            // 4 bits
            CompressedFormat::Dxt1 => 4,

            // 8 bits
            CompressedFormat::Dxt3 | CompressedFormat::Dxt5 => 8,
        }
    }
}
