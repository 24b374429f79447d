// BMP file/info header parsing and pixel-format classification.
//
// Fields are decoded by offset out of the raw header bytes; headers are
// self-sizing and backward compatible, so the info header is read as the
// 40-byte base plus, for sizes >= 108, the four explicit channel masks.

use crate::error::Error;

/// Byte length of the fixed file header.
pub const FILE_HEADER_LEN: usize = 14;

/// Minimum accepted info-header size (the legacy fixed-size variant).
pub const INFO_HEADER_MIN: u32 = 40;

/// Info-header size that carries explicit channel masks.
pub const INFO_HEADER_EXT: u32 = 108;

/// Compression field: uncompressed rows.
pub const BI_RGB: u32 = 0;
/// Compression field: explicit bit-field masks.
pub const BI_BITFIELDS: u32 = 3;

const MAGIC: [u8; 2] = *b"BM";

// per-axis guard; keeps stride and scratch sizes sane on a 320x240 target
const MAX_DIM: u32 = 16384;

#[inline]
fn le_u16(d: &[u8], o: usize) -> u16 {
    u16::from_le_bytes([d[o], d[o + 1]])
}

#[inline]
fn le_u32(d: &[u8], o: usize) -> u32 {
    u32::from_le_bytes([d[o], d[o + 1], d[o + 2], d[o + 3]])
}

#[inline]
fn le_i32(d: &[u8], o: usize) -> i32 {
    le_u32(d, o) as i32
}

/// The fixed 14-byte file header. Only the pixel-data offset is consumed
/// after parsing.
#[derive(Clone, Copy)]
pub struct FileHeader {
    pub file_size: u32,
    pub pixel_offset: u32,
}

/// Parse and validate the file header.
pub fn parse_file_header(d: &[u8; FILE_HEADER_LEN]) -> Result<FileHeader, Error> {
    if d[..2] != MAGIC {
        return Err(Error::Format("bad magic"));
    }
    Ok(FileHeader {
        file_size: le_u32(d, 2),
        pixel_offset: le_u32(d, 10),
    })
}

/// Raw per-channel masks from an extended header (or format defaults).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMasks {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub alpha: u32,
}

const MASKS_565: RawMasks = RawMasks { red: 0xF800, green: 0x07E0, blue: 0x001F, alpha: 0 };
const MASKS_555: RawMasks = RawMasks { red: 0x7C00, green: 0x03E0, blue: 0x001F, alpha: 0 };
const MASKS_888: RawMasks =
    RawMasks { red: 0x00FF_0000, green: 0x0000_FF00, blue: 0x0000_00FF, alpha: 0 };
const MASKS_8888: RawMasks =
    RawMasks { red: 0x00FF_0000, green: 0x0000_FF00, blue: 0x0000_00FF, alpha: 0xFF00_0000 };

/// The self-sizing info header, reduced to the fields this pipeline
/// consumes.
#[derive(Clone, Copy)]
pub struct InfoHeader {
    pub header_size: u32,
    pub width: i32,
    pub height: i32, // sign encodes row order
    pub bit_count: u16,
    pub compression: u32,
    pub palette_colors: u32,
    pub masks: Option<RawMasks>,
}

impl InfoHeader {
    /// Parse the 36 fixed fields following the 4-byte self-size.
    pub fn parse(header_size: u32, fields: &[u8; 36]) -> Result<Self, Error> {
        let width = le_i32(fields, 0);
        let height = le_i32(fields, 4);
        let planes = le_u16(fields, 8);

        if width <= 0 || height == 0 {
            return Err(Error::Format("bad dimensions"));
        }
        if width as u32 > MAX_DIM || height.unsigned_abs() > MAX_DIM {
            return Err(Error::Format("image too large"));
        }
        if planes != 1 {
            log::warn!("bmp: planes = {planes}, ignoring");
        }

        Ok(Self {
            header_size,
            width,
            height,
            bit_count: le_u16(fields, 10),
            compression: le_u32(fields, 12),
            palette_colors: le_u32(fields, 28),
            masks: None,
        })
    }

    /// Attach the explicit channel masks of an extended header.
    ///
    /// All-zero color masks are treated as mask-less so the format
    /// defaults still apply.
    pub fn set_masks(&mut self, m: &[u8; 16]) {
        let masks = RawMasks {
            red: le_u32(m, 0),
            green: le_u32(m, 4),
            blue: le_u32(m, 8),
            alpha: le_u32(m, 12),
        };
        if (masks.red | masks.green | masks.blue) == 0 {
            log::warn!("bmp: extended header with zero masks, using defaults");
            return;
        }
        self.masks = Some(masks);
    }

    /// Explicit masks when present, otherwise the format defaults for the
    /// bit depth (5-5-5 for 16bpp, 8-8-8 for 24bpp, 8-8-8-8 for 32bpp).
    pub fn channel_masks(&self) -> RawMasks {
        match self.masks {
            Some(m) => m,
            None => match self.bit_count {
                16 => MASKS_555,
                32 => MASKS_8888,
                _ => MASKS_888,
            },
        }
    }

    /// Bytes per encoded source row, padded to a 4-byte boundary.
    #[inline]
    pub fn row_stride(&self) -> usize {
        ((self.bit_count as usize * self.width as usize + 31) / 32) * 4
    }

    /// Source row count, orientation stripped.
    #[inline]
    pub fn rows(&self) -> u32 {
        self.height.unsigned_abs()
    }

    /// Top-down sources store the first row first; the legacy convention
    /// is bottom-up.
    #[inline]
    pub fn top_down(&self) -> bool {
        self.height < 0
    }
}

/// How the pixel samples of one image decode, resolved once per image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    /// 1/2/4 bits per pixel, palette lookup, MSB-first packing.
    Indexed,
    /// 8 bits per pixel, palette lookup.
    Indexed8,
    /// 16bpp already in 5-6-5 layout; rows can be copied outright.
    Native,
    /// 16bpp 5-5-5.
    Rgb555,
    /// 24bpp B-G-R triplets.
    Rgb888,
    /// 32bpp B-G-R-A quads, alpha-weighted.
    Rgba8888,
    /// Arbitrary masks from an extended header, optional alpha.
    Bitfields,
}

/// Resolve the decode mode from bit depth, compression and masks.
pub fn classify(info: &InfoHeader) -> Result<PixelMode, Error> {
    if info.compression != BI_RGB && info.compression != BI_BITFIELDS {
        return Err(Error::Format("unsupported compression"));
    }
    if info.compression == BI_BITFIELDS && info.masks.is_none() {
        return Err(Error::Format("mask compression requires extended header"));
    }

    match (info.bit_count, info.compression) {
        (1 | 2 | 4, BI_RGB) => Ok(PixelMode::Indexed),
        (8, BI_RGB) => Ok(PixelMode::Indexed8),
        (16, _) => Ok(match info.channel_masks() {
            MASKS_565 => PixelMode::Native,
            MASKS_555 => PixelMode::Rgb555,
            _ => PixelMode::Bitfields,
        }),
        (24, _) => Ok(match info.channel_masks() {
            MASKS_888 => PixelMode::Rgb888,
            _ => PixelMode::Bitfields,
        }),
        (32, _) => Ok(match info.channel_masks() {
            MASKS_8888 => PixelMode::Rgba8888,
            _ => PixelMode::Bitfields,
        }),
        _ => Err(Error::Format("unsupported pixel format")),
    }
}
