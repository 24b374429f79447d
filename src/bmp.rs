// The decode pass: stream the headers, resolve the pixel mode, then walk
// every source row through the scaler into the framebuffer. Decode cost is
// O(sourceHeight) regardless of the render height; the storage collaborator
// has no fine-grained seek, so skipped rows are read and discarded.
//
// All scratch (window, palette, row, scanline) is owned by the pass and
// dropped on every path out of it.

use alloc::vec::Vec;

use crate::color::{MaskSet, QuantError, build_palette, rgb_to_565_dithered, rgb555_to_565};
use crate::error::Error;
use crate::frame::{BACKGROUND, Frame, HEIGHT, WIDTH};
use crate::header::{
    FILE_HEADER_LEN, INFO_HEADER_EXT, INFO_HEADER_MIN, InfoHeader, PixelMode, classify,
    parse_file_header,
};
use crate::scale::{AxisStepper, FitGeometry};
use crate::stream::{BlockRead, Storage, StreamReader};

/// How a successful pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every contributing source row was composited.
    Complete,
    /// The host cancelled between rows; the partial image stays visible.
    Cancelled,
    /// A row fell outside the surface; the pass stopped at the edge.
    Clipped,
}

/// Open `name` under `path` through the storage capability and render it.
/// The handle is released on every path out of the pass.
pub fn display<S, C>(
    storage: &mut S,
    path: &str,
    name: &str,
    vram: &mut [u16],
    cancel: C,
) -> Result<Outcome, Error>
where
    S: Storage,
    C: FnMut() -> bool,
{
    let mut file = storage.open(path, name).ok_or(Error::Io("open failed"))?;
    render(&mut file, vram, cancel)
}

/// Decode one BMP from an open device into `vram` (320x240 RGB565).
/// `cancel` is polled once per source row; a `true` ends the pass as
/// [`Outcome::Cancelled`] with normal cleanup.
pub fn render<D, C>(dev: &mut D, vram: &mut [u16], mut cancel: C) -> Result<Outcome, Error>
where
    D: BlockRead,
    C: FnMut() -> bool,
{
    let mut frame = Frame::new(vram)?;
    let mut reader = StreamReader::new(dev)?;

    let mut fh_bytes = [0u8; FILE_HEADER_LEN];
    reader.take(&mut fh_bytes)?;
    let file_header = parse_file_header(&fh_bytes)?;

    let mut size_bytes = [0u8; 4];
    reader.take(&mut size_bytes)?;
    let header_size = u32::from_le_bytes(size_bytes);
    if header_size < INFO_HEADER_MIN {
        return Err(Error::Format("info header too small"));
    }

    let mut fields = [0u8; 36];
    reader.take(&mut fields)?;
    let mut info = InfoHeader::parse(header_size, &fields)?;

    if header_size >= INFO_HEADER_EXT {
        let mut mask_bytes = [0u8; 16];
        reader.take(&mut mask_bytes)?;
        info.set_masks(&mask_bytes);
        reader.skip(header_size as usize - 56)?;
    } else {
        reader.skip(header_size as usize - 40)?;
    }

    let mode = classify(&info)?;

    let palette = match mode {
        PixelMode::Indexed | PixelMode::Indexed8 => build_palette(&mut reader, &info)?,
        _ => Vec::new(),
    };
    let masks = MaskSet::new(&info.channel_masks());

    // forward to the pixel array
    let pos = reader.position();
    if file_header.pixel_offset < pos {
        return Err(Error::Format("bad pixel data offset"));
    }
    reader.skip((file_header.pixel_offset - pos) as usize)?;

    let src_w = info.width as u32;
    let src_h = info.rows();
    let geom = FitGeometry::compute(src_w, src_h, WIDTH as u32, HEIGHT as u32);

    log::info!(
        "bmp: {}x{}{} {}bpp {:?} -> {}x{} at ({},{})",
        src_w,
        src_h,
        if info.top_down() { " top-down" } else { "" },
        info.bit_count,
        mode,
        geom.render_w,
        geom.render_h,
        geom.x_off,
        geom.y_off
    );

    let stride = info.row_stride();
    let mut row = Vec::new();
    row.try_reserve_exact(stride)
        .map_err(|_| Error::Resource("row buffer"))?;
    row.resize(stride, 0);

    let mut scan = Vec::new();
    scan.try_reserve_exact(geom.render_w as usize)
        .map_err(|_| Error::Resource("scanline buffer"))?;
    scan.resize(geom.render_w as usize, 0);

    let dec = RowDecoder {
        mode,
        bytes: (info.bit_count / 8) as usize,
        bits: info.bit_count,
        palette: &palette,
        masks,
    };

    frame.clear();

    let mut ystep = AxisStepper::new(src_h, geom.render_h);
    let mut dy = 0u32;
    for _sy in 0..src_h {
        if cancel() {
            return Ok(Outcome::Cancelled);
        }
        reader.take(&mut row)?;
        let emits = ystep.step();
        if emits == 0 {
            continue; // row decoded and discarded
        }
        scale_row(&dec, &row, src_w, &mut scan);
        for _ in 0..emits {
            let y = if info.top_down() {
                (geom.y_off + dy) as i32
            } else {
                (geom.y_off + geom.render_h - 1 - dy) as i32
            };
            if !frame.write_row(geom.x_off, y, &scan) {
                return Ok(Outcome::Clipped);
            }
            dy += 1;
        }
    }

    Ok(Outcome::Complete)
}

// per-image pixel decoding, resolved once per pass
struct RowDecoder<'a> {
    mode: PixelMode,
    bytes: usize, // bytes per sample in the direct/masked modes
    bits: u16,    // source bit depth, for sub-byte index unpacking
    palette: &'a [u16],
    masks: MaskSet,
}

impl RowDecoder<'_> {
    #[inline]
    fn pixel(&self, row: &[u8], x: usize, err: &mut QuantError) -> u16 {
        match self.mode {
            PixelMode::Indexed => {
                // MSB-first packing within each byte
                let bpp = self.bits as usize;
                let ppb = 8 / bpp;
                let shift = (ppb - 1 - x % ppb) * bpp;
                let mask = (1u8 << bpp) - 1;
                let idx = (row[x / ppb] >> shift) & mask;
                self.palette.get(idx as usize).copied().unwrap_or(BACKGROUND)
            }
            PixelMode::Indexed8 => self
                .palette
                .get(row[x] as usize)
                .copied()
                .unwrap_or(BACKGROUND),
            PixelMode::Native => u16::from_le_bytes([row[x * 2], row[x * 2 + 1]]),
            PixelMode::Rgb555 => rgb555_to_565(u16::from_le_bytes([row[x * 2], row[x * 2 + 1]])),
            PixelMode::Rgb888 => {
                let i = x * 3;
                rgb_to_565_dithered(row[i + 2], row[i + 1], row[i], err)
            }
            PixelMode::Rgba8888 => {
                let i = x * 4;
                let a = row[i + 3];
                if a == 255 {
                    rgb_to_565_dithered(row[i + 2], row[i + 1], row[i], err)
                } else {
                    let scale = |c: u8| ((c as u16 * a as u16) / 255) as u8;
                    rgb_to_565_dithered(scale(row[i + 2]), scale(row[i + 1]), scale(row[i]), err)
                }
            }
            PixelMode::Bitfields => {
                let i = x * self.bytes;
                let mut sample = 0u32;
                for k in 0..self.bytes {
                    sample |= (row[i + k] as u32) << (8 * k);
                }
                self.masks.to_rgb565(sample)
            }
        }
    }
}

// convert and horizontally scale one source row into the scanline
fn scale_row(dec: &RowDecoder<'_>, row: &[u8], src_w: u32, out: &mut [u16]) {
    if dec.mode == PixelMode::Native && out.len() == src_w as usize {
        // native fast path: the row is already 5-6-5 little-endian
        for (i, px) in out.iter_mut().enumerate() {
            *px = u16::from_le_bytes([row[i * 2], row[i * 2 + 1]]);
        }
        return;
    }

    let mut xstep = AxisStepper::new(src_w, out.len() as u32);
    let mut err = QuantError::default();
    let mut di = 0;
    for sx in 0..src_w as usize {
        let emits = xstep.step();
        if emits == 0 {
            continue;
        }
        let px = dec.pixel(row, sx, &mut err);
        for _ in 0..emits {
            out[di] = px;
            di += 1;
        }
    }
    debug_assert_eq!(di, out.len());
}
