// smol-bmp: minimal no_std BMP renderer for a 320x240 RGB565 framebuffer.
// stream: fixed-window block reader over an injected storage device
// header: BMP file/info header parsing, pixel-format classification
// color:  palette construction, bit-field masks, RGB565 conversion
// scale:  integer nearest-neighbour scaling via error accumulators
// frame:  framebuffer compositor: clear, centring, bounds-checked rows
// bmp:    the decode pass: header -> palette/masks -> row loop -> frame

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bmp;
pub mod color;
pub mod error;
pub mod frame;
pub mod header;
pub mod scale;
pub mod stream;

pub use bmp::{Outcome, display, render};
pub use error::Error;
pub use stream::{BLOCK_SIZE, BlockRead, Storage, StreamReader};
