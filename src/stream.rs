//! Fixed-window streaming reads over a block-granular storage device.
//!
//! The storage collaborator (FAT over USB mass storage, SD, ...) only
//! guarantees whole-block reads, so [`StreamReader`] keeps a 32-block
//! window and refills it wholesale whenever a request runs past the end.
//! Consumed bytes are never re-delivered; the monotonic [`position`]
//! cursor is what sibling codecs use for end-of-stream detection.
//!
//! [`position`]: StreamReader::position

use alloc::vec::Vec;

use crate::error::Error;

/// Granularity of the underlying device reads.
pub const BLOCK_SIZE: usize = 512;

/// Input window size in blocks (16 KiB total).
pub const WINDOW_BLOCKS: usize = 32;

const WINDOW_SIZE: usize = WINDOW_BLOCKS * BLOCK_SIZE;

/// An open file on the block-storage collaborator.
///
/// `read_blocks` delivers the next `blocks` whole blocks of the file into
/// `buf` (which must hold `blocks * BLOCK_SIZE` bytes) and returns `true`.
/// Near end-of-file it delivers the remaining tail instead and the rest of
/// `buf` is unspecified; a well-formed image never consumes those bytes.
/// `false` means a device error.
pub trait BlockRead {
    fn read_blocks(&mut self, blocks: usize, buf: &mut [u8]) -> bool;
}

impl<F: FnMut(usize, &mut [u8]) -> bool> BlockRead for F {
    fn read_blocks(&mut self, blocks: usize, buf: &mut [u8]) -> bool {
        self(blocks, buf)
    }
}

/// The storage capability injected by the host: `open` yields a readable
/// handle, closing is the handle's `Drop`.
pub trait Storage {
    type File: BlockRead;

    fn open(&mut self, path: &str, name: &str) -> Option<Self::File>;
}

/// Forward-only reader holding the input window.
pub struct StreamReader<'a, D: BlockRead> {
    dev: &'a mut D,
    window: Vec<u8>,
    cursor: usize,
    position: u32,
}

impl<'a, D: BlockRead> StreamReader<'a, D> {
    /// Allocate the window and prime it with the first device burst.
    pub fn new(dev: &'a mut D) -> Result<Self, Error> {
        let mut window = Vec::new();
        window
            .try_reserve_exact(WINDOW_SIZE)
            .map_err(|_| Error::Resource("input window"))?;
        window.resize(WINDOW_SIZE, 0);

        if !dev.read_blocks(WINDOW_BLOCKS, &mut window) {
            return Err(Error::Io("block read failed"));
        }

        Ok(Self {
            dev,
            window,
            cursor: 0,
            position: 0,
        })
    }

    /// Bytes consumed from the file so far (`take` + `skip`).
    #[inline]
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Copy out `out.len()` bytes, refilling the window as the request
    /// runs past its end. Each refill is one whole-window device burst.
    pub fn take(&mut self, out: &mut [u8]) -> Result<(), Error> {
        let mut done = 0;
        while out.len() - done > WINDOW_SIZE - self.cursor {
            let tail = WINDOW_SIZE - self.cursor;
            out[done..done + tail].copy_from_slice(&self.window[self.cursor..]);
            done += tail;
            self.refill()?;
        }
        let rest = out.len() - done;
        out[done..].copy_from_slice(&self.window[self.cursor..self.cursor + rest]);
        self.cursor += rest;
        self.position += out.len() as u32;
        Ok(())
    }

    /// Advance `n` bytes without copying them out.
    pub fn skip(&mut self, n: usize) -> Result<(), Error> {
        let mut left = n;
        while left > WINDOW_SIZE - self.cursor {
            left -= WINDOW_SIZE - self.cursor;
            self.refill()?;
        }
        self.cursor += left;
        self.position += n as u32;
        Ok(())
    }

    fn refill(&mut self) -> Result<(), Error> {
        if !self.dev.read_blocks(WINDOW_BLOCKS, &mut self.window) {
            return Err(Error::Io("block read failed"));
        }
        self.cursor = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // in-memory device: sequential block reads over a byte vector
    fn mem_dev(data: Vec<u8>) -> impl FnMut(usize, &mut [u8]) -> bool {
        let mut pos = 0usize;
        move |blocks, buf: &mut [u8]| {
            let want = blocks * BLOCK_SIZE;
            assert!(buf.len() >= want);
            let n = want.min(data.len().saturating_sub(pos));
            buf[..n].copy_from_slice(&data[pos..pos + n]);
            pos += n;
            true
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn take_spans_window_refills() {
        let data = pattern(3 * WINDOW_SIZE + 777);
        let mut dev = mem_dev(data.clone());
        let mut rd = StreamReader::new(&mut dev).unwrap();

        let mut out = Vec::new();
        // uneven chunk sizes force takes that straddle refill boundaries
        for chunk in [13usize, 4096, 700, WINDOW_SIZE + 1, 9000, 31] {
            let mut buf = alloc::vec![0u8; chunk];
            rd.take(&mut buf).unwrap();
            out.extend_from_slice(&buf);
        }
        assert_eq!(out[..], data[..out.len()]);
        assert_eq!(rd.position() as usize, out.len());
    }

    #[test]
    fn skip_then_take_stays_aligned() {
        let data = pattern(2 * WINDOW_SIZE);
        let mut dev = mem_dev(data.clone());
        let mut rd = StreamReader::new(&mut dev).unwrap();

        rd.skip(WINDOW_SIZE - 3).unwrap();
        let mut buf = [0u8; 10];
        rd.take(&mut buf).unwrap();
        assert_eq!(buf[..], data[WINDOW_SIZE - 3..WINDOW_SIZE + 7]);
        assert_eq!(rd.position() as usize, WINDOW_SIZE + 7);
    }

    #[test]
    fn device_failure_surfaces_as_io() {
        let mut calls = 0;
        let mut dev = move |_blocks: usize, buf: &mut [u8]| {
            calls += 1;
            buf.fill(0xAB);
            calls < 2 // first burst succeeds, refill fails
        };
        let mut rd = StreamReader::new(&mut dev).unwrap();
        let mut buf = alloc::vec![0u8; WINDOW_SIZE + 1];
        assert_eq!(rd.take(&mut buf), Err(Error::Io("block read failed")));
    }
}
