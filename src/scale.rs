// Nearest-neighbour scaling without division on the hot path.
//
// One AxisStepper per axis. Horizontally, step() is called once per source
// column and says how many destination pixels that column covers; the sum
// over a row is exactly the render width. Vertically the same stepper
// decides how many destination rows each decoded source row covers, so
// skipped rows are read and discarded but never composited.

/// Integer error accumulator mapping `src` samples onto `dst` slots.
pub struct AxisStepper {
    err: i32,
    src: i32,
    dst: i32,
}

impl AxisStepper {
    pub fn new(src: u32, dst: u32) -> Self {
        Self {
            err: dst as i32 - 1,
            src: src as i32,
            dst: dst as i32,
        }
    }

    /// Consume one source sample; returns the number of destination slots
    /// it covers (0 = dropped by minification).
    #[inline]
    pub fn step(&mut self) -> u32 {
        let mut emits = 0;
        while self.err >= 0 {
            emits += 1;
            self.err -= self.src;
        }
        self.err += self.dst;
        emits
    }
}

/// Where the scaled image lands on the canvas: render size plus centring
/// offsets, aspect ratio preserved.
#[derive(Clone, Copy)]
pub struct FitGeometry {
    pub render_w: u32,
    pub render_h: u32,
    pub x_off: u32,
    pub y_off: u32,
}

impl FitGeometry {
    /// Pick the binding axis (the smaller canvas/source ratio), derive the
    /// other dimension from it, clamp to the canvas and centre the rest.
    pub fn compute(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> Self {
        let (mut render_w, mut render_h);
        if src_w == max_w && src_h == max_h {
            render_w = max_w;
            render_h = max_h;
        } else if (max_w as u64) * (src_h as u64) <= (max_h as u64) * (src_w as u64) {
            // width binds
            render_w = max_w;
            render_h = ((src_h as u64 * max_w as u64) / src_w as u64) as u32;
        } else {
            render_h = max_h;
            render_w = ((src_w as u64 * max_h as u64) / src_h as u64) as u32;
        }
        render_w = render_w.min(max_w);
        render_h = render_h.min(max_h);

        Self {
            render_w,
            render_h,
            x_off: (max_w - render_w) / 2,
            y_off: (max_h - render_h) / 2,
        }
    }
}
