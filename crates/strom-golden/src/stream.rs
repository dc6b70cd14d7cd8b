//! Incremental models of the data-path reordering hardware.
//!
//! The accelerator never holds a full frame: a line buffer delays whole image
//! rows, a window extractor assembles `K×K` tiles from the delayed rows, and
//! a channel repeater replays each tile for every output-channel consumer.
//! These models predict the *order* of hardware output while stimulus is
//! still streaming in, value by value, in [`Tensor::to_stream`] order.
//!
//! Every model is a fixed-capacity shift register. Before it has seen enough
//! input ("primed"), its output contains the zero-filled history left by the
//! hardware reset. That is defined behavior, not an error.
//!
//! [`Tensor::to_stream`]: crate::tensor::Tensor::to_stream

use std::collections::VecDeque;

/// Row-delay buffer holding the last `(window - 1) * channels * width`
/// scalars of the input stream.
///
/// On each new input it returns the vertical slice aligned with the current
/// column (one value per buffered row, oldest row first, the new value
/// last), then evicts the oldest scalar. Buffer length is constant for the
/// whole run.
#[derive(Debug)]
pub struct LineBuffer {
    channels: usize,
    width: usize,
    window: usize,
    buffer: VecDeque<i64>,
}

impl LineBuffer {
    /// Create a buffer for `channels`-interleaved rows of `width` pixels,
    /// delaying enough history for a `window`-row vertical slice.
    pub fn new(channels: usize, width: usize, window: usize) -> Self {
        let capacity = (window - 1) * channels * width;
        Self {
            channels,
            width,
            window,
            buffer: std::iter::repeat(0).take(capacity).collect(),
        }
    }

    /// Feed one scalar; returns the `window`-high vertical slice at the
    /// current stream position (oldest row first, `value` last).
    pub fn push(&mut self, value: i64) -> Vec<i64> {
        let row_stride = self.channels * self.width;
        let mut slice = Vec::with_capacity(self.window);
        for i in 0..self.window - 1 {
            slice.push(self.buffer[row_stride * i]);
        }
        slice.push(value);
        if !self.buffer.is_empty() {
            self.buffer.push_back(value);
            self.buffer.pop_front();
        }
        slice
    }

    /// Number of buffered scalars (constant across the run)
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

/// One `K×K` tile for one input channel, row-major within the tile.
pub type Tile = Vec<i64>;

/// Sliding-window extractor.
///
/// Consumes the scalar stream in `(h, w, ch)` order and emits, for every
/// position where the full kernel fits (honoring stride in both axes), one
/// [`Tile`] per input channel. Tile transactions are ordered per valid
/// position (row-major across the image), input channels in ascending
/// order, bit-identical to the windowing of the whole-frame convolution.
#[derive(Debug)]
pub struct WindowExtractor {
    channels: usize,
    width: usize,
    height: usize,
    ksize: usize,
    stride: usize,
    /// Last `ksize` rows, `(ch, row mod ksize, col)` indexed.
    rows: Vec<i64>,
    ch: usize,
    col: usize,
    row: usize,
}

impl WindowExtractor {
    /// Create an extractor for a `channels × height × width` stream and a
    /// `ksize`/`stride` window.
    pub fn new(channels: usize, height: usize, width: usize, ksize: usize, stride: usize) -> Self {
        Self {
            channels,
            width,
            height,
            ksize,
            stride,
            rows: vec![0; channels * ksize * width],
            ch: 0,
            col: 0,
            row: 0,
        }
    }

    fn row_slot(&self, ch: usize, row: usize, col: usize) -> usize {
        (ch * self.ksize + row % self.ksize) * self.width + col
    }

    /// Feed one scalar from the `(h, w, ch)` stream.
    ///
    /// Returns the per-channel tiles of the window whose bottom-right corner
    /// just completed, or an empty vector when the position is skipped
    /// (stride) or the kernel does not yet fit.
    pub fn push(&mut self, value: i64) -> Vec<Tile> {
        let slot = self.row_slot(self.ch, self.row, self.col);
        self.rows[slot] = value;

        let mut tiles = Vec::new();
        self.ch += 1;
        if self.ch == self.channels {
            self.ch = 0;
            if self.window_complete_here() {
                tiles.reserve(self.channels);
                for ch in 0..self.channels {
                    let mut tile = Vec::with_capacity(self.ksize * self.ksize);
                    for kr in 0..self.ksize {
                        let abs_row = self.row + 1 + kr - self.ksize;
                        for kc in 0..self.ksize {
                            let abs_col = self.col + 1 + kc - self.ksize;
                            tile.push(self.rows[self.row_slot(ch, abs_row, abs_col)]);
                        }
                    }
                    tiles.push(tile);
                }
            }
            self.col += 1;
            if self.col == self.width {
                self.col = 0;
                self.row += 1;
            }
        }
        tiles
    }

    /// Whether the pixel just completed is the bottom-right corner of a
    /// valid, stride-aligned window.
    fn window_complete_here(&self) -> bool {
        self.row + 1 >= self.ksize
            && self.col + 1 >= self.ksize
            && (self.row + 1 - self.ksize) % self.stride == 0
            && (self.col + 1 - self.ksize) % self.stride == 0
            && self.row < self.height
    }

    /// Total tiles this extractor will emit for one full frame
    pub fn expected_tile_count(&self) -> usize {
        let out_h = self
            .height
            .checked_sub(self.ksize)
            .map_or(0, |d| d / self.stride + 1);
        let out_w = self
            .width
            .checked_sub(self.ksize)
            .map_or(0, |d| d / self.stride + 1);
        out_h * out_w * self.channels
    }
}

/// Replicates each window tile for the `repeat` output-channel consumers
/// fed from the same spatial position in one cycle group.
#[derive(Debug, Clone, Copy)]
pub struct ChannelRepeater {
    repeat: usize,
}

impl ChannelRepeater {
    /// Create a repeater for `repeat` consumers
    pub const fn new(repeat: usize) -> Self {
        Self { repeat }
    }

    /// Consumer count
    pub const fn repeat(&self) -> usize {
        self.repeat
    }

    /// Replay one position's tile group once per consumer.
    pub fn push(&self, tiles: &[Tile]) -> Vec<Tile> {
        let mut out = Vec::with_capacity(tiles.len() * self.repeat);
        for _ in 0..self.repeat {
            out.extend_from_slice(tiles);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;
    use strom_fixed::FixedPointFormat;

    fn u8_0() -> FixedPointFormat {
        FixedPointFormat::new(8, 0, false).unwrap()
    }

    #[test]
    fn line_buffer_constant_capacity() {
        let mut lb = LineBuffer::new(1, 4, 3);
        assert_eq!(lb.capacity(), 8);
        for v in 0..20 {
            lb.push(v);
            assert_eq!(lb.capacity(), 8);
        }
    }

    #[test]
    fn line_buffer_unprimed_is_zero_history() {
        let mut lb = LineBuffer::new(1, 4, 3);
        assert_eq!(lb.push(7), vec![0, 0, 7]);
    }

    #[test]
    fn line_buffer_vertical_slice() {
        // 1 channel, width 3, window 2: each output pairs the value one full
        // row earlier with the current value.
        let mut lb = LineBuffer::new(1, 3, 2);
        for v in 1..=3 {
            lb.push(v);
        }
        assert_eq!(lb.push(4), vec![1, 4]);
        assert_eq!(lb.push(5), vec![2, 5]);
        assert_eq!(lb.push(6), vec![3, 6]);
    }

    #[test]
    fn line_buffer_window_one_passthrough() {
        let mut lb = LineBuffer::new(2, 4, 1);
        assert_eq!(lb.capacity(), 0);
        assert_eq!(lb.push(9), vec![9]);
    }

    #[test]
    fn extractor_emits_only_valid_windows() {
        // 4x4 single channel, 3x3 kernel, stride 1 -> 4 windows.
        let mut wx = WindowExtractor::new(1, 4, 4, 3, 1);
        let mut count = 0;
        for v in 0..16 {
            count += wx.push(v).len();
        }
        assert_eq!(count, 4);
        assert_eq!(wx.expected_tile_count(), 4);
    }

    #[test]
    fn extractor_matches_whole_frame_windowing() {
        // Stream-order invariance: replaying a flattened tensor through the
        // extractor yields exactly the tiles the whole-frame convolution
        // enumerates, in the same order.
        let t = Tensor::from_raw(u8_0(), 2, 4, 5, (0..40).collect()).unwrap();
        let (ksize, stride) = (3, 1);

        let mut streamed: Vec<Tile> = Vec::new();
        let mut wx = WindowExtractor::new(2, 4, 5, ksize, stride);
        for v in t.to_stream() {
            streamed.extend(wx.push(v));
        }

        let mut direct: Vec<Tile> = Vec::new();
        for row_out in 0..=(4 - ksize) {
            for col_out in 0..=(5 - ksize) {
                for ch in 0..2 {
                    let mut tile = Vec::new();
                    for kr in 0..ksize {
                        for kc in 0..ksize {
                            tile.push(t.get(ch, row_out + kr, col_out + kc));
                        }
                    }
                    direct.push(tile);
                }
            }
        }
        assert_eq!(streamed, direct);
    }

    #[test]
    fn extractor_honors_stride() {
        let t = Tensor::from_raw(u8_0(), 1, 6, 6, (0..36).collect()).unwrap();
        let mut wx = WindowExtractor::new(1, 6, 6, 2, 2);
        let mut tiles = Vec::new();
        for v in t.to_stream() {
            tiles.extend(wx.push(v));
        }
        assert_eq!(tiles.len(), 9); // 3x3 positions
        assert_eq!(tiles[0], vec![0, 1, 6, 7]);
        assert_eq!(tiles[1], vec![2, 3, 8, 9]);
        assert_eq!(tiles[3], vec![12, 13, 18, 19]);
    }

    #[test]
    fn repeater_replays_tiles() {
        let rep = ChannelRepeater::new(3);
        let tiles = vec![vec![1, 2], vec![3, 4]];
        let out = rep.push(&tiles);
        assert_eq!(out.len(), 6);
        assert_eq!(out[0], vec![1, 2]);
        assert_eq!(out[2], vec![1, 2]);
        assert_eq!(out[5], vec![3, 4]);
    }
}
