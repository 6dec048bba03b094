use crate::{
    parameters::{FrameFormat, Parameters},
    result::{Result, SaneError},
};

/// One completed frame: a single plane or an interleaved RGB triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    format: FrameFormat,
    width: usize,
    height: usize,
    channels: usize,
    depth: usize,
    bytes_per_line: usize,
    last_frame: bool,
    data: Vec<u8>,
}

impl Frame {
    /// Builds a frame from the parameters reported for it and the bytes that
    /// were actually received. The advertised line count is ignored.
    pub fn new(parameters: &Parameters, data: Vec<u8>) -> Result<Self> {
        if !matches!(parameters.depth, 1 | 8 | 16) {
            return Err(SaneError::UnsupportedDepth(parameters.depth));
        }

        if parameters.bytes_per_line == 0 {
            return Err(SaneError::ProtocolViolation(
                "bytes_per_line should be greater than 0".into(),
            ));
        }

        Ok(Self {
            format: parameters.format,
            width: parameters.pixels_per_line,
            height: data.len() / parameters.bytes_per_line,
            channels: parameters.format.channels(),
            depth: parameters.depth,
            bytes_per_line: parameters.bytes_per_line,
            last_frame: parameters.last_frame,
            data,
        })
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    pub fn is_last(&self) -> bool {
        self.last_frame
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the raw sample at `(x, y)` for `channel`, not normalized to
    /// the depth. Coordinates outside the frame read as 0.
    ///
    /// For 1-bit gray frames the device bit is inverted, so 1 is white as it
    /// is for every other depth.
    pub fn sample(&self, x: usize, y: usize, channel: usize) -> u16 {
        if x >= self.width || y >= self.height || channel >= self.channels {
            return 0;
        }

        let line = self.bytes_per_line * y;

        match self.depth {
            1 => {
                let i = line + self.channels * (x / 8) + channel;
                let Some(byte) = self.data.get(i) else {
                    return 0;
                };

                let bit = u16::from((*byte >> (x % 8)) & 0x01);
                if self.format == FrameFormat::Gray {
                    bit ^ 0x01
                } else {
                    bit
                }
            }
            8 => {
                let i = line + self.channels * x + channel;
                self.data.get(i).copied().map_or(0, u16::from)
            }
            16 => {
                let i = line + 2 * (self.channels * x + channel);
                match self.data.get(i..i + 2) {
                    Some(&[lo, hi]) => u16::from_le_bytes([lo, hi]),
                    _ => 0,
                }
            }
            _ => 0,
        }
    }
}
