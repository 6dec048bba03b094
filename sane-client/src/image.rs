use crate::{
    frame::Frame,
    parameters::FrameFormat,
    result::{Result, SaneError},
};
use serde::Deserialize;

/// When a gray or interleaved RGB frame completes an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssemblyPolicy {
    /// A gray or RGB frame is a whole image, whatever its last-frame flag says.
    #[default]
    SingleFrame,
    /// Keep acquiring until a frame carries the last-frame flag. A second
    /// frame after a gray or RGB one is a protocol violation.
    UntilLastFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Gray,
    Gray16,
    Rgba,
    Rgba64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Gray(u8),
    Gray16(u16),
    Rgba([u8; 4]),
    Rgba64([u16; 4]),
}

/// Scanned image made of one frame, or of red, green and blue planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// One frame, or three in R, G, B order.
    frames: Vec<Frame>,
}

/// Sorts incoming frames into color roles until an image is complete.
#[derive(Debug, Default)]
pub struct ImageAssembler {
    policy: AssemblyPolicy,
    single: Option<Frame>,
    planes: [Option<Frame>; 3],
}

impl ImageAssembler {
    pub fn new(policy: AssemblyPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Adds a frame. Returns `true` once no more frames are expected.
    pub fn push(&mut self, frame: Frame) -> Result<bool> {
        let format = frame.format();

        if self.single.is_some() {
            return Err(SaneError::ProtocolViolation(format!(
                "unexpected {format:?} frame after a single-frame image"
            )));
        }

        let role = match format {
            FrameFormat::Gray | FrameFormat::RGB => {
                if self.planes.iter().any(Option::is_some) {
                    return Err(SaneError::ProtocolViolation(format!(
                        "unexpected {format:?} frame in a multi-frame image"
                    )));
                }

                let done = self.policy == AssemblyPolicy::SingleFrame || frame.is_last();
                self.single = Some(frame);

                return Ok(done);
            }
            FrameFormat::Red => 0,
            FrameFormat::Green => 1,
            FrameFormat::Blue => 2,
        };

        let slot = &mut self.planes[role];
        if slot.is_some() {
            return Err(SaneError::ProtocolViolation(format!(
                "{format:?} frame received twice"
            )));
        }

        let done = frame.is_last();
        *slot = Some(frame);

        Ok(done)
    }

    /// Whether no frame has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.single.is_none() && self.planes.iter().all(Option::is_none)
    }

    pub fn finish(self) -> Result<Image> {
        match (self.single, self.planes) {
            (Some(frame), _) => Ok(Image {
                frames: vec![frame],
            }),
            (None, [Some(red), Some(green), Some(blue)]) => {
                let same_geometry = [&green, &blue].iter().all(|plane| {
                    plane.width() == red.width()
                        && plane.height() == red.height()
                        && plane.depth() == red.depth()
                });

                if !same_geometry {
                    return Err(SaneError::ProtocolViolation(
                        "color planes differ in geometry".into(),
                    ));
                }

                Ok(Image {
                    frames: vec![red, green, blue],
                })
            }
            (None, planes) => Err(SaneError::ProtocolViolation(format!(
                "image ended with {} of 3 color planes",
                planes.iter().filter(|plane| plane.is_some()).count()
            ))),
        }
    }
}

impl Image {
    pub fn width(&self) -> usize {
        self.frames[0].width()
    }

    pub fn height(&self) -> usize {
        self.frames[0].height()
    }

    pub fn depth(&self) -> usize {
        self.frames[0].depth()
    }

    pub fn is_gray(&self) -> bool {
        self.frames[0].format() == FrameFormat::Gray
    }

    pub fn channels(&self) -> usize {
        if self.is_gray() {
            1
        } else {
            3
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn color_model(&self) -> ColorModel {
        match (self.is_gray(), self.depth() == 16) {
            (true, false) => ColorModel::Gray,
            (true, true) => ColorModel::Gray16,
            (false, false) => ColorModel::Rgba,
            (false, true) => ColorModel::Rgba64,
        }
    }

    /// Raw sample of `channel` at `(x, y)`; channels are always R, G, B for
    /// color images. Outside the image the sample is 0.
    pub fn sample(&self, x: usize, y: usize, channel: usize) -> u16 {
        match self.frames.as_slice() {
            [frame] => frame.sample(x, y, channel),
            planes => planes
                .get(channel)
                .map_or(0, |plane| plane.sample(x, y, 0)),
        }
    }

    /// Color of the pixel at `(x, y)`. Outside the image it is transparent
    /// black.
    pub fn pixel(&self, x: usize, y: usize) -> Color {
        if x >= self.width() || y >= self.height() {
            return Color::Rgba([0; 4]);
        }

        let depth = self.depth();

        // 1-bit samples are 0 or 1; stretch them to the full 8-bit range.
        let narrow = |sample: u16| match depth {
            1 => (sample * 0xFF) as u8,
            _ => sample as u8,
        };

        if self.is_gray() {
            let sample = self.sample(x, y, 0);
            return match depth {
                16 => Color::Gray16(sample),
                _ => Color::Gray(narrow(sample)),
            };
        }

        let [r, g, b] = [0, 1, 2].map(|channel| self.sample(x, y, channel));
        match depth {
            16 => Color::Rgba64([r, g, b, 0xFFFF]),
            _ => Color::Rgba([narrow(r), narrow(g), narrow(b), 0xFF]),
        }
    }

    /// Packs the image into 8-bit rows without padding: one byte per pixel
    /// for gray images, three for color ones. 16-bit samples keep their high
    /// byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let channels = self.channels();
        let mut bytes = Vec::with_capacity(self.width() * self.height() * channels);

        for y in 0..self.height() {
            for x in 0..self.width() {
                match self.pixel(x, y) {
                    Color::Gray(gray) => bytes.push(gray),
                    Color::Gray16(gray) => bytes.push((gray >> 8) as u8),
                    Color::Rgba([r, g, b, _]) => bytes.extend([r, g, b]),
                    Color::Rgba64([r, g, b, _]) => {
                        bytes.extend([r, g, b].map(|sample| (sample >> 8) as u8))
                    }
                }
            }
        }

        bytes
    }
}
