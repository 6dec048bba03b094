use crate::{transport::RawParameters, SaneError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    pub format: FrameFormat,
    pub last_frame: bool,
    pub bytes_per_line: usize,
    pub pixels_per_line: usize,
    /// `None` while the device doesn't know how many lines it will send.
    pub lines: Option<usize>,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Gray,
    RGB,
    Red,
    Green,
    Blue,
}

impl FrameFormat {
    pub fn channels(self) -> usize {
        match self {
            Self::RGB => 3,
            Self::Gray | Self::Red | Self::Green | Self::Blue => 1,
        }
    }
}

impl TryFrom<RawParameters> for Parameters {
    type Error = SaneError;

    #[rustfmt::skip]
    fn try_from(params: RawParameters) -> Result<Self, Self::Error> {
        fn positive(value: i32, what: &str) -> Result<usize, SaneError> {
            usize::try_from(value)
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(|| SaneError::ProtocolViolation(format!("{what} should be greater than 0, got {value}")))
        }

        Ok(Parameters {
            format: params.format,
            last_frame: params.last_frame,
            bytes_per_line: positive(params.bytes_per_line, "bytes_per_line")?,
            pixels_per_line: positive(params.pixels_per_line, "pixels_per_line")?,
            lines: usize::try_from(params.lines).ok().filter(|lines| *lines > 0),
            depth: positive(params.depth, "depth")?,
        })
    }
}
