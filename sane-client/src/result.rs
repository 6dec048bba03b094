use bstr::BString;
use thiserror::Error;

pub type Result<T> = ::core::result::Result<T, SaneError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaneError {
    #[error("unsupported")]
    Unsupported,

    #[error("cancelled")]
    Cancelled,

    #[error("device busy")]
    DeviceBusy,

    #[error("invalid value")]
    Inval,

    /// Normal end of a frame. Never surfaced by [`crate::Scanner::read_frame`].
    #[error("end of file")]
    EOF,

    #[error("document feeder is jammed")]
    Jammed,

    /// The feeder ran out of pages. Ends a batch normally.
    #[error("document feeder is out of documents")]
    NoDocs,

    #[error("cover open")]
    CoverOpen,

    #[error("error occurred while communicating with the device")]
    IO,

    #[error("not enough memory")]
    NoMem,

    #[error("access denied")]
    AccessDenied,

    #[error("no option named '{0}'")]
    NotFound(BString),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("unsupported bit depth {0}")]
    UnsupportedDepth(usize),
}
