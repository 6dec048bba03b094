//! Boundary to the device. Everything above this trait is pure Rust and can be
//! driven by the simulated device (feature `simulated`) instead of real
//! hardware.

use crate::{
    options::{Capabilities, OptionInfo, Type, Unit},
    parameters::FrameFormat,
    result::Result,
};
use bstr::BString;

/// Raw option descriptor, as reported for one option index.
#[derive(Debug, Clone)]
pub struct OptionDescriptor {
    pub name: Option<BString>,
    pub title: BString,
    pub description: BString,
    pub ty: Type,
    pub unit: Unit,
    /// Size of the value buffer in bytes.
    pub size: usize,
    pub capabilities: Capabilities,
    pub constraint: RawConstraint,
}

/// Constraint exactly as the device describes it, before decoding.
#[derive(Debug, Clone)]
pub enum RawConstraint {
    None,
    Range { min: i32, max: i32, quant: i32 },
    /// Count-prefixed: the first word is the number of words that follow.
    WordList(Vec<i32>),
    StringList(Vec<BString>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GetValue,
    SetValue,
    SetAuto,
}

/// Parameters as the device reports them. Sizes are signed because the
/// device uses non-positive line counts for "unknown".
#[derive(Debug, Clone, Copy)]
pub struct RawParameters {
    pub format: FrameFormat,
    pub last_frame: bool,
    pub bytes_per_line: i32,
    pub pixels_per_line: i32,
    pub lines: i32,
    pub depth: i32,
}

/// The six device operations the client is built on.
///
/// All methods take `&self`: [`Transport::cancel`] must be callable from
/// another thread while [`Transport::read`] is blocked.
pub trait Transport: Send + Sync {
    /// Returns `None` past the last option.
    fn option_descriptor(&self, index: usize) -> Option<OptionDescriptor>;

    /// Runs `action` on the option at `index`. `value` holds the option's raw
    /// buffer; it is read for [`Action::SetValue`], filled for
    /// [`Action::GetValue`] and empty for [`Action::SetAuto`].
    fn control_option(&self, index: usize, action: Action, value: &mut [u8])
        -> Result<OptionInfo>;

    fn start(&self) -> Result<()>;

    /// Blocks until bytes are available. The end of the frame is reported as
    /// [`crate::SaneError::EOF`].
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Requests cancellation and returns immediately.
    fn cancel(&self);

    fn parameters(&self) -> Result<RawParameters>;
}
