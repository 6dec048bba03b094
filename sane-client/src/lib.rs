#![allow(non_upper_case_globals)]

pub mod codec;
mod config;
#[cfg(feature = "ffi")]
pub mod ffi;
mod frame;
mod image;
mod options;
mod parameters;
mod result;
mod scanner;
#[cfg(any(test, feature = "simulated"))]
pub mod simulated;
pub mod transport;

pub use config::{ConfigError, ScannerConfig};
pub use frame::Frame;
pub use image::{AssemblyPolicy, Color, ColorModel, Image, ImageAssembler};
pub use options::{
    Capabilities as OptionCapabilities, Constraint as OptionConstraint, OptionInfo,
    OptionRegistry, ScannerOption, ScannerOptions, Type as OptionType, Unit as OptionUnit,
};
pub use parameters::{FrameFormat, Parameters};
pub use result::{Result, SaneError};
pub use scanner::{
    AcquisitionState, Canceller, FrameReader, Pages, Scanner, DEFAULT_READ_WINDOW,
};

pub use codec::Value as OptionValue;
