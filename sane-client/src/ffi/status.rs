use crate::result::{Result, SaneError};
use libsane_sys::*;

macro_rules! sane_try {
    ($x:expr) => {
        crate::ffi::status::from_status(unsafe { $x })?;
    };
}

pub(crate) use sane_try;

pub fn from_status(status: SANE_Status) -> Result<()> {
    match status {
        SANE_Status_SANE_STATUS_GOOD => Ok(()),
        SANE_Status_SANE_STATUS_UNSUPPORTED => Err(SaneError::Unsupported),
        SANE_Status_SANE_STATUS_CANCELLED => Err(SaneError::Cancelled),
        SANE_Status_SANE_STATUS_DEVICE_BUSY => Err(SaneError::DeviceBusy),
        SANE_Status_SANE_STATUS_INVAL => Err(SaneError::Inval),
        SANE_Status_SANE_STATUS_EOF => Err(SaneError::EOF),
        SANE_Status_SANE_STATUS_JAMMED => Err(SaneError::Jammed),
        SANE_Status_SANE_STATUS_NO_DOCS => Err(SaneError::NoDocs),
        SANE_Status_SANE_STATUS_COVER_OPEN => Err(SaneError::CoverOpen),
        SANE_Status_SANE_STATUS_IO_ERROR => Err(SaneError::IO),
        SANE_Status_SANE_STATUS_NO_MEM => Err(SaneError::NoMem),
        SANE_Status_SANE_STATUS_ACCESS_DENIED => Err(SaneError::AccessDenied),
        _ => {
            log::warn!("Unknown status value {status}, treat as I/O error");
            Err(SaneError::IO)
        }
    }
}
