use super::{
    backend::Backend,
    status::sane_try,
    utils::{cstr2bstr, cstr2bstring},
};
use crate::{
    options::{Capabilities, OptionInfo, Type, Unit},
    parameters::FrameFormat,
    result::{Result, SaneError},
    transport::{Action, OptionDescriptor, RawConstraint, RawParameters, Transport},
};
use bstr::BString;
use libsane_sys::*;
use std::{ffi::c_void, ptr::null_mut};

/// Open native device handle. Closed on drop.
pub(crate) struct Handle {
    handle: SANE_Handle,
    _backend: Backend,
}

// The native library allows `sane_cancel` from any thread while another one
// is blocked in `sane_read`. Everything else is serialised by `Scanner`.
unsafe impl Send for Handle {}

unsafe impl Sync for Handle {}

impl Handle {
    pub(crate) fn new(handle: SANE_Handle, backend: Backend) -> Self {
        Self {
            handle,
            _backend: backend,
        }
    }
}

impl Transport for Handle {
    fn option_descriptor(&self, index: usize) -> Option<OptionDescriptor> {
        let index = SANE_Int::try_from(index).ok()?;

        log::trace!("Call sane_get_option_descriptor({:p}, {index})", self.handle);
        let desc = unsafe { sane_get_option_descriptor(self.handle, index).as_ref() }?;

        Some(unsafe { descriptor(desc) })
    }

    fn control_option(&self, index: usize, action: Action, value: &mut [u8]) -> Result<OptionInfo> {
        let index = SANE_Int::try_from(index).map_err(|_| SaneError::Inval)?;

        let action = match action {
            Action::GetValue => SANE_Action_SANE_ACTION_GET_VALUE,
            Action::SetValue => SANE_Action_SANE_ACTION_SET_VALUE,
            Action::SetAuto => SANE_Action_SANE_ACTION_SET_AUTO,
        };

        let value: *mut c_void = if value.is_empty() {
            null_mut()
        } else {
            value.as_mut_ptr().cast()
        };

        let mut info: SANE_Int = 0;

        log::trace!(
            "Call sane_control_option({:p}, {index}, {action}, {value:p}, {:p})",
            self.handle,
            &mut info,
        );
        sane_try!(sane_control_option(self.handle, index, action, value, &mut info));

        Ok(OptionInfo::from_bits_retain(info as u32))
    }

    fn start(&self) -> Result<()> {
        log::trace!("Call sane_start({:p})", self.handle);
        sane_try!(sane_start(self.handle));

        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut count: SANE_Int = 0;
        let max_length = buf.len().try_into().unwrap_or(SANE_Int::MAX);

        log::trace!(
            "Call sane_read({:p}, {:p}, {max_length}, {:p})",
            self.handle,
            buf.as_mut_ptr(),
            &mut count,
        );
        sane_try!(sane_read(self.handle, buf.as_mut_ptr(), max_length, &mut count));

        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn cancel(&self) {
        log::trace!("Call sane_cancel({:p})", self.handle);
        unsafe { sane_cancel(self.handle) };
    }

    #[rustfmt::skip]
    fn parameters(&self) -> Result<RawParameters> {
        let mut params: SANE_Parameters = unsafe { core::mem::zeroed() };

        log::trace!("Call sane_get_parameters({:p}, {:p})", self.handle, &mut params);
        sane_try!(sane_get_parameters(self.handle, &mut params));

        Ok(RawParameters {
            format: frame_format(params.format)?,
            last_frame: params.last_frame != 0,
            bytes_per_line: params.bytes_per_line,
            pixels_per_line: params.pixels_per_line,
            lines: params.lines,
            depth: params.depth,
        })
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        log::trace!("Call sane_close({:p})", self.handle);
        unsafe { sane_close(self.handle) };
    }
}

unsafe fn descriptor(desc: &SANE_Option_Descriptor) -> OptionDescriptor {
    OptionDescriptor {
        name: cstr2bstr(desc.name).map(BString::from),
        title: cstr2bstring(desc.title),
        description: cstr2bstring(desc.desc),
        ty: value_type(desc.type_),
        unit: unit(desc.unit),
        size: usize::try_from(desc.size).unwrap_or_default(),
        capabilities: Capabilities::from_bits_retain(desc.cap as u32),
        constraint: constraint(desc.constraint_type, desc.constraint),
    }
}

fn value_type(ty: SANE_Value_Type) -> Type {
    match ty {
        SANE_Value_Type_SANE_TYPE_BOOL => Type::Bool,
        SANE_Value_Type_SANE_TYPE_INT => Type::Int,
        SANE_Value_Type_SANE_TYPE_FIXED => Type::Fixed,
        SANE_Value_Type_SANE_TYPE_STRING => Type::String,
        SANE_Value_Type_SANE_TYPE_BUTTON => Type::Button,
        SANE_Value_Type_SANE_TYPE_GROUP => Type::Group,
        _ => Type::Unsupported,
    }
}

fn unit(unit: SANE_Unit) -> Unit {
    match unit {
        SANE_Unit_SANE_UNIT_NONE => Unit::None,
        SANE_Unit_SANE_UNIT_PIXEL => Unit::Pixel,
        SANE_Unit_SANE_UNIT_BIT => Unit::Bit,
        SANE_Unit_SANE_UNIT_MM => Unit::Mm,
        SANE_Unit_SANE_UNIT_DPI => Unit::Dpi,
        SANE_Unit_SANE_UNIT_PERCENT => Unit::Percent,
        SANE_Unit_SANE_UNIT_MICROSECOND => Unit::Microsecond,
        _ => Unit::Unsupported,
    }
}

fn frame_format(format: SANE_Frame) -> Result<FrameFormat> {
    match format {
        SANE_Frame_SANE_FRAME_GRAY => Ok(FrameFormat::Gray),
        SANE_Frame_SANE_FRAME_RGB => Ok(FrameFormat::RGB),
        SANE_Frame_SANE_FRAME_RED => Ok(FrameFormat::Red),
        SANE_Frame_SANE_FRAME_GREEN => Ok(FrameFormat::Green),
        SANE_Frame_SANE_FRAME_BLUE => Ok(FrameFormat::Blue),
        _ => Err(SaneError::ProtocolViolation(format!(
            "invalid frame format {format}"
        ))),
    }
}

unsafe fn constraint(
    ty: SANE_Constraint_Type,
    constraint: SANE_Option_Descriptor__bindgen_ty_1,
) -> RawConstraint {
    match ty {
        SANE_Constraint_Type_SANE_CONSTRAINT_RANGE => match constraint.range.as_ref() {
            Some(range) => RawConstraint::Range {
                min: range.min,
                max: range.max,
                quant: range.quant,
            },
            None => RawConstraint::None,
        },
        SANE_Constraint_Type_SANE_CONSTRAINT_WORD_LIST => {
            let list = constraint.word_list;
            if list.is_null() {
                return RawConstraint::None;
            }

            // First word is the number of words that follow.
            let count = usize::try_from(*list).unwrap_or_default();
            RawConstraint::WordList(std::slice::from_raw_parts(list, count + 1).to_vec())
        }
        SANE_Constraint_Type_SANE_CONSTRAINT_STRING_LIST => {
            let list = constraint.string_list;
            if list.is_null() {
                return RawConstraint::None;
            }

            let strings = (0..usize::MAX)
                .map_while(|offset| cstr2bstr(*list.add(offset)))
                .map(BString::from)
                .collect();

            RawConstraint::StringList(strings)
        }
        _ => RawConstraint::None,
    }
}
