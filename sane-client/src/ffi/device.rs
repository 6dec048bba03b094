use super::utils::cstr2bstring;
use bstr::BString;
use libsane_sys::*;

/// Device as reported by the native library. Owns its strings, so it stays
/// valid after the device list is refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub name: BString,
    pub vendor: BString,
    pub model: BString,
    pub ty: BString,
}

impl Device {
    pub(crate) unsafe fn new(device: &SANE_Device) -> Self {
        Device {
            name: cstr2bstring(device.name),
            vendor: cstr2bstring(device.vendor),
            model: cstr2bstring(device.model),
            ty: cstr2bstring(device.type_),
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{name}' (vendor '{vendor}', model '{model}', type '{ty}')",
            name = self.name,
            vendor = self.vendor,
            model = self.model,
            ty = self.ty,
        )
    }
}
