use super::{
    device::Device,
    handle::Handle,
    status::sane_try,
    utils::slice_from_c_array,
};
use crate::{result::Result, SaneError, Scanner};
use bstr::BStr;
use libsane_sys::*;
use std::{
    ffi::CString,
    fmt::Debug,
    ptr::null_mut,
    sync::Arc,
};

/// Initialised native library. Clones share the initialisation, which is
/// released when the last clone and the last scanner opened from it are gone.
#[derive(Clone)]
pub struct Backend {
    guard: Arc<Guard>,
}

struct Guard;

impl Backend {
    pub fn new() -> Result<Self> {
        log::trace!("Call sane_init(0x0, 0x0)");
        sane_try!(sane_init(null_mut(), None));

        Ok(Self {
            guard: Arc::new(Guard),
        })
    }

    pub fn devices(&self) -> Result<Vec<Device>> {
        let devices = self.get_devices()?;

        let devices = unsafe { slice_from_c_array(devices) }
            .iter()
            .map(|device| unsafe { Device::new(device) })
            .collect();

        Ok(devices)
    }

    pub fn find_device_by_name<N>(&self, name: N) -> Result<Option<Device>>
    where
        N: AsRef<[u8]>,
    {
        let device = self
            .devices()?
            .into_iter()
            .find(|device| device.name == BStr::new(&name));

        Ok(device)
    }

    /// Opens the device called `name`. It does not need to be enumerated
    /// first.
    pub fn open<N>(&self, name: N) -> Result<Scanner>
    where
        N: AsRef<[u8]>,
    {
        let name = CString::new(name.as_ref()).map_err(|_| SaneError::Inval)?;
        let mut handle = null_mut();

        log::trace!("Call sane_open('{}', {:p})", BStr::new(name.as_bytes()), &mut handle);
        sane_try!(sane_open(name.as_ptr(), &mut handle));

        let handle = Handle::new(handle, self.clone());

        Ok(Scanner::new(Arc::new(handle)))
    }

    fn get_devices(&self) -> Result<*const *const SANE_Device> {
        let mut device_list = null_mut();

        log::trace!("Call sane_get_devices({:p}, {})", &mut device_list, 0);
        sane_try!(sane_get_devices(&mut device_list, 0));

        Ok(device_list.cast_const())
    }
}

impl Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("users", &Arc::strong_count(&self.guard))
            .finish()
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        log::trace!("Call sane_exit()");
        unsafe { sane_exit() };
    }
}
