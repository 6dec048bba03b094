use bstr::{BStr, BString};
use std::ffi::{c_char, CStr};

pub unsafe fn cstr2bstr<'a>(str: *const c_char) -> Option<&'a BStr> {
    str.as_ref()
        .map(|cstr| CStr::from_ptr(cstr).to_bytes().into())
}

/// Owned copy of a C string, empty when the pointer is null.
pub unsafe fn cstr2bstring(str: *const c_char) -> BString {
    cstr2bstr(str).map(BString::from).unwrap_or_default()
}

/// Views a null-terminated array of pointers as a slice.
pub unsafe fn slice_from_c_array<'a, T>(ptr: *const *const T) -> &'a [&'a T]
where
    T: Sized + 'static,
{
    if ptr.is_null() {
        return &[];
    }

    let mut len = 0;
    while !(*ptr.add(len)).is_null() {
        len += 1;
    }

    let slice: &'a [*const T] = core::slice::from_raw_parts(ptr, len);
    std::mem::transmute(slice)
}
