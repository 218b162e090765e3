//! Shared internal utilities for ABI adapters.

use std::ffi::{CStr, c_char};

use accuprobe_core::ProbeError;

/// Borrow a probe name from a NUL-terminated C string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// and unmodified for the returned lifetime.
pub unsafe fn probe_name<'a>(
    ptr: *const c_char,
    field: &'static str,
) -> Result<&'a str, ProbeError> {
    if ptr.is_null() {
        return Err(ProbeError::NullArgument(field));
    }
    // SAFETY: non-null and NUL-terminated per caller contract.
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str().map_err(|_| ProbeError::InvalidName {
        field,
        reason: "not valid UTF-8",
    })
}

/// Read a by-reference `double` argument.
///
/// # Safety
///
/// `ptr` must be null or valid for a read of one `f64`.
pub unsafe fn read_f64(ptr: *const f64, field: &'static str) -> Result<f64, ProbeError> {
    if ptr.is_null() {
        return Err(ProbeError::NullArgument(field));
    }
    // SAFETY: non-null and readable per caller contract; Fortran callers may
    // pass unaligned storage.
    Ok(unsafe { ptr.read_unaligned() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_name_reads_c_strings() {
        let name = c"density";
        let got = unsafe { probe_name(name.as_ptr(), "var_name") }.unwrap();
        assert_eq!(got, "density");
    }

    #[test]
    fn probe_name_rejects_null_and_bad_utf8() {
        let err = unsafe { probe_name(std::ptr::null(), "test_name") }.unwrap_err();
        assert!(matches!(err, ProbeError::NullArgument("test_name")));

        let bytes = [0xffu8, 0xfe, 0];
        let err = unsafe { probe_name(bytes.as_ptr().cast(), "var_name") }.unwrap_err();
        assert!(matches!(err, ProbeError::InvalidName { field: "var_name", .. }));
    }

    #[test]
    fn read_f64_handles_null() {
        let x = 2.5f64;
        assert_eq!(unsafe { read_f64(&x, "value") }.unwrap(), 2.5);
        assert!(unsafe { read_f64(std::ptr::null(), "value") }.is_err());
    }
}
