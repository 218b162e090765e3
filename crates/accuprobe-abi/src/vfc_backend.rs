//! Verificarlo `vfc_probes` binding.
//!
//! Only compiled with the `vfc-ci` feature; `build.rs` links `libvfc_probes`
//! (search path from `VFC_PROBES_LIB_DIR`).

use std::collections::HashMap;
use std::ffi::{CString, c_char, c_int, c_void};

use accuprobe_core::{ProbeBackend, ProbeError};

/// Mirror of `struct vfc_probes` (a single hashmap handle).
#[repr(C)]
pub struct VfcProbes {
    #[allow(dead_code)]
    map: *mut c_void,
}

unsafe extern "C" {
    fn vfc_init_probes() -> VfcProbes;
    fn vfc_probe(
        probes: *mut VfcProbes,
        test_name: *mut c_char,
        var_name: *mut c_char,
        value: f64,
    ) -> c_int;
    fn vfc_probe_check(
        probes: *mut VfcProbes,
        test_name: *mut c_char,
        var_name: *mut c_char,
        value: f64,
        accuracy_threshold: f64,
    ) -> c_int;
    fn vfc_probe_check_relative(
        probes: *mut VfcProbes,
        test_name: *mut c_char,
        var_name: *mut c_char,
        value: f64,
        accuracy_threshold: f64,
    ) -> c_int;
    fn vfc_dump_probes(probes: *mut VfcProbes) -> c_int;
}

/// Session handle plus the name strings handed to the library.
///
/// `vfc_probe*` keeps the name pointers in its map, so every `CString` passed
/// in lives as long as the session. Each distinct name is allocated once.
pub struct VfcSession {
    probes: VfcProbes,
    names: HashMap<String, CString>,
}

// SAFETY: the session is only reached through the ABI registry's mutex, so the
// library never sees concurrent calls on one handle.
unsafe impl Send for VfcSession {}

impl VfcSession {
    fn keep(&mut self, name: &str) -> Option<*mut c_char> {
        if let Some(kept) = self.names.get(name) {
            return Some(kept.as_ptr().cast_mut());
        }
        let owned = CString::new(name).ok()?;
        // The heap buffer does not move when `names` rehashes.
        let ptr = owned.as_ptr().cast_mut();
        self.names.insert(name.to_owned(), owned);
        Some(ptr)
    }

    /// Distinct names kept alive for the library.
    #[must_use]
    pub fn kept_names(&self) -> usize {
        self.names.len()
    }

    fn keep_pair(
        &mut self,
        test_name: &str,
        var_name: &str,
    ) -> Option<(*mut c_char, *mut c_char)> {
        Some((self.keep(test_name)?, self.keep(var_name)?))
    }
}

/// Backend delegating to `libvfc_probes`. A nonzero C result is `true`.
#[derive(Debug, Default, Clone, Copy)]
pub struct VfcBackend;

impl ProbeBackend for VfcBackend {
    type Session = VfcSession;

    fn name(&self) -> &'static str {
        "vfc_probes"
    }

    fn init(&self) -> VfcSession {
        VfcSession {
            // SAFETY: no preconditions; returns an owned, initialised handle.
            probes: unsafe { vfc_init_probes() },
            names: HashMap::new(),
        }
    }

    fn probe(
        &self,
        session: &mut VfcSession,
        test_name: &str,
        var_name: &str,
        value: f64,
    ) -> bool {
        let Some((test, var)) = session.keep_pair(test_name, var_name) else {
            return false;
        };
        // SAFETY: handle from vfc_init_probes; names outlive the session.
        unsafe { vfc_probe(&mut session.probes, test, var, value) != 0 }
    }

    fn probe_absolute(
        &self,
        session: &mut VfcSession,
        test_name: &str,
        var_name: &str,
        value: f64,
        tolerance: f64,
    ) -> bool {
        let Some((test, var)) = session.keep_pair(test_name, var_name) else {
            return false;
        };
        // SAFETY: as in `probe`.
        unsafe { vfc_probe_check(&mut session.probes, test, var, value, tolerance) != 0 }
    }

    fn probe_relative(
        &self,
        session: &mut VfcSession,
        test_name: &str,
        var_name: &str,
        value: f64,
        tolerance: f64,
    ) -> bool {
        let Some((test, var)) = session.keep_pair(test_name, var_name) else {
            return false;
        };
        // SAFETY: as in `probe`.
        unsafe { vfc_probe_check_relative(&mut session.probes, test, var, value, tolerance) != 0 }
    }

    fn dump(&self, session: &mut VfcSession) -> Result<(), ProbeError> {
        // SAFETY: handle from vfc_init_probes.
        let rc = unsafe { vfc_dump_probes(&mut session.probes) };
        if rc == 0 {
            Ok(())
        } else {
            Err(ProbeError::Backend(format!("vfc_dump_probes returned {rc}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detached_session() -> VfcSession {
        VfcSession {
            probes: VfcProbes {
                map: std::ptr::null_mut(),
            },
            names: HashMap::new(),
        }
    }

    #[test]
    fn repeated_names_are_kept_once() {
        let mut session = detached_session();
        let (t1, v1) = session.keep_pair("ao", "value").unwrap();
        for _ in 0..1000 {
            let (t, v) = session.keep_pair("ao", "value").unwrap();
            assert_eq!((t, v), (t1, v1));
        }
        assert_eq!(session.kept_names(), 2);

        session.keep_pair("ao", "gradient").unwrap();
        assert_eq!(session.kept_names(), 3);
        // Earlier pointers stay valid across growth.
        let name = unsafe { std::ffi::CStr::from_ptr(v1) };
        assert_eq!(name.to_str().unwrap(), "value");
    }

    #[test]
    fn interior_nul_is_refused() {
        let mut session = detached_session();
        assert!(session.keep_pair("a\0b", "x").is_none());
    }
}
