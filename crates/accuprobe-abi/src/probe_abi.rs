//! ABI layer for the `qmckl_probe*` family.
//!
//! By-value entry points resolve their name arguments and hand off to the
//! process registry. The `_f` variants take every double by reference for
//! Fortran `bind(C)` callers and forward to the by-value ones unchanged.

use std::ffi::c_char;

use accuprobe_core::CheckMode;

use crate::runtime_registry;
use crate::util::probe_name;

/// Resolve both names or log the rejection.
unsafe fn names<'a>(
    symbol: &'static str,
    test_name: *const c_char,
    var_name: *const c_char,
) -> Option<(&'a str, &'a str)> {
    // SAFETY: pointers come straight from the C caller under the same contract.
    let resolved = unsafe { probe_name(test_name, "test_name") }
        .and_then(|t| unsafe { probe_name(var_name, "var_name") }.map(|v| (t, v)));
    match resolved {
        Ok(pair) => Some(pair),
        Err(err) => {
            runtime_registry::reject(symbol, &err);
            None
        }
    }
}

/// Exact probe: `value == expected_value` without a backend.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qmckl_probe(
    test_name: *const c_char,
    var_name: *const c_char,
    value: f64,
    expected_value: f64,
) -> bool {
    let Some((test, var)) = (unsafe { names("qmckl_probe", test_name, var_name) }) else {
        return false;
    };
    runtime_registry::probe(CheckMode::Exact, test, var, value, expected_value, 0.0)
}

/// Absolute-tolerance probe: `|value - expected_value| <= accuracy_target`
/// without a backend.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qmckl_probe_check(
    test_name: *const c_char,
    var_name: *const c_char,
    value: f64,
    expected_value: f64,
    accuracy_target: f64,
) -> bool {
    let Some((test, var)) = (unsafe { names("qmckl_probe_check", test_name, var_name) }) else {
        return false;
    };
    runtime_registry::probe(
        CheckMode::Absolute,
        test,
        var,
        value,
        expected_value,
        accuracy_target,
    )
}

/// Interval probe: `value` in `[expected_value - accuracy_target,
/// expected_value + accuracy_target]` without a backend.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn qmckl_probe_check_relative(
    test_name: *const c_char,
    var_name: *const c_char,
    value: f64,
    expected_value: f64,
    accuracy_target: f64,
) -> bool {
    let Some((test, var)) =
        (unsafe { names("qmckl_probe_check_relative", test_name, var_name) })
    else {
        return false;
    };
    runtime_registry::probe(
        CheckMode::Relative,
        test,
        var,
        value,
        expected_value,
        accuracy_target,
    )
}

/// Flush accumulated observations. No-op without a backend.
///
/// When nothing is probed afterwards, this is the final dump: the exit hook
/// does not dump again.
#[unsafe(no_mangle)]
pub extern "C" fn qmckl_dump_probes() {
    runtime_registry::dump();
}

/// Open the registry (and backend session) before the first probe.
#[unsafe(no_mangle)]
pub extern "C" fn qmckl_probes_initialize() {
    runtime_registry::initialize();
}

/// Final dump and teardown.
///
/// The dump is skipped when `qmckl_dump_probes` already flushed every
/// observation. Later probes fall back to local comparisons: with a backend
/// they are no longer recorded, and the first one prints a warning to stderr.
/// This also covers probes made from `atexit` handlers registered before the
/// first probe, which run after this hook.
#[unsafe(no_mangle)]
pub extern "C" fn qmckl_probes_shutdown() {
    runtime_registry::shutdown();
}

by_ref_shim! {
    fn qmckl_probe_f => qmckl_probe(value, expected_value)
}

by_ref_shim! {
    fn qmckl_probe_check_f => qmckl_probe_check(value, expected_value, accuracy_target)
}

by_ref_shim! {
    fn qmckl_probe_check_relative_f => qmckl_probe_check_relative(
        value,
        expected_value,
        accuracy_target,
    )
}
