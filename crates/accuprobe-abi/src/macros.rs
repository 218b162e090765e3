//! Helper macros for ABI function generation.
//!
//! Provides the `by_ref_shim!` macro that generates the by-reference
//! (`_f`, Fortran-callable) variant of a by-value probe entry point.

/// Generate a by-reference wrapper around a by-value probe entry point.
///
/// # Usage
///
/// ```ignore
/// by_ref_shim! {
///     /// Doc comment for the wrapper.
///     fn qmckl_probe_f => qmckl_probe(value, expected_value)
/// }
/// ```
///
/// This expands to a `#[unsafe(no_mangle)] pub unsafe extern "C" fn` taking
/// the two name pointers followed by one `*const f64` per listed argument.
/// Each pointer is read once and forwarded unchanged; a null pointer is
/// logged and yields `false`.
macro_rules! by_ref_shim {
    (
        $(#[$meta:meta])*
        fn $name:ident => $target:ident( $($arg:ident),* $(,)? )
    ) => {
        $(#[$meta])*
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(
            test_name: *const ::std::ffi::c_char,
            var_name: *const ::std::ffi::c_char,
            $($arg: *const f64),*
        ) -> bool {
            $(
                // SAFETY: caller passes null or a readable double.
                let $arg = match unsafe { $crate::util::read_f64($arg, stringify!($arg)) } {
                    Ok(v) => v,
                    Err(err) => {
                        $crate::runtime_registry::reject(stringify!($name), &err);
                        return false;
                    }
                };
            )*
            // SAFETY: name pointers forwarded unchanged under the same contract.
            unsafe { $target(test_name, var_name, $($arg),*) }
        }
    };
}

#[allow(unused_imports)]
pub(crate) use by_ref_shim;
