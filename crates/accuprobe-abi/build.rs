fn main() {
    println!("cargo:rerun-if-env-changed=VFC_PROBES_LIB_DIR");

    // Verificarlo installs libvfc_probes next to its compiler wrappers.
    if std::env::var_os("CARGO_FEATURE_VFC_CI").is_some() {
        if let Ok(dir) = std::env::var("VFC_PROBES_LIB_DIR") {
            println!("cargo:rustc-link-search=native={dir}");
        }
        println!("cargo:rustc-link-lib=dylib=vfc_probes");
    }
}
