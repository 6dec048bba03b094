use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=ffi/wrapper.h");

    link_sane();
    bindgen_sane();
}

fn link_sane() {
    // Distributions without the pkg-config file still ship the library.
    if let Err(err) = pkg_config::Config::new()
        .atleast_version("1.0.27")
        .probe("sane-backends")
    {
        println!("cargo:warning=pkg-config failed for sane-backends: {err}");
        println!("cargo:rustc-link-lib=dylib=sane");
    }
}

fn bindgen_sane() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let bindings_path = PathBuf::from(out_dir).join("bindings.rs");

    bindgen::builder()
        .header("ffi/wrapper.h")
        .allowlist_function("sane_.*")
        .allowlist_type("SANE_.*")
        .allowlist_var("SANE_.*")
        .generate()
        .expect("Failed to generate bindings")
        .write_to_file(bindings_path)
        .expect("Failed to write bindings");
}
