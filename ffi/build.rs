use std::path::PathBuf;

fn main() {
    let crate_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap());
    let config = cbindgen::Config::from_file(crate_dir.join("cbindgen.toml")).unwrap_or_default();

    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=cbindgen.toml");

    match cbindgen::generate_with_config(&crate_dir, config) {
        Ok(bindings) => {
            let include = crate_dir.join("include");
            let _ = std::fs::create_dir_all(&include);
            bindings.write_to_file(include.join("dbgbridge.h"));
        }
        // header generation is best-effort
        Err(err) => println!("cargo:warning=cbindgen: {err}"),
    }
}
