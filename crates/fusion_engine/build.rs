//! Embed the vendor configuration profile and locate libalgobsec.
//!
//! - `BSEC_CONFIG_PATH`: serialized BSEC configuration copied into the binary;
//!   unset means an empty profile (engine defaults)
//! - `BSEC_LIB_DIR`: directory holding `libalgobsec.a` (feature `bsec` only)

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=BSEC_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=BSEC_LIB_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    let embedded = out_dir.join("bsec_config.bin");

    match env::var_os("BSEC_CONFIG_PATH") {
        Some(path) => {
            let path = PathBuf::from(path);
            println!("cargo:rerun-if-changed={}", path.display());
            fs::copy(&path, &embedded).unwrap_or_else(|e| {
                panic!("cannot read BSEC_CONFIG_PATH {}: {e}", path.display())
            });
        }
        None => fs::write(&embedded, []).expect("write empty profile"),
    }

    if env::var_os("CARGO_FEATURE_BSEC").is_some() {
        if let Some(dir) = env::var_os("BSEC_LIB_DIR") {
            println!("cargo:rustc-link-search=native={}", PathBuf::from(dir).display());
        }
        println!("cargo:rustc-link-lib=static=algobsec");
        println!("cargo:rustc-link-lib=m");
    }
}
