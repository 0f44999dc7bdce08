//! This build script copies the `memory.x` file from the crate root into a directory where
//! the linker can always find it at build time, and stamps the build configuration.

use std::{env, fs::File, io::Write, path::PathBuf};

/// Environment variables read into the firmware configuration
const CONFIG_VARS: [(&str, &str, &str); 3] = [
    ("CLOCK_24H", "WATCHFACE_CLOCK_24H", "true"),
    ("LOCALE", "WATCHFACE_LOCALE", "en_US"),
    ("TZ_OFFSET", "WATCHFACE_TZ_OFFSET", "3600"),
];

fn main() {
    // Put memory layout in the output directory and ensure it's on the linker search path.
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(include_bytes!("memory.x"))
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");

    // Only the firmware image needs the cortex-m and defmt linker scripts
    if env::var("TARGET").unwrap_or_default().starts_with("thumbv") {
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    // Current UTC time is the initial clock reference
    let mut config = File::create(out.join("build_config.rs")).unwrap();
    config
        .write_fmt(format_args!(
            "const UTC_EPOCH: i64 = {:?};\n",
            chrono::Utc::now().timestamp()
        ))
        .unwrap();

    for (name, var, default) in CONFIG_VARS {
        println!("cargo:rerun-if-env-changed={var}");
        let value = env::var(var).unwrap_or_else(|_| default.to_string());
        config
            .write_fmt(format_args!("const {name}: &str = {value:?};\n"))
            .unwrap();
    }
}
