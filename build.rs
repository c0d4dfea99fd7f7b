// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Build script to emit a custom cfg flag for post-edit validation.
//!
//! This enables cleaner conditional compilation:
//! - `cfg!(energy_validation)` instead of
//!   `cfg!(any(debug_assertions, feature = "validation"))`
//!
//! The flag is set for debug-assertion builds of the target, or whenever the
//! `validation` feature is enabled.

use std::env;

fn main() {
    // Declare the custom cfg name to avoid warnings
    println!("cargo:rustc-check-cfg=cfg(energy_validation)");
    println!("cargo:rerun-if-env-changed=CARGO_CFG_DEBUG_ASSERTIONS");

    // Target cfg, not the build script's own profile
    let debug_assertions = env::var_os("CARGO_CFG_DEBUG_ASSERTIONS").is_some();
    let feature = env::var_os("CARGO_FEATURE_VALIDATION").is_some();

    if debug_assertions || feature {
        println!("cargo:rustc-cfg=energy_validation");
    }
}
