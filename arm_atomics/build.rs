// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::env;

#[path = "target_caps.rs"]
mod target_caps;

fn main() {
    println!("cargo::rerun-if-changed=build.rs");
    println!("cargo::rerun-if-changed=target_caps.rs");
    println!("cargo::rustc-check-cfg=cfg(atomics_thumb1)");
    println!("cargo::rustc-check-cfg=cfg(atomics_thumb2)");
    println!("cargo::rustc-check-cfg=cfg(atomics_cp15_barrier)");

    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    match arch.as_str() {
        "arm" => {
            let triple = env::var("TARGET").unwrap_or_default();
            let caps = match target_caps::arm_caps(&triple) {
                Ok(caps) => caps,
                Err(reason) => panic!("arm_atomics: unsupported target {triple:?}: {reason}"),
            };
            if caps.thumb1() {
                println!("cargo::rustc-cfg=atomics_thumb1");
            }
            if caps.thumb2() {
                println!("cargo::rustc-cfg=atomics_thumb2");
            }
            if caps.cp15_barrier() {
                println!("cargo::rustc-cfg=atomics_cp15_barrier");
            }
        }
        "aarch64" | "x86" | "x86_64" => {}
        other => panic!("arm_atomics: unsupported target architecture {other:?}"),
    }
}
