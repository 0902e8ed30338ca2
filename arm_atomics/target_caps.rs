// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping from a 32-bit ARM target triple to the instruction sequences the
//! library can use on it.
//!
//! Stable rustc does not report the ARM architecture-version target features
//! (`v6`, `v7`, `thumb2`, `thumb-mode`, `mclass`), so the build script reads
//! them off the architecture part of the triple instead. This file is shared
//! by `build.rs` and the library's unit tests.

/// Architecture level, as far as barriers are concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Isa {
    /// ARMv6 and ARMv6K: exclusive monitor, but barriers go through CP15.
    V6,
    /// ARMv7 and later, including the M profiles with Thumb-2: `dmb`.
    V7,
}

/// Instruction set the compiler emits code in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionSet {
    A32,
    /// 16-bit Thumb with an A32 state to switch into.
    Thumb1,
    /// Thumb-2, where `strexeq` needs an `it eq` in front of it.
    Thumb2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArmCaps {
    pub isa: Isa,
    pub instruction_set: InstructionSet,
}

impl ArmCaps {
    pub fn thumb1(self) -> bool {
        self.instruction_set == InstructionSet::Thumb1
    }

    pub fn thumb2(self) -> bool {
        self.instruction_set == InstructionSet::Thumb2
    }

    pub fn cp15_barrier(self) -> bool {
        self.isa == Isa::V6
    }
}

/// Works out the capabilities of a 32-bit ARM triple such as
/// `armv7-unknown-linux-gnueabihf` or `thumbv7em-none-eabihf`. Errors name
/// the reason the target cannot be supported.
pub fn arm_caps(triple: &str) -> Result<ArmCaps, &'static str> {
    let arch = triple.split('-').next().unwrap_or_default();
    let (thumb, version) = if let Some(version) = arch.strip_prefix("thumb") {
        (true, version)
    } else if let Some(version) = arch.strip_prefix("arm") {
        (false, version)
    } else {
        return Err("not a 32-bit ARM target triple");
    };
    // Big-endian variants: armebv7r, thumbebv7m, ...
    let version = version.strip_prefix("eb").unwrap_or(version);

    let isa = if version.is_empty() {
        // Plain `arm-*` targets are ARMv6, except Android's which is ARMv5TE.
        if triple.contains("android") {
            return Err("exclusive-access instructions need ARMv6 or later");
        }
        Isa::V6
    } else if version.starts_with("v6m") {
        return Err("ARMv6-M has no exclusive-access instructions");
    } else if version.starts_with("v8m.base") {
        return Err(
            "ARMv8-M Baseline has exclusive access but no IT blocks or 32-bit Thumb data-processing instructions",
        );
    } else if version.starts_with("v6") {
        Isa::V6
    } else if version.starts_with("v7") || version.starts_with("v8") {
        Isa::V7
    } else if version.starts_with("v4") || version.starts_with("v5") {
        return Err("exclusive-access instructions need ARMv6 or later");
    } else {
        return Err("unrecognized ARM architecture version");
    };

    let instruction_set = match (thumb, isa) {
        (false, _) => InstructionSet::A32,
        (true, Isa::V6) => InstructionSet::Thumb1,
        (true, Isa::V7) => InstructionSet::Thumb2,
    };
    Ok(ArmCaps {
        isa,
        instruction_set,
    })
}

#[test]
fn test_armv6_uses_cp15_barrier() {
    for triple in [
        "arm-unknown-linux-gnueabihf",
        "armv6-unknown-freebsd",
        "armv6k-nintendo-3ds",
    ] {
        let caps = arm_caps(triple).unwrap();
        assert_eq!(caps.isa, Isa::V6, "{triple}");
        assert!(caps.cp15_barrier(), "{triple}");
        assert!(!caps.thumb1() && !caps.thumb2(), "{triple}");
    }
}

#[test]
fn test_armv7_a32() {
    for triple in [
        "armv7-unknown-linux-gnueabihf",
        "armv7a-none-eabi",
        "armebv7r-none-eabihf",
        "armv8r-none-eabihf",
    ] {
        let caps = arm_caps(triple).unwrap();
        assert_eq!(
            caps,
            ArmCaps {
                isa: Isa::V7,
                instruction_set: InstructionSet::A32,
            },
            "{triple}"
        );
        assert!(!caps.cp15_barrier(), "{triple}");
    }
}

#[test]
fn test_thumbv7_is_thumb2() {
    for triple in [
        "thumbv7neon-unknown-linux-gnueabihf",
        "thumbv7em-none-eabihf",
        "thumbv7m-none-eabi",
        "thumbv8m.main-none-eabi",
    ] {
        let caps = arm_caps(triple).unwrap();
        assert!(caps.thumb2(), "{triple}");
        assert!(!caps.thumb1(), "{triple}");
        assert!(!caps.cp15_barrier(), "{triple}");
    }
}

#[test]
fn test_thumb_on_armv6_switches_state() {
    let caps = arm_caps("thumbv6-none-eabi").unwrap();
    assert!(caps.thumb1());
    assert!(caps.cp15_barrier());
}

#[test]
fn test_unsupported_arm_targets() {
    assert!(
        arm_caps("thumbv6m-none-eabi")
            .unwrap_err()
            .contains("ARMv6-M")
    );
    assert!(
        arm_caps("thumbv8m.base-none-eabi")
            .unwrap_err()
            .contains("ARMv8-M Baseline")
    );
    for triple in [
        "armv4t-unknown-linux-gnueabi",
        "armv5te-unknown-linux-gnueabi",
        "thumbv5te-none-eabi",
        "arm-linux-androideabi",
    ] {
        assert!(arm_caps(triple).unwrap_err().contains("ARMv6"), "{triple}");
    }
}

#[test]
fn test_aarch64_is_not_a_32_bit_triple() {
    assert!(arm_caps("aarch64-unknown-linux-gnu").is_err());
}
