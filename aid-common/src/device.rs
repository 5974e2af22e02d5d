//! Device number encodings.
//!
//! The kernel keeps `super_block::s_dev` as `(major << 20) | minor`. Userspace
//! sees whatever `stat()` reports, split into major/minor by libc. Policy keys
//! use the legacy 16-bit layout `(major << 8) | (minor & 0xff)` on both sides,
//! so the control plane must go through [`legacy_encode`] and the probes
//! through [`kernel_to_legacy`]. Any other path produces keys that never match.
//!
//! The legacy layout keeps only the low 8 bits of the minor number. Two devices
//! that differ only above that are indistinguishable in the policy table.

/// Number of minor bits in the kernel's internal `dev_t` (`MINORBITS`).
pub const KERNEL_MINOR_BITS: u32 = 20;

const KERNEL_MINOR_MASK: u32 = (1 << KERNEL_MINOR_BITS) - 1;

/// Kernel-internal encoding, as found in `sb->s_dev` (`MKDEV`).
#[inline(always)]
pub const fn kernel_encode(major: u32, minor: u32) -> u32 {
    (major << KERNEL_MINOR_BITS) | (minor & KERNEL_MINOR_MASK)
}

#[inline(always)]
pub const fn kernel_major(kdev: u32) -> u32 {
    kdev >> KERNEL_MINOR_BITS
}

#[inline(always)]
pub const fn kernel_minor(kdev: u32) -> u32 {
    kdev & KERNEL_MINOR_MASK
}

/// Legacy encoding stored in [`crate::FileKey::dev`].
#[inline(always)]
pub const fn legacy_encode(major: u32, minor: u32) -> u64 {
    ((major as u64) << 8) | (minor as u64 & 0xff)
}

/// Converts a kernel `s_dev` into the key encoding.
#[inline(always)]
pub const fn kernel_to_legacy(kdev: u32) -> u64 {
    legacy_encode(kernel_major(kdev), kernel_minor(kdev))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sda1_matches_stat_value() {
        // 8:1 is what stat(1) reports as 0x801 for /dev/sda1 filesystems.
        let kdev = kernel_encode(8, 1);
        assert_eq!(kdev, 0x0080_0001);
        assert_eq!(kernel_to_legacy(kdev), 0x0801);
        assert_eq!(legacy_encode(8, 1), 0x0801);
    }

    #[test]
    fn round_trip_over_legacy_domain() {
        for major in 0..=0xffu32 {
            for minor in 0..=0xffu32 {
                let kdev = kernel_encode(major, minor);
                assert_eq!(kernel_major(kdev), major);
                assert_eq!(kernel_minor(kdev), minor);
                assert_eq!(kernel_to_legacy(kdev), legacy_encode(major, minor));
            }
        }
    }

    #[test]
    fn wide_minor_is_truncated_identically() {
        let kdev = kernel_encode(259, 0x1_0203);
        assert_eq!(kernel_to_legacy(kdev), legacy_encode(259, 0x03));
        assert_eq!(kernel_to_legacy(kdev), (259u64 << 8) | 0x03);
    }
}
