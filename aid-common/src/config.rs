//! Engine flags written by the loader into the single-slot `AID_CONFIG` array.

/// Bit set read by the probes on every invocation. A missing config slot reads
/// as all bits clear, which is the canonical behaviour.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineFlags(u32);

impl EngineFlags {
    /// Fall back to the parent directory's entry when a file has none.
    pub const DIRECTORY_INHERITANCE: Self = Self(1 << 0);
    /// Emit a trace event for every denial.
    pub const TRACE_DENIALS: Self = Self(1 << 1);
    /// Emit a trace event for every allow of an agent request.
    pub const TRACE_ALLOWS: Self = Self(1 << 2);

    const ALL: u32 = Self::DIRECTORY_INHERITANCE.0 | Self::TRACE_DENIALS.0 | Self::TRACE_ALLOWS.0;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Unknown bits are dropped.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, other: Self, enabled: bool) -> Self {
        if enabled {
            Self(self.0 | other.0)
        } else {
            Self(self.0 & !other.0)
        }
    }
}

#[cfg(feature = "user")]
// SAFETY: transparent wrapper around u32.
unsafe impl aya::Pod for EngineFlags {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_canonical() {
        let flags = EngineFlags::default();
        assert!(!flags.contains(EngineFlags::DIRECTORY_INHERITANCE));
        assert!(!flags.contains(EngineFlags::TRACE_DENIALS));
    }

    #[test]
    fn with_sets_and_clears() {
        let flags = EngineFlags::empty()
            .with(EngineFlags::TRACE_DENIALS, true)
            .with(EngineFlags::TRACE_ALLOWS, true)
            .with(EngineFlags::TRACE_ALLOWS, false);
        assert_eq!(flags, EngineFlags::TRACE_DENIALS);
        assert_eq!(EngineFlags::from_bits_truncate(0xff).bits(), 0b111);
    }
}
