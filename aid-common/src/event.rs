//! Decision trace records pushed into the `AID_EVENTS` ring buffer.

use crate::config::EngineFlags;
use crate::engine::{Decision, Reason, Verdict};

/// Ring buffer size in bytes. Events are dropped, never waited on, when full.
pub const EVENTS_BYTE_SIZE: u32 = 1 << 18;

pub const EVENT_KIND_FILE: u8 = 1;
pub const EVENT_KIND_CONNECT: u8 = 2;

/// One traced decision. File events fill `dev`/`ino`/`mask`, connect events
/// fill `addr`/`port`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecisionEvent {
    pub timestamp_ns: u64,
    /// Legacy encoding, same as the policy key.
    pub dev: u64,
    pub ino: u64,
    pub uid: u32,
    pub pid: u32,
    pub mask: u32,
    /// Network byte order.
    pub addr: u32,
    pub port: u16,
    pub kind: u8,
    pub verdict: u8,
    pub reason: u8,
    pub _pad: [u8; 3],
}

impl DecisionEvent {
    pub fn verdict(&self) -> Verdict {
        if self.verdict == Verdict::Allow as u8 {
            Verdict::Allow
        } else {
            Verdict::Deny
        }
    }

    pub fn reason(&self) -> Option<Reason> {
        Reason::from_u8(self.reason)
    }
}

/// Whether a decision should be traced under `flags`. Non-agent callers are
/// never traced.
#[inline(always)]
pub const fn should_trace(flags: EngineFlags, decision: &Decision) -> bool {
    if matches!(decision.reason, Reason::NotAgent) {
        return false;
    }
    match decision.verdict {
        Verdict::Allow => flags.contains(EngineFlags::TRACE_ALLOWS),
        Verdict::Deny => flags.contains(EngineFlags::TRACE_DENIALS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_layout() {
        assert_eq!(core::mem::size_of::<DecisionEvent>(), 48);
    }

    #[test]
    fn tracing_follows_flags() {
        let deny = Decision::deny(Reason::NoPolicy);
        let allow = Decision::allow(Reason::Granted);
        let bypass = Decision::allow(Reason::NotAgent);

        let denials = EngineFlags::TRACE_DENIALS;
        assert!(should_trace(denials, &deny));
        assert!(!should_trace(denials, &allow));

        let everything = denials.with(EngineFlags::TRACE_ALLOWS, true);
        assert!(should_trace(everything, &allow));
        assert!(!should_trace(everything, &bypass));
        assert!(!should_trace(EngineFlags::empty(), &deny));
    }
}
