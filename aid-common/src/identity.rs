//! The reserved agent uid range.

/// First uid of the agent range (inclusive).
pub const AGENT_UID_BASE: u32 = 50_000;

/// End of the agent range (exclusive).
pub const AGENT_UID_MAX: u32 = 60_000;

/// Returns true when `uid` belongs to an agent account and is therefore subject
/// to enforcement. Every other identity bypasses the engine entirely.
#[inline(always)]
pub const fn is_agent(uid: u32) -> bool {
    uid >= AGENT_UID_BASE && uid < AGENT_UID_MAX
}
