//! Decision trace consumer.

use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use aid_common::event::{DecisionEvent, EVENT_KIND_CONNECT, EVENT_KIND_FILE};
use aid_common::policy::EVENTS_MAP;
use aid_common::{AccessMask, Verdict};
use aya::maps::{Map, MapData, RingBuf};

use crate::store::StoreError;

/// Decodes one ring buffer record. Short records yield `None`.
pub fn parse_event(bytes: &[u8]) -> Option<DecisionEvent> {
    if bytes.len() < std::mem::size_of::<DecisionEvent>() {
        return None;
    }
    // SAFETY: length checked above; DecisionEvent is repr(C) plain data and
    // the record may be unaligned.
    Some(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const DecisionEvent) })
}

fn mask_letters(bits: u32) -> String {
    let mask = AccessMask::from_bits(bits);
    let mut out = String::new();
    if mask.wants_read() {
        out.push('r');
    }
    if mask.wants_write() {
        out.push('w');
    }
    if mask.wants_exec() {
        out.push('x');
    }
    if out.is_empty() {
        out.push('-');
    }
    out
}

/// Display wrapper for a traced decision.
pub struct TraceLine<'a>(pub &'a DecisionEvent);

impl fmt::Display for TraceLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let event = self.0;
        let verdict = match event.verdict() {
            Verdict::Allow => "ALLOW",
            Verdict::Deny => "DENY",
        };
        let reason = event.reason().map(|r| r.as_str()).unwrap_or("unknown");
        let secs = event.timestamp_ns / 1_000_000_000;
        let nanos = event.timestamp_ns % 1_000_000_000;

        write!(
            f,
            "[{}.{:09}] {:<5} uid={} pid={} ",
            secs, nanos, verdict, event.uid, event.pid
        )?;
        match event.kind {
            EVENT_KIND_FILE => write!(
                f,
                "file dev=0x{:x} ino={} mask={}",
                event.dev,
                event.ino,
                mask_letters(event.mask)
            )?,
            EVENT_KIND_CONNECT => write!(
                f,
                "connect {}:{}",
                Ipv4Addr::from(event.addr.to_ne_bytes()),
                event.port
            )?,
            other => write!(f, "kind={}", other)?,
        }
        write!(f, " ({})", reason)
    }
}

pub struct TraceReader {
    ring: RingBuf<MapData>,
}

impl TraceReader {
    pub fn open(pin_dir: &Path) -> Result<Self, StoreError> {
        let path = pin_dir.join(EVENTS_MAP);
        if !path.exists() {
            return Err(StoreError::NotLoaded(path));
        }
        let data = MapData::from_pin(&path)
            .map_err(|e| StoreError::Map(format!("failed to open {}: {}", path.display(), e)))?;
        let ring = RingBuf::try_from(Map::RingBuf(data))
            .map_err(|e| StoreError::Map(format!("{}: {}", path.display(), e)))?;
        Ok(Self { ring })
    }

    /// Drains whatever is currently queued.
    pub fn drain(&mut self) -> Vec<DecisionEvent> {
        let mut events = Vec::new();
        while let Some(item) = self.ring.next() {
            match parse_event(&item) {
                Some(event) => events.push(event),
                None => log::debug!("Dropping short trace record ({} bytes)", item.len()),
            }
        }
        events
    }

    /// Polls until `limit` events have been handed to `on_event`, or forever.
    pub fn follow<F>(&mut self, limit: Option<usize>, mut on_event: F)
    where
        F: FnMut(&DecisionEvent),
    {
        let mut seen = 0usize;
        if limit_reached(seen, limit) {
            return;
        }
        loop {
            for event in self.drain() {
                on_event(&event);
                seen += 1;
                if limit_reached(seen, limit) {
                    return;
                }
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }
}

/// Whether `seen` events satisfy a `-n` limit. No limit never completes.
pub fn limit_reached(seen: usize, limit: Option<usize>) -> bool {
    limit.is_some_and(|limit| seen >= limit)
}
