//! Shared definitions for the AID access-control layer.
//!
//! Everything in this crate is compiled twice: into the eBPF object that runs
//! inside the LSM hooks, and into the `aid` control plane. Map layouts are
//! `#[repr(C)]` and both sides must be rebuilt together when they change.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod device;
pub mod engine;
pub mod event;
pub mod identity;
pub mod policy;

pub use config::EngineFlags;
pub use engine::{
    AccessMask, ConnectPolicy, Decision, Destination, FileAccessPolicy, FileId, FileMeta, Reason,
    Verdict,
};
pub use identity::{AGENT_UID_BASE, AGENT_UID_MAX, is_agent};
pub use policy::{FileKey, FilePerm, FilePolicyLookup, SocketKey, SocketPerm, SocketPolicyLookup};
