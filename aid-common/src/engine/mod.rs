//! Access decision engines.
//!
//! Both engines are pure functions of (identity, kernel metadata, table
//! contents). They never write to a table and every path ends in a
//! [`Decision`]; the probes translate it into the hook's return value and the
//! control plane uses the same code for `aid check`.

mod connect;
mod file;

pub use connect::{ConnectPolicy, Destination};
pub use file::{AccessMask, FileAccessPolicy, FileId, FileMeta};

/// `EACCES`.
pub const EACCES: i32 = 13;

/// The only two outcomes the kernel boundary can express.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow = 0,
    Deny = 1,
}

impl Verdict {
    /// LSM hook return value: 0 or `-EACCES`.
    #[inline(always)]
    pub const fn retval(self) -> i32 {
        match self {
            Verdict::Allow => 0,
            Verdict::Deny => -EACCES,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Verdict::Allow => "allow",
            Verdict::Deny => "deny",
        }
    }
}

/// Which rule produced a verdict. Carried in trace events and printed by `aid check`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Caller is outside the agent range.
    NotAgent = 0,
    /// The file's inode could not be read (fail-open).
    Unresolved = 1,
    /// Character device, block device or socket file.
    SpecialFile = 2,
    /// Execute was requested.
    Execute = 3,
    /// Plain read of a file with an execute bit set (shared objects, interpreters).
    ExecutableRead = 4,
    /// Entry present and grants everything requested.
    Granted = 5,
    /// No direct entry; the parent directory's entry granted the request.
    Inherited = 6,
    /// No entry (default deny).
    NoPolicy = 7,
    ReadNotGranted = 8,
    WriteNotGranted = 9,
    /// connect() without a destination address.
    NoAddress = 10,
    /// Destination family other than AF_INET.
    NotInet = 11,
    /// Destination shorter than a `sockaddr_in`.
    MalformedAddress = 12,
    ConnectNotGranted = 13,
}

impl Reason {
    pub const fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Reason::NotAgent,
            1 => Reason::Unresolved,
            2 => Reason::SpecialFile,
            3 => Reason::Execute,
            4 => Reason::ExecutableRead,
            5 => Reason::Granted,
            6 => Reason::Inherited,
            7 => Reason::NoPolicy,
            8 => Reason::ReadNotGranted,
            9 => Reason::WriteNotGranted,
            10 => Reason::NoAddress,
            11 => Reason::NotInet,
            12 => Reason::MalformedAddress,
            13 => Reason::ConnectNotGranted,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Reason::NotAgent => "not an agent identity",
            Reason::Unresolved => "inode unresolved",
            Reason::SpecialFile => "special file",
            Reason::Execute => "execute request",
            Reason::ExecutableRead => "read of executable file",
            Reason::Granted => "granted",
            Reason::Inherited => "granted by parent directory",
            Reason::NoPolicy => "no policy entry",
            Reason::ReadNotGranted => "read not granted",
            Reason::WriteNotGranted => "write not granted",
            Reason::NoAddress => "no destination address",
            Reason::NotInet => "non-IPv4 destination",
            Reason::MalformedAddress => "malformed destination address",
            Reason::ConnectNotGranted => "connect not granted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: Reason,
}

impl Decision {
    #[inline(always)]
    pub const fn allow(reason: Reason) -> Self {
        Self {
            verdict: Verdict::Allow,
            reason,
        }
    }

    #[inline(always)]
    pub const fn deny(reason: Reason) -> Self {
        Self {
            verdict: Verdict::Deny,
            reason,
        }
    }

    #[inline(always)]
    pub const fn is_allowed(&self) -> bool {
        matches!(self.verdict, Verdict::Allow)
    }
}
