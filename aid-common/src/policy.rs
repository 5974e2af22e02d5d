//! Policy table layouts.
//!
//! These structs are the raw key/value bytes of the pinned BPF hash maps.
//! Padding is spelled out as private fields so every constructor zeroes it;
//! the kernel hashes the full key, stray padding bytes would make lookups miss.

/// Maximum number of entries in the file policy table.
pub const FILE_POLICY_CAPACITY: u32 = 16_384;

/// Maximum number of entries in the socket policy table.
pub const SOCKET_POLICY_CAPACITY: u32 = 4_096;

/// Map names. The loader pins each map under the pin directory by this name.
pub const FILE_POLICIES_MAP: &str = "FILE_POLICIES";
pub const SOCKET_POLICIES_MAP: &str = "SOCKET_POLICIES";
pub const CONFIG_MAP: &str = "AID_CONFIG";
pub const EVENTS_MAP: &str = "AID_EVENTS";

/// `AF_INET`, the only family the socket table can describe.
pub const AF_INET: u16 = 2;

/// `sizeof(struct sockaddr_in)`.
pub const SOCKADDR_IN_LEN: i32 = 16;

/// (device, inode, agent uid). `dev` is in the legacy encoding, see
/// [`crate::device`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileKey {
    pub dev: u64,
    pub ino: u64,
    pub uid: u32,
    _pad: u32,
}

impl FileKey {
    #[inline(always)]
    pub const fn new(dev: u64, ino: u64, uid: u32) -> Self {
        Self {
            dev,
            ino,
            uid,
            _pad: 0,
        }
    }
}

/// Grants attached to a [`FileKey`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilePerm {
    pub allow_read: u8,
    pub allow_write: u8,
    _pad: [u8; 6],
}

impl FilePerm {
    #[inline(always)]
    pub const fn new(read: bool, write: bool) -> Self {
        Self {
            allow_read: read as u8,
            allow_write: write as u8,
            _pad: [0; 6],
        }
    }

    #[inline(always)]
    pub const fn can_read(&self) -> bool {
        self.allow_read != 0
    }

    #[inline(always)]
    pub const fn can_write(&self) -> bool {
        self.allow_write != 0
    }
}

/// (agent uid, family, port, address). `port` is host byte order, `addr` is
/// the `sin_addr.s_addr` word exactly as it sits in memory (network order).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketKey {
    pub uid: u32,
    pub family: u16,
    pub port: u16,
    pub addr: u32,
}

impl SocketKey {
    #[inline(always)]
    pub const fn new(uid: u32, family: u16, port: u16, addr: u32) -> Self {
        Self {
            uid,
            family,
            port,
            addr,
        }
    }

    /// Builds an IPv4 key from the address octets as written (`[93, 184, 216, 34]`).
    pub const fn ipv4(uid: u32, octets: [u8; 4], port: u16) -> Self {
        Self::new(uid, AF_INET, port, u32::from_ne_bytes(octets))
    }

    /// Address octets in dotted order.
    pub const fn octets(&self) -> [u8; 4] {
        self.addr.to_ne_bytes()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SocketPerm {
    pub allow_connect: u8,
    _pad: [u8; 3],
}

impl SocketPerm {
    #[inline(always)]
    pub const fn new(connect: bool) -> Self {
        Self {
            allow_connect: connect as u8,
            _pad: [0; 3],
        }
    }

    #[inline(always)]
    pub const fn can_connect(&self) -> bool {
        self.allow_connect != 0
    }
}

/// Read side of the file policy table as seen by the decision engine.
///
/// Implementations must not block or allocate: the probe implementation is a
/// single BPF hash lookup.
pub trait FilePolicyLookup {
    fn lookup_file(&self, key: &FileKey) -> Option<FilePerm>;
}

/// Read side of the socket policy table.
pub trait SocketPolicyLookup {
    fn lookup_socket(&self, key: &SocketKey) -> Option<SocketPerm>;
}

#[cfg(feature = "user")]
mod pod {
    use super::{FileKey, FilePerm, SocketKey, SocketPerm};

    // SAFETY: all four are repr(C), contain only integers and have no implicit padding.
    unsafe impl aya::Pod for FileKey {}
    unsafe impl aya::Pod for FilePerm {}
    unsafe impl aya::Pod for SocketKey {}
    unsafe impl aya::Pod for SocketPerm {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_have_no_implicit_padding() {
        assert_eq!(core::mem::size_of::<FileKey>(), 24);
        assert_eq!(core::mem::size_of::<FilePerm>(), 8);
        assert_eq!(core::mem::size_of::<SocketKey>(), 12);
        assert_eq!(core::mem::size_of::<SocketPerm>(), 4);
    }

    #[test]
    fn ipv4_key_keeps_network_order() {
        let key = SocketKey::ipv4(50020, [93, 184, 216, 34], 443);
        assert_eq!(key.addr.to_ne_bytes(), [93, 184, 216, 34]);
        assert_eq!(key.octets(), [93, 184, 216, 34]);
        assert_eq!(key.family, AF_INET);
        assert_eq!(key.port, 443);
    }

    #[test]
    fn perm_flags() {
        let ro = FilePerm::new(true, false);
        assert!(ro.can_read());
        assert!(!ro.can_write());
        assert!(SocketPerm::new(true).can_connect());
        assert!(!SocketPerm::default().can_connect());
    }
}
