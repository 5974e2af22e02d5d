use super::{Decision, Reason};
use crate::identity::is_agent;
use crate::policy::{AF_INET, SOCKADDR_IN_LEN, SocketKey, SocketPolicyLookup};

/// Destination of a `connect()` as read from the hook's `sockaddr`.
///
/// `port` and `addr` are only meaningful for AF_INET with a full-length
/// address; the engine checks `family` and `len` before using them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub family: u16,
    pub len: i32,
    /// Host byte order.
    pub port: u16,
    /// `sin_addr.s_addr` as stored, network byte order.
    pub addr: u32,
}

impl Destination {
    /// A well-formed IPv4 destination from dotted octets.
    pub const fn ipv4(octets: [u8; 4], port: u16) -> Self {
        Self {
            family: AF_INET,
            len: SOCKADDR_IN_LEN,
            port,
            addr: u32::from_ne_bytes(octets),
        }
    }
}

/// Socket-connect decision engine.
pub struct ConnectPolicy<'a, T: ?Sized> {
    table: &'a T,
}

impl<'a, T: SocketPolicyLookup + ?Sized> ConnectPolicy<'a, T> {
    pub const fn new(table: &'a T) -> Self {
        Self { table }
    }

    /// Decides one `socket_connect` call. Only IPv4 destinations are governed;
    /// every other family passes through.
    #[inline(always)]
    pub fn decide(&self, uid: u32, dest: Option<&Destination>) -> Decision {
        if !is_agent(uid) {
            return Decision::allow(Reason::NotAgent);
        }

        let Some(dest) = dest else {
            return Decision::deny(Reason::NoAddress);
        };

        if dest.family != AF_INET {
            return Decision::allow(Reason::NotInet);
        }

        if dest.len < SOCKADDR_IN_LEN {
            return Decision::deny(Reason::MalformedAddress);
        }

        let key = SocketKey::new(uid, dest.family, dest.port, dest.addr);
        match self.table.lookup_socket(&key) {
            Some(perm) if perm.can_connect() => Decision::allow(Reason::Granted),
            Some(_) => Decision::deny(Reason::ConnectNotGranted),
            None => Decision::deny(Reason::NoPolicy),
        }
    }
}
