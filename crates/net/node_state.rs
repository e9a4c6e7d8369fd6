use crate::error::{DisconnectReason, ProtocolErrorReason};
use std::time::Instant;

/// Handshake subphase for the TCP (subprotocol) route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpSubphase {
    Open,
    Auth,
    AuthAck,
    Hello,
    HelloAck,
    Status,
    StatusAck,
}

/// Handshake subphase for the UDP (discovery) route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdpSubphase {
    Open,
    Ping,
    PingAck,
}

/// The state of one of a peer's two independent routes. Both routes share
/// this shape; which subphase variant applies depends on which route it
/// is (TCP vs UDP), enforced by the peer node rather than the type.
#[derive(Debug, Clone)]
pub enum NodeState<Subphase> {
    Available,
    Connecting(Subphase),
    Connected,
    Exhausted(Instant),
    ErrorOs(String),
    ErrorDisconnect(DisconnectReason),
    ErrorProtocol(ProtocolErrorReason),
}

pub type TcpState = NodeState<TcpSubphase>;
pub type UdpState = NodeState<UdpSubphase>;

impl<S> NodeState<S> {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ErrorOs(_) | Self::ErrorDisconnect(_) | Self::ErrorProtocol(_)
        )
    }
}
