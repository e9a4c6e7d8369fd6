use std::time::Instant;

/// The reason codes a peer can send in a P2P Disconnect message (RLPx
/// wire values 0x00-0x10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Requested,
    TcpError,
    ProtocolError,
    UselessPeer,
    TooManyPeers,
    AlreadyConnected,
    IncompatibleVersion,
    InvalidIdentity,
    ClientQuitting,
    UnexpectedIdentity,
    SelfConnection,
    PingTimeout,
    SubprotocolError,
    Other(u8),
}

impl DisconnectReason {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => Self::Requested,
            0x01 => Self::TcpError,
            0x02 => Self::ProtocolError,
            0x03 => Self::UselessPeer,
            0x04 => Self::TooManyPeers,
            0x05 => Self::AlreadyConnected,
            0x06 => Self::IncompatibleVersion,
            0x07 => Self::InvalidIdentity,
            0x08 => Self::ClientQuitting,
            0x09 => Self::UnexpectedIdentity,
            0x0a => Self::SelfConnection,
            0x0b => Self::PingTimeout,
            0x10 => Self::SubprotocolError,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Requested => 0x00,
            Self::TcpError => 0x01,
            Self::ProtocolError => 0x02,
            Self::UselessPeer => 0x03,
            Self::TooManyPeers => 0x04,
            Self::AlreadyConnected => 0x05,
            Self::IncompatibleVersion => 0x06,
            Self::InvalidIdentity => 0x07,
            Self::ClientQuitting => 0x08,
            Self::UnexpectedIdentity => 0x09,
            Self::SelfConnection => 0x0a,
            Self::PingTimeout => 0x0b,
            Self::SubprotocolError => 0x10,
            Self::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolErrorReason {
    NonStandardPort,
    UdpPingPongMissed,
    UdpExcessiveByteCount,
    TcpAuthentication,
    TcpHelloMissed,
    TcpStatusMissed,
    CapabilitiesMismatch,
    NetworkMismatch,
}

/// The error taxonomy a peer route (TCP subprotocol or UDP discovery) can
/// fail with. I/O errors inside a peer stay confined to that peer's route
/// state; they never propagate synchronously into the chain engine — it
/// learns about them through the state-change callback instead.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("OS error: {0}")]
    Os(std::io::Error),
    #[error("protocol error: {0:?}")]
    Protocol(ProtocolErrorReason),
    #[error("peer disconnected: {0:?}")]
    Disconnect(DisconnectReason),
    #[error("credits exhausted, retry after {0:?}")]
    Exhausted(Instant),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("provision failed: {0}")]
    Provision(String),
    #[error(transparent)]
    Rlp(#[from] photon_rlp::error::RLPDecodeError),
    #[error(transparent)]
    RlpEncode(#[from] photon_rlp::error::RLPEncodeError),
}

impl From<std::io::Error> for PeerError {
    fn from(err: std::io::Error) -> Self {
        Self::Os(err)
    }
}

impl PeerError {
    /// Whether this error leaves the route usable (an `Exhausted` credit
    /// window can be retried after its cooldown) or terminally dead.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
}
