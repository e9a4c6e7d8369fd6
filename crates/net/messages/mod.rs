//! Wire message types, split by the protocol layer that defines them:
//! [`p2p`] (Hello/Disconnect/Ping/Pong, shared by every RLPx session),
//! [`les`] (the LES/PIP light-client subprotocol, offset `0x10`), and
//! [`discovery`] (the UDP node-discovery datagrams, a separate namespace
//! with no shared offset since it never multiplexes with TCP frames).

pub mod discovery;
pub mod les;
pub mod p2p;

use bytes::BufMut;
use photon_rlp::error::RLPDecodeError;

/// The P2P message-id offset every subprotocol sits above. Fixed per the
/// component design rather than negotiated, since this tree only ever
/// advertises one non-P2P capability at a time.
pub const SUBPROTOCOL_OFFSET: u8 = 0x10;

/// A decoded post-handshake TCP frame, already split into P2P control
/// messages (below the offset) and subprotocol messages (above it).
#[derive(Debug, Clone)]
pub enum Message {
    Hello(p2p::HelloMessage),
    Disconnect(p2p::DisconnectMessage),
    Ping(p2p::PingMessage),
    Pong(p2p::PongMessage),
    Status(les::StatusMessage),
    Announce(les::AnnounceMessage),
    GetBlockHeaders(les::GetBlockHeaders),
    BlockHeaders(les::BlockHeadersResponse),
    GetBlockBodies(les::GetBlockBodies),
    BlockBodies(les::BlockBodiesResponse),
    GetReceipts(les::GetReceipts),
    Receipts(les::ReceiptsResponse),
    GetTxStatus(les::GetTxStatus),
    TxStatus(les::TxStatusResponse),
    SendTx(les::SendTxMessage),
    UpdateCreditParameters(les::UpdateCreditParametersMessage),
    Acknowledge(les::AcknowledgeMessage),
}

impl Message {
    /// The message's own subtype code, without any offset applied.
    fn code(&self) -> u8 {
        match self {
            Message::Hello(_) => p2p::HelloMessage::CODE,
            Message::Disconnect(_) => p2p::DisconnectMessage::CODE,
            Message::Ping(_) => p2p::PingMessage::CODE,
            Message::Pong(_) => p2p::PongMessage::CODE,
            Message::Status(_) => les::StatusMessage::CODE,
            Message::Announce(_) => les::AnnounceMessage::CODE,
            Message::GetBlockHeaders(_) => les::GetBlockHeaders::CODE,
            Message::BlockHeaders(_) => les::BlockHeadersResponse::CODE,
            Message::GetBlockBodies(_) => les::GetBlockBodies::CODE,
            Message::BlockBodies(_) => les::BlockBodiesResponse::CODE,
            Message::GetReceipts(_) => les::GetReceipts::CODE,
            Message::Receipts(_) => les::ReceiptsResponse::CODE,
            Message::GetTxStatus(_) => les::GetTxStatus::CODE,
            Message::TxStatus(_) => les::TxStatusResponse::CODE,
            Message::SendTx(_) => les::SendTxMessage::CODE,
            Message::UpdateCreditParameters(_) => les::UpdateCreditParametersMessage::CODE,
            Message::Acknowledge(_) => les::AcknowledgeMessage::CODE,
        }
    }

    fn is_p2p(&self) -> bool {
        matches!(
            self,
            Message::Hello(_) | Message::Disconnect(_) | Message::Ping(_) | Message::Pong(_)
        )
    }

    /// The combined message id this message occupies on the wire: its own
    /// code, plus [`SUBPROTOCOL_OFFSET`] for anything above the P2P
    /// control messages.
    pub fn combined_id(&self) -> u8 {
        if self.is_p2p() {
            self.code()
        } else {
            SUBPROTOCOL_OFFSET + self.code()
        }
    }

    /// Encodes the combined message id followed by the RLP-encoded body —
    /// this is the plaintext the Frame Coder then encrypts.
    pub fn encode(&self, buf: &mut dyn BufMut) {
        buf.put_u8(self.combined_id());
        match self {
            Message::Hello(msg) => msg.encode(buf),
            Message::Disconnect(msg) => msg.encode(buf),
            Message::Ping(msg) => msg.encode(buf),
            Message::Pong(msg) => msg.encode(buf),
            Message::Status(msg) => msg.encode(buf),
            Message::Announce(msg) => msg.encode(buf),
            Message::GetBlockHeaders(msg) => msg.encode(buf),
            Message::BlockHeaders(msg) => msg.encode(buf),
            Message::GetBlockBodies(msg) => msg.encode(buf),
            Message::BlockBodies(msg) => msg.encode(buf),
            Message::GetReceipts(msg) => msg.encode(buf),
            Message::Receipts(msg) => msg.encode(buf),
            Message::GetTxStatus(msg) => msg.encode(buf),
            Message::TxStatus(msg) => msg.encode(buf),
            Message::SendTx(msg) => msg.encode(buf),
            Message::UpdateCreditParameters(msg) => msg.encode(buf),
            Message::Acknowledge(msg) => msg.encode(buf),
        }
    }

    /// Decodes a plaintext frame body (combined id byte + RLP payload).
    pub fn decode(plaintext: &[u8]) -> Result<Self, RLPDecodeError> {
        let (&combined_id, data) = plaintext
            .split_first()
            .ok_or_else(RLPDecodeError::malformed_data)?;

        if combined_id < SUBPROTOCOL_OFFSET {
            return match combined_id {
                p2p::HelloMessage::CODE => Ok(Message::Hello(p2p::HelloMessage::decode(data)?)),
                p2p::DisconnectMessage::CODE => {
                    Ok(Message::Disconnect(p2p::DisconnectMessage::decode(data)?))
                }
                p2p::PingMessage::CODE => Ok(Message::Ping(p2p::PingMessage::decode(data)?)),
                p2p::PongMessage::CODE => Ok(Message::Pong(p2p::PongMessage::decode(data)?)),
                _ => Err(RLPDecodeError::malformed_data()),
            };
        }

        match combined_id - SUBPROTOCOL_OFFSET {
            les::StatusMessage::CODE => Ok(Message::Status(les::StatusMessage::decode(data)?)),
            les::AnnounceMessage::CODE => {
                Ok(Message::Announce(les::AnnounceMessage::decode(data)?))
            }
            les::GetBlockHeaders::CODE => {
                Ok(Message::GetBlockHeaders(les::GetBlockHeaders::decode(data)?))
            }
            les::BlockHeadersResponse::CODE => Ok(Message::BlockHeaders(
                les::BlockHeadersResponse::decode(data)?,
            )),
            les::GetBlockBodies::CODE => {
                Ok(Message::GetBlockBodies(les::GetBlockBodies::decode(data)?))
            }
            les::BlockBodiesResponse::CODE => Ok(Message::BlockBodies(
                les::BlockBodiesResponse::decode(data)?,
            )),
            les::GetReceipts::CODE => Ok(Message::GetReceipts(les::GetReceipts::decode(data)?)),
            les::ReceiptsResponse::CODE => {
                Ok(Message::Receipts(les::ReceiptsResponse::decode(data)?))
            }
            les::GetTxStatus::CODE => Ok(Message::GetTxStatus(les::GetTxStatus::decode(data)?)),
            les::TxStatusResponse::CODE => {
                Ok(Message::TxStatus(les::TxStatusResponse::decode(data)?))
            }
            les::SendTxMessage::CODE => Ok(Message::SendTx(les::SendTxMessage::decode(data)?)),
            les::UpdateCreditParametersMessage::CODE => Ok(Message::UpdateCreditParameters(
                les::UpdateCreditParametersMessage::decode(data)?,
            )),
            les::AcknowledgeMessage::CODE => {
                Ok(Message::Acknowledge(les::AcknowledgeMessage::decode(data)?))
            }
            _ => Err(RLPDecodeError::malformed_data()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2p_message_has_no_offset() {
        let msg = Message::Ping(p2p::PingMessage);
        assert_eq!(msg.combined_id(), p2p::PingMessage::CODE);
    }

    #[test]
    fn subprotocol_message_is_offset() {
        let msg = Message::Acknowledge(les::AcknowledgeMessage);
        assert_eq!(
            msg.combined_id(),
            SUBPROTOCOL_OFFSET + les::AcknowledgeMessage::CODE
        );
    }

    #[test]
    fn encode_decode_roundtrip_get_headers() {
        let msg = Message::GetBlockHeaders(les::GetBlockHeaders {
            request_id: 1,
            from: 10,
            count: 192,
            skip: 0,
            reverse: false,
        });
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        let decoded = Message::decode(&buf).unwrap();
        match decoded {
            Message::GetBlockHeaders(req) => assert_eq!(req.count, 192),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
