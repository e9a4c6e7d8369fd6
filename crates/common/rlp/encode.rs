use bytes::{BufMut, Bytes};
use ethereum_types::U256;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::constants::RLP_NULL;

/// Function for encoding a value to RLP.
/// For encoding the value into a buffer directly, use [`RLPEncode::encode`].
pub fn encode<T: RLPEncode>(value: T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf);
    buf
}

/// Calculates the encoded length of the given integer bit width (ilog2 value) and lsb.
#[inline(always)]
const fn impl_length_integers(bits: u32, lsb: u8) -> usize {
    let sig_len = (bits + 8) >> 3;
    let is_multibyte_mask = ((sig_len > 1) as usize) | ((lsb > 0x7f) as usize);
    1 + sig_len as usize * is_multibyte_mask
}

/// Computes the length needed for a given payload length.
#[inline]
pub const fn list_length(payload_len: usize) -> usize {
    if payload_len < 56 {
        1 + payload_len
    } else {
        let be_len = payload_len.ilog2() / 8 + 1;
        1 + be_len as usize + payload_len
    }
}

/// Computes the length needed for a given byte-string and first byte.
#[inline]
pub const fn bytes_length(bytes_len: usize, first_byte: u8) -> usize {
    if bytes_len == 1 && first_byte <= 0x7f {
        return 1;
    }

    if bytes_len < 56 {
        return 1 + bytes_len;
    }

    let be_len = bytes_len.ilog2() / 8 + 1;
    1 + be_len as usize + bytes_len
}

/// Implements `BufMut` but only counts the bytes that would be pushed, so
/// `length()` can be computed by replaying `encode()` without allocating.
#[derive(Debug, Clone, Copy, Default)]
struct ByteCounter {
    count: usize,
}

unsafe impl BufMut for ByteCounter {
    fn remaining_mut(&self) -> usize {
        usize::MAX - self.count
    }

    unsafe fn advance_mut(&mut self, cnt: usize) {
        self.count += cnt;
    }

    fn chunk_mut(&mut self) -> &mut bytes::buf::UninitSlice {
        unreachable!("all callers go through the reimplemented put_* methods")
    }

    fn put<T: bytes::buf::Buf>(&mut self, src: T)
    where
        Self: Sized,
    {
        self.count += src.remaining();
    }

    fn put_bytes(&mut self, _val: u8, cnt: usize) {
        self.count += cnt;
    }

    fn put_slice(&mut self, src: &[u8]) {
        self.count += src.len()
    }
}

pub trait RLPEncode {
    fn encode(&self, buf: &mut dyn BufMut);

    fn length(&self) -> usize {
        let mut counter = ByteCounter::default();
        self.encode(&mut counter);
        counter.count
    }

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

impl RLPEncode for bool {
    #[inline(always)]
    fn encode(&self, buf: &mut dyn BufMut) {
        if *self {
            buf.put_u8(0x01);
        } else {
            buf.put_u8(RLP_NULL);
        }
    }

    #[inline(always)]
    fn length(&self) -> usize {
        1
    }
}

#[inline]
fn impl_encode<const N: usize>(value_be: [u8; N], buf: &mut dyn BufMut) {
    let mut i = 0;
    while i < N && value_be[i] == 0 {
        i += 1;
    }

    if i == N {
        buf.put_u8(RLP_NULL);
        return;
    }

    let first = value_be[i];

    if i == N - 1 && first <= 0x7f {
        buf.put_u8(first);
        return;
    }

    let len = N - i;
    buf.put_u8(RLP_NULL + len as u8);
    buf.put_slice(&value_be[i..]);
}

impl RLPEncode for u8 {
    fn encode(&self, buf: &mut dyn BufMut) {
        impl_encode(self.to_be_bytes(), buf);
    }

    #[inline]
    fn length(&self) -> usize {
        impl_length_integers(self.checked_ilog2().unwrap_or(0), *self)
    }
}

impl RLPEncode for u16 {
    fn encode(&self, buf: &mut dyn BufMut) {
        impl_encode(self.to_be_bytes(), buf);
    }
    #[inline]
    fn length(&self) -> usize {
        impl_length_integers(self.checked_ilog2().unwrap_or(0), (self & 0xff) as u8)
    }
}

impl RLPEncode for u32 {
    fn encode(&self, buf: &mut dyn BufMut) {
        impl_encode(self.to_be_bytes(), buf);
    }

    #[inline]
    fn length(&self) -> usize {
        impl_length_integers(self.checked_ilog2().unwrap_or(0), (self & 0xff) as u8)
    }
}

impl RLPEncode for u64 {
    fn encode(&self, buf: &mut dyn BufMut) {
        impl_encode(self.to_be_bytes(), buf);
    }

    #[inline]
    fn length(&self) -> usize {
        impl_length_integers(self.checked_ilog2().unwrap_or(0), (self & 0xff) as u8)
    }
}

impl RLPEncode for usize {
    fn encode(&self, buf: &mut dyn BufMut) {
        impl_encode(self.to_be_bytes(), buf);
    }

    #[inline]
    fn length(&self) -> usize {
        impl_length_integers(self.checked_ilog2().unwrap_or(0), (self & 0xff) as u8)
    }
}

impl RLPEncode for u128 {
    fn encode(&self, buf: &mut dyn BufMut) {
        impl_encode(self.to_be_bytes(), buf);
    }

    #[inline]
    fn length(&self) -> usize {
        impl_length_integers(self.checked_ilog2().unwrap_or(0), (self & 0xff) as u8)
    }
}

impl RLPEncode for () {
    fn encode(&self, buf: &mut dyn BufMut) {
        buf.put_u8(RLP_NULL);
    }
    #[inline]
    fn length(&self) -> usize {
        1
    }
}

impl RLPEncode for [u8] {
    #[inline(always)]
    fn encode(&self, buf: &mut dyn BufMut) {
        if self.len() == 1 && self[0] < RLP_NULL {
            buf.put_u8(self[0]);
        } else {
            let len = self.len();
            if len < 56 {
                buf.put_u8(RLP_NULL + len as u8);
            } else {
                let bytes = len.to_be_bytes();
                let start = bytes.iter().position(|&x| x != 0).unwrap();
                let len = bytes.len() - start;
                buf.put_u8(0xb7 + len as u8);
                buf.put_slice(&bytes[start..]);
            }
            buf.put_slice(self);
        }
    }

    #[inline]
    fn length(&self) -> usize {
        if self.is_empty() {
            return 1;
        }
        bytes_length(self.len(), self[0])
    }
}

impl<const N: usize> RLPEncode for [u8; N] {
    #[inline]
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_ref().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        if N == 1 && self[0] <= 0x7f {
            return 1;
        }

        if N < 56 {
            return 1 + N;
        }

        let be_len = if N == 0 { 1 } else { (N.ilog2() as usize / 8) + 1 };

        1 + be_len + N
    }
}

impl RLPEncode for str {
    #[inline]
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for &str {
    #[inline]
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for String {
    #[inline]
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for U256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        let leading_zeros_in_bytes: usize = (self.leading_zeros() / 8) as usize;
        let bytes = self.to_big_endian();
        bytes[leading_zeros_in_bytes..].encode(buf)
    }

    fn length(&self) -> usize {
        let ilog = self.bits().saturating_sub(1);
        impl_length_integers(ilog as u32, (self.low_u32() & 0xff) as u8)
    }
}

impl<T: RLPEncode> RLPEncode for Vec<T> {
    #[inline(always)]
    fn encode(&self, buf: &mut dyn BufMut) {
        if self.is_empty() {
            buf.put_u8(0xc0);
        } else {
            let payload_len: usize = self.iter().map(|item| item.length()).sum();

            encode_length(payload_len, buf);

            for item in self {
                item.encode(buf);
            }
        }
    }

    #[inline]
    fn length(&self) -> usize {
        if self.is_empty() {
            return 1;
        }

        let mut payload_len = 0usize;
        for item in self {
            payload_len += item.length();
        }

        list_length(payload_len)
    }
}

#[inline]
pub fn encode_length(total_len: usize, buf: &mut dyn BufMut) {
    if total_len < 56 {
        buf.put_u8(0xc0 + total_len as u8);
    } else {
        let bytes = total_len.to_be_bytes();
        let start = bytes.iter().position(|&x| x != 0).unwrap();
        let len = bytes.len() - start;
        buf.put_u8(0xf7 + len as u8);
        buf.put_slice(&bytes[start..]);
    }
}

impl<S: RLPEncode, T: RLPEncode> RLPEncode for (S, T) {
    fn encode(&self, buf: &mut dyn BufMut) {
        super::structs::Encoder::new(buf)
            .encode_field(&self.0)
            .encode_field(&self.1)
            .finish();
    }

    #[inline]
    fn length(&self) -> usize {
        let payload_len = self.0.length() + self.1.length();
        list_length(payload_len)
    }
}

impl<S: RLPEncode, T: RLPEncode, U: RLPEncode> RLPEncode for (S, T, U) {
    fn encode(&self, buf: &mut dyn BufMut) {
        super::structs::Encoder::new(buf)
            .encode_field(&self.0)
            .encode_field(&self.1)
            .encode_field(&self.2)
            .finish();
    }

    #[inline]
    fn length(&self) -> usize {
        let payload_len = self.0.length() + self.1.length() + self.2.length();
        list_length(payload_len)
    }
}

impl<S: RLPEncode, T: RLPEncode, U: RLPEncode, V: RLPEncode> RLPEncode for (S, T, U, V) {
    fn encode(&self, buf: &mut dyn BufMut) {
        super::structs::Encoder::new(buf)
            .encode_field(&self.0)
            .encode_field(&self.1)
            .encode_field(&self.2)
            .encode_field(&self.3)
            .finish();
    }

    #[inline]
    fn length(&self) -> usize {
        let payload_len = self.0.length() + self.1.length() + self.2.length() + self.3.length();
        list_length(payload_len)
    }
}

impl RLPEncode for Ipv4Addr {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.octets().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(&self.octets())
    }
}

impl RLPEncode for Ipv6Addr {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.octets().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(&self.octets())
    }
}

impl RLPEncode for IpAddr {
    fn encode(&self, buf: &mut dyn BufMut) {
        match self {
            IpAddr::V4(ip) => ip.encode(buf),
            IpAddr::V6(ip) => ip.encode(buf),
        }
    }

    #[inline]
    fn length(&self) -> usize {
        match self {
            IpAddr::V4(ipv4_addr) => RLPEncode::length(&ipv4_addr.octets()),
            IpAddr::V6(ipv6_addr) => RLPEncode::length(&ipv6_addr.octets()),
        }
    }
}

impl RLPEncode for Bytes {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_ref().encode(buf)
    }

    fn length(&self) -> usize {
        self.as_ref().length()
    }
}

// Ethereum fixed-width types

impl RLPEncode for ethereum_types::H32 {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for ethereum_types::H64 {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for ethereum_types::H128 {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for ethereum_types::Address {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for ethereum_types::H256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for ethereum_types::H264 {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for ethereum_types::H512 {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for ethereum_types::Signature {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(self.as_bytes())
    }
}

impl RLPEncode for ethereum_types::Bloom {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.0.encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        RLPEncode::length(&self.0)
    }
}

/// Encodes a message's raw payload without the RLPx frame-capability wrapping,
/// used before snappy-compressing a wire message.
pub trait PayloadRLPEncode {
    fn encode_payload(&self, buf: &mut dyn bytes::BufMut);
    fn encode_payload_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_payload(&mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use ethereum_types::{Address, U256};
    use hex_literal::hex;

    use crate::constants::{RLP_EMPTY_LIST, RLP_NULL};

    use super::RLPEncode;

    #[test]
    fn can_encode_booleans() {
        let mut encoded = Vec::new();
        true.encode(&mut encoded);
        assert_eq!(encoded, vec![0x01]);

        let mut encoded = Vec::new();
        false.encode(&mut encoded);
        assert_eq!(encoded, vec![RLP_NULL]);
    }

    #[test]
    fn can_encode_u32() {
        let mut encoded = Vec::new();
        0u32.encode(&mut encoded);
        assert_eq!(encoded, vec![RLP_NULL]);
        assert_eq!(encoded.len(), 0u32.length());

        let mut encoded = Vec::new();
        0x80u32.encode(&mut encoded);
        assert_eq!(encoded, vec![RLP_NULL + 1, 0x80]);
        assert_eq!(encoded.len(), 0x80u32.length());
    }

    #[test]
    fn u64_lengths_match() {
        for n in 0u64..=10_000 {
            let mut encoded = Vec::new();
            n.encode(&mut encoded);
            assert_eq!(
                encoded.len(),
                n.length(),
                "u64 length mismatch at value {n}"
            );
        }
    }

    #[test]
    fn can_encode_bytes() {
        let message: [u8; 2] = [0x04, 0x00];
        let encoded = {
            let mut buf = vec![];
            message.encode(&mut buf);
            buf
        };
        assert_eq!(encoded, vec![RLP_NULL + 2, 0x04, 0x00]);
        assert_eq!(encoded.len(), message.length());
    }

    #[test]
    fn can_encode_strings() {
        let message = "dog";
        let encoded = {
            let mut buf = vec![];
            message.encode(&mut buf);
            buf
        };
        let expected: [u8; 4] = [RLP_NULL + 3, b'd', b'o', b'g'];
        assert_eq!(encoded, expected);
        assert_eq!(encoded.len(), message.length());
    }

    #[test]
    fn can_encode_lists_of_str() {
        let message = vec!["cat", "dog"];
        let encoded = {
            let mut buf = vec![];
            message.encode(&mut buf);
            buf
        };
        let expected: [u8; 9] = [0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g'];
        assert_eq!(encoded, expected);
        assert_eq!(encoded.len(), message.length());

        let message: Vec<&str> = vec![];
        let encoded = {
            let mut buf = vec![];
            message.encode(&mut buf);
            buf
        };
        let expected: [u8; 1] = [RLP_EMPTY_LIST];
        assert_eq!(encoded, expected);
        assert_eq!(encoded.len(), message.length());
    }

    #[test]
    fn can_encode_ip() {
        let message = "192.168.0.1";
        let ip: IpAddr = message.parse().unwrap();
        let encoded = {
            let mut buf = vec![];
            ip.encode(&mut buf);
            buf
        };
        let expected: [u8; 5] = [RLP_NULL + 4, 192, 168, 0, 1];
        assert_eq!(encoded, expected);
        assert_eq!(encoded.len(), ip.length());
    }

    #[test]
    fn can_encode_addresses() {
        let address = Address::from(hex!("ef2d6d194084c2de36e0dabfce45d046b37d1106"));
        let encoded = {
            let mut buf = vec![];
            address.encode(&mut buf);
            buf
        };
        let expected = hex!("94ef2d6d194084c2de36e0dabfce45d046b37d1106");
        assert_eq!(encoded, expected);
        assert_eq!(encoded.len(), address.length());
    }

    #[test]
    fn can_encode_u256() {
        let mut encoded = Vec::new();
        U256::max_value().encode(&mut encoded);
        let bytes = [0xff; 32];
        let mut expected: Vec<u8> = bytes.into();
        expected.insert(0, 0x80 + 32);
        assert_eq!(encoded, expected);
        assert_eq!(encoded.len(), U256::max_value().length());
    }

    #[test]
    fn can_encode_tuple() {
        let tuple: (u8, u8) = (0x01, 0x02);
        let mut encoded = Vec::new();
        tuple.encode(&mut encoded);
        let expected = vec![0xc0 + 2, 0x01, 0x02];
        assert_eq!(encoded, expected);
        assert_eq!(encoded.len(), tuple.length());
    }
}
