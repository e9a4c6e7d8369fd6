/// Single byte strings in [0x00, 0x7f] encode to themselves, so the smallest
/// prefix byte for a string is reserved for the empty string.
pub const RLP_NULL: u8 = 0x80;

/// Prefix byte for the empty list. Lists of total payload length 0-55 use
/// `0xc0 + len`.
pub const RLP_EMPTY_LIST: u8 = 0xc0;
