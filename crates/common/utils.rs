use ethereum_types::{Address, H256};
use hex::FromHexError;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum HexParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] FromHexError),
    #[error("Expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

pub fn decode_hex(hex: &str) -> Result<Vec<u8>, FromHexError> {
    let trimmed = hex.strip_prefix("0x").unwrap_or(hex);
    hex::decode(trimmed)
}

fn decode_fixed<const N: usize>(hex: &str) -> Result<[u8; N], HexParseError> {
    let bytes = decode_hex(hex)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| HexParseError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        })
}

/// Parses a `0x` prefixed (or bare) 32-byte hex string.
pub fn parse_h256(hex: &str) -> Result<H256, HexParseError> {
    decode_fixed::<32>(hex).map(H256)
}

/// Parses a `0x` prefixed (or bare) 20-byte hex string.
pub fn parse_address(hex: &str) -> Result<Address, HexParseError> {
    decode_fixed::<20>(hex).map(Address::from)
}
