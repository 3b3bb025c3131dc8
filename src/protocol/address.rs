//! Account identifiers
//!
//! Ledger addresses are a 32-byte public key rendered as 58 characters of
//! unpadded RFC 4648 base32 over `public_key || checksum`, where the checksum is
//! the last four bytes of SHA-512/256 of the key.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;

use super::error::MiddlewareError;

pub const PUBLIC_KEY_LENGTH: usize = 32;
const CHECKSUM_LENGTH: usize = 4;
const ENCODED_LENGTH: usize = 58;
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

// Domain separator for application escrow addresses
const APP_ID_PREFIX: &[u8] = b"appID";

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; PUBLIC_KEY_LENGTH]);

impl Address {
    /// The all-zero account, used as a sentinel where a reference is required but absent
    pub const ZERO: Address = Address([0u8; PUBLIC_KEY_LENGTH]);

    pub const fn new(public_key: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(public_key)
    }

    /// Build from a raw 32-byte slice (e.g. a field inside a box record)
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MiddlewareError> {
        let key: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            MiddlewareError::InvalidAddress(format!(
                "public key must be {} bytes, got {}",
                PUBLIC_KEY_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; PUBLIC_KEY_LENGTH]
    }

    /// Escrow account controlled by an application
    pub fn for_application(app_id: u64) -> Self {
        let mut hasher = Sha512_256::new();
        hasher.update(APP_ID_PREFIX);
        hasher.update(app_id.to_be_bytes());
        Self(hasher.finalize().into())
    }

    fn checksum(&self) -> [u8; CHECKSUM_LENGTH] {
        let digest = Sha512_256::digest(self.0);
        let mut out = [0u8; CHECKSUM_LENGTH];
        out.copy_from_slice(&digest[digest.len() - CHECKSUM_LENGTH..]);
        out
    }
}

impl FromStr for Address {
    type Err = MiddlewareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ENCODED_LENGTH {
            return Err(MiddlewareError::InvalidAddress(format!(
                "{}: expected {} characters, got {}",
                s,
                ENCODED_LENGTH,
                s.len()
            )));
        }

        let raw = base32_decode(s)
            .ok_or_else(|| MiddlewareError::InvalidAddress(format!("{}: not base32", s)))?;
        if raw.len() != PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH {
            return Err(MiddlewareError::InvalidAddress(format!(
                "{}: decoded to {} bytes",
                s,
                raw.len()
            )));
        }

        let address = Self::from_slice(&raw[..PUBLIC_KEY_LENGTH])?;
        if address.checksum()[..] != raw[PUBLIC_KEY_LENGTH..] {
            return Err(MiddlewareError::InvalidAddress(format!(
                "{}: checksum mismatch",
                s
            )));
        }
        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Vec::with_capacity(PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH);
        raw.extend_from_slice(&self.0);
        raw.extend_from_slice(&self.checksum());
        f.write_str(&base32_encode(&raw))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn base32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &b in bytes {
        buffer = (buffer << 8) | b as u32;
        bits += 8;
        while bits >= 5 {
            let idx = (buffer >> (bits - 5)) & 0x1f;
            out.push(BASE32_ALPHABET[idx as usize] as char);
            bits -= 5;
        }
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        let idx = (buffer << (5 - bits)) & 0x1f;
        out.push(BASE32_ALPHABET[idx as usize] as char);
    }
    out
}

fn base32_decode(s: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for c in s.bytes() {
        let value = BASE32_ALPHABET.iter().position(|&a| a == c)? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            out.push((buffer >> (bits - 8)) as u8);
            bits -= 8;
            buffer &= (1 << bits) - 1;
        }
    }

    // Leftover bits are padding and must be zero
    if buffer != 0 {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_ADDRESS: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";
    const BONFIRE: &str = "BNFIREKGRXEHCFOEQLTX3PU5SUCMRKDU7WHNBGZA4SXPW42OAHZBP7BPHY";

    #[test]
    fn test_zero_address_encoding() {
        assert_eq!(Address::ZERO.to_string(), ZERO_ADDRESS);
        let parsed: Address = ZERO_ADDRESS.parse().unwrap();
        assert!(parsed.is_zero());
    }

    #[test]
    fn test_parse_and_display_mainnet_address() {
        let addr: Address = BONFIRE.parse().unwrap();
        assert_eq!(addr.to_string(), BONFIRE);
        assert!(!addr.is_zero());
    }

    #[test]
    fn test_rejects_bad_checksum() {
        // Flip the last character
        let mut bad = BONFIRE.to_string();
        bad.pop();
        bad.push('A');
        let err = bad.parse::<Address>().unwrap_err();
        assert!(matches!(err, MiddlewareError::InvalidAddress(_)));
    }

    #[test]
    fn test_rejects_wrong_length_and_alphabet() {
        assert!("ABC".parse::<Address>().is_err());
        let lower = BONFIRE.to_lowercase();
        assert!(lower.parse::<Address>().is_err());
    }

    #[test]
    fn test_application_address_is_stable() {
        let a = Address::for_application(3158291365);
        let b = Address::for_application(3158291365);
        assert_eq!(a, b);
        assert_ne!(a, Address::for_application(1002541853));
    }

    #[test]
    fn test_serde_uses_string_form() {
        let addr: Address = BONFIRE.parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", BONFIRE));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
