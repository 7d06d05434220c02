use std::{fmt, str::FromStr};

use data_encoding::HEXLOWER;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::OtpError;

/// Characters in a hexadecimal seed
pub const SEED_HEX_LEN: usize = 64;
/// Bytes in a decoded secret
pub const SECRET_LEN: usize = SEED_HEX_LEN / 2;

/// A validated seed of exactly 64 hexadecimal characters, held in lowercase.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct HexSeed(String);

impl HexSeed {
    /// Validates `input` as a 64 character hexadecimal seed.
    ///
    /// Upper and lower case digits are both accepted; the stored form is lowercase.
    pub fn parse(input: &str) -> Result<Self, OtpError> {
        if input.len() != SEED_HEX_LEN || !input.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(OtpError::InvalidHexKey);
        }

        Ok(Self(input.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the seed pairwise into the 32 secret bytes, in input order.
    pub fn decode(&self) -> Result<RawSecret, OtpError> {
        let mut secret = RawSecret([0; SECRET_LEN]);
        HEXLOWER
            .decode_mut(self.0.as_bytes(), &mut secret.0)
            .map_err(|_| OtpError::InvalidHexKey)?;

        Ok(secret)
    }
}

impl FromStr for HexSeed {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for HexSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HexSeed(..)")
    }
}

/// The 32 byte TOTP secret. Wiped from memory when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RawSecret([u8; SECRET_LEN]);

impl RawSecret {
    pub fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Copies `bytes` into a secret, or `None` if the length is not 32.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SECRET_LEN {
            return None;
        }

        let mut secret = Self([0; SECRET_LEN]);
        secret.0.copy_from_slice(bytes);
        Some(secret)
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }

    /// Lowercase hexadecimal form of the secret.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(HEXLOWER.encode(&self.0))
    }
}

impl PartialEq for RawSecret {
    // Constant time over the full length
    fn eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for RawSecret {}

impl fmt::Debug for RawSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawSecret(..)")
    }
}
