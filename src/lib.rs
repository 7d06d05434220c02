pub mod cipher;
pub mod commands;
pub mod hotp;
pub mod keystore;
pub mod seed;
pub mod totp;

use std::{
    fmt::Display,
    io,
    path::{Path, PathBuf},
    time::{SystemTime, SystemTimeError, UNIX_EPOCH},
};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use zeroize::Zeroizing;

pub use cipher::KeyCipher;
pub use commands::{generate_key, generate_totp, resolve_seed};
pub use keystore::EncryptedKeyBlob;
pub use seed::{HexSeed, RawSecret};
pub use totp::Totp;

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("invalid hex key: key must be 64 hexadecimal characters")]
    InvalidHexKey,
    #[error("{}: no such file", .0.display())]
    NotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("corrupt key file: {0}")]
    CorruptKeyFile(&'static str),
    #[error("could not decrypt the key file: wrong passphrase or tampered data")]
    DecryptionFailed,
    #[error("could not encrypt the key")]
    EncryptionFailed,
    #[error("HMAC rejected the secret")]
    InvalidSecret,
    #[error("Invalid digest of {0} bytes")]
    InvalidDigest(usize),
    #[error("system clock is set before the UNIX epoch")]
    Clock(#[from] SystemTimeError),
}

impl OtpError {
    /// Maps a failed filesystem access on `path` to `NotFound` when the file
    /// is missing, keeping every other failure as `Io`.
    pub(crate) fn from_io(error: io::Error, path: &Path) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io(error),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OtpCode {
    code: u32,
    digits: u32,
}

impl OtpCode {
    pub fn integer(&self) -> u32 {
        self.code
    }
}

impl Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0padding$}",
            self.code,
            padding = (self.digits as usize)
        )
    }
}

/// Shared RFC 4226 machinery: HMAC-SHA1 over a big-endian counter followed
/// by dynamic truncation.
pub trait Otp {
    /// Raw HMAC key bytes
    fn secret(&self) -> &[u8];

    /// Number of decimal digits in a generated code
    fn digits(&self) -> u32;

    /// Calculates the HMAC-SHA1 digest of the counter, encoded as an
    /// 8-byte big-endian integer.
    fn calc_digest(&self, counter: u64) -> Result<Zeroizing<Vec<u8>>, OtpError> {
        let mut mac =
            Hmac::<Sha1>::new_from_slice(self.secret()).map_err(|_| OtpError::InvalidSecret)?;
        mac.update(&counter.to_be_bytes());

        Ok(Zeroizing::new(mac.finalize().into_bytes().to_vec()))
    }

    /// Encodes the HMAC digest into a truncated integer.
    fn encode_digest_truncated(digest: &[u8], target_digits_count: u32) -> Result<u32, OtpError> {
        // The low nibble of the last byte selects where the 4 code bytes start
        let offset = match digest.last() {
            Some(x) => *x & 0xf,
            None => return Err(OtpError::InvalidDigest(digest.len())),
        } as usize;

        let code_bytes: [u8; 4] = match digest
            .get(offset..offset + 4)
            .and_then(|bytes| bytes.try_into().ok())
        {
            Some(x) => x,
            None => return Err(OtpError::InvalidDigest(digest.len())),
        };

        let code = u32::from_be_bytes(code_bytes) & 0x7fffffff;

        // 10 digits or more cannot truncate a 31-bit value
        Ok(match 10u32.checked_pow(target_digits_count) {
            Some(truncation_factor) => code % truncation_factor,
            None => code,
        })
    }

    /// Runs HOTP for a single counter value.
    fn generate_for_counter(&self, counter: u64) -> Result<OtpCode, OtpError> {
        let digest = self.calc_digest(counter)?;
        let code = Self::encode_digest_truncated(digest.as_slice(), self.digits())?;

        Ok(OtpCode {
            code,
            digits: self.digits(),
        })
    }
}

/// Seconds elapsed since the UNIX epoch according to the local clock.
pub fn unix_seconds_now() -> Result<u64, OtpError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}
