//! Key file persistence.
//!
//! A key file is a fixed 65 byte record:
//!
//! | offset | len | field                          |
//! |--------|-----|--------------------------------|
//! | 0      | 4   | magic `FTOK`                   |
//! | 4      | 1   | format version                 |
//! | 5      | 12  | AES-GCM nonce                  |
//! | 17     | 48  | ciphertext and 16 byte GCM tag |

use std::{
    fs::{File, OpenOptions},
    io::{Read, Write},
    path::Path,
};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{seed::SECRET_LEN, OtpError};

pub const MAGIC: &[u8; 4] = b"FTOK";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_LEN: usize = MAGIC.len() + 1;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const CIPHERTEXT_LEN: usize = SECRET_LEN + TAG_LEN;
pub const BLOB_LEN: usize = HEADER_LEN + NONCE_LEN + CIPHERTEXT_LEN;

/// The encrypted secret together with the nonce needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedKeyBlob {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedKeyBlob {
    pub(crate) fn from_parts(
        nonce: [u8; NONCE_LEN],
        ciphertext: Vec<u8>,
    ) -> Result<Self, OtpError> {
        if ciphertext.len() != CIPHERTEXT_LEN {
            return Err(OtpError::CorruptKeyFile("ciphertext has the wrong length"));
        }

        Ok(Self { nonce, ciphertext })
    }

    /// Magic and version, also bound into the AEAD tag
    pub fn header() -> [u8; HEADER_LEN] {
        let mut header = [0; HEADER_LEN];
        header[..MAGIC.len()].copy_from_slice(MAGIC);
        header[MAGIC.len()] = FORMAT_VERSION;
        header
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(BLOB_LEN);
        bytes.extend_from_slice(&Self::header());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Parses a key file, checking its length, magic and version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OtpError> {
        if bytes.len() != BLOB_LEN {
            return Err(OtpError::CorruptKeyFile("unexpected file length"));
        }

        let (header, rest) = bytes.split_at(HEADER_LEN);
        if &header[..MAGIC.len()] != MAGIC {
            return Err(OtpError::CorruptKeyFile("not an ft_otp key file"));
        }
        if header[MAGIC.len()] != FORMAT_VERSION {
            return Err(OtpError::CorruptKeyFile("unsupported key file version"));
        }

        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let nonce: [u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| OtpError::CorruptKeyFile("truncated nonce"))?;

        Self::from_parts(nonce, ciphertext.to_vec())
    }
}

/// Writes the blob to `path`, replacing any existing file.
///
/// The bytes go to a temporary file beside `path` which is synced and then
/// renamed over the destination, so an interrupted write never leaves a
/// partial key file behind.
pub fn save(blob: &EncryptedKeyBlob, path: &Path) -> Result<(), OtpError> {
    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Created with mode 0600 on unix and removed if dropped before persisting
    let mut temp_file = NamedTempFile::new_in(parent_dir)?;
    temp_file.write_all(&blob.to_bytes())?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|error| error.error)?;

    if let Ok(directory_handle) = OpenOptions::new().read(true).open(parent_dir) {
        let _ = directory_handle.sync_all();
    }

    debug!(path = %path.display(), "key file written");
    Ok(())
}

/// Reads and parses the key file at `path`.
pub fn load(path: &Path) -> Result<EncryptedKeyBlob, OtpError> {
    let file = File::open(path).map_err(|error| OtpError::from_io(error, path))?;

    let length = file.metadata()?.len();
    if length != BLOB_LEN as u64 {
        warn!(path = %path.display(), length, "rejecting key file with unexpected length");
        return Err(OtpError::CorruptKeyFile("unexpected file length"));
    }

    let mut bytes = Vec::with_capacity(BLOB_LEN);
    file.take(BLOB_LEN as u64 + 1).read_to_end(&mut bytes)?;

    let blob = EncryptedKeyBlob::from_bytes(&bytes).inspect_err(|error| {
        warn!(path = %path.display(), %error, "rejecting key file");
    })?;

    debug!(path = %path.display(), "key file loaded");
    Ok(blob)
}
