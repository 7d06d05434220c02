//! The two operations the command line drives: turning a seed into a key
//! file, and turning a key file into the current code.

use std::{fs::File, io::Read, path::Path};

use tracing::debug;
use zeroize::Zeroizing;

use crate::{
    cipher::KeyCipher,
    keystore::{self, EncryptedKeyBlob},
    seed::HexSeed,
    totp::Totp,
    OtpCode, OtpError,
};

/// Largest seed file read; a seed is 64 characters plus surrounding whitespace
pub const MAX_SEED_FILE_LEN: u64 = 4096;

/// Interprets `seed_or_path` as a literal hex seed, falling back to reading
/// it as a file whose trimmed contents are the seed.
pub fn resolve_seed(seed_or_path: &str) -> Result<HexSeed, OtpError> {
    match HexSeed::parse(seed_or_path) {
        Ok(seed) => {
            debug!("seed argument is a literal hex key");
            Ok(seed)
        }
        Err(OtpError::InvalidHexKey) => {
            let path = Path::new(seed_or_path);
            debug!(path = %path.display(), "reading hex key from file");

            let file = File::open(path).map_err(|error| OtpError::from_io(error, path))?;
            let mut contents = Zeroizing::new(Vec::with_capacity(MAX_SEED_FILE_LEN as usize + 1));
            file.take(MAX_SEED_FILE_LEN + 1).read_to_end(&mut contents)?;
            if contents.len() as u64 > MAX_SEED_FILE_LEN {
                return Err(OtpError::InvalidHexKey);
            }

            let text = std::str::from_utf8(&contents).map_err(|_| OtpError::InvalidHexKey)?;

            HexSeed::parse(text.trim())
        }
        Err(error) => Err(error),
    }
}

/// Validates the seed, encrypts it and writes the key file to `key_path`.
pub fn generate_key(
    seed_or_path: &str,
    key_path: &Path,
    cipher: &KeyCipher,
) -> Result<EncryptedKeyBlob, OtpError> {
    let blob = {
        let seed = resolve_seed(seed_or_path)?;
        let secret = seed.decode()?;
        cipher.encrypt(&secret)?
    };

    keystore::save(&blob, key_path)?;
    Ok(blob)
}

/// Loads and decrypts the key file, then generates the code for `now`.
pub fn generate_totp(key_path: &Path, now: u64, cipher: &KeyCipher) -> Result<OtpCode, OtpError> {
    let blob = keystore::load(key_path)?;
    let secret = cipher.decrypt(&blob)?;

    Totp::from_raw_secret(&secret).generate(now)
}
