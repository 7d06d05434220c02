//! Encryption of the TOTP secret at rest.
//!
//! - **Key-encryption key**: SHA-256 over a domain label and the application
//!   passphrase, so the same passphrase always reopens the same files
//! - **Encryption**: AES-256-GCM with a random 96-bit nonce per key file
//! - **Associated data**: the key file header (magic and version)

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::{
    keystore::{EncryptedKeyBlob, NONCE_LEN},
    seed::RawSecret,
    OtpError,
};

/// Passphrase used when none is configured
pub const DEFAULT_PASSPHRASE: &str = "ft_otp built-in application key";

const KEK_DOMAIN: &[u8] = b"ftotp/kek/v1";
const KEK_LEN: usize = 32;

/// Seals and opens [`RawSecret`]s with a fixed key-encryption key.
pub struct KeyCipher {
    kek: Zeroizing<[u8; KEK_LEN]>,
}

impl Default for KeyCipher {
    fn default() -> Self {
        Self::from_passphrase(DEFAULT_PASSPHRASE)
    }
}

impl KeyCipher {
    /// Derives the key-encryption key from `passphrase`.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::new()
            .chain_update(KEK_DOMAIN)
            .chain_update([0u8])
            .chain_update(passphrase.as_bytes())
            .finalize();

        let mut kek = Zeroizing::new([0u8; KEK_LEN]);
        kek.copy_from_slice(&digest);
        Self { kek }
    }

    pub fn from_key(kek: [u8; KEK_LEN]) -> Self {
        Self {
            kek: Zeroizing::new(kek),
        }
    }

    fn aead(&self) -> Result<Aes256Gcm, OtpError> {
        Aes256Gcm::new_from_slice(self.kek.as_slice()).map_err(|_| OtpError::EncryptionFailed)
    }

    /// Encrypts the secret under a fresh random nonce.
    pub fn encrypt(&self, secret: &RawSecret) -> Result<EncryptedKeyBlob, OtpError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let header = EncryptedKeyBlob::header();
        let ciphertext = self
            .aead()?
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: secret.as_bytes(),
                    aad: &header,
                },
            )
            .map_err(|_| OtpError::EncryptionFailed)?;

        debug!("secret sealed with AES-256-GCM");
        EncryptedKeyBlob::from_parts(nonce, ciphertext)
    }

    /// Decrypts the blob, failing closed on any authentication mismatch.
    pub fn decrypt(&self, blob: &EncryptedKeyBlob) -> Result<RawSecret, OtpError> {
        let header = EncryptedKeyBlob::header();
        let plaintext = Zeroizing::new(
            self.aead()
                .map_err(|_| OtpError::DecryptionFailed)?
                .decrypt(
                    Nonce::from_slice(blob.nonce()),
                    Payload {
                        msg: blob.ciphertext(),
                        aad: &header,
                    },
                )
                .map_err(|_| {
                    warn!("key file failed authentication");
                    OtpError::DecryptionFailed
                })?,
        );

        RawSecret::from_slice(&plaintext)
            .ok_or(OtpError::CorruptKeyFile("decrypted secret has the wrong length"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::{assert_eq, assert_ne};
    use rstest::{fixture, rstest};

    use crate::{
        cipher::KeyCipher,
        keystore::{EncryptedKeyBlob, BLOB_LEN},
        seed::{HexSeed, RawSecret},
        OtpError,
    };

    #[fixture]
    fn secret() -> RawSecret {
        HexSeed::parse("00112233445566778899aabbccddeeff0123456789abcdeffedcba9876543210")
            .unwrap()
            .decode()
            .unwrap()
    }

    #[rstest]
    #[case(RawSecret::from_bytes([0; 32]))]
    #[case(RawSecret::from_bytes([0xff; 32]))]
    #[case(secret())]
    fn round_trip(#[case] input: RawSecret) {
        let cipher = KeyCipher::default();

        let blob = cipher.encrypt(&input).unwrap();
        assert_eq!(cipher.decrypt(&blob).unwrap(), input);
    }

    #[rstest]
    fn ciphertext_hides_secret(secret: RawSecret) {
        let blob = KeyCipher::default().encrypt(&secret).unwrap();

        assert_ne!(&blob.ciphertext()[..32], secret.as_bytes());
    }

    #[rstest]
    fn each_encryption_uses_a_fresh_nonce(secret: RawSecret) {
        let cipher = KeyCipher::default();

        let first = cipher.encrypt(&secret).unwrap();
        let second = cipher.encrypt(&secret).unwrap();
        assert_ne!(first.nonce(), second.nonce());
        assert_ne!(first.ciphertext(), second.ciphertext());
    }

    #[rstest]
    fn any_flipped_byte_is_rejected(secret: RawSecret) {
        let cipher = KeyCipher::default();
        let bytes = cipher.encrypt(&secret).unwrap().to_bytes();
        assert_eq!(bytes.len(), BLOB_LEN);

        for index in 0..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[index] ^= 0x80;

            let result = EncryptedKeyBlob::from_bytes(&tampered)
                .and_then(|blob| cipher.decrypt(&blob));
            assert!(
                matches!(
                    result,
                    Err(OtpError::CorruptKeyFile(_)) | Err(OtpError::DecryptionFailed)
                ),
                "byte {index} was accepted after tampering"
            );
        }
    }

    #[rstest]
    fn wrong_passphrase_fails(secret: RawSecret) {
        let blob = KeyCipher::from_passphrase("correct").encrypt(&secret).unwrap();

        assert!(matches!(
            KeyCipher::from_passphrase("wrong").decrypt(&blob),
            Err(OtpError::DecryptionFailed)
        ));
    }

    #[rstest]
    fn passphrase_derivation_is_deterministic(secret: RawSecret) {
        let blob = KeyCipher::from_passphrase("hunter2").encrypt(&secret).unwrap();

        assert_eq!(
            KeyCipher::from_passphrase("hunter2").decrypt(&blob).unwrap(),
            secret
        );
    }

    #[test]
    fn block_cipher_is_wiped_on_drop() {
        fn zeroize_on_drop<T: zeroize::ZeroizeOnDrop>() {}

        zeroize_on_drop::<aes::Aes256>();
    }

    #[rstest]
    fn explicit_key_round_trip(secret: RawSecret) {
        let cipher = KeyCipher::from_key([0x42; 32]);

        let blob = cipher.encrypt(&secret).unwrap();
        assert_eq!(cipher.decrypt(&blob).unwrap(), secret);
        assert!(KeyCipher::default().decrypt(&blob).is_err());
    }
}
