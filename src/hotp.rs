use std::fmt;

use zeroize::Zeroizing;

use crate::{Otp, OtpCode, OtpError};

/// One-shot HMAC-SHA1 one-time password over an explicit counter.
///
/// No counter state is kept between calls; the caller supplies the counter
/// every time.
#[derive(Clone)]
pub struct Hotp {
    secret: Zeroizing<Vec<u8>>,
    // How many digits to generate
    digits: u32,
}

impl Otp for Hotp {
    fn secret(&self) -> &[u8] {
        self.secret.as_slice()
    }

    fn digits(&self) -> u32 {
        self.digits
    }
}

impl fmt::Debug for Hotp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hotp")
            .field("digits", &self.digits)
            .finish_non_exhaustive()
    }
}

impl Hotp {
    /// Creates the config for the [HMAC-based One-time Password Algorithm](http://en.wikipedia.org/wiki/HMAC-based_One-time_Password_Algorithm)
    /// (HOTP) given the raw key bytes
    ///
    /// Obs.: This method defaults to a 6-digit code.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: Zeroizing::new(secret.to_vec()),
            digits: 6,
        }
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.digits = digits;

        self
    }

    /// Generates a HOTP from the provided counter
    /// truncated to the specified number of digits
    pub fn generate(&self, counter: u64) -> Result<OtpCode, OtpError> {
        self.generate_for_counter(counter)
    }
}
