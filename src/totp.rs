use std::fmt;

use zeroize::Zeroizing;

use crate::{seed::RawSecret, Otp, OtpCode, OtpError};

/// Length of a time step in seconds
pub const DEFAULT_PERIOD: u64 = 30;
/// Digits in a generated code
pub const DEFAULT_DIGITS: u32 = 6;

/// Seconds left in the `period` long window containing `seconds_since_epoch`
pub fn remaining_seconds(seconds_since_epoch: u64, period: u64) -> u64 {
    let period = period.max(1);
    period - seconds_since_epoch % period
}

#[derive(Clone)]
pub struct Totp {
    secret: Zeroizing<Vec<u8>>,
    period: u64,
    digits: u32,
}

impl Otp for Totp {
    fn secret(&self) -> &[u8] {
        self.secret.as_slice()
    }

    fn digits(&self) -> u32 {
        self.digits
    }
}

impl fmt::Debug for Totp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Totp")
            .field("period", &self.period)
            .field("digits", &self.digits)
            .finish_non_exhaustive()
    }
}

impl Totp {
    /// Creates the config for the [Time-based One-time Password Algorithm](http://en.wikipedia.org/wiki/Time-based_One-time_Password_Algorithm)
    /// (TOTP) given the raw HMAC key bytes.
    ///
    /// Obs.: This method defaults to the SHA1 hash, a 6-digit code and a period of 30 seconds
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: Zeroizing::new(secret.to_vec()),
            period: DEFAULT_PERIOD,
            digits: DEFAULT_DIGITS,
        }
    }

    /// Creates a TOTP keyed with a decrypted 32 byte secret
    pub fn from_raw_secret(secret: &RawSecret) -> Self {
        Self::new(secret.as_bytes())
    }

    ///  Sets the period in seconds, at least 1
    pub fn with_period(&mut self, period: u64) -> &mut Self {
        self.period = period.max(1);

        self
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.digits = digits;

        self
    }

    /// The time step counter for the given seconds since the UNIX epoch
    pub fn counter(&self, seconds_since_epoch: u64) -> u64 {
        seconds_since_epoch / self.period
    }

    /// Seconds left before the code valid at `seconds_since_epoch` changes
    pub fn remaining_seconds(&self, seconds_since_epoch: u64) -> u64 {
        remaining_seconds(seconds_since_epoch, self.period)
    }

    /// Generates a Totp from the provided seconds since the UNIX epoch
    /// truncated to the specified number of digits
    pub fn generate(&self, seconds_since_epoch: u64) -> Result<OtpCode, OtpError> {
        self.generate_for_counter(self.counter(seconds_since_epoch))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::{assert_eq, assert_ne};
    use rstest::{fixture, rstest};

    use crate::{seed::HexSeed, totp::Totp};

    #[fixture]
    #[once]
    pub fn rfc_secret() -> Vec<u8> {
        b"12345678901234567890".to_vec()
    }

    // RFC 6238 appendix B, SHA1 column
    #[rstest]
    #[case(59, "94287082")]
    #[case(1111111109, "07081804")]
    #[case(1111111111, "14050471")]
    #[case(1234567890, "89005924")]
    #[case(2000000000, "69279037")]
    #[case(20000000000, "65353130")]
    #[case(59, "287082")]
    #[case(1111111109, "081804")]
    #[case(1111111111, "050471")]
    #[case(1234567890, "005924")]
    #[case(2000000000, "279037")]
    #[case(20000000000, "353130")]
    fn totp_test(rfc_secret: &Vec<u8>, #[case] timestamp: u64, #[case] expected: &str) {
        let mut totp_base = Totp::new(rfc_secret);
        totp_base.with_digits(expected.len() as u32);

        let generated_otp = totp_base.generate(timestamp).unwrap();
        assert_eq!(expected, generated_otp.to_string());
    }

    #[rstest]
    #[case(0, 0)]
    #[case(29, 0)]
    #[case(30, 1)]
    #[case(59, 1)]
    #[case(60, 2)]
    #[case(1111111109, 37037036)]
    #[case(u64::MAX, u64::MAX / 30)]
    fn counter_is_floor_of_time_step(#[case] timestamp: u64, #[case] expected: u64) {
        assert_eq!(Totp::new(b"k").counter(timestamp), expected);
    }

    #[rstest]
    #[case(0, 29)]
    #[case(30, 59)]
    #[case(1111111080, 1111111109)]
    fn same_window_same_code(rfc_secret: &Vec<u8>, #[case] start: u64, #[case] end: u64) {
        let totp = Totp::new(rfc_secret);

        let first = totp.generate(start).unwrap();
        for timestamp in start..=end {
            assert_eq!(first, totp.generate(timestamp).unwrap());
        }
    }

    #[rstest]
    fn adjacent_windows_differ_at_boundary(rfc_secret: &Vec<u8>) {
        let totp = Totp::new(rfc_secret);

        assert_eq!(totp.counter(30) - totp.counter(29), 1);
        assert_ne!(totp.generate(29).unwrap(), totp.generate(30).unwrap());
    }

    #[rstest]
    #[case(0, 30)]
    #[case(1, 29)]
    #[case(29, 1)]
    #[case(30, 30)]
    #[case(1111111109, 1)]
    fn remaining_seconds_in_window(#[case] timestamp: u64, #[case] expected: u64) {
        assert_eq!(Totp::new(b"k").remaining_seconds(timestamp), expected);
    }

    #[test]
    fn zero_period_is_clamped() {
        let mut totp = Totp::new(b"k");
        totp.with_period(0);

        assert_eq!(totp.counter(42), 42);
    }

    #[test]
    fn raw_secret_matches_plain_bytes() {
        let seed = HexSeed::parse(&"ab".repeat(32)).unwrap();
        let secret = seed.decode().unwrap();

        assert_eq!(
            Totp::from_raw_secret(&secret).generate(1234567890).unwrap(),
            Totp::new(&[0xab; 32]).generate(1234567890).unwrap()
        );
    }

    #[test]
    fn debug_output_hides_secret() {
        assert_eq!(
            format!("{:?}", Totp::new(b"k")),
            "Totp { period: 30, digits: 6, .. }"
        );
    }
}
