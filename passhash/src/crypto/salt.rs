//! Salt generation and the bcrypt base64 alphabet.
//! Salts come straight from the operating system RNG and are only ever
//! carried inside the hash string they were generated for.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

/// Raw salt size fed to the transform.
pub const SALT_BYTES: usize = 16;
/// Length of the encoded salt inside a hash record.
pub const ENCODED_SALT_LEN: usize = 22;

/// Base64 over `./A-Za-z0-9`, unpadded. Decoding tolerates non-zero trailing
/// bits because the 22nd character only carries two meaningful bits and
/// foreign hashes do not always clear the rest.
pub const BCRYPT_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::BCRYPT,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Fills a fresh salt from the OS CSPRNG.
pub fn generate() -> Result<Zeroizing<[u8; SALT_BYTES]>, rand::Error> {
    let mut salt = Zeroizing::new([0u8; SALT_BYTES]);
    let bytes: &mut [u8; SALT_BYTES] = &mut salt;
    OsRng.try_fill_bytes(bytes)?;
    Ok(salt)
}

/// Encodes raw salt bytes into the 22 characters the transform expects.
pub fn encode(salt: &[u8; SALT_BYTES]) -> String {
    let mut encoded = BCRYPT_B64.encode(salt);
    encoded.truncate(ENCODED_SALT_LEN);
    encoded
}

/// Decodes the first 22 characters of `encoded` back into raw salt bytes.
pub fn decode(encoded: &str) -> Option<[u8; SALT_BYTES]> {
    let chars = encoded.get(..ENCODED_SALT_LEN)?;
    let bytes = BCRYPT_B64.decode(chars).ok()?;
    bytes.try_into().ok()
}
