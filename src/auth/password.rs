//! PBKDF2 password hashing.
//!
//! Hashes are encoded as `pbkdf2-sha256$<iterations>$<salt>$<hash>` with
//! base64 (standard, unpadded) salt and hash.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use rand::Rng;
use ring::{digest, pbkdf2};
use std::num::NonZeroU32;

use super::AuthError;

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const SCHEME: &str = "pbkdf2-sha256";
const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = digest::SHA256_OUTPUT_LEN;

/// Verified against when no account matches, so unknown emails cost a
/// full derivation like known ones.
pub(super) const UNKNOWN_USER_HASH: &str =
    "pbkdf2-sha256$100000$AAECAwQFBgcICQoLDA0ODw$vVgbYYOkjnD+tNuLVXMHkNxxTFoG/Xz1gOc3jTHBYJc";

/// Hashes `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let iterations = NonZeroU32::new(ITERATIONS).ok_or(AuthError::Hashing)?;

    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt);

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(ALGORITHM, iterations, &salt, password.as_bytes(), &mut hash);

    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        ITERATIONS,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Checks `password` against an encoded hash in constant time.
///
/// Malformed hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    if scheme != SCHEME {
        return false;
    }
    let Some(iterations) = iterations.parse::<u32>().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(hash)) else {
        return false;
    };

    pbkdf2::verify(ALGORITHM, iterations, &salt, password.as_bytes(), &hash).is_ok()
}
