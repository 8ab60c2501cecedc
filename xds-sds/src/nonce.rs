//! Response nonce generation.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Error, Result};

/// Number of random bytes in a nonce, before hex encoding.
pub const NONCE_BYTES: usize = 64;

/// Generate a fresh response nonce.
///
/// The nonce is [`NONCE_BYTES`] bytes drawn from the OS entropy source,
/// hex-encoded. Fails only if the entropy source is unavailable.
pub fn generate_nonce() -> Result<String> {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(Error::Nonce)?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_nonce_is_fixed_length_hex() {
        let nonce = generate_nonce().unwrap();
        assert_eq!(nonce.len(), NONCE_BYTES * 2);
        assert!(nonce
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_nonces_are_distinct() {
        let nonces: HashSet<String> = (0..1000).map(|_| generate_nonce().unwrap()).collect();
        assert_eq!(nonces.len(), 1000);
    }
}
