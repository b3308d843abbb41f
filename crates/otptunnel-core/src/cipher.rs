//! One-time pad transform.
//!
//! Encryption and decryption are the same byte-wise XOR combine, so both
//! directions share a single primitive. Stateless and deterministic given
//! the pad slice; allocates nothing beyond the output buffer.
//!
//! A length mismatch between input and pad slice is a fatal contract
//! violation, never coerced: zero-padding would leak plaintext structure
//! and silent truncation would misalign every later pad offset.

use crate::error::CipherError;

/// Byte-wise XOR of `input` with `pad_slice`.
///
/// Self-inverse: `combine(combine(p, k), k) == p` for equal-length slices.
///
/// # Errors
///
/// - [`CipherError::LengthMismatch`] if the slices differ in length
pub fn combine(input: &[u8], pad_slice: &[u8]) -> Result<Vec<u8>, CipherError> {
    if input.len() != pad_slice.len() {
        return Err(CipherError::LengthMismatch { input: input.len(), pad: pad_slice.len() });
    }

    Ok(input.iter().zip(pad_slice).map(|(a, b)| a ^ b).collect())
}

/// Encrypt `plaintext` with the pad slice it was reserved against.
///
/// # Errors
///
/// - [`CipherError::LengthMismatch`] if the slices differ in length
pub fn encrypt(plaintext: &[u8], pad_slice: &[u8]) -> Result<Vec<u8>, CipherError> {
    combine(plaintext, pad_slice)
}

/// Decrypt `ciphertext` with the pad slice at its declared offset.
///
/// # Errors
///
/// - [`CipherError::LengthMismatch`] if the slices differ in length
pub fn decrypt(ciphertext: &[u8], pad_slice: &[u8]) -> Result<Vec<u8>, CipherError> {
    combine(ciphertext, pad_slice)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn known_vector() {
        let plaintext = b"hi";
        let pad = [0x0F, 0xF0];
        let ciphertext = encrypt(plaintext, &pad).unwrap();
        assert_eq!(ciphertext, vec![b'h' ^ 0x0F, b'i' ^ 0xF0]);
        assert_eq!(decrypt(&ciphertext, &pad).unwrap(), plaintext);
    }

    #[test]
    fn zero_pad_is_identity() {
        let plaintext = b"there";
        let pad = [0u8; 5];
        assert_eq!(encrypt(plaintext, &pad).unwrap(), plaintext);
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(combine(&[], &[]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let result = combine(b"abc", b"ab");
        assert_eq!(result.unwrap_err(), CipherError::LengthMismatch { input: 3, pad: 2 });
    }

    proptest! {
        #[test]
        fn self_inverse(
            plaintext in prop::collection::vec(any::<u8>(), 0..256),
            seed in any::<u64>(),
        ) {
            // Derive a pad slice of matching length from the seed.
            let pad: Vec<u8> = (0..plaintext.len() as u64)
                .map(|i| (seed.wrapping_mul(i.wrapping_add(1)) >> 32) as u8)
                .collect();

            let ciphertext = encrypt(&plaintext, &pad).expect("lengths match");
            let recovered = decrypt(&ciphertext, &pad).expect("lengths match");
            prop_assert_eq!(recovered, plaintext);
        }
    }
}
