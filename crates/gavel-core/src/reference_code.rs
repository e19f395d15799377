//! Reference code generation
//!
//! Short human-usable codes stamped on tables and guest assignments, used for
//! spreadsheet row matching and physical check-in lookup. Codes are random;
//! scope uniqueness is enforced by the database unique indexes, with the
//! repositories retrying on collision up to [`MAX_REFERENCE_CODE_ATTEMPTS`]
//! before failing.

use rand::Rng;

/// Alphabet without lookalike characters (no 0/O, 1/I/L).
const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Length of generated reference codes.
pub const REFERENCE_CODE_LENGTH: usize = 8;

/// Upper bound on insert retries when a generated code collides with an
/// existing one in the same scope. Exceeding this fails the operation loudly
/// instead of looping.
pub const MAX_REFERENCE_CODE_ATTEMPTS: u32 = 5;

/// Generate a random reference code.
pub fn generate_reference_code() -> String {
    let mut rng = rand::rng();
    (0..REFERENCE_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_length() {
        assert_eq!(generate_reference_code().len(), REFERENCE_CODE_LENGTH);
    }

    #[test]
    fn test_code_uses_unambiguous_alphabet() {
        for _ in 0..100 {
            let code = generate_reference_code();
            for c in code.bytes() {
                assert!(
                    CODE_ALPHABET.contains(&c),
                    "unexpected character {:?} in reference code",
                    c as char
                );
            }
            assert!(!code.contains('0'));
            assert!(!code.contains('O'));
            assert!(!code.contains('I'));
            assert!(!code.contains('L'));
        }
    }

    #[test]
    fn test_codes_are_not_constant() {
        let codes: std::collections::HashSet<String> =
            (0..50).map(|_| generate_reference_code()).collect();
        assert!(codes.len() > 1);
    }
}
