//! Payment reference generation

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Namespace prefix on every reference
pub const REFERENCE_PREFIX: &str = "PAY_";

/// Random characters after the prefix
pub const REFERENCE_RANDOM_LEN: usize = 16;

/// Generates an unguessable reference like `PAY_7QK2M9XB4TZC1RWD`
pub fn generate_reference() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERENCE_RANDOM_LEN)
        .map(char::from)
        .collect();

    format!("{}{}", REFERENCE_PREFIX, random.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reference_format() {
        let reference = generate_reference();
        assert!(reference.starts_with(REFERENCE_PREFIX));

        let random = &reference[REFERENCE_PREFIX.len()..];
        assert_eq!(random.len(), REFERENCE_RANDOM_LEN);
        assert!(random
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_references_are_unique() {
        let references: HashSet<String> = (0..1000).map(|_| generate_reference()).collect();
        assert_eq!(references.len(), 1000);
    }
}
