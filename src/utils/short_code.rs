use rand::{distr::Alphanumeric, rng, Rng};

/// Generates a random base62 (0-9, A-Z, a-z) short code of `length` characters
pub fn generate_short_code(length: usize) -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
