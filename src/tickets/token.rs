use rand::Rng;

pub const TOKEN_LENGTH: usize = 8;
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Public tracking token: 8 characters drawn uniformly from [A-Z0-9].
/// Pure draw; uniqueness is the store's unique constraint, callers
/// retry on collision.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Canonical form for lookups: tokens are stored uppercase, so search
/// is case-insensitive by normalizing the input.
pub fn normalize_token(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_eight_uppercase_alphanumerics() {
        for _ in 0..500 {
            let token = generate_token();
            assert_eq!(token.len(), TOKEN_LENGTH);
            assert!(token
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn tokens_vary_between_draws() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            seen.insert(generate_token());
        }
        // 36^8 combinations; 100 draws colliding would mean a broken rng.
        assert!(seen.len() > 90);
    }

    #[test]
    fn normalization_uppercases_and_trims() {
        assert_eq!(normalize_token(" ab12cd34 "), "AB12CD34");
        assert_eq!(normalize_token("XY99ZZ00"), "XY99ZZ00");
    }
}
