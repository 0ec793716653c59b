use pwhash::bcrypt;
use rand::Rng;

/// Unique-id attempts before giving up on a crowded prefix.
pub const MAX_ATTEMPTS: usize = 16;

pub fn generate_code(prefix: &str) -> String {
    format!("{prefix}-{}", four_digits())
}

pub fn generate_passcode() -> String {
    four_digits().to_string()
}

pub fn hash_passcode(passcode: &str) -> Result<String, String> {
    bcrypt::hash(passcode).map_err(|_| "HASHING_FAILED".to_string())
}

fn four_digits() -> u16 {
    rand::rng().random_range(1000..10000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn codes_carry_prefix_and_four_digits() {
        let shape = Regex::new(r"^T-[1-9]\d{3}$").unwrap();
        for _ in 0..50 {
            let code = generate_code("T");
            assert!(shape.is_match(&code), "{code}");
        }
    }

    #[test]
    fn passcodes_are_four_digits() {
        for _ in 0..50 {
            let passcode = generate_passcode();
            assert_eq!(passcode.len(), 4);
            assert!(passcode.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn hashed_passcode_verifies() {
        let hash = hash_passcode("4821").unwrap();
        assert_ne!(hash, "4821");
        assert!(bcrypt::verify("4821", &hash));
        assert!(!bcrypt::verify("4822", &hash));
    }
}
