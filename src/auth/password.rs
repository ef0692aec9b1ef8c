use bcrypt::BcryptError;

pub use bcrypt::DEFAULT_COST;

/// Lowest work factor bcrypt accepts (mirrors bcrypt's private `MIN_COST`)
pub const MIN_COST: u32 = 4;

/// Hash a password with bcrypt at the given work factor
pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    bcrypt::hash(password, cost)
}

/// Check a password against a stored bcrypt hash; malformed hashes never verify
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_own_hash() {
        let hash = hash_password("s3cret", MIN_COST).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("S3cret", &hash));
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("same", MIN_COST).unwrap(), hash_password("same", MIN_COST).unwrap());
    }

    #[test]
    fn rejects_out_of_range_cost() {
        assert!(hash_password("pw", 3).is_err());
    }

    #[test]
    fn malformed_hashes_fail() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "md5$salt$abc"));
        assert!(!verify_password("x", "sha256$abcd$0123"));
    }
}
