use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 20;

/// Returns `(raw_token, digest)`. The raw token goes into the reset email;
/// only the digest is persisted.
pub fn generate_token() -> (String, String) {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    let raw = hex::encode(buf);
    let digest = digest_token(&raw);
    (raw, digest)
}

/// SHA-256 hex digest of a raw reset token. Deliberately deterministic and
/// unsalted: the store looks accounts up by digest equality.
pub fn digest_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest_token("abc"), digest_token("abc"));
        assert_ne!(digest_token("abc"), digest_token("abd"));
    }

    #[test]
    fn generated_pair_is_consistent() {
        let (raw, digest) = generate_token();
        assert_eq!(raw.len(), TOKEN_BYTES * 2);
        assert_eq!(digest_token(&raw), digest);
    }

    #[test]
    fn tokens_are_random() {
        let (a, _) = generate_token();
        let (b, _) = generate_token();
        assert_ne!(a, b);
    }
}
