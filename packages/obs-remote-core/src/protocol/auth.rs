//! Challenge-response digest for the authentication handshake.
//!
//! `secret = Base64(SHA256(password + salt))`,
//! `response = Base64(SHA256(secret + challenge))`.

use base64::Engine as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Reply to `GetAuthRequired`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthRequirement {
    pub auth_required: bool,
    pub salt: Option<String>,
    pub challenge: Option<String>,
}

fn sha256_base64(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(digest)
}

/// Derives the salted secret from the password.
pub fn auth_secret(password: &str, salt: &str) -> String {
    sha256_base64(&format!("{password}{salt}"))
}

/// Computes the value of the `auth` field for the `Authenticate` request.
pub fn auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let secret = auth_secret(password, salt);
    sha256_base64(&format!("{secret}{challenge}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "supersecret";
    const SALT: &str = "PZVbYpvAnZut2SS6JNJytDm9";
    const CHALLENGE: &str = "ztTBnnuqrqaKDzRM3xcVdbYm";

    #[test]
    fn secret_matches_known_vector() {
        assert_eq!(
            auth_secret(PASSWORD, SALT),
            "ui//BybDU5439I9ClYpHSMpcDnQdG7sGkEVfbrlHjoM="
        );
    }

    #[test]
    fn response_matches_known_vector() {
        assert_eq!(
            auth_response(PASSWORD, SALT, CHALLENGE),
            "8feeOF01ujNBiQFBqMMiEb6/yB/tJDZyX2sosCp5zLU="
        );
    }

    #[test]
    fn requirement_decodes_challenge() {
        let req: AuthRequirement = serde_json::from_str(
            r#"{"message-id":"0","status":"ok","authRequired":true,"salt":"s","challenge":"c"}"#,
        )
        .unwrap();
        assert!(req.auth_required);
        assert_eq!(req.salt.as_deref(), Some("s"));
        assert_eq!(req.challenge.as_deref(), Some("c"));
    }
}
