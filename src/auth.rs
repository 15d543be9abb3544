//! ECDSA P-256 challenge/response signing for TCP(S) authentication
//! (component E).
//!
//! The TCP wire handshake sends the client an ASCII challenge line
//! terminated by `\n`; the client signs the challenge bytes (excluding the
//! trailing newline) with its ECDSA private key over SHA-256 and replies
//! with the signature, URL-safe base64 encoded, followed by `\n`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use p256::SecretKey;

use crate::error::{Error, Result};

/// Holds the client's ECDSA key material and signs authentication
/// challenges.
pub struct Signer {
    username: String,
    signing_key: SigningKey,
}

impl Signer {
    /// Builds a signer from a username and a base64-encoded PKCS#8 (or raw
    /// SEC1 scalar) private key, as configured via the `token` property.
    pub fn new(username: impl Into<String>, token_b64: &str) -> Result<Self> {
        let key_bytes = URL_SAFE_NO_PAD
            .decode(token_b64)
            .or_else(|_| base64::engine::general_purpose::STANDARD.decode(token_b64))
            .map_err(|e| Error::authentication(format!("invalid private key encoding: {e}")))?;

        let secret_key = SecretKey::from_slice(&key_bytes)
            .map_err(|e| Error::authentication(format!("invalid private key: {e}")))?;

        Ok(Self {
            username: username.into(),
            signing_key: SigningKey::from(secret_key),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Signs `challenge` (the raw challenge bytes, without the trailing
    /// newline the server sent) and returns the base64-encoded signature
    /// line to send back, including its trailing `\n`.
    pub fn sign_challenge(&self, challenge: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(challenge);
        let der = signature.to_der();
        let encoded = URL_SAFE_NO_PAD.encode(der.as_bytes());
        let mut out = encoded.into_bytes();
        out.push(b'\n');
        out
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("username", &self.username)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::elliptic_curve::rand_core::OsRng;

    fn test_signer() -> Signer {
        let secret = SecretKey::random(&mut OsRng);
        let token = URL_SAFE_NO_PAD.encode(secret.to_bytes());
        Signer::new("test-user", &token).unwrap()
    }

    #[test]
    fn signs_a_challenge_and_produces_a_trailing_newline() {
        let signer = test_signer();
        let reply = signer.sign_challenge(b"some-challenge-bytes");
        assert_eq!(*reply.last().unwrap(), b'\n');
        // the body before the newline must be valid base64
        let body = &reply[..reply.len() - 1];
        assert!(URL_SAFE_NO_PAD.decode(body).is_ok());
    }

    #[test]
    fn same_signer_verifies_its_own_signature() {
        use p256::ecdsa::signature::Verifier;

        let signer = test_signer();
        let challenge = b"challenge-to-sign";
        let reply = signer.sign_challenge(challenge);
        let der = URL_SAFE_NO_PAD.decode(&reply[..reply.len() - 1]).unwrap();
        let signature = Signature::from_der(&der).unwrap();
        let verifying_key = signer.signing_key.verifying_key();
        assert!(verifying_key.verify(challenge, &signature).is_ok());
    }

    #[test]
    fn malformed_key_is_rejected() {
        assert!(Signer::new("user", "not-a-valid-key").is_err());
    }

    #[test]
    fn username_is_retained() {
        let signer = test_signer();
        assert_eq!(signer.username(), "test-user");
    }
}
