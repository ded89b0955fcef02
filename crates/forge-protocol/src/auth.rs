use crate::{ProtocolError, Result};
use chrono::Utc;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Who this worker claims to be. Built fresh for every registration attempt
/// so the timestamp reflects the attempt, not process start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, verifying_key: &VerifyingKey) -> Self {
        Identity {
            name: name.into(),
            timestamp: Utc::now().timestamp_millis(),
            public_key: hex::encode(verifying_key.to_bytes()),
        }
    }

    /// The byte sequence the registration signature covers.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(ProtocolError::from)
    }
}

/// Registration payload: an identity plus a signature over its canonical
/// bytes, made with the worker's private key and checked by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthMessage {
    pub identity: Identity,
    /// Hex-encoded Ed25519 signature.
    pub signature: String,
}

impl AuthMessage {
    pub fn sign(identity: Identity, key: &SigningKey) -> Result<Self> {
        let signature = key.sign(&identity.canonical_bytes()?);
        Ok(AuthMessage {
            identity,
            signature: hex::encode(signature.to_bytes()),
        })
    }

    /// Check the signature against the embedded identity. This is what the
    /// coordinator runs on receipt.
    pub fn verify(&self) -> Result<()> {
        let key_bytes: [u8; 32] = hex::decode(&self.identity.public_key)?
            .try_into()
            .map_err(|_| ProtocolError::MalformedAuth("public key length".to_string()))?;
        let verifying_key = VerifyingKey::from_bytes(&key_bytes)?;

        let sig_bytes: [u8; 64] = hex::decode(&self.signature)?
            .try_into()
            .map_err(|_| ProtocolError::MalformedAuth("signature length".to_string()))?;
        let signature = Signature::from_bytes(&sig_bytes);

        verifying_key
            .verify(&self.identity.canonical_bytes()?, &signature)
            .map_err(ProtocolError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_sign_and_verify() {
        let key = SigningKey::generate(&mut OsRng);
        let identity = Identity::new("worker-test", &key.verifying_key());

        let auth = AuthMessage::sign(identity, &key).unwrap();
        auth.verify().unwrap();
    }

    #[test]
    fn test_tampered_identity_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let identity = Identity::new("worker-test", &key.verifying_key());

        let mut auth = AuthMessage::sign(identity, &key).unwrap();
        auth.identity.name = "impostor".to_string();

        assert!(auth.verify().is_err());
    }

    #[test]
    fn test_malformed_hex_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let identity = Identity::new("worker-test", &key.verifying_key());

        let mut auth = AuthMessage::sign(identity, &key).unwrap();
        auth.signature = "not hex".to_string();

        match auth.verify() {
            Err(ProtocolError::MalformedAuth(_)) => {}
            other => panic!("Expected MalformedAuth, got {other:?}"),
        }
    }
}
