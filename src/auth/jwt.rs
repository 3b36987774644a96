// Bearer token verification

use crate::config::JwtSettings;
use crate::core::errors::EventSourceError;
use crate::core::event::Actor;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde_json::{Map, Value};

/// Identity established by a verified token, attached to request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub subject: Option<String>,
    pub claims: Map<String, Value>,
}

impl Principal {
    pub fn actor(&self) -> Actor {
        match self.subject {
            Some(ref subject) => Actor::user(subject.clone()),
            None => Actor::anonymous(),
        }
    }
}

/// Verifies bearer tokens against one key, audience and issuer.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Build a verifier from settings.
    ///
    /// A `secret_or_key` holding a PEM block is treated as an RSA or EC public
    /// key; anything else is an HMAC secret.
    pub fn new(settings: &JwtSettings) -> Result<Self, EventSourceError> {
        let secret = settings.secret_or_key.expose_secret();
        if secret.trim().is_empty() {
            return Err(EventSourceError::ConfigurationError(
                "JWT secret_or_key is empty".to_string(),
            ));
        }

        let (key, algorithms) = if secret.contains("-----BEGIN") {
            if let Ok(key) = DecodingKey::from_rsa_pem(secret.as_bytes()) {
                (
                    key,
                    vec![
                        Algorithm::RS256,
                        Algorithm::RS384,
                        Algorithm::RS512,
                        Algorithm::PS256,
                        Algorithm::PS384,
                        Algorithm::PS512,
                    ],
                )
            } else if let Ok(key) = DecodingKey::from_ec_pem(secret.as_bytes()) {
                (key, vec![Algorithm::ES256, Algorithm::ES384])
            } else {
                return Err(EventSourceError::ConfigurationError(
                    "JWT secret_or_key is not a valid RSA or EC public key".to_string(),
                ));
            }
        } else {
            (
                DecodingKey::from_secret(secret.as_bytes()),
                vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
            )
        };

        let mut validation = Validation::new(algorithms[0]);
        validation.algorithms = algorithms;
        validation.validate_exp = !settings.ignore_expiration;
        if settings.ignore_expiration {
            validation.required_spec_claims.clear();
        }

        // A configured audience or issuer must be present in the token, not
        // merely match when present.
        match settings.audience {
            Some(ref audience) => {
                validation.set_audience(&[audience]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            None => validation.validate_aud = false,
        }
        if let Some(ref issuer) = settings.issuer {
            validation.set_issuer(&[issuer]);
            validation.required_spec_claims.insert("iss".to_string());
        }

        Ok(Self { key, validation })
    }

    /// Whether expired tokens are rejected
    pub fn checks_expiration(&self) -> bool {
        self.validation.validate_exp
    }

    pub fn verify(&self, token: &str) -> Result<Principal, EventSourceError> {
        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation)
            .map_err(|e| EventSourceError::AuthenticationError(format!("Invalid token: {}", e)))?;

        let subject = data
            .claims
            .get("sub")
            .and_then(Value::as_str)
            .map(|s| s.to_string());

        Ok(Principal {
            subject,
            claims: data.claims,
        })
    }
}
