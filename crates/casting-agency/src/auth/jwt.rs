//! Bearer token verification.
//!
//! Verifies access tokens issued by the configured identity issuer against
//! the keys in its JWKS.
//!
//! # Security
//!
//! - Tokens are size-checked before parsing
//! - Only the configured asymmetric algorithms are accepted
//! - `exp`, `aud` and `iss` are all required and validated

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, KeySource};
use crate::config::Config;
use crate::errors::{ApiError, AuthError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

/// Maximum accepted token size in bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

const MALFORMED_AUTHORIZATION: &str = "Authorization malformed.";

/// Extract the raw token from an `Authorization` header value.
///
/// The value must be exactly two space-separated parts, the first of which
/// is `bearer` in any case.
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let parts: Vec<&str> = header.split(' ').collect();

    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => Ok(*token),
        [_, _] => Err(AuthError::MalformedHeader(
            "Authorization header must start with \"bearer\".".to_string(),
        )),
        _ => Err(AuthError::MalformedHeader(
            "Authorization header must be in the format \"bearer token\".".to_string(),
        )),
    }
}

/// Verifies bearer tokens against keys from a [`KeySource`].
pub struct TokenVerifier {
    key_source: Arc<dyn KeySource>,
    algorithms: Vec<Algorithm>,
    audience: String,
    issuer: String,
}

impl TokenVerifier {
    pub fn new(
        key_source: Arc<dyn KeySource>,
        algorithms: Vec<Algorithm>,
        audience: String,
        issuer: String,
    ) -> Self {
        Self {
            key_source,
            algorithms,
            audience,
            issuer,
        }
    }

    /// Build a verifier for the issuer and audience in `config`.
    pub fn from_config(key_source: Arc<dyn KeySource>, config: &Config) -> Self {
        Self::new(
            key_source,
            config.algorithms.clone(),
            config.api_audience.clone(),
            config.issuer(),
        )
    }

    /// Verify `token` and return its claim set.
    ///
    /// # Errors
    ///
    /// - `AuthError::MalformedHeader` if the token header is unreadable or has no `kid`
    /// - `AuthError::UnknownKey` if no published key matches the `kid`
    /// - `AuthError::TokenExpired` if the signature is valid but `exp` has passed
    /// - `AuthError::InvalidClaims` for audience, issuer or missing claim failures
    /// - `AuthError::InvalidHeader` for every other decode or signature failure
    /// - `ApiError::Internal` if the key source is unavailable
    #[instrument(skip_all, name = "casting.auth.verify")]
    pub async fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(target: "casting.auth.jwt", size = token.len(), "Token rejected: exceeds size limit");
            return Err(AuthError::InvalidHeader.into());
        }

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(target: "casting.auth.jwt", error = %e, "Token header unreadable");
            AuthError::MalformedHeader(MALFORMED_AUTHORIZATION.to_string())
        })?;

        let kid = header
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| AuthError::MalformedHeader(MALFORMED_AUTHORIZATION.to_string()))?;

        if !self.algorithms.contains(&header.alg) {
            tracing::debug!(target: "casting.auth.jwt", alg = ?header.alg, "Token algorithm not accepted");
            return Err(AuthError::InvalidHeader.into());
        }

        let jwk = self
            .key_source
            .get_key(kid)
            .await?
            .ok_or(AuthError::UnknownKey)?;

        let decoding_key = decoding_key_for(&jwk, header.alg)?;

        // The allow-list was checked above. Validation must only name the
        // token's own algorithm: jsonwebtoken rejects a list that mixes key
        // families.
        let mut validation = Validation::new(header.alg);
        validation.algorithms = vec![header.alg];
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "casting.auth.jwt", error = %e, "Token verification failed");
            map_decode_error(e.kind())
        })?;

        tracing::debug!(target: "casting.auth.jwt", "Token validated successfully");
        Ok(token_data.claims)
    }
}

/// Build a decoding key from a JWK, checking it can verify `alg`.
fn decoding_key_for(jwk: &Jwk, alg: Algorithm) -> Result<DecodingKey, AuthError> {
    if let Some(jwk_alg) = &jwk.alg {
        if Algorithm::from_str(jwk_alg).ok() != Some(alg) {
            tracing::warn!(target: "casting.auth.jwt", jwk_alg = %jwk_alg, token_alg = ?alg, "JWK algorithm does not match token");
            return Err(AuthError::InvalidHeader);
        }
    }

    let key = match (jwk.kty.as_str(), alg) {
        ("RSA", Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512) => {
            match (&jwk.n, &jwk.e) {
                (Some(n), Some(e)) => DecodingKey::from_rsa_components(n, e),
                _ => {
                    tracing::warn!(target: "casting.auth.jwt", "RSA JWK missing n or e");
                    return Err(AuthError::InvalidHeader);
                }
            }
        }
        ("OKP", Algorithm::EdDSA) if jwk.crv.as_deref().unwrap_or("Ed25519") == "Ed25519" => {
            match &jwk.x {
                Some(x) => DecodingKey::from_ed_components(x),
                None => {
                    tracing::warn!(target: "casting.auth.jwt", "OKP JWK missing x");
                    return Err(AuthError::InvalidHeader);
                }
            }
        }
        (kty, _) => {
            tracing::warn!(target: "casting.auth.jwt", kty = %kty, token_alg = ?alg, "Unsupported JWK for token algorithm");
            return Err(AuthError::InvalidHeader);
        }
    };

    key.map_err(|e| {
        tracing::warn!(target: "casting.auth.jwt", error = %e, "Invalid JWK key material");
        AuthError::InvalidHeader
    })
}

fn map_decode_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::ImmatureSignature => AuthError::InvalidClaims,
        _ => AuthError::InvalidHeader,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::jwks::StaticKeySet;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use casting_test_utils::{TestKeypair, TestTokenBuilder, TEST_AUDIENCE, TEST_AUTH_DOMAIN};

    fn verifier_for(keys: &[&TestKeypair]) -> TokenVerifier {
        verifier_with(keys, vec![Algorithm::RS256, Algorithm::EdDSA])
    }

    fn verifier_with(keys: &[&TestKeypair], algorithms: Vec<Algorithm>) -> TokenVerifier {
        let jwks: Vec<Jwk> = keys
            .iter()
            .map(|k| serde_json::from_value(k.jwk_json()).unwrap())
            .collect();

        TokenVerifier::new(
            Arc::new(StaticKeySet::new(jwks)),
            algorithms,
            TEST_AUDIENCE.to_string(),
            format!("https://{}/", TEST_AUTH_DOMAIN),
        )
    }

    fn auth_error(result: Result<Claims, ApiError>) -> AuthError {
        match result {
            Err(ApiError::Auth(err)) => err,
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    // =========================================================================
    // extract_bearer_token
    // =========================================================================

    #[test]
    fn test_extract_bearer_token_valid() {
        assert_eq!(extract_bearer_token(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(extract_bearer_token(Some("bearer abc")).unwrap(), "abc");
        assert_eq!(extract_bearer_token(Some("BEARER abc")).unwrap(), "abc");
    }

    #[test]
    fn test_extract_bearer_token_missing() {
        assert_eq!(extract_bearer_token(None), Err(AuthError::MissingHeader));
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let err = extract_bearer_token(Some("Basic dXNlcjpwYXNz")).unwrap_err();
        assert!(matches!(err, AuthError::MalformedHeader(ref d) if d.contains("must start with")));
    }

    #[test]
    fn test_extract_bearer_token_wrong_part_count() {
        for value in ["Bearer", "Bearer a b", "Bearer  abc", "", "abc"] {
            let err = extract_bearer_token(Some(value)).unwrap_err();
            assert!(
                matches!(err, AuthError::MalformedHeader(ref d) if d.contains("bearer token")),
                "value {:?} gave {:?}",
                value,
                err
            );
        }
    }

    // =========================================================================
    // verify
    // =========================================================================

    #[tokio::test]
    async fn test_verify_valid_ed25519_token() {
        let key = TestKeypair::ed25519(1, "ed-1");
        let claims = TestTokenBuilder::new()
            .with_permissions(&["get:actors", "get:movies"])
            .build();

        let verified = verifier_for(&[&key])
            .verify(&key.sign_token(&claims))
            .await
            .unwrap();

        assert!(verified.has_permission("get:actors"));
        assert!(verified.has_permission("get:movies"));
        assert_eq!(verified.subject(), "auth0|test-subject");
    }

    #[tokio::test]
    async fn test_verify_valid_rsa_token() {
        let key = TestKeypair::rsa("rsa-1");
        let claims = TestTokenBuilder::new()
            .with_permissions(&["delete:actors"])
            .build();

        let verified = verifier_for(&[&key])
            .verify(&key.sign_token(&claims))
            .await
            .unwrap();

        assert!(verified.has_permission("delete:actors"));
    }

    #[tokio::test]
    async fn test_verify_selects_key_by_kid() {
        let a = TestKeypair::ed25519(1, "key-a");
        let b = TestKeypair::ed25519(2, "key-b");
        let claims = TestTokenBuilder::new().with_permissions(&[]).build();

        let verifier = verifier_for(&[&a, &b]);
        assert!(verifier.verify(&a.sign_token(&claims)).await.is_ok());
        assert!(verifier.verify(&b.sign_token(&claims)).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_expired_token() {
        let key = TestKeypair::ed25519(1, "ed-1");
        let claims = TestTokenBuilder::new().expires_in(-3600).build();

        let err = auth_error(verifier_for(&[&key]).verify(&key.sign_token(&claims)).await);
        assert_eq!(err, AuthError::TokenExpired);
    }

    #[tokio::test]
    async fn test_verify_wrong_audience() {
        let key = TestKeypair::ed25519(1, "ed-1");
        let claims = TestTokenBuilder::new().with_audience("other-api").build();

        let err = auth_error(verifier_for(&[&key]).verify(&key.sign_token(&claims)).await);
        assert_eq!(err, AuthError::InvalidClaims);
    }

    #[tokio::test]
    async fn test_verify_wrong_issuer() {
        let key = TestKeypair::ed25519(1, "ed-1");
        let claims = TestTokenBuilder::new()
            .with_issuer("https://evil.example.com/")
            .build();

        let err = auth_error(verifier_for(&[&key]).verify(&key.sign_token(&claims)).await);
        assert_eq!(err, AuthError::InvalidClaims);
    }

    #[tokio::test]
    async fn test_verify_missing_exp() {
        let key = TestKeypair::ed25519(1, "ed-1");
        let claims = TestTokenBuilder::new().without_expiry().build();

        let err = auth_error(verifier_for(&[&key]).verify(&key.sign_token(&claims)).await);
        assert_eq!(err, AuthError::InvalidClaims);
    }

    #[tokio::test]
    async fn test_verify_unknown_kid() {
        let published = TestKeypair::ed25519(1, "published");
        let stranger = TestKeypair::ed25519(2, "stranger");
        let claims = TestTokenBuilder::new().build();

        let err = auth_error(
            verifier_for(&[&published])
                .verify(&stranger.sign_token(&claims))
                .await,
        );
        assert_eq!(err, AuthError::UnknownKey);
    }

    #[tokio::test]
    async fn test_verify_missing_kid() {
        let key = TestKeypair::ed25519(1, "ed-1");
        let claims = TestTokenBuilder::new().build();

        let err = auth_error(
            verifier_for(&[&key])
                .verify(&key.sign_token_without_kid(&claims))
                .await,
        );
        assert_eq!(
            err,
            AuthError::MalformedHeader(MALFORMED_AUTHORIZATION.to_string())
        );
    }

    #[tokio::test]
    async fn test_verify_garbage_token() {
        let key = TestKeypair::ed25519(1, "ed-1");

        let err = auth_error(verifier_for(&[&key]).verify("not-a-jwt").await);
        assert!(matches!(err, AuthError::MalformedHeader(_)));
    }

    #[tokio::test]
    async fn test_verify_signature_from_wrong_key() {
        // Same kid as the published key, different private key
        let published = TestKeypair::ed25519(1, "shared-kid");
        let impostor = TestKeypair::ed25519(9, "shared-kid");
        let claims = TestTokenBuilder::new().build();

        let err = auth_error(
            verifier_for(&[&published])
                .verify(&impostor.sign_token(&claims))
                .await,
        );
        assert_eq!(err, AuthError::InvalidHeader);
    }

    #[tokio::test]
    async fn test_verify_tampered_payload() {
        let key = TestKeypair::ed25519(1, "ed-1");
        let token = key.sign_token(&TestTokenBuilder::new().build());
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = TestTokenBuilder::new()
            .with_permissions(&["delete:actors"])
            .build();
        let forged_payload = URL_SAFE_NO_PAD.encode(forged_claims.to_string());
        let forged = format!(
            "{}.{}.{}",
            parts.first().unwrap(),
            forged_payload,
            parts.get(2).unwrap()
        );

        let err = auth_error(verifier_for(&[&key]).verify(&forged).await);
        assert_eq!(err, AuthError::InvalidHeader);
    }

    #[tokio::test]
    async fn test_verify_algorithm_not_accepted() {
        let key = TestKeypair::ed25519(1, "ed-1");
        let jwk: Jwk = serde_json::from_value(key.jwk_json()).unwrap();
        let verifier = TokenVerifier::new(
            Arc::new(StaticKeySet::new(vec![jwk])),
            vec![Algorithm::RS256],
            TEST_AUDIENCE.to_string(),
            format!("https://{}/", TEST_AUTH_DOMAIN),
        );

        let err = auth_error(
            verifier
                .verify(&key.sign_token(&TestTokenBuilder::new().build()))
                .await,
        );
        assert_eq!(err, AuthError::InvalidHeader);
    }

    #[tokio::test]
    async fn test_verify_single_algorithm_allow_list() {
        let rsa = TestKeypair::rsa("rsa-1");
        let ed = TestKeypair::ed25519(1, "ed-1");
        let claims = TestTokenBuilder::new()
            .with_permissions(&["get:actors"])
            .build();

        let rs256_only = verifier_with(&[&rsa, &ed], vec![Algorithm::RS256]);
        let verified = rs256_only.verify(&rsa.sign_token(&claims)).await.unwrap();
        assert!(verified.has_permission("get:actors"));
        let err = auth_error(rs256_only.verify(&ed.sign_token(&claims)).await);
        assert_eq!(err, AuthError::InvalidHeader);

        let eddsa_only = verifier_with(&[&rsa, &ed], vec![Algorithm::EdDSA]);
        let verified = eddsa_only.verify(&ed.sign_token(&claims)).await.unwrap();
        assert!(verified.has_permission("get:actors"));
        let err = auth_error(eddsa_only.verify(&rsa.sign_token(&claims)).await);
        assert_eq!(err, AuthError::InvalidHeader);
    }

    #[tokio::test]
    async fn test_verify_mixed_family_allow_list_accepts_each_key_type() {
        let rsa = TestKeypair::rsa("rsa-1");
        let ed = TestKeypair::ed25519(1, "ed-1");
        let claims = TestTokenBuilder::new()
            .with_permissions(&["get:actors"])
            .build();

        for algorithms in [
            vec![Algorithm::RS256, Algorithm::EdDSA],
            vec![Algorithm::EdDSA, Algorithm::RS256],
            vec![Algorithm::RS256, Algorithm::RS384, Algorithm::EdDSA],
        ] {
            let verifier = verifier_with(&[&rsa, &ed], algorithms.clone());
            for key in [&rsa, &ed] {
                let result = verifier.verify(&key.sign_token(&claims)).await;
                assert!(
                    result.is_ok(),
                    "{:?} token rejected by {:?}: {:?}",
                    key.algorithm(),
                    algorithms,
                    result
                );
            }
        }
    }

    #[tokio::test]
    async fn test_verify_oversized_token() {
        let key = TestKeypair::ed25519(1, "ed-1");
        let huge = "a".repeat(MAX_JWT_SIZE_BYTES + 1);

        let err = auth_error(verifier_for(&[&key]).verify(&huge).await);
        assert_eq!(err, AuthError::InvalidHeader);
    }

    #[test]
    fn test_decoding_key_rejects_kty_alg_mismatch() {
        let ed: Jwk = serde_json::from_value(TestKeypair::ed25519(1, "ed").jwk_json()).unwrap();
        let rsa: Jwk = serde_json::from_value(TestKeypair::rsa("rsa").jwk_json()).unwrap();

        assert!(decoding_key_for(&ed, Algorithm::EdDSA).is_ok());
        assert!(decoding_key_for(&rsa, Algorithm::RS256).is_ok());
        assert_eq!(
            decoding_key_for(&rsa, Algorithm::EdDSA).err(),
            Some(AuthError::InvalidHeader)
        );
        assert_eq!(
            decoding_key_for(&ed, Algorithm::RS256).err(),
            Some(AuthError::InvalidHeader)
        );
    }

    #[test]
    fn test_decoding_key_requires_components() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            kid: Some("k".to_string()),
            n: None,
            e: Some("AQAB".to_string()),
            crv: None,
            x: None,
            alg: None,
            key_use: None,
        };
        assert_eq!(
            decoding_key_for(&jwk, Algorithm::RS256).err(),
            Some(AuthError::InvalidHeader)
        );
    }

    #[test]
    fn test_map_decode_error() {
        assert_eq!(
            map_decode_error(&ErrorKind::ExpiredSignature),
            AuthError::TokenExpired
        );
        assert_eq!(
            map_decode_error(&ErrorKind::InvalidAudience),
            AuthError::InvalidClaims
        );
        assert_eq!(
            map_decode_error(&ErrorKind::InvalidIssuer),
            AuthError::InvalidClaims
        );
        assert_eq!(
            map_decode_error(&ErrorKind::MissingRequiredClaim("exp".to_string())),
            AuthError::InvalidClaims
        );
        assert_eq!(
            map_decode_error(&ErrorKind::InvalidSignature),
            AuthError::InvalidHeader
        );
    }
}
