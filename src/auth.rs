use std::time::Duration;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use password_hash::SaltString;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub token_type: TokenKind,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("hash password: {}", e)))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("parse password hash: {}", e)))?;
    let argon2 = Argon2::default();
    Ok(argon2.verify_password(password.as_bytes(), &parsed).is_ok())
}

fn signing_secret(settings: &Settings) -> Result<&[u8], AppError> {
    settings
        .secret_key
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .map(str::as_bytes)
        .ok_or_else(|| AppError::Internal("secret key is not configured".to_string()))
}

fn lifetime(kind: TokenKind, settings: &Settings) -> Duration {
    match kind {
        TokenKind::Access => settings.access_token_lifetime(),
        TokenKind::Refresh => settings.jwt.refresh_token_lifetime,
    }
}

pub fn create_token(user_id: &str, kind: TokenKind, settings: &Settings) -> Result<String, AppError> {
    let ttl = chrono::Duration::from_std(lifetime(kind, settings))
        .map_err(|e| AppError::Internal(format!("token lifetime: {}", e)))?;
    let exp = chrono::Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal("token expiry overflow".to_string()))?
        .timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp as usize,
        token_type: kind,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(signing_secret(settings)?),
    )
    .map_err(|e| AppError::Internal(format!("encode token: {}", e)))
}

pub fn create_token_pair(user_id: &str, settings: &Settings) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access: create_token(user_id, TokenKind::Access, settings)?,
        refresh: create_token(user_id, TokenKind::Refresh, settings)?,
    })
}

pub fn decode_token(token: &str, kind: TokenKind, settings: &Settings) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(signing_secret(settings)?),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;
    if data.claims.token_type != kind {
        return Err(AppError::Unauthorized);
    }
    Ok(data.claims)
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::collections::HashMap;
    use std::path::Path;

    fn settings_with_secret(secret: Option<&str>) -> Settings {
        let mut vars = HashMap::new();
        if let Some(secret) = secret {
            vars.insert("DJANGO_SECRET".to_string(), secret.to_string());
        }
        Settings::resolve(&vars, Path::new("."))
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn access_token_expires_after_configured_lifetime() {
        let settings = settings_with_secret(Some("test-secret"));
        let before = chrono::Utc::now().timestamp() as usize;
        let token = create_token("user-1", TokenKind::Access, &settings).unwrap();
        let claims = decode_token(&token, TokenKind::Access, &settings).unwrap();

        assert_eq!(claims.sub, "user-1");
        let thirty_days = 30 * 24 * 60 * 60;
        assert!(claims.exp >= before + thirty_days);
        assert!(claims.exp <= before + thirty_days + 5);
    }

    #[test]
    fn refresh_token_is_not_accepted_as_access() {
        let settings = settings_with_secret(Some("test-secret"));
        let pair = create_token_pair("user-1", &settings).unwrap();

        assert!(matches!(
            decode_token(&pair.refresh, TokenKind::Access, &settings),
            Err(AppError::Unauthorized)
        ));
        assert!(decode_token(&pair.refresh, TokenKind::Refresh, &settings).is_ok());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = settings_with_secret(Some("one"));
        let verifier = settings_with_secret(Some("two"));
        let token = create_token("user-1", TokenKind::Access, &issuer).unwrap();
        assert!(matches!(
            decode_token(&token, TokenKind::Access, &verifier),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn missing_secret_fails_at_signing_time() {
        let settings = settings_with_secret(None);
        assert!(matches!(
            create_token("user-1", TokenKind::Access, &settings),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers), Some("abc.def".to_string()));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), None);
    }
}
