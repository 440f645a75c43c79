use chrono::{DateTime, Duration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use sha2::{Digest, Sha256};

use minichat_shared::errors::{AppError, AppResult, ErrorCode};
use minichat_shared::middleware::jwt_secret;
use minichat_shared::types::auth::{Claims, TokenPair};

use crate::config::AppConfig;
use crate::models::{NewRefreshToken, RefreshToken, User};
use crate::schema::{refresh_tokens, users};

pub fn create_access_token(user: &User, secret: &str, ttl_secs: i64) -> Result<String, AppError> {
    let claims = Claims::new(user.id, &user.name, &user.email, ttl_secs);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}

pub fn create_refresh_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Returns the pair handed to the client and the hash of its refresh token.
pub fn create_token_pair(user: &User, secret: &str, access_ttl: i64) -> Result<(TokenPair, String), AppError> {
    let access_token = create_access_token(user, secret, access_ttl)?;
    let refresh_token = create_refresh_token();
    let refresh_hash = hash_token(&refresh_token);
    let pair = TokenPair::new(access_token, refresh_token, access_ttl);
    Ok((pair, refresh_hash))
}

/// Creates a token pair for `user` and stores its refresh token.
pub fn issue_session(
    conn: &mut PgConnection,
    user: &User,
    config: &AppConfig,
) -> AppResult<TokenPair> {
    let (token_pair, refresh_hash) = create_token_pair(user, &jwt_secret(), config.jwt_access_ttl)?;

    let new_rt = NewRefreshToken {
        user_id: user.id,
        token_hash: refresh_hash,
        expires_at: Utc::now() + Duration::seconds(config.jwt_refresh_ttl),
    };
    diesel::insert_into(refresh_tokens::table)
        .values(&new_rt)
        .execute(conn)?;

    Ok(token_pair)
}

fn revoked() -> AppError {
    AppError::new(ErrorCode::RefreshTokenRevoked, "invalid refresh token")
}

fn ensure_not_expired(token: &RefreshToken, now: DateTime<Utc>) -> AppResult<()> {
    if token.expires_at < now {
        return Err(AppError::new(ErrorCode::TokenExpired, "refresh token expired"));
    }
    Ok(())
}

/// Exactly one request may revoke a live token; the loser sees zero updated rows.
fn ensure_claimed(updated_rows: usize) -> AppResult<()> {
    match updated_rows {
        0 => Err(revoked()),
        _ => Ok(()),
    }
}

/// Single-use rotation: revokes the presented refresh token and issues a new
/// session in one transaction. Returns the owner and the new pair.
pub fn rotate_session(conn: &mut PgConnection, presented: &str, config: &AppConfig) -> AppResult<(User, TokenPair)> {
    let token_hash = hash_token(presented);

    conn.transaction::<_, AppError, _>(|conn| {
        let stored: RefreshToken = refresh_tokens::table
            .filter(refresh_tokens::token_hash.eq(&token_hash))
            .filter(refresh_tokens::revoked_at.is_null())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(revoked)?;

        ensure_not_expired(&stored, Utc::now())?;

        let claimed = diesel::update(
            refresh_tokens::table
                .filter(refresh_tokens::id.eq(stored.id))
                .filter(refresh_tokens::revoked_at.is_null()),
        )
        .set(refresh_tokens::revoked_at.eq(Some(Utc::now())))
        .execute(conn)?;
        ensure_claimed(claimed)?;

        let user: User = users::table
            .find(stored.user_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::InvalidCredentials, "user not found"))?;

        let token_pair = issue_session(conn, &user, config)?;
        Ok((user, token_pair))
    })
}
