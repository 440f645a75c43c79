use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use minichat_shared::clients::db::checkout;
use minichat_shared::errors::{AppError, AppResult, ErrorCode};
use minichat_shared::types::auth::{OAuthProvider, TokenPair};
use minichat_shared::types::ApiResponse;

use crate::models::{NewOAuthAccount, NewUser, OAuthAccount, User};
use crate::schema::{oauth_accounts, users};
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GoogleOAuthRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    #[serde(alias = "sub")]
    id: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
}

impl GoogleUserInfo {
    /// Normalised email, only when Google vouches for it. Accounts are matched by email.
    fn verified_email(&self) -> AppResult<String> {
        if !self.email_verified {
            return Err(AppError::new(ErrorCode::OAuthError, "google account email is not verified"));
        }
        Ok(auth_service::normalize_email(&self.email))
    }

    /// Google's display name, falling back to the email's local part.
    fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or(self.email.as_str()))
            .chars()
            .take(auth_service::MAX_NAME_LEN)
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct OAuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub is_new_user: bool,
}

pub async fn google_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleOAuthRequest>,
) -> AppResult<Json<ApiResponse<OAuthResponse>>> {
    // Exchange code for token
    let token_response = state
        .http_client
        .post("https://oauth2.googleapis.com/token")
        .form(&[
            ("code", req.code.as_str()),
            ("client_id", &state.config.google_client_id),
            ("client_secret", &state.config.google_client_secret),
            ("redirect_uri", &state.config.google_redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| AppError::new(ErrorCode::OAuthError, format!("google token exchange failed: {e}")))?;

    if !token_response.status().is_success() {
        let body = token_response.text().await.unwrap_or_default();
        return Err(AppError::new(ErrorCode::OAuthError, format!("google token error: {body}")));
    }

    let google_token: GoogleTokenResponse = token_response.json().await
        .map_err(|e| AppError::new(ErrorCode::OAuthError, format!("invalid token response: {e}")))?;

    let google_user: GoogleUserInfo = state
        .http_client
        .get("https://www.googleapis.com/oauth2/v3/userinfo")
        .bearer_auth(&google_token.access_token)
        .send()
        .await
        .map_err(|e| AppError::new(ErrorCode::OAuthError, format!("google userinfo failed: {e}")))?
        .json()
        .await
        .map_err(|e| AppError::new(ErrorCode::OAuthError, format!("invalid userinfo response: {e}")))?;

    let provider = OAuthProvider::Google.to_string();
    let mut conn = checkout(&state.db)?;

    let existing_oauth = oauth_accounts::table
        .filter(oauth_accounts::provider.eq(&provider))
        .filter(oauth_accounts::provider_uid.eq(&google_user.id))
        .first::<OAuthAccount>(&mut conn)
        .optional()?;

    let (user, is_new_user) = if let Some(account) = existing_oauth {
        let user: User = users::table.find(account.user_id).first(&mut conn)?;
        (user, false)
    } else {
        let email = google_user.verified_email()?;
        let existing_user = users::table
            .filter(users::email.eq(&email))
            .first::<User>(&mut conn)
            .optional()?;

        let is_new = existing_user.is_none();
        let user = match existing_user {
            Some(user) => user,
            None => diesel::insert_into(users::table)
                .values(&NewUser {
                    name: google_user.display_name(),
                    email,
                    password_hash: None,
                })
                .get_result::<User>(&mut conn)?,
        };

        diesel::insert_into(oauth_accounts::table)
            .values(&NewOAuthAccount {
                user_id: user.id,
                provider: provider.clone(),
                provider_uid: google_user.id.clone(),
            })
            .execute(&mut conn)?;

        (user, is_new)
    };

    let token_pair = token_service::issue_session(&mut conn, &user, &state.config)?;

    tracing::info!(user_id = %user.id, is_new = is_new_user, "google oauth login");

    Ok(Json(ApiResponse::ok(OAuthResponse {
        tokens: token_pair,
        is_new_user,
    })))
}
