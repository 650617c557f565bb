//! Authentication route handlers.
//!
//! Login, signup, logout, and the password-reset-by-email flow. Validation
//! failures re-render the form with the message inline and a 422, like the
//! rest of the form surface. Confirmation and reset mails are sent on a
//! spawned task; a failed send is logged, never a failed request.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::auth::set_current_user;
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error_message: Option<String>,
    pub email: String,
    pub logged_in: bool,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub error_message: Option<String>,
    pub email: String,
    pub logged_in: bool,
}

/// Reset-request page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub error_message: Option<String>,
    pub logged_in: bool,
}

/// New-password page template (behind the emailed link).
#[derive(Template, WebTemplate)]
#[template(path = "auth/new_password.html")]
pub struct NewPasswordTemplate {
    pub token: String,
    pub error_message: Option<String>,
    pub logged_in: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct NewPasswordForm {
    pub token: String,
    pub password: String,
}

/// Login page.
#[instrument]
pub async fn login_page() -> LoginTemplate {
    LoginTemplate {
        error_message: None,
        email: String::new(),
        logged_in: false,
    }
}

/// Login action.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            let current = CurrentUser {
                id: user.id,
                email: user.email,
            };
            set_current_user(&session, &current)
                .await
                .map_err(|e| AppError::Internal(format!("session write: {e}")))?;

            tracing::info!(user_id = %current.id, "user logged in");
            Ok(Redirect::to("/").into_response())
        }
        Err(err @ (AuthError::InvalidCredentials | AuthError::InvalidEmail(_))) => {
            Ok(login_error(form.email, err.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Signup page.
#[instrument]
pub async fn signup_page() -> SignupTemplate {
    SignupTemplate {
        error_message: None,
        email: String::new(),
        logged_in: false,
    }
}

/// Signup action.
#[instrument(skip(state, form))]
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    if form.password != form.confirm_password {
        return Ok(signup_error(form.email, "Passwords have to match".to_owned()));
    }

    match AuthService::new(state.pool())
        .register(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            // Best-effort confirmation mail; the account exists regardless.
            let email = state.email().clone();
            let to = user.email.to_string();
            tokio::spawn(async move {
                if let Err(e) = email.send_welcome(&to).await {
                    tracing::warn!(%to, error = %e, "failed to send signup confirmation");
                }
            });

            tracing::info!(user_id = %user.id, "user registered");
            Ok(Redirect::to("/login").into_response())
        }
        Err(
            err @ (AuthError::UserAlreadyExists
            | AuthError::WeakPassword(_)
            | AuthError::InvalidEmail(_)),
        ) => Ok(signup_error(form.email, err.to_string())),
        Err(err) => Err(err.into()),
    }
}

/// Logout action.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("session flush: {e}")))?;

    Ok(Redirect::to("/"))
}

/// Reset-request page.
#[instrument]
pub async fn reset_page() -> ResetTemplate {
    ResetTemplate {
        error_message: None,
        logged_in: false,
    }
}

/// Reset-request action: mint a token and email the link.
#[instrument(skip(state, form))]
pub async fn reset(
    State(state): State<AppState>,
    Form(form): Form<ResetForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .start_password_reset(&form.email)
        .await
    {
        Ok((user, token)) => {
            let reset_url = format!("{}/reset/{token}", state.config().base_url);
            let email = state.email().clone();
            let to = user.email.to_string();
            tokio::spawn(async move {
                if let Err(e) = email.send_password_reset(&to, &reset_url).await {
                    tracing::warn!(%to, error = %e, "failed to send password reset email");
                }
            });

            Ok(Redirect::to("/").into_response())
        }
        Err(err @ (AuthError::UserNotFound | AuthError::InvalidEmail(_))) => {
            let template = ResetTemplate {
                error_message: Some(err.to_string()),
                logged_in: false,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// New-password page, reached through the emailed link.
#[instrument(skip(state, token))]
pub async fn new_password_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response> {
    match AuthService::new(state.pool()).find_reset_user(&token).await {
        Ok(_user) => {
            let template = NewPasswordTemplate {
                token,
                error_message: None,
                logged_in: false,
            };
            Ok(template.into_response())
        }
        Err(AuthError::InvalidToken) => {
            let template = ResetTemplate {
                error_message: Some(AuthError::InvalidToken.to_string()),
                logged_in: false,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// Complete the reset with the new password.
#[instrument(skip(state, form))]
pub async fn new_password(
    State(state): State<AppState>,
    Form(form): Form<NewPasswordForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .reset_password(&form.token, &form.password)
        .await
    {
        Ok(()) => Ok(Redirect::to("/login").into_response()),
        Err(err @ AuthError::WeakPassword(_)) => {
            let template = NewPasswordTemplate {
                token: form.token,
                error_message: Some(err.to_string()),
                logged_in: false,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
        }
        Err(AuthError::InvalidToken) => {
            let template = ResetTemplate {
                error_message: Some(AuthError::InvalidToken.to_string()),
                logged_in: false,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, template).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

fn login_error(email: String, message: String) -> Response {
    let template = LoginTemplate {
        error_message: Some(message),
        email,
        logged_in: false,
    };
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

fn signup_error(email: String, message: String) -> Response {
    let template = SignupTemplate {
        error_message: Some(message),
        email,
        logged_in: false,
    };
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}
