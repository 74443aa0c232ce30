//! HTTP entry points for the verification flow.
//!
//! GET arrivals resume an existing session (usually a retry after a failed
//! code); POST arrivals carry the login form. Both reduce to a decision
//! outcome and are mapped to a redirect or a rendered prompt here.

use axum::{
    extract::{Extension, Query},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::api::state::VerifyState;
use crate::templates::VERIFY_TOTP_TEMPLATE;
use crate::totp::{self, TotpData};
use crate::verify::Outcome;

#[derive(Debug, Deserialize)]
pub struct ResumeParams {
    pub si: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub async fn verify_form(
    Query(params): Query<ResumeParams>,
    Extension(state): Extension<Arc<VerifyState>>,
) -> Response {
    match state.verifier().resume(params.si.as_deref()) {
        Ok(outcome) => respond(&state, outcome),
        Err(err) => {
            error!("TOTP check failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn verify_submit(
    Extension(state): Extension<Arc<VerifyState>>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match state
        .verifier()
        .submit(form.username.as_deref(), form.password.as_deref())
    {
        Ok(outcome) => respond(&state, outcome),
        Err(err) => {
            error!("TOTP check failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn respond(state: &VerifyState, outcome: Outcome) -> Response {
    match outcome {
        Outcome::RedirectError { session_key, .. } => {
            Redirect::to(&format!("/login?si={session_key}")).into_response()
        }
        Outcome::RedirectLockout { session_key } => {
            Redirect::to(&format!("/troubleshoot-totp?si={session_key}")).into_response()
        }
        Outcome::Render {
            session_key,
            err_msg,
            totp,
        } => render_verify_page(state, &session_key, err_msg.as_deref(), &totp),
    }
}

fn render_verify_page(
    state: &VerifyState,
    session_key: &str,
    err_msg: Option<&str>,
    totp: &TotpData,
) -> Response {
    // Demo aid: the page shows the code the authenticator is expected to
    // display. A production deployment must not expose this field.
    let correct_code = match totp::current_code(&totp.secret) {
        Ok(code) => code,
        Err(err) => {
            error!("Failed to compute expected TOTP code: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut model = json!({
        "key": session_key,
        "correctTotpCode": correct_code,
    });
    if let (Some(msg), Some(object)) = (err_msg, model.as_object_mut()) {
        object.insert("errMsg".to_string(), Value::String(msg.to_string()));
    }

    match state.templates().render(VERIFY_TOTP_TEMPLATE, &model) {
        Ok(body) => ([(CONTENT_TYPE, "text/html; charset=UTF-8")], body).into_response(),
        Err(err) => {
            // Fatal for the request. Redirecting on a broken template would
            // loop forever.
            error!("Template broken: {VERIFY_TOTP_TEMPLATE}: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
