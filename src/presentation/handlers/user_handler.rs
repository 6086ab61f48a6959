use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{error::RegistrationError, services::event_publisher::EventPublisher},
    usecase::register_user_usecase::RegisterUserUsecase,
};

pub const ACCEPTED_MESSAGE: &str = "User registration request is accepted.";

// Response

/// json for every response of the user router
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn reply(status: StatusCode, message: impl Into<String>) -> Response {
        let body = Self {
            message: message.into(),
        };
        (status, Json(body)).into_response()
    }
}

/* Router Function and Handler Function */

/// function return Router object
/// Suppose to be nested by main router
pub fn create_user_router<P: EventPublisher + 'static>(
    register_service: RegisterUserUsecase<P>,
) -> Router {
    let state = AppState {
        register_service: Arc::new(register_service),
    };

    Router::new()
        .route("/register", post(register::<P>))
        .with_state(state)
}

pub struct AppState<P: EventPublisher> {
    pub register_service: Arc<RegisterUserUsecase<P>>,
}

impl<P: EventPublisher> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            register_service: Arc::clone(&self.register_service),
        }
    }
}

// handler function

/// handler function for register
///
/// The body is read raw so that a missing or non-JSON body is rejected the same
/// way as an invalid registration.
async fn register<P: EventPublisher + 'static>(
    State(state): State<AppState<P>>,
    body: Bytes,
) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected registration request body");
            return MessageResponse::reply(
                StatusCode::BAD_REQUEST,
                "Request body must be a JSON object.",
            );
        }
    };

    match state.register_service.publish_registration(&raw).await {
        Ok(_) => MessageResponse::reply(StatusCode::ACCEPTED, ACCEPTED_MESSAGE),
        Err(RegistrationError::Validation(e)) => {
            MessageResponse::reply(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(RegistrationError::Publish(e)) => {
            tracing::error!(error = %e, "Failed to publish user registration request");
            MessageResponse::reply(StatusCode::BAD_GATEWAY, "Registration failed")
        }
    }
}
