use anyhow::Error;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::response::Debug;
use rocket::serde::json::Json;
use rocket::{catch, catchers, Catcher, Request, Responder};
use serde::Serialize;

pub(crate) type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug, Responder)]
pub(crate) enum HttpError {
    Internal(Debug<Error>),
    Rejected(Custom<Json<ErrorMessage>>),
}

impl HttpError {
    pub(crate) fn rejected(status: Status, message: impl Into<String>) -> Self {
        HttpError::Rejected(Custom(status, Json(ErrorMessage::new(message))))
    }

    pub(crate) fn not_found(what: &str) -> Self {
        Self::rejected(Status::NotFound, format!("{what} not found"))
    }

    pub(crate) fn forbidden() -> Self {
        Self::rejected(Status::Forbidden, "You are not allowed to do that")
    }

    pub(crate) fn unprocessable(message: impl Into<String>) -> Self {
        Self::rejected(Status::UnprocessableEntity, message)
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::rejected(Status::Conflict, message)
    }
}

impl From<Error> for HttpError {
    fn from(value: Error) -> Self {
        HttpError::Internal(Debug(value))
    }
}

impl From<sqlx::Error> for HttpError {
    fn from(value: sqlx::Error) -> Self {
        HttpError::Internal(Debug(value.into()))
    }
}

impl From<Status> for HttpError {
    fn from(value: Status) -> Self {
        HttpError::rejected(value, value.reason().unwrap_or("Request failed"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ErrorMessage {
    pub(crate) message: String,
}

impl ErrorMessage {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub(crate) fn api_catchers() -> Vec<Catcher> {
    catchers![api_error]
}

#[catch(default)]
fn api_error(status: Status, _request: &Request<'_>) -> Custom<Json<ErrorMessage>> {
    let message = match status.code {
        401 => "Please join an event or log in first",
        403 => "You are not allowed to do that",
        _ => status.reason().unwrap_or("Something went wrong"),
    };
    Custom(status, Json(ErrorMessage::new(message)))
}
