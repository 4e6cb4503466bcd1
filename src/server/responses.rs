use axum::{
    Json,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::acme::AcmeError;

const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// RFC 7807 problem document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub kind: String,
    pub detail: String,
    pub status: u16,
}

impl From<&AcmeError> for Problem {
    fn from(error: &AcmeError) -> Self {
        Self {
            kind: error.problem_type(),
            detail: error.public_detail(),
            status: error.status_code().as_u16(),
        }
    }
}

impl IntoResponse for AcmeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [(CONTENT_TYPE, PROBLEM_CONTENT_TYPE)],
            Json(Problem::from(&self)),
        )
            .into_response()
    }
}
