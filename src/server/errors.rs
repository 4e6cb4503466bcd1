use axum::http::StatusCode;

use crate::acme::AcmeError;

const ACME_ERROR_PREFIX: &str = "urn:ietf:params:acme:error:";

// RFC 8555 section 6.7
mod problem {
    pub const MALFORMED: &str = "malformed";
    pub const BAD_REVOCATION_REASON: &str = "badRevocationReason";
    pub const ALREADY_REVOKED: &str = "alreadyRevoked";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const SERVER_INTERNAL: &str = "serverInternal";
}

/// Detail returned for server side failures, whose cause is only logged.
pub const INTERNAL_ERROR_DETAIL: &str = "The server experienced an internal error";

impl AcmeError {
    /// The full problem type URN of this error.
    pub fn problem_type(&self) -> String {
        use AcmeError::*;

        let suffix = match self {
            Malformed(_) => problem::MALFORMED,
            BadRevocationReason(_) => problem::BAD_REVOCATION_REASON,
            AlreadyRevoked(_) => problem::ALREADY_REVOKED,
            Unauthorized(_) => problem::UNAUTHORIZED,
            ServerInternal(_) => problem::SERVER_INTERNAL,
        };
        format!("{ACME_ERROR_PREFIX}{suffix}")
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AcmeError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AcmeError::ServerInternal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Detail safe to send to the client.
    pub fn public_detail(&self) -> String {
        match self {
            AcmeError::ServerInternal(_) => INTERNAL_ERROR_DETAIL.to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_mapping() {
        let cases = [
            (AcmeError::malformed("x"), "malformed", StatusCode::BAD_REQUEST),
            (
                AcmeError::BadRevocationReason("x".into()),
                "badRevocationReason",
                StatusCode::BAD_REQUEST,
            ),
            (
                AcmeError::AlreadyRevoked("x".into()),
                "alreadyRevoked",
                StatusCode::BAD_REQUEST,
            ),
            (
                AcmeError::Unauthorized("x".into()),
                "unauthorized",
                StatusCode::FORBIDDEN,
            ),
            (
                AcmeError::ServerInternal("x".into()),
                "serverInternal",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, suffix, status) in cases {
            assert_eq!(error.problem_type(), format!("urn:ietf:params:acme:error:{suffix}"));
            assert_eq!(error.status_code(), status);
        }
    }

    #[test]
    fn test_internal_detail_is_generic() {
        let error = AcmeError::ServerInternal("err reading global cert entry: redis down".into());
        assert_eq!(error.public_detail(), INTERNAL_ERROR_DETAIL);
        assert_eq!(AcmeError::malformed("bad").public_detail(), "bad");
    }
}
