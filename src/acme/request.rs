//! Typed decoding of the `revoke-cert` payload.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Number, Value};

use crate::pki::PresentedCertificate;

use super::errors::AcmeError;

/// Supported revocation reasons. Only `unspecified` (code 0) is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevocationReason {
    #[default]
    Unspecified,
}

impl RevocationReason {
    pub fn from_code(code: i64) -> Result<Self, AcmeError> {
        match code {
            0 => Ok(RevocationReason::Unspecified),
            other => Err(Self::unsupported(other)),
        }
    }

    fn unsupported(got: impl fmt::Display) -> AcmeError {
        AcmeError::BadRevocationReason(format!(
            "revocation reasons are not supported (got {got}; expected omitted or 0/unspecified)"
        ))
    }

    pub fn code(self) -> i64 {
        match self {
            RevocationReason::Unspecified => 0,
        }
    }
}

/// A validated revocation request.
#[derive(Debug, Clone)]
pub struct RevocationRequest {
    pub certificate: PresentedCertificate,
    pub reason: RevocationReason,
}

impl RevocationRequest {
    /// Decodes the JSON payload of a revocation request.
    pub fn from_payload(payload: &Value) -> Result<Self, AcmeError> {
        let Some(fields) = payload.as_object() else {
            return Err(AcmeError::malformed(format!(
                "invalid type ({}; expected object) for revocation request",
                json_type(payload)
            )));
        };

        let certificate = decode_certificate(fields)?;
        let reason = match fields.get("reason") {
            Some(raw) => decode_reason(raw)?,
            None => RevocationReason::default(),
        };

        Ok(Self {
            certificate,
            reason,
        })
    }
}

impl TryFrom<Value> for RevocationRequest {
    type Error = AcmeError;

    fn try_from(payload: Value) -> Result<Self, Self::Error> {
        Self::from_payload(&payload)
    }
}

fn decode_certificate(fields: &Map<String, Value>) -> Result<PresentedCertificate, AcmeError> {
    let Some(raw) = fields.get("certificate") else {
        return Err(AcmeError::malformed(
            "bad request was lacking required field 'certificate'",
        ));
    };
    let Some(encoded) = raw.as_str() else {
        return Err(AcmeError::malformed(format!(
            "invalid type ({}; expected string) for field 'certificate'",
            json_type(raw)
        )));
    };

    let der = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| AcmeError::malformed(format!("failed to base64 decode certificate: {e}")))?;

    PresentedCertificate::from_der(der)
        .map_err(|e| AcmeError::malformed(format!("failed to parse certificate: {e}")))
}

fn decode_reason(raw: &Value) -> Result<RevocationReason, AcmeError> {
    let Value::Number(number) = raw else {
        return Err(AcmeError::malformed(format!(
            "invalid type ({}; expected number) for field 'reason'",
            json_type(raw)
        )));
    };

    truncated_code(number)
        .and_then(|code| RevocationReason::from_code(code).ok())
        .ok_or_else(|| RevocationReason::unsupported(number))
}

/// Fractional codes are truncated toward zero. `None` when the value does
/// not fit an `i64`.
fn truncated_code(number: &Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .map(f64::trunc)
            .filter(|f| (i64::MIN as f64..i64::MAX as f64).contains(f))
            .map(|f| f as i64)
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
