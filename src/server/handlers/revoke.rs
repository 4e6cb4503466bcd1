use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use tracing::{debug, instrument};

use crate::acme::{AcmeError, AcmeState, RevocationRequest};
use crate::server::{AppState, JwsVerifier};
use crate::storage::Storage;

/// `POST /acme/revoke-cert`. Answers `200 OK` with an empty body on success.
#[instrument(skip_all)]
pub async fn revoke_cert<S, A, V>(
    State(state): State<AppState<S, A, V>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AcmeError>
where
    S: Storage,
    A: AcmeState,
    V: JwsVerifier,
{
    let verified = state.verifier.verify(&headers, &body).await?;
    let request = RevocationRequest::try_from(verified.payload)?;

    let response = state.revocation.revoke(&verified.identity, &request).await?;
    debug!(serial = %response.serial_number, "Revocation request completed");
    Ok(StatusCode::OK)
}
