//! Conversions from external infrastructure errors into domain errors.

use hubsync_domain::HubSyncError;
use native_tls::Error as TlsError;
use reqwest::Error as HttpError;
use tokio_postgres::error::SqlState;
use tokio_postgres::Error as PgError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub HubSyncError);

impl From<InfraError> for HubSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<HubSyncError> for InfraError {
    fn from(value: HubSyncError) -> Self {
        InfraError(value)
    }
}

/// Shorthand for `map_err` sites that go straight to the domain error.
pub fn into_domain<E>(err: E) -> HubSyncError
where
    InfraError: From<E>,
{
    InfraError::from(err).into()
}

trait IntoHubSyncError {
    fn into_hubsync(self) -> HubSyncError;
}

/* -------------------------------------------------------------------------- */
/* tokio_postgres::Error → HubSyncError */
/* -------------------------------------------------------------------------- */

impl IntoHubSyncError for PgError {
    fn into_hubsync(self) -> HubSyncError {
        if self.is_closed() {
            return HubSyncError::Database("postgres connection closed".into());
        }

        match self.code() {
            Some(code) if *code == SqlState::UNIQUE_VIOLATION => {
                HubSyncError::Database("unique constraint violation".into())
            }
            Some(code) if *code == SqlState::UNDEFINED_TABLE => {
                HubSyncError::Database("table missing; run migrations".into())
            }
            Some(code) => HubSyncError::Database(format!("postgres error {}: {self}", code.code())),
            None => HubSyncError::Database(self.to_string()),
        }
    }
}

impl From<PgError> for InfraError {
    fn from(value: PgError) -> Self {
        InfraError(value.into_hubsync())
    }
}

impl From<TlsError> for InfraError {
    fn from(value: TlsError) -> Self {
        InfraError(HubSyncError::Config(format!("TLS connector setup failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → HubSyncError */
/* -------------------------------------------------------------------------- */

impl IntoHubSyncError for HttpError {
    fn into_hubsync(self) -> HubSyncError {
        if self.is_timeout() {
            return HubSyncError::ProviderUnavailable("HTTP request timed out".into());
        }

        if self.is_connect() {
            return HubSyncError::ProviderUnavailable("HTTP connection failure".into());
        }

        if self.is_decode() {
            return HubSyncError::ProviderUnavailable(format!("unexpected response body: {self}"));
        }

        if let Some(status) = self.status() {
            return from_status(status.as_u16(), status.canonical_reason());
        }

        HubSyncError::ProviderUnavailable(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_hubsync())
    }
}

/// Generic status mapping for CRM calls. Token endpoints refine 400/401
/// themselves.
pub fn from_status(code: u16, reason: Option<&str>) -> HubSyncError {
    let message = format!("HTTP {} {}", code, reason.unwrap_or("unknown status"));

    match code {
        401 | 403 => HubSyncError::Refresh(message),
        429 | 500..=599 => HubSyncError::ProviderUnavailable(message),
        400..=499 => HubSyncError::InvalidInput(message),
        _ => HubSyncError::ProviderUnavailable(message),
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
