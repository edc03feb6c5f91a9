//! Conversions from external infrastructure errors into domain errors.

use keyring::Error as KeyringError;
use rusqlite::Error as SqlError;
use unibridge_common::CommonError;
use unibridge_domain::{ActionType, AdapterKey, ProviderCallError, UnibridgeError};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub UnibridgeError);

impl From<InfraError> for UnibridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<UnibridgeError> for InfraError {
    fn from(value: UnibridgeError) -> Self {
        InfraError(value)
    }
}

trait IntoUnibridgeError {
    fn into_unibridge(self) -> UnibridgeError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → UnibridgeError */
/* -------------------------------------------------------------------------- */

impl IntoUnibridgeError for SqlError {
    fn into_unibridge(self) -> UnibridgeError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        UnibridgeError::Storage("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        UnibridgeError::Storage("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        UnibridgeError::Storage(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        UnibridgeError::Storage("foreign key constraint violation".into())
                    }
                    _ => UnibridgeError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => UnibridgeError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                UnibridgeError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                UnibridgeError::Storage(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => UnibridgeError::Storage(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => UnibridgeError::Storage(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_unibridge())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → UnibridgeError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(UnibridgeError::Storage(format!("connection pool: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → UnibridgeError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(UnibridgeError::Storage(format!("stored json is invalid: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → UnibridgeError */
/* -------------------------------------------------------------------------- */

impl IntoUnibridgeError for KeyringError {
    fn into_unibridge(self) -> UnibridgeError {
        use KeyringError::*;

        let description = self.to_string();

        match self {
            NoEntry => UnibridgeError::NotFound("keychain entry not found".into()),
            BadEncoding(_) => {
                UnibridgeError::Security("credential in keychain is not valid UTF-8".into())
            }
            PlatformFailure(err) => {
                UnibridgeError::Security(format!("keychain platform error: {err}"))
            }
            NoStorageAccess(err) => {
                UnibridgeError::Security(format!("unable to access secure storage: {err}"))
            }
            _ => UnibridgeError::Security(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_unibridge())
    }
}

/* -------------------------------------------------------------------------- */
/* CommonError → UnibridgeError */
/* -------------------------------------------------------------------------- */

impl IntoUnibridgeError for CommonError {
    fn into_unibridge(self) -> UnibridgeError {
        match self {
            CommonError::Crypto { .. }
            | CommonError::Validation { .. }
            | CommonError::Serialization { .. } => UnibridgeError::Security(self.to_string()),
            CommonError::Config { message } => UnibridgeError::Config(message),
            other => UnibridgeError::Internal(other.to_string()),
        }
    }
}

impl From<CommonError> for InfraError {
    fn from(value: CommonError) -> Self {
        InfraError(value.into_unibridge())
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → UnibridgeError */
/* -------------------------------------------------------------------------- */

impl From<tokio::task::JoinError> for InfraError {
    fn from(value: tokio::task::JoinError) -> Self {
        if value.is_cancelled() {
            InfraError(UnibridgeError::Internal("blocking task cancelled".into()))
        } else {
            InfraError(UnibridgeError::Internal(format!("blocking task failed: {value}")))
        }
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ProviderCallError */
/* -------------------------------------------------------------------------- */

/// Normalise a transport failure of a provider call.
///
/// Status errors are handled from the response body by the HTTP client; this
/// covers failures that never produced a usable response.
pub fn provider_call_error(
    key: AdapterKey,
    action: ActionType,
    err: &reqwest::Error,
) -> ProviderCallError {
    if err.is_timeout() {
        return ProviderCallError::timeout(key, action);
    }
    if let Some(status) = err.status() {
        return ProviderCallError::http(key, action, status.as_u16(), err.to_string());
    }
    if err.is_decode() {
        return ProviderCallError::decode(key, action, err.to_string());
    }
    if err.is_connect() {
        return ProviderCallError::network(key, action, format!("connection failure: {err}"));
    }
    ProviderCallError::network(key, action, err.to_string())
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::Client;
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use unibridge_domain::{ObjectType, Provider, ProviderFailure};

    use super::*;

    const KEY: AdapterKey = AdapterKey::new(Provider::Zendesk, ObjectType::Ticket);

    #[test]
    fn sqlite_busy_maps_to_storage_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: UnibridgeError = InfraError::from(err).into();
        match mapped {
            UnibridgeError::Storage(msg) => assert!(msg.contains("busy")),
            other => panic!("expected storage error, got {other:?}"),
        }
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let mapped: UnibridgeError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert!(matches!(mapped, UnibridgeError::NotFound(_)));
    }

    #[test]
    fn keyring_no_entry_maps_to_not_found() {
        let mapped: UnibridgeError = InfraError::from(KeyringError::NoEntry).into();
        match mapped {
            UnibridgeError::NotFound(msg) => assert!(msg.contains("keychain")),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn crypto_failures_are_security_errors() {
        let mapped: UnibridgeError = InfraError::from(CommonError::crypto("tampered")).into();
        assert!(matches!(mapped, UnibridgeError::Security(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let err = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped = provider_call_error(KEY, ActionType::Pull, &err);
        assert_eq!(mapped.failure, ProviderFailure::Network);
        assert!(mapped.is_transient());
    }
}
