//! Errors raised by the vendor clients behind each transport, and their
//! mapping onto [`AppError`].

use thiserror::Error;

use crate::error::AppError;

/// Failure reported by a transport collaborator.
///
/// `code` is the vendor error code when the client exposes one; `message` is
/// the raw text, which older clients use as the only carrier of the code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct VendorError {
    pub code: Option<String>,
    pub message: String,
}

impl VendorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidCredentials,
    InvalidSignature,
    AccessDenied,
}

/// (error code, message fragment) pairs. The fragments are matched verbatim
/// when the client reports no structured code.
const AUTH_FAILURES: &[(&str, &str, AuthFailure)] = &[
    (
        "ODPS-0410051",
        "ODPS-0410051:Invalid credentials",
        AuthFailure::InvalidCredentials,
    ),
    (
        "ODPS-0410042",
        "ODPS-0410042:Invalid signature value",
        AuthFailure::InvalidSignature,
    ),
    (
        "ODPS-0420095",
        "ODPS-0420095: Access Denied",
        AuthFailure::AccessDenied,
    ),
];

pub fn classify_auth(err: &VendorError) -> Option<AuthFailure> {
    if let Some(code) = err.code.as_deref() {
        if let Some((_, _, failure)) = AUTH_FAILURES.iter().find(|(c, _, _)| *c == code) {
            return Some(*failure);
        }
    }
    AUTH_FAILURES
        .iter()
        .find(|(_, fragment, _)| err.message.contains(fragment))
        .map(|(_, _, failure)| *failure)
}

impl From<AuthFailure> for AppError {
    fn from(f: AuthFailure) -> Self {
        match f {
            AuthFailure::InvalidCredentials => AppError::InvalidCredentials,
            AuthFailure::InvalidSignature => AppError::InvalidSignature,
            AuthFailure::AccessDenied => AppError::AccessDenied,
        }
    }
}

/// Collapses any vendor failure into the generic SQL execution error. The
/// cause is only logged.
pub fn sql_exec_error(context: &str, err: VendorError) -> AppError {
    tracing::error!(code = ?err.code, error = %err.message, "{context} failed");
    AppError::SqlExec(format!("{context}: {}", err.message))
}

/// Auth failures keep their own codes; everything else is a SQL execution error.
pub fn auth_or_sql_exec_error(context: &str, err: VendorError) -> AppError {
    match classify_auth(&err) {
        Some(failure) => {
            tracing::error!(code = ?err.code, error = %err.message, "{context} rejected");
            failure.into()
        }
        None => sql_exec_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_code_wins() {
        let err = VendorError::with_code("ODPS-0420095", "forbidden");
        assert_eq!(classify_auth(&err), Some(AuthFailure::AccessDenied));
    }

    #[test]
    fn message_fragments_are_matched_when_code_is_missing() {
        let cases = [
            (
                "RequestId=1 ODPS-0410051:Invalid credentials - accessKeyId not found",
                AuthFailure::InvalidCredentials,
            ),
            (
                "ODPS-0410042:Invalid signature value - User signature dose not match",
                AuthFailure::InvalidSignature,
            ),
            (
                "ODPS-0420095: Access Denied - Authorization Failed [4019]",
                AuthFailure::AccessDenied,
            ),
        ];
        for (message, expected) in cases {
            assert_eq!(classify_auth(&VendorError::new(message)), Some(expected));
        }
    }

    #[test]
    fn fragments_are_case_and_spacing_sensitive() {
        assert_eq!(classify_auth(&VendorError::new("ODPS-0420095:Access Denied")), None);
        assert_eq!(
            classify_auth(&VendorError::new("odps-0410051:invalid credentials")),
            None
        );
    }

    #[test]
    fn unknown_code_falls_back_to_message() {
        let err = VendorError::with_code("ODPS-0130071", "ODPS-0410042:Invalid signature value");
        assert_eq!(classify_auth(&err), Some(AuthFailure::InvalidSignature));
    }

    #[test]
    fn unclassified_errors_become_sql_exec() {
        let err = auth_or_sql_exec_error("list tables", VendorError::new("network down"));
        assert_eq!(err.code(), "MAX_COMPUTE_SQL_EXEC_ERR");
        let err = auth_or_sql_exec_error(
            "list tables",
            VendorError::new("ODPS-0410051:Invalid credentials"),
        );
        assert_eq!(err.code(), "MAX_COMPUTE_UNAME_ERR");
    }
}
