use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON error body sent to clients.
///
/// ```json
/// {
///   "success": false,
///   "message": "Punto de acopio no encontrado"
/// }
/// ```
///
/// `error` carries the underlying failure text and is only populated when the
/// server runs with `EXPOSE_INTERNAL_ERRORS=true`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{}", s),
            Err(_) => Err(fmt::Error),
        }
    }
}

/// Fixed error messages shared by the auth middleware and handlers.
#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    // Password handling
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    InvalidHashFormat,
    HashingError,

    // Authentication
    InvalidToken,
    TokenNotProvided,
    UserNotAuthenticated,
    UserNoLongerExist,
    UserInactive,

    // Authorization
    PermissionDenied,

    ServerError,
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorMessage::EmptyPassword => "La contraseña no puede estar vacía".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max_length) => {
                format!("La contraseña no puede exceder {} caracteres", max_length)
            }
            ErrorMessage::InvalidHashFormat => "Formato de hash de contraseña inválido".to_string(),
            ErrorMessage::HashingError => "Error al procesar la contraseña".to_string(),
            ErrorMessage::InvalidToken => "Token inválido o expirado".to_string(),
            ErrorMessage::TokenNotProvided => {
                "No autorizado para acceder a esta ruta".to_string()
            }
            ErrorMessage::UserNotAuthenticated => "Autenticación requerida".to_string(),
            ErrorMessage::UserNoLongerExist => "Usuario no encontrado".to_string(),
            ErrorMessage::UserInactive => "Usuario inactivo".to_string(),
            ErrorMessage::PermissionDenied => {
                "No autorizado para realizar esta acción".to_string()
            }
            ErrorMessage::ServerError => "Error interno del servidor".to_string(),
        };
        write!(f, "{}", message)
    }
}

/// Application error type returned by handlers and middleware.
///
/// Bundles the client-facing message with the HTTP status; axum converts it
/// into a JSON response through `IntoResponse`. `detail` holds the underlying
/// error text and is serialized only when the debug toggle is on.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
    pub detail: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
            detail: None,
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn unique_constraint_violation(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::CONFLICT)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::FORBIDDEN)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::NOT_FOUND)
    }

    /// 500 with the underlying error attached as debug detail when `expose`
    /// is set. Detail is dropped entirely otherwise.
    pub fn internal(message: impl Into<String>, err: impl fmt::Display, expose: bool) -> Self {
        let mut e = HttpError::server_error(message);
        if expose {
            e.detail = Some(err.to_string());
        }
        e
    }

    pub fn into_http_response(self) -> Response {
        let json_response = Json(ErrorResponse {
            success: false,
            message: self.message.clone(),
            error: self.detail,
        });

        (self.status, json_response).into_response()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_only_attached_when_exposed() {
        let hidden = HttpError::internal("Error al obtener reportes", "db down", false);
        assert!(hidden.detail.is_none());

        let shown = HttpError::internal("Error al obtener reportes", "db down", true);
        assert_eq!(shown.detail.as_deref(), Some("db down"));
        assert_eq!(shown.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn error_body_omits_empty_detail() {
        let body = ErrorResponse {
            success: false,
            message: "Ruta no encontrada".to_string(),
            error: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("\"error\""));
    }
}
