//! Email/password authentication against the hosted identity service and the
//! in-process session cache fed by it.

mod session;

pub use session::{CachedSession, SessionCache};

use serde::{Deserialize, Serialize};

/// Back office roles carried on the user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Administrador,
    Evaluador,
    Vendedor,
}

/// Token and profile fields returned by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub rol: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub rol: UserRole,
}

/// Identity provider seam; the hosted service and test doubles implement it.
pub trait AuthProvider: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    fn create_account(&self, account: NewAccount) -> Result<AuthSession, AuthError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user not found")]
    UserNotFound,
    #[error("email already registered")]
    EmailInUse,
    #[error("password does not meet the policy")]
    WeakPassword,
    #[error("too many attempts")]
    TooManyRequests,
    #[error("session expired or unknown")]
    SessionExpired,
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// Maps an identity service HTTP status onto the error taxonomy.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        match status {
            400 | 401 => AuthError::InvalidCredentials,
            404 => AuthError::UserNotFound,
            409 => AuthError::EmailInUse,
            422 => AuthError::WeakPassword,
            429 => AuthError::TooManyRequests,
            _ => AuthError::Unavailable(detail.into()),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Correo o contraseña incorrectos.",
            AuthError::UserNotFound => "No existe un usuario registrado con ese correo.",
            AuthError::EmailInUse => "El correo ya se encuentra registrado.",
            AuthError::WeakPassword => "La contraseña debe tener al menos 8 caracteres.",
            AuthError::TooManyRequests => {
                "Demasiados intentos fallidos. Intente nuevamente en unos minutos."
            }
            AuthError::SessionExpired => "Su sesión ha expirado. Inicie sesión nuevamente.",
            AuthError::Unavailable(_) => {
                "El servicio de autenticación no está disponible. Intente más tarde."
            }
        }
    }
}
