use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use metrics_exporter_prometheus::PrometheusHandle;
use motocredito::auth::{AuthError, AuthProvider, AuthSession, NewAccount, SessionCache, UserRole};
use motocredito::error::AppError;
use motocredito::storage::FileStorage;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub(crate) const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) sessions: Arc<SessionCache>,
    pub(crate) auth: Arc<dyn AuthProvider>,
    pub(crate) storage: Arc<dyn FileStorage>,
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    password_hash: String,
    display_name: Option<String>,
    rol: UserRole,
}

/// Identity provider kept in process; passwords are stored as argon2id hashes.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAuthProvider {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
}

impl InMemoryAuthProvider {
    fn session_for(email: String, account: &Account) -> AuthSession {
        AuthSession {
            token: Uuid::new_v4().to_string(),
            uid: account.uid.clone(),
            email,
            display_name: account.display_name.clone(),
            rol: account.rol,
        }
    }
}

impl AuthProvider for InMemoryAuthProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        let guard = self.accounts.lock().expect("auth mutex poisoned");
        let account = guard.get(&email).ok_or(AuthError::UserNotFound)?;

        let parsed = PasswordHash::new(&account.password_hash)
            .map_err(|err| AuthError::Unavailable(err.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(Self::session_for(email, account)),
            Err(argon2::password_hash::Error::Password) => Err(AuthError::InvalidCredentials),
            Err(err) => Err(AuthError::Unavailable(err.to_string())),
        }
    }

    fn create_account(&self, account: NewAccount) -> Result<AuthSession, AuthError> {
        if account.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }

        let email = normalize_email(&account.email);
        let mut guard = self.accounts.lock().expect("auth mutex poisoned");
        if guard.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(account.password.as_bytes(), &salt)
            .map_err(|err| AuthError::Unavailable(err.to_string()))?
            .to_string();

        let stored = Account {
            uid: Uuid::new_v4().to_string(),
            password_hash,
            display_name: account.display_name,
            rol: account.rol,
        };
        let session = Self::session_for(email.clone(), &stored);
        guard.insert(email, stored);
        Ok(session)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
