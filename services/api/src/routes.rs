use crate::infra::AppState;
use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use motocredito::auth::{AuthError, AuthSession, NewAccount};
use motocredito::error::AppError;
use motocredito::storage::DataUrl;
use motocredito::workflows::credit::{credit_router, CreditApplicationService, DocumentStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct SignInRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignOutRequest {
    pub(crate) token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadRequest {
    /// Folder inside the bucket, e.g. `documentos/<solicitud_id>`.
    pub(crate) carpeta: String,
    /// `data:image/...;base64,...` payload as captured by the browser.
    pub(crate) archivo: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadResponse {
    pub(crate) ruta: String,
    pub(crate) url: String,
}

pub(crate) fn with_service_routes<S>(service: Arc<CreditApplicationService<S>>) -> axum::Router
where
    S: DocumentStore + 'static,
{
    credit_router(service)
        .route(
            "/api/v1/storage/uploads",
            axum::routing::post(upload_endpoint),
        )
        .route_layer(middleware::from_fn(require_session))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/auth/sign-in", axum::routing::post(sign_in_endpoint))
        .route("/api/v1/auth/sign-up", axum::routing::post(sign_up_endpoint))
        .route("/api/v1/auth/sign-out", axum::routing::post(sign_out_endpoint))
}

/// Resolves `Authorization: Bearer <token>` through the session cache and
/// exposes the [`AuthSession`] to downstream handlers as an extension.
pub(crate) async fn require_session(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::SessionExpired)?;
    let session = state.sessions.get(&token)?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn sign_in_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let session = state.auth.sign_in(&payload.email, &payload.password)?;
    state.sessions.store(session.clone());
    info!(uid = %session.uid, rol = ?session.rol, "user signed in");
    Ok(Json(session))
}

pub(crate) async fn sign_up_endpoint(
    Extension(state): Extension<AppState>,
    Json(account): Json<NewAccount>,
) -> Result<(StatusCode, Json<AuthSession>), AppError> {
    let session = state.auth.create_account(account)?;
    state.sessions.store(session.clone());
    info!(uid = %session.uid, rol = ?session.rol, "account created");
    Ok((StatusCode::CREATED, Json(session)))
}

pub(crate) async fn sign_out_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<SignOutRequest>,
) -> Result<StatusCode, AppError> {
    if state.sessions.revoke(&payload.token) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AuthError::SessionExpired.into())
    }
}

pub(crate) async fn upload_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let file = DataUrl::parse(&payload.archivo)?;
    let ruta = format!(
        "{}/{}.{}",
        payload.carpeta.trim_matches('/'),
        Uuid::new_v4(),
        file.extension()
    );
    let url = state.storage.upload(&ruta, file)?;
    Ok((StatusCode::CREATED, Json(UploadResponse { ruta, url })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryAuthProvider;
    use axum::body::Body;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use motocredito::auth::{SessionCache, UserRole};
    use motocredito::config::StorageConfig;
    use motocredito::storage::MemoryFileStorage;
    use motocredito::workflows::credit::{EvaluationEngine, MemoryDocumentStore};
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            sessions: Arc::new(SessionCache::new(480)),
            auth: Arc::new(InMemoryAuthProvider::default()),
            storage: Arc::new(MemoryFileStorage::new(&StorageConfig {
                bucket: "motocredito".to_string(),
                public_base_url: "https://storage.local".to_string(),
            })),
        }
    }

    fn new_account(password: &str) -> NewAccount {
        NewAccount {
            email: "vendedor@motocredito.pe".to_string(),
            password: password.to_string(),
            display_name: None,
            rol: UserRole::Vendedor,
        }
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_flagged() {
        let state = state();
        let response = readiness_endpoint(Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state
            .readiness
            .store(true, std::sync::atomic::Ordering::Release);
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sign_up_and_sign_in_populate_the_session_cache() {
        let state = state();
        let (status, Json(created)) =
            sign_up_endpoint(Extension(state.clone()), Json(new_account("clave-segura")))
                .await
                .expect("account created");
        assert_eq!(status, StatusCode::CREATED);
        assert!(state.sessions.get(&created.token).is_ok());

        let Json(session) = sign_in_endpoint(
            Extension(state.clone()),
            Json(SignInRequest {
                email: "vendedor@motocredito.pe".to_string(),
                password: "clave-segura".to_string(),
            }),
        )
        .await
        .expect("signed in");
        assert_eq!(session.rol, UserRole::Vendedor);
        assert_eq!(state.sessions.len(), 2);

        let status = sign_out_endpoint(
            Extension(state.clone()),
            Json(SignOutRequest {
                token: session.token.clone(),
            }),
        )
        .await
        .expect("signed out");
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(
            state.sessions.get(&session.token),
            Err(AuthError::SessionExpired)
        );
    }

    #[tokio::test]
    async fn weak_passwords_map_to_unprocessable_entity() {
        let err = sign_up_endpoint(Extension(state()), Json(new_account("corta")))
            .await
            .expect_err("password too short");
        assert_eq!(
            err.user_message(),
            "La contraseña debe tener al menos 8 caracteres."
        );
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn uploads_return_bucket_urls_and_reject_non_images() {
        let (status, Json(body)) = upload_endpoint(
            Extension(state()),
            Json(UploadRequest {
                carpeta: "/documentos/sol-1/".to_string(),
                archivo: "data:image/jpeg;base64,aGVsbG8=".to_string(),
            }),
        )
        .await
        .expect("upload succeeds");
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.ruta.starts_with("documentos/sol-1/"));
        assert!(body.ruta.ends_with(".jpg"));
        assert_eq!(
            body.url,
            format!("https://storage.local/motocredito/{}", body.ruta)
        );

        let err = upload_endpoint(
            Extension(state()),
            Json(UploadRequest {
                carpeta: "documentos".to_string(),
                archivo: "data:application/pdf;base64,aGVsbG8=".to_string(),
            }),
        )
        .await
        .expect_err("pdf refused");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    fn app(state: AppState) -> axum::Router {
        let service = Arc::new(CreditApplicationService::new(
            Arc::new(MemoryDocumentStore::new()),
            EvaluationEngine::default(),
        ));
        with_service_routes(service).layer(Extension(state))
    }

    fn get_application(token: Option<&str>) -> Request {
        let mut builder =
            axum::http::Request::builder().uri("/api/v1/credit/applications/desconocida");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).expect("request builds")
    }

    #[tokio::test]
    async fn credit_and_upload_routes_require_a_session() {
        let state = state();
        let app = app(state.clone());

        let response = app
            .clone()
            .oneshot(get_application(None))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(get_application(Some("token-inventado")))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/v1/storage/uploads")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "carpeta": "documentos",
                            "archivo": "data:image/png;base64,aGVsbG8="
                        })
                        .to_string(),
                    ))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signed_in_sessions_reach_credit_routes_until_revoked() {
        let state = state();
        let session = state
            .auth
            .create_account(new_account("clave-segura"))
            .expect("account created");
        state.sessions.store(session.clone());
        let app = app(state.clone());

        let response = app
            .clone()
            .oneshot(get_application(Some(&session.token)))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        state.sessions.revoke(&session.token);
        let response = app
            .oneshot(get_application(Some(&session.token)))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
