use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, passes, reset};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(reset::router())
                .merge(passes::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::NewUser;
    use crate::auth::services::{hash_password, JwtKeys};
    use crate::notify::testing::{next_mail, ChannelMailer};
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn admin_token(state: &AppState) -> String {
        let hash = hash_password("admin-pass", &state.config.password).unwrap();
        let admin = state
            .users
            .create(NewUser {
                name: "Dean".into(),
                email: "dean@example.com".into(),
                matric_number: "STAFF001".into(),
                department: "Student Affairs".into(),
                faculty: "Administration".into(),
                password_hash: hash,
                is_admin: true,
            })
            .await
            .unwrap();
        JwtKeys::from_ref(state).sign(admin.id).unwrap()
    }

    fn registration(email: &str, matric: &str) -> Value {
        json!({
            "name": "Ada Obi",
            "email": email,
            "matricNumber": matric,
            "department": "Computer Engineering",
            "faculty": "Engineering",
            "password": "secret1",
        })
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_then_duplicate_email() {
        let app = build_app(AppState::fake());

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(registration("ada@example.com", "19CS1234")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["user"]["id"].is_string());
        assert!(body["token"].is_string());
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("passwordHash").is_none());

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(registration("ada@example.com", "19CS9999")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");
    }

    #[tokio::test]
    async fn pass_lifecycle_over_http() {
        let (mailer, mut rx) = ChannelMailer::new(false);
        let state = AppState::fake_with_mailer(Arc::new(mailer));
        let admin = admin_token(&state).await;
        let app = build_app(state);

        let (_, body) = call(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(registration("ada@example.com", "19CS1234")),
        )
        .await;
        let student = body["token"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/passes",
            Some(&student),
            Some(json!({ "phoneNumber": "0803", "parentPhoneNumber": "0804" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("departureDate"));

        let (status, pass) = call(
            &app,
            Method::POST,
            "/api/passes",
            Some(&student),
            Some(json!({
                "phoneNumber": "08030000000",
                "parentPhoneNumber": "08031111111",
                "departureDate": "2026-11-01",
                "location": "Lagos",
                "reason": "Wedding",
                "hostel": "Hall 3",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(pass["status"], "Pending");
        assert_eq!(pass["matricNumber"], "19CS1234");
        let id = pass["id"].as_str().unwrap().to_string();
        let _created = next_mail(&mut rx).await;

        // students cannot see everything or approve
        let (status, _) = call(&app, Method::GET, "/api/passes", Some(&student), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(
            &app,
            Method::PUT,
            &format!("/api/passes/{id}/approve"),
            Some(&student),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, mine) = call(&app, Method::GET, "/api/passes/mine", Some(&student), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mine.as_array().unwrap().len(), 1);

        let (status, approved) = call(
            &app,
            Method::PUT,
            &format!("/api/passes/{id}/approve"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["status"], "Approved");
        let mail = next_mail(&mut rx).await;
        assert_eq!(mail.to_address, "ada@example.com");

        let (_, list) = call(
            &app,
            Method::GET,
            "/api/passes/approvedPasses?keyword=lag",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        let (_, list) = call(&app, Method::GET, "/api/passes/pendingPasses", Some(&admin), None).await;
        assert!(list.as_array().unwrap().is_empty());

        let (status, fetched) = call(
            &app,
            Method::GET,
            &format!("/api/passes/{id}"),
            Some(&student),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["status"], "Approved");

        let user_id = pass["user"].as_str().unwrap();
        let (status, list) = call(
            &app,
            Method::GET,
            &format!("/api/passes/admin/userpasses/{user_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_or_bad_token_is_unauthorized() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, Method::GET, "/api/passes/mine", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthorized");

        let (status, _) = call(&app, Method::GET, "/api/passes/mine", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_pass_is_not_found() {
        let state = AppState::fake();
        let admin = admin_token(&state).await;
        let app = build_app(state);
        let id = uuid::Uuid::new_v4();
        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/api/passes/{id}/reject"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn malformed_requests_get_json_errors() {
        let state = AppState::fake();
        let admin = admin_token(&state).await;
        let app = build_app(state);

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users/auth",
            None,
            Some(json!({ "email": "a@b.co" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
        assert!(body["error"].as_str().unwrap().contains("password"));

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users/verifycode",
            None,
            Some(json!({ "email": "a@b.co" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");

        let (status, body) = call(&app, Method::POST, "/api/users", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users/updatepassword/not-a-uuid/123456",
            None,
            Some(json!({ "password": "newpass1", "confirmPassword": "newpass1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_code");

        for uri in ["/api/passes/not-a-uuid", "/api/users/not-a-uuid"] {
            let (status, body) = call(&app, Method::GET, uri, Some(&admin), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["code"], "not_found", "{uri}");
        }
        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/passes/not-a-uuid/approve",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn reset_flow_over_http() {
        let (mailer, mut rx) = ChannelMailer::new(false);
        let app = build_app(AppState::fake_with_mailer(Arc::new(mailer)));
        call(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(registration("ada@example.com", "19CS1234")),
        )
        .await;

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/users/resetpassword",
            None,
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let mail = next_mail(&mut rx).await;
        let code = mail
            .text_body
            .split(|c: char| !c.is_ascii_digit())
            .find(|s| s.len() == 6)
            .unwrap()
            .to_string();

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users/verifycode",
            None,
            Some(json!({ "email": "ada@example.com", "code": "000000" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_code");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/users/verifycode",
            None,
            Some(json!({ "email": "ada@example.com", "code": code })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let user_id = body["userId"].as_str().unwrap().to_string();

        let uri = format!("/api/users/updatepassword/{user_id}/{code}");
        let new_password = json!({ "password": "newpass1", "confirmPassword": "newpass1" });
        let (status, _) = call(&app, Method::POST, &uri, None, Some(new_password.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, Method::POST, &uri, None, Some(new_password)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_code");

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/users/auth",
            None,
            Some(json!({ "email": "ada@example.com", "password": "newpass1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_user_directory() {
        let state = AppState::fake();
        let admin = admin_token(&state).await;
        let app = build_app(state);
        let (_, reg) = call(
            &app,
            Method::POST,
            "/api/users",
            None,
            Some(registration("ada@example.com", "19CS1234")),
        )
        .await;
        let student = reg["token"].as_str().unwrap().to_string();
        let student_id = reg["user"]["id"].as_str().unwrap().to_string();

        let (status, _) = call(&app, Method::GET, "/api/users", Some(&student), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, users) = call(&app, Method::GET, "/api/users?keyword=19cs", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(users.as_array().unwrap().len(), 1);
        assert!(users[0].get("passwordHash").is_none());

        let (status, user) = call(
            &app,
            Method::GET,
            &format!("/api/users/{student_id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["email"], "ada@example.com");

        let (status, profile) = call(&app, Method::GET, "/api/users/profile", Some(&student), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["id"], student_id.as_str());
    }
}
