//! HTTP round trips against an in-memory database

use std::io::Write;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::NamedTempFile;

use sqlite_rest_common::config::AuthConfig;
use sqlite_rest_query::CompiledQuery;
use sqlite_rest_server::{
    configure_routes, Authenticator, QueryBackend, RestState, SqliteBackend, TableAccess,
};

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(configure_routes),
        )
        .await
    };
}

async fn backend() -> Arc<SqliteBackend> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let backend = Arc::new(SqliteBackend::new(pool));
    backend
        .execute(&CompiledQuery {
            query: "create table test (id integer primary key, s text)".to_string(),
            values: vec![],
        })
        .await
        .unwrap();
    backend
}

fn state(backend: &Arc<SqliteBackend>, authenticator: Authenticator) -> Arc<RestState> {
    Arc::new(RestState::new(
        backend.clone(),
        authenticator,
        TableAccess::new(["test", "missing"]),
    ))
}

async fn rows(backend: &SqliteBackend) -> Vec<Value> {
    backend
        .query(&CompiledQuery {
            query: "select * from test order by id".to_string(),
            values: vec![],
        })
        .await
        .unwrap()
        .rows
}

fn header<B>(resp: &actix_web::dev::ServiceResponse<B>, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

#[actix_web::test]
async fn test_insert_and_select() {
    let backend = backend().await;
    let app = init_app!(state(&backend, Authenticator::disabled()));

    let req = test::TestRequest::post()
        .uri("/test")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"[{"id":1,"s":"a"},{"id":2,"s":"b"},{"id":3}]"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/test?order=id.desc&select=id,s")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "range-unit").as_deref(), Some("items"));
    assert_eq!(header(&resp, "content-range"), None);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!([{"id":3,"s":null},{"id":2,"s":"b"},{"id":1,"s":"a"}])
    );

    let req = test::TestRequest::get()
        .uri("/test?s=in.(%22a%22,%22b%22)&id=ge.2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!([{"id":2,"s":"b"}]));

    let req = test::TestRequest::get().uri("/test?s=is.null").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!([{"id":3,"s":null}]));
}

#[actix_web::test]
async fn test_select_pagination_with_exact_count() {
    let backend = backend().await;
    let app = init_app!(state(&backend, Authenticator::disabled()));

    let req = test::TestRequest::post()
        .uri("/test")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"[{"id":1},{"id":2},{"id":3},{"id":4}]"#)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/test?order=id&limit=2&offset=1")
        .insert_header(("Prefer", "count=exact"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(header(&resp, "content-range").as_deref(), Some("1-2/4"));
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!([{"id":2,"s":null},{"id":3,"s":null}]));

    let req = test::TestRequest::get()
        .uri("/test?order=id")
        .insert_header(("Range", "3-"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(header(&resp, "content-range").as_deref(), Some("3-/*"));
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!([{"id":4,"s":null}]));

    let req = test::TestRequest::get().uri("/test?limit=-1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/test")
        .insert_header(("Range", "0-9223372036854775807"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/test?limit=9223372036854775807&offset=5")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_update_and_delete() {
    let backend = backend().await;
    let app = init_app!(state(&backend, Authenticator::disabled()));

    let req = test::TestRequest::post()
        .uri("/test")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"[{"id":1,"s":"a"},{"id":2,"s":"b"}]"#)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::patch()
        .uri("/test?id=eq.1")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"{"s":"x"}"#)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

    let req = test::TestRequest::put()
        .uri("/test?id=eq.2")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"{"s":"y"}"#)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

    assert_eq!(
        rows(&backend).await,
        vec![json!({"id":1,"s":"x"}), json!({"id":2,"s":"y"})]
    );

    let req = test::TestRequest::put()
        .uri("/test")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(r#"{"s":"z"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["hint"], "expect to specify primary key query");

    let req = test::TestRequest::delete().uri("/test?id=eq.1").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);
    assert_eq!(rows(&backend).await, vec![json!({"id":2,"s":"y"})]);
}

#[actix_web::test]
async fn test_upsert() {
    let backend = backend().await;
    let app = init_app!(state(&backend, Authenticator::disabled()));

    let insert = |prefer: &'static str, query: &'static str, body: &'static str| {
        test::TestRequest::post()
            .uri(&format!("/test{query}"))
            .insert_header(("Content-Type", "application/json"))
            .insert_header(("Prefer", prefer))
            .set_payload(body)
            .to_request()
    };

    let req = insert("", "", r#"{"id":1,"s":"a"}"#);
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    // plain duplicate hits the primary key
    let req = insert("", "", r#"{"id":1,"s":"b"}"#);
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );

    let req = insert("resolution=ignore-duplicates", "", r#"{"id":1,"s":"b"}"#);
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    assert_eq!(rows(&backend).await, vec![json!({"id":1,"s":"a"})]);

    let req = insert(
        "resolution=merge-duplicates",
        "?on_conflict=id",
        r#"{"id":1,"s":"c"}"#,
    );
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    assert_eq!(rows(&backend).await, vec![json!({"id":1,"s":"c"})]);

    let req = insert(
        "resolution=merge-duplicates",
        "?on_conflict=nope",
        r#"{"id":1,"s":"d"}"#,
    );
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_request_errors() {
    let backend = backend().await;
    let app = init_app!(state(&backend, Authenticator::disabled()));

    let req = test::TestRequest::get().uri("/secrets").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Access Restricted");

    let req = test::TestRequest::post()
        .uri("/test")
        .insert_header(("Content-Type", "text/csv"))
        .set_payload("id\n1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let req = test::TestRequest::get().uri("/test?id=foo.1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Unsupported Operator");

    let req = test::TestRequest::get().uri("/test?order=id.desc.nullsfirst.extra").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/missing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("no such table: missing"));
}

#[actix_web::test]
async fn test_filter_values_are_bound() {
    let backend = backend().await;
    let app = init_app!(state(&backend, Authenticator::disabled()));

    let req = test::TestRequest::get()
        .uri("/test?s=eq.%27%3B%20drop%20table%20test%3B%20--")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!([]));

    // the table survives
    assert!(rows(&backend).await.is_empty());
}

#[actix_web::test]
async fn test_bearer_auth() {
    let mut secret = NamedTempFile::new().unwrap();
    secret.write_all(b"s3cret").unwrap();
    secret.flush().unwrap();

    let authenticator = Authenticator::from_config(&AuthConfig {
        token_file: Some(secret.path().to_path_buf()),
        ..AuthConfig::default()
    })
    .unwrap();

    let backend = backend().await;
    let app = init_app!(state(&backend, authenticator));

    let req = test::TestRequest::get().uri("/test").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["hint"], "missing auth header");

    let req = test::TestRequest::get()
        .uri("/test")
        .insert_header(("Authorization", "Token abc"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

    let token = encode(
        &Header::default(),
        &json!({"sub": "test"}),
        &EncodingKey::from_secret(b"s3cret"),
    )
    .unwrap();
    let req = test::TestRequest::get()
        .uri("/test")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // access control runs before auth
    let req = test::TestRequest::get().uri("/secrets").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_health() {
    let backend = backend().await;
    let app = init_app!(state(&backend, Authenticator::disabled()));

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
}
