mod common;

use actix_web::http::StatusCode;
use actix_web::{App, test};
use chrono::{Duration, Utc};
use common::{config, hire, memory_state};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::net::SocketAddr;

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

macro_rules! app {
    ($state:expr) => {{
        let state = $state;
        let config = config();
        test::init_service(
            App::new().configure(move |cfg| timeclock::configure_app(cfg, state, config)),
        )
        .await
    }};
}

macro_rules! post_json {
    ($app:expr, $uri:expr, $body:expr) => {
        test::call_service(
            &$app,
            test::TestRequest::post()
                .uri($uri)
                .peer_addr(peer())
                .set_json($body)
                .to_request(),
        )
        .await
    };
    ($app:expr, $uri:expr, $body:expr, $token:expr) => {
        test::call_service(
            &$app,
            test::TestRequest::post()
                .uri($uri)
                .peer_addr(peer())
                .insert_header(("Authorization", format!("Bearer {}", $token)))
                .set_json($body)
                .to_request(),
        )
        .await
    };
}

macro_rules! get_auth {
    ($app:expr, $uri:expr, $token:expr) => {
        test::call_service(
            &$app,
            test::TestRequest::get()
                .uri($uri)
                .peer_addr(peer())
                .insert_header(("Authorization", format!("Bearer {}", $token)))
                .to_request(),
        )
        .await
    };
}

/// Bootstraps the first admin and signs in.
macro_rules! admin_token {
    ($app:expr) => {{
        let resp = post_json!(
            $app,
            "/api/auth/register-admin",
            json!({ "name": "Root", "email": "root@company.com", "password": "s3cret-pass" })
        );
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = post_json!(
            $app,
            "/api/auth/admin",
            json!({ "email": "root@company.com", "password": "s3cret-pass" })
        );
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        body["token"].as_str().unwrap().to_string()
    }};
}

#[actix_web::test]
async fn test_index() {
    let app = app!(memory_state());
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn test_register_admin_closes_after_first() {
    let app = app!(memory_state());
    let token = admin_token!(app);

    let resp = post_json!(
        app,
        "/api/auth/register-admin",
        json!({ "name": "Eve", "email": "eve@company.com", "password": "x" })
    );
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = post_json!(
        app,
        "/api/auth/register-admin",
        json!({ "name": "Sam", "email": "sam@company.com", "password": "another-pass" }),
        token
    );
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn test_protected_routes_need_a_token() {
    let app = app!(memory_state());
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/employees")
            .peer_addr(peer())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error_code"], "UNAUTHORIZED");
}

#[actix_web::test]
async fn test_employee_crud_and_duplicate_email() {
    let app = app!(memory_state());
    let token = admin_token!(app);

    let resp = post_json!(
        app,
        "/api/employees",
        json!({ "name": "Jane Doe", "email": "Jane@Company.com", "hourly_rate": 20.0 }),
        token
    );
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["email"], "jane@company.com");
    assert_eq!(created["is_active"], false);
    assert!(created.get("pin_hash").is_none());

    let resp = post_json!(
        app,
        "/api/employees",
        json!({ "name": "Jane Again", "email": "jane@company.com", "hourly_rate": 10.0 }),
        token
    );
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let id = created["id"].as_u64().unwrap();
    let resp = test::call_service(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/employees/{id}"))
            .peer_addr(peer())
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(json!({ "hourly_rate": 25.5 }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = test::read_body_json(resp).await;
    assert_eq!(updated["hourly_rate"].as_f64(), Some(25.5));

    let resp = get_auth!(app, "/api/employees", token);
    let list: Value = test::read_body_json(resp).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/employees/{id}"))
            .peer_addr(peer())
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = get_auth!(app, &format!("/api/employees/{id}"), token);
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_kiosk_clock_in_checks_pin_and_sessions() {
    let state = memory_state();
    let id = hire(&state, "Kim", dec!(18), "4321").await;
    let app = app!(state);

    let resp = post_json!(
        app,
        "/api/time/clock-in",
        json!({ "employee_id": id, "pin": "0000" })
    );
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = post_json!(
        app,
        "/api/time/clock-in",
        json!({ "employee_id": id, "pin": "4321" })
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["log"]["status"], "pending");
    assert!(body["log"]["clock_out"].is_null());

    let resp = post_json!(
        app,
        "/api/time/clock-in",
        json!({ "employee_id": id, "pin": "4321" })
    );
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = post_json!(
        app,
        "/api/time/clock-in",
        json!({ "employee_id": 9999, "pin": "4321" })
    );
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_clock_out_settle_and_read_back() {
    let state = memory_state();
    let id = hire(&state, "Lee", dec!(20.00), "1234").await;
    let started = Utc::now() - Duration::hours(2);
    state.ledger.clock_in_at(id, started).await.unwrap();
    let app = app!(state);
    let token = admin_token!(app);

    let resp = post_json!(
        app,
        "/api/time/clock-out",
        json!({ "employee_id": id, "pin": "1234" })
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let pay = body["log"]["pay_amount"].as_f64().unwrap();
    assert!((pay - 40.0).abs() < 0.5);

    let resp = post_json!(
        app,
        "/api/time/clock-out",
        json!({ "employee_id": id, "pin": "1234" })
    );
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let start = started.date_naive().format("%Y-%m-%d").to_string();
    let end = Utc::now().date_naive().format("%Y-%m-%d").to_string();

    let resp = get_auth!(
        app,
        &format!("/api/payments/unpaid?employee_id={id}&start_date={start}&end_date={end}"),
        token
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let preview: Value = test::read_body_json(resp).await;
    assert_eq!(preview["entries"].as_array().unwrap().len(), 1);

    let settle = json!({ "employee_id": id, "start_date": start, "end_date": end });
    let resp = post_json!(app, "/api/payments", settle.clone(), token);
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["payment"]["amount"], preview["total_amount"]);
    assert_eq!(body["payment"]["status"], "paid");

    let resp = post_json!(app, "/api/payments", settle, token);
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "No pending payments for this period.");
    assert!(body["payment"].is_null());

    // the employee reads their own history
    let resp = post_json!(
        app,
        "/api/auth/employee",
        json!({ "email": "lee@company.com", "pin": "1234" })
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let login: Value = test::read_body_json(resp).await;
    let employee_token = login["token"].as_str().unwrap().to_string();

    let resp = get_auth!(app, &format!("/api/payments/mine/{id}"), employee_token);
    assert_eq!(resp.status(), StatusCode::OK);
    let payments: Value = test::read_body_json(resp).await;
    assert_eq!(payments.as_array().unwrap().len(), 1);
    assert!(payments[0]["amount_rounded"].is_number());

    let resp = get_auth!(app, "/api/payments/mine/9999", employee_token);
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = get_auth!(app, "/api/dashboard", employee_token);
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = get_auth!(app, "/api/dashboard", token);
    assert_eq!(resp.status(), StatusCode::OK);
    let dashboard: Value = test::read_body_json(resp).await;
    assert_eq!(dashboard["stats"]["totalEmployees"], 1);
}

#[actix_web::test]
async fn test_inverted_window_is_bad_request() {
    let state = memory_state();
    let id = hire(&state, "Max", dec!(20), "1234").await;
    let app = app!(state);
    let token = admin_token!(app);

    let resp = post_json!(
        app,
        "/api/payments",
        json!({ "employee_id": id, "start_date": "2024-05-31", "end_date": "2024-05-01" }),
        token
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error_code"], "INVALID_RANGE");
}

#[actix_web::test]
async fn test_change_pin() {
    let state = memory_state();
    let id = hire(&state, "Pat", dec!(20), "1234").await;
    let app = app!(state);

    let resp = post_json!(
        app,
        "/api/auth/employee",
        json!({ "email": "pat@company.com", "pin": "1234" })
    );
    let login: Value = test::read_body_json(resp).await;
    let token = login["token"].as_str().unwrap().to_string();

    let resp = post_json!(
        app,
        "/api/auth/change-password",
        json!({ "old_pin": "9999", "new_pin": "5678" }),
        token
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = post_json!(
        app,
        "/api/auth/change-password",
        json!({ "old_pin": "1234", "new_pin": "5678" }),
        token
    );
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = post_json!(
        app,
        "/api/time/clock-in",
        json!({ "employee_id": id, "pin": "5678" })
    );
    assert_eq!(resp.status(), StatusCode::OK);
}
