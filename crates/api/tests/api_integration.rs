//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use access::{AuthConfig, TokenAuthority};
use api::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use chrono::{Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use schema::{CustomerRegistration, EntityKind, Money, NewItem};
use serde_json::{Value, json};
use store::{InMemoryStore, Store, StoreExt};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret-0123456789";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn authority() -> TokenAuthority {
    TokenAuthority::new(AuthConfig::new(SECRET)).unwrap()
}

fn setup() -> (axum::Router, Arc<AppState>) {
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let state = Arc::new(AppState::new(store, authority()));
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

/// Registers Ana (id 1) and one item (id 1).
async fn seed(state: &AppState) {
    state
        .customers
        .register(CustomerRegistration::new("Ana", "ana@x.com", "s3cret"))
        .await
        .unwrap();
    state
        .store
        .create_item(NewItem::new("Margherita", "https://x.io/m.png"))
        .await
        .unwrap();
}

fn bearer() -> String {
    format!("Bearer {}", authority().issue("ana@x.com").unwrap().token)
}

async fn send(app: &axum::Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("DELETE").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn order_body(lines: usize) -> Value {
    let details: Vec<Value> = (0..lines)
        .map(|_| json!({"itemId": 1, "size": "M", "quantity": 2, "pricePerPiece": 9.99}))
        .collect();
    json!({
        "customerId": 1,
        "orderDateTime": "2024-05-01T12:00:00Z",
        "totalAmount": 19.98,
        "paymentStatus": "PAID",
        "deliveryStatus": "PENDING",
        "orderDetails": details
    })
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = send(&app, get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
}

mod orders {
    use super::*;

    #[tokio::test]
    async fn test_place_order_without_token_writes_nothing() {
        let (app, state) = setup();
        seed(&state).await;

        let response = send(&app, with_json("POST", "/orders", None, order_body(1))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.store.count(EntityKind::Order).await.unwrap(), 0);
        assert_eq!(state.store.count(EntityKind::OrderDetail).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_place_order_with_token() {
        let (app, state) = setup();
        seed(&state).await;

        let token = bearer();
        let response = send(
            &app,
            with_json("POST", "/orders", Some(token.as_str()), order_body(1)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/orders/1");

        let json = json_body(response).await;
        assert_eq!(json["id"], 1);
        assert_eq!(json["customerId"], 1);
        assert_eq!(json["totalAmount"], 19.98);
        let details = json["orderDetails"].as_array().unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0]["customerId"], 1);
        assert_eq!(details[0]["orderId"], 1);

        let response = send(&app, get("/orders/1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["orderDetails"][0]["size"], "M");
    }

    #[tokio::test]
    async fn test_rejected_tokens() {
        let (app, state) = setup();
        seed(&state).await;

        let expired = authority()
            .issue_at("ana@x.com", Utc::now() - Duration::minutes(31))
            .unwrap();
        let forged = TokenAuthority::new(AuthConfig::new("some-other-secret-that-is-long-enough"))
            .unwrap()
            .issue("ana@x.com")
            .unwrap();

        for token in [
            format!("Bearer {}", expired.token),
            format!("Bearer {}", forged.token),
            "Bearer garbage".to_string(),
            format!("Basic {}", forged.token),
        ] {
            let response = send(
                &app,
                with_json("POST", "/orders", Some(token.as_str()), order_body(1)),
            )
            .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{token}");
            assert!(json_body(response).await["error"].is_string());
        }
        assert_eq!(state.store.count(EntityKind::Order).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_not_found() {
        let (app, state) = setup();
        seed(&state).await;

        let mut body = order_body(2);
        body["customerId"] = json!(42);
        let token = bearer();
        let response = send(&app, with_json("POST", "/orders", Some(token.as_str()), body)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.store.count(EntityKind::Order).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_item_is_a_conflict_and_rolls_back() {
        let (app, state) = setup();
        seed(&state).await;

        let mut body = order_body(2);
        body["orderDetails"][1]["itemId"] = json!(404);
        let token = bearer();
        let response = send(&app, with_json("POST", "/orders", Some(token.as_str()), body)).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(state.store.count(EntityKind::Order).await.unwrap(), 0);
        assert_eq!(state.store.count(EntityKind::OrderDetail).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let (app, state) = setup();
        seed(&state).await;

        let token = bearer();
        let response = send(
            &app,
            with_json("POST", "/orders", Some(token.as_str()), json!({"customerId": "one"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_orders_empty_is_not_found() {
        let (app, _) = setup();

        let response = send(&app, get("/orders")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "No order found.");
    }

    #[tokio::test]
    async fn test_update_and_delete_order() {
        let (app, state) = setup();
        seed(&state).await;
        let token = bearer();
        send(&app, with_json("POST", "/orders", Some(token.as_str()), order_body(2))).await;

        let update = json!({
            "customerId": 1,
            "orderDateTime": "2024-05-02T08:30:00Z",
            "totalAmount": 5.0,
            "paymentStatus": "REFUNDED",
            "deliveryStatus": "CANCELLED"
        });
        let response = send(
            &app,
            with_json("PUT", "/orders/1", None, update.clone()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&app, with_json("PUT", "/orders/1", Some(token.as_str()), update)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["paymentStatus"], "REFUNDED");
        assert_eq!(json["totalAmount"], 5.0);

        let response = send(&app, delete("/orders/1", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&app, delete("/orders/1", Some(token.as_str()))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.store.count(EntityKind::OrderDetail).await.unwrap(), 0);

        let response = send(&app, get("/orders/1")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = send(&app, delete("/orders/1", Some(token.as_str()))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod customers {
    use super::*;

    #[tokio::test]
    async fn test_customer_with_orders_and_details() {
        let (app, state) = setup();
        seed(&state).await;
        let token = bearer();
        for lines in [3, 0] {
            let response = send(
                &app,
                with_json("POST", "/orders", Some(token.as_str()), order_body(lines)),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = send(&app, get("/customer/1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["name"], "Ana");
        assert!(json.get("passwordHash").is_none());

        let lengths: Vec<usize> = json["orders"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["orderDetails"].as_array().unwrap().len())
            .collect();
        assert_eq!(lengths, vec![3, 0]);
    }

    #[tokio::test]
    async fn test_register_customer() {
        let (app, _) = setup();

        let body = json!({"name": "Ana", "email": "ana@x.com", "password": "s3cret"});
        let response = send(&app, with_json("POST", "/customer", None, body.clone())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/customer/1");
        let json = json_body(response).await;
        assert_eq!(json["id"], 1);
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());

        let response = send(&app, with_json("POST", "/customer", None, body)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(
            &app,
            with_json(
                "POST",
                "/customer",
                None,
                json!({"name": "", "email": "bob@x.com", "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_customers() {
        let (app, state) = setup();

        let response = send(&app, get("/customer")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        seed(&state).await;
        let response = send(&app, get("/customer")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

        let response = send(&app, get("/customer/99")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_referenced_customer_cannot_be_deleted() {
        let (app, state) = setup();
        seed(&state).await;
        let token = bearer();
        send(&app, with_json("POST", "/orders", Some(token.as_str()), order_body(1))).await;

        let response = send(&app, delete("/customer/1", Some(token.as_str()))).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(state.store.count(EntityKind::Customer).await.unwrap(), 1);
    }
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn test_items_and_menus() {
        let (app, _) = setup();

        let response = send(&app, get("/items")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));

        let item = json!({
            "name": "Margherita",
            "image": "https://x.io/m.png",
            "ingredients": "tomato, mozzarella",
            "isVegetarian": true
        });
        let response = send(&app, with_json("POST", "/items", None, item)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/items/1");

        let menu = json!({"itemId": 1, "size": "L", "price": 12.5});
        let response = send(&app, with_json("POST", "/menus", None, menu)).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = send(&app, get("/items/1")).await;
        let json = json_body(response).await;
        assert_eq!(json["isVegetarian"], true);
        assert_eq!(json["menus"][0]["price"], 12.5);

        let response = send(&app, get("/menus")).await;
        let json = json_body(response).await;
        assert_eq!(json[0]["item"]["name"], "Margherita");
    }

    #[tokio::test]
    async fn test_invalid_item_and_dangling_menu() {
        let (app, _) = setup();

        let response = send(
            &app,
            with_json("POST", "/items", None, json!({"name": "X", "image": "not a url"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            with_json(
                "POST",
                "/menus",
                None,
                json!({"itemId": 7, "size": "S", "price": 1.0}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_item_delete_is_restricted_by_menus() {
        let (app, state) = setup();
        seed(&state).await;
        state
            .store
            .create_menu(schema::NewMenu::new(
                schema::ItemId::new(1),
                "S",
                Money::from_cents(500),
            ))
            .await
            .unwrap();
        let token = bearer();

        let response = send(&app, delete("/items/1", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(&app, delete("/items/1", Some(token.as_str()))).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(state.store.count(EntityKind::Item).await.unwrap(), 1);
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn test_login_issues_usable_token() {
        let (app, state) = setup();
        seed(&state).await;

        let response = send(
            &app,
            with_json(
                "POST",
                "/login",
                None,
                json!({"email": "ana@x.com", "password": "s3cret"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert!(json["expiresAt"].is_string());
        let token = format!("Bearer {}", json["token"].as_str().unwrap());

        let response = send(&app, with_json("POST", "/orders", Some(token.as_str()), order_body(1))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (app, state) = setup();
        seed(&state).await;

        for body in [
            json!({"email": "ana@x.com", "password": "wrong"}),
            json!({"email": "nobody@x.com", "password": "s3cret"}),
        ] {
            let response = send(&app, with_json("POST", "/login", None, body)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
