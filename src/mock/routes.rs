use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Json as JsonResponse, Redirect, Response},
};
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::mock::models::{HealthStatus, NewOrder, Order, Pagination, Product, UserProfile, UserSummary};
use crate::mock::MockService;

/// Root endpoint
pub async fn root(Extension(service): Extension<MockService>) -> JsonResponse<Value> {
    JsonResponse(json!({ "message": format!("This is the mock {} service", service) }))
}

/// Service identity
pub async fn info(Extension(service): Extension<MockService>) -> JsonResponse<Value> {
    JsonResponse(json!({ "service": service.name(), "version": "1.0.0" }))
}

/// Health check endpoint
pub async fn health_check(Extension(service): Extension<MockService>) -> JsonResponse<HealthStatus> {
    JsonResponse(HealthStatus {
        status: "UP".to_string(),
        name: service.name().to_string(),
        version: "1.0.0".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Echo endpoint - returns everything the service received
pub async fn echo(
    Extension(service): Extension<MockService>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> JsonResponse<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };

    JsonResponse(json!({
        "service": service.name(),
        "received": {
            "method": method.as_str(),
            "url": uri.to_string(),
            "headers": headers,
            "query_params": query,
            "body": body,
        }
    }))
}

/// Delayed response endpoint - delays for the specified duration
pub async fn delayed_response(
    Extension(service): Extension<MockService>,
    Path(duration_ms): Path<u64>,
) -> JsonResponse<Value> {
    sleep(Duration::from_millis(duration_ms)).await;

    JsonResponse(json!({
        "message": format!("Delayed response ({}ms)", duration_ms),
        "service": service.name(),
    }))
}

/// Error response endpoint - returns the specified status code
pub async fn error_response(
    Extension(service): Extension<MockService>,
    Path(status_code): Path<u16>,
) -> (StatusCode, JsonResponse<Value>) {
    let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        JsonResponse(json!({
            "error": format!("Error response with status {}", status_code),
            "service": service.name(),
        })),
    )
}

/// Temporary redirect to `/echo`, keeping method and body
pub async fn redirect_to_echo() -> Redirect {
    Redirect::temporary("/echo")
}

pub async fn user_profile(headers: HeaderMap) -> Response {
    if !has_bearer(&headers) {
        return unauthorized();
    }

    JsonResponse(UserProfile {
        id: 1,
        username: "testuser".to_string(),
        email: "testuser@example.com".to_string(),
        full_name: "Test User".to_string(),
    })
    .into_response()
}

pub async fn list_users(Query(page): Query<Pagination>) -> JsonResponse<Vec<UserSummary>> {
    let users: Vec<UserSummary> = (1..=3)
        .map(|id| UserSummary {
            id,
            username: format!("user{}", id),
        })
        .collect();
    JsonResponse(page.apply(&users))
}

fn catalog() -> Vec<Product> {
    (1..=3)
        .map(|id| Product {
            id,
            name: format!("Product {}", id),
            price: id * 100,
        })
        .collect()
}

pub async fn list_products(Query(page): Query<Pagination>) -> JsonResponse<Vec<Product>> {
    JsonResponse(page.apply(&catalog()))
}

pub async fn get_product(Path(product_id): Path<u64>) -> Response {
    match catalog().into_iter().find(|p| p.id == product_id) {
        Some(product) => JsonResponse(product).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            JsonResponse(json!({ "detail": "Product not found" })),
        )
            .into_response(),
    }
}

pub async fn list_orders(headers: HeaderMap) -> Response {
    if !has_bearer(&headers) {
        return unauthorized();
    }

    JsonResponse(vec![
        Order {
            id: 1,
            user_id: Some(1),
            product_id: Some(1),
            quantity: 2,
            total: 200,
            status: None,
        },
        Order {
            id: 2,
            user_id: Some(1),
            product_id: Some(2),
            quantity: 1,
            total: 200,
            status: None,
        },
    ])
    .into_response()
}

pub async fn create_order(headers: HeaderMap, body: Bytes) -> Response {
    if !has_bearer(&headers) {
        return unauthorized();
    }

    let order: NewOrder = match serde_json::from_slice(&body) {
        Ok(order) => order,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                JsonResponse(json!({ "detail": "Invalid order data" })),
            )
                .into_response()
        }
    };

    JsonResponse(Order {
        id: 3,
        user_id: order.user_id,
        product_id: order.product_id,
        quantity: order.quantity,
        total: 100 * order.quantity,
        status: Some("created".to_string()),
    })
    .into_response()
}

fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("Bearer "))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        JsonResponse(json!({ "detail": "Authentication required" })),
    )
        .into_response()
}
