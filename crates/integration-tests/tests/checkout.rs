//! Placing orders and reading order history.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use emporium_integration_tests::TestApp;

#[tokio::test]
async fn test_checkout_creates_order_and_empties_cart() {
    let app = TestApp::new();
    let ada = app.customer("ada@example.com", "5550100000").await;
    let pineapple = app.product("Pineapple", "3", true).await;
    let cart_uri = format!("/users/{}/cart", ada.id);
    let orders_uri = format!("/users/{}/orders", ada.id);
    let token = Some(ada.token.as_str());

    let cart = app
        .post(&cart_uri, token, json!({"productId": pineapple, "quantity": 2}))
        .await;
    let cart_id = cart.data()["id"].as_str().unwrap().to_string();

    let reply = app.post(&orders_uri, token, json!({"cartId": cart_id})).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
    assert_eq!(reply.data()["status"], "Placed");
    assert_eq!(reply.data()["totalQuantity"], 2);
    assert_eq!(reply.data()["totalPrice"], "6");
    let order_id = reply.data()["id"].as_str().unwrap().to_string();

    let summary = app.get(&cart_uri, token).await;
    assert_eq!(summary.data()["id"], cart_id.as_str());
    assert_eq!(summary.data()["totalQuantity"], 0);
    assert_eq!(summary.data()["totalPrice"], "0");

    let history = app.get(&orders_uri, token).await;
    assert_eq!(history.status, StatusCode::OK);
    let orders = history.data().as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["items"][0]["product"]["title"], "Pineapple");

    let detail = app
        .get(&format!("{orders_uri}/{order_id}"), token)
        .await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.data()["id"], order_id.as_str());

    // The emptied cart cannot be checked out again.
    let reply = app.post(&orders_uri, token, json!({"cartId": cart_id})).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.get(&orders_uri, token).await.data().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkout_of_foreign_cart_is_forbidden() {
    let app = TestApp::new();
    let alice = app.customer("alice@example.com", "5550100001").await;
    let bob = app.customer("bob@example.com", "5550100002").await;
    let pineapple = app.product("Pineapple", "3", true).await;

    let cart = app
        .post(
            &format!("/users/{}/cart", alice.id),
            Some(&alice.token),
            json!({"productId": pineapple, "quantity": 1}),
        )
        .await;
    let cart_id = cart.data()["id"].as_str().unwrap();

    let reply = app
        .post(
            &format!("/users/{}/orders", bob.id),
            Some(&bob.token),
            json!({"cartId": cart_id}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app
        .post(
            &format!("/users/{}/orders", bob.id),
            Some(&bob.token),
            json!({}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.message(), "Cart id is required!");
}

#[tokio::test]
async fn test_foreign_order_is_not_found() {
    let app = TestApp::new();
    let alice = app.customer("alice@example.com", "5550100001").await;
    let bob = app.customer("bob@example.com", "5550100002").await;
    let pineapple = app.product("Pineapple", "3", true).await;

    let cart = app
        .post(
            &format!("/users/{}/cart", alice.id),
            Some(&alice.token),
            json!({"productId": pineapple, "quantity": 1}),
        )
        .await;
    let order = app
        .post(
            &format!("/users/{}/orders", alice.id),
            Some(&alice.token),
            json!({"cartId": cart.data()["id"]}),
        )
        .await;
    let order_id = order.data()["id"].as_str().unwrap();

    let reply = app
        .get(
            &format!("/users/{}/orders/{order_id}", bob.id),
            Some(&bob.token),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}
