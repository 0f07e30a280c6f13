//! Product listing, search, and seller ownership over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use reqwest::{Method, StatusCode};
use serde_json::json;

use ekart_integration_tests::TestContext;

#[tokio::test]
async fn test_only_sellers_list_products() {
    let ctx = TestContext::new().await;
    let buyer = ctx.register("buyer@ekart.dev", "buyer").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/products",
            Some(&buyer),
            Some(json!({ "title": "Fake", "category": "toys", "price": "1.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/products",
            None,
            Some(json!({ "title": "Fake", "category": "toys", "price": "1.00" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_product_validation() {
    let ctx = TestContext::new().await;
    let seller = ctx.register("seller@ekart.dev", "seller").await;

    for body in [
        json!({ "title": "  ", "category": "toys", "price": "1.00" }),
        json!({ "title": "Kite", "category": "spaceships", "price": "1.00" }),
        json!({ "title": "Kite", "category": "toys", "price": "0" }),
        json!({ "title": "Kite", "category": "toys", "price": "1.00", "stock_quantity": -1 }),
        json!({ "title": "Kite", "category": "toys", "price": "10000000000.00" }),
        json!({ "title": "Kite", "category": "toys", "price": "50000000000000000000000000000" }),
    ] {
        let (status, error) = ctx
            .send(Method::POST, "/api/products", Some(&seller), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{error}");
    }
}

#[tokio::test]
async fn test_listing_search_and_categories() {
    let ctx = TestContext::new().await;
    let seller = ctx.register("seller@ekart.dev", "seller").await;
    ctx.create_product(&seller, "Studio headphones", "120.00", 5).await;
    ctx.create_product(&seller, "Desk lamp", "35.00", 0).await;
    ctx.create_product(&seller, "Wireless headphones", "80.00", 2).await;

    let (status, page) = ctx.send(Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 1);

    let (_, page) = ctx
        .send(Method::GET, "/api/products/search?q=headphones&sort_by=price_asc", None, None)
        .await;
    let titles: Vec<_> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Wireless headphones", "Studio headphones"]);

    let (_, page) = ctx
        .send(Method::GET, "/api/products?in_stock=true&max_price=100", None, None)
        .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "Wireless headphones");

    let (_, page) = ctx
        .send(Method::GET, "/api/products?per_page=2&page=2", None, None)
        .await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let (status, _) = ctx
        .send(Method::GET, "/api/products?per_page=0", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, categories) = ctx
        .send(Method::GET, "/api/products/categories", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        categories
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["id"] == "electronics")
    );
}

#[tokio::test]
async fn test_owner_only_update_and_delete() {
    let ctx = TestContext::new().await;
    let owner = ctx.register("owner@ekart.dev", "seller").await;
    let rival = ctx.register("rival@ekart.dev", "seller").await;
    let id = ctx.create_product(&owner, "Espresso grinder", "249.00", 4).await;
    let uri = format!("/api/products/{id}");

    let (status, _) = ctx
        .send(Method::PUT, &uri, Some(&rival), Some(json!({ "price": "1.00" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = ctx.send(Method::DELETE, &uri, Some(&rival), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = ctx
        .send(Method::PUT, &uri, Some(&owner), Some(json!({ "price": "229.00" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], "229.00");
    assert_eq!(updated["title"], "Espresso grinder");

    let (_, mine) = ctx.send(Method::GET, "/api/products/mine", Some(&owner), None).await;
    assert_eq!(mine["total"], 1);
    let (_, theirs) = ctx.send(Method::GET, "/api/products/mine", Some(&rival), None).await;
    assert_eq!(theirs["total"], 0);

    let (status, body) = ctx.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product deleted successfully");

    let (status, _) = ctx.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .send(Method::GET, "/api/products/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
