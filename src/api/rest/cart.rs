use std::sync::Arc;

use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::cart::{quote, Quote};
use crate::models::order::parse_line_items;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/cart/quote", post(quote_cart))
}

#[derive(Deserialize)]
pub struct QuoteRequest {
    pub items: Value,
    pub coupon_code: Option<String>,
}

/// Prices a cart without creating anything. The storefront calls this on
/// every cart or coupon change.
async fn quote_cart(Json(payload): Json<QuoteRequest>) -> Json<Quote> {
    let items = parse_line_items(&payload.items);
    Json(quote(&items, payload.coupon_code.as_deref()))
}
