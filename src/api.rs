use serde::{
    Deserialize, Deserializer, Serialize,
    de::DeserializeOwned,
};
use serde_json::json;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Path, Query, Request, State},
    http::StatusCode,
    routing::{delete, get, post},
};

use crate::{
    orders::{Order, OrderKind, Side, Strategy, price_from_f64},
    state::AppState,
};

type ApiErr = (StatusCode, Json<serde_json::Value>);
fn err(status: StatusCode, msg: &str) -> ApiErr {
    (status, Json(json!({ "error": msg })))
}

/// JSON extractor that logs rejected payloads before failing the request.
/// Malformed JSON is a transport-level failure (422); every well-formed
/// request gets a 200 with an in-band success flag.
pub struct LoggedJson<T>(pub T);

impl<S, T> FromRequest<S> for LoggedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiErr;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        //capture request details for logging
        let method = req.method().clone();
        let uri = req.uri().clone();
        // read full body
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| err(StatusCode::BAD_REQUEST, &e.to_string()))?;

        match serde_json::from_slice::<T>(&bytes) {
            Ok(val) => Ok(LoggedJson(val)),
            Err(e) => {
                //cap body preview to avoid giant logs
                let preview = String::from_utf8_lossy(&bytes);
                let preview = &preview[..preview.len().min(4096)];
                warn!(
                    error = %e,
                    %method,
                    uri = %uri,
                    body_preview = %preview,
                    "request rejected: JSON deserialization failed"
                );
                Err(err(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()))
            }
        }
    }
}

// Wire enums arrive as strings; unknown values fold into the safe defaults
// (Other / Buy / Limit) instead of failing the request.

fn de_strategy<'de, D>(deserializer: D) -> Result<Strategy, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(match s.as_str() {
        "QuantLongTerm" => Strategy::QuantLongTerm,
        "HighFrequency" => Strategy::HighFrequency,
        "HedgeFund" => Strategy::HedgeFund,
        "Algorithmic" => Strategy::Algorithmic,
        "InvestmentBank" => Strategy::InvestmentBank,
        "PensionFund" => Strategy::PensionFund,
        "Insurance" => Strategy::Insurance,
        _ => Strategy::default(),
    })
}

fn de_side<'de, D>(deserializer: D) -> Result<Side, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(match s.as_str() {
        "Sell" => Side::Sell,
        "Buy" => Side::Buy,
        _ => Side::default(),
    })
}

fn de_kind<'de, D>(deserializer: D) -> Result<OrderKind, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(match s.as_str() {
        "Market" => OrderKind::Market,
        "Limit" => OrderKind::Limit,
        _ => OrderKind::default(),
    })
}

/// Request payload for `POST /orders`.
///
/// - `strategy`: client category, e.g. `"HedgeFund"` (unknown → `"Other"`)
/// - `side`: `"Buy"` or `"Sell"`
/// - `kind`: `"Limit"` or `"Market"`
/// - `price`: limit price (ignored for market orders)
/// - `quantity`: how many units to trade
#[derive(Deserialize)]
pub struct SubmitOrder {
    #[serde(default, deserialize_with = "de_strategy")]
    pub strategy: Strategy,
    #[serde(default, deserialize_with = "de_side")]
    pub side: Side,
    #[serde(default, deserialize_with = "de_kind")]
    pub kind: OrderKind,
    #[serde(default)]
    pub price: f64,
    pub quantity: i64,
}

/// Response for `POST /orders`. `order_id` acknowledges acceptance for
/// matching, not execution; it is zero when `success` is false.
#[derive(Serialize, Deserialize)]
pub struct SubmitAck {
    pub success: bool,
    pub message: String,
    pub order_id: u64,
}

#[derive(Serialize, Deserialize)]
pub struct HealthReply {
    pub healthy: bool,
    pub status: String,
    pub uptime_seconds: u64,
    pub active_orders: u64,
    pub total_orders_processed: u64,
}

#[derive(Serialize, Deserialize)]
pub struct StatsReply {
    pub success: bool,
    pub total_orders_processed: u64,
    pub orders_per_second_current: f64,
    pub orders_per_second_peak: f64,
    pub queue_depth_current: usize,
    pub queue_depth_max: usize,
    pub uptime_seconds: u64,
}

#[derive(Serialize, Deserialize)]
pub struct PriceReply {
    pub success: bool,
    pub message: String,
    pub price: f64,
}

/// One resting order in a `LevelReply`.
#[derive(Serialize, Deserialize)]
pub struct RestingOrder {
    pub id: u64,
    pub price: f64,
    pub quantity: i64,
}

#[derive(Serialize, Deserialize)]
pub struct LevelReply {
    pub success: bool,
    pub message: String,
    pub orders: Vec<RestingOrder>,
}

#[derive(Serialize, Deserialize)]
pub struct CancelReply {
    pub success: bool,
    pub message: String,
}

/// `POST /orders`
///
/// Builds an order from the translated wire fields and hands it to the
/// engine. The ack means "enqueued for matching". Zero and negative
/// quantities are accepted; the matcher treats them as no-ops. The only
/// in-band rejection is a price the tick grid cannot represent.
pub async fn create_order(
    State(state): State<AppState>,
    LoggedJson(payload): LoggedJson<SubmitOrder>,
) -> Json<SubmitAck> {
    state.stats.record_request();

    // market orders carry price zero by convention; matching ignores it
    let price = match payload.kind {
        OrderKind::Market => Some(0),
        OrderKind::Limit => price_from_f64(payload.price),
    };
    let Some(price) = price else {
        warn!(
            price = payload.price,
            quantity = payload.quantity,
            side = ?payload.side,
            "order rejected: unrepresentable price"
        );
        return Json(SubmitAck {
            success: false,
            message: "price must be a finite, non-negative number".to_string(),
            order_id: 0,
        });
    };

    let order = Order::new(payload.strategy, payload.quantity, price, payload.side, payload.kind);
    let order_id = state.engine.submit(order);
    state.stats.record_accepted();
    info!(
        order_id,
        side = ?payload.side,
        kind = ?payload.kind,
        quantity = payload.quantity,
        "order accepted"
    );

    Json(SubmitAck {
        success: true,
        message: "order accepted for matching".to_string(),
        order_id,
    })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthReply> {
    state.stats.record_request();
    Json(HealthReply {
        healthy: true,
        status: "service is running".to_string(),
        uptime_seconds: state.stats.uptime_seconds(),
        active_orders: 0,
        total_orders_processed: state.stats.orders_accepted(),
    })
}

/// `GET /stats`
pub async fn performance_stats(State(state): State<AppState>) -> Json<StatsReply> {
    state.stats.record_request();
    Json(StatsReply {
        success: true,
        total_orders_processed: state.stats.orders_accepted(),
        orders_per_second_current: state.stats.current_ops(),
        orders_per_second_peak: state.stats.peak_ops(),
        queue_depth_current: state.engine.queue_depth(),
        queue_depth_max: state.engine.queue_capacity(),
        uptime_seconds: state.stats.uptime_seconds(),
    })
}

// The book lives on the matcher thread, so the read endpoints below are
// declared but answer success=false until reads are routed through the
// intake path as commands.

/// `GET /book/best-bid`
pub async fn best_bid(State(state): State<AppState>) -> Json<PriceReply> {
    state.stats.record_request();
    Json(PriceReply {
        success: false,
        message: "best bid is not available: book reads are not yet routed through the matcher"
            .to_string(),
        price: 0.0,
    })
}

/// `GET /book/best-ask`
pub async fn best_ask(State(state): State<AppState>) -> Json<PriceReply> {
    state.stats.record_request();
    Json(PriceReply {
        success: false,
        message: "best ask is not available: book reads are not yet routed through the matcher"
            .to_string(),
        price: 0.0,
    })
}

#[derive(Deserialize)]
pub struct LevelQuery {
    #[serde(default, deserialize_with = "de_side")]
    pub side: Side,
    #[serde(default)]
    pub price: f64,
}

/// `GET /book/orders?side=&price=`
pub async fn orders_at_price(
    State(state): State<AppState>,
    Query(query): Query<LevelQuery>,
) -> Json<LevelReply> {
    state.stats.record_request();
    Json(LevelReply {
        success: false,
        message: format!(
            "orders at {:?} {} are not available: book reads are not yet routed through the matcher",
            query.side, query.price
        ),
        orders: Vec::new(),
    })
}

/// `DELETE /orders/{id}`
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<u64>,
) -> Json<CancelReply> {
    state.stats.record_request();
    warn!(order_id, "cancel requested but not yet wired to the book");
    Json(CancelReply {
        success: false,
        message: "cancel is not available: book writes other than submission are not yet routed through the matcher"
            .to_string(),
    })
}

/// Constructs the application's `Router` with all routes and shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{id}", delete(cancel_order))
        .route("/health", get(health))
        .route("/stats", get(performance_stats))
        .route("/book/best-bid", get(best_bid))
        .route("/book/best-ask", get(best_ask))
        .route("/book/orders", get(orders_at_price))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .include_headers(false)
                        .level(tracing::Level::TRACE),
                )
                .on_response(DefaultOnResponse::new().level(tracing::Level::TRACE)),
        )
        .with_state(state)
}
