//! Order creation, result and history handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument};

use shanghuyun_core::{OrderId, OrderStatus, decimal_to_f64};

use crate::db::orders::OrderRepository;
use crate::error::{ApiError, Result};
use crate::filters;
use crate::middleware::{RequireAuth, RequirePageAuth};
use crate::models::{OrderCounts, OrderDetail, PagerView, Paginated};
use crate::routes::PageContext;
use crate::services::orders::{OrderError, OrderItemResponse, parse_items};
use crate::state::AppState;

/// Create a pending order from `{"items": [...]}`.
#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Bytes,
) -> std::result::Result<Json<Value>, ApiError> {
    let body: Value = serde_json::from_slice(&body).map_err(|_| OrderError::InvalidJson)?;
    let requests = parse_items(&body)?;

    let created = OrderRepository::new(state.pool())
        .create_order(user.id, &requests)
        .await?;
    info!(order_id = %created.order_id, "Order created via API");

    let items: Vec<OrderItemResponse> = created.plan.lines.iter().map(Into::into).collect();
    Ok(Json(json!({
        "success": true,
        "order_id": created.order_id.as_i32(),
        "merchant_trade_no": created.merchant_trade_no,
        "total_amount": decimal_to_f64(created.plan.total),
        "status": OrderStatus::Pending.as_str(),
        "items": items,
        "message": "Order created successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResultQuery {
    pub order_id: Option<String>,
}

/// Order result template. `order` is `None` when the order does not exist
/// or belongs to someone else.
#[derive(Template, WebTemplate)]
#[template(path = "orders/result.html")]
pub struct OrderResultTemplate {
    pub page: PageContext,
    pub order: Option<OrderDetail>,
}

/// Show an order to its owner or to staff.
#[instrument(skip(state, page))]
pub async fn result(
    State(state): State<AppState>,
    Query(query): Query<ResultQuery>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let order_id = query
        .order_id
        .as_deref()
        .and_then(|id| id.parse::<OrderId>().ok());

    let order = match (order_id, &page.user) {
        (Some(id), Some(user)) => OrderRepository::new(state.pool())
            .get_detail(id)
            .await?
            .filter(|detail| detail.order.visible_to(user.id, user.is_staff)),
        _ => None,
    };

    Ok(OrderResultTemplate { page, order })
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<String>,
    pub status: Option<String>,
}

impl HistoryQuery {
    /// The status filter; `all`, blank and unknown values mean none.
    fn status(&self) -> Option<OrderStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/history.html")]
pub struct OrderHistoryTemplate {
    pub page: PageContext,
    pub orders: Paginated<OrderDetail>,
    pub pager: PagerView,
    pub counts: OrderCounts,
    pub current_status: &'static str,
    pub statuses: [OrderStatus; 3],
}

/// List the signed-in user's orders, ten per page.
#[instrument(skip(state, page), fields(user_id = %user.id))]
pub async fn history(
    State(state): State<AppState>,
    RequirePageAuth(user): RequirePageAuth,
    Query(query): Query<HistoryQuery>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let status = query.status();
    let repo = OrderRepository::new(state.pool());
    let orders = repo
        .history(user.id, status, query.page.as_deref())
        .await?;
    let counts = repo.counts(user.id).await?;

    let current_status = status.map_or("all", OrderStatus::as_str);
    let pager = PagerView::new(
        &orders,
        &format!("/api/v1/order/history?status={current_status}&"),
    );

    Ok(OrderHistoryTemplate {
        page,
        orders,
        pager,
        counts,
        current_status,
        statuses: OrderStatus::ALL,
    })
}
