use crate::{
    auth::auth::AuthUser,
    error::Result,
    model::payment::PaymentRecord,
    payroll::calculator::round_currency,
    state::AppState,
};
use actix_web::{HttpResponse, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct SettleRequest {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date")]
    pub start_date: String,
    #[schema(example = "2026-01-15", format = "date")]
    pub end_date: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UnpaidQuery {
    pub employee_id: u64,
    /// YYYY-MM-DD
    pub start_date: String,
    /// YYYY-MM-DD
    pub end_date: String,
}

/// A payment plus its amount rounded to cents.
#[derive(Serialize, ToSchema)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: PaymentRecord,
    #[schema(value_type = f64, example = 170.0)]
    pub amount_rounded: Decimal,
}

impl From<PaymentRecord> for PaymentView {
    fn from(payment: PaymentRecord) -> Self {
        Self {
            amount_rounded: round_currency(payment.amount),
            payment,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SettleResponse {
    pub message: String,
    pub payment: PaymentView,
}

/// Settle pending work
///
/// Pays every closed, pending time log whose clock-in falls between the two
/// dates (inclusive, UTC). An empty window answers 200 with `payment: null`.
#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = SettleRequest,
    responses(
        (status = 201, description = "Payment created", body = SettleResponse),
        (status = 200, description = "Nothing to pay", body = Object, example = json!({
            "message": "No pending payments for this period.",
            "payment": null
        })),
        (status = 400, description = "Malformed or inverted date range"),
        (status = 409, description = "Settlement rolled back after a concurrent claim"),
        (status = 503, description = "Storage unavailable, retry")
    ),
    tag = "Payment",
    security(("bearer_auth" = []))
)]
#[instrument(name = "settle", skip(auth, state, req), fields(employee_id = req.employee_id))]
pub async fn create_payment(
    auth: AuthUser,
    state: web::Data<AppState>,
    req: web::Json<SettleRequest>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let payment = state
        .settlement
        .settle(req.employee_id, &req.start_date, &req.end_date)
        .await?;
    info!(payment_id = payment.id, amount = %payment.amount, "Payment created");

    Ok(HttpResponse::Created().json(SettleResponse {
        message: "Payment created successfully".to_string(),
        payment: payment.into(),
    }))
}

/// Payment history, newest first
#[utoipa::path(
    get,
    path = "/api/payments/mine/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Payments", body = [PaymentView]),
        (status = 403, description = "Not your payments")
    ),
    tag = "Payment",
    security(("bearer_auth" = []))
)]
pub async fn my_payments(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let employee_id = path.into_inner();
    auth.require_self_or_admin(employee_id)?;

    let payments: Vec<PaymentView> = state
        .settlement
        .payments_for(employee_id)
        .await?
        .into_iter()
        .map(PaymentView::from)
        .collect();
    Ok(HttpResponse::Ok().json(payments))
}

/// Preview unpaid work
///
/// Same selection as settlement, nothing is written.
#[utoipa::path(
    get,
    path = "/api/payments/unpaid",
    params(UnpaidQuery),
    responses(
        (status = 200, description = "Pending logs and their total", body = crate::payroll::UnpaidPreview),
        (status = 400, description = "Malformed or inverted date range")
    ),
    tag = "Payment",
    security(("bearer_auth" = []))
)]
pub async fn unpaid_logs(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<UnpaidQuery>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let preview = state
        .settlement
        .preview_unpaid(query.employee_id, &query.start_date, &query.end_date)
        .await?;
    Ok(HttpResponse::Ok().json(preview))
}
