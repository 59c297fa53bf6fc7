use crate::{auth::auth::AuthUser, error::Result, reporting, state::AppState};
use actix_web::{HttpResponse, web};
use chrono::Utc;

/// Dashboard stats and charts
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Current figures", body = reporting::DashboardData)
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn dashboard_data(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    auth.require_admin()?;

    let data = reporting::collect(&state.stores, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(data))
}
