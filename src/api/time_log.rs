use crate::{
    auth::{auth::AuthUser, password::verify_password},
    error::{PayrollError, Result},
    model::{employee::Employee, time_log::TimeLogEntry},
    state::AppState,
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Kiosk request: the PIN stands in for a login.
#[derive(Deserialize, ToSchema)]
pub struct ClockRequest {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "1234")]
    pub pin: String,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeSummary {
    pub id: u64,
    pub name: String,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeLogsResponse {
    pub message: String,
    pub employee: EmployeeSummary,
    pub total_logs: usize,
    pub logs: Vec<TimeLogEntry>,
}

async fn check_pin(state: &AppState, employee_id: u64, pin: &str) -> Result<Employee> {
    let stores = &state.stores;
    let employee = stores
        .call(stores.employees.get(employee_id))
        .await?
        .ok_or_else(|| PayrollError::NotFound("Employee not found".into()))?;

    if !verify_password(pin, &employee.pin_hash) {
        return Err(PayrollError::Unauthorized("Invalid PIN".into()));
    }
    Ok(employee)
}

/// Clock in
#[utoipa::path(
    post,
    path = "/api/time/clock-in",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Session opened", body = Object, example = json!({
            "message": "Clocked in successfully",
            "log": { "id": 1, "employee_id": 1, "clock_in": "2026-01-05T09:00:00Z", "status": "pending" }
        })),
        (status = 401, description = "Invalid PIN"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Already clocked in")
    ),
    tag = "Time"
)]
#[instrument(name = "clock_in", skip(state, req), fields(employee_id = req.employee_id))]
pub async fn clock_in(
    state: web::Data<AppState>,
    req: web::Json<ClockRequest>,
) -> Result<HttpResponse> {
    check_pin(&state, req.employee_id, &req.pin).await?;

    let log = state.ledger.clock_in(req.employee_id).await?;
    info!(entry_id = log.id, "Clocked in");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Clocked in successfully",
        "log": log,
    })))
}

/// Clock out
#[utoipa::path(
    post,
    path = "/api/time/clock-out",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Session closed and priced", body = Object, example = json!({
            "message": "Clocked out successfully",
            "log": {
                "id": 1, "employee_id": 1,
                "clock_in": "2026-01-05T09:00:00Z", "clock_out": "2026-01-05T17:30:00Z",
                "total_hours": 8.5, "pay_amount": 170.0, "status": "pending"
            }
        })),
        (status = 401, description = "Invalid PIN"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "No active session")
    ),
    tag = "Time"
)]
#[instrument(name = "clock_out", skip(state, req), fields(employee_id = req.employee_id))]
pub async fn clock_out(
    state: web::Data<AppState>,
    req: web::Json<ClockRequest>,
) -> Result<HttpResponse> {
    check_pin(&state, req.employee_id, &req.pin).await?;

    let log = state.ledger.clock_out(req.employee_id).await?;
    info!(entry_id = log.id, "Clocked out");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Clocked out successfully",
        "log": log,
    })))
}

/// Time logs of one employee, newest first
#[utoipa::path(
    get,
    path = "/api/time/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Logs", body = EmployeeLogsResponse),
        (status = 403, description = "Not your logs"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Time",
    security(("bearer_auth" = []))
)]
pub async fn employee_logs(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let employee_id = path.into_inner();
    auth.require_self_or_admin(employee_id)?;

    let stores = &state.stores;
    let employee = stores
        .call(stores.employees.get(employee_id))
        .await?
        .ok_or_else(|| PayrollError::NotFound("Employee not found".into()))?;
    let logs = state.ledger.logs_for(employee_id).await?;

    Ok(HttpResponse::Ok().json(EmployeeLogsResponse {
        message: format!(
            "Successfully retrieved {} log(s) for employee {}",
            logs.len(),
            employee.name
        ),
        employee: EmployeeSummary {
            id: employee.id,
            name: employee.name,
            email: employee.email,
        },
        total_logs: logs.len(),
        logs,
    }))
}
