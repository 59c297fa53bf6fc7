use crate::{
    auth::{auth::AuthUser, password::hash_password},
    error::{PayrollError, Result},
    model::employee::{DEFAULT_PIN, EmployeeChanges, NewEmployee, is_valid_pin, normalize_email},
    state::AppState,
};
use actix_web::{HttpResponse, web};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane.doe@company.com", format = "email")]
    pub email: String,
    #[schema(example = 20.0, value_type = f64)]
    pub hourly_rate: Decimal,
    /// Four digits. Defaults to 1234.
    #[schema(example = "1234")]
    pub pin: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    #[schema(format = "email")]
    pub email: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub hourly_rate: Option<Decimal>,
    /// Resets the kiosk PIN.
    pub pin: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[schema(value_type = f64)]
    pub hourly_rate: Decimal,
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PayrollError::Validation("Name must not be empty".into()));
    }
    Ok(name.to_string())
}

fn validate_email(email: &str) -> Result<String> {
    let email = normalize_email(email);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(PayrollError::Validation(format!("'{email}' is not a valid email"))),
    }
}

/// Matches the `DECIMAL(12, 4)` column.
const MAX_RATE_SCALE: u32 = 4;
const MAX_RATE: Decimal = dec!(99999999.9999);

fn validate_rate(rate: Decimal) -> Result<Decimal> {
    let rate = rate.normalize();
    if rate.is_sign_negative() {
        return Err(PayrollError::Validation(
            "Hourly rate must not be negative".into(),
        ));
    }
    if rate.scale() > MAX_RATE_SCALE {
        return Err(PayrollError::Validation(format!(
            "Hourly rate allows at most {MAX_RATE_SCALE} decimal places"
        )));
    }
    if rate > MAX_RATE {
        return Err(PayrollError::Validation(format!(
            "Hourly rate must not exceed {MAX_RATE}"
        )));
    }
    Ok(rate)
}

fn validate_pin(pin: &str) -> Result<String> {
    if !is_valid_pin(pin) {
        return Err(PayrollError::Validation("PIN must be exactly 4 digits".into()));
    }
    hash_password(pin)
}

/// Create employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = crate::model::employee::Employee),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already exists")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "create_employee", skip_all)]
pub async fn create_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let payload = payload.into_inner();
    let name = validate_name(&payload.name)?;
    let email = validate_email(&payload.email)?;
    let hourly_rate = validate_rate(payload.hourly_rate)?;
    let pin_hash = validate_pin(payload.pin.as_deref().unwrap_or(DEFAULT_PIN))?;

    if !state.emails.is_available(&email, &state.stores).await? {
        return Err(PayrollError::Conflict("Email already exists".into()));
    }

    let stores = &state.stores;
    let employee = stores
        .call(stores.employees.insert(NewEmployee {
            name,
            email,
            pin_hash,
            hourly_rate,
        }))
        .await?;
    state.emails.mark_taken(&employee.email).await;

    info!(employee_id = employee.id, "Employee created");
    Ok(HttpResponse::Created().json(employee))
}

/// List employees, newest first
#[utoipa::path(
    get,
    path = "/api/employees",
    responses(
        (status = 200, description = "All employees", body = [crate::model::employee::Employee])
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse> {
    auth.require_admin()?;

    let stores = &state.stores;
    let employees = stores.call(stores.employees.list()).await?;
    Ok(HttpResponse::Ok().json(employees))
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee", body = crate::model::employee::Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let id = path.into_inner();
    let stores = &state.stores;
    let employee = stores
        .call(stores.employees.get(id))
        .await?
        .ok_or_else(|| PayrollError::NotFound(format!("Employee {id}")))?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update employee
///
/// Only the provided fields change.
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Updated employee", body = crate::model::employee::Employee),
        (status = 400, description = "No fields to update"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Email already exists")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "update_employee", skip(auth, state, payload))]
pub async fn update_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployee>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let id = path.into_inner();
    let payload = payload.into_inner();
    let changes = EmployeeChanges {
        name: payload.name.as_deref().map(validate_name).transpose()?,
        email: payload.email.as_deref().map(validate_email).transpose()?,
        pin_hash: payload.pin.as_deref().map(validate_pin).transpose()?,
        hourly_rate: payload.hourly_rate.map(validate_rate).transpose()?,
    };
    if changes.is_empty() {
        return Err(PayrollError::Validation("No fields to update".into()));
    }

    let stores = &state.stores;
    let current = stores
        .call(stores.employees.get(id))
        .await?
        .ok_or_else(|| PayrollError::NotFound(format!("Employee {id}")))?;

    let new_email = changes
        .email
        .clone()
        .filter(|email| *email != current.email);
    if let Some(email) = &new_email {
        if !state.emails.is_available(email, stores).await? {
            return Err(PayrollError::Conflict("Email already exists".into()));
        }
    }

    let updated = stores
        .call(stores.employees.update(id, changes))
        .await?
        .ok_or_else(|| PayrollError::NotFound(format!("Employee {id}")))?;

    if let Some(email) = new_email {
        state.emails.release(&current.email).await;
        state.emails.mark_taken(&email).await;
    }

    info!("Employee updated");
    Ok(HttpResponse::Ok().json(updated))
}

/// Delete employee
///
/// Refused while the employee is clocked in or has unsettled work.
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee deleted"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee is clocked in or has unsettled work")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
#[instrument(name = "delete_employee", skip(auth, state))]
pub async fn delete_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    auth.require_admin()?;

    let id = path.into_inner();
    let stores = &state.stores;
    let employee = stores
        .call(stores.employees.get(id))
        .await?
        .ok_or_else(|| PayrollError::NotFound(format!("Employee {id}")))?;

    if !stores.call(stores.employees.delete(id)).await? {
        return Err(PayrollError::NotFound(format!("Employee {id}")));
    }
    state.emails.release(&employee.email).await;

    info!("Employee deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee deleted successfully" })))
}

/// Employee profile
#[utoipa::path(
    get,
    path = "/api/employees/profile/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Profile", body = EmployeeProfile),
        (status = 403, description = "Not your profile"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn employee_profile(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    auth.require_self_or_admin(id)?;

    let stores = &state.stores;
    let employee = stores
        .call(stores.employees.get(id))
        .await?
        .ok_or_else(|| PayrollError::NotFound(format!("Employee {id}")))?;

    Ok(HttpResponse::Ok().json(EmployeeProfile {
        id: employee.id,
        name: employee.name,
        email: employee.email,
        hourly_rate: employee.hourly_rate,
    }))
}
