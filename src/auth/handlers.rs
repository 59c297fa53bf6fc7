use crate::{
    auth::{
        auth::AuthUser,
        jwt::generate_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{PayrollError, Result},
    model::{
        admin::NewAdmin,
        employee::{EmployeeChanges, is_valid_pin, normalize_email},
        role::Role,
    },
    models::{AdminLoginReq, ChangePinReq, EmployeeLoginReq, LoginResponse, RegisterAdminReq, UserInfo},
    state::AppState,
};
use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::{debug, info, instrument};

fn invalid_credentials() -> PayrollError {
    PayrollError::Unauthorized("Invalid credentials".to_string())
}

/// Employee login
#[utoipa::path(
    post,
    path = "/api/auth/employee",
    request_body = EmployeeLoginReq,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "error": "Unauthorized: Invalid credentials",
            "error_code": "UNAUTHORIZED"
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "employee_login", skip(state, config, req), fields(email = %req.email))]
pub async fn employee_login(
    req: web::Json<EmployeeLoginReq>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    info!("Login request received");

    let email = normalize_email(&req.email);
    if email.is_empty() || req.pin.is_empty() {
        return Err(PayrollError::Validation("Email and PIN are required".into()));
    }

    let stores = &state.stores;
    let employee = stores
        .call(stores.employees.find_by_email(&email))
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&req.pin, &employee.pin_hash) {
        info!("Invalid credentials: PIN mismatch");
        return Err(invalid_credentials());
    }

    let token = generate_token(
        employee.id,
        employee.email.clone(),
        Role::Employee,
        &config.jwt_secret,
        config.token_ttl,
    )?;

    info!(employee_id = employee.id, "Login successful");
    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: UserInfo {
            id: employee.id,
            name: employee.name,
            email: employee.email,
            role: Role::Employee,
        },
    }))
}

/// Admin login
#[utoipa::path(
    post,
    path = "/api/auth/admin",
    request_body = AdminLoginReq,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "admin_login", skip(state, config, req), fields(email = %req.email))]
pub async fn admin_login(
    req: web::Json<AdminLoginReq>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    info!("Login request received");

    let email = normalize_email(&req.email);
    let stores = &state.stores;
    let admin = stores
        .call(stores.admins.find_by_email(&email))
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&req.password, &admin.password_hash) {
        info!("Invalid credentials: password mismatch");
        return Err(invalid_credentials());
    }

    let token = generate_token(
        admin.id,
        admin.email.clone(),
        admin.role,
        &config.jwt_secret,
        config.token_ttl,
    )?;

    info!(admin_id = admin.id, "Login successful");
    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: UserInfo {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            role: admin.role,
        },
    }))
}

/// Create an admin account
///
/// Open while no admin exists; afterwards only admins may add more.
#[utoipa::path(
    post,
    path = "/api/auth/register-admin",
    request_body = RegisterAdminReq,
    responses(
        (status = 201, description = "Admin account created", body = UserInfo),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Admin with this email already exists")
    ),
    tag = "Auth",
    security((), ("bearer_auth" = []))
)]
pub async fn register_admin(
    auth: Option<AuthUser>,
    req: web::Json<RegisterAdminReq>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let stores = &state.stores;

    if stores.call(stores.admins.count()).await? > 0 {
        match &auth {
            Some(user) => user.require_admin()?,
            None => return Err(PayrollError::Unauthorized("Admin token required".into())),
        }
    }

    let req = req.into_inner();
    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(PayrollError::Validation(
            "Name, email and password must not be empty".into(),
        ));
    }

    let admin = stores
        .call(stores.admins.insert(NewAdmin {
            name,
            email,
            password_hash: hash_password(&req.password)?,
        }))
        .await?;

    info!(admin_id = admin.id, "Admin account created");
    Ok(HttpResponse::Created().json(json!({
        "message": "Admin account created successfully",
        "user": UserInfo {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            role: admin.role,
        },
    })))
}

/// Change own PIN
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePinReq,
    responses(
        (status = 200, description = "PIN changed", body = Object, example = json!({
            "message": "Password changed successfully"
        })),
        (status = 400, description = "Invalid old PIN or malformed new PIN")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    auth: AuthUser,
    req: web::Json<ChangePinReq>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let stores = &state.stores;

    let employee = stores
        .call(stores.employees.get(employee_id))
        .await?
        .ok_or_else(|| PayrollError::NotFound("Employee not found".into()))?;

    if !verify_password(&req.old_pin, &employee.pin_hash) {
        return Err(PayrollError::Validation("Invalid old PIN".into()));
    }
    if !is_valid_pin(&req.new_pin) {
        return Err(PayrollError::Validation("PIN must be exactly 4 digits".into()));
    }

    let changes = EmployeeChanges {
        pin_hash: Some(hash_password(&req.new_pin)?),
        ..Default::default()
    };
    stores
        .call(stores.employees.update(employee_id, changes))
        .await?;

    debug!(employee_id, "PIN changed");
    Ok(HttpResponse::Ok().json(json!({ "message": "Password changed successfully" })))
}
