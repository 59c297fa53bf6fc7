use crate::model::role::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct EmployeeLoginReq {
    #[schema(example = "jane@company.com", format = "email")]
    pub email: String,
    #[schema(example = "1234")]
    pub pin: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AdminLoginReq {
    #[schema(example = "admin@company.com", format = "email")]
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RegisterAdminReq {
    pub name: String,
    #[schema(format = "email")]
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePinReq {
    #[schema(example = "1234")]
    pub old_pin: String,
    #[schema(example = "4321")]
    pub new_pin: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Login email
    pub sub: String,
    pub role: Role,
    /// Employee or admin id, depending on `role`
    pub principal_id: u64,
    pub exp: usize,
    pub jti: String,
}
