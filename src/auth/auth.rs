use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::PayrollError;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

/// The caller behind a bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    /// Employee id for employees, admin id for admins.
    pub principal_id: u64,
    pub email: String,
    pub role: Role,
}

pub(crate) fn bearer_token(req: &HttpRequest) -> Result<&str, PayrollError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| PayrollError::Unauthorized("Missing Authorization header".into()))?
        .to_str()
        .map_err(|_| {
            PayrollError::Unauthorized("Invalid Authorization header encoding".into())
        })?;

    header.strip_prefix("Bearer ").ok_or_else(|| {
        PayrollError::Unauthorized("Authorization header must start with Bearer".into())
    })
}

pub(crate) fn authenticate(req: &HttpRequest) -> Result<AuthUser, PayrollError> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| PayrollError::Internal("App config missing".into()))?;

    let token = bearer_token(req)?;
    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| PayrollError::Unauthorized("Invalid or expired token".into()))?;

    Ok(AuthUser {
        principal_id: claims.principal_id,
        email: claims.sub,
        role: claims.role,
    })
}

impl FromRequest for AuthUser {
    type Error = PayrollError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // already decoded by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        ready(authenticate(req))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), PayrollError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(PayrollError::Forbidden("Admin only".into()))
        }
    }

    /// Employees may only reach their own records.
    pub fn require_self_or_admin(&self, employee_id: u64) -> Result<(), PayrollError> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Employee if self.principal_id == employee_id => Ok(()),
            Role::Employee => Err(PayrollError::Forbidden(
                "Employees can only access their own records".into(),
            )),
        }
    }

    pub fn require_employee(&self) -> Result<u64, PayrollError> {
        match self.role {
            Role::Employee => Ok(self.principal_id),
            Role::Admin => Err(PayrollError::Forbidden("Employee only".into())),
        }
    }
}
