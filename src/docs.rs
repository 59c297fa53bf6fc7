use crate::api::employee::{CreateEmployee, EmployeeProfile, UpdateEmployee};
use crate::api::payment::{PaymentView, SettleRequest, SettleResponse};
use crate::api::time_log::{ClockRequest, EmployeeLogsResponse, EmployeeSummary};
use crate::model::employee::Employee;
use crate::model::payment::{PaymentRecord, PaymentStatus};
use crate::model::role::Role;
use crate::model::time_log::{LogStatus, TimeLogEntry};
use crate::models::{AdminLoginReq, ChangePinReq, EmployeeLoginReq, LoginResponse, RegisterAdminReq, UserInfo};
use crate::payroll::UnpaidPreview;
use crate::reporting::{ChartPoint, DashboardCharts, DashboardData, DashboardStats};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timeclock & Payroll API",
        version = "1.0.0",
        description = r#"
## Time tracking and payroll

Employees clock in and out at a kiosk with a 4-digit PIN. Each closed session is priced
at the employee's hourly rate. Admins settle pending sessions into payments for a date
window, once and only once.

### Security
Kiosk routes take the PIN in the body. Everything else uses **JWT Bearer authentication**.

### Money
Amounts are exact decimals. Payments also carry `amount_rounded` (2 dp, half-up).
"#,
    ),
    paths(
        crate::auth::handlers::employee_login,
        crate::auth::handlers::admin_login,
        crate::auth::handlers::register_admin,
        crate::auth::handlers::change_password,

        crate::api::time_log::clock_in,
        crate::api::time_log::clock_out,
        crate::api::time_log::employee_logs,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::employee_profile,

        crate::api::payment::create_payment,
        crate::api::payment::my_payments,
        crate::api::payment::unpaid_logs,

        crate::api::dashboard::dashboard_data
    ),
    components(
        schemas(
            EmployeeLoginReq,
            AdminLoginReq,
            RegisterAdminReq,
            ChangePinReq,
            UserInfo,
            LoginResponse,
            Role,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            EmployeeProfile,
            ClockRequest,
            EmployeeSummary,
            EmployeeLogsResponse,
            TimeLogEntry,
            LogStatus,
            PaymentRecord,
            PaymentStatus,
            PaymentView,
            SettleRequest,
            SettleResponse,
            UnpaidPreview,
            ChartPoint,
            DashboardStats,
            DashboardCharts,
            DashboardData
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and account APIs"),
        (name = "Time", description = "Clock in, clock out and time logs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Payment", description = "Settlement and payment history"),
        (name = "Dashboard", description = "Reporting"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
