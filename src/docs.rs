// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::update_me,

        // --- Access ---
        handlers::access::list_permissions,
        handlers::access::get_session,
        handlers::access::get_navigation,
        handlers::access::check_page,
        handlers::access::migrate_legacy,

        // --- Account ---
        handlers::access::update_personal_data,
        handlers::access::change_password,

        // --- Technicians ---
        handlers::technicians::create_technician,
        handlers::technicians::list_technicians,
        handlers::technicians::replace_permissions,
        handlers::technicians::toggle_permission,
        handlers::technicians::link_professional,
        handlers::technicians::delete_technician,

        // --- Records ---
        handlers::records::list_records,
        handlers::records::get_record,
        handlers::records::create_record,
        handlers::records::update_record,
        handlers::records::delete_record,
        handlers::records::release_vehicle,

        // --- Dashboard ---
        handlers::dashboard::get_dashboard,

        // --- Settings ---
        handlers::settings::get_settings,
        handlers::settings::update_logo,
        handlers::settings::remove_logo,

        // --- Realtime ---
        handlers::stream::stream_snapshots,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::RegisterOwnerPayload,
            models::auth::LoginPayload,
            models::auth::AuthResponse,
            models::auth::Identity,
            models::auth::ChangePasswordPayload,
            models::auth::UpdateProfilePayload,

            // --- Access ---
            models::access::Role,
            models::access::ResolutionSource,
            models::access::SessionView,
            models::permissions::PermissionKey,
            models::permissions::Permissions,
            models::permissions::Page,
            models::permissions::NavItem,
            models::subscription::SubscriptionState,
            handlers::access::PermissionInfo,
            services::page_gate::PageDecision,
            services::page_gate::DenialReason,
            services::migration_service::MigrationReport,

            // --- Technicians ---
            models::technician::CreateTechnicianPayload,
            models::technician::ReplacePermissionsPayload,
            models::technician::TogglePermissionPayload,
            models::technician::LinkProfessionalPayload,
            models::technician::TechnicianSummary,
            models::technician::UpdatePersonalDataPayload,

            // --- Dashboard ---
            models::dashboard::DashboardStats,
            models::dashboard::DailyRevenue,
            models::dashboard::UpcomingAppointment,
            models::dashboard::TechnicianRank,

            // --- Settings ---
            models::settings::AppSettings,
            models::settings::UpdateLogoPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Cadastro do dono, login e logout"),
        (name = "Users", description = "Dados da conta autenticada"),
        (name = "Access", description = "Papel, oficina, menu e páginas liberadas"),
        (name = "Account", description = "Minha conta: dados pessoais e senha"),
        (name = "Technicians", description = "Equipe técnica e permissões"),
        (name = "Records", description = "Clientes, agenda, pátio, financeiro e demais coleções"),
        (name = "Dashboard", description = "Indicadores do painel"),
        (name = "Settings", description = "Configurações da oficina"),
        (name = "Realtime", description = "Snapshots em tempo real (SSE)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
