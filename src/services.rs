pub mod access_service;
pub mod account_service;
pub mod auth;
pub mod dashboard_service;
pub mod listeners;
pub mod migration_service;
pub mod page_gate;
pub mod record_service;
pub mod session_signals;
pub mod settings_service;
pub mod technician_service;
