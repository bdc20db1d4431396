//! Backend da oficina: resolução de papel/tenant, permissões de técnicos,
//! gate de assinatura e os dados de negócio escopados por dono.

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

pub use config::{AppConfig, AppState};
pub use routes::build_router;
