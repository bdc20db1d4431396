pub mod access;
pub mod auth;
pub mod dashboard;
pub mod permissions;
pub mod records;
pub mod scope;
pub mod settings;
pub mod subscription;
pub mod technician;
