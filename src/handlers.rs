pub mod access;
pub mod auth;
pub mod dashboard;
pub mod records;
pub mod settings;
pub mod stream;
pub mod technicians;
