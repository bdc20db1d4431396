pub mod error;
pub mod fields;
pub mod i18n;
