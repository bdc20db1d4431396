// src/models/settings.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub logo_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLogoPayload {
    pub logo_url: String,
}
