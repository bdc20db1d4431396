// src/models/technician.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::permissions::{PermissionKey, Permissions};

// O Payload para o dono convidar um técnico
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTechnicianPayload {
    #[validate(length(min = 1, message = "Informe o nome do técnico."))]
    #[schema(example = "Carlos Lima")]
    pub name: String,

    #[validate(email(message = "Informe um e-mail válido."))]
    #[schema(example = "carlos@oficina.com")]
    pub email: String,

    // Senha provisória; o técnico troca no primeiro acesso.
    #[validate(length(min = 6, message = "A senha precisa ter pelo menos 6 caracteres."))]
    pub password: String,

    #[serde(default)]
    #[schema(value_type = Object, example = json!({ "agenda": true, "patio": true }))]
    pub permissions: Value,

    #[serde(default)]
    pub professional_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplacePermissionsPayload {
    #[schema(value_type = Object, example = json!({ "agenda": true, "financeiro": false }))]
    pub permissions: Value,
}

// `null` desfaz o vínculo.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkProfessionalPayload {
    #[schema(example = "prof-123")]
    pub professional_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TogglePermissionPayload {
    pub key: PermissionKey,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianSummary {
    pub uid: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub permissions: Permissions,
    pub must_change_password: bool,
    pub professional_id: Option<String>,
    // Sem nenhuma permissão o técnico fica desativado na prática.
    pub active: bool,
}

// Dados pessoais editados na tela "Minha conta"
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePersonalDataPayload {
    #[validate(length(min = 1, message = "Informe o nome completo."))]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub cpf_cnpj: String,
}
