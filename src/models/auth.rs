// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// Conta de autenticação gravada em accounts/{uid}. Nunca sai pela API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    // Incrementado no logout e na troca de senha; invalida os tokens antigos.
    #[serde(default)]
    pub session_version: u64,
    pub created_at: DateTime<Utc>,
}

/// A identidade autenticada da requisição (o "currentUser").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self {
            uid: account.uid.clone(),
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            photo_url: account.photo_url.clone(),
        }
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // uid da conta
    pub ver: u64,     // session_version no momento da emissão
    pub exp: usize,
    pub iat: usize,
}

// Cadastro do dono da oficina
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOwnerPayload {
    #[validate(length(min = 1, message = "Informe o nome completo."))]
    #[schema(example = "Maria Souza")]
    pub full_name: String,

    #[validate(email(message = "Informe um e-mail válido."))]
    #[schema(example = "maria@oficina.com")]
    pub email: String,

    #[validate(length(min = 6, message = "A senha precisa ter pelo menos 6 caracteres."))]
    pub password: String,

    pub confirm_password: String,

    #[serde(default)]
    #[schema(example = "1988-04-12")]
    pub birth_date: String,

    #[serde(default)]
    #[schema(example = "123.456.789-00")]
    pub cpf_cnpj: String,

    #[serde(default)]
    #[schema(example = "(11) 98888-7777")]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "Informe um e-mail válido."))]
    pub email: String,
    #[validate(length(min = 1, message = "Informe a senha."))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub uid: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
    pub current_password: String,
    #[validate(length(min = 6, message = "A senha precisa ter pelo menos 6 caracteres."))]
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    #[validate(length(min = 1, max = 120))]
    pub display_name: Option<String>,
    #[validate(url)]
    pub photo_url: Option<String>,
}
