// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::{
    common::{error::AppError, fields::{timestamp_value, Fields}},
    db::{store::StoreError, AccountRepository, ProfileRepository},
    models::{
        access::Role,
        auth::{Account, AuthResponse, Claims, Identity, RegisterOwnerPayload},
    },
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_new_password(password: &str, confirm: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::WeakPassword);
    }
    if password != confirm {
        return Err(AppError::PasswordMismatch);
    }
    Ok(())
}

// Provedor de autenticação: contas, senhas e tokens.
#[derive(Clone)]
pub struct AuthService {
    accounts: AccountRepository,
    profiles: ProfileRepository,
    jwt_secret: String,
    token_ttl: Duration,
    trial_duration: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        accounts: AccountRepository,
        profiles: ProfileRepository,
        jwt_secret: String,
        token_ttl_days: i64,
        trial_days: i64,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            accounts,
            profiles,
            jwt_secret,
            token_ttl: Duration::days(token_ttl_days),
            trial_duration: Duration::days(trial_days),
            bcrypt_cost,
        }
    }

    /// Cadastro do dono: conta + perfil com teste grátis. Se o perfil não
    /// puder ser gravado, a conta recém-criada é removida.
    pub async fn register_owner(
        &self,
        payload: &RegisterOwnerPayload,
        now: DateTime<Utc>,
    ) -> Result<AuthResponse, AppError> {
        check_new_password(&payload.password, &payload.confirm_password)?;

        let account = self
            .provision_account(&payload.email, &payload.password, Some(payload.full_name.trim()), now)
            .await?;

        let profile = self.owner_profile_fields(&account, payload, now);
        if let Err(e) = self.profiles.replace_profile(&account.uid, profile).await {
            tracing::error!("🔥 Falha ao gravar o perfil de {}; desfazendo a conta.", account.uid);
            self.accounts.delete(&account.uid).await?;
            return Err(e.into());
        }

        tracing::info!("✅ Oficina cadastrada para {}.", account.email);
        let token = self.create_token(&account)?;
        Ok(AuthResponse { token, uid: account.uid })
    }

    fn owner_profile_fields(
        &self,
        account: &Account,
        payload: &RegisterOwnerPayload,
        now: DateTime<Utc>,
    ) -> Fields {
        let mut fields = Fields::new();
        fields.insert("uid".into(), Value::String(account.uid.clone()));
        fields.insert("role".into(), Value::String(Role::Admin.as_str().into()));
        fields.insert("fullName".into(), Value::String(payload.full_name.trim().to_string()));
        fields.insert("email".into(), Value::String(account.email.clone()));
        fields.insert("phone".into(), Value::String(payload.phone.trim().to_string()));
        fields.insert("cpfCnpj".into(), Value::String(payload.cpf_cnpj.trim().to_string()));
        fields.insert("birthDate".into(), Value::String(payload.birth_date.trim().to_string()));
        fields.insert("subscriptionPlan".into(), Value::String("trial".into()));
        fields.insert("subscriptionStatus".into(), Value::String("trialing".into()));
        fields.insert("trialStartsAt".into(), timestamp_value(now));
        fields.insert("trialEndsAt".into(), timestamp_value(now + self.trial_duration));
        fields.insert("createdAt".into(), timestamp_value(now));
        fields
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let account = self
            .accounts
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !self.verify_password(password, &account.password_hash).await? {
            return Err(AppError::WrongPassword);
        }

        let token = self.create_token(&account)?;
        Ok(AuthResponse { token, uid: account.uid })
    }

    /// Invalida todos os tokens emitidos até agora para esta conta.
    pub async fn sign_out(&self, uid: &str) -> Result<(), AppError> {
        let account = self.accounts.find_by_uid(uid).await?.ok_or(AppError::InvalidToken)?;
        let mut patch = Fields::new();
        patch.insert("sessionVersion".into(), Value::from(account.session_version + 1));
        self.accounts.update_fields(uid, patch).await?;
        Ok(())
    }

    /// Resolve o "currentUser" a partir do bearer token.
    pub async fn identify(&self, token: &str) -> Result<Identity, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let account = self
            .accounts
            .find_by_uid(&token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if account.session_version != token_data.claims.ver {
            return Err(AppError::InvalidToken);
        }

        Ok(Identity::from(&account))
    }

    /// Troca de senha com reautenticação. Devolve um token novo, já que a troca
    /// encerra as sessões anteriores.
    pub async fn change_password(
        &self,
        uid: &str,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<AuthResponse, AppError> {
        check_new_password(new_password, confirm_password)?;

        let mut account = self.accounts.find_by_uid(uid).await?.ok_or(AppError::UserNotFound)?;
        if !self.verify_password(current_password, &account.password_hash).await? {
            return Err(AppError::WrongPassword);
        }

        account.password_hash = self.hash_password(new_password).await?;
        account.session_version += 1;
        self.accounts
            .set_password_hash(uid, &account.password_hash, account.session_version)
            .await?;

        let token = self.create_token(&account)?;
        Ok(AuthResponse { token, uid: account.uid })
    }

    pub async fn update_profile(
        &self,
        uid: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Identity, AppError> {
        let mut account = self.accounts.find_by_uid(uid).await?.ok_or(AppError::UserNotFound)?;
        let mut patch = Fields::new();
        if let Some(name) = display_name {
            account.display_name = Some(name.to_string());
            patch.insert("displayName".into(), Value::String(name.to_string()));
        }
        if let Some(url) = photo_url {
            account.photo_url = Some(url.to_string());
            patch.insert("photoUrl".into(), Value::String(url.to_string()));
        }
        if !patch.is_empty() {
            self.accounts.update_fields(uid, patch).await?;
        }
        Ok(Identity::from(&account))
    }

    /// Cria a conta de um técnico sem emitir token: a sessão do dono que está
    /// convidando continua intacta.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Account, AppError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::WeakPassword);
        }
        self.provision_account(email, password, display_name, now).await
    }

    pub async fn delete_account(&self, uid: &str) -> Result<(), AppError> {
        match self.accounts.delete(uid).await {
            Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn provision_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Account, AppError> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(AppError::InvalidEmail);
        }
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AppError::EmailAlreadyInUse);
        }

        let account = Account {
            uid: Uuid::new_v4().simple().to_string(),
            email,
            password_hash: self.hash_password(password).await?,
            display_name: display_name.map(str::to_string).filter(|n| !n.is_empty()),
            photo_url: None,
            session_version: 0,
            created_at: now,
        };
        self.accounts.insert(&account).await?;
        Ok(account)
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let cost = self.bcrypt_cost;
        let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        let password_clone = password.to_owned();
        let password_hash_clone = password_hash.to_owned();
        let is_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
        Ok(is_valid)
    }

    fn create_token(&self, account: &Account) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.token_ttl;

        let claims = Claims {
            sub: account.uid.clone(),
            ver: account.session_version,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DocumentStore, MemoryDocumentStore};
    use std::sync::Arc;

    fn service() -> AuthService {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        AuthService::new(
            AccountRepository::new(store.clone()),
            ProfileRepository::new(store),
            "segredo-de-teste".into(),
            7,
            14,
            4,
        )
    }

    fn owner_payload(email: &str) -> RegisterOwnerPayload {
        RegisterOwnerPayload {
            full_name: "Maria Souza".into(),
            email: email.into(),
            password: "123456".into(),
            confirm_password: "123456".into(),
            birth_date: "1988-04-12".into(),
            cpf_cnpj: "123".into(),
            phone: "11999999999".into(),
        }
    }

    #[tokio::test]
    async fn register_sign_in_and_identify() {
        let auth = service();
        let now = Utc::now();
        let registered = auth.register_owner(&owner_payload(" Maria@Oficina.com "), now).await.unwrap();

        let identity = auth.identify(&registered.token).await.unwrap();
        assert_eq!(identity.email, "maria@oficina.com");

        let session = auth.sign_in("maria@oficina.com", "123456").await.unwrap();
        assert_eq!(session.uid, registered.uid);

        let profile = auth.profiles.get_profile(&registered.uid).await.unwrap().unwrap();
        assert_eq!(profile.data.get("subscriptionStatus"), Some(&Value::from("trialing")));
        assert_eq!(profile.data.get("role"), Some(&Value::from("admin")));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let auth = service();
        auth.register_owner(&owner_payload("a@b.com"), Utc::now()).await.unwrap();
        let err = auth.register_owner(&owner_payload("A@B.com"), Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::EmailAlreadyInUse));
    }

    #[tokio::test]
    async fn password_confirmation_must_match() {
        let auth = service();
        let mut payload = owner_payload("a@b.com");
        payload.confirm_password = "654321".into();
        let err = auth.register_owner(&payload, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::PasswordMismatch));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user() {
        let auth = service();
        auth.register_owner(&owner_payload("a@b.com"), Utc::now()).await.unwrap();
        assert!(matches!(auth.sign_in("a@b.com", "errada").await, Err(AppError::WrongPassword)));
        assert!(matches!(auth.sign_in("x@b.com", "123456").await, Err(AppError::UserNotFound)));
    }

    #[tokio::test]
    async fn sign_out_revokes_issued_tokens() {
        let auth = service();
        let session = auth.register_owner(&owner_payload("a@b.com"), Utc::now()).await.unwrap();
        auth.sign_out(&session.uid).await.unwrap();
        assert!(matches!(auth.identify(&session.token).await, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let auth = service();
        let session = auth.register_owner(&owner_payload("a@b.com"), Utc::now()).await.unwrap();

        let err = auth
            .change_password(&session.uid, "errada", "nova-senha", "nova-senha")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WrongPassword));

        let renewed = auth
            .change_password(&session.uid, "123456", "nova-senha", "nova-senha")
            .await
            .unwrap();
        assert!(auth.identify(&renewed.token).await.is_ok());
        assert!(auth.identify(&session.token).await.is_err());
        assert!(auth.sign_in("a@b.com", "nova-senha").await.is_ok());
    }
}
