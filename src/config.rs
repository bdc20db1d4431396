// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{AccountRepository, DocumentStore, MemoryDocumentStore, PgDocumentStore, ProfileRepository},
    services::{
        access_service::{AccessService, RoleResolver},
        account_service::AccountService,
        auth::AuthService,
        dashboard_service::DashboardService,
        migration_service::MigrationService,
        page_gate::PageGate,
        record_service::RecordService,
        session_signals::SessionSignals,
        settings_service::SettingsService,
        technician_service::TechnicianService,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub store_backend: StoreBackend,
    pub bind_addr: String,
    pub trial_duration_days: i64,
    pub token_ttl_days: i64,
    pub bcrypt_cost: u32,
    pub business_utc_offset_hours: i32,
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} tem um valor inválido: '{raw}'")),
        _ => Ok(default),
    }
}

impl AppConfig {
    /// Lê o `.env` (se houver) e as variáveis de ambiente.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let store_backend = match env::var("STORE_BACKEND").unwrap_or_default().trim() {
            "" | "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres {
                database_url: env::var("DATABASE_URL")
                    .context("DATABASE_URL deve ser definida com STORE_BACKEND=postgres")?,
            },
            other => anyhow::bail!("STORE_BACKEND desconhecido: '{other}' (use memory ou postgres)"),
        };

        let business_utc_offset_hours = env_or("BUSINESS_UTC_OFFSET_HOURS", -3)?;
        if !(-23..=23).contains(&business_utc_offset_hours) {
            anyhow::bail!("BUSINESS_UTC_OFFSET_HOURS fora do intervalo: {business_utc_offset_hours}");
        }

        Ok(Self {
            jwt_secret,
            store_backend,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            trial_duration_days: env_or("TRIAL_DURATION_DAYS", 14)?,
            token_ttl_days: env_or("TOKEN_TTL_DAYS", 7)?,
            bcrypt_cost: env_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            business_utc_offset_hours,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub auth_service: AuthService,
    pub access_service: AccessService,
    pub page_gate: PageGate,
    pub session_signals: SessionSignals,
    pub record_service: RecordService,
    pub technician_service: TechnicianService,
    pub account_service: AccountService,
    pub migration_service: MigrationService,
    pub settings_service: SettingsService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    /// Abre o store configurado e monta o estado.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match &config.store_backend {
            StoreBackend::Memory => {
                tracing::warn!("⚠️ Usando o store em memória; os dados somem ao reiniciar.");
                Arc::new(MemoryDocumentStore::new())
            }
            StoreBackend::Postgres { database_url } => {
                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await
                    .context("Falha ao conectar ao banco de dados")?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!()
                    .run(&pool)
                    .await
                    .context("Falha ao rodar as migrações do banco de dados")?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                Arc::new(PgDocumentStore::new(pool))
            }
        };

        Ok(Self::with_store(config, store))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_store(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        let accounts = AccountRepository::new(store.clone());
        let profiles = ProfileRepository::new(store.clone());

        let auth_service = AuthService::new(
            accounts,
            profiles.clone(),
            config.jwt_secret.clone(),
            config.token_ttl_days,
            config.trial_duration_days,
            config.bcrypt_cost,
        );
        let access_service = AccessService::new(RoleResolver::standard(profiles.clone()));

        Self {
            access_service,
            // Avisos de página não sobrevivem ao token.
            page_gate: PageGate::with_idle_ttl(Duration::from_secs(
                u64::try_from(config.token_ttl_days.max(1)).unwrap_or(1) * 24 * 60 * 60,
            )),
            session_signals: SessionSignals::new(),
            record_service: RecordService::new(store.clone()),
            technician_service: TechnicianService::new(profiles.clone(), auth_service.clone()),
            account_service: AccountService::new(profiles, auth_service.clone()),
            migration_service: MigrationService::new(store.clone()),
            settings_service: SettingsService::new(store.clone()),
            dashboard_service: DashboardService::new(store.clone(), config.business_utc_offset_hours),
            auth_service,
            store,
            config: Arc::new(config),
        }
    }
}
