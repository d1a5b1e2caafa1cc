// src/config.rs

use std::{env, sync::Arc, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    common::cache::SummaryCache,
    db::{AuditRepository, HoldRepository, LedgerRepository},
    services::{AvailabilityService, HoldService, LedgerService},
};

// TTL padrão das reservas de checkout (5 minutos) e cadência do reaper.
const DEFAULT_HOLD_TTL_SECONDS: i64 = 300;
const DEFAULT_REAPER_INTERVAL_SECONDS: u64 = 45;
const DEFAULT_SUMMARY_CACHE_TTL_SECONDS: u64 = 10;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub audit_repo: AuditRepository,
    pub ledger_service: LedgerService,
    pub hold_service: HoldService,
    pub availability_service: AvailabilityService,
    pub reaper_interval: Duration,
    pub port: u16,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");

        let hold_ttl_seconds = env_or("HOLD_TTL_SECONDS", DEFAULT_HOLD_TTL_SECONDS);
        let reaper_interval_seconds =
            env_or("REAPER_INTERVAL_SECONDS", DEFAULT_REAPER_INTERVAL_SECONDS);
        let cache_ttl_seconds =
            env_or("SUMMARY_CACHE_TTL_SECONDS", DEFAULT_SUMMARY_CACHE_TTL_SECONDS);
        let port: u16 = env_or("PORT", 3000);

        // Conecta ao banco de dados, usando '?' para propagar erros.
        // O acquire_timeout limita a espera por conexão: nenhuma operação
        // pode bloquear indefinidamente.
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let ledger_repo = LedgerRepository::new(db_pool.clone());
        let hold_repo = HoldRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new(db_pool.clone());

        let cache = Arc::new(SummaryCache::new(Duration::from_secs(cache_ttl_seconds)));

        let ledger_service =
            LedgerService::new(ledger_repo.clone(), audit_repo.clone(), cache.clone());
        let hold_service = HoldService::new(
            ledger_repo.clone(),
            hold_repo,
            audit_repo.clone(),
            cache.clone(),
            hold_ttl_seconds,
        );
        let availability_service = AvailabilityService::new(ledger_repo, cache);

        Ok(Self {
            db_pool,
            audit_repo,
            ledger_service,
            hold_service,
            availability_service,
            reaper_interval: Duration::from_secs(reaper_interval_seconds),
            port,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
