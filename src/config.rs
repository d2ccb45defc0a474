// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{InventoryRepository, InventoryStore, MemoryStore},
    services::{DashboardService, InventoryService},
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Sem DATABASE_URL o serviço sobe com o store em memória
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} inválida: '{raw}'")),
        _ => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        // .env é opcional (em produção as variáveis vêm do ambiente)
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            bind_addr: env_or("BIND_ADDR", DEFAULT_BIND_ADDR.to_string())?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(env_or("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub inventory_service: InventoryService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    /// Monta o grafo de dependências sobre um store qualquer.
    pub fn with_store(store: Arc<dyn InventoryStore>) -> Self {
        Self {
            inventory_service: InventoryService::new(store.clone()),
            dashboard_service: DashboardService::new(store),
        }
    }

    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn InventoryStore> = match &config.database_url {
            Some(database_url) => {
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .acquire_timeout(config.db_acquire_timeout)
                    .connect(database_url)
                    .await
                    .context("Falha ao conectar ao banco de dados")?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!()
                    .run(&db_pool)
                    .await
                    .context("Falha ao rodar as migrações do banco de dados")?;
                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                Arc::new(InventoryRepository::new(db_pool))
            }
            None => {
                tracing::warn!("DATABASE_URL não definida: usando store em memória (dados não persistem)");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_store(store))
    }
}
