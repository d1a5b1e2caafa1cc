// src/db/hold_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{Hold, InventoryKind},
};

#[derive(Clone)]
pub struct HoldRepository {
    pool: PgPool,
}

impl HoldRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn insert_ga<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        tier_id: Uuid,
        quantity: i32,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Hold, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let hold = sqlx::query_as::<_, Hold>(
            r#"
            INSERT INTO holds (tenant_id, event_id, kind, tier_id, quantity, session_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(InventoryKind::Ga)
        .bind(tier_id)
        .bind(quantity)
        .bind(session_id)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;
        Ok(hold)
    }

    pub async fn insert_reserved<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        seat_ids: &[Uuid],
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Hold, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let hold = sqlx::query_as::<_, Hold>(
            r#"
            INSERT INTO holds (tenant_id, event_id, kind, seat_ids, session_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(InventoryKind::Reserved)
        .bind(seat_ids)
        .bind(session_id)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;
        Ok(hold)
    }

    /// Apaga a reserva e devolve a linha apagada. `None` significa que outro
    /// caminho (liberação, conversão ou reaper) chegou primeiro — é esta
    /// exclusão condicional que decide a corrida entre eles.
    pub async fn delete_returning<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        hold_id: Uuid,
    ) -> Result<Option<Hold>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let hold = sqlx::query_as::<_, Hold>(
            "DELETE FROM holds WHERE tenant_id = $1 AND id = $2 RETURNING *",
        )
        .bind(tenant_id)
        .bind(hold_id)
        .fetch_optional(executor)
        .await?;
        Ok(hold)
    }

    /// Reservas vencidas, candidatas à varredura do reaper.
    /// A consulta é global (todos os tenants): o reaper é um processo do
    /// sistema, não de um tenant.
    pub async fn find_expired<'e, E>(
        &self,
        executor: E,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Hold>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let holds = sqlx::query_as::<_, Hold>(
            r#"
            SELECT * FROM holds
            WHERE expires_at < $1
            ORDER BY expires_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(holds)
    }
}
