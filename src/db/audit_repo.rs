// src/db/audit_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{AuditLogEntry, NewAuditEntry, TierAuditDeltas},
};

// Trilha de auditoria: o núcleo só insere e lê. Nenhuma função de UPDATE ou
// DELETE existe aqui de propósito.
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Registra uma mutação no livro-razão. Chamada sempre dentro da mesma
    /// transação que a mutação, para que trilha e contadores andem juntos.
    pub async fn append<'e, E>(
        &self,
        executor: E,
        entry: NewAuditEntry,
    ) -> Result<AuditLogEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stored = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            INSERT INTO audit_log
                (tenant_id, event_id, action, kind, tier_id, seat_ids, quantity_delta, reason, performed_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(entry.tenant_id)
        .bind(entry.event_id)
        .bind(entry.action)
        .bind(entry.kind)
        .bind(entry.tier_id)
        .bind(entry.seat_ids)
        .bind(entry.quantity_delta)
        .bind(entry.reason)
        .bind(entry.performed_by)
        .fetch_one(executor)
        .await?;
        Ok(stored)
    }

    /// Página de entradas de um evento, mais recentes primeiro.
    /// O cursor é o 'seq' da última entrada da página anterior.
    pub async fn list_for_event<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        limit: i64,
        cursor: Option<i64>,
    ) -> Result<Vec<AuditLogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT * FROM audit_log
            WHERE tenant_id = $1 AND event_id = $2
              AND ($3::BIGINT IS NULL OR seq < $3)
            ORDER BY seq DESC
            LIMIT $4
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(cursor)
        .bind(limit)
        .fetch_all(executor)
        .await?;
        Ok(entries)
    }

    /// Somatório dos deltas de um lote para reconciliação.
    /// sale/refund devem somar 'sold'; block/unblock devem somar 'blocked'.
    /// Holds ficam de fora: são transitórios por definição.
    pub async fn tier_deltas<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        tier_id: Uuid,
    ) -> Result<TierAuditDeltas, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let deltas = sqlx::query_as::<_, TierAuditDeltas>(
            r#"
            SELECT
                COALESCE(SUM(quantity_delta) FILTER (WHERE action IN ('sale', 'refund')), 0)::BIGINT AS sold_delta,
                COALESCE(SUM(quantity_delta) FILTER (WHERE action IN ('block', 'unblock')), 0)::BIGINT AS blocked_delta
            FROM audit_log
            WHERE tenant_id = $1 AND tier_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(tier_id)
        .fetch_one(executor)
        .await?;
        Ok(deltas)
    }
}
