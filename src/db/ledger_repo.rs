// src/db/ledger_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{
        InventoryBlock, InventoryKind, Seat, SeatStatus, SectionStatusCount, TicketTier,
    },
};

// O Ledger Store: acesso linha a linha aos contadores de lote e aos assentos.
// Nenhuma função daqui faz "increment" incondicional — toda escrita de
// contadores é condicionada à versão lida, e toda escrita de assento é
// condicionada ao status esperado.
#[derive(Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---
    // Leituras
    // ---

    pub async fn get_tier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        tier_id: Uuid,
    ) -> Result<Option<TicketTier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tier = sqlx::query_as::<_, TicketTier>(
            "SELECT * FROM ticket_tiers WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(tier_id)
        .fetch_optional(executor)
        .await?;
        Ok(tier)
    }

    pub async fn get_tiers_for_event<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
    ) -> Result<Vec<TicketTier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tiers = sqlx::query_as::<_, TicketTier>(
            "SELECT * FROM ticket_tiers WHERE tenant_id = $1 AND event_id = $2 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_all(executor)
        .await?;
        Ok(tiers)
    }

    /// Carrega os assentos pedidos com `FOR UPDATE`: serializa chamadas
    /// concorrentes que nomeiam conjuntos sobrepostos.
    pub async fn get_seats_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        seat_ids: &[Uuid],
    ) -> Result<Vec<Seat>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let seats = sqlx::query_as::<_, Seat>(
            r#"
            SELECT * FROM seats
            WHERE tenant_id = $1 AND id = ANY($2)
            ORDER BY id ASC
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(seat_ids)
        .fetch_all(executor)
        .await?;
        Ok(seats)
    }

    /// Contagem de assentos por seção/status, para o resumo de disponibilidade.
    pub async fn get_section_status_counts<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
    ) -> Result<Vec<SectionStatusCount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let counts = sqlx::query_as::<_, SectionStatusCount>(
            r#"
            SELECT section_id, status, COUNT(*) AS total
            FROM seats
            WHERE tenant_id = $1 AND event_id = $2
            GROUP BY section_id, status
            ORDER BY section_id ASC
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .fetch_all(executor)
        .await?;
        Ok(counts)
    }

    // ---
    // Escritas de configuração (lotes e assentos)
    // ---

    pub async fn create_tier<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        name: &str,
        total_capacity: i32,
    ) -> Result<TicketTier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tier = sqlx::query_as::<_, TicketTier>(
            r#"
            INSERT INTO ticket_tiers (tenant_id, event_id, name, total_capacity)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(name)
        .bind(total_capacity)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::InvalidRequest(format!(
                        "Já existe um lote chamado '{name}' neste evento."
                    ));
                }
            }
            e.into()
        })?;
        Ok(tier)
    }

    pub async fn create_seat<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        section_id: &str,
        row_label: &str,
        seat_number: i32,
        price: Option<Decimal>,
    ) -> Result<Seat, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let seat = sqlx::query_as::<_, Seat>(
            r#"
            INSERT INTO seats (tenant_id, event_id, section_id, row_label, seat_number, price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(section_id)
        .bind(row_label)
        .bind(seat_number)
        .bind(price)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::InvalidRequest(format!(
                        "O assento {section_id}/{row_label}/{seat_number} já existe neste evento."
                    ));
                }
            }
            e.into()
        })?;
        Ok(seat)
    }

    // ---
    // Escritas do livro-razão (condicionadas)
    // ---

    /// Aplica deltas aos contadores de um lote, condicionado à versão lida.
    /// Zero linhas afetadas significa que outro escritor chegou primeiro:
    /// o chamador recebe `TransactionConflict` e decide repetir o ciclo.
    /// Os CHECKs do banco barram qualquer contador negativo que escapar
    /// da validação prévia.
    pub async fn update_tier_counters<'e, E>(
        &self,
        executor: E,
        tier_id: Uuid,
        expected_version: i64,
        sold_delta: i32,
        blocked_delta: i32,
        held_delta: i32,
    ) -> Result<TicketTier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, TicketTier>(
            r#"
            UPDATE ticket_tiers
            SET sold = sold + $3,
                blocked = blocked + $4,
                held = held + $5,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING *
            "#,
        )
        .bind(tier_id)
        .bind(expected_version)
        .bind(sold_delta)
        .bind(blocked_delta)
        .bind(held_delta)
        .fetch_optional(executor)
        .await?;

        updated.ok_or(AppError::TransactionConflict)
    }

    pub async fn set_reconciliation_flag<'e, E>(
        &self,
        executor: E,
        tier_id: Uuid,
        flagged: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE ticket_tiers SET needs_reconciliation = $2, updated_at = now() WHERE id = $1",
        )
        .bind(tier_id)
        .bind(flagged)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Transição em lote de assentos, condicionada ao status de origem.
    /// Retorna quantas linhas mudaram — o serviço compara com o tamanho do
    /// conjunto para garantir o tudo-ou-nada.
    pub async fn transition_seats<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        seat_ids: &[Uuid],
        from: SeatStatus,
        to: SeatStatus,
        block_id: Option<Uuid>,
        hold_id: Option<Uuid>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE seats
            SET status = $4,
                active_block_id = $5,
                active_hold_id = $6,
                updated_at = now()
            WHERE tenant_id = $1 AND id = ANY($2) AND status = $3
            "#,
        )
        .bind(tenant_id)
        .bind(seat_ids)
        .bind(from)
        .bind(to)
        .bind(block_id)
        .bind(hold_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Devolve para 'available' os assentos de um bloqueio específico.
    /// Só mexe em quem ainda aponta para o bloqueio — assentos que mudaram
    /// de dono são simplesmente não contados.
    pub async fn release_seats_of_block<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        block_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE seats
            SET status = 'available', active_block_id = NULL, updated_at = now()
            WHERE tenant_id = $1 AND active_block_id = $2 AND status = 'blocked'
            "#,
        )
        .bind(tenant_id)
        .bind(block_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Transiciona os assentos de uma reserva ('held' -> destino), limpando o
    /// vínculo com a reserva. Usada tanto na liberação quanto na conversão.
    pub async fn transition_seats_of_hold<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        hold_id: Uuid,
        to: SeatStatus,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE seats
            SET status = $3, active_hold_id = NULL, updated_at = now()
            WHERE tenant_id = $1 AND active_hold_id = $2 AND status = 'held'
            "#,
        )
        .bind(tenant_id)
        .bind(hold_id)
        .bind(to)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Bloqueios administrativos
    // ---

    pub async fn insert_block_ga<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        tier_id: Uuid,
        quantity: i32,
        reason: &str,
        notes: Option<&str>,
        blocked_by: &str,
    ) -> Result<InventoryBlock, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let block = sqlx::query_as::<_, InventoryBlock>(
            r#"
            INSERT INTO inventory_blocks (tenant_id, event_id, kind, tier_id, quantity, reason, notes, blocked_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(InventoryKind::Ga)
        .bind(tier_id)
        .bind(quantity)
        .bind(reason)
        .bind(notes)
        .bind(blocked_by)
        .fetch_one(executor)
        .await?;
        Ok(block)
    }

    pub async fn insert_block_reserved<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        seat_ids: &[Uuid],
        reason: &str,
        notes: Option<&str>,
        blocked_by: &str,
    ) -> Result<InventoryBlock, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let block = sqlx::query_as::<_, InventoryBlock>(
            r#"
            INSERT INTO inventory_blocks (tenant_id, event_id, kind, seat_ids, reason, notes, blocked_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(InventoryKind::Reserved)
        .bind(seat_ids)
        .bind(reason)
        .bind(notes)
        .bind(blocked_by)
        .fetch_one(executor)
        .await?;
        Ok(block)
    }

    pub async fn get_block<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        block_id: Uuid,
    ) -> Result<Option<InventoryBlock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let block = sqlx::query_as::<_, InventoryBlock>(
            "SELECT * FROM inventory_blocks WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(block_id)
        .fetch_optional(executor)
        .await?;
        Ok(block)
    }

    /// Desativa um bloqueio, condicionado a ele ainda estar ativo.
    /// Zero linhas = já desativado (sinal de idempotência, nunca crédito duplo).
    pub async fn deactivate_block<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        block_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE inventory_blocks SET active = FALSE WHERE tenant_id = $1 AND id = $2 AND active",
        )
        .bind(tenant_id)
        .bind(block_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
