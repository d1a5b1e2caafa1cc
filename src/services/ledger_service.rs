// src/services/ledger_service.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{cache::SummaryCache, error::AppError},
    db::{AuditRepository, LedgerRepository},
    models::inventory::{
        AuditAction, InventoryBlock, InventoryKind, NewAuditEntry, ReconciliationReport, Seat,
        SeatStatus, TicketTier,
    },
};

// Toda operação mutante é uma única transação atômica sobre o menor conjunto
// de registros possível (um lote, ou o conjunto de assentos nomeado na
// chamada), repetida até MAX_TX_ATTEMPTS vezes quando a trava otimista acusa
// conflito de versão.
pub(crate) const MAX_TX_ATTEMPTS: u32 = 5;

const BACKOFF_BASE_MS: u64 = 20;
const BACKOFF_JITTER_MS: u64 = 25;

/// Espera antes da próxima tentativa: linear no número da tentativa,
/// com jitter para dessincronizar escritores em conflito.
pub(crate) fn conflict_backoff(attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..BACKOFF_JITTER_MS);
    Duration::from_millis(BACKOFF_BASE_MS * u64::from(attempt) + jitter)
}

/// Garante que os assentos carregados pertencem a um único evento — e, quando
/// o chamador nomeia o evento, que é exatamente esse. Assentos de eventos
/// misturados corromperiam a trilha de auditoria e a chave de invalidação
/// do cache.
pub(crate) fn ensure_same_event(seats: &[Seat], expected: Option<Uuid>) -> Result<Uuid, AppError> {
    let first = seats.first().map(|s| s.event_id).ok_or_else(|| {
        AppError::InvalidRequest("A lista de assentos não pode ser vazia.".to_string())
    })?;
    if seats.iter().any(|s| s.event_id != first) {
        return Err(AppError::InvalidRequest(
            "Os assentos informados pertencem a eventos diferentes.".to_string(),
        ));
    }
    if let Some(expected) = expected {
        if first != expected {
            return Err(AppError::InvalidRequest(
                "Os assentos informados não pertencem a este evento.".to_string(),
            ));
        }
    }
    Ok(first)
}

/// Resultado de um desbloqueio em lote: quanto voltou para 'available'
/// e quais bloqueios foram pulados (já inativos ou inexistentes).
#[derive(Debug, Clone)]
pub struct UnblockOutcome {
    pub affected_count: i32,
    pub skipped_block_ids: Vec<Uuid>,
}

#[derive(Clone)]
pub struct LedgerService {
    ledger_repo: LedgerRepository,
    audit_repo: AuditRepository,
    cache: Arc<SummaryCache>,
}

impl LedgerService {
    pub fn new(
        ledger_repo: LedgerRepository,
        audit_repo: AuditRepository,
        cache: Arc<SummaryCache>,
    ) -> Self {
        Self {
            ledger_repo,
            audit_repo,
            cache,
        }
    }

    // ---
    // Configuração (lotes e assentos)
    // ---

    pub async fn create_tier(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        name: &str,
        total_capacity: i32,
    ) -> Result<TicketTier, AppError> {
        let tier = self
            .ledger_repo
            .create_tier(self.ledger_repo.pool(), tenant_id, event_id, name, total_capacity)
            .await?;
        self.cache.invalidate_event(tenant_id, event_id);
        Ok(tier)
    }

    /// Cria a grade de assentos de uma seção (linhas x assentos por linha),
    /// tudo em uma transação: ou a seção inteira existe, ou nada.
    pub async fn create_seats(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        section_id: &str,
        row_labels: &[String],
        seats_per_row: i32,
        price: Option<Decimal>,
    ) -> Result<i64, AppError> {
        let mut tx = self.ledger_repo.pool().begin().await?;
        let mut created: i64 = 0;

        for row_label in row_labels {
            for seat_number in 1..=seats_per_row {
                self.ledger_repo
                    .create_seat(
                        &mut *tx,
                        tenant_id,
                        event_id,
                        section_id,
                        row_label,
                        seat_number,
                        price,
                    )
                    .await?;
                created += 1;
            }
        }

        tx.commit().await?;
        self.cache.invalidate_event(tenant_id, event_id);
        Ok(created)
    }

    // ---
    // Bloqueio administrativo: GA
    // ---

    pub async fn block_ga(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        tier_id: Uuid,
        quantity: i32,
        reason: &str,
        notes: Option<&str>,
        actor: &str,
    ) -> Result<InventoryBlock, AppError> {
        let mut attempt = 1;
        loop {
            let result = self
                .try_block_ga(tenant_id, event_id, tier_id, quantity, reason, notes, actor)
                .await;
            match result {
                Err(AppError::TransactionConflict) if attempt < MAX_TX_ATTEMPTS => {
                    tracing::warn!(%tier_id, attempt, "conflito de versão ao bloquear GA, repetindo");
                    tokio::time::sleep(conflict_backoff(attempt)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_block_ga(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        tier_id: Uuid,
        quantity: i32,
        reason: &str,
        notes: Option<&str>,
        actor: &str,
    ) -> Result<InventoryBlock, AppError> {
        let mut tx = self.ledger_repo.pool().begin().await?;

        let tier = self
            .ledger_repo
            .get_tier(&mut *tx, tenant_id, tier_id)
            .await?
            .ok_or(AppError::TierNotFound)?;

        self.guard_tier(&tier, event_id)?;

        if tier.available() < quantity {
            return Err(AppError::InsufficientInventory {
                requested: quantity,
                available: tier.available(),
            });
        }

        self.ledger_repo
            .update_tier_counters(&mut *tx, tier.id, tier.version, 0, quantity, 0)
            .await?;

        let block = self
            .ledger_repo
            .insert_block_ga(
                &mut *tx, tenant_id, tier.event_id, tier.id, quantity, reason, notes, actor,
            )
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                NewAuditEntry {
                    tenant_id,
                    event_id: tier.event_id,
                    action: AuditAction::Block,
                    kind: InventoryKind::Ga,
                    tier_id: Some(tier.id),
                    seat_ids: None,
                    quantity_delta: quantity,
                    reason: Some(reason.to_string()),
                    performed_by: actor.to_string(),
                },
            )
            .await?;

        tx.commit().await?;
        self.cache.invalidate_event(tenant_id, tier.event_id);

        tracing::info!(%tier_id, quantity, block_id = %block.id, "bloqueio GA criado");
        Ok(block)
    }

    // ---
    // Bloqueio administrativo: assentos
    // ---

    pub async fn block_seats(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        seat_ids: &[Uuid],
        reason: &str,
        notes: Option<&str>,
        actor: &str,
    ) -> Result<InventoryBlock, AppError> {
        // Remove duplicatas preservando a ordem: um assento repetido não pode
        // contar duas vezes na transição.
        let mut seen = HashSet::new();
        let seat_ids: Vec<Uuid> = seat_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let mut attempt = 1;
        loop {
            let result = self
                .try_block_seats(tenant_id, event_id, &seat_ids, reason, notes, actor)
                .await;
            match result {
                Err(AppError::TransactionConflict) if attempt < MAX_TX_ATTEMPTS => {
                    tracing::warn!(attempt, "conflito ao bloquear assentos, repetindo");
                    tokio::time::sleep(conflict_backoff(attempt)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_block_seats(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        seat_ids: &[Uuid],
        reason: &str,
        notes: Option<&str>,
        actor: &str,
    ) -> Result<InventoryBlock, AppError> {
        if seat_ids.is_empty() {
            return Err(AppError::InvalidRequest(
                "A lista de assentos não pode ser vazia.".to_string(),
            ));
        }

        let mut tx = self.ledger_repo.pool().begin().await?;

        let seats = self
            .ledger_repo
            .get_seats_for_update(&mut *tx, tenant_id, seat_ids)
            .await?;

        if seats.len() != seat_ids.len() {
            let found: HashSet<Uuid> = seats.iter().map(|s| s.id).collect();
            let missing = seat_ids
                .iter()
                .copied()
                .filter(|id| !found.contains(id))
                .collect();
            return Err(AppError::SeatNotFound(missing));
        }

        // Tudo-ou-nada: qualquer assento fora de 'available' aborta a chamada
        // inteira antes de qualquer escrita.
        let taken: Vec<Uuid> = seats
            .iter()
            .filter(|s| s.status != SeatStatus::Available)
            .map(|s| s.id)
            .collect();
        if !taken.is_empty() {
            return Err(AppError::SeatAlreadyTaken { seats: taken });
        }

        ensure_same_event(&seats, Some(event_id))?;

        let block = self
            .ledger_repo
            .insert_block_reserved(&mut *tx, tenant_id, event_id, seat_ids, reason, notes, actor)
            .await?;

        let changed = self
            .ledger_repo
            .transition_seats(
                &mut *tx,
                tenant_id,
                seat_ids,
                SeatStatus::Available,
                SeatStatus::Blocked,
                Some(block.id),
                None,
            )
            .await?;

        // Sob FOR UPDATE isso não deve divergir; se divergir, ninguém commita.
        if changed != seat_ids.len() as u64 {
            return Err(AppError::TransactionConflict);
        }

        self.audit_repo
            .append(
                &mut *tx,
                NewAuditEntry {
                    tenant_id,
                    event_id,
                    action: AuditAction::Block,
                    kind: InventoryKind::Reserved,
                    tier_id: None,
                    seat_ids: Some(seat_ids.to_vec()),
                    quantity_delta: seat_ids.len() as i32,
                    reason: Some(reason.to_string()),
                    performed_by: actor.to_string(),
                },
            )
            .await?;

        tx.commit().await?;
        self.cache.invalidate_event(tenant_id, event_id);

        tracing::info!(block_id = %block.id, assentos = seat_ids.len(), "bloqueio de assentos criado");
        Ok(block)
    }

    // ---
    // Desbloqueio (GA e assentos, um caminho só)
    // ---

    /// Desbloqueia um bloqueio pelo id, qualquer que seja o tipo.
    /// Retorna a quantidade devolvida a 'available'. Bloqueio inexistente ou
    /// já inativo vira `BlockNotFound` — no-op idempotente para o chamador,
    /// nunca um crédito duplicado.
    pub async fn unblock(
        &self,
        tenant_id: Uuid,
        block_id: Uuid,
        actor: &str,
    ) -> Result<i32, AppError> {
        let mut attempt = 1;
        loop {
            let result = self.try_unblock(tenant_id, block_id, actor).await;
            match result {
                Err(AppError::TransactionConflict) if attempt < MAX_TX_ATTEMPTS => {
                    tracing::warn!(%block_id, attempt, "conflito ao desbloquear, repetindo");
                    tokio::time::sleep(conflict_backoff(attempt)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_unblock(
        &self,
        tenant_id: Uuid,
        block_id: Uuid,
        actor: &str,
    ) -> Result<i32, AppError> {
        let mut tx = self.ledger_repo.pool().begin().await?;

        let block = self
            .ledger_repo
            .get_block(&mut *tx, tenant_id, block_id)
            .await?
            .ok_or(AppError::BlockNotFound)?;

        if !block.active {
            return Err(AppError::BlockNotFound);
        }

        // A desativação condicional decide a corrida entre dois desbloqueios
        // simultâneos: só quem desativar credita capacidade de volta.
        let deactivated = self
            .ledger_repo
            .deactivate_block(&mut *tx, tenant_id, block.id)
            .await?;
        if deactivated == 0 {
            return Err(AppError::BlockNotFound);
        }

        // Interpretação exaustiva da variante etiquetada.
        let affected = match block.kind {
            InventoryKind::Ga => {
                let tier_id = block.tier_id.ok_or_else(|| {
                    AppError::InternalServerError(anyhow::anyhow!(
                        "bloqueio GA {} sem tier_id",
                        block.id
                    ))
                })?;
                let quantity = block.quantity.ok_or_else(|| {
                    AppError::InternalServerError(anyhow::anyhow!(
                        "bloqueio GA {} sem quantity",
                        block.id
                    ))
                })?;

                let tier = self
                    .ledger_repo
                    .get_tier(&mut *tx, tenant_id, tier_id)
                    .await?
                    .ok_or(AppError::TierNotFound)?;
                if tier.needs_reconciliation {
                    return Err(AppError::LedgerInvariantViolation { tier_id: tier.id });
                }

                self.ledger_repo
                    .update_tier_counters(&mut *tx, tier.id, tier.version, 0, -quantity, 0)
                    .await?;
                quantity
            }
            InventoryKind::Reserved => {
                // Assentos que já mudaram de dono são pulados, não fatais.
                let released = self
                    .ledger_repo
                    .release_seats_of_block(&mut *tx, tenant_id, block.id)
                    .await?;
                released as i32
            }
        };

        self.audit_repo
            .append(
                &mut *tx,
                NewAuditEntry {
                    tenant_id,
                    event_id: block.event_id,
                    action: AuditAction::Unblock,
                    kind: block.kind,
                    tier_id: block.tier_id,
                    seat_ids: block.seat_ids.clone(),
                    quantity_delta: -affected,
                    reason: Some(block.reason.clone()),
                    performed_by: actor.to_string(),
                },
            )
            .await?;

        tx.commit().await?;
        self.cache.invalidate_event(tenant_id, block.event_id);

        tracing::info!(%block_id, affected, "bloqueio desativado");
        Ok(affected)
    }

    /// Desbloqueio em lote: bloqueios já inativos são pulados e reportados.
    pub async fn unblock_many(
        &self,
        tenant_id: Uuid,
        block_ids: &[Uuid],
        actor: &str,
    ) -> Result<UnblockOutcome, AppError> {
        let mut affected_count = 0;
        let mut skipped_block_ids = Vec::new();

        for block_id in block_ids {
            match self.unblock(tenant_id, *block_id, actor).await {
                Ok(qty) => affected_count += qty,
                Err(AppError::BlockNotFound) => skipped_block_ids.push(*block_id),
                Err(e) => return Err(e),
            }
        }

        Ok(UnblockOutcome {
            affected_count,
            skipped_block_ids,
        })
    }

    // ---
    // Venda direta e estorno: GA
    // ---

    pub async fn sale_ga(
        &self,
        tenant_id: Uuid,
        tier_id: Uuid,
        quantity: i32,
        order_ref: &str,
        actor: &str,
    ) -> Result<(), AppError> {
        self.move_ga(tenant_id, tier_id, quantity, AuditAction::Sale, order_ref, actor)
            .await
    }

    /// Reversão explícita de venda, disparada pelo colaborador de
    /// pedidos/pagamentos (estorno ou disputa). `sold -> available`.
    pub async fn refund_ga(
        &self,
        tenant_id: Uuid,
        tier_id: Uuid,
        quantity: i32,
        order_ref: &str,
        actor: &str,
    ) -> Result<(), AppError> {
        self.move_ga(tenant_id, tier_id, quantity, AuditAction::Refund, order_ref, actor)
            .await
    }

    async fn move_ga(
        &self,
        tenant_id: Uuid,
        tier_id: Uuid,
        quantity: i32,
        action: AuditAction,
        order_ref: &str,
        actor: &str,
    ) -> Result<(), AppError> {
        let mut attempt = 1;
        loop {
            let result = self
                .try_move_ga(tenant_id, tier_id, quantity, action, order_ref, actor)
                .await;
            match result {
                Err(AppError::TransactionConflict) if attempt < MAX_TX_ATTEMPTS => {
                    tracing::warn!(%tier_id, attempt, "conflito de versão na venda/estorno GA, repetindo");
                    tokio::time::sleep(conflict_backoff(attempt)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_move_ga(
        &self,
        tenant_id: Uuid,
        tier_id: Uuid,
        quantity: i32,
        action: AuditAction,
        order_ref: &str,
        actor: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.ledger_repo.pool().begin().await?;

        let tier = self
            .ledger_repo
            .get_tier(&mut *tx, tenant_id, tier_id)
            .await?
            .ok_or(AppError::TierNotFound)?;

        if tier.needs_reconciliation {
            return Err(AppError::LedgerInvariantViolation { tier_id: tier.id });
        }

        let (sold_delta, audit_delta) = match action {
            AuditAction::Sale => {
                if tier.available() < quantity {
                    return Err(AppError::InsufficientInventory {
                        requested: quantity,
                        available: tier.available(),
                    });
                }
                (quantity, quantity)
            }
            AuditAction::Refund => {
                if tier.sold < quantity {
                    return Err(AppError::InvalidRequest(format!(
                        "Estorno de {quantity} excede o total vendido ({}).",
                        tier.sold
                    )));
                }
                (-quantity, -quantity)
            }
            _ => {
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "ação inválida para movimentação de GA"
                )));
            }
        };

        self.ledger_repo
            .update_tier_counters(&mut *tx, tier.id, tier.version, sold_delta, 0, 0)
            .await?;

        self.audit_repo
            .append(
                &mut *tx,
                NewAuditEntry {
                    tenant_id,
                    event_id: tier.event_id,
                    action,
                    kind: InventoryKind::Ga,
                    tier_id: Some(tier.id),
                    seat_ids: None,
                    quantity_delta: audit_delta,
                    reason: Some(order_ref.to_string()),
                    performed_by: actor.to_string(),
                },
            )
            .await?;

        tx.commit().await?;
        self.cache.invalidate_event(tenant_id, tier.event_id);
        Ok(())
    }

    // ---
    // Venda direta e estorno: assentos
    // ---

    pub async fn sale_seats(
        &self,
        tenant_id: Uuid,
        seat_ids: &[Uuid],
        order_ref: &str,
        actor: &str,
    ) -> Result<(), AppError> {
        self.move_seats(
            tenant_id,
            seat_ids,
            SeatStatus::Available,
            SeatStatus::Sold,
            AuditAction::Sale,
            order_ref,
            actor,
        )
        .await
    }

    pub async fn refund_seats(
        &self,
        tenant_id: Uuid,
        seat_ids: &[Uuid],
        order_ref: &str,
        actor: &str,
    ) -> Result<(), AppError> {
        self.move_seats(
            tenant_id,
            seat_ids,
            SeatStatus::Sold,
            SeatStatus::Available,
            AuditAction::Refund,
            order_ref,
            actor,
        )
        .await
    }

    async fn move_seats(
        &self,
        tenant_id: Uuid,
        seat_ids: &[Uuid],
        from: SeatStatus,
        to: SeatStatus,
        action: AuditAction,
        order_ref: &str,
        actor: &str,
    ) -> Result<(), AppError> {
        let mut seen = HashSet::new();
        let seat_ids: Vec<Uuid> = seat_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        if seat_ids.is_empty() {
            return Err(AppError::InvalidRequest(
                "A lista de assentos não pode ser vazia.".to_string(),
            ));
        }

        let mut tx = self.ledger_repo.pool().begin().await?;

        let seats = self
            .ledger_repo
            .get_seats_for_update(&mut *tx, tenant_id, &seat_ids)
            .await?;

        if seats.len() != seat_ids.len() {
            let found: HashSet<Uuid> = seats.iter().map(|s| s.id).collect();
            let missing = seat_ids
                .iter()
                .copied()
                .filter(|id| !found.contains(id))
                .collect();
            return Err(AppError::SeatNotFound(missing));
        }

        let wrong_state: Vec<Uuid> = seats
            .iter()
            .filter(|s| s.status != from)
            .map(|s| s.id)
            .collect();
        if !wrong_state.is_empty() {
            return match action {
                AuditAction::Sale => Err(AppError::SeatAlreadyTaken { seats: wrong_state }),
                _ => Err(AppError::InvalidRequest(format!(
                    "Assentos fora do estado esperado para estorno: {wrong_state:?}"
                ))),
            };
        }

        // Venda/estorno não nomeia o evento no payload: exige ao menos que
        // todos os assentos sejam do mesmo evento.
        let event_id = ensure_same_event(&seats, None)?;

        let changed = self
            .ledger_repo
            .transition_seats(&mut *tx, tenant_id, &seat_ids, from, to, None, None)
            .await?;
        if changed != seat_ids.len() as u64 {
            return Err(AppError::TransactionConflict);
        }

        let delta = seat_ids.len() as i32;
        let audit_delta = if action == AuditAction::Refund { -delta } else { delta };

        self.audit_repo
            .append(
                &mut *tx,
                NewAuditEntry {
                    tenant_id,
                    event_id,
                    action,
                    kind: InventoryKind::Reserved,
                    tier_id: None,
                    seat_ids: Some(seat_ids.clone()),
                    quantity_delta: audit_delta,
                    reason: Some(order_ref.to_string()),
                    performed_by: actor.to_string(),
                },
            )
            .await?;

        tx.commit().await?;
        self.cache.invalidate_event(tenant_id, event_id);
        Ok(())
    }

    // ---
    // Reconciliação contra a trilha de auditoria
    // ---

    /// Compara os contadores do lote com o somatório dos deltas da auditoria.
    /// Divergência liga `needs_reconciliation` e trava o lote para mutação —
    /// os contadores nunca são "consertados" automaticamente, porque um ajuste
    /// silencioso poderia mascarar um oversell.
    pub async fn reconcile_tier(
        &self,
        tenant_id: Uuid,
        tier_id: Uuid,
    ) -> Result<ReconciliationReport, AppError> {
        let mut tx = self.ledger_repo.pool().begin().await?;

        let tier = self
            .ledger_repo
            .get_tier(&mut *tx, tenant_id, tier_id)
            .await?
            .ok_or(AppError::TierNotFound)?;

        let deltas = self.audit_repo.tier_deltas(&mut *tx, tenant_id, tier_id).await?;

        let consistent = i64::from(tier.sold) == deltas.sold_delta
            && i64::from(tier.blocked) == deltas.blocked_delta
            && tier.available() >= 0;

        let mut flagged = tier.needs_reconciliation;
        if !consistent && !tier.needs_reconciliation {
            self.ledger_repo
                .set_reconciliation_flag(&mut *tx, tier.id, true)
                .await?;
            flagged = true;
            tracing::error!(
                %tier_id,
                sold = tier.sold,
                expected_sold = deltas.sold_delta,
                blocked = tier.blocked,
                expected_blocked = deltas.blocked_delta,
                "contadores divergem da trilha de auditoria; lote travado"
            );
        } else if consistent && tier.needs_reconciliation {
            // O operador chamou a reconciliação e a trilha voltou a bater:
            // destravar aqui é a própria reconciliação manual.
            self.ledger_repo
                .set_reconciliation_flag(&mut *tx, tier.id, false)
                .await?;
            flagged = false;
            tracing::info!(%tier_id, "lote reconciliado e destravado");
        }

        tx.commit().await?;

        Ok(ReconciliationReport {
            tier_id,
            consistent,
            sold: tier.sold,
            expected_sold: deltas.sold_delta,
            blocked: tier.blocked,
            expected_blocked: deltas.blocked_delta,
            flagged,
        })
    }

    // ---

    fn guard_tier(&self, tier: &TicketTier, event_id: Uuid) -> Result<(), AppError> {
        if tier.event_id != event_id {
            return Err(AppError::InvalidRequest(
                "O lote informado não pertence a este evento.".to_string(),
            ));
        }
        if tier.needs_reconciliation {
            return Err(AppError::LedgerInvariantViolation { tier_id: tier.id });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn seat(event_id: Uuid) -> Seat {
        let now = Utc::now();
        Seat {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            event_id,
            section_id: "A".to_string(),
            row_label: "1".to_string(),
            seat_number: 1,
            status: SeatStatus::Available,
            active_block_id: None,
            active_hold_id: None,
            price: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn assentos_do_mesmo_evento_passam() {
        let event = Uuid::new_v4();
        let seats = vec![seat(event), seat(event)];

        assert_eq!(ensure_same_event(&seats, Some(event)).unwrap(), event);
        assert_eq!(ensure_same_event(&seats, None).unwrap(), event);
    }

    #[test]
    fn assentos_de_eventos_misturados_sao_rejeitados() {
        let event = Uuid::new_v4();
        let seats = vec![seat(event), seat(Uuid::new_v4())];

        assert!(matches!(
            ensure_same_event(&seats, Some(event)),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            ensure_same_event(&seats, None),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn evento_nomeado_deve_bater_com_os_assentos() {
        let seats = vec![seat(Uuid::new_v4())];

        assert!(matches!(
            ensure_same_event(&seats, Some(Uuid::new_v4())),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            ensure_same_event(&[], None),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn backoff_cresce_com_a_tentativa_e_respeita_o_jitter() {
        for attempt in 1..MAX_TX_ATTEMPTS {
            let d = conflict_backoff(attempt);
            let min = Duration::from_millis(BACKOFF_BASE_MS * u64::from(attempt));
            let max = min + Duration::from_millis(BACKOFF_JITTER_MS);
            assert!(d >= min, "tentativa {attempt}: {d:?} abaixo do mínimo");
            assert!(d < max, "tentativa {attempt}: {d:?} acima do máximo");
        }
    }
}
