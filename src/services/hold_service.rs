// src/services/hold_service.rs

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    common::{cache::SummaryCache, error::AppError},
    db::{AuditRepository, HoldRepository, LedgerRepository},
    models::inventory::{
        AuditAction, Hold, HoldTarget, InventoryKind, NewAuditEntry, SeatStatus,
    },
    services::ledger_service::{MAX_TX_ATTEMPTS, conflict_backoff, ensure_same_event},
};

// Teto do TTL de uma reserva de checkout: acima disso é erro do chamador,
// não intenção legítima.
const MAX_HOLD_TTL_SECONDS: i64 = 24 * 60 * 60;

/// TTL efetivo da reserva: o pedido ou o padrão do sistema, sempre dentro
/// de (0, teto].
fn effective_ttl(requested: Option<i64>, default_ttl: i64) -> Result<i64, AppError> {
    let ttl = requested.unwrap_or(default_ttl);
    if ttl <= 0 || ttl > MAX_HOLD_TTL_SECONDS {
        return Err(AppError::InvalidRequest(format!(
            "O TTL da reserva deve estar entre 1 e {MAX_HOLD_TTL_SECONDS} segundos."
        )));
    }
    Ok(ttl)
}

/// Expiração da reserva com aritmética checada: um TTL fora do intervalo
/// representável vira `None`, nunca pânico.
fn hold_expires_at(now: DateTime<Utc>, ttl_seconds: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(ttl_seconds).and_then(|d| now.checked_add_signed(d))
}

/// Deltas de uma finalização GA, na ordem (sold, held, delta da auditoria):
/// a conversão move held -> sold; a liberação devolve held -> available.
fn ga_finish_deltas(quantity: i32, convert: bool) -> (i32, i32, i32) {
    if convert {
        (quantity, -quantity, quantity)
    } else {
        (0, -quantity, -quantity)
    }
}

// Reservas de checkout seguem exatamente o mesmo caminho atômico e
// preservador de invariante que bloqueios e vendas — nunca um update solto
// de campo fora de transação.
#[derive(Clone)]
pub struct HoldService {
    ledger_repo: LedgerRepository,
    hold_repo: HoldRepository,
    audit_repo: AuditRepository,
    cache: Arc<SummaryCache>,
    default_ttl_seconds: i64,
}

impl HoldService {
    pub fn new(
        ledger_repo: LedgerRepository,
        hold_repo: HoldRepository,
        audit_repo: AuditRepository,
        cache: Arc<SummaryCache>,
        default_ttl_seconds: i64,
    ) -> Self {
        Self {
            ledger_repo,
            hold_repo,
            audit_repo,
            cache,
            default_ttl_seconds,
        }
    }

    // ---
    // Criação
    // ---

    /// Move quantidade/assentos de 'available' para 'held' e registra a
    /// reserva com validade. A reserva expira em `ttl_seconds` (padrão: 300).
    pub async fn create_hold(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        target: HoldTarget,
        session_id: &str,
        ttl_seconds: Option<i64>,
    ) -> Result<Hold, AppError> {
        let ttl = effective_ttl(ttl_seconds, self.default_ttl_seconds)?;

        let mut attempt = 1;
        loop {
            let result = self
                .try_create_hold(tenant_id, event_id, &target, session_id, ttl)
                .await;
            match result {
                Err(AppError::TransactionConflict) if attempt < MAX_TX_ATTEMPTS => {
                    tracing::warn!(attempt, "conflito ao criar reserva, repetindo");
                    tokio::time::sleep(conflict_backoff(attempt)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_create_hold(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        target: &HoldTarget,
        session_id: &str,
        ttl_seconds: i64,
    ) -> Result<Hold, AppError> {
        let expires_at = hold_expires_at(Utc::now(), ttl_seconds).ok_or_else(|| {
            AppError::InvalidRequest("O TTL da reserva excede o intervalo representável.".to_string())
        })?;
        let mut tx = self.hold_repo.pool().begin().await?;

        let hold = match target {
            HoldTarget::Ga { tier_id, quantity } => {
                let tier = self
                    .ledger_repo
                    .get_tier(&mut *tx, tenant_id, *tier_id)
                    .await?
                    .ok_or(AppError::TierNotFound)?;

                if tier.event_id != event_id {
                    return Err(AppError::InvalidRequest(
                        "O lote informado não pertence a este evento.".to_string(),
                    ));
                }
                if tier.needs_reconciliation {
                    return Err(AppError::LedgerInvariantViolation { tier_id: tier.id });
                }
                if tier.available() < *quantity {
                    return Err(AppError::InsufficientInventory {
                        requested: *quantity,
                        available: tier.available(),
                    });
                }

                self.ledger_repo
                    .update_tier_counters(&mut *tx, tier.id, tier.version, 0, 0, *quantity)
                    .await?;

                let hold = self
                    .hold_repo
                    .insert_ga(
                        &mut *tx, tenant_id, event_id, tier.id, *quantity, session_id, expires_at,
                    )
                    .await?;

                self.audit_repo
                    .append(
                        &mut *tx,
                        NewAuditEntry {
                            tenant_id,
                            event_id,
                            action: AuditAction::Hold,
                            kind: InventoryKind::Ga,
                            tier_id: Some(tier.id),
                            seat_ids: None,
                            quantity_delta: *quantity,
                            reason: Some(format!("sessão {session_id}")),
                            performed_by: session_id.to_string(),
                        },
                    )
                    .await?;

                hold
            }
            HoldTarget::Reserved { seat_ids } => {
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

                let taken: Vec<Uuid> = seats
                    .iter()
                    .filter(|s| s.status != SeatStatus::Available)
                    .map(|s| s.id)
                    .collect();
                if !taken.is_empty() {
                    return Err(AppError::SeatAlreadyTaken { seats: taken });
                }

                ensure_same_event(&seats, Some(event_id))?;

                let hold = self
                    .hold_repo
                    .insert_reserved(
                        &mut *tx, tenant_id, event_id, &seat_ids, session_id, expires_at,
                    )
                    .await?;

                let changed = self
                    .ledger_repo
                    .transition_seats(
                        &mut *tx,
                        tenant_id,
                        &seat_ids,
                        SeatStatus::Available,
                        SeatStatus::Held,
                        None,
                        Some(hold.id),
                    )
                    .await?;
                if changed != seat_ids.len() as u64 {
                    return Err(AppError::TransactionConflict);
                }

                self.audit_repo
                    .append(
                        &mut *tx,
                        NewAuditEntry {
                            tenant_id,
                            event_id,
                            action: AuditAction::Hold,
                            kind: InventoryKind::Reserved,
                            tier_id: None,
                            seat_ids: Some(seat_ids.clone()),
                            quantity_delta: seat_ids.len() as i32,
                            reason: Some(format!("sessão {session_id}")),
                            performed_by: session_id.to_string(),
                        },
                    )
                    .await?;

                hold
            }
        };

        tx.commit().await?;
        self.cache.invalidate_event(tenant_id, event_id);

        tracing::info!(hold_id = %hold.id, expira_em = %hold.expires_at, "reserva criada");
        Ok(hold)
    }

    // ---
    // Liberação (idempotente)
    // ---

    /// Devolve a reserva para 'available'. Retorna `false` se a reserva não
    /// existe mais (já liberada, convertida ou varrida) — um no-op benigno,
    /// nunca um crédito duplicado.
    pub async fn release_hold(
        &self,
        tenant_id: Uuid,
        hold_id: Uuid,
        actor: &str,
    ) -> Result<bool, AppError> {
        let mut attempt = 1;
        loop {
            let result = self.try_finish_hold(tenant_id, hold_id, false, None, actor).await;
            match result {
                Err(AppError::TransactionConflict) if attempt < MAX_TX_ATTEMPTS => {
                    tracing::warn!(%hold_id, attempt, "conflito ao liberar reserva, repetindo");
                    tokio::time::sleep(conflict_backoff(attempt)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Converte a reserva diretamente em venda: 'held' -> 'sold', sem nunca
    /// passar por 'available' — uma reserva em compra ativa não pode ficar
    /// visível como disponível para terceiros, nem por um instante.
    pub async fn convert_hold_to_sale(
        &self,
        tenant_id: Uuid,
        hold_id: Uuid,
        order_ref: &str,
        actor: &str,
    ) -> Result<bool, AppError> {
        let mut attempt = 1;
        loop {
            let result = self
                .try_finish_hold(tenant_id, hold_id, true, Some(order_ref), actor)
                .await;
            match result {
                Err(AppError::TransactionConflict) if attempt < MAX_TX_ATTEMPTS => {
                    tracing::warn!(%hold_id, attempt, "conflito ao converter reserva, repetindo");
                    tokio::time::sleep(conflict_backoff(attempt)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Caminho único para liberar ou converter. A exclusão condicional da
    /// linha da reserva decide a corrida release x convert: quem apagar
    /// primeiro vence; o perdedor lê zero linhas e devolve `false`.
    async fn try_finish_hold(
        &self,
        tenant_id: Uuid,
        hold_id: Uuid,
        convert: bool,
        order_ref: Option<&str>,
        actor: &str,
    ) -> Result<bool, AppError> {
        let mut tx = self.hold_repo.pool().begin().await?;

        let Some(hold) = self
            .hold_repo
            .delete_returning(&mut *tx, tenant_id, hold_id)
            .await?
        else {
            return Ok(false);
        };

        let (action, reason) = if convert {
            (
                AuditAction::Sale,
                order_ref.map(str::to_string),
            )
        } else {
            (AuditAction::Release, Some(format!("sessão {}", hold.session_id)))
        };

        let quantity_delta = match hold.kind {
            InventoryKind::Ga => {
                let tier_id = hold.tier_id.ok_or_else(|| {
                    AppError::InternalServerError(anyhow::anyhow!(
                        "reserva GA {} sem tier_id",
                        hold.id
                    ))
                })?;
                let quantity = hold.quantity.ok_or_else(|| {
                    AppError::InternalServerError(anyhow::anyhow!(
                        "reserva GA {} sem quantity",
                        hold.id
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

                // Conversão: held -> sold. Liberação: held -> available.
                let (sold_delta, held_delta, audit_delta) = ga_finish_deltas(quantity, convert);
                self.ledger_repo
                    .update_tier_counters(&mut *tx, tier.id, tier.version, sold_delta, 0, held_delta)
                    .await?;

                audit_delta
            }
            InventoryKind::Reserved => {
                let to = if convert { SeatStatus::Sold } else { SeatStatus::Available };
                let changed = self
                    .ledger_repo
                    .transition_seats_of_hold(&mut *tx, tenant_id, hold.id, to)
                    .await?;
                if convert { changed as i32 } else { -(changed as i32) }
            }
        };

        self.audit_repo
            .append(
                &mut *tx,
                NewAuditEntry {
                    tenant_id,
                    event_id: hold.event_id,
                    action,
                    kind: hold.kind,
                    tier_id: hold.tier_id,
                    seat_ids: hold.seat_ids.clone(),
                    quantity_delta,
                    reason,
                    performed_by: actor.to_string(),
                },
            )
            .await?;

        tx.commit().await?;
        self.cache.invalidate_event(tenant_id, hold.event_id);

        tracing::info!(%hold_id, convert, "reserva finalizada");
        Ok(true)
    }

    // ---
    // Varredura do reaper
    // ---

    /// Libera todas as reservas vencidas, tolerando "já liberada" como
    /// sucesso — outro caminho pode ter convertido a reserva em venda antes.
    pub async fn sweep_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let expired = self
            .hold_repo
            .find_expired(self.hold_repo.pool(), now, 200)
            .await?;

        let mut released = 0;
        // O SQL já filtra por expires_at < now; o filtro local repete o
        // contrato (estritamente menor) sobre os registros carregados.
        for hold in expired.into_iter().filter(|h| h.is_expired(now)) {
            match self.release_hold(hold.tenant_id, hold.id, "reaper").await {
                Ok(true) => released += 1,
                // Convertida ou liberada por outro caminho no meio-tempo.
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(hold_id = %hold.id, "reaper: falha ao liberar reserva: {}", e);
                }
            }
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ga_hold(quantity: i32) -> Hold {
        let now = Utc::now();
        Hold {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            kind: InventoryKind::Ga,
            tier_id: Some(Uuid::new_v4()),
            quantity: Some(quantity),
            seat_ids: None,
            session_id: "sessao-teste".to_string(),
            created_at: now,
            expires_at: now + Duration::seconds(300),
        }
    }

    #[test]
    fn ttl_usa_o_padrao_e_respeita_os_limites() {
        assert_eq!(effective_ttl(None, 300).unwrap(), 300);
        assert_eq!(effective_ttl(Some(60), 300).unwrap(), 60);
        assert_eq!(
            effective_ttl(Some(MAX_HOLD_TTL_SECONDS), 300).unwrap(),
            MAX_HOLD_TTL_SECONDS
        );

        assert!(matches!(
            effective_ttl(Some(0), 300),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            effective_ttl(Some(-1), 300),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            effective_ttl(Some(MAX_HOLD_TTL_SECONDS + 1), 300),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            effective_ttl(Some(i64::MAX), 300),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn ttl_gigante_nao_estoura_o_calculo_de_expiracao() {
        let now = Utc::now();

        assert_eq!(
            hold_expires_at(now, 300),
            Some(now + Duration::seconds(300))
        );
        // Fora do intervalo representável do chrono: None, nunca pânico.
        assert!(hold_expires_at(now, i64::MAX).is_none());
        assert!(hold_expires_at(now, i64::MIN).is_none());
    }

    #[test]
    fn deltas_de_finalizacao_ga() {
        // Conversão: held -> sold, delta de auditoria positivo.
        assert_eq!(ga_finish_deltas(2, true), (2, -2, 2));
        // Liberação: held -> available, delta de auditoria negativo.
        assert_eq!(ga_finish_deltas(2, false), (0, -2, -2));
    }

    // A exclusão condicional da linha da reserva é o árbitro: só quem apagar
    // a linha aplica deltas. A segunda chamada lê None e não credita nada.
    #[test]
    fn liberacao_dupla_credita_a_capacidade_uma_vez_so() {
        let hold = ga_hold(2);
        let mut table: HashMap<Uuid, Hold> = HashMap::from([(hold.id, hold.clone())]);

        let (mut sold, mut held) = (0, 2);
        for _ in 0..2 {
            if let Some(h) = table.remove(&hold.id) {
                let (sold_d, held_d, _) = ga_finish_deltas(h.quantity.unwrap(), false);
                sold += sold_d;
                held += held_d;
            }
        }

        assert_eq!((sold, held), (0, 0));
    }

    #[test]
    fn liberacao_apos_conversao_e_noop_benigno() {
        let hold = ga_hold(2);
        let mut table: HashMap<Uuid, Hold> = HashMap::from([(hold.id, hold.clone())]);

        let (mut sold, mut held) = (0, 2);

        // A conversão vence a corrida e apaga a linha.
        let converted = table.remove(&hold.id);
        assert!(converted.is_some());
        let (sold_d, held_d, _) = ga_finish_deltas(2, true);
        sold += sold_d;
        held += held_d;

        // A liberação (ou o reaper) chega depois: linha ausente, nada muda.
        assert!(table.remove(&hold.id).is_none());

        assert_eq!((sold, held), (2, 0));
    }

    #[test]
    fn reserva_expira_estritamente_apos_o_prazo() {
        let hold = ga_hold(1);
        let at = hold.expires_at;

        assert!(!hold.is_expired(at));
        assert!(!hold.is_expired(at - Duration::seconds(1)));
        assert!(hold.is_expired(at + Duration::seconds(1)));
    }
}
