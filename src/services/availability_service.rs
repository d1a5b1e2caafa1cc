// src/services/availability_service.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{cache::SummaryCache, error::AppError},
    db::LedgerRepository,
    models::inventory::{
        AvailabilitySummary, EventInventorySummary, SeatStatus, SectionSummary, TierSummary,
    },
};

// Projeção pura e somente-leitura do estado do livro-razão para exibição.
// Nunca autoriza mutação nenhuma, então pode ser servida do cache (ou de uma
// réplica levemente defasada) sem risco.

/// Calcula o resumo de um balde de capacidade. Função pura: sem transação,
/// sem efeito colateral, trivialmente paralelizável.
pub fn summarize(capacity: i32, sold: i32, blocked: i32, held: i32) -> AvailabilitySummary {
    let available = capacity - sold - blocked - held;
    AvailabilitySummary {
        capacity,
        sold,
        blocked,
        held,
        available,
        sold_percent: percent_of(sold, capacity),
        blocked_percent: percent_of(blocked, capacity),
        held_percent: percent_of(held, capacity),
        available_percent: percent_of(available, capacity),
    }
}

fn percent_of(part: i32, whole: i32) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    let raw = f64::from(part) * 100.0 / f64::from(whole);
    // Duas casas decimais bastam para exibição.
    (raw * 100.0).round() / 100.0
}

#[derive(Clone)]
pub struct AvailabilityService {
    ledger_repo: LedgerRepository,
    cache: Arc<SummaryCache>,
}

impl AvailabilityService {
    pub fn new(ledger_repo: LedgerRepository, cache: Arc<SummaryCache>) -> Self {
        Self { ledger_repo, cache }
    }

    /// Resumo agregado de um evento: lotes de GA + seções numeradas.
    /// Passa pelo cache com TTL; toda mutação bem-sucedida invalida a entrada.
    pub async fn event_summary(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
    ) -> Result<EventInventorySummary, AppError> {
        if let Some(cached) = self.cache.get(tenant_id, event_id) {
            return Ok(cached);
        }

        let tiers = self
            .ledger_repo
            .get_tiers_for_event(self.ledger_repo.pool(), tenant_id, event_id)
            .await?;
        let seat_counts = self
            .ledger_repo
            .get_section_status_counts(self.ledger_repo.pool(), tenant_id, event_id)
            .await?;

        let tier_summaries: Vec<TierSummary> = tiers
            .iter()
            .map(|t| TierSummary {
                tier_id: t.id,
                name: t.name.clone(),
                summary: summarize(t.total_capacity, t.sold, t.blocked, t.held),
            })
            .collect();

        // Agrega as contagens por seção. BTreeMap mantém a ordem estável
        // das seções na resposta.
        let mut per_section: BTreeMap<String, (i32, i32, i32, i32)> = BTreeMap::new();
        for row in &seat_counts {
            let entry = per_section.entry(row.section_id.clone()).or_default();
            let total = row.total as i32;
            entry.0 += total;
            match row.status {
                SeatStatus::Sold => entry.1 += total,
                SeatStatus::Blocked => entry.2 += total,
                SeatStatus::Held => entry.3 += total,
                SeatStatus::Available => {}
            }
        }

        let section_summaries: Vec<SectionSummary> = per_section
            .into_iter()
            .map(|(section_id, (capacity, sold, blocked, held))| SectionSummary {
                section_id,
                summary: summarize(capacity, sold, blocked, held),
            })
            .collect();

        let mut summary = EventInventorySummary {
            event_id,
            total_capacity: 0,
            total_sold: 0,
            total_blocked: 0,
            total_held: 0,
            total_available: 0,
            tiers: tier_summaries,
            sections: section_summaries,
        };
        for s in summary
            .tiers
            .iter()
            .map(|t| &t.summary)
            .chain(summary.sections.iter().map(|s| &s.summary))
        {
            summary.total_capacity += s.capacity;
            summary.total_sold += s.sold;
            summary.total_blocked += s.blocked;
            summary.total_held += s.held;
            summary.total_available += s.available;
        }

        self.cache.insert(tenant_id, event_id, summary.clone());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resumo_fecha_a_identidade_de_capacidade() {
        let s = summarize(100, 30, 10, 5);
        assert_eq!(s.available, 55);
        assert_eq!(s.capacity, s.sold + s.blocked + s.held + s.available);
        assert!((s.sold_percent - 30.0).abs() < f64::EPSILON);
        assert!((s.available_percent - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn capacidade_zero_nao_divide_por_zero() {
        let s = summarize(0, 0, 0, 0);
        assert_eq!(s.available, 0);
        assert_eq!(s.sold_percent, 0.0);
        assert_eq!(s.available_percent, 0.0);
    }

    #[test]
    fn percentuais_arredondam_para_duas_casas() {
        let s = summarize(3, 1, 0, 0);
        assert!((s.sold_percent - 33.33).abs() < 1e-9);
        assert!((s.available_percent - 66.67).abs() < 1e-9);
    }

    // Ciclo completo de um lote de GA: bloqueio de 10, reserva de 2,
    // conversão em venda, desbloqueio. A identidade de capacidade fecha
    // após cada passo.
    #[test]
    fn sequencia_bloqueio_reserva_venda_desbloqueio() {
        let capacity = 100;
        let (mut sold, mut blocked, mut held) = (0, 0, 0);

        // blockGA(qty = 10, "VIP Hold")
        blocked += 10;
        let s = summarize(capacity, sold, blocked, held);
        assert_eq!((s.blocked, s.available), (10, 90));

        // createHold(qty = 2, ttl = 5m)
        held += 2;
        let s = summarize(capacity, sold, blocked, held);
        assert_eq!((s.held, s.available), (2, 88));

        // convertHoldToSale: held -> sold, sem passar por available
        held -= 2;
        sold += 2;
        let s = summarize(capacity, sold, blocked, held);
        assert_eq!((s.sold, s.held, s.available), (2, 0, 88));

        // unblockGA(blockId)
        blocked -= 10;
        let s = summarize(capacity, sold, blocked, held);
        assert_eq!((s.sold, s.blocked, s.held, s.available), (2, 0, 0, 98));
        assert_eq!(s.capacity, s.sold + s.blocked + s.held + s.available);
    }
}
