// src/common/cache.rs

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::models::inventory::EventInventorySummary;

// Cache explícito do resumo de disponibilidade, com TTL explícito.
// A invalidação acontece em cada mutação bem-sucedida do livro-razão —
// nunca um mapa ambiente escondido em um módulo.
//
// O resumo serve apenas para exibição; nenhuma mutação é autorizada a partir
// dele, então uma leitura levemente defasada é aceitável.
pub struct SummaryCache {
    ttl: Duration,
    entries: RwLock<HashMap<(Uuid, Uuid), CachedSummary>>,
}

struct CachedSummary {
    inserted_at: Instant,
    summary: EventInventorySummary,
}

impl SummaryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Retorna o resumo se ainda estiver dentro do TTL.
    pub fn get(&self, tenant_id: Uuid, event_id: Uuid) -> Option<EventInventorySummary> {
        let entries = self.entries.read().ok()?;
        let cached = entries.get(&(tenant_id, event_id))?;
        if cached.inserted_at.elapsed() < self.ttl {
            Some(cached.summary.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, tenant_id: Uuid, event_id: Uuid, summary: EventInventorySummary) {
        if let Ok(mut entries) = self.entries.write() {
            // Limpeza preguiçosa: aproveita a escrita para descartar vencidos.
            entries.retain(|_, c| c.inserted_at.elapsed() < self.ttl);
            entries.insert(
                (tenant_id, event_id),
                CachedSummary {
                    inserted_at: Instant::now(),
                    summary,
                },
            );
        }
    }

    /// Chamada em todo commit de mutação que toca o evento.
    pub fn invalidate_event(&self, tenant_id: Uuid, event_id: Uuid) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(&(tenant_id, event_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::EventInventorySummary;

    fn sample_summary(event_id: Uuid) -> EventInventorySummary {
        EventInventorySummary {
            event_id,
            total_capacity: 100,
            total_sold: 2,
            total_blocked: 0,
            total_held: 0,
            total_available: 98,
            tiers: vec![],
            sections: vec![],
        }
    }

    #[test]
    fn get_devolve_enquanto_dentro_do_ttl() {
        let cache = SummaryCache::new(Duration::from_secs(60));
        let tenant = Uuid::new_v4();
        let event = Uuid::new_v4();

        assert!(cache.get(tenant, event).is_none());
        cache.insert(tenant, event, sample_summary(event));
        assert_eq!(cache.get(tenant, event).unwrap().total_available, 98);
    }

    #[test]
    fn entrada_vencida_nao_e_devolvida() {
        let cache = SummaryCache::new(Duration::from_millis(0));
        let tenant = Uuid::new_v4();
        let event = Uuid::new_v4();

        cache.insert(tenant, event, sample_summary(event));
        assert!(cache.get(tenant, event).is_none());
    }

    #[test]
    fn invalidar_evento_remove_somente_aquele_evento() {
        let cache = SummaryCache::new(Duration::from_secs(60));
        let tenant = Uuid::new_v4();
        let event_a = Uuid::new_v4();
        let event_b = Uuid::new_v4();

        cache.insert(tenant, event_a, sample_summary(event_a));
        cache.insert(tenant, event_b, sample_summary(event_b));

        cache.invalidate_event(tenant, event_a);
        assert!(cache.get(tenant, event_a).is_none());
        assert!(cache.get(tenant, event_b).is_some());
    }
}
