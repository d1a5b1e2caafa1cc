// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Lote de Pista (General Admission)
// ---
// Balde de capacidade vendido por quantidade, não por assento.
// 'available' nunca é armazenado: é sempre derivado dos contadores.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketTier {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub total_capacity: i32,
    pub sold: i32,
    pub blocked: i32,
    pub held: i32,

    // Contador da trava otimista. Todo UPDATE de contadores é condicionado
    // à versão lida e a incrementa.
    #[serde(skip_serializing)]
    pub version: i64,

    // Ligada quando a reconciliação contra a auditoria diverge dos contadores.
    // Enquanto estiver ligada, nenhuma mutação é aceita neste lote.
    pub needs_reconciliation: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketTier {
    /// Quantidade derivada: capacidade menos tudo que já está comprometido.
    pub fn available(&self) -> i32 {
        self.total_capacity - self.sold - self.blocked - self.held
    }
}

// ---
// 2. Assento numerado
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "seat_status", rename_all = "lowercase")] // Banco
#[serde(rename_all = "lowercase")] // JSON
pub enum SeatStatus {
    Available,
    Held,
    Blocked,
    Sold,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub section_id: String,
    pub row_label: String,
    pub seat_number: i32,
    pub status: SeatStatus,
    pub active_block_id: Option<Uuid>,
    pub active_hold_id: Option<Uuid>,
    pub price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 3. Bloqueio administrativo
// ---
// Variante etiquetada: um bloqueio é de GA (tier + quantidade) OU de assentos
// (conjunto de seat_ids). O CHECK do banco garante que nunca mistura os dois.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "inventory_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InventoryKind {
    Ga,
    Reserved,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryBlock {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub kind: InventoryKind,
    pub tier_id: Option<Uuid>,
    pub seat_ids: Option<Vec<Uuid>>,
    pub quantity: Option<i32>,
    pub reason: String,
    pub notes: Option<String>,
    pub blocked_by: String,
    pub blocked_at: DateTime<Utc>,
    // O desbloqueio desativa o registro em vez de apagá-lo (histórico).
    pub active: bool,
}

// ---
// 4. Reserva de checkout (Hold)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Hold {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub kind: InventoryKind,
    pub tier_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub seat_ids: Option<Vec<Uuid>>,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Alvo de uma reserva: quantidade de um lote de GA ou assentos específicos.
#[derive(Debug, Clone)]
pub enum HoldTarget {
    Ga { tier_id: Uuid, quantity: i32 },
    Reserved { seat_ids: Vec<Uuid> },
}

// ---
// 5. Trilha de Auditoria (livro-razão)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "audit_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Block,
    Unblock,
    Hold,
    Release,
    Sale,
    Refund,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    // Cursor de paginação e ordem total por evento.
    pub seq: i64,
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub action: AuditAction,
    pub kind: InventoryKind,
    pub tier_id: Option<Uuid>,
    pub seat_ids: Option<Vec<Uuid>>,
    pub quantity_delta: i32,
    pub reason: Option<String>,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
}

/// Entrada ainda não persistida (sem seq/id/performed_at, que o banco gera).
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub action: AuditAction,
    pub kind: InventoryKind,
    pub tier_id: Option<Uuid>,
    pub seat_ids: Option<Vec<Uuid>>,
    pub quantity_delta: i32,
    pub reason: Option<String>,
    pub performed_by: String,
}

// ---
// 6. Projeções de disponibilidade (somente leitura)
// ---

/// Resumo de um balde de capacidade, com percentuais para exibição.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySummary {
    pub capacity: i32,
    pub sold: i32,
    pub blocked: i32,
    pub held: i32,
    pub available: i32,
    pub sold_percent: f64,
    pub blocked_percent: f64,
    pub held_percent: f64,
    pub available_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierSummary {
    pub tier_id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub summary: AvailabilitySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    pub section_id: String,
    #[serde(flatten)]
    pub summary: AvailabilitySummary,
}

/// Resumo agregado de um evento inteiro (lotes de GA + seções numeradas).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventInventorySummary {
    pub event_id: Uuid,
    pub total_capacity: i32,
    pub total_sold: i32,
    pub total_blocked: i32,
    pub total_held: i32,
    pub total_available: i32,
    pub tiers: Vec<TierSummary>,
    pub sections: Vec<SectionSummary>,
}

/// Linha da contagem de assentos por seção/status (GROUP BY no banco).
#[derive(Debug, Clone, FromRow)]
pub struct SectionStatusCount {
    pub section_id: String,
    pub status: SeatStatus,
    pub total: i64,
}

/// Somatório dos deltas de auditoria de um lote, usado na reconciliação.
/// Apenas block/unblock/sale/refund participam: holds são transitórios.
#[derive(Debug, Clone, Default, FromRow)]
pub struct TierAuditDeltas {
    pub sold_delta: i64,
    pub blocked_delta: i64,
}

/// Resultado da reconciliação de um lote contra a trilha de auditoria.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub tier_id: Uuid,
    pub consistent: bool,
    pub sold: i32,
    pub expected_sold: i64,
    pub blocked: i32,
    pub expected_blocked: i64,
    pub flagged: bool,
}
