// src/handlers/inventory.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::inventory::{AuditLogEntry, HoldTarget, InventoryKind, ReconciliationReport},
};

// ---
// Validações customizadas
// ---

// Teto de assentos criados por chamada: uma grade maior deve ser enviada em
// várias requisições, nunca em uma transação gigante.
const MAX_SEATS_PER_REQUEST: i64 = 5_000;

fn validate_positive(val: i32) -> Result<(), ValidationError> {
    if val <= 0 {
        let mut err = ValidationError::new("range");
        err.message = Some("A quantidade deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

/// Valida a consistência de um alvo etiquetado (GA x assentos): o payload
/// precisa trazer exatamente o que o tipo exige, nada a mais.
fn validate_target(
    kind: InventoryKind,
    tier_id: Option<Uuid>,
    quantity: Option<i32>,
    seat_ids: &Option<Vec<Uuid>>,
) -> Result<(), ValidationError> {
    match kind {
        InventoryKind::Ga => {
            if tier_id.is_none() {
                return Err(ValidationError::new("TierRequiredForGa"));
            }
            match quantity {
                Some(q) => validate_positive(q)?,
                None => return Err(ValidationError::new("PositiveQuantityRequiredForGa")),
            }
            if seat_ids.is_some() {
                return Err(ValidationError::new("SeatIdsNotAllowedForGa"));
            }
        }
        InventoryKind::Reserved => {
            if seat_ids.as_ref().is_none_or(|s| s.is_empty()) {
                return Err(ValidationError::new("SeatIdsRequiredForReserved"));
            }
            if tier_id.is_some() || quantity.is_some() {
                return Err(ValidationError::new("TierFieldsNotAllowedForReserved"));
            }
        }
    }
    Ok(())
}

/// Limita o tamanho da grade (fileiras x assentos por fileira) de uma chamada.
fn validate_seat_grid(row_count: usize, seats_per_row: i32) -> Result<(), ValidationError> {
    let total = row_count as i64 * i64::from(seats_per_row.max(0));
    if total > MAX_SEATS_PER_REQUEST {
        let mut err = ValidationError::new("range");
        err.message = Some(
            format!("A grade excede o máximo de {MAX_SEATS_PER_REQUEST} assentos por chamada.")
                .into(),
        );
        return Err(err);
    }
    Ok(())
}

fn field_validation_error(field: &'static str, e: ValidationError) -> AppError {
    // Mantém o padrão de resposta de validação campo a campo.
    let mut errors = validator::ValidationErrors::new();
    errors.add(field, e);
    AppError::ValidationError(errors)
}

// ---
// Payload: CreateTier (configuração de precificação)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTierPayload {
    pub event_id: Uuid,

    #[validate(length(min = 1, message = "O nome do lote é obrigatório."))]
    pub name: String,

    #[validate(range(min = 0, message = "A capacidade não pode ser negativa."))]
    pub total_capacity: i32,
}

#[utoipa::path(
    post,
    path = "/api/inventory/tiers",
    request_body = CreateTierPayload,
    responses(
        (status = 201, description = "Lote criado", body = crate::models::inventory::TicketTier),
        (status = 400, description = "Payload inválido")
    ),
    tag = "inventory"
)]
pub async fn create_tier(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateTierPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let tier = app_state
        .ledger_service
        .create_tier(tenant.0, payload.event_id, &payload.name, payload.total_capacity)
        .await?;

    Ok((StatusCode::CREATED, Json(tier)))
}

// ---
// Payload: CreateSeats (configuração de planta)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeatsPayload {
    pub event_id: Uuid,

    #[validate(length(min = 1, message = "A seção é obrigatória."))]
    pub section_id: String,

    #[validate(length(min = 1, message = "Informe ao menos uma fileira."))]
    pub row_labels: Vec<String>,

    #[validate(range(min = 1, message = "Cada fileira precisa de ao menos um assento."))]
    pub seats_per_row: i32,

    pub price: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeatsResponse {
    pub success: bool,
    pub created_count: i64,
}

#[utoipa::path(
    post,
    path = "/api/inventory/seats",
    request_body = CreateSeatsPayload,
    responses(
        (status = 201, description = "Grade de assentos criada", body = CreateSeatsResponse),
        (status = 400, description = "Payload inválido")
    ),
    tag = "inventory"
)]
pub async fn create_seats(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateSeatsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_seat_grid(payload.row_labels.len(), payload.seats_per_row)
        .map_err(|e| field_validation_error("seatsPerRow", e))?;

    let created_count = app_state
        .ledger_service
        .create_seats(
            tenant.0,
            payload.event_id,
            &payload.section_id,
            &payload.row_labels,
            payload.seats_per_row,
            payload.price,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSeatsResponse {
            success: true,
            created_count,
        }),
    ))
}

// ---
// Payload: CreateBlock (bloqueio administrativo)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlockPayload {
    pub event_id: Uuid,
    pub kind: InventoryKind,
    pub tier_id: Option<Uuid>,
    pub seat_ids: Option<Vec<Uuid>>,
    pub quantity: Option<i32>,

    #[validate(length(min = 1, message = "O motivo é obrigatório."))]
    pub reason: String,

    pub notes: Option<String>,

    #[validate(length(min = 1, message = "O campo 'blockedBy' é obrigatório."))]
    pub blocked_by: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockResponse {
    pub success: bool,
    pub block_id: Uuid,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/inventory/blocks",
    request_body = CreateBlockPayload,
    responses(
        (status = 201, description = "Bloqueio criado", body = BlockResponse),
        (status = 400, description = "Payload inválido"),
        (status = 409, description = "Inventário insuficiente ou assento ocupado")
    ),
    tag = "inventory"
)]
pub async fn create_block(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateBlockPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_target(payload.kind, payload.tier_id, payload.quantity, &payload.seat_ids)
        .map_err(|e| field_validation_error("kind", e))?;

    let block = match payload.kind {
        InventoryKind::Ga => {
            app_state
                .ledger_service
                .block_ga(
                    tenant.0,
                    payload.event_id,
                    payload.tier_id.unwrap(),
                    payload.quantity.unwrap(),
                    &payload.reason,
                    payload.notes.as_deref(),
                    &payload.blocked_by,
                )
                .await?
        }
        InventoryKind::Reserved => {
            app_state
                .ledger_service
                .block_seats(
                    tenant.0,
                    payload.event_id,
                    payload.seat_ids.as_deref().unwrap(),
                    &payload.reason,
                    payload.notes.as_deref(),
                    &payload.blocked_by,
                )
                .await?
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(BlockResponse {
            success: true,
            block_id: block.id,
            message: "Bloqueio criado com sucesso.".to_string(),
        }),
    ))
}

// ---
// Payload: RemoveBlocks (desbloqueio)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBlocksPayload {
    pub event_id: Uuid,

    #[validate(length(min = 1, message = "Informe ao menos um bloqueio."))]
    pub block_ids: Vec<Uuid>,

    #[validate(length(min = 1, message = "O campo 'performedBy' é obrigatório."))]
    pub performed_by: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBlocksResponse {
    pub success: bool,
    pub message: String,
    pub affected_count: i32,
    // Bloqueios já inativos ou inexistentes: pulados, não fatais.
    pub skipped_block_ids: Vec<Uuid>,
}

#[utoipa::path(
    delete,
    path = "/api/inventory/blocks",
    request_body = RemoveBlocksPayload,
    responses(
        (status = 200, description = "Bloqueios desativados", body = RemoveBlocksResponse),
        (status = 400, description = "Payload inválido")
    ),
    tag = "inventory"
)]
pub async fn remove_blocks(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<RemoveBlocksPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = app_state
        .ledger_service
        .unblock_many(tenant.0, &payload.block_ids, &payload.performed_by)
        .await?;

    Ok((
        StatusCode::OK,
        Json(RemoveBlocksResponse {
            success: true,
            message: format!("{} ingresso(s) devolvido(s) à venda.", outcome.affected_count),
            affected_count: outcome.affected_count,
            skipped_block_ids: outcome.skipped_block_ids,
        }),
    ))
}

// ---
// Payload: CreateHold (reserva de checkout)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHoldPayload {
    pub event_id: Uuid,
    pub kind: InventoryKind,
    pub tier_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub seat_ids: Option<Vec<Uuid>>,

    #[validate(length(min = 1, message = "O campo 'sessionId' é obrigatório."))]
    pub session_id: String,

    // Se ausente, vale o TTL padrão do sistema (5 minutos).
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HoldResponse {
    pub success: bool,
    pub hold_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/inventory/holds",
    request_body = CreateHoldPayload,
    responses(
        (status = 201, description = "Reserva criada", body = HoldResponse),
        (status = 400, description = "Payload inválido"),
        (status = 409, description = "Inventário insuficiente ou assento ocupado")
    ),
    tag = "inventory"
)]
pub async fn create_hold(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateHoldPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_target(payload.kind, payload.tier_id, payload.quantity, &payload.seat_ids)
        .map_err(|e| field_validation_error("kind", e))?;

    let target = match payload.kind {
        InventoryKind::Ga => HoldTarget::Ga {
            tier_id: payload.tier_id.unwrap(),
            quantity: payload.quantity.unwrap(),
        },
        InventoryKind::Reserved => HoldTarget::Reserved {
            seat_ids: payload.seat_ids.unwrap(),
        },
    };

    let hold = app_state
        .hold_service
        .create_hold(
            tenant.0,
            payload.event_id,
            target,
            &payload.session_id,
            payload.ttl_seconds,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(HoldResponse {
            success: true,
            hold_id: hold.id,
            expires_at: hold.expires_at,
        }),
    ))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseHoldResponse {
    pub success: bool,
    // false = a reserva já não existia (liberada, convertida ou varrida).
    pub released: bool,
}

#[utoipa::path(
    delete,
    path = "/api/inventory/holds/{hold_id}",
    params(("hold_id" = Uuid, Path, description = "Id da reserva")),
    responses(
        (status = 200, description = "Liberação idempotente", body = ReleaseHoldResponse)
    ),
    tag = "inventory"
)]
pub async fn release_hold(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(hold_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let released = app_state
        .hold_service
        .release_hold(tenant.0, hold_id, "checkout")
        .await?;

    Ok((StatusCode::OK, Json(ReleaseHoldResponse { success: true, released })))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertHoldPayload {
    #[validate(length(min = 1, message = "O campo 'orderRef' é obrigatório."))]
    pub order_ref: String,

    #[validate(length(min = 1, message = "O campo 'performedBy' é obrigatório."))]
    pub performed_by: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertHoldResponse {
    pub success: bool,
    // false = a reserva expirou ou foi liberada antes da confirmação.
    pub converted: bool,
}

#[utoipa::path(
    post,
    path = "/api/inventory/holds/{hold_id}/convert",
    params(("hold_id" = Uuid, Path, description = "Id da reserva")),
    request_body = ConvertHoldPayload,
    responses(
        (status = 200, description = "Conversão da reserva em venda", body = ConvertHoldResponse)
    ),
    tag = "inventory"
)]
pub async fn convert_hold(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(hold_id): Path<Uuid>,
    Json(payload): Json<ConvertHoldPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let converted = app_state
        .hold_service
        .convert_hold_to_sale(tenant.0, hold_id, &payload.order_ref, &payload.performed_by)
        .await?;

    Ok((StatusCode::OK, Json(ConvertHoldResponse { success: true, converted })))
}

// ---
// Payload: venda direta e estorno (colaborador de pedidos/pagamentos)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalePayload {
    pub kind: InventoryKind,
    pub tier_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub seat_ids: Option<Vec<Uuid>>,

    #[validate(length(min = 1, message = "O campo 'orderRef' é obrigatório."))]
    pub order_ref: String,

    #[validate(length(min = 1, message = "O campo 'performedBy' é obrigatório."))]
    pub performed_by: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub success: bool,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/inventory/sales",
    request_body = SalePayload,
    responses(
        (status = 200, description = "Venda registrada", body = SaleResponse),
        (status = 409, description = "Inventário insuficiente ou assento ocupado")
    ),
    tag = "inventory"
)]
pub async fn register_sale(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<SalePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_target(payload.kind, payload.tier_id, payload.quantity, &payload.seat_ids)
        .map_err(|e| field_validation_error("kind", e))?;

    match payload.kind {
        InventoryKind::Ga => {
            app_state
                .ledger_service
                .sale_ga(
                    tenant.0,
                    payload.tier_id.unwrap(),
                    payload.quantity.unwrap(),
                    &payload.order_ref,
                    &payload.performed_by,
                )
                .await?;
        }
        InventoryKind::Reserved => {
            app_state
                .ledger_service
                .sale_seats(
                    tenant.0,
                    payload.seat_ids.as_deref().unwrap(),
                    &payload.order_ref,
                    &payload.performed_by,
                )
                .await?;
        }
    }

    Ok((
        StatusCode::OK,
        Json(SaleResponse {
            success: true,
            message: "Venda registrada.".to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/inventory/refunds",
    request_body = SalePayload,
    responses(
        (status = 200, description = "Estorno registrado", body = SaleResponse),
        (status = 400, description = "Estorno excede o vendido")
    ),
    tag = "inventory"
)]
pub async fn register_refund(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<SalePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_target(payload.kind, payload.tier_id, payload.quantity, &payload.seat_ids)
        .map_err(|e| field_validation_error("kind", e))?;

    match payload.kind {
        InventoryKind::Ga => {
            app_state
                .ledger_service
                .refund_ga(
                    tenant.0,
                    payload.tier_id.unwrap(),
                    payload.quantity.unwrap(),
                    &payload.order_ref,
                    &payload.performed_by,
                )
                .await?;
        }
        InventoryKind::Reserved => {
            app_state
                .ledger_service
                .refund_seats(
                    tenant.0,
                    payload.seat_ids.as_deref().unwrap(),
                    &payload.order_ref,
                    &payload.performed_by,
                )
                .await?;
        }
    }

    Ok((
        StatusCode::OK,
        Json(SaleResponse {
            success: true,
            message: "Estorno registrado.".to_string(),
        }),
    ))
}

// ---
// Consultas: resumo e atividade
// ---
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub event_id: Uuid,
}

#[utoipa::path(
    get,
    path = "/api/inventory/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Resumo de disponibilidade", body = crate::models::inventory::EventInventorySummary)
    ),
    tag = "inventory"
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state
        .availability_service
        .event_summary(tenant.0, query.event_id)
        .await?;

    Ok((StatusCode::OK, Json(summary)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub event_id: Uuid,
    // Máximo de 100 entradas por página.
    pub limit: Option<i64>,
    pub cursor: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub entries: Vec<AuditLogEntry>,
    pub next_cursor: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/inventory/activity",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Trilha de auditoria paginada", body = ActivityResponse)
    ),
    tag = "inventory"
)]
pub async fn get_activity(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ActivityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 100);

    let entries = app_state
        .audit_repo
        .list_for_event(
            app_state.audit_repo.pool(),
            tenant.0,
            query.event_id,
            limit,
            query.cursor,
        )
        .await?;

    // Só oferece próxima página quando esta veio cheia.
    let next_cursor = if entries.len() as i64 == limit {
        entries.last().map(|e| e.seq)
    } else {
        None
    };

    Ok((StatusCode::OK, Json(ActivityResponse { entries, next_cursor })))
}

// ---
// Reconciliação (administrativo)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePayload {
    pub tier_id: Uuid,
}

#[utoipa::path(
    post,
    path = "/api/inventory/reconcile",
    request_body = ReconcilePayload,
    responses(
        (status = 200, description = "Relatório de reconciliação", body = ReconciliationReport)
    ),
    tag = "inventory"
)]
pub async fn reconcile_tier(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<ReconcilePayload>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state
        .ledger_service
        .reconcile_tier(tenant.0, payload.tier_id)
        .await?;

    Ok((StatusCode::OK, Json(report)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alvo_ga_exige_lote_e_quantidade_positiva() {
        let tier = Some(Uuid::new_v4());

        assert!(validate_target(InventoryKind::Ga, tier, Some(10), &None).is_ok());
        assert!(validate_target(InventoryKind::Ga, None, Some(10), &None).is_err());
        assert!(validate_target(InventoryKind::Ga, tier, Some(0), &None).is_err());
        assert!(validate_target(InventoryKind::Ga, tier, None, &None).is_err());
        assert!(
            validate_target(InventoryKind::Ga, tier, Some(1), &Some(vec![Uuid::new_v4()]))
                .is_err()
        );
    }

    #[test]
    fn alvo_reserved_exige_assentos_e_rejeita_campos_de_ga() {
        let seats = Some(vec![Uuid::new_v4(), Uuid::new_v4()]);

        assert!(validate_target(InventoryKind::Reserved, None, None, &seats).is_ok());
        assert!(validate_target(InventoryKind::Reserved, None, None, &None).is_err());
        assert!(validate_target(InventoryKind::Reserved, None, None, &Some(vec![])).is_err());
        assert!(
            validate_target(InventoryKind::Reserved, Some(Uuid::new_v4()), None, &seats).is_err()
        );
        assert!(validate_target(InventoryKind::Reserved, None, Some(2), &seats).is_err());
    }

    #[test]
    fn quantidade_positiva() {
        assert!(validate_positive(1).is_ok());
        assert!(validate_positive(0).is_err());
        assert!(validate_positive(-3).is_err());
    }

    #[test]
    fn grade_de_assentos_respeita_o_teto_por_chamada() {
        assert!(validate_seat_grid(10, 50).is_ok());
        assert!(validate_seat_grid(100, 50).is_ok()); // exatamente no teto
        assert!(validate_seat_grid(100, 51).is_err());
        assert!(validate_seat_grid(1, i32::MAX).is_err());
        // O produto é calculado em i64: fileiras demais não dão overflow.
        assert!(validate_seat_grid(usize::try_from(u32::MAX).unwrap(), 2).is_err());
    }
}
