// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Configuração ---
        handlers::inventory::create_tier,
        handlers::inventory::create_seats,

        // --- Bloqueios administrativos ---
        handlers::inventory::create_block,
        handlers::inventory::remove_blocks,

        // --- Reservas de checkout ---
        handlers::inventory::create_hold,
        handlers::inventory::release_hold,
        handlers::inventory::convert_hold,

        // --- Vendas e estornos ---
        handlers::inventory::register_sale,
        handlers::inventory::register_refund,

        // --- Consultas ---
        handlers::inventory::get_summary,
        handlers::inventory::get_activity,

        // --- Reconciliação ---
        handlers::inventory::reconcile_tier,
    ),
    components(schemas(
        models::inventory::TicketTier,
        models::inventory::Seat,
        models::inventory::SeatStatus,
        models::inventory::InventoryBlock,
        models::inventory::InventoryKind,
        models::inventory::Hold,
        models::inventory::AuditLogEntry,
        models::inventory::AuditAction,
        models::inventory::AvailabilitySummary,
        models::inventory::TierSummary,
        models::inventory::SectionSummary,
        models::inventory::EventInventorySummary,
        models::inventory::ReconciliationReport,
    )),
    tags(
        (name = "inventory", description = "Núcleo de inventário de ingressos e assentos")
    )
)]
pub struct ApiDoc;
