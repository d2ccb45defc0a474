// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::inventory::records_get,
        handlers::inventory::records_post,
        handlers::inventory::records_delete,
    ),
    components(
        schemas(
            // --- Inventario ---
            models::inventory::MovementType,
            models::inventory::BatchStatus,
            models::inventory::BatchDisplayStatus,
            models::inventory::DisplayUnit,
            models::inventory::Item,
            models::inventory::Batch,
            models::inventory::Movement,
            models::inventory::BatchWithItem,
            models::inventory::MovementEntry,
            models::inventory::MovementDirection,
            models::inventory::LedgerPosting,
            models::inventory::ReconciliationReport,
            models::inventory::Page<models::inventory::MovementEntry>,

            // --- Panel ---
            models::dashboard::StockStatus,
            models::dashboard::ItemStockView,
            models::dashboard::BatchView,
            models::dashboard::ItemDetail,
            models::dashboard::DashboardSummary,
            services::expiry::ExpiryStatus,

            // --- Payloads ---
            models::requests::CreateItemRequest,
            models::requests::UpdateItemRequest,
            models::requests::AddBatchRequest,
            models::requests::ConsumptionMode,
            models::requests::ConsumeRequest,
            models::requests::RecordMovementRequest,
            models::requests::QuarantineRequest,
            models::requests::ClearMovementsRequest,
            handlers::inventory::InventoryAction,
        )
    ),
    tags(
        (name = "Inventario", description = "Catálogo, lotes, kardex y alertas de la clínica")
    )
)]
pub struct ApiDoc;
