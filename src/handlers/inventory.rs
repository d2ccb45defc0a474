// src/handlers/inventory.rs

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::requests::MovementListQuery,
};

// ---
// Query: ?action=...&id=...&confirm=...
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum InventoryAction {
    InventoryListItems,
    InventoryGetItem,
    InventoryCreateItem,
    InventoryUpdateItem,
    InventoryDeleteItem,
    InventoryAddBatch,
    InventoryListBatches,
    InventoryDeleteBatch,
    InventoryQuarantineBatch,
    InventoryConsume,
    InventoryRecordMovement,
    InventoryListMovements,
    InventoryDeleteMovement,
    InventoryClearMovements,
    InventoryReconcileBatch,
    InventoryDashboard,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActionQuery {
    #[param(value_type = String, example = "inventoryListBatches")]
    pub action: InventoryAction,
    pub id: Option<Uuid>,
    #[serde(default)]
    pub confirm: bool,
}

impl ActionQuery {
    fn require_id(&self) -> Result<Uuid, AppError> {
        self.id
            .ok_or_else(|| AppError::InvalidInput("El parámetro 'id' es obligatorio.".into()))
    }
}

fn query_error(e: QueryRejection) -> AppError {
    AppError::InvalidInput(format!("Parámetros inválidos: {}", e.body_text()))
}

fn parse_body<T: DeserializeOwned>(body: Result<Json<Value>, JsonRejection>) -> Result<T, AppError> {
    let Json(value) =
        body.map_err(|e| AppError::InvalidInput(format!("JSON inválido: {}", e.body_text())))?;
    serde_json::from_value(value)
        .map_err(|e| AppError::InvalidInput(format!("Datos inválidos: {e}")))
}

fn unsupported(action: InventoryAction, method: &str) -> AppError {
    AppError::InvalidInput(format!("La acción {action:?} no admite {method}."))
}

// A data "de hoje" da clínica, para validade e alertas
fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ---
// GET /api/records
// ---
#[utoipa::path(
    get,
    path = "/api/records",
    tag = "Inventario",
    params(ActionQuery, MovementListQuery),
    responses(
        (status = 200, description = "Listados, detalle, kardex, conciliación o panel según la acción"),
        (status = 400, description = "Acción o parámetros inválidos"),
        (status = 404, description = "Registro no encontrado")
    )
)]
pub async fn records_get(
    State(app_state): State<AppState>,
    query: Result<Query<ActionQuery>, QueryRejection>,
    list_query: Result<Query<MovementListQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(query_error)?;
    let inventory = &app_state.inventory_service;

    let response = match query.action {
        InventoryAction::InventoryListItems => Json(inventory.list_items().await?).into_response(),

        InventoryAction::InventoryGetItem => {
            Json(inventory.get_item(query.require_id()?, today()).await?).into_response()
        }

        InventoryAction::InventoryListBatches => {
            Json(inventory.list_batches(today()).await?).into_response()
        }

        InventoryAction::InventoryListMovements => {
            let Query(filters) = list_query.map_err(query_error)?;
            Json(inventory.list_movements(filters).await?).into_response()
        }

        InventoryAction::InventoryReconcileBatch => {
            Json(inventory.reconcile_batch(query.require_id()?).await?).into_response()
        }

        InventoryAction::InventoryDashboard => {
            Json(app_state.dashboard_service.get_summary(today()).await?).into_response()
        }

        other => return Err(unsupported(other, "GET")),
    };

    Ok(response)
}

// ---
// POST /api/records
// ---
#[utoipa::path(
    post,
    path = "/api/records",
    tag = "Inventario",
    params(ActionQuery),
    request_body(
        content = Object,
        content_type = "application/json",
        description = "Según la acción: CreateItemRequest, UpdateItemRequest, AddBatchRequest, QuarantineRequest, ConsumeRequest, RecordMovementRequest o ClearMovementsRequest"
    ),
    responses(
        (status = 200, description = "Registro actualizado"),
        (status = 201, description = "Registro creado"),
        (status = 400, description = "Datos inválidos"),
        (status = 404, description = "Producto o lote no encontrado"),
        (status = 409, description = "Conflicto (SKU duplicado, cuarentena, cantidad inicial superada)"),
        (status = 422, description = "Stock insuficiente")
    )
)]
pub async fn records_post(
    State(app_state): State<AppState>,
    query: Result<Query<ActionQuery>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(query_error)?;
    let inventory = &app_state.inventory_service;

    let response = match query.action {
        InventoryAction::InventoryCreateItem => {
            let item = inventory.create_item(parse_body(body)?).await?;
            (StatusCode::CREATED, Json(item)).into_response()
        }

        InventoryAction::InventoryUpdateItem => {
            Json(inventory.update_item(parse_body(body)?).await?).into_response()
        }

        InventoryAction::InventoryAddBatch => {
            let posting = inventory.add_batch(parse_body(body)?, today()).await?;
            (StatusCode::CREATED, Json(posting)).into_response()
        }

        InventoryAction::InventoryQuarantineBatch => {
            Json(inventory.set_batch_quarantine(parse_body(body)?).await?).into_response()
        }

        InventoryAction::InventoryConsume => {
            let posting = inventory.consume(parse_body(body)?).await?;
            (StatusCode::CREATED, Json(posting)).into_response()
        }

        InventoryAction::InventoryRecordMovement => {
            let posting = inventory.record_movement(parse_body(body)?).await?;
            (StatusCode::CREATED, Json(posting)).into_response()
        }

        InventoryAction::InventoryClearMovements => {
            let archived = inventory.clear_movements(parse_body(body)?).await?;
            Json(json!({ "archived": archived })).into_response()
        }

        other => return Err(unsupported(other, "POST")),
    };

    Ok(response)
}

// ---
// DELETE /api/records
// ---
#[utoipa::path(
    delete,
    path = "/api/records",
    tag = "Inventario",
    params(ActionQuery),
    responses(
        (status = 200, description = "Registro eliminado o archivado"),
        (status = 400, description = "Falta la confirmación"),
        (status = 404, description = "Registro no encontrado"),
        (status = 409, description = "El producto aún tiene lotes")
    )
)]
pub async fn records_delete(
    State(app_state): State<AppState>,
    query: Result<Query<ActionQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(query_error)?;
    let inventory = &app_state.inventory_service;
    let id = match query.action {
        InventoryAction::InventoryDeleteItem
        | InventoryAction::InventoryDeleteBatch
        | InventoryAction::InventoryDeleteMovement => query.require_id()?,
        other => return Err(unsupported(other, "DELETE")),
    };

    let body = match query.action {
        InventoryAction::InventoryDeleteItem => {
            inventory.delete_item(id, query.confirm).await?;
            json!({ "deleted": id })
        }
        InventoryAction::InventoryDeleteBatch => {
            let removed = inventory.delete_batch(id, query.confirm).await?;
            json!({ "deleted": id, "movements_deleted": removed })
        }
        _ => {
            inventory.delete_movement(id).await?;
            json!({ "archived": id })
        }
    };

    Ok(Json(body).into_response())
}
