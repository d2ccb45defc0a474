// src/services/inventory_service.rs

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rand::Rng;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::InventoryStore,
    models::{
        dashboard::{BatchView, ItemDetail, ItemStockView},
        inventory::{
            Batch, BatchQuery, BatchStatus, Item, LedgerPosting, MovementEntry, MovementFilter,
            MovementType, NewBatch, NewMovement, Page, ReconciliationReport,
        },
        requests::{
            non_blank, AddBatchRequest, ClearMovementsRequest, ConsumeRequest, CreateItemRequest,
            MovementListQuery, QuarantineRequest, RecordMovementRequest, UpdateItemRequest,
        },
    },
    services::{
        consumption::ConsumptionIntent,
        dashboard_service::{batch_views, item_stock_view},
    },
};

pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const MAX_PAGE_SIZE: u32 = 500;

/// `LOTE-yyyymmdd-nnn`, com sufixo aleatório de 000 a 999.
pub fn generate_batch_number(today: NaiveDate) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("LOTE-{}-{:03}", today.format("%Y%m%d"), suffix)
}

fn require_confirmation(confirm: bool, what: &str) -> Result<(), AppError> {
    if confirm {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Debe confirmar la eliminación de {what} (confirm=true)."
        )))
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Converte a query do kardex em filtro do store. Datas são inclusivas:
/// `endDate` vira o início do dia seguinte, exclusivo.
pub fn movement_filter(query: MovementListQuery) -> Result<(MovementFilter, u32, u32), AppError> {
    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        if start > end {
            return Err(AppError::InvalidInput(
                "La fecha inicial no puede ser posterior a la final.".into(),
            ));
        }
    }

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let filter = MovementFilter {
        direction: query.direction,
        from: query.start_date.map(start_of_day),
        until: query.end_date.map(|d| start_of_day(d + Duration::days(1))),
        search: non_blank(query.search),
        limit: i64::from(per_page),
        offset: i64::from(page - 1) * i64::from(per_page),
    };
    Ok((filter, page, per_page))
}

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    async fn require_item(&self, id: Uuid) -> Result<Item, AppError> {
        self.store
            .find_item(id)
            .await?
            .ok_or_else(|| AppError::not_found("Producto", id))
    }

    async fn require_batch(&self, id: Uuid) -> Result<Batch, AppError> {
        self.store
            .find_batch(id)
            .await?
            .ok_or_else(|| AppError::not_found("Lote", id))
    }

    // --- CATÁLOGO ---

    pub async fn create_item(&self, payload: CreateItemRequest) -> Result<Item, AppError> {
        let payload = payload.normalized();
        payload.validate()?;

        let item = self.store.insert_item(payload).await?;
        tracing::info!(item_id = %item.id, sku = ?item.sku, "Producto creado");
        Ok(item)
    }

    pub async fn update_item(&self, payload: UpdateItemRequest) -> Result<Item, AppError> {
        let id = payload.id;
        let current = self.require_item(id).await?;

        let merged = payload.apply_to(CreateItemRequest::from(&current)).normalized();
        merged.validate()?;

        let item = self.store.update_item(id, merged).await?;
        tracing::info!(item_id = %item.id, "Producto actualizado");
        Ok(item)
    }

    pub async fn delete_item(&self, id: Uuid, confirm: bool) -> Result<(), AppError> {
        require_confirmation(confirm, "el producto")?;
        self.store.delete_item(id).await?;
        tracing::warn!(item_id = %id, "Producto eliminado");
        Ok(())
    }

    pub async fn get_item(&self, id: Uuid, today: NaiveDate) -> Result<ItemDetail, AppError> {
        let item = self.require_item(id).await?;
        let rows = self
            .store
            .list_batches(BatchQuery {
                item_id: Some(id),
                include_inactive: true,
            })
            .await?;

        let batches: Vec<Batch> = rows.iter().map(|r| r.batch.clone()).collect();
        let stock = item_stock_view(item, &batches);
        let with_stock = rows.into_iter().filter(|r| r.batch.has_stock()).collect();

        Ok(ItemDetail {
            stock,
            batches: batch_views(with_stock, today),
        })
    }

    pub async fn list_items(&self) -> Result<Vec<ItemStockView>, AppError> {
        let items = self.store.list_items().await?;
        let batches: Vec<Batch> = self
            .store
            .list_batches(BatchQuery {
                item_id: None,
                include_inactive: true,
            })
            .await?
            .into_iter()
            .map(|row| row.batch)
            .collect();

        Ok(items
            .into_iter()
            .map(|item| {
                let id = item.id;
                item_stock_view(item, batches.iter().filter(move |b| b.item_id == id))
            })
            .collect())
    }

    // --- LOTES ---

    pub async fn add_batch(
        &self,
        payload: AddBatchRequest,
        today: NaiveDate,
    ) -> Result<LedgerPosting, AppError> {
        // Arredonda antes de validar
        let payload = AddBatchRequest {
            quantity: payload.quantity.round_dp(2),
            cost_per_unit: payload.cost_per_unit.round_dp(2),
            ..payload
        };
        payload.validate()?;
        // Falha cedo com 404 antes de abrir a transação
        self.require_item(payload.item_id).await?;

        let batch_number =
            non_blank(payload.batch_number).unwrap_or_else(|| generate_batch_number(today));

        let (batch, movement) = self
            .store
            .insert_batch(NewBatch {
                item_id: payload.item_id,
                batch_number,
                expiration_date: payload.expiration_date,
                quantity: payload.quantity,
                cost_per_unit: payload.cost_per_unit,
                user_id: non_blank(payload.user_id),
            })
            .await?;

        tracing::info!(
            batch_id = %batch.id,
            item_id = %batch.item_id,
            batch_number = %batch.batch_number,
            quantity = %batch.quantity_initial,
            "Lote ingresado"
        );
        Ok(LedgerPosting { movement, batch })
    }

    /// Lotes disponíveis (com saldo, fora de quarentena), em ordem FEFO.
    pub async fn list_batches(&self, today: NaiveDate) -> Result<Vec<BatchView>, AppError> {
        let rows = self.store.list_batches(BatchQuery::default()).await?;
        Ok(batch_views(rows, today))
    }

    pub async fn delete_batch(&self, id: Uuid, confirm: bool) -> Result<u64, AppError> {
        require_confirmation(confirm, "el lote")?;
        let removed = self.store.delete_batch(id).await?;
        tracing::warn!(batch_id = %id, movements = removed, "Lote eliminado con su historial");
        Ok(removed)
    }

    pub async fn set_batch_quarantine(&self, payload: QuarantineRequest) -> Result<Batch, AppError> {
        let status = if payload.quarantined {
            BatchStatus::Quarantine
        } else {
            BatchStatus::Active
        };
        let batch = self.store.set_batch_status(payload.batch_id, status).await?;
        tracing::warn!(batch_id = %batch.id, status = ?batch.status, "Estado del lote cambiado");
        Ok(batch)
    }

    // --- MOVIMENTOS ---

    pub async fn record_movement(
        &self,
        payload: RecordMovementRequest,
    ) -> Result<LedgerPosting, AppError> {
        payload.validate()?;
        let quantity_change = payload.quantity_change.round_dp(2);
        payload.movement_type.check_change(quantity_change)?;

        self.post(NewMovement {
            batch_id: payload.batch_id,
            movement_type: payload.movement_type,
            quantity_change,
            reason: non_blank(payload.reason),
            reference_id: non_blank(payload.reference_id),
            user_id: non_blank(payload.user_id),
        })
        .await
    }

    pub async fn consume(&self, payload: ConsumeRequest) -> Result<LedgerPosting, AppError> {
        let intent = ConsumptionIntent::from_request(&payload)?;
        let batch = self.require_batch(payload.batch_id).await?;
        let consumed = intent.resolve(&batch)?;

        let default_reason = match intent {
            ConsumptionIntent::Manual(_) => "Consumo".to_string(),
            ConsumptionIntent::Visual { target_level } => {
                format!("Consumo visual (nivel restante {target_level})")
            }
        };

        self.post(NewMovement {
            batch_id: batch.id,
            movement_type: MovementType::Consumption,
            quantity_change: -consumed,
            reason: Some(non_blank(payload.reason).unwrap_or(default_reason)),
            reference_id: non_blank(payload.reference_id),
            user_id: non_blank(payload.user_id),
        })
        .await
    }

    async fn post(&self, movement: NewMovement) -> Result<LedgerPosting, AppError> {
        let batch_id = movement.batch_id;
        match self.store.apply_movement(movement).await {
            Ok((movement, batch)) => {
                tracing::info!(
                    batch_id = %batch.id,
                    movement_type = ?movement.movement_type,
                    change = %movement.quantity_change,
                    balance = %batch.quantity_current,
                    "Movimiento registrado"
                );
                Ok(LedgerPosting { movement, batch })
            }
            Err(e) => {
                tracing::warn!(batch_id = %batch_id, error = %e, "Movimiento rechazado");
                Err(e)
            }
        }
    }

    pub async fn list_movements(
        &self,
        query: MovementListQuery,
    ) -> Result<Page<MovementEntry>, AppError> {
        let (filter, page, per_page) = movement_filter(query)?;
        let (items, total) = self.store.list_movements(filter).await?;
        Ok(Page {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn delete_movement(&self, id: Uuid) -> Result<(), AppError> {
        self.store.archive_movement(id, Utc::now()).await?;
        tracing::warn!(movement_id = %id, "Movimiento archivado");
        Ok(())
    }

    pub async fn clear_movements(&self, payload: ClearMovementsRequest) -> Result<u64, AppError> {
        payload.validate()?;
        require_confirmation(payload.confirm, "el historial")?;

        let now = Utc::now();
        let cutoff = Duration::try_days(payload.older_than_days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Ventana de días fuera de rango: {}.",
                    payload.older_than_days
                ))
            })?;
        let archived = self.store.archive_movements_before(cutoff, now).await?;

        tracing::warn!(
            older_than_days = payload.older_than_days,
            archived,
            "Historial de movimientos depurado"
        );
        Ok(archived)
    }

    pub async fn reconcile_batch(&self, id: Uuid) -> Result<ReconciliationReport, AppError> {
        let batch = self.require_batch(id).await?;
        let movement_total = self.store.movement_total(id).await?;
        let balanced = movement_total == batch.quantity_current;

        if !balanced {
            tracing::error!(
                batch_id = %id,
                current = %batch.quantity_current,
                movement_total = %movement_total,
                "Lote descuadrado"
            );
        }

        Ok(ReconciliationReport {
            batch_id: id,
            quantity_initial: batch.quantity_initial,
            quantity_current: batch.quantity_current,
            movement_total,
            balanced,
        })
    }
}
