// src/db/memory_store.rs

//! Store em memória. Um único mutex protege itens, lotes e movimentos,
//! então cada operação de escrita é serializada e atômica.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::InventoryStore,
    models::{
        inventory::{
            Batch, BatchQuery, BatchStatus, BatchWithItem, Item, Movement, MovementEntry,
            MovementFilter, MovementType, NewBatch, NewMovement,
        },
        requests::CreateItemRequest,
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    items: HashMap<Uuid, Item>,
    batches: HashMap<Uuid, Batch>,
    // Ordem de inserção
    movements: Vec<Movement>,
}

impl MemoryState {
    fn check_sku(&self, sku: Option<&str>, except: Option<Uuid>) -> Result<(), AppError> {
        let Some(sku) = sku else { return Ok(()) };
        let taken = self
            .items
            .values()
            .any(|i| i.sku.as_deref() == Some(sku) && Some(i.id) != except);
        if taken {
            return Err(AppError::Conflict(format!("El SKU '{sku}' ya existe.")));
        }
        Ok(())
    }

    fn batch_mut(&mut self, id: Uuid) -> Result<&mut Batch, AppError> {
        self.batches
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Lote", id))
    }

    fn entry_for(&self, movement: &Movement) -> Option<MovementEntry> {
        let batch = self.batches.get(&movement.batch_id)?;
        let item = self.items.get(&batch.item_id)?;
        Some(MovementEntry {
            movement: movement.clone(),
            batch_number: batch.batch_number.clone(),
            item_name: item.name.clone(),
            sku: item.sku.clone(),
        })
    }
}

fn matches_search(entry: &MovementEntry, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);
    hit(&entry.item_name)
        || hit(&entry.batch_number)
        || entry.sku.as_deref().is_some_and(hit)
        || entry.movement.reason.as_deref().is_some_and(hit)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn insert_item(&self, item: CreateItemRequest) -> Result<Item, AppError> {
        let mut state = self.state.lock().await;
        state.check_sku(item.sku.as_deref(), None)?;

        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            sku: item.sku,
            name: item.name,
            description: item.description,
            category: item.category,
            group_name: item.group_name,
            unit_of_measure: item.unit_of_measure,
            min_stock_level: item.min_stock_level,
            requires_cold_chain: item.requires_cold_chain,
            sanitary_registration: item.sanitary_registration,
            preferred_display_unit: item.preferred_display_unit,
            created_at: now,
            updated_at: now,
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_item(&self, id: Uuid, data: CreateItemRequest) -> Result<Item, AppError> {
        let mut state = self.state.lock().await;
        state.check_sku(data.sku.as_deref(), Some(id))?;

        let item = state
            .items
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Producto", id))?;
        item.sku = data.sku;
        item.name = data.name;
        item.description = data.description;
        item.category = data.category;
        item.group_name = data.group_name;
        item.unit_of_measure = data.unit_of_measure;
        item.min_stock_level = data.min_stock_level;
        item.requires_cold_chain = data.requires_cold_chain;
        item.sanitary_registration = data.sanitary_registration;
        item.preferred_display_unit = data.preferred_display_unit;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, AppError> {
        Ok(self.state.lock().await.items.get(&id).cloned())
    }

    async fn list_items(&self) -> Result<Vec<Item>, AppError> {
        let state = self.state.lock().await;
        let mut items: Vec<Item> = state.items.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(items)
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if !state.items.contains_key(&id) {
            return Err(AppError::not_found("Producto", id));
        }
        let batches = state.batches.values().filter(|b| b.item_id == id).count();
        if batches > 0 {
            return Err(AppError::Conflict(format!(
                "El producto tiene {batches} lote(s) registrados; elimínelos primero."
            )));
        }
        state.items.remove(&id);
        Ok(())
    }

    async fn insert_batch(&self, new: NewBatch) -> Result<(Batch, Movement), AppError> {
        let mut state = self.state.lock().await;
        if !state.items.contains_key(&new.item_id) {
            return Err(AppError::not_found("Producto", new.item_id));
        }

        let now = Utc::now();
        let batch = Batch {
            id: Uuid::new_v4(),
            item_id: new.item_id,
            batch_number: new.batch_number,
            expiration_date: new.expiration_date,
            quantity_initial: new.quantity,
            quantity_current: new.quantity,
            cost_per_unit: new.cost_per_unit,
            status: BatchStatus::Active,
            created_at: now,
        };
        let movement = Movement {
            id: Uuid::new_v4(),
            batch_id: batch.id,
            movement_type: MovementType::Purchase,
            quantity_change: new.quantity,
            reason: Some("Ingreso de lote".into()),
            reference_id: None,
            user_id: new.user_id,
            created_at: now,
            archived_at: None,
        };

        state.batches.insert(batch.id, batch.clone());
        state.movements.push(movement.clone());
        Ok((batch, movement))
    }

    async fn find_batch(&self, id: Uuid) -> Result<Option<Batch>, AppError> {
        Ok(self.state.lock().await.batches.get(&id).cloned())
    }

    async fn list_batches(&self, query: BatchQuery) -> Result<Vec<BatchWithItem>, AppError> {
        let state = self.state.lock().await;
        let mut batches: Vec<&Batch> = state
            .batches
            .values()
            .filter(|b| query.item_id.is_none_or(|id| b.item_id == id))
            .filter(|b| query.include_inactive || (b.has_stock() && !b.is_quarantined()))
            .collect();
        batches.sort_by(|a, b| a.fefo_cmp(b));

        Ok(batches
            .into_iter()
            .filter_map(|b| {
                let item = state.items.get(&b.item_id)?;
                Some(BatchWithItem {
                    batch: b.clone(),
                    item_name: item.name.clone(),
                    sku: item.sku.clone(),
                    unit_of_measure: item.unit_of_measure.clone(),
                })
            })
            .collect())
    }

    async fn set_batch_status(&self, id: Uuid, status: BatchStatus) -> Result<Batch, AppError> {
        let mut state = self.state.lock().await;
        let batch = state.batch_mut(id)?;
        batch.status = status;
        Ok(batch.clone())
    }

    async fn delete_batch(&self, id: Uuid) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        if state.batches.remove(&id).is_none() {
            return Err(AppError::not_found("Lote", id));
        }
        let before = state.movements.len();
        state.movements.retain(|m| m.batch_id != id);
        Ok((before - state.movements.len()) as u64)
    }

    async fn apply_movement(&self, new: NewMovement) -> Result<(Movement, Batch), AppError> {
        let mut state = self.state.lock().await;
        let batch = state.batch_mut(new.batch_id)?;
        let next = batch.next_quantity(new.quantity_change)?;
        batch.quantity_current = next;
        let batch = batch.clone();

        let movement = Movement {
            id: Uuid::new_v4(),
            batch_id: new.batch_id,
            movement_type: new.movement_type,
            quantity_change: new.quantity_change,
            reason: new.reason,
            reference_id: new.reference_id,
            user_id: new.user_id,
            created_at: Utc::now(),
            archived_at: None,
        };
        state.movements.push(movement.clone());
        Ok((movement, batch))
    }

    async fn list_movements(
        &self,
        filter: MovementFilter,
    ) -> Result<(Vec<MovementEntry>, i64), AppError> {
        let state = self.state.lock().await;
        let needle = filter.search.as_deref().map(str::to_lowercase);

        // Mais recentes primeiro; o vetor está em ordem de inserção
        let matching: Vec<MovementEntry> = state
            .movements
            .iter()
            .rev()
            .filter(|m| m.archived_at.is_none())
            .filter(|m| filter.direction.matches(m.quantity_change))
            .filter(|m| filter.from.is_none_or(|from| m.created_at >= from))
            .filter(|m| filter.until.is_none_or(|until| m.created_at < until))
            .filter_map(|m| state.entry_for(m))
            .filter(|e| needle.as_deref().is_none_or(|n| matches_search(e, n)))
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn archive_movement(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let movement = state
            .movements
            .iter_mut()
            .find(|m| m.id == id && m.archived_at.is_none())
            .ok_or_else(|| AppError::not_found("Movimiento", id))?;
        movement.archived_at = Some(at);
        Ok(())
    }

    async fn archive_movements_before(
        &self,
        cutoff: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        let mut archived = 0;
        for m in state
            .movements
            .iter_mut()
            .filter(|m| m.archived_at.is_none() && m.created_at < cutoff)
        {
            m.archived_at = Some(at);
            archived += 1;
        }
        Ok(archived)
    }

    async fn movement_total(&self, batch_id: Uuid) -> Result<Decimal, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .movements
            .iter()
            .filter(|m| m.batch_id == batch_id)
            .map(|m| m.quantity_change)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, sku: Option<&str>) -> CreateItemRequest {
        CreateItemRequest {
            sku: sku.map(String::from),
            name: name.into(),
            description: None,
            category: None,
            group_name: None,
            unit_of_measure: "Unidad".into(),
            min_stock_level: Decimal::new(5, 0),
            requires_cold_chain: false,
            sanitary_registration: None,
            preferred_display_unit: Default::default(),
        }
    }

    #[tokio::test]
    async fn duplicate_sku_is_a_conflict() {
        let store = MemoryStore::new();
        store.insert_item(item("A", Some("X-1"))).await.unwrap();
        let err = store.insert_item(item("B", Some("X-1"))).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // Sem SKU não colide
        store.insert_item(item("C", None)).await.unwrap();
        store.insert_item(item("D", None)).await.unwrap();
    }

    #[tokio::test]
    async fn failed_movement_leaves_no_trace() {
        let store = MemoryStore::new();
        let it = store.insert_item(item("Gasas", None)).await.unwrap();
        let (batch, _) = store
            .insert_batch(NewBatch {
                item_id: it.id,
                batch_number: "L1".into(),
                expiration_date: None,
                quantity: Decimal::new(10, 0),
                cost_per_unit: Decimal::ZERO,
                user_id: None,
            })
            .await
            .unwrap();

        let result = store
            .apply_movement(NewMovement {
                batch_id: batch.id,
                movement_type: MovementType::Consumption,
                quantity_change: Decimal::new(-11, 0),
                reason: None,
                reference_id: None,
                user_id: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::InsufficientStock { .. })));

        let (entries, total) = store
            .list_movements(MovementFilter { limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].movement.movement_type, MovementType::Purchase);
        assert_eq!(
            store.find_batch(batch.id).await.unwrap().unwrap().quantity_current,
            Decimal::new(10, 0)
        );
    }
}
