// src/db/store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        inventory::{
            Batch, BatchQuery, BatchStatus, BatchWithItem, Item, Movement, MovementEntry,
            MovementFilter, NewBatch, NewMovement,
        },
        requests::CreateItemRequest,
    },
};

/// Persistência do inventário.
///
/// Cada método de escrita é atômico: ou tudo é aplicado, ou nada. As
/// implementações são o Postgres (`InventoryRepository`) e o
/// `MemoryStore`, usado em testes e em desenvolvimento sem banco.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    // --- Catálogo ---
    async fn insert_item(&self, item: CreateItemRequest) -> Result<Item, AppError>;
    async fn update_item(&self, id: Uuid, item: CreateItemRequest) -> Result<Item, AppError>;
    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, AppError>;
    async fn list_items(&self) -> Result<Vec<Item>, AppError>;
    /// Falha com `Conflict` se algum lote ainda referencia o item.
    async fn delete_item(&self, id: Uuid) -> Result<(), AppError>;

    // --- Lotes ---
    /// Insere o lote e o movimento PURCHASE que o semeia, na mesma transação.
    async fn insert_batch(&self, batch: NewBatch) -> Result<(Batch, Movement), AppError>;
    async fn find_batch(&self, id: Uuid) -> Result<Option<Batch>, AppError>;
    /// Sempre em ordem FEFO (`Batch::fefo_cmp`).
    async fn list_batches(&self, query: BatchQuery) -> Result<Vec<BatchWithItem>, AppError>;
    async fn set_batch_status(&self, id: Uuid, status: BatchStatus) -> Result<Batch, AppError>;
    /// Remove o lote e todo o seu histórico. Retorna quantos movimentos foram apagados.
    async fn delete_batch(&self, id: Uuid) -> Result<u64, AppError>;

    // --- Movimentos ---
    /// Bloqueia o lote, aplica `Batch::next_quantity` e grava o movimento.
    async fn apply_movement(&self, movement: NewMovement) -> Result<(Movement, Batch), AppError>;
    async fn list_movements(&self, filter: MovementFilter) -> Result<(Vec<MovementEntry>, i64), AppError>;
    /// Arquivamento lógico: some das listagens, o saldo não muda.
    async fn archive_movement(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn archive_movements_before(
        &self,
        cutoff: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError>;
    /// Σ quantity_change de todos os movimentos do lote, arquivados inclusive.
    async fn movement_total(&self, batch_id: Uuid) -> Result<Decimal, AppError>;
}

