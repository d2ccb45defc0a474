// src/db/inventory_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::InventoryStore,
    models::{
        inventory::{
            Batch, BatchQuery, BatchStatus, BatchWithItem, Item, Movement, MovementDirection,
            MovementEntry, MovementFilter, MovementType, NewBatch, NewMovement,
        },
        requests::CreateItemRequest,
    },
};

// Mesma ordem de `Batch::fefo_cmp`
const FEFO_ORDER: &str = " ORDER BY b.expiration_date ASC NULLS LAST, b.created_at ASC";

const MOVEMENT_JOINS: &str = r#"
    FROM inventory_movements m
    JOIN inventory_batches b ON b.id = m.batch_id
    JOIN inventory_items i ON i.id = b.item_id
"#;

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Funções de "Leitura"
    // ---

    async fn fetch_item<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Item>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, Item>("SELECT * FROM inventory_items WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(item)
    }

    /// Relê o lote com `FOR UPDATE`: outra transação sobre o mesmo lote espera
    /// o nosso commit, então ninguém enxerga um saldo velho.
    async fn lock_batch<'e, E>(&self, executor: E, id: Uuid) -> Result<Batch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Batch>("SELECT * FROM inventory_batches WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::not_found("Lote", id))
    }

    // ---
    // Funções de "Escrita" (rodam dentro de uma transação)
    // ---

    async fn insert_movement<'e, E>(
        &self,
        executor: E,
        batch_id: Uuid,
        movement_type: MovementType,
        quantity_change: Decimal,
        reason: Option<&str>,
        reference_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Movement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, Movement>(
            r#"
            INSERT INTO inventory_movements
                (id, batch_id, movement_type, quantity_change, reason, reference_id, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(batch_id)
        .bind(movement_type)
        .bind(quantity_change)
        .bind(reason)
        .bind(reference_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(movement)
    }

    async fn update_batch_quantity<'e, E>(
        &self,
        executor: E,
        batch_id: Uuid,
        quantity_current: Decimal,
    ) -> Result<Batch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let batch = sqlx::query_as::<_, Batch>(
            "UPDATE inventory_batches SET quantity_current = $2 WHERE id = $1 RETURNING *",
        )
        .bind(batch_id)
        .bind(quantity_current)
        .fetch_one(executor)
        .await?;

        Ok(batch)
    }
}

/// Converte a violação do índice único de SKU em um conflito amigável.
fn map_sku_violation(e: sqlx::Error, sku: Option<&str>) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!(
                "El SKU '{}' ya existe.",
                sku.unwrap_or_default()
            ));
        }
    }
    e.into()
}

fn escape_like(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_movement_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &MovementFilter) {
    qb.push(" WHERE m.archived_at IS NULL");

    match filter.direction {
        MovementDirection::In => {
            qb.push(" AND m.quantity_change > 0");
        }
        MovementDirection::Out => {
            qb.push(" AND m.quantity_change < 0");
        }
        MovementDirection::All => {}
    }

    if let Some(from) = filter.from {
        qb.push(" AND m.created_at >= ").push_bind(from);
    }
    if let Some(until) = filter.until {
        qb.push(" AND m.created_at < ").push_bind(until);
    }

    if let Some(search) = filter.search.as_deref() {
        let pattern = escape_like(search);
        qb.push(" AND (i.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR i.sku ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR b.batch_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR m.reason ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl InventoryStore for InventoryRepository {
    async fn insert_item(&self, item: CreateItemRequest) -> Result<Item, AppError> {
        sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO inventory_items (
                id, sku, name, description, category, group_name, unit_of_measure,
                min_stock_level, requires_cold_chain, sanitary_registration, preferred_display_unit
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(item.sku.as_deref())
        .bind(&item.name)
        .bind(item.description.as_deref())
        .bind(item.category.as_deref())
        .bind(item.group_name.as_deref())
        .bind(&item.unit_of_measure)
        .bind(item.min_stock_level)
        .bind(item.requires_cold_chain)
        .bind(item.sanitary_registration.as_deref())
        .bind(item.preferred_display_unit)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sku_violation(e, item.sku.as_deref()))
    }

    async fn update_item(&self, id: Uuid, item: CreateItemRequest) -> Result<Item, AppError> {
        sqlx::query_as::<_, Item>(
            r#"
            UPDATE inventory_items SET
                sku = $2, name = $3, description = $4, category = $5, group_name = $6,
                unit_of_measure = $7, min_stock_level = $8, requires_cold_chain = $9,
                sanitary_registration = $10, preferred_display_unit = $11, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(item.sku.as_deref())
        .bind(&item.name)
        .bind(item.description.as_deref())
        .bind(item.category.as_deref())
        .bind(item.group_name.as_deref())
        .bind(&item.unit_of_measure)
        .bind(item.min_stock_level)
        .bind(item.requires_cold_chain)
        .bind(item.sanitary_registration.as_deref())
        .bind(item.preferred_display_unit)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sku_violation(e, item.sku.as_deref()))?
        .ok_or_else(|| AppError::not_found("Producto", id))
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, AppError> {
        self.fetch_item(&self.pool, id).await
    }

    async fn list_items(&self) -> Result<Vec<Item>, AppError> {
        let items = sqlx::query_as::<_, Item>("SELECT * FROM inventory_items ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn delete_item(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Bloqueia o item: um addBatch concorrente (FOR SHARE) espera por nós
        sqlx::query("SELECT id FROM inventory_items WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Producto", id))?;

        let batches: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory_batches WHERE item_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if batches > 0 {
            return Err(AppError::Conflict(format!(
                "El producto tiene {batches} lote(s) registrados; elimínelos antes de borrarlo."
            )));
        }

        sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_batch(&self, new: NewBatch) -> Result<(Batch, Movement), AppError> {
        let mut tx = self.pool.begin().await?;

        // O item não pode sumir no meio da entrada
        sqlx::query("SELECT id FROM inventory_items WHERE id = $1 FOR SHARE")
            .bind(new.item_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Producto", new.item_id))?;

        let batch = sqlx::query_as::<_, Batch>(
            r#"
            INSERT INTO inventory_batches (
                id, item_id, batch_number, expiration_date,
                quantity_initial, quantity_current, cost_per_unit
            )
            VALUES ($1, $2, $3, $4, $5, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.item_id)
        .bind(&new.batch_number)
        .bind(new.expiration_date)
        .bind(new.quantity)
        .bind(new.cost_per_unit)
        .fetch_one(&mut *tx)
        .await?;

        let movement = self
            .insert_movement(
                &mut *tx,
                batch.id,
                MovementType::Purchase,
                new.quantity,
                Some("Ingreso de lote"),
                None,
                new.user_id.as_deref(),
            )
            .await?;

        tx.commit().await?;
        Ok((batch, movement))
    }

    async fn find_batch(&self, id: Uuid) -> Result<Option<Batch>, AppError> {
        let batch = sqlx::query_as::<_, Batch>("SELECT * FROM inventory_batches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(batch)
    }

    async fn list_batches(&self, query: BatchQuery) -> Result<Vec<BatchWithItem>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT b.*, i.name AS item_name, i.sku, i.unit_of_measure
            FROM inventory_batches b
            JOIN inventory_items i ON i.id = b.item_id
            WHERE TRUE
            "#,
        );

        if let Some(item_id) = query.item_id {
            qb.push(" AND b.item_id = ").push_bind(item_id);
        }
        if !query.include_inactive {
            qb.push(" AND b.quantity_current > 0 AND b.status = ")
                .push_bind(BatchStatus::Active);
        }
        qb.push(FEFO_ORDER);

        let rows = qb
            .build_query_as::<BatchWithItem>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn set_batch_status(&self, id: Uuid, status: BatchStatus) -> Result<Batch, AppError> {
        sqlx::query_as::<_, Batch>(
            "UPDATE inventory_batches SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Lote", id))
    }

    async fn delete_batch(&self, id: Uuid) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        self.lock_batch(&mut *tx, id).await?;

        let removed = sqlx::query("DELETE FROM inventory_movements WHERE batch_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM inventory_batches WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn apply_movement(&self, new: NewMovement) -> Result<(Movement, Batch), AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Relê e bloqueia o lote
        let batch = self.lock_batch(&mut *tx, new.batch_id).await?;

        // 2. Regra do saldo. Qualquer erro aqui derruba a transação (rollback no drop).
        let new_qty = batch.next_quantity(new.quantity_change)?;

        // 3. Grava histórico e saldo
        let movement = self
            .insert_movement(
                &mut *tx,
                batch.id,
                new.movement_type,
                new.quantity_change,
                new.reason.as_deref(),
                new.reference_id.as_deref(),
                new.user_id.as_deref(),
            )
            .await?;

        let batch = self.update_batch_quantity(&mut *tx, batch.id, new_qty).await?;

        tx.commit().await?;
        Ok((movement, batch))
    }

    async fn list_movements(
        &self,
        filter: MovementFilter,
    ) -> Result<(Vec<MovementEntry>, i64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        count.push(MOVEMENT_JOINS);
        push_movement_filters(&mut count, &filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT m.*, b.batch_number, i.name AS item_name, i.sku",
        );
        qb.push(MOVEMENT_JOINS);
        push_movement_filters(&mut qb, &filter);
        qb.push(" ORDER BY m.created_at DESC, m.id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = qb
            .build_query_as::<MovementEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn archive_movement(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let updated = sqlx::query(
            "UPDATE inventory_movements SET archived_at = $2 WHERE id = $1 AND archived_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::not_found("Movimiento", id));
        }
        Ok(())
    }

    async fn archive_movements_before(
        &self,
        cutoff: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE inventory_movements SET archived_at = $2
            WHERE created_at < $1 AND archived_at IS NULL
            "#,
        )
        .bind(cutoff)
        .bind(at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated)
    }

    async fn movement_total(&self, batch_id: Uuid) -> Result<Decimal, AppError> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_change), 0) FROM inventory_movements WHERE batch_id = $1",
        )
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}
