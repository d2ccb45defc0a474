// src/models/dashboard.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::inventory::{BatchDisplayStatus, BatchWithItem, Item};
use crate::services::expiry::ExpiryStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum StockStatus {
    Agotado,
    BajoStock,
    Normal,
}

// 1. Item + saldo agregado (lista principal do inventário)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemStockView {
    #[serde(flatten)]
    pub item: Item,
    pub total_stock: Decimal,
    pub stock_status: StockStatus,
    pub next_expiry: Option<NaiveDate>,
}

// 2. Lote com status derivados para a tela de lotes
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: BatchWithItem,
    pub display_status: BatchDisplayStatus,
    pub expiry_status: Option<ExpiryStatus>,
    pub days_to_expiry: Option<i64>,
    // Sugestão FEFO explícita: o usuário pode escolher outro lote
    pub recommended: bool,
}

// 3. Detalhe de um item com seus lotes disponíveis
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub stock: ItemStockView,
    pub batches: Vec<BatchView>,
}

// 4. Cards do topo
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub total_items: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub batches_with_stock: usize,
    pub expiring_within_30_days: usize,
    pub expired: usize,
    pub stock_value: Decimal,
}
