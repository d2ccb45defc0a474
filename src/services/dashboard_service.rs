// src/services/dashboard_service.rs

//! Projeções de leitura: saldo por item, status de estoque, próxima
//! validade, lote recomendado e os contadores do painel.
//!
//! Tudo é recalculado a partir do snapshot atual dos lotes a cada
//! consulta. As funções puras ficam separadas do serviço para poderem
//! ser testadas sem store.

use std::{collections::HashSet, sync::Arc};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::InventoryStore,
    models::{
        dashboard::{BatchView, DashboardSummary, ItemStockView, StockStatus},
        inventory::{Batch, BatchDisplayStatus, BatchQuery, BatchWithItem, Item},
    },
    services::expiry::{classify_expiry, days_until},
};

/// Janela do contador "vence em 30 dias" do painel, dia 30 incluído.
pub const EXPIRING_COUNTER_DAYS: i64 = 30;

// ---
// Regras puras
// ---

// Lotes em quarentena não contam para nada do lado "disponível"
fn available<'a>(batches: impl IntoIterator<Item = &'a Batch>) -> impl Iterator<Item = &'a Batch> {
    batches.into_iter().filter(|b| !b.is_quarantined())
}

pub fn total_stock<'a>(batches: impl IntoIterator<Item = &'a Batch>) -> Decimal {
    available(batches)
        .map(|b| b.quantity_current)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

pub fn stock_status(total: Decimal, min_stock_level: Decimal) -> StockStatus {
    if total <= Decimal::ZERO {
        StockStatus::Agotado
    } else if total <= min_stock_level {
        StockStatus::BajoStock
    } else {
        StockStatus::Normal
    }
}

/// Menor validade entre os lotes com saldo. Lotes sem validade são ignorados.
pub fn next_expiry<'a>(batches: impl IntoIterator<Item = &'a Batch>) -> Option<NaiveDate> {
    available(batches)
        .filter(|b| b.has_stock())
        .filter_map(|b| b.expiration_date)
        .min()
}

pub fn display_status(batch: &Batch, today: NaiveDate) -> BatchDisplayStatus {
    if batch.is_quarantined() {
        BatchDisplayStatus::Quarantine
    } else if !batch.has_stock() {
        BatchDisplayStatus::Depleted
    } else if batch.expiration_date.is_some_and(|exp| exp < today) {
        BatchDisplayStatus::Expired
    } else {
        BatchDisplayStatus::Active
    }
}

/// Primeiro lote utilizável em ordem FEFO.
pub fn recommended_batch<'a>(batches: impl IntoIterator<Item = &'a Batch>) -> Option<&'a Batch> {
    available(batches)
        .filter(|b| b.has_stock())
        .min_by(|a, b| a.fefo_cmp(b))
}

pub fn item_stock_view<'a>(item: Item, batches: impl IntoIterator<Item = &'a Batch> + Clone) -> ItemStockView {
    let total = total_stock(batches.clone());
    ItemStockView {
        stock_status: stock_status(total, item.min_stock_level),
        next_expiry: next_expiry(batches),
        total_stock: total,
        item,
    }
}

/// Converte as linhas do store em views, marcando o lote recomendado de
/// cada item. A ordem de entrada é preservada.
pub fn batch_views(rows: Vec<BatchWithItem>, today: NaiveDate) -> Vec<BatchView> {
    let mut recommended: HashSet<Uuid> = HashSet::new();
    let mut seen_items: HashSet<Uuid> = HashSet::new();
    let mut by_fefo: Vec<&Batch> = rows.iter().map(|r| &r.batch).collect();
    by_fefo.sort_by(|a, b| a.fefo_cmp(b));
    for b in by_fefo {
        if !b.is_quarantined() && b.has_stock() && seen_items.insert(b.item_id) {
            recommended.insert(b.id);
        }
    }

    rows.into_iter()
        .map(|row| {
            let exp = row.batch.expiration_date;
            BatchView {
                display_status: display_status(&row.batch, today),
                expiry_status: exp.map(|d| classify_expiry(d, today)),
                days_to_expiry: exp.map(|d| days_until(d, today)),
                recommended: recommended.contains(&row.batch.id),
                batch: row,
            }
        })
        .collect()
}

pub fn summarize(items: &[Item], batches: &[Batch], today: NaiveDate) -> DashboardSummary {
    let mut summary = DashboardSummary {
        total_items: items.len(),
        ..Default::default()
    };

    for item in items {
        let own = batches.iter().filter(|b| b.item_id == item.id);
        match stock_status(total_stock(own), item.min_stock_level) {
            StockStatus::Agotado => summary.out_of_stock += 1,
            StockStatus::BajoStock => summary.low_stock += 1,
            StockStatus::Normal => {}
        }
    }

    for batch in available(batches).filter(|b| b.has_stock()) {
        summary.batches_with_stock += 1;
        let value = batch.quantity_current.saturating_mul(batch.cost_per_unit);
        summary.stock_value = summary.stock_value.saturating_add(value);

        if let Some(exp) = batch.expiration_date {
            let days = days_until(exp, today);
            if days < 0 {
                summary.expired += 1;
            } else if days <= EXPIRING_COUNTER_DAYS {
                summary.expiring_within_30_days += 1;
            }
        }
    }

    summary
}

// ---
// Serviço
// ---

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn InventoryStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn get_summary(&self, today: NaiveDate) -> Result<DashboardSummary, AppError> {
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

        Ok(summarize(&items, &batches, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventory::{BatchStatus, DisplayUnit};
    use chrono::{Duration, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn item(min: i64) -> Item {
        Item {
            id: Uuid::new_v4(),
            sku: None,
            name: "Ácido hialurónico".into(),
            description: None,
            category: None,
            group_name: None,
            unit_of_measure: "Jeringa".into(),
            min_stock_level: Decimal::new(min, 0),
            requires_cold_chain: false,
            sanitary_registration: None,
            preferred_display_unit: DisplayUnit::Absolute,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn batch(item: &Item, qty: i64, expires_in: Option<i64>) -> Batch {
        Batch {
            id: Uuid::new_v4(),
            item_id: item.id,
            batch_number: "L".into(),
            expiration_date: expires_in.map(|d| today() + Duration::days(d)),
            quantity_initial: Decimal::new(qty.max(1), 0),
            quantity_current: Decimal::new(qty, 0),
            cost_per_unit: Decimal::new(10, 0),
            status: BatchStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn stock_status_thresholds() {
        let min = Decimal::new(5, 0);
        assert_eq!(stock_status(Decimal::ZERO, min), StockStatus::Agotado);
        assert_eq!(stock_status(Decimal::new(5, 0), min), StockStatus::BajoStock);
        assert_eq!(stock_status(Decimal::new(6, 0), min), StockStatus::Normal);
    }

    #[test]
    fn quarantined_batches_do_not_count() {
        let it = item(5);
        let ok = batch(&it, 4, Some(10));
        let mut held = batch(&it, 50, Some(2));
        held.status = BatchStatus::Quarantine;
        let all = [ok.clone(), held.clone()];

        assert_eq!(total_stock(&all), Decimal::new(4, 0));
        assert_eq!(next_expiry(&all), ok.expiration_date);
        assert_eq!(recommended_batch(&all).map(|b| b.id), Some(ok.id));
        assert_eq!(display_status(&held, today()), BatchDisplayStatus::Quarantine);
    }

    #[test]
    fn next_expiry_skips_empty_and_no_expiry_batches() {
        let it = item(5);
        let empty = batch(&it, 0, Some(1));
        let forever = batch(&it, 3, None);
        let later = batch(&it, 3, Some(40));
        let all = [empty, forever, later.clone()];
        assert_eq!(next_expiry(&all), later.expiration_date);
    }

    #[test]
    fn display_status_precedence() {
        let it = item(5);
        assert_eq!(display_status(&batch(&it, 0, Some(-3)), today()), BatchDisplayStatus::Depleted);
        assert_eq!(display_status(&batch(&it, 2, Some(-3)), today()), BatchDisplayStatus::Expired);
        assert_eq!(display_status(&batch(&it, 2, Some(0)), today()), BatchDisplayStatus::Active);
        assert_eq!(display_status(&batch(&it, 2, None), today()), BatchDisplayStatus::Active);
    }

    #[test]
    fn one_recommended_batch_per_item() {
        let a = item(1);
        let b = item(1);
        let rows: Vec<BatchWithItem> = [
            batch(&a, 1, Some(60)),
            batch(&a, 1, Some(5)),
            batch(&b, 1, None),
        ]
        .into_iter()
        .map(|batch| BatchWithItem {
            batch,
            item_name: "x".into(),
            sku: None,
            unit_of_measure: "u".into(),
        })
        .collect();
        let expected_a = rows[1].batch.id;
        let expected_b = rows[2].batch.id;

        let views = batch_views(rows, today());
        let flagged: Vec<Uuid> = views
            .iter()
            .filter(|v| v.recommended)
            .map(|v| v.batch.batch.id)
            .collect();
        assert_eq!(flagged.len(), 2);
        assert!(flagged.contains(&expected_a));
        assert!(flagged.contains(&expected_b));
        assert_eq!(views[1].days_to_expiry, Some(5));
    }

    #[test]
    fn summary_counters() {
        let low = item(5);
        let out = item(5);
        let fine = item(1);
        let batches = vec![
            batch(&low, 3, Some(30)),   // conta como "vence em 30 dias"
            batch(&fine, 10, Some(-1)), // vencido com saldo
            batch(&fine, 0, Some(-9)),  // vencido mas vazio: ignorado
            batch(&fine, 2, None),
        ];
        let items = vec![low, out, fine];

        let s = summarize(&items, &batches, today());
        assert_eq!(
            s,
            DashboardSummary {
                total_items: 3,
                low_stock: 1,
                out_of_stock: 1,
                batches_with_stock: 3,
                expiring_within_30_days: 1,
                expired: 1,
                stock_value: Decimal::new(150, 0),
            }
        );
    }

    #[test]
    fn expiring_counter_includes_last_day() {
        let it = item(1);
        let batches = vec![
            batch(&it, 1, Some(EXPIRING_COUNTER_DAYS)),
            batch(&it, 1, Some(EXPIRING_COUNTER_DAYS + 1)),
            batch(&it, 1, Some(0)),
        ];
        let s = summarize(&[it], &batches, today());
        assert_eq!(s.expiring_within_30_days, 2);
        assert_eq!(s.expired, 0);
    }

    #[test]
    fn stock_value_saturates_instead_of_overflowing() {
        let it = item(1);
        let mut huge = batch(&it, 1, None);
        huge.quantity_initial = Decimal::MAX;
        huge.quantity_current = Decimal::MAX;
        huge.cost_per_unit = Decimal::MAX;
        let other = batch(&it, 2, None);

        let s = summarize(&[it], &[huge, other], today());
        assert_eq!(s.stock_value, Decimal::MAX);
        assert_eq!(s.batches_with_stock, 2);
    }
}
