// src/models/inventory.rs

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "movement_type", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum MovementType {
    Purchase,    // "PURCHASE"    -> entrada, semeia o lote
    Consumption, // "CONSUMPTION" -> uso em cabine / venda direta
    Adjustment,  // "ADJUSTMENT"  -> correção (qualquer sinal)
    Return,      // "RETURN"      -> devolução ao lote
    Expired,     // "EXPIRED"     -> baixa por vencimento
}

impl MovementType {
    /// Confere se o sinal da variação combina com o tipo do movimento.
    pub fn check_change(self, quantity_change: Decimal) -> Result<(), AppError> {
        if quantity_change.is_zero() {
            return Err(AppError::InvalidInput(
                "La variación de cantidad no puede ser cero.".into(),
            ));
        }

        let positive = quantity_change.is_sign_positive();
        let ok = match self {
            MovementType::Purchase | MovementType::Return => positive,
            MovementType::Consumption | MovementType::Expired => !positive,
            MovementType::Adjustment => true,
        };

        if ok {
            Ok(())
        } else {
            Err(AppError::InvalidInput(format!(
                "El signo de la cantidad ({quantity_change}) no corresponde al tipo {self:?}."
            )))
        }
    }
}

// Status persistido. O status exibido (vencido, esgotado) é derivado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "batch_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Active,
    Quarantine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchDisplayStatus {
    Active,
    Expired,
    Depleted,
    Quarantine,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "display_unit", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    #[default]
    Absolute,
    Percentage,
}

// --- 1. Itens (Catálogo) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: Uuid,
    #[schema(example = "TOX-100")]
    pub sku: Option<String>,
    #[schema(example = "Toxina botulínica 100U")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "Inyectable")]
    pub category: Option<String>,
    pub group_name: Option<String>,
    #[schema(example = "Vial")]
    pub unit_of_measure: String,
    #[schema(example = "5")]
    pub min_stock_level: Decimal,
    pub requires_cold_chain: bool,
    pub sanitary_registration: Option<String>,
    pub preferred_display_unit: DisplayUnit,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Lotes ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Batch {
    pub id: Uuid,
    pub item_id: Uuid,
    #[schema(example = "LOTE-20250101-042")]
    pub batch_number: String,
    // None = não vence
    pub expiration_date: Option<NaiveDate>,
    pub quantity_initial: Decimal,
    pub quantity_current: Decimal,
    pub cost_per_unit: Decimal,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn is_quarantined(&self) -> bool {
        self.status == BatchStatus::Quarantine
    }

    pub fn has_stock(&self) -> bool {
        self.quantity_current > Decimal::ZERO
    }

    /// Calcula o novo saldo do lote depois de aplicar `quantity_change`.
    ///
    /// É a regra central do livro-razão e roda *dentro* da transação, com o
    /// lote já bloqueado: nenhum saldo pode ficar negativo nem passar da
    /// quantidade inicial.
    pub fn next_quantity(&self, quantity_change: Decimal) -> Result<Decimal, AppError> {
        if self.is_quarantined() && quantity_change.is_sign_negative() {
            return Err(AppError::Conflict(format!(
                "El lote {} está en cuarentena y no admite salidas.",
                self.batch_number
            )));
        }

        let above_initial = || {
            AppError::Conflict(format!(
                "El lote {} no puede superar su cantidad inicial ({}).",
                self.batch_number, self.quantity_initial
            ))
        };

        // Só estoura para cima: o saldo atual nunca é negativo
        let new_qty = self
            .quantity_current
            .checked_add(quantity_change)
            .ok_or_else(above_initial)?;

        if new_qty < Decimal::ZERO {
            return Err(AppError::InsufficientStock {
                available: self.quantity_current,
                requested: -quantity_change,
            });
        }

        if new_qty > self.quantity_initial {
            return Err(above_initial());
        }

        Ok(new_qty)
    }

    /// Ordem FEFO: vence primeiro, sai primeiro. Lotes sem validade vão
    /// para o fim; empates pela data de entrada.
    pub fn fefo_cmp(&self, other: &Batch) -> Ordering {
        match (self.expiration_date, other.expiration_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| self.created_at.cmp(&other.created_at))
    }
}

// --- 3. Movimentações (Kardex) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Movement {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub movement_type: MovementType,
    // Positivo = entrada, negativo = saída
    pub quantity_change: Decimal,
    pub reason: Option<String>,
    // Ficha clínica ou fatura relacionada
    pub reference_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

// --- Linhas de leitura (JOINs) ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BatchWithItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub batch: Batch,
    pub item_name: String,
    pub sku: Option<String>,
    pub unit_of_measure: String,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MovementEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub movement: Movement,
    pub batch_number: String,
    pub item_name: String,
    pub sku: Option<String>,
}

// --- Comandos para o store ---

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub item_id: Uuid,
    pub batch_number: String,
    pub expiration_date: Option<NaiveDate>,
    pub quantity: Decimal,
    pub cost_per_unit: Decimal,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMovement {
    pub batch_id: Uuid,
    pub movement_type: MovementType,
    pub quantity_change: Decimal,
    pub reason: Option<String>,
    pub reference_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchQuery {
    pub item_id: Option<Uuid>,
    // Inclui lotes zerados e em quarentena (snapshot completo)
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum MovementDirection {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl MovementDirection {
    pub fn matches(self, quantity_change: Decimal) -> bool {
        match self {
            MovementDirection::All => true,
            MovementDirection::In => quantity_change > Decimal::ZERO,
            MovementDirection::Out => quantity_change < Decimal::ZERO,
        }
    }
}

/// Filtro já resolvido (datas convertidas para intervalos UTC).
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub direction: MovementDirection,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

/// Resultado de uma escrita no livro-razão: o movimento gravado e o lote já atualizado.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LedgerPosting {
    pub movement: Movement,
    pub batch: Batch,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReconciliationReport {
    pub batch_id: Uuid,
    pub quantity_initial: Decimal,
    pub quantity_current: Decimal,
    // Σ de todos os movimentos, arquivados inclusive
    pub movement_total: Decimal,
    pub balanced: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn batch(initial: i64, current: i64) -> Batch {
        Batch {
            id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            batch_number: "L-1".into(),
            expiration_date: None,
            quantity_initial: Decimal::new(initial, 0),
            quantity_current: Decimal::new(current, 0),
            cost_per_unit: Decimal::ZERO,
            status: BatchStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn next_quantity_rejects_negative_balance() {
        let b = batch(100, 30);
        let err = b.next_quantity(Decimal::new(-31, 0)).unwrap_err();
        match err {
            AppError::InsufficientStock { available, requested } => {
                assert_eq!(available, Decimal::new(30, 0));
                assert_eq!(requested, Decimal::new(31, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(b.next_quantity(Decimal::new(-30, 0)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn next_quantity_caps_at_initial_quantity() {
        let b = batch(100, 90);
        assert_eq!(b.next_quantity(Decimal::new(10, 0)).unwrap(), Decimal::new(100, 0));
        assert!(matches!(
            b.next_quantity(Decimal::new(11, 0)),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn next_quantity_handles_extreme_changes() {
        let b = batch(10, 10);
        assert!(matches!(b.next_quantity(Decimal::MAX), Err(AppError::Conflict(_))));
        assert!(matches!(
            b.next_quantity(Decimal::MIN),
            Err(AppError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn quarantined_batch_accepts_returns_but_not_withdrawals() {
        let mut b = batch(10, 5);
        b.status = BatchStatus::Quarantine;
        assert!(matches!(b.next_quantity(Decimal::NEGATIVE_ONE), Err(AppError::Conflict(_))));
        assert_eq!(b.next_quantity(Decimal::ONE).unwrap(), Decimal::new(6, 0));
    }

    #[test]
    fn movement_sign_must_match_type() {
        let out = Decimal::new(-5, 0);
        let inn = Decimal::new(5, 0);
        assert!(MovementType::Consumption.check_change(out).is_ok());
        assert!(MovementType::Consumption.check_change(inn).is_err());
        assert!(MovementType::Expired.check_change(inn).is_err());
        assert!(MovementType::Return.check_change(inn).is_ok());
        assert!(MovementType::Purchase.check_change(out).is_err());
        assert!(MovementType::Adjustment.check_change(out).is_ok());
        assert!(MovementType::Adjustment.check_change(inn).is_ok());
        assert!(MovementType::Adjustment.check_change(Decimal::ZERO).is_err());
    }

    #[test]
    fn fefo_orders_by_expiry_then_no_expiry_last() {
        let mut a = batch(1, 1);
        let mut b = batch(1, 1);
        let mut c = batch(1, 1);
        a.expiration_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        b.expiration_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        c.expiration_date = None;
        c.created_at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        let mut all = vec![c.clone(), a.clone(), b.clone()];
        all.sort_by(|x, y| x.fefo_cmp(y));
        let order: Vec<Uuid> = all.iter().map(|x| x.id).collect();
        assert_eq!(order, vec![b.id, a.id, c.id]);
    }

    #[test]
    fn direction_filter() {
        assert!(MovementDirection::In.matches(Decimal::ONE));
        assert!(!MovementDirection::In.matches(Decimal::NEGATIVE_ONE));
        assert!(MovementDirection::Out.matches(Decimal::NEGATIVE_ONE));
        assert!(MovementDirection::All.matches(Decimal::NEGATIVE_ONE));
    }
}
