// src/services/consumption.rs

//! Calculadora de consumo.
//!
//! Converte a intenção do usuário (quantidade digitada ou o nível visual
//! que sobrou no envase aberto) em uma quantidade concreta, sempre
//! positiva, que vira um movimento CONSUMPTION com sinal negativo.

use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::{
        inventory::Batch,
        requests::{ConsumeRequest, ConsumptionMode},
    },
};

// Resto fracionário abaixo disso é ruído (o banco guarda 2 casas)
fn level_noise() -> Decimal {
    Decimal::new(5, 3)
}

/// Níveis que o seletor visual oferece.
pub fn fill_levels() -> [Decimal; 5] {
    [
        Decimal::new(2, 1),
        Decimal::new(4, 1),
        Decimal::new(5, 1),
        Decimal::new(8, 1),
        Decimal::ONE,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumptionIntent {
    Manual(Decimal),
    Visual { target_level: Decimal },
}

impl ConsumptionIntent {
    pub fn from_request(req: &ConsumeRequest) -> Result<Self, AppError> {
        match req.mode {
            ConsumptionMode::Manual => req
                .quantity
                .map(ConsumptionIntent::Manual)
                .ok_or_else(|| AppError::InvalidInput("La cantidad es obligatoria.".into())),
            ConsumptionMode::Visual => req
                .target_level
                .map(|target_level| ConsumptionIntent::Visual { target_level })
                .ok_or_else(|| {
                    AppError::InvalidInput("Debe seleccionar el nivel restante del envase.".into())
                }),
        }
    }

    /// Resolve a quantidade consumida contra o saldo lido do lote.
    pub fn resolve(&self, batch: &Batch) -> Result<Decimal, AppError> {
        match *self {
            ConsumptionIntent::Manual(quantity) => {
                manual_consumption(quantity, batch.quantity_current)
            }
            ConsumptionIntent::Visual { target_level } => {
                visual_consumption(batch.quantity_current, target_level)
            }
        }
    }
}

/// Modo manual. A checagem contra o saldo é só conveniência: quem decide
/// de verdade é o livro-razão, com o lote bloqueado.
pub fn manual_consumption(quantity: Decimal, available: Decimal) -> Result<Decimal, AppError> {
    let quantity = quantity.round_dp(2);
    if quantity <= Decimal::ZERO {
        return Err(AppError::InvalidInput("La cantidad debe ser mayor a 0.".into()));
    }
    if quantity > available {
        return Err(AppError::InsufficientStock {
            available,
            requested: quantity,
        });
    }
    Ok(quantity)
}

/// Nível atual do envase aberto: a parte fracionária do saldo.
///
/// Saldo inteiro significa envase cheio (1.0), a não ser que o saldo
/// inteiro seja menor que uma unidade (ou seja, nada sobrou).
pub fn current_fill_level(quantity_current: Decimal) -> Decimal {
    let remainder = quantity_current.fract();
    if remainder < level_noise() {
        if quantity_current < Decimal::ONE {
            Decimal::ZERO
        } else {
            Decimal::ONE
        }
    } else {
        remainder
    }
}

/// Quanto foi consumido para o envase passar de `level` para `target`.
///
/// Se o alvo está acima do nível atual, o envase aberto acabou e outro
/// foi aberto e usado até `target`: consumo = level + (1 - target).
pub fn consumed_for_level(level: Decimal, target: Decimal) -> Decimal {
    let consumed = if target <= level {
        level - target
    } else {
        level + (Decimal::ONE - target)
    };
    consumed.round_dp(2).max(Decimal::ZERO)
}

pub fn visual_consumption(quantity_current: Decimal, target: Decimal) -> Result<Decimal, AppError> {
    if !fill_levels().contains(&target) {
        return Err(AppError::InvalidInput(format!(
            "Nivel {target} no válido; use 0.2, 0.4, 0.5, 0.8 o 1.0."
        )));
    }

    let level = current_fill_level(quantity_current);
    let consumed = consumed_for_level(level, target);

    if consumed.is_zero() {
        return Err(AppError::InvalidInput(
            "El nivel seleccionado no implica consumo.".into(),
        ));
    }
    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn full_container_drawn_down_to_80_percent() {
        assert_eq!(consumed_for_level(dec("1.0"), dec("0.8")), dec("0.20"));
        assert_eq!(visual_consumption(dec("5"), dec("0.8")).unwrap(), dec("0.20"));
    }

    #[test]
    fn crossing_into_a_new_container() {
        assert_eq!(consumed_for_level(dec("0.1"), dec("0.9")), dec("0.20"));
        // 3.1 -> abre novo envase e deixa em 0.8: 0.1 + 0.2
        assert_eq!(visual_consumption(dec("3.1"), dec("0.8")).unwrap(), dec("0.30"));
    }

    #[test]
    fn same_level_is_rejected() {
        assert_eq!(consumed_for_level(dec("0.5"), dec("0.5")), Decimal::ZERO);
        assert!(matches!(
            visual_consumption(dec("2.5"), dec("0.5")),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn whole_quantity_reads_as_full_container() {
        assert_eq!(current_fill_level(dec("4")), Decimal::ONE);
        assert_eq!(current_fill_level(dec("4.001")), Decimal::ONE);
        assert_eq!(current_fill_level(dec("4.25")), dec("0.25"));
        assert_eq!(current_fill_level(dec("0.4")), dec("0.4"));
        assert_eq!(current_fill_level(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn full_level_target_on_full_container_is_noop() {
        assert!(visual_consumption(dec("3"), Decimal::ONE).is_err());
        // 2.4 -> alvo 1.0: terminou o aberto e abriu outro sem usar
        assert_eq!(visual_consumption(dec("2.4"), Decimal::ONE).unwrap(), dec("0.40"));
    }

    #[test]
    fn only_offered_levels_are_accepted() {
        assert!(visual_consumption(dec("3"), dec("0.3")).is_err());
        assert!(visual_consumption(dec("3"), dec("0.20")).is_ok());
    }

    #[test]
    fn manual_mode_bounds() {
        assert_eq!(manual_consumption(dec("2"), dec("5")).unwrap(), dec("2"));
        assert_eq!(manual_consumption(dec("5"), dec("5")).unwrap(), dec("5"));
        match manual_consumption(dec("5.01"), dec("5")) {
            Err(AppError::InsufficientStock { available, requested }) => {
                assert_eq!(available, dec("5"));
                assert_eq!(requested, dec("5.01"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(manual_consumption(Decimal::ZERO, dec("5")).is_err());
        assert!(manual_consumption(dec("-1"), dec("5")).is_err());
    }
}
