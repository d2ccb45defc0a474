// src/models/requests.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::inventory::{DisplayUnit, Item, MovementDirection, MovementType};

// Valor que o formulário antigo gravava para "sem validade"
const LEGACY_NO_EXPIRY: &str = "2099-12-31";

// ---
// Validações customizadas
// ---

/// Maior valor que cabe nas colunas NUMERIC(10, 2).
fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

fn range_error(message: String) -> ValidationError {
    let mut err = ValidationError::new("range");
    err.message = Some(message.into());
    err
}

fn validate_within_max(val: &Decimal) -> Result<(), ValidationError> {
    if val.abs() > max_amount() {
        return Err(range_error(format!(
            "El valor no puede superar {}.",
            max_amount()
        )));
    }
    Ok(())
}

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        return Err(range_error("El valor no puede ser negativo.".into()));
    }
    validate_within_max(val)
}

fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        return Err(range_error("El valor debe ser mayor a 0.".into()));
    }
    validate_within_max(val)
}

fn validate_not_blank(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Este campo es obligatorio.".into());
        return Err(err);
    }
    Ok(())
}

/// Aceita `"YYYY-MM-DD"`, `"no-expiry"`, string vazia ou `null`.
fn deserialize_expiration<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("no-expiry") | Some(LEGACY_NO_EXPIRY) => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                serde::de::Error::custom(format!(
                    "expiration_date inválida '{text}': use YYYY-MM-DD o \"no-expiry\""
                ))
            }),
    }
}

fn default_min_stock() -> Decimal {
    Decimal::new(5, 0)
}

/// Strings opcionais em branco viram `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---
// Payload: Item
// ---
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[schema(example = "TOX-100")]
    pub sku: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Toxina botulínica 100U")]
    pub name: String,

    pub description: Option<String>,

    #[schema(example = "Inyectable")]
    pub category: Option<String>,

    pub group_name: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Vial")]
    pub unit_of_measure: String,

    #[serde(default = "default_min_stock")]
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = f64, example = 5)]
    pub min_stock_level: Decimal,

    #[serde(default)]
    pub requires_cold_chain: bool,

    pub sanitary_registration: Option<String>,

    #[serde(default)]
    pub preferred_display_unit: DisplayUnit,
}

impl CreateItemRequest {
    /// Normaliza campos opcionais (brancos viram `None`, nomes sem espaços nas pontas).
    pub fn normalized(self) -> Self {
        Self {
            sku: non_blank(self.sku),
            name: self.name.trim().to_string(),
            description: non_blank(self.description),
            category: non_blank(self.category),
            group_name: non_blank(self.group_name),
            unit_of_measure: self.unit_of_measure.trim().to_string(),
            sanitary_registration: non_blank(self.sanitary_registration),
            ..self
        }
    }
}

impl From<&Item> for CreateItemRequest {
    fn from(item: &Item) -> Self {
        Self {
            sku: item.sku.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            group_name: item.group_name.clone(),
            unit_of_measure: item.unit_of_measure.clone(),
            min_stock_level: item.min_stock_level,
            requires_cold_chain: item.requires_cold_chain,
            sanitary_registration: item.sanitary_registration.clone(),
            preferred_display_unit: item.preferred_display_unit,
        }
    }
}

// Atualização parcial: só os campos presentes são aplicados.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub id: Uuid,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub group_name: Option<String>,
    pub unit_of_measure: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub min_stock_level: Option<Decimal>,
    pub requires_cold_chain: Option<bool>,
    pub sanitary_registration: Option<String>,
    pub preferred_display_unit: Option<DisplayUnit>,
}

impl UpdateItemRequest {
    /// Aplica o patch sobre os dados atuais, gerando o registro completo a validar.
    pub fn apply_to(self, current: CreateItemRequest) -> CreateItemRequest {
        CreateItemRequest {
            sku: self.sku.or(current.sku),
            name: self.name.unwrap_or(current.name),
            description: self.description.or(current.description),
            category: self.category.or(current.category),
            group_name: self.group_name.or(current.group_name),
            unit_of_measure: self.unit_of_measure.unwrap_or(current.unit_of_measure),
            min_stock_level: self.min_stock_level.unwrap_or(current.min_stock_level),
            requires_cold_chain: self.requires_cold_chain.unwrap_or(current.requires_cold_chain),
            sanitary_registration: self.sanitary_registration.or(current.sanitary_registration),
            preferred_display_unit: self
                .preferred_display_unit
                .unwrap_or(current.preferred_display_unit),
        }
    }
}

// ---
// Payload: Entrada de lote
// ---
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddBatchRequest {
    pub item_id: Uuid,

    // Se vier vazio, geramos LOTE-yyyymmdd-nnn
    #[schema(example = "L-2024-001")]
    pub batch_number: Option<String>,

    #[serde(default, deserialize_with = "deserialize_expiration")]
    #[schema(value_type = Option<String>, example = "2026-06-30")]
    pub expiration_date: Option<NaiveDate>,

    #[validate(custom(function = "validate_positive"))]
    #[schema(value_type = f64, example = 10)]
    pub quantity: Decimal,

    #[serde(default)]
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = f64, example = 12.5)]
    pub cost_per_unit: Decimal,

    pub user_id: Option<String>,
}

// ---
// Payload: Consumo
// ---
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConsumptionMode {
    #[default]
    Manual,
    Visual,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConsumeRequest {
    pub batch_id: Uuid,

    #[serde(default)]
    pub mode: ConsumptionMode,

    // Modo manual: quantidade consumida
    #[schema(value_type = Option<f64>, example = 1)]
    pub quantity: Option<Decimal>,

    // Modo visual: nível que sobrou no envase aberto
    #[schema(value_type = Option<f64>, example = 0.8)]
    pub target_level: Option<Decimal>,

    #[schema(example = "Uso en cabina")]
    pub reason: Option<String>,
    pub reference_id: Option<String>,
    pub user_id: Option<String>,
}

// ---
// Payload: Movimento avulso (ajuste, devolução, vencimento)
// ---
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordMovementRequest {
    pub batch_id: Uuid,
    pub movement_type: MovementType,
    #[validate(custom(function = "validate_within_max"))]
    #[schema(value_type = f64, example = -2)]
    pub quantity_change: Decimal,
    pub reason: Option<String>,
    pub reference_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuarantineRequest {
    pub batch_id: Uuid,
    pub quarantined: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ClearMovementsRequest {
    #[serde(rename = "olderThanDays", alias = "older_than_days")]
    #[validate(range(min = 1, max = 36500, message = "Debe estar entre 1 y 36500 días."))]
    pub older_than_days: i64,

    #[serde(default)]
    pub confirm: bool,
}

// ---
// Query: listagem do kardex
// ---
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementListQuery {
    #[serde(rename = "type", default)]
    #[param(value_type = Option<String>, example = "OUT")]
    pub direction: MovementDirection,

    #[serde(rename = "startDate", alias = "start_date")]
    pub start_date: Option<NaiveDate>,

    #[serde(rename = "endDate", alias = "end_date")]
    pub end_date: Option<NaiveDate>,

    pub search: Option<String>,

    pub page: Option<u32>,

    #[serde(rename = "perPage", alias = "per_page", alias = "limit")]
    pub per_page: Option<u32>,
}
