// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro único. Cada variante corresponde a uma categoria
// da taxonomia do inventário (validação, conflito, estoque, etc.).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Uno o más campos son inválidos.")]
    ValidationError(#[from] validator::ValidationErrors),

    // Validações manuais (fora do `validator`), ex: confirmação ausente
    #[error("{0}")]
    InvalidInput(String),

    // SKU duplicado, item com lotes, lote em quarentena...
    #[error("{0}")]
    Conflict(String),

    #[error("Stock insuficiente en el lote (disponible: {available}, solicitado: {requested})")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("{0}")]
    NotFound(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{entity} {id} no encontrado"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Uno o más campos son inválidos.",
                    "details": details,
                })
            }

            // O `tracing` loga a mensagem detalhada; o cliente recebe algo genérico.
            ref e @ (AppError::DatabaseError(_) | AppError::InternalServerError(_)) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                json!({ "error": "Ocurrió un error inesperado." })
            }

            // Os demais expõem a mensagem tal como foi gerada.
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InsufficientStock {
                available: Decimal::ONE,
                requested: Decimal::TWO,
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::not_found("Lote", "abc").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn insufficient_stock_message_names_both_quantities() {
        let err = AppError::InsufficientStock {
            available: Decimal::new(40, 0),
            requested: Decimal::new(60, 0),
        };
        let msg = err.to_string();
        assert!(msg.contains("40"));
        assert!(msg.contains("60"));
    }
}
