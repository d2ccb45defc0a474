mod common;

use clinic_inventory::{common::error::AppError, models::requests::UpdateItemRequest};
use common::{dec, Ledger};
use uuid::Uuid;

fn patch(id: Uuid) -> UpdateItemRequest {
    UpdateItemRequest {
        id,
        ..Default::default()
    }
}

async fn with_sku(ledger: &Ledger, name: &str, sku: &str) -> Uuid {
    let item = ledger.item(name).await;
    ledger
        .service
        .update_item(UpdateItemRequest {
            sku: Some(sku.into()),
            ..patch(item.id)
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn update_keeps_untouched_fields() {
    let ledger = Ledger::new();
    let id = with_sku(&ledger, "Gasas", "GAS-01").await;

    let updated = ledger
        .service
        .update_item(UpdateItemRequest {
            min_stock_level: Some(dec("12")),
            category: Some("  Insumos ".into()),
            ..patch(id)
        })
        .await
        .unwrap();
    assert_eq!(updated.name, "Gasas");
    assert_eq!(updated.sku.as_deref(), Some("GAS-01"));
    assert_eq!(updated.category.as_deref(), Some("Insumos"));
    assert_eq!(updated.min_stock_level, dec("12"));
}

#[tokio::test]
async fn update_to_a_taken_sku_is_a_conflict() {
    let ledger = Ledger::new();
    with_sku(&ledger, "Toxina", "TOX-100").await;
    let other = with_sku(&ledger, "Gasas", "GAS-01").await;

    let err = ledger
        .service
        .update_item(UpdateItemRequest {
            sku: Some(" TOX-100 ".into()),
            ..patch(other)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Reenviar o próprio SKU não conflita
    let same = ledger
        .service
        .update_item(UpdateItemRequest {
            sku: Some("GAS-01".into()),
            ..patch(other)
        })
        .await
        .unwrap();
    assert_eq!(same.sku.as_deref(), Some("GAS-01"));
}

#[tokio::test]
async fn update_of_unknown_item_is_not_found() {
    let ledger = Ledger::new();
    let err = ledger
        .service
        .update_item(UpdateItemRequest {
            name: Some("Nada".into()),
            ..patch(Uuid::new_v4())
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn update_cannot_blank_required_fields() {
    let ledger = Ledger::new();
    let item = ledger.item("Gasas").await;

    for blanked in [
        UpdateItemRequest {
            name: Some("   ".into()),
            ..patch(item.id)
        },
        UpdateItemRequest {
            unit_of_measure: Some(String::new()),
            ..patch(item.id)
        },
        UpdateItemRequest {
            min_stock_level: Some(dec("-1")),
            ..patch(item.id)
        },
    ] {
        let err = ledger.service.update_item(blanked).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    let stored = ledger.store.find_item(item.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Gasas");
    assert_eq!(stored.unit_of_measure, "Unidad");
}

#[tokio::test]
async fn empty_sku_clears_it() {
    let ledger = Ledger::new();
    let id = with_sku(&ledger, "Gasas", "GAS-01").await;

    let cleared = ledger
        .service
        .update_item(UpdateItemRequest {
            sku: Some(String::new()),
            ..patch(id)
        })
        .await
        .unwrap();
    assert_eq!(cleared.sku, None);

    // O SKU liberado pode ser usado por outro item
    let reused = with_sku(&ledger, "Gasas estériles", "GAS-01").await;
    assert_ne!(reused, id);
}
