#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use clinic_inventory::{
    config::AppState,
    db::{InventoryStore, MemoryStore},
    models::{
        inventory::{Item, LedgerPosting},
        requests::{AddBatchRequest, CreateItemRequest},
    },
    services::InventoryService,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal literal")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Service + store em memória, sem HTTP.
pub struct Ledger {
    pub store: Arc<dyn InventoryStore>,
    pub service: InventoryService,
}

impl Ledger {
    pub fn new() -> Self {
        let store: Arc<dyn InventoryStore> = Arc::new(MemoryStore::new());
        let service = InventoryService::new(store.clone());
        Self { store, service }
    }

    pub async fn item(&self, name: &str) -> Item {
        let req: CreateItemRequest = serde_json::from_value(json!({
            "name": name,
            "unit_of_measure": "Unidad",
        }))
        .expect("item payload");
        self.service.create_item(req).await.expect("create item")
    }

    pub async fn batch(
        &self,
        item_id: Uuid,
        quantity: &str,
        expiration: Option<NaiveDate>,
    ) -> LedgerPosting {
        let req = AddBatchRequest {
            item_id,
            batch_number: None,
            expiration_date: expiration,
            quantity: dec(quantity),
            cost_per_unit: dec("1.5"),
            user_id: Some("tester".into()),
        };
        self.service.add_batch(req, today()).await.expect("add batch")
    }
}

/// Router completo sobre um `MemoryStore` novo.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::with_store(Arc::new(MemoryStore::new()));
        let router = clinic_inventory::app(state.clone());
        Self { router, state }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, action: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, &format!("/api/records?action={action}"), Some(body))
            .await
    }

    pub async fn delete(&self, query: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, &format!("/api/records?{query}"), None)
            .await
    }
}
