// src/services/expiry.rs

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ExpiryStatus {
    Expired,
    ExpiringSoon,
    Upcoming,
    Valid,
}

pub const EXPIRING_SOON_DAYS: i64 = 30;
pub const UPCOMING_DAYS: i64 = 90;

/// Dias inteiros entre hoje e a data de validade (negativo = já venceu).
/// Só datas, sem horário, para não sofrer com fuso/meia-noite.
pub fn days_until(expiration_date: NaiveDate, today: NaiveDate) -> i64 {
    (expiration_date - today).num_days()
}

pub fn classify_expiry(expiration_date: NaiveDate, today: NaiveDate) -> ExpiryStatus {
    let days = days_until(expiration_date, today);
    if days < 0 {
        ExpiryStatus::Expired
    } else if days < EXPIRING_SOON_DAYS {
        ExpiryStatus::ExpiringSoon
    } else if days < UPCOMING_DAYS {
        ExpiryStatus::Upcoming
    } else {
        ExpiryStatus::Valid
    }
}
