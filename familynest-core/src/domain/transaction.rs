//! Transaction domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::deserialize_id;

/// A movement of money on an account. Positive amounts are deposits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub account_id: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        account_id: impl Into<String>,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            description: description.into(),
            account_id: account_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_deposit(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }
}
