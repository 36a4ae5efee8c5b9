//! Account domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{deserialize_id, deserialize_optional_id};

/// A family account as returned by the account service.
///
/// The balance is owned by the service; it is only cached here for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub balance: Decimal,
    /// Owning user
    #[serde(deserialize_with = "deserialize_id")]
    pub user_id: String,
    /// Parent account, only set on child accounts
    #[serde(
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<String>,
    pub is_parent_account: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero balance
    pub fn new(id: impl Into<String>, name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            balance: Decimal::ZERO,
            user_id: user_id.into(),
            parent_id: None,
            is_parent_account: false,
            created_at: Utc::now(),
        }
    }

    /// Short label for the account kind
    pub fn kind_label(&self) -> &'static str {
        if self.is_parent_account {
            "Parent"
        } else {
            "Child"
        }
    }
}
