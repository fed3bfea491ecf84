//! Typed payloads for the account's embedded-JSON endpoints.

use serde::{Deserialize, Serialize};

/// Profile data from the account management endpoint.
///
/// A payload without a user id is treated as unavailable, so the field is
/// required; everything else is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default, rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, rename = "lastName")]
    pub last_name: Option<String>,
    #[serde(default, rename = "emailAddress")]
    pub email_address: Option<String>,
    #[serde(default, rename = "loyaltyCardNumber")]
    pub loyalty_card_number: Option<String>,
}

/// Points summary: one entry per rewards program, in the order the
/// endpoint lists them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointsSummary {
    pub programs: Vec<ProgramPoints>,
}

impl PointsSummary {
    /// Balance of the first listed program, when present.
    pub fn primary_balance(&self) -> Option<i64> {
        self.programs
            .first()
            .and_then(|p| p.program_balance.as_ref())
            .map(|b| b.balance)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramPoints {
    #[serde(default, rename = "programName")]
    pub program_name: Option<String>,
    #[serde(default, rename = "programBalance")]
    pub program_balance: Option<ProgramBalance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramBalance {
    pub balance: i64,
}

/// Purchases summary: one entry per receipt, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchasesSummary {
    pub receipts: Vec<ReceiptSummary>,
}

impl PurchasesSummary {
    pub fn receipt_count(&self) -> usize {
        self.receipts.len()
    }
}

/// One purchase from the receipt summary endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptSummary {
    #[serde(default, rename = "receiptId")]
    pub receipt_id: Option<String>,
    #[serde(default, rename = "transactionDate")]
    pub transaction_date: Option<String>,
    #[serde(default, rename = "transactionTime")]
    pub transaction_time: Option<String>,
    #[serde(default, rename = "transactionTotal")]
    pub transaction_total: Option<f64>,
    #[serde(default, rename = "totalItems")]
    pub total_items: Option<i64>,
}
