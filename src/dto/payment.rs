use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::lifecycle::{FraudStatus, TransactionStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
}

/// Asynchronous notification delivered by the payment gateway.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookPayload {
    pub order_id: Uuid,
    pub transaction_status: TransactionStatus,
    pub fraud_status: Option<FraudStatus>,
    pub transaction_id: String,
    pub signature_key: String,
}

/// Result reported by the embedded payment widget running in the customer's
/// browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientOutcome {
    Success,
    Pending,
    Error,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClientResultRequest {
    pub order_id: Uuid,
    pub outcome: ClientOutcome,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub applied: bool,
}
