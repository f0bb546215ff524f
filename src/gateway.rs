use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    lifecycle::{FraudStatus, TransactionStatus},
    models::Order,
};

/// Gross-amount token the Snap dashboard signs notifications with.
const SIGNATURE_AMOUNT: &str = "200.00";

/// HTTP client for the Midtrans Snap API: hosted-checkout session creation,
/// transaction status lookup, and notification signature checks.
#[derive(Clone)]
pub struct MidtransClient {
    http: reqwest::Client,
    base_url: String,
    server_key: String,
}

/// Hosted-checkout session handed back to the storefront.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SnapSession {
    pub token: String,
    pub redirect_url: String,
}

/// Authoritative transaction state as reported by the gateway's status API.
#[derive(Debug, Clone)]
pub struct GatewayStatus {
    pub transaction_status: TransactionStatus,
    pub fraud_status: Option<FraudStatus>,
    pub transaction_id: String,
}

#[derive(Debug, Deserialize)]
struct SnapSessionResponse {
    token: Option<String>,
    redirect_url: Option<String>,
    error_messages: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TransactionStatusResponse {
    transaction_status: Option<String>,
    fraud_status: Option<String>,
    transaction_id: Option<String>,
    status_message: Option<String>,
}

impl MidtransClient {
    pub fn new(base_url: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            server_key: server_key.into(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Basic {}", BASE64.encode(format!("{}:", self.server_key)))
    }

    /// Digest the gateway computes over each notification:
    /// SHA-512 of `order_id + transaction_status + gross_amount + server_key`.
    pub fn expected_signature(&self, order_id: &str, transaction_status: &str) -> String {
        let mut hasher = Sha512::new();
        hasher.update(order_id.as_bytes());
        hasher.update(transaction_status.as_bytes());
        hasher.update(SIGNATURE_AMOUNT.as_bytes());
        hasher.update(self.server_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify_signature(
        &self,
        order_id: &str,
        transaction_status: &str,
        signature_key: &str,
    ) -> bool {
        self.expected_signature(order_id, transaction_status) == signature_key
    }

    /// Create a hosted-checkout session for an order.
    pub async fn create_transaction(&self, order: &Order) -> AppResult<SnapSession> {
        let body = serde_json::json!({
            "transaction_details": {
                "order_id": order.id,
                "gross_amount": order.total_amount,
            },
            "credit_card": { "secure": true },
            "customer_details": {
                "first_name": order.customer_name,
                "email": order.customer_email,
                "phone": order.customer_phone,
            },
            "item_details": [{
                "id": order.id,
                "price": order.total_amount,
                "quantity": 1,
                "name": "Warung Nusantara Order",
            }],
        });

        let response = self
            .http
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        let status = response.status();
        let payload: SnapSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        if !status.is_success() {
            let messages = payload
                .error_messages
                .unwrap_or_else(|| vec![format!("gateway returned {status}")]);
            return Err(AppError::Gateway(messages.join("; ")));
        }

        match (payload.token, payload.redirect_url) {
            (Some(token), Some(redirect_url)) => Ok(SnapSession {
                token,
                redirect_url,
            }),
            _ => Err(AppError::Gateway(
                "gateway response missing session token".into(),
            )),
        }
    }

    /// Query the gateway for the authoritative state of a transaction. Used
    /// before trusting any client-reported payment result.
    pub async fn fetch_status(&self, order_id: Uuid) -> AppResult<GatewayStatus> {
        let response = self
            .http
            .get(format!("{}/v2/{}/status", self.base_url, order_id))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        let status = response.status();
        let payload: TransactionStatusResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        if !status.is_success() {
            let message = payload
                .status_message
                .unwrap_or_else(|| format!("gateway returned {status}"));
            return Err(AppError::Gateway(message));
        }

        let transaction_status = payload
            .transaction_status
            .ok_or_else(|| AppError::Gateway("status response missing transaction_status".into()))?
            .parse()?;
        let fraud_status = payload
            .fraud_status
            .as_deref()
            .map(|s| s.parse::<FraudStatus>())
            .transpose()?;
        let transaction_id = payload
            .transaction_id
            .ok_or_else(|| AppError::Gateway("status response missing transaction_id".into()))?;

        Ok(GatewayStatus {
            transaction_status,
            fraud_status,
            transaction_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> MidtransClient {
        MidtransClient::new("https://app.sandbox.midtrans.com", "SB-Mid-server-test")
    }

    #[test]
    fn signature_matches_its_own_digest() {
        let client = test_client();
        let order_id = "f2b4f9e2-5c4e-4a21-9c16-0e6e6c7d1a11";
        let signature = client.expected_signature(order_id, "settlement");
        assert!(client.verify_signature(order_id, "settlement", &signature));
    }

    #[test]
    fn signature_rejects_other_status_or_key() {
        let client = test_client();
        let order_id = "f2b4f9e2-5c4e-4a21-9c16-0e6e6c7d1a11";
        let signature = client.expected_signature(order_id, "settlement");

        assert!(!client.verify_signature(order_id, "expire", &signature));

        let other = MidtransClient::new("https://app.sandbox.midtrans.com", "SB-Mid-server-other");
        assert!(!other.verify_signature(order_id, "settlement", &signature));
    }

    #[test]
    fn signature_is_hex_sha512() {
        let client = test_client();
        let signature = client.expected_signature("order-1", "pending");
        assert_eq!(signature.len(), 128);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
