//! Order lifecycle engine: maps gateway transaction reports onto the order's
//! `(payment_status, status)` pair and guards manual status changes.
//!
//! Every status source (webhook, client confirmation, admin console) funnels
//! through the two functions here, so an order converges to the same state no
//! matter which channel reports first.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::{OrderStatus, PaymentStatus};

/// Transaction outcome vocabulary used by the Midtrans notification payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Capture,
    Settlement,
    Pending,
    Deny,
    Cancel,
    Expire,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Capture => "capture",
            TransactionStatus::Settlement => "settlement",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Deny => "deny",
            TransactionStatus::Cancel => "cancel",
            TransactionStatus::Expire => "expire",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "capture" => Ok(TransactionStatus::Capture),
            "settlement" => Ok(TransactionStatus::Settlement),
            "pending" => Ok(TransactionStatus::Pending),
            "deny" => Ok(TransactionStatus::Deny),
            "cancel" => Ok(TransactionStatus::Cancel),
            "expire" => Ok(TransactionStatus::Expire),
            other => Err(AppError::Gateway(format!(
                "unrecognized transaction status: {other}"
            ))),
        }
    }
}

/// Fraud screening verdict attached to card captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FraudStatus {
    Accept,
    Challenge,
}

impl FromStr for FraudStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(FraudStatus::Accept),
            "challenge" => Ok(FraudStatus::Challenge),
            other => Err(AppError::Gateway(format!(
                "unrecognized fraud status: {other}"
            ))),
        }
    }
}

/// The `(payment_status, status)` pair a gateway report resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentResolution {
    pub payment: PaymentStatus,
    pub order: OrderStatus,
}

/// Map a gateway transaction report onto the order axes. Total over the
/// input space; the same report always resolves to the same pair.
///
/// A `challenge` verdict keeps the money in limbo until the gateway follows
/// up with a final notification, so both axes stay `pending`.
pub fn resolve(transaction: TransactionStatus, fraud: Option<FraudStatus>) -> PaymentResolution {
    match transaction {
        TransactionStatus::Capture | TransactionStatus::Settlement => {
            if fraud == Some(FraudStatus::Challenge) {
                PaymentResolution {
                    payment: PaymentStatus::Pending,
                    order: OrderStatus::Pending,
                }
            } else {
                PaymentResolution {
                    payment: PaymentStatus::Paid,
                    order: OrderStatus::Confirmed,
                }
            }
        }
        TransactionStatus::Pending => PaymentResolution {
            payment: PaymentStatus::Pending,
            order: OrderStatus::Pending,
        },
        TransactionStatus::Deny | TransactionStatus::Cancel | TransactionStatus::Expire => {
            PaymentResolution {
                payment: PaymentStatus::Failed,
                order: OrderStatus::Cancelled,
            }
        }
    }
}

/// Validate a manual (admin console) status change against the current order.
///
/// Forward-only along the fulfillment path, with `cancelled` reachable from
/// the two states where food has not gone to the kitchen yet. Confirming an
/// order by hand still requires the money to have actually moved.
pub fn validate_transition(
    current: OrderStatus,
    requested: OrderStatus,
    payment: PaymentStatus,
) -> Result<(), AppError> {
    use OrderStatus::*;

    let allowed = match (current, requested) {
        (Pending, Confirmed) => payment == PaymentStatus::Paid,
        (Confirmed, Preparing) => true,
        (Preparing, Ready) => true,
        (Ready, Completed) => true,
        (Pending, Cancelled) | (Confirmed, Cancelled) => true,
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: current,
            to: requested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_and_capture_resolve_to_paid_confirmed() {
        for transaction in [TransactionStatus::Capture, TransactionStatus::Settlement] {
            for fraud in [Some(FraudStatus::Accept), None] {
                let r = resolve(transaction, fraud);
                assert_eq!(r.payment, PaymentStatus::Paid);
                assert_eq!(r.order, OrderStatus::Confirmed);
            }
        }
    }

    #[test]
    fn challenge_keeps_both_axes_pending() {
        for transaction in [TransactionStatus::Capture, TransactionStatus::Settlement] {
            let r = resolve(transaction, Some(FraudStatus::Challenge));
            assert_eq!(r.payment, PaymentStatus::Pending);
            assert_eq!(r.order, OrderStatus::Pending);
        }
    }

    #[test]
    fn pending_transaction_stays_pending() {
        for fraud in [Some(FraudStatus::Accept), Some(FraudStatus::Challenge), None] {
            let r = resolve(TransactionStatus::Pending, fraud);
            assert_eq!(r.payment, PaymentStatus::Pending);
            assert_eq!(r.order, OrderStatus::Pending);
        }
    }

    #[test]
    fn failure_outcomes_resolve_to_failed_cancelled() {
        for transaction in [
            TransactionStatus::Deny,
            TransactionStatus::Cancel,
            TransactionStatus::Expire,
        ] {
            for fraud in [Some(FraudStatus::Accept), Some(FraudStatus::Challenge), None] {
                let r = resolve(transaction, fraud);
                assert_eq!(r.payment, PaymentStatus::Failed);
                assert_eq!(r.order, OrderStatus::Cancelled);
            }
        }
    }

    #[test]
    fn resolve_is_deterministic() {
        let a = resolve(TransactionStatus::Settlement, Some(FraudStatus::Accept));
        let b = resolve(TransactionStatus::Settlement, Some(FraudStatus::Accept));
        assert_eq!(a, b);
    }

    #[test]
    fn fulfillment_path_moves_forward_only() {
        use OrderStatus::*;

        assert!(validate_transition(Pending, Confirmed, PaymentStatus::Paid).is_ok());
        assert!(validate_transition(Confirmed, Preparing, PaymentStatus::Paid).is_ok());
        assert!(validate_transition(Preparing, Ready, PaymentStatus::Paid).is_ok());
        assert!(validate_transition(Ready, Completed, PaymentStatus::Paid).is_ok());

        assert!(matches!(
            validate_transition(Ready, Pending, PaymentStatus::Paid),
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(matches!(
            validate_transition(Pending, Completed, PaymentStatus::Paid),
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(matches!(
            validate_transition(Completed, Preparing, PaymentStatus::Paid),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn confirming_an_unpaid_order_is_rejected() {
        assert!(matches!(
            validate_transition(
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                PaymentStatus::Pending
            ),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn cancellation_is_reachable_before_preparation_only() {
        use OrderStatus::*;

        assert!(validate_transition(Pending, Cancelled, PaymentStatus::Pending).is_ok());
        assert!(validate_transition(Confirmed, Cancelled, PaymentStatus::Paid).is_ok());

        for current in [Preparing, Ready, Completed, Cancelled] {
            assert!(matches!(
                validate_transition(current, Cancelled, PaymentStatus::Paid),
                Err(AppError::InvalidTransition { .. })
            ));
        }
    }
}
