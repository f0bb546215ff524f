use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::payment::{ClientOutcome, ClientResultRequest, CreatePaymentRequest, WebhookAck, WebhookPayload},
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    gateway::SnapSession,
    lifecycle::{self, PaymentResolution},
    models::{Order, PaymentStatus},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Open a hosted-checkout session for an order awaiting payment.
pub async fn create_session(
    state: &AppState,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<SnapSession>> {
    let order = Orders::find_by_id(payload.order_id)
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    if order.payment_status == PaymentStatus::Paid {
        return Err(AppError::BadRequest("Order already paid".into()));
    }

    let order: Order = order.into();
    let session = state.gateway.create_transaction(&order).await?;

    Ok(ApiResponse::success(
        "Payment session created",
        session,
        Some(Meta::empty()),
    ))
}

/// Gateway notification endpoint. Rejects unauthenticated payloads before
/// touching the order, then applies the mapped result idempotently. Storage
/// errors bubble up as 5xx so the gateway redelivers.
pub async fn handle_webhook(
    state: &AppState,
    payload: WebhookPayload,
) -> AppResult<ApiResponse<WebhookAck>> {
    let authentic = state.gateway.verify_signature(
        &payload.order_id.to_string(),
        payload.transaction_status.as_str(),
        &payload.signature_key,
    );
    if !authentic {
        tracing::warn!(order_id = %payload.order_id, "webhook signature mismatch");
        return Err(AppError::InvalidSignature);
    }

    let resolution = lifecycle::resolve(payload.transaction_status, payload.fraud_status);
    let applied =
        apply_gateway_result(state, payload.order_id, &payload.transaction_id, resolution).await?;

    if !applied {
        tracing::warn!(
            order_id = %payload.order_id,
            transaction_id = %payload.transaction_id,
            status = %payload.transaction_status,
            "stale gateway notification ignored"
        );
    }

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "payment_webhook",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": payload.order_id,
            "transaction_status": payload.transaction_status.as_str(),
            "applied": applied,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Webhook processed",
        WebhookAck { applied },
        Some(Meta::empty()),
    ))
}

/// Synchronous result reported by the in-browser payment widget. A `success`
/// report is never trusted at face value: the gateway's status API is queried
/// and whatever it asserts is applied through the same path as the webhook,
/// so both channels converge on the same persisted state. `pending`/`error`
/// reports change nothing; the webhook settles those later.
pub async fn confirm_client_result(
    state: &AppState,
    payload: ClientResultRequest,
) -> AppResult<ApiResponse<Order>> {
    let existing = Orders::find_by_id(payload.order_id)
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    match payload.outcome {
        ClientOutcome::Success => {
            let status = state.gateway.fetch_status(payload.order_id).await?;
            let resolution = lifecycle::resolve(status.transaction_status, status.fraud_status);
            let applied = apply_gateway_result(
                state,
                payload.order_id,
                &status.transaction_id,
                resolution,
            )
            .await?;

            if !applied {
                tracing::warn!(
                    order_id = %payload.order_id,
                    transaction_id = %status.transaction_id,
                    "client-reported result superseded by earlier state"
                );
            }

            if let Err(err) = log_audit(
                &state.pool,
                None,
                "payment_client_confirm",
                Some("orders"),
                Some(serde_json::json!({
                    "order_id": payload.order_id,
                    "transaction_id": status.transaction_id,
                    "applied": applied,
                })),
            )
            .await
            {
                tracing::warn!(error = %err, "audit log failed");
            }

            let order = Orders::find_by_id(payload.order_id)
                .one(&state.orm)
                .await?;
            let order = match order {
                Some(o) => o,
                None => return Err(AppError::NotFound),
            };

            Ok(ApiResponse::success(
                "Payment result recorded",
                order.into(),
                Some(Meta::empty()),
            ))
        }
        ClientOutcome::Pending | ClientOutcome::Error => Ok(ApiResponse::success(
            "Payment not settled",
            existing.into(),
            Some(Meta::empty()),
        )),
    }
}

/// Persist a resolved gateway report as one conditional update keyed by the
/// order id. The WHERE clause carries the two hard rules:
///
/// - `payment_id`, once written, only ever matches itself, so a notification
///   carrying a different transaction cannot reattribute the payment;
/// - a failure report never downgrades an order that is already paid (a late
///   `expire` after settlement is acknowledged but changes nothing).
///
/// Redelivering an identical notification rewrites identical values, which
/// makes the whole path idempotent. Returns whether a row was written; callers
/// treat `false` on an existing order as a stale event, not an error.
pub(crate) async fn apply_gateway_result(
    state: &AppState,
    order_id: Uuid,
    transaction_id: &str,
    resolution: PaymentResolution,
) -> AppResult<bool> {
    let exists = Orders::find_by_id(order_id).one(&state.orm).await?;
    if exists.is_none() {
        return Err(AppError::NotFound);
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut update = Orders::update_many()
        .col_expr(OrderCol::PaymentStatus, Expr::value(resolution.payment))
        .col_expr(OrderCol::Status, Expr::value(resolution.order))
        .col_expr(OrderCol::PaymentId, Expr::value(transaction_id.to_string()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(now))
        .filter(OrderCol::Id.eq(order_id))
        .filter(
            Condition::any()
                .add(OrderCol::PaymentId.is_null())
                .add(OrderCol::PaymentId.eq(transaction_id)),
        );

    if resolution.payment == PaymentStatus::Failed {
        update = update.filter(OrderCol::PaymentStatus.ne(PaymentStatus::Paid));
    }

    let result = update.exec(&state.orm).await?;
    Ok(result.rows_affected > 0)
}
