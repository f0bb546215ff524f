use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::payment::{ClientResultRequest, CreatePaymentRequest, WebhookAck, WebhookPayload},
    error::AppResult,
    gateway::SnapSession,
    models::Order,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_session))
        .route("/webhook", post(webhook))
        .route("/confirm", post(confirm))
}

#[utoipa::path(
    post,
    path = "/api/payment/create",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Hosted checkout session", body = ApiResponse<SnapSession>),
        (status = 400, description = "Order already paid"),
        (status = 404, description = "Not Found"),
        (status = 502, description = "Gateway error"),
    ),
    tag = "Payment"
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Json<ApiResponse<SnapSession>>> {
    let resp = payment_service::create_session(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payment/webhook",
    request_body = WebhookPayload,
    responses(
        (status = 200, description = "Notification processed", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Invalid signature"),
        (status = 404, description = "Not Found"),
        (status = 500, description = "Storage failure, gateway should retry"),
    ),
    tag = "Payment"
)]
pub async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let resp = payment_service::handle_webhook(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payment/confirm",
    request_body = ClientResultRequest,
    responses(
        (status = 200, description = "Order after reconciling the client-reported result", body = ApiResponse<Order>),
        (status = 404, description = "Not Found"),
        (status = 502, description = "Gateway status lookup failed"),
    ),
    tag = "Payment"
)]
pub async fn confirm(
    State(state): State<AppState>,
    Json(payload): Json<ClientResultRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = payment_service::confirm_client_result(&state, payload).await?;
    Ok(Json(resp))
}
