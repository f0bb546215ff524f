use axum::extract::Multipart;

use crate::{
    audit::log_audit,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    state::AppState,
    vision::ExtractedProduct,
};

/// Turn an uploaded menu photo into a product draft: host the image, then ask
/// the generative model for name/description/price/category. Nothing is
/// written to the catalog here; the admin reviews the draft first.
pub async fn extract_product(
    state: &AppState,
    user: &AuthUser,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<ExtractedProduct>> {
    ensure_admin(user)?;

    let mut image: Option<(Vec<u8>, String)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("image") {
            let content_type = field
                .content_type()
                .unwrap_or("image/jpeg")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            image = Some((bytes.to_vec(), content_type));
        }
    }

    let (bytes, content_type) = image.ok_or_else(|| AppError::MissingFields("image".into()))?;

    let image_url = state.vision.upload_image(bytes.clone(), &content_type).await?;
    tracing::debug!(image_url = %image_url, "menu image uploaded");

    let extracted = state
        .vision
        .describe_product(&bytes, &content_type, image_url)
        .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_extract",
        Some("products"),
        Some(serde_json::json!({ "name": extracted.name })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product extracted",
        extracted,
        Some(Meta::empty()),
    ))
}
