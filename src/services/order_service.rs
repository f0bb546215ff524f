use std::collections::HashMap;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CheckoutRequest, OrderWithItems, TrackedItem, TrackedOrder},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Entity as Orders},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::{OrderItem, OrderStatus, PaymentStatus},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Create an order and its line items from a storefront checkout.
///
/// Unit prices are read from the catalog inside the transaction and copied
/// onto the line items, so later price edits never rewrite order history. The
/// client-sent total is cross-checked against that sum and rejected on
/// mismatch. Order and items commit together or not at all.
pub async fn checkout(
    state: &AppState,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let customer_name = payload.customer_name.trim();
    let customer_email = payload.customer_email.trim();
    if customer_name.is_empty() {
        return Err(AppError::MissingFields("customer_name".into()));
    }
    if customer_email.is_empty() {
        return Err(AppError::MissingFields("customer_email".into()));
    }
    if payload.items.is_empty() {
        return Err(AppError::MissingFields("items".into()));
    }
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("quantity must be greater than 0".into()));
        }
    }

    let txn = state.orm.begin().await?;

    let product_ids: Vec<Uuid> = payload.items.iter().map(|i| i.product_id).collect();
    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut total_amount: i64 = 0;
    for item in &payload.items {
        let product = match products.get(&item.product_id) {
            Some(p) => p,
            None => {
                return Err(AppError::BadRequest(format!(
                    "unknown product {}",
                    item.product_id
                )));
            }
        };
        if !product.is_available {
            return Err(AppError::BadRequest(format!(
                "product {} is not available",
                product.name
            )));
        }
        total_amount += product.price * (item.quantity as i64);
    }

    if total_amount != payload.total_amount {
        return Err(AppError::BadRequest(
            "total_amount does not match catalog prices".into(),
        ));
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set(customer_name.to_string()),
        customer_email: Set(customer_email.to_string()),
        customer_phone: Set(payload.customer_phone.clone()),
        notes: Set(payload.notes.clone()),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending),
        payment_status: Set(PaymentStatus::Pending),
        payment_id: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::new();
    for item in &payload.items {
        let product = &products[&item.product_id];
        let inserted = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(item.quantity),
            price: Set(product.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        order_items.push(inserted.into());
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total_amount": total_amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: order.into(),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

/// Customer-facing tracking view: the order plus its line items with product
/// names joined in. Poll-driven; a read between two status writes is fine.
pub async fn track_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<TrackedOrder>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;

    let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let names: HashMap<Uuid, String> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let items = items
        .into_iter()
        .map(|item| TrackedItem {
            id: item.id,
            product_id: item.product_id,
            product_name: names
                .get(&item.product_id)
                .cloned()
                .unwrap_or_else(|| "Unknown item".to_string()),
            quantity: item.quantity,
            price: item.price,
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        TrackedOrder {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}
