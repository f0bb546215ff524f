use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth as auth_dto,
        orders::{OrderList, OrderWithItems, TrackedItem, TrackedOrder},
        payment as payment_dto,
        products as products_dto,
    },
    gateway::SnapSession,
    lifecycle::{FraudStatus, TransactionStatus},
    models::{AdminUser, Order, OrderItem, OrderStatus, PaymentStatus, Product},
    response::{ApiResponse, Meta},
    routes::{admin, auth, health, orders, params, payment, products},
    vision::ExtractedProduct,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        products::list_products,
        products::get_product,
        orders::checkout,
        orders::track_order,
        payment::create_session,
        payment::webhook,
        payment::confirm,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::extract_product,
    ),
    components(
        schemas(
            AdminUser,
            Product,
            Order,
            OrderItem,
            OrderStatus,
            PaymentStatus,
            TransactionStatus,
            FraudStatus,
            SnapSession,
            ExtractedProduct,
            OrderList,
            OrderWithItems,
            TrackedItem,
            TrackedOrder,
            admin::UpdateOrderStatusRequest,
            auth_dto::RegisterRequest,
            auth_dto::LoginRequest,
            auth_dto::LoginResponse,
            payment_dto::CreatePaymentRequest,
            payment_dto::WebhookPayload,
            payment_dto::ClientOutcome,
            payment_dto::ClientResultRequest,
            payment_dto::WebhookAck,
            products_dto::CreateProductRequest,
            products_dto::UpdateProductRequest,
            products_dto::ProductList,
            params::Pagination,
            params::ProductListQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<TrackedOrder>,
            ApiResponse<SnapSession>,
            ApiResponse<ExtractedProduct>,
            ApiResponse<products_dto::ProductList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Menu catalog endpoints"),
        (name = "Orders", description = "Checkout and order tracking"),
        (name = "Payment", description = "Payment session, gateway webhook, client confirmation"),
        (name = "Admin", description = "Order lifecycle console and catalog management"),
        (name = "Auth", description = "Admin authentication"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
