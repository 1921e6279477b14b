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
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartLineDto, CartList, UpdateCartItemRequest},
        catalog::{ColorList, CreateColorRequest, CreateSizeRequest, SizeList},
        categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
        favorites::{AddFavoriteRequest, FavoriteCheck, FavoriteProductList},
        orders::{
            Address, CheckoutRequest, CheckoutResponse, DeliveryMethod, OrderItemSummary,
            OrderList, OrderSummary, OrderWithItems, PaymentMethod, UpdateOrderStatusRequest,
            UpdatePaymentStatusRequest,
        },
        products::{
            CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest,
            UpsertVariantRequest, VariantList,
        },
    },
    models::{
        CartItem, Category, Color, Favorite, Order, OrderItem, OrderStatus, PaymentStatus,
        Product, ProductVariant, Size, User,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, catalog, categories, favorites, health, orders, params, products},
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
        products::create_product,
        products::update_product,
        products::toggle_product_status,
        products::delete_product,
        products::list_variants,
        products::upsert_variant,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::toggle_category_status,
        categories::delete_category,
        catalog::list_sizes,
        catalog::create_size,
        catalog::update_size,
        catalog::delete_size,
        catalog::list_colors,
        catalog::create_color,
        catalog::update_color,
        catalog::delete_color,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        favorites::check_favorite,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::update_payment_status,
        admin::list_low_stock,
        admin::get_stats
    ),
    components(
        schemas(
            User,
            Product,
            ProductVariant,
            Category,
            Size,
            Color,
            CartItem,
            Favorite,
            Order,
            OrderItem,
            OrderStatus,
            PaymentStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductDetail,
            ProductList,
            UpsertVariantRequest,
            VariantList,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            CreateSizeRequest,
            SizeList,
            CreateColorRequest,
            ColorList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartLineDto,
            CartList,
            AddFavoriteRequest,
            FavoriteProductList,
            FavoriteCheck,
            Address,
            DeliveryMethod,
            PaymentMethod,
            CheckoutRequest,
            CheckoutResponse,
            OrderSummary,
            OrderItemSummary,
            OrderList,
            OrderWithItems,
            UpdateOrderStatusRequest,
            UpdatePaymentStatusRequest,
            admin::LowStockQuery,
            admin::LowStockRow,
            admin::LowStockList,
            admin::DashboardStats,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CheckoutResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product and variant endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Catalog", description = "Size and color endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Favorites", description = "Favorite endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Admin", description = "Back-office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
