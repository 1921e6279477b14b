use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{
        CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest,
        UpsertVariantRequest, VariantList,
    },
    entity::{
        categories::Entity as Categories,
        product_variants::{
            ActiveModel as VariantActive, Column as VariantCol, Entity as ProductVariants,
            Model as VariantModel,
        },
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Product, ProductVariant},
    pricing::{self, BuyerClass},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

/// Public product listing: active products only, with the storefront's
/// search, category, price-range, on-sale and featured filters.
pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(Column::IsActive.eq(true));

    if let Some(category_id) = query.category {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if query.on_sale.unwrap_or(false) {
        condition = condition.add(Column::DiscountPercentage.gt(0));
    }

    if query.featured.unwrap_or(false) {
        condition = condition.add(Column::IsFeatured.eq(true));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let result = Products::find_by_id(id)
        .filter(Column::IsActive.eq(true))
        .find_also_related(Categories)
        .one(&state.orm)
        .await?;
    let (product, category) = match result {
        Some(pair) => pair,
        None => return Err(AppError::NotFound),
    };

    let final_price = pricing::unit_price(
        product.price,
        product.discount_percentage,
        BuyerClass::Retail,
    );

    let detail = ProductDetail {
        id: product.id,
        name: product.name,
        description: product.description,
        price: product.price,
        discount_percentage: product.discount_percentage,
        final_price: pricing::round_total(final_price),
        category_id: product.category_id,
        category_name: category.map(|c| c.name).unwrap_or_default(),
        is_active: product.is_active,
        is_featured: product.is_featured,
        created_at: product.created_at.with_timezone(&Utc),
    };

    Ok(ApiResponse::success("Product", detail, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_pricing_fields(&payload.price, payload.discount_percentage.as_ref())?;

    let category = Categories::find_by_id(payload.category_id)
        .one(&state.orm)
        .await?;
    if category.is_none() {
        return Err(AppError::BadRequest("category not found".into()));
    }

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        discount_percentage: Set(payload.discount_percentage.unwrap_or_default()),
        category_id: Set(payload.category_id),
        is_active: Set(true),
        is_featured: Set(payload.is_featured.unwrap_or(false)),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if let Some(price) = payload.price.as_ref() {
        validate_pricing_fields(price, payload.discount_percentage.as_ref())?;
    } else if let Some(discount) = payload.discount_percentage.as_ref() {
        validate_discount(discount)?;
    }

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    if let Some(category_id) = payload.category_id {
        let category = Categories::find_by_id(category_id).one(&state.orm).await?;
        if category.is_none() {
            return Err(AppError::BadRequest("category not found".into()));
        }
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(discount) = payload.discount_percentage {
        active.discount_percentage = Set(discount);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(is_featured) = payload.is_featured {
        active.is_featured = Set(is_featured);
    }

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Flip the active flag; hidden products drop out of the public listing
/// but keep their order history.
pub async fn toggle_product_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let next = !existing.is_active;
    let mut active: ActiveModel = existing.into();
    active.is_active = Set(next);
    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_toggle_status",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id, "is_active": product.is_active })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Status updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_variants(state: &AppState, id: Uuid) -> AppResult<ApiResponse<VariantList>> {
    let product = Products::find_by_id(id).one(&state.orm).await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    let items = ProductVariants::find()
        .filter(VariantCol::ProductId.eq(id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(variant_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Variants",
        VariantList { items },
        Some(Meta::empty()),
    ))
}

/// Create or update the (product, size, color) variant. This is the admin
/// restock path; the storefront only ever decrements stock through checkout.
pub async fn upsert_variant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpsertVariantRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;
    if payload.stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }

    let product = Products::find_by_id(id).one(&state.orm).await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    let existing = ProductVariants::find()
        .filter(VariantCol::ProductId.eq(id))
        .filter(VariantCol::SizeId.eq(payload.size_id))
        .filter(VariantCol::ColorId.eq(payload.color_id))
        .one(&state.orm)
        .await?;

    let variant = if let Some(existing) = existing {
        let mut active: VariantActive = existing.into();
        active.stock = Set(payload.stock);
        active.sku = Set(payload.sku);
        active.update(&state.orm).await?
    } else {
        VariantActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(id),
            size_id: Set(payload.size_id),
            color_id: Set(payload.color_id),
            stock: Set(payload.stock),
            sku: Set(payload.sku),
            created_at: NotSet,
        }
        .insert(&state.orm)
        .await?
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "variant_upsert",
        Some("product_variants"),
        Some(serde_json::json!({ "variant_id": variant.id, "stock": variant.stock })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Variant saved",
        variant_from_entity(variant),
        Some(Meta::empty()),
    ))
}

fn validate_pricing_fields(
    price: &rust_decimal::Decimal,
    discount: Option<&rust_decimal::Decimal>,
) -> Result<(), AppError> {
    if price.is_sign_negative() {
        return Err(AppError::BadRequest("price cannot be negative".into()));
    }
    if let Some(discount) = discount {
        validate_discount(discount)?;
    }
    Ok(())
}

fn validate_discount(discount: &rust_decimal::Decimal) -> Result<(), AppError> {
    use rust_decimal::Decimal;
    if *discount < Decimal::ZERO || *discount > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(
            "discount_percentage must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        discount_percentage: model.discount_percentage,
        category_id: model.category_id,
        is_active: model.is_active,
        is_featured: model.is_featured,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn variant_from_entity(model: VariantModel) -> ProductVariant {
    ProductVariant {
        id: model.id,
        product_id: model.product_id,
        size_id: model.size_id,
        color_id: model.color_id,
        stock: model.stock,
        sku: model.sku,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
