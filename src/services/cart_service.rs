use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartLineDto, CartList, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    pricing,
    response::{ApiResponse, Meta},
};

#[derive(FromRow)]
struct CartJoinedRow {
    id: Uuid,
    product_id: Uuid,
    product_name: String,
    size_id: Uuid,
    size_name: String,
    color_id: Uuid,
    color_name: String,
    quantity: i32,
    price: Decimal,
    discount_percentage: Decimal,
}

/// The cart listing is read-only: rows joined with product, size and color
/// names, priced for the requesting buyer.
pub async fn list_cart(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let rows = sqlx::query_as::<_, CartJoinedRow>(
        r#"
        SELECT ci.id, ci.product_id, p.name AS product_name,
               ci.size_id, s.name AS size_name,
               ci.color_id, c.name AS color_name,
               ci.quantity, p.price, p.discount_percentage
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        JOIN sizes s ON s.id = ci.size_id
        JOIN colors c ON c.id = ci.color_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(pool)
    .await?;

    let buyer_class = user.buyer_class();
    let mut total = Decimal::ZERO;
    let items: Vec<CartLineDto> = rows
        .into_iter()
        .map(|row| {
            let unit = pricing::unit_price(row.price, row.discount_percentage, buyer_class);
            let line_total = pricing::line_total(unit, row.quantity);
            total += line_total;
            CartLineDto {
                id: row.id,
                product_id: row.product_id,
                product_name: row.product_name,
                size_id: row.size_id,
                size: row.size_name,
                color_id: row.color_id,
                color: row.color_name,
                quantity: row.quantity,
                unit_price: pricing::round_total(unit),
                total_price: pricing::round_total(line_total),
            }
        })
        .collect();

    let data = CartList {
        items,
        total: pricing::round_total(total),
    };

    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// Adding an existing (product, size, color) combination increases the
/// quantity of the existing row instead of duplicating it.
pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product: Option<(String, bool)> =
        sqlx::query_as("SELECT name, is_active FROM products WHERE id = $1")
            .bind(payload.product_id)
            .fetch_optional(pool)
            .await?;
    let (product_name, is_active) = match product {
        Some(p) => p,
        None => return Err(AppError::BadRequest("product not found".to_string())),
    };
    if !is_active {
        return Err(AppError::BadRequest("product is not available".to_string()));
    }

    let size_name: Option<(String,)> = sqlx::query_as("SELECT name FROM sizes WHERE id = $1")
        .bind(payload.size_id)
        .fetch_optional(pool)
        .await?;
    let size_name = match size_name {
        Some((n,)) => n,
        None => return Err(AppError::BadRequest("size not found".to_string())),
    };

    let color_name: Option<(String,)> = sqlx::query_as("SELECT name FROM colors WHERE id = $1")
        .bind(payload.color_id)
        .fetch_optional(pool)
        .await?;
    let color_name = match color_name {
        Some((n,)) => n,
        None => return Err(AppError::BadRequest("color not found".to_string())),
    };

    let variant: Option<(Uuid, i32)> = sqlx::query_as(
        "SELECT id, stock FROM product_variants WHERE product_id = $1 AND size_id = $2 AND color_id = $3",
    )
    .bind(payload.product_id)
    .bind(payload.size_id)
    .bind(payload.color_id)
    .fetch_optional(pool)
    .await?;
    let (_, stock) = match variant {
        Some(v) => v,
        None => {
            return Err(AppError::VariantNotFound {
                product: product_name,
                size: size_name,
                color: color_name,
            });
        }
    };

    let existing: Option<CartItem> = sqlx::query_as(
        "SELECT * FROM cart_items WHERE user_id = $1 AND product_id = $2 AND size_id = $3 AND color_id = $4",
    )
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.size_id)
    .bind(payload.color_id)
    .fetch_optional(pool)
    .await?;

    let new_quantity = existing.as_ref().map_or(payload.quantity, |item| {
        item.quantity + payload.quantity
    });

    if stock < new_quantity {
        return Err(AppError::InsufficientStock {
            product: product_name,
            size: size_name,
            color: color_name,
            requested: new_quantity,
            available: stock,
        });
    }

    let cart_item = if let Some(item) = existing {
        sqlx::query_as::<_, CartItem>(
            r#"
            UPDATE cart_items
            SET quantity = $3
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(item.id)
        .bind(user.user_id)
        .bind(new_quantity)
        .fetch_one(pool)
        .await?
    } else {
        sqlx::query_as(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, size_id, color_id, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.user_id)
        .bind(payload.product_id)
        .bind(payload.size_id)
        .bind(payload.color_id)
        .bind(payload.quantity)
        .fetch_one(pool)
        .await?
    };

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({
            "product_id": payload.product_id,
            "size_id": payload.size_id,
            "color_id": payload.color_id,
            "quantity": new_quantity
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_item, None))
}

pub async fn update_cart_item(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let existing: Option<CartItem> =
        sqlx::query_as("SELECT * FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.user_id)
            .fetch_optional(pool)
            .await?;
    let existing = match existing {
        Some(item) => item,
        None => return Err(AppError::NotFound),
    };

    let stock: Option<(i32,)> = sqlx::query_as(
        "SELECT stock FROM product_variants WHERE product_id = $1 AND size_id = $2 AND color_id = $3",
    )
    .bind(existing.product_id)
    .bind(existing.size_id)
    .bind(existing.color_id)
    .fetch_optional(pool)
    .await?;
    let available = stock.map_or(0, |(s,)| s);

    if available < payload.quantity {
        return Err(AppError::BadRequest(format!(
            "Insufficient stock. Available: {available}, requested: {}",
            payload.quantity
        )));
    }

    let cart_item = sqlx::query_as::<_, CartItem>(
        r#"
        UPDATE cart_items
        SET quantity = $3
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user.user_id)
    .bind(payload.quantity)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Quantity updated", cart_item, None))
}

pub async fn remove_from_cart(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "cart_item_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Idempotent: clearing an already-empty cart succeeds.
pub async fn clear_cart(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
