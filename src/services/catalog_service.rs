use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::catalog::{
        ColorList, CreateColorRequest, CreateSizeRequest, SizeList, UpdateColorRequest,
        UpdateSizeRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Color, Size},
    response::{ApiResponse, Meta},
};

pub async fn list_sizes(pool: &DbPool) -> AppResult<ApiResponse<SizeList>> {
    let items = sqlx::query_as::<_, Size>("SELECT * FROM sizes ORDER BY sort_order, name")
        .fetch_all(pool)
        .await?;
    Ok(ApiResponse::success(
        "Sizes",
        SizeList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_size(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateSizeRequest,
) -> AppResult<ApiResponse<Size>> {
    ensure_admin(user)?;
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM sizes WHERE name = $1")
        .bind(payload.name.as_str())
        .fetch_optional(pool)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("size name already exists".into()));
    }

    let size = sqlx::query_as::<_, Size>(
        "INSERT INTO sizes (id, name, sort_order) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.name)
    .bind(payload.sort_order.unwrap_or(0))
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "size_create",
        Some("sizes"),
        Some(serde_json::json!({ "size_id": size.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Size created", size, Some(Meta::empty())))
}

pub async fn update_size(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateSizeRequest,
) -> AppResult<ApiResponse<Size>> {
    ensure_admin(user)?;
    let existing: Option<Size> = sqlx::query_as("SELECT * FROM sizes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let existing = match existing {
        Some(s) => s,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let sort_order = payload.sort_order.unwrap_or(existing.sort_order);

    let size = sqlx::query_as::<_, Size>(
        "UPDATE sizes SET name = $2, sort_order = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(sort_order)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Updated", size, Some(Meta::empty())))
}

/// Sizes referenced by variants cannot be deleted; order items are
/// unaffected either way because they snapshot the label.
pub async fn delete_size(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let in_use: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM product_variants WHERE size_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
    if in_use.0 > 0 {
        return Err(AppError::BadRequest("size is used by product variants".into()));
    }

    let result = sqlx::query("DELETE FROM sizes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_colors(pool: &DbPool) -> AppResult<ApiResponse<ColorList>> {
    let items = sqlx::query_as::<_, Color>("SELECT * FROM colors ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(ApiResponse::success(
        "Colors",
        ColorList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_color(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateColorRequest,
) -> AppResult<ApiResponse<Color>> {
    ensure_admin(user)?;
    validate_hex_code(&payload.hex_code)?;

    let exists: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM colors WHERE name = $1 OR hex_code = $2")
            .bind(payload.name.as_str())
            .bind(payload.hex_code.as_str())
            .fetch_optional(pool)
            .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest(
            "color name or hex code already exists".into(),
        ));
    }

    let color = sqlx::query_as::<_, Color>(
        "INSERT INTO colors (id, name, hex_code) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.name)
    .bind(payload.hex_code.to_uppercase())
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "color_create",
        Some("colors"),
        Some(serde_json::json!({ "color_id": color.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Color created", color, Some(Meta::empty())))
}

pub async fn update_color(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateColorRequest,
) -> AppResult<ApiResponse<Color>> {
    ensure_admin(user)?;
    if let Some(hex_code) = payload.hex_code.as_ref() {
        validate_hex_code(hex_code)?;
    }

    let existing: Option<Color> = sqlx::query_as("SELECT * FROM colors WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let name = payload.name.unwrap_or(existing.name);
    let hex_code = payload
        .hex_code
        .map(|h| h.to_uppercase())
        .unwrap_or(existing.hex_code);

    let color = sqlx::query_as::<_, Color>(
        "UPDATE colors SET name = $2, hex_code = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(hex_code)
    .fetch_one(pool)
    .await?;

    Ok(ApiResponse::success("Updated", color, Some(Meta::empty())))
}

pub async fn delete_color(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let in_use: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM product_variants WHERE color_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
    if in_use.0 > 0 {
        return Err(AppError::BadRequest("color is used by product variants".into()));
    }

    let result = sqlx::query("DELETE FROM colors WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn validate_hex_code(hex_code: &str) -> Result<(), AppError> {
    let valid = hex_code.len() == 7
        && hex_code.starts_with('#')
        && hex_code[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "hex_code must look like #RRGGBB".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::validate_hex_code;

    #[test]
    fn accepts_rgb_hex_codes() {
        assert!(validate_hex_code("#FFAA00").is_ok());
        assert!(validate_hex_code("#ffaa00").is_ok());
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(validate_hex_code("FFAA00").is_err());
        assert!(validate_hex_code("#FFAA0").is_err());
        assert!(validate_hex_code("#GGAA00").is_err());
        assert!(validate_hex_code("#FFAA001").is_err());
    }
}
