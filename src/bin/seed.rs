use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use rust_decimal::Decimal;
use uuid::Uuid;

use dulcetienda_api::{config::AppConfig, db::create_pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@dulcetienda.com", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "cliente@example.com", "cliente123", "cliente").await?;
    ensure_user(&pool, "mayorista@example.com", "mayorista123", "mayorista").await?;

    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = row {
        return Ok(id);
    }

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let category_id = upsert_category(pool, "Camisetas", "nuevo").await?;

    let sizes = [("S", 1), ("M", 2), ("L", 3), ("XL", 4)];
    let mut size_ids = Vec::new();
    for (name, sort_order) in sizes {
        size_ids.push(upsert_size(pool, name, sort_order).await?);
    }

    let colors = [("Negro", "#000000"), ("Blanco", "#FFFFFF"), ("Rojo", "#FF0000")];
    let mut color_ids = Vec::new();
    for (name, hex) in colors {
        color_ids.push(upsert_color(pool, name, hex).await?);
    }

    let products = [
        ("Basic Tee", Decimal::from(50000), Decimal::ZERO),
        ("Oversize Tee", Decimal::from(80000), Decimal::from(20)),
        ("Crop Top", Decimal::from(45000), Decimal::ZERO),
    ];

    for (name, price, discount) in products {
        let product_id = upsert_product(pool, name, price, discount, category_id).await?;
        for size_id in &size_ids {
            for color_id in &color_ids {
                sqlx::query(
                    r#"
                    INSERT INTO product_variants (id, product_id, size_id, color_id, stock)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (product_id, size_id, color_id) DO NOTHING
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(product_id)
                .bind(size_id)
                .bind(color_id)
                .bind(10)
                .execute(pool)
                .await?;
            }
        }
    }

    println!("Seeded catalog");
    Ok(())
}

async fn upsert_category(pool: &sqlx::PgPool, name: &str, kind: &str) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = row {
        return Ok(id);
    }
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO categories (id, name, kind) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(kind)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn upsert_size(pool: &sqlx::PgPool, name: &str, sort_order: i32) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM sizes WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = row {
        return Ok(id);
    }
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO sizes (id, name, sort_order) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(sort_order)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn upsert_color(pool: &sqlx::PgPool, name: &str, hex_code: &str) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM colors WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = row {
        return Ok(id);
    }
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO colors (id, name, hex_code) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(hex_code)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn upsert_product(
    pool: &sqlx::PgPool,
    name: &str,
    price: Decimal,
    discount: Decimal,
    category_id: Uuid,
) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = row {
        return Ok(id);
    }
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO products (id, name, description, price, discount_percentage, category_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(format!("{name} de la colección DulceTienda"))
    .bind(price)
    .bind(discount)
    .bind(category_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
