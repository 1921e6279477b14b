use rust_decimal::Decimal;
use uuid::Uuid;

use dulcetienda_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        cart::AddToCartRequest,
        orders::{Address, CheckoutRequest, DeliveryMethod, PaymentMethod, UpdateOrderStatusRequest},
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{OrderListQuery, Pagination},
    services::{admin_service, cart_service, order_service},
    state::AppState,
};

// Integration flow tests run against a real database. Each test creates its
// own users and catalog rows (unique names via UUID suffixes) so they can run
// in parallel without truncating shared tables.

struct TestCatalog {
    product_id: Uuid,
    size_id: Uuid,
    color_id: Uuid,
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    Ok(Some(AppState { pool, orm }))
}

async fn create_user(state: &AppState, role: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(format!("{role}-{id}@example.com"))
    .bind("dummy")
    .bind(role)
    .execute(&state.pool)
    .await?;

    Ok(AuthUser {
        user_id: id,
        role: role.into(),
    })
}

async fn create_catalog(
    state: &AppState,
    price: Decimal,
    discount: Decimal,
    stock: i32,
) -> anyhow::Result<TestCatalog> {
    let tag = Uuid::new_v4();

    let category_id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
        .bind(category_id)
        .bind(format!("Category {tag}"))
        .execute(&state.pool)
        .await?;

    let size_id = Uuid::new_v4();
    sqlx::query("INSERT INTO sizes (id, name) VALUES ($1, $2)")
        .bind(size_id)
        .bind(format!("M-{tag}"))
        .execute(&state.pool)
        .await?;

    let color_id = Uuid::new_v4();
    sqlx::query("INSERT INTO colors (id, name, hex_code) VALUES ($1, $2, $3)")
        .bind(color_id)
        .bind(format!("Black-{tag}"))
        .bind(format!("#{:06X}", tag.as_fields().0 & 0xFFFFFF))
        .execute(&state.pool)
        .await?;

    let product_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO products (id, name, price, discount_percentage, category_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(product_id)
    .bind(format!("Basic Tee {tag}"))
    .bind(price)
    .bind(discount)
    .bind(category_id)
    .execute(&state.pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO product_variants (id, product_id, size_id, color_id, stock)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(size_id)
    .bind(color_id)
    .bind(stock)
    .execute(&state.pool)
    .await?;

    Ok(TestCatalog {
        product_id,
        size_id,
        color_id,
    })
}

async fn variant_stock(state: &AppState, catalog: &TestCatalog) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as(
        "SELECT stock FROM product_variants WHERE product_id = $1 AND size_id = $2 AND color_id = $3",
    )
    .bind(catalog.product_id)
    .bind(catalog.size_id)
    .bind(catalog.color_id)
    .fetch_one(&state.pool)
    .await?;
    Ok(stock)
}

async fn order_count(state: &AppState, user: &AuthUser) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(count)
}

fn checkout_request() -> CheckoutRequest {
    CheckoutRequest {
        email: "buyer@example.com".into(),
        newsletter: false,
        shipping_address: Address {
            country: "Colombia".into(),
            first_name: "Ana".into(),
            last_name: "García".into(),
            document: "1012345678".into(),
            address: "Calle 10 # 5-51".into(),
            address_details: None,
            city: "Bogotá".into(),
            department: "Cundinamarca".into(),
            postal_code: Some("110111".into()),
            phone: "3001234567".into(),
        },
        billing_address: None,
        delivery_method: DeliveryMethod::Shipping,
        payment_method: PaymentMethod::Pse,
    }
}

#[tokio::test]
async fn checkout_creates_order_decrements_stock_and_clears_cart() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let user = create_user(&state, "cliente").await?;
    let catalog = create_catalog(&state, Decimal::from(50000), Decimal::ZERO, 10).await?;

    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: catalog.product_id,
            size_id: catalog.size_id,
            color_id: catalog.color_id,
            quantity: 2,
        },
    )
    .await?;

    let resp = order_service::checkout(&state, &user, checkout_request()).await?;
    let data = resp.data.unwrap();

    assert!(data.order.order_number.starts_with("DT-"));
    assert_eq!(data.order.status, "pending");
    assert_eq!(data.order.payment_status, "pending");
    assert_eq!(data.order.total, Decimal::from(100000));
    assert_eq!(data.items.len(), 1);
    assert_eq!(data.items[0].unit_price, Decimal::from(50000));
    assert_eq!(data.items[0].total_price, Decimal::from(100000));

    assert_eq!(variant_stock(&state, &catalog).await?, 8);

    let cart = cart_service::list_cart(&state.pool, &user).await?;
    assert!(cart.data.unwrap().items.is_empty());

    // The persisted order is visible through the user listing.
    let orders = order_service::list_orders(
        &state,
        &user,
        OrderListQuery {
            pagination: Pagination {
                page: Some(1),
                per_page: Some(10),
            },
            status: None,
            sort_order: None,
        },
    )
    .await?;
    assert_eq!(orders.data.unwrap().items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn discounted_product_prices_the_same_for_both_buyer_classes() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    for role in ["cliente", "mayorista"] {
        let user = create_user(&state, role).await?;
        let catalog = create_catalog(&state, Decimal::from(80000), Decimal::from(20), 10).await?;

        cart_service::add_to_cart(
            &state.pool,
            &user,
            AddToCartRequest {
                product_id: catalog.product_id,
                size_id: catalog.size_id,
                color_id: catalog.color_id,
                quantity: 1,
            },
        )
        .await?;

        let resp = order_service::checkout(&state, &user, checkout_request()).await?;
        let data = resp.data.unwrap();
        assert_eq!(data.items[0].unit_price, Decimal::from(64000));
        assert_eq!(data.order.total, Decimal::from(64000));
    }

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_rolls_back_everything() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let user = create_user(&state, "cliente").await?;
    let catalog = create_catalog(&state, Decimal::from(50000), Decimal::ZERO, 3).await?;

    // Put 3 in the cart while stock allows it, then shrink the stock so the
    // checkout-time verification fails.
    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: catalog.product_id,
            size_id: catalog.size_id,
            color_id: catalog.color_id,
            quantity: 3,
        },
    )
    .await?;
    sqlx::query("UPDATE product_variants SET stock = 2 WHERE product_id = $1")
        .bind(catalog.product_id)
        .execute(&state.pool)
        .await?;

    let err = order_service::checkout(&state, &user, checkout_request())
        .await
        .unwrap_err();
    match err {
        AppError::InsufficientStock {
            requested,
            available,
            ..
        } => {
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // No order, no stock change, cart intact.
    assert_eq!(order_count(&state, &user).await?, 0);
    assert_eq!(variant_stock(&state, &catalog).await?, 2);
    let cart = cart_service::list_cart(&state.pool, &user).await?;
    assert_eq!(cart.data.unwrap().items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn empty_cart_fails_fast_without_side_effects() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let user = create_user(&state, "cliente").await?;

    let err = order_service::checkout(&state, &user, checkout_request())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));
    assert_eq!(order_count(&state, &user).await?, 0);

    Ok(())
}

#[tokio::test]
async fn clearing_an_empty_cart_is_idempotent() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let user = create_user(&state, "cliente").await?;
    cart_service::clear_cart(&state.pool, &user).await?;
    cart_service::clear_cart(&state.pool, &user).await?;

    Ok(())
}

#[tokio::test]
async fn adding_same_variant_twice_merges_the_cart_line() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let user = create_user(&state, "cliente").await?;
    let catalog = create_catalog(&state, Decimal::from(45000), Decimal::ZERO, 10).await?;

    for _ in 0..2 {
        cart_service::add_to_cart(
            &state.pool,
            &user,
            AddToCartRequest {
                product_id: catalog.product_id,
                size_id: catalog.size_id,
                color_id: catalog.color_id,
                quantity: 2,
            },
        )
        .await?;
    }

    let cart = cart_service::list_cart(&state.pool, &user).await?;
    let cart = cart.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 4);

    Ok(())
}

#[tokio::test]
async fn concurrent_checkouts_on_last_unit_let_exactly_one_through() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let catalog = create_catalog(&state, Decimal::from(50000), Decimal::ZERO, 1).await?;
    let buyer_a = create_user(&state, "cliente").await?;
    let buyer_b = create_user(&state, "cliente").await?;

    for buyer in [&buyer_a, &buyer_b] {
        cart_service::add_to_cart(
            &state.pool,
            buyer,
            AddToCartRequest {
                product_id: catalog.product_id,
                size_id: catalog.size_id,
                color_id: catalog.color_id,
                quantity: 1,
            },
        )
        .await?;
    }

    let state_a = state.clone();
    let state_b = state.clone();
    let user_a = buyer_a.clone();
    let user_b = buyer_b.clone();
    let (result_a, result_b) = tokio::join!(
        tokio::spawn(async move {
            order_service::checkout(&state_a, &user_a, checkout_request()).await
        }),
        tokio::spawn(async move {
            order_service::checkout(&state_b, &user_b, checkout_request()).await
        }),
    );
    let result_a = result_a?;
    let result_b = result_b?;

    let successes = [&result_a, &result_b]
        .iter()
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(successes, 1, "exactly one checkout must win the last unit");

    let loser = if result_a.is_ok() { result_b } else { result_a };
    assert!(matches!(
        loser.unwrap_err(),
        AppError::InsufficientStock { .. }
    ));

    assert_eq!(variant_stock(&state, &catalog).await?, 0);

    Ok(())
}

#[tokio::test]
async fn admin_moves_orders_along_the_status_chain() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let user = create_user(&state, "cliente").await?;
    let admin = create_user(&state, "admin").await?;
    let catalog = create_catalog(&state, Decimal::from(50000), Decimal::ZERO, 5).await?;

    cart_service::add_to_cart(
        &state.pool,
        &user,
        AddToCartRequest {
            product_id: catalog.product_id,
            size_id: catalog.size_id,
            color_id: catalog.color_id,
            quantity: 1,
        },
    )
    .await?;
    let resp = order_service::checkout(&state, &user, checkout_request()).await?;
    let order_id = resp.data.unwrap().order.id;

    // Skipping straight to shipped is rejected.
    let err = admin_service::update_order_status(
        &state,
        &admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    for next in ["confirmed", "processing", "shipped", "delivered"] {
        let updated = admin_service::update_order_status(
            &state,
            &admin,
            order_id,
            UpdateOrderStatusRequest {
                status: next.into(),
            },
        )
        .await?;
        assert_eq!(updated.data.unwrap().status, next);
    }

    // Delivered is terminal.
    let err = admin_service::update_order_status(
        &state,
        &admin,
        order_id,
        UpdateOrderStatusRequest {
            status: "cancelled".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}
