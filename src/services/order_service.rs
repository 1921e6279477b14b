use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use sea_orm::{ActiveModelTrait, DatabaseTransaction};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CheckoutRequest, CheckoutResponse, OrderItemSummary, OrderList, OrderSummary,
        OrderWithItems,
    },
    entity::{
        cart_items::{self, Column as CartCol, Entity as CartItems},
        colors::Column as ColorCol,
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        product_variants::{Column as VariantCol, Entity as ProductVariants},
        products::Column as ProdCol,
        sizes::Column as SizeCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, PaymentStatus},
    pricing,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

const MAX_ORDER_NUMBER_ATTEMPTS: usize = 10;

/// One cart row joined with the catalog data needed to price and verify it.
#[derive(Debug, FromQueryResult)]
struct CartLineRow {
    product_id: Uuid,
    size_id: Uuid,
    color_id: Uuid,
    quantity: i32,
    product_name: String,
    price: Decimal,
    discount_percentage: Decimal,
    size_name: String,
    color_name: String,
}

#[derive(Debug)]
struct OrderItemDraft {
    variant_id: Uuid,
    product_id: Uuid,
    product_name: String,
    size: String,
    color: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
}

/// Convert the user's cart into a persisted order.
///
/// The whole sequence runs in one transaction: load cart, verify each
/// variant's stock (rows locked for the duration), price each line, insert
/// the order and its items, decrement stock, clear the cart. Any error rolls
/// the transaction back, leaving the cart and all stock untouched.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let txn = state.orm.begin().await?;

    let lines = load_cart_lines(&txn, user.user_id).await?;
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let buyer_class = user.buyer_class();
    let mut subtotal = Decimal::ZERO;
    let mut drafts: Vec<OrderItemDraft> = Vec::with_capacity(lines.len());

    for line in &lines {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }

        // Lock the variant row so the stock we see stays valid until commit.
        let variant = ProductVariants::find()
            .filter(VariantCol::ProductId.eq(line.product_id))
            .filter(VariantCol::SizeId.eq(line.size_id))
            .filter(VariantCol::ColorId.eq(line.color_id))
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::VariantNotFound {
                product: line.product_name.clone(),
                size: line.size_name.clone(),
                color: line.color_name.clone(),
            })?;

        if variant.stock < line.quantity {
            tracing::warn!(
                user_id = %user.user_id,
                product_id = %line.product_id,
                requested = line.quantity,
                available = variant.stock,
                "checkout rejected: insufficient stock"
            );
            return Err(AppError::InsufficientStock {
                product: line.product_name.clone(),
                size: line.size_name.clone(),
                color: line.color_name.clone(),
                requested: line.quantity,
                available: variant.stock,
            });
        }

        let unit = pricing::unit_price(line.price, line.discount_percentage, buyer_class);
        let line_total = pricing::line_total(unit, line.quantity);
        subtotal += line_total;

        drafts.push(OrderItemDraft {
            variant_id: variant.id,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            size: line.size_name.clone(),
            color: line.color_name.clone(),
            quantity: line.quantity,
            unit_price: pricing::round_total(unit),
            total_price: pricing::round_total(line_total),
        });
    }

    let subtotal = pricing::round_total(subtotal);
    let discount_amount = Decimal::ZERO;
    let total = subtotal - discount_amount;

    let order_number = generate_unique_order_number(&txn).await?;

    let shipping_address = serde_json::to_value(&payload.shipping_address)
        .map_err(anyhow::Error::from)?;
    let billing_address = payload
        .billing_address
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(anyhow::Error::from)?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        order_number: Set(order_number),
        status: Set(OrderStatus::Pending.as_str().into()),
        subtotal: Set(subtotal),
        discount_amount: Set(discount_amount),
        total: Set(total),
        shipping_address: Set(shipping_address),
        billing_address: Set(billing_address),
        delivery_method: Set(payload.delivery_method.as_str().into()),
        payment_method: Set(payload.payment_method.as_str().into()),
        payment_status: Set(PaymentStatus::Pending.as_str().into()),
        customer_email: Set(payload.email),
        newsletter_consent: Set(payload.newsletter),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItemSummary> = Vec::with_capacity(drafts.len());

    for draft in &drafts {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(draft.product_id),
            size: Set(draft.size.clone()),
            color: Set(draft.color.clone()),
            quantity: Set(draft.quantity),
            unit_price: Set(draft.unit_price),
            total_price: Set(draft.total_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        items.push(OrderItemSummary {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
        });

        // Conditional decrement: refuses to take stock below zero even if
        // the earlier read somehow went stale.
        let result = ProductVariants::update_many()
            .col_expr(
                VariantCol::Stock,
                Expr::col(VariantCol::Stock).sub(draft.quantity),
            )
            .filter(VariantCol::Id.eq(draft.variant_id))
            .filter(VariantCol::Stock.gte(draft.quantity))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::InsufficientStock {
                product: draft.product_name.clone(),
                size: draft.size.clone(),
                color: draft.color.clone(),
                requested: draft.quantity,
                available: 0,
            });
        }
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        order_id = %order.id,
        order_number = %order.order_number,
        total = %order.total,
        "order created"
    );

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "order_number": order.order_number })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let summary = OrderSummary {
        id: order.id,
        order_number: order.order_number.clone(),
        status: order.status.clone(),
        total: order.total,
        payment_method: order.payment_method.clone(),
        payment_status: order.payment_status.clone(),
        created_at: order.created_at.with_timezone(&Utc),
    };

    Ok(ApiResponse::success(
        "Order created",
        CheckoutResponse {
            order: summary,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Order",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

async fn load_cart_lines(
    txn: &DatabaseTransaction,
    user_id: Uuid,
) -> AppResult<Vec<CartLineRow>> {
    let rows = CartItems::find()
        .select_only()
        .column_as(CartCol::ProductId, "product_id")
        .column_as(CartCol::SizeId, "size_id")
        .column_as(CartCol::ColorId, "color_id")
        .column_as(CartCol::Quantity, "quantity")
        .column_as(ProdCol::Name, "product_name")
        .column_as(ProdCol::Price, "price")
        .column_as(ProdCol::DiscountPercentage, "discount_percentage")
        .column_as(SizeCol::Name, "size_name")
        .column_as(ColorCol::Name, "color_name")
        .join(JoinType::InnerJoin, cart_items::Relation::Products.def())
        .join(JoinType::InnerJoin, cart_items::Relation::Sizes.def())
        .join(JoinType::InnerJoin, cart_items::Relation::Colors.def())
        .filter(CartCol::UserId.eq(user_id))
        .into_model::<CartLineRow>()
        .all(txn)
        .await?;
    Ok(rows)
}

/// Candidate order numbers combine a recent-timestamp tail with fresh UUID
/// entropy; collisions should not happen in practice, the retry bound is a
/// safety valve.
async fn generate_unique_order_number(txn: &DatabaseTransaction) -> AppResult<String> {
    for _ in 0..MAX_ORDER_NUMBER_ATTEMPTS {
        let candidate = generate_order_number();
        let exists = Orders::find()
            .filter(OrderCol::OrderNumber.eq(candidate.as_str()))
            .one(txn)
            .await?;
        if exists.is_none() {
            return Ok(candidate);
        }
    }
    Err(AppError::OrderNumberExhausted)
}

fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail = &millis[millis.len() - 6..];
    let entropy = Uuid::new_v4().simple().to_string();
    format!("DT-{}{}", tail, entropy[..6].to_uppercase())
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        order_number: model.order_number,
        status: model.status,
        subtotal: model.subtotal,
        discount_amount: model.discount_amount,
        total: model.total,
        shipping_address: model.shipping_address,
        billing_address: model.billing_address,
        delivery_method: model.delivery_method,
        payment_method: model.payment_method,
        payment_status: model.payment_status,
        customer_email: model.customer_email,
        newsletter_consent: model.newsletter_consent,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        size: model.size,
        color: model.color,
        quantity: model.quantity,
        unit_price: model.unit_price,
        total_price: model.total_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::generate_order_number;

    #[test]
    fn order_number_has_prefix_and_length() {
        let number = generate_order_number();
        assert!(number.starts_with("DT-"));
        // "DT-" + 6 timestamp digits + 6 entropy chars
        assert_eq!(number.len(), 15);
    }

    #[test]
    fn order_number_suffix_is_uppercase_hex() {
        let number = generate_order_number();
        let suffix = &number[9..];
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn consecutive_numbers_differ() {
        let a = generate_order_number();
        let b = generate_order_number();
        assert_ne!(a, b);
    }
}
