use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Variant not found for {product} in size {size} and color {color}")]
    VariantNotFound {
        product: String,
        size: String,
        color: String,
    },

    #[error(
        "Insufficient stock for {product} ({size}/{color}). Available: {available}, requested: {requested}"
    )]
    InsufficientStock {
        product: String,
        size: String,
        color: String,
        requested: i32,
        available: i32,
    },

    #[error("Could not generate a unique order number")]
    OrderNumberExhausted,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::EmptyCart
            | AppError::VariantNotFound { .. }
            | AppError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::OrderNumberExhausted
            | AppError::DbError(_)
            | AppError::OrmError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ApiResponse::failure(
            self.to_string(),
            Some(ErrorData {
                error: self.to_string(),
            }),
        );

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_client_status() {
        let cases = [
            (AppError::EmptyCart, StatusCode::BAD_REQUEST),
            (
                AppError::VariantNotFound {
                    product: "Basic Tee".into(),
                    size: "M".into(),
                    color: "Black".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::InsufficientStock {
                    product: "Basic Tee".into(),
                    size: "M".into(),
                    color: "Black".into(),
                    requested: 5,
                    available: 3,
                },
                StatusCode::BAD_REQUEST,
            ),
            (AppError::OrderNumberExhausted, StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::Forbidden, StatusCode::FORBIDDEN),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn insufficient_stock_names_the_variant() {
        let err = AppError::InsufficientStock {
            product: "Basic Tee".into(),
            size: "M".into(),
            color: "Black".into(),
            requested: 5,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("Basic Tee"));
        assert!(msg.contains("Available: 3"));
        assert!(msg.contains("requested: 5"));
    }
}
