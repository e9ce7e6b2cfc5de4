//! Catalog endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use domain::{BookDetails, MAX_PRICE_CENTS, MAX_QUANTITY};
use serde::Deserialize;
use storage::{
    BookId, BookListQuery, BookSorting, CategoryId, DEFAULT_PAGE_SIZE, Discount, FIRST_PAGE,
    Money, Store,
};

use crate::error::{ApiError, FieldErrors};
use crate::response::ApiResponse;
use crate::routes::covers::CoverRequest;
use crate::state::AppState;
use crate::validation::{Rules, Validate, ValidatedJson};
use crate::views::{BookPageView, BookView};

// -- Request types --

/// Editable book fields. `price` is in cents, `discount` a fraction.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookRequest {
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub price: i64,
    pub quantity: i32,
    pub discount: f64,
}

impl BookRequest {
    fn rules(&self) -> Rules {
        Rules::new()
            .required("title", &self.title)
            .not_blank("title", &self.title)
            .required("description", &self.description)
            .not_blank("description", &self.description)
            .min("categoryId", self.category_id, 1)
            .range("price", self.price, 0, MAX_PRICE_CENTS)
            .range("quantity", self.quantity, 0, MAX_QUANTITY)
            .range("discount", self.discount, 0.0, 1.0)
    }

    fn into_details(self) -> Result<BookDetails, ApiError> {
        let discount =
            Discount::new(self.discount).map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(BookDetails {
            title: self.title,
            description: self.description,
            category_id: CategoryId::new(self.category_id),
            price: Money::from_cents(self.price),
            quantity: self.quantity,
            discount,
        })
    }
}

impl Validate for BookRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        self.rules().finish()
    }
}

/// A new book with its cover.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBookRequest {
    #[serde(flatten)]
    pub book: BookRequest,
    pub cover: CoverRequest,
}

impl Validate for CreateBookRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        self.book
            .rules()
            .nested("cover", self.cover.validate())
            .finish()
    }
}

/// Query string of `GET /book`. Values arrive as text so that bad input is
/// answered with the regular error envelope.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub sorting: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListParams {
    fn into_query(self) -> Result<BookListQuery, ApiError> {
        let sorting = match self.sorting.as_deref() {
            Some(s) => s.parse::<BookSorting>()?,
            None => BookSorting::default(),
        };
        let page = parse_number("page", self.page, FIRST_PAGE)?;
        let limit = parse_number("limit", self.limit, DEFAULT_PAGE_SIZE)?;
        Ok(BookListQuery::new(sorting, page, limit)?)
    }
}

fn parse_number(name: &str, value: Option<String>, default: u32) -> Result<u32, ApiError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("{name} must be a positive integer"))),
    }
}

// -- Handlers --

/// POST /book
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    ValidatedJson(req): ValidatedJson<CreateBookRequest>,
) -> Result<ApiResponse<BookView>, ApiError> {
    let cover = req.cover.into_image()?;
    let details = req.book.into_details()?;
    let book = state.catalog.create_book(details, cover).await?;
    Ok(ApiResponse::created("book created successfully", book.into()))
}

/// GET /book?sorting=&page=&limit=
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<ApiResponse<BookPageView>, ApiError> {
    let query = params.into_query()?;
    let page = state.catalog.list_books(query).await?;
    Ok(ApiResponse::ok(
        "books retrieved successfully",
        BookPageView::new(page, query.page(), query.page_size()),
    ))
}

/// GET /book/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<BookView>, ApiError> {
    let book = state.catalog.get_book(BookId::new(id)).await?;
    Ok(ApiResponse::ok("book found", book.into()))
}

/// PUT /book/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<BookRequest>,
) -> Result<ApiResponse<BookView>, ApiError> {
    let book = state
        .catalog
        .update_book(BookId::new(id), req.into_details()?)
        .await?;
    Ok(ApiResponse::ok("book updated successfully", book.into()))
}

/// DELETE /book/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    state.catalog.delete_book(BookId::new(id)).await?;
    Ok(ApiResponse::message("book deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(sorting: Option<&str>, page: Option<&str>, limit: Option<&str>) -> ListParams {
        ListParams {
            sorting: sorting.map(str::to_string),
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn defaults_to_latest_first_page() {
        let query = params(None, None, None).into_query().unwrap();
        assert_eq!(query.sorting(), BookSorting::Latest);
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), 8);
    }

    #[test]
    fn parses_every_field() {
        let query = params(Some("price_asc"), Some("2"), Some("10"))
            .into_query()
            .unwrap();
        assert_eq!(query.sorting(), BookSorting::PriceAsc);
        assert_eq!(query.offset(), 10);
    }

    #[test]
    fn rejects_bad_values() {
        for bad in [
            params(Some("cheapest"), None, None),
            params(None, Some("0"), None),
            params(None, Some("-1"), None),
            params(None, None, Some("101")),
            params(None, None, Some("ten")),
        ] {
            assert!(matches!(bad.into_query(), Err(ApiError::BadRequest(_))));
        }
    }

    #[test]
    fn create_request_nests_cover_errors() {
        let req: CreateBookRequest = serde_json::from_value(serde_json::json!({
            "title": "Dune",
            "description": "Spice",
            "categoryId": 1,
            "price": 2000,
            "quantity": 3,
            "discount": 0.1,
            "cover": { "encoding": "image/gif", "content": "aGk=" }
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("cover.encoding"));
    }

    #[test]
    fn rejects_price_and_quantity_beyond_caps() {
        let req: BookRequest = serde_json::from_value(serde_json::json!({
            "title": "Dune",
            "description": "Spice",
            "categoryId": 1,
            "price": 5_000_000_000_000_000_000_i64,
            "quantity": i32::MAX,
            "discount": 0.0
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert_eq!(
            errors["price"],
            format!("must be between 0 and {MAX_PRICE_CENTS}")
        );
        assert_eq!(
            errors["quantity"],
            format!("must be between 0 and {MAX_QUANTITY}")
        );
    }
}
