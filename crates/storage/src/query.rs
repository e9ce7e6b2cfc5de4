use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest page number.
pub const FIRST_PAGE: u32 = 1;
/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 8;
/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Errors raised while building a [`BookListQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown sorting '{0}', expected one of popularity, latest, price_asc, price_desc")]
    UnknownSorting(String),

    #[error("page must be at least 1, got {0}")]
    InvalidPage(u32),

    #[error("limit must be between 1 and 100, got {0}")]
    InvalidPageSize(u32),
}

/// Ordering applied to catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSorting {
    /// Most purchased first.
    Popularity,
    /// Most recently added first.
    #[default]
    Latest,
    /// Cheapest effective price first.
    PriceAsc,
    /// Most expensive effective price first.
    PriceDesc,
}

impl BookSorting {
    pub const ALL: [BookSorting; 4] = [
        BookSorting::Popularity,
        BookSorting::Latest,
        BookSorting::PriceAsc,
        BookSorting::PriceDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookSorting::Popularity => "popularity",
            BookSorting::Latest => "latest",
            BookSorting::PriceAsc => "price_asc",
            BookSorting::PriceDesc => "price_desc",
        }
    }
}

impl std::fmt::Display for BookSorting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookSorting {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookSorting::ALL
            .into_iter()
            .find(|sorting| sorting.as_str() == s)
            .ok_or_else(|| QueryError::UnknownSorting(s.to_string()))
    }
}

/// A validated request for one page of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookListQuery {
    sorting: BookSorting,
    page: u32,
    page_size: u32,
}

impl BookListQuery {
    /// Builds a query, rejecting pages below 1 and sizes outside `1..=100`.
    pub fn new(sorting: BookSorting, page: u32, page_size: u32) -> Result<Self, QueryError> {
        if page < FIRST_PAGE {
            return Err(QueryError::InvalidPage(page));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(QueryError::InvalidPageSize(page_size));
        }
        Ok(Self {
            sorting,
            page,
            page_size,
        })
    }

    pub fn sorting(&self) -> BookSorting {
        self.sorting
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Number of pages needed to show `total_books`.
    pub fn total_pages(&self, total_books: u64) -> u64 {
        total_books.div_ceil(u64::from(self.page_size))
    }
}

impl Default for BookListQuery {
    fn default() -> Self {
        Self {
            sorting: BookSorting::default(),
            page: FIRST_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of books plus the counts needed to paginate.
#[derive(Debug, Clone)]
pub struct BookPage {
    pub books: Vec<crate::Book>,
    pub total_books: u64,
    pub total_pages: u64,
}
