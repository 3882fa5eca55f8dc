use crate::{
    errors::ServiceError,
    services::{CatalogFilters, SortKey},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

/// Catalog listing query string. `genres` is comma-separated ids; `sort`
/// takes a field name with an optional `min_` prefix for ascending order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub genres: Option<String>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

impl CatalogQuery {
    pub fn filters(&self) -> Result<CatalogFilters, ServiceError> {
        let genres = match self.genres.as_deref() {
            None | Some("") => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    Uuid::parse_str(s).map_err(|_| {
                        ServiceError::ValidationError(format!("Invalid genre id: {}", s))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };

        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                return Err(ServiceError::ValidationError(
                    "price_min must not exceed price_max".to_string(),
                ));
            }
        }

        Ok(CatalogFilters {
            genres,
            price_min: self.price_min,
            price_max: self.price_max,
            date_min: self.date_min,
            date_max: self.date_max,
            search_word: self.search.clone().filter(|s| !s.is_empty()),
        })
    }

    pub fn sort_key(&self) -> Result<Option<SortKey>, ServiceError> {
        match self.sort.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => SortKey::parse(raw)
                .map(Some)
                .ok_or_else(|| ServiceError::ValidationError(format!("Unknown sort key: {}", raw))),
        }
    }
}

pub const CUSTOMER_HEADER: &str = "x-customer-id";

/// Customer identity forwarded by the gateway. Authentication itself happens
/// upstream; this service trusts the header.
#[derive(Debug, Clone, Copy)]
pub struct CustomerId(pub Uuid);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CustomerId {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CUSTOMER_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("Missing {} header", CUSTOMER_HEADER))
            })?;
        let id = Uuid::parse_str(raw).map_err(|_| {
            ServiceError::ValidationError(format!("Invalid {} header", CUSTOMER_HEADER))
        })?;
        Ok(CustomerId(id))
    }
}
