use crate::{
    entities::{book, book_genre, favorite, Book},
    errors::ServiceError,
};
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::sea_query::{Expr, Func, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

const HOME_SLICE_LIMIT: u64 = 15;

/// Optional catalog filters, AND-combined. Raw request strings are coerced by
/// the handlers before they reach the builder; everything here is well typed.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilters {
    /// Book must belong to every listed genre (intersection, not union).
    pub genres: Vec<Uuid>,
    /// Bounds on the effective (post-discount) price, inclusive.
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    /// Bounds on the creation date, inclusive.
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
    /// Case-insensitive substring match on name OR author OR description.
    pub search_word: Option<String>,
}

impl CatalogFilters {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.date_min.is_none()
            && self.date_max.is_none()
            && self.search_word.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    PurchaseCount,
    /// Effective price, post-discount.
    Price,
    Created,
    Released,
    Score,
}

/// Sort key parsed from its request form: a field name with an optional
/// `min_` prefix meaning ascending (no prefix sorts descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub ascending: bool,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        let (ascending, name) = match raw.strip_prefix("min_") {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "buying" => SortField::PurchaseCount,
            "price" => SortField::Price,
            "created" => SortField::Created,
            "released" => SortField::Released,
            "score" => SortField::Score,
            _ => return None,
        };
        Some(Self { field, ascending })
    }

    pub const DEFAULT: Self = Self {
        field: SortField::PurchaseCount,
        ascending: false,
    };
}

/// Effective price in the smallest currency unit, integer floor division.
pub fn effective_price(price: i64, discount: i16) -> i64 {
    price * (100 - i64::from(discount)) / 100
}

/// SQL form of the effective price: `price * (100 - discount) / 100`.
pub(crate) fn effective_price_expr() -> SimpleExpr {
    Expr::col((book::Entity, book::Column::Price))
        .mul(Expr::val(100_i64).sub(Expr::col((book::Entity, book::Column::Discount))))
        .div(100_i64)
}

fn lowered(column: book::Column) -> SimpleExpr {
    Func::lower(Expr::col((book::Entity, column))).into()
}

fn name_condition(word: &str) -> SimpleExpr {
    let pattern = format!("%{}%", word.to_lowercase());
    Expr::expr(lowered(book::Column::Name)).like(pattern)
}

fn author_or_description_condition(word: &str) -> Condition {
    let pattern = format!("%{}%", word.to_lowercase());
    Condition::any()
        .add(Expr::expr(lowered(book::Column::Author)).like(pattern.clone()))
        .add(Expr::expr(lowered(book::Column::Description)).like(pattern))
}

fn search_condition(word: &str) -> Condition {
    author_or_description_condition(word).add(name_condition(word))
}

/// Applies the filters and sort to a base book selection. Pure function over
/// the query AST: an empty filter set with no sort returns `base` untouched.
pub fn build_query(
    base: Select<book::Entity>,
    filters: &CatalogFilters,
    sort: Option<SortKey>,
) -> Select<book::Entity> {
    let mut query = base;

    // One membership subquery per genre: intersection semantics.
    for genre_id in &filters.genres {
        let membership = Query::select()
            .column(book_genre::Column::BookId)
            .from(book_genre::Entity)
            .and_where(Expr::col(book_genre::Column::GenreId).eq(*genre_id))
            .to_owned();
        query = query.filter(book::Column::Id.in_subquery(membership));
    }

    if let Some(min) = filters.price_min {
        query = query.filter(Expr::expr(effective_price_expr()).gte(min));
    }
    if let Some(max) = filters.price_max {
        query = query.filter(Expr::expr(effective_price_expr()).lte(max));
    }

    if let Some(min) = filters.date_min {
        query = query.filter(book::Column::Created.gte(min));
    }
    if let Some(max) = filters.date_max {
        query = query.filter(book::Column::Created.lte(max));
    }

    if let Some(word) = filters.search_word.as_deref() {
        if !word.is_empty() {
            query = query.filter(search_condition(word));
        }
    }

    if let Some(sort) = sort {
        let direction = if sort.ascending { Order::Asc } else { Order::Desc };
        query = match sort.field {
            SortField::PurchaseCount => query.order_by(book::Column::PurchaseCount, direction),
            SortField::Price => query.order_by(effective_price_expr(), direction),
            SortField::Created => query.order_by(book::Column::Created, direction),
            SortField::Released => query.order_by(book::Column::Released, direction),
            SortField::Score => query.order_by(book::Column::Score, direction),
        };
        // Equal keys stay in a reproducible order across requests.
        query = query.order_by(book::Column::Id, Order::Asc);
    }

    query
}

/// Concatenates two result sets preserving relative order, dropping books
/// from `secondary` already present in `primary`.
pub(crate) fn merge_ranked(
    primary: Vec<book::Model>,
    secondary: Vec<book::Model>,
) -> Vec<book::Model> {
    let mut seen: HashSet<Uuid> = primary.iter().map(|b| b.id).collect();
    let mut merged = primary;
    for book in secondary {
        if seen.insert(book.id) {
            merged.push(book);
        }
    }
    merged
}

/// Home page slices: most purchased, recent releases and top scored.
#[derive(Debug, Clone)]
pub struct HomePage {
    pub popular: Vec<book::Model>,
    pub new_releases: Vec<book::Model>,
    pub recommended: Vec<book::Model>,
}

/// Read-side catalog listings built on [`build_query`].
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    new_release_days: i64,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, new_release_days: i64) -> Self {
        Self {
            db,
            new_release_days,
        }
    }

    fn new_release_floor(&self) -> NaiveDate {
        Utc::now().date_naive() - Duration::days(self.new_release_days)
    }

    /// Full catalog listing.
    #[instrument(skip(self, filters))]
    pub async fn catalog(
        &self,
        filters: &CatalogFilters,
        sort: Option<SortKey>,
    ) -> Result<Vec<book::Model>, ServiceError> {
        build_query(Book::find(), filters, sort)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Books created within the configured new-release window, falling back
    /// to the oldest-first full catalog when the window is empty.
    #[instrument(skip(self, filters))]
    pub async fn new_releases(
        &self,
        filters: &CatalogFilters,
        sort: Option<SortKey>,
    ) -> Result<Vec<book::Model>, ServiceError> {
        let base = Book::find().filter(book::Column::Created.gte(self.new_release_floor()));
        let books = build_query(base, filters, sort).all(&*self.db).await?;
        if !books.is_empty() {
            return Ok(books);
        }

        // The fallback keeps any requested sort; oldest-first only applies
        // when the caller asked for none.
        let fallback = if sort.is_some() {
            Book::find()
        } else {
            Book::find().order_by_asc(book::Column::Created)
        };
        build_query(fallback, filters, sort)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// A customer's favorites, filterable like any other listing.
    #[instrument(skip(self, filters))]
    pub async fn favorites(
        &self,
        customer_id: Uuid,
        filters: &CatalogFilters,
        sort: Option<SortKey>,
    ) -> Result<Vec<book::Model>, ServiceError> {
        let membership = Query::select()
            .column(favorite::Column::BookId)
            .from(favorite::Entity)
            .and_where(Expr::col(favorite::Column::CustomerId).eq(customer_id))
            .to_owned();
        let base = Book::find().filter(book::Column::Id.in_subquery(membership));
        build_query(base, filters, sort)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Search listing. With an explicit sort this is a plain OR query; with
    /// none, name matches are ranked ahead of author/description matches by
    /// concatenating the two result sets (not a relevance score).
    #[instrument(skip(self, filters))]
    pub async fn search(
        &self,
        word: &str,
        filters: &CatalogFilters,
        sort: Option<SortKey>,
    ) -> Result<Vec<book::Model>, ServiceError> {
        let mut filters = filters.clone();
        filters.search_word = None;

        if let Some(sort) = sort {
            let mut with_word = filters.clone();
            with_word.search_word = Some(word.to_string());
            return build_query(Book::find(), &with_word, Some(sort))
                .all(&*self.db)
                .await
                .map_err(Into::into);
        }

        let by_name = build_query(
            Book::find().filter(name_condition(word)),
            &filters,
            Some(SortKey::DEFAULT),
        )
        .all(&*self.db)
        .await?;
        let by_rest = build_query(
            Book::find().filter(author_or_description_condition(word)),
            &filters,
            Some(SortKey::DEFAULT),
        )
        .all(&*self.db)
        .await?;

        Ok(merge_ranked(by_name, by_rest))
    }

    /// Slices for the storefront home page.
    #[instrument(skip(self))]
    pub async fn home(&self) -> Result<HomePage, ServiceError> {
        let popular = Book::find()
            .order_by_desc(book::Column::PurchaseCount)
            .limit(HOME_SLICE_LIMIT)
            .all(&*self.db)
            .await?;

        let mut new_releases = Book::find()
            .filter(book::Column::Created.gte(self.new_release_floor()))
            .order_by_desc(book::Column::Created)
            .limit(HOME_SLICE_LIMIT)
            .all(&*self.db)
            .await?;
        if new_releases.is_empty() {
            new_releases = Book::find()
                .order_by_asc(book::Column::Created)
                .limit(HOME_SLICE_LIMIT)
                .all(&*self.db)
                .await?;
        }

        let recommended = Book::find()
            .order_by_desc(book::Column::Score)
            .limit(HOME_SLICE_LIMIT)
            .all(&*self.db)
            .await?;

        Ok(HomePage {
            popular,
            new_releases,
            recommended,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn sql(query: Select<book::Entity>) -> String {
        query.build(DbBackend::Postgres).to_string()
    }

    fn sample_book(name: &str, author: &str) -> book::Model {
        book::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            author: author.to_string(),
            description: String::new(),
            main_image_url: None,
            price: 1000,
            discount: 0,
            purchase_count: 0,
            score: 0,
            released: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            created: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    // ==================== Sort Key Tests ====================

    #[test]
    fn parse_descending_by_default() {
        let key = SortKey::parse("buying").unwrap();
        assert_eq!(key.field, SortField::PurchaseCount);
        assert!(!key.ascending);
    }

    #[test]
    fn parse_min_prefix_means_ascending() {
        let key = SortKey::parse("min_price").unwrap();
        assert_eq!(key.field, SortField::Price);
        assert!(key.ascending);
    }

    #[test]
    fn parse_all_recognized_fields() {
        for (raw, field) in [
            ("buying", SortField::PurchaseCount),
            ("price", SortField::Price),
            ("created", SortField::Created),
            ("released", SortField::Released),
            ("score", SortField::Score),
        ] {
            assert_eq!(SortKey::parse(raw).unwrap().field, field);
        }
    }

    #[test]
    fn parse_rejects_unknown_field() {
        assert!(SortKey::parse("title").is_none());
        assert!(SortKey::parse("min_title").is_none());
    }

    // ==================== Effective Price Tests ====================

    #[test]
    fn effective_price_floors() {
        assert_eq!(effective_price(999, 33), 669);
    }

    #[test]
    fn effective_price_boundaries_for_range_filter() {
        // Range [100, 200] on effective price.
        assert_eq!(effective_price(1000, 90), 100); // included
        assert_eq!(effective_price(1000, 80), 200); // included
        assert_eq!(effective_price(1000, 70), 300); // excluded
    }

    #[test]
    fn effective_price_zero_discount_is_list_price() {
        assert_eq!(effective_price(2500, 0), 2500);
    }

    #[test]
    fn effective_price_full_discount_is_free() {
        assert_eq!(effective_price(2500, 100), 0);
    }

    // ==================== Query Building Tests ====================

    #[test]
    fn empty_filters_and_no_sort_leave_base_untouched() {
        let base = Book::find();
        let built = build_query(base.clone(), &CatalogFilters::default(), None);
        assert_eq!(sql(base), sql(built));
    }

    #[test]
    fn price_range_filters_on_effective_price() {
        let filters = CatalogFilters {
            price_min: Some(100),
            price_max: Some(200),
            ..Default::default()
        };
        let query = sql(build_query(Book::find(), &filters, None));

        assert!(query.contains("\"books\".\"price\""));
        assert!(query.contains("\"books\".\"discount\""));
        assert!(query.contains(">="));
        assert!(query.contains("<="));
    }

    #[test]
    fn genre_filter_intersects_memberships() {
        let filters = CatalogFilters {
            genres: vec![Uuid::new_v4(), Uuid::new_v4()],
            ..Default::default()
        };
        let query = sql(build_query(Book::find(), &filters, None));

        // One membership subquery per genre, AND-combined.
        assert_eq!(query.matches("IN (SELECT").count(), 2);
        assert!(query.contains("\"book_genres\""));
    }

    #[test]
    fn date_range_filters_on_creation_date() {
        let filters = CatalogFilters {
            date_min: NaiveDate::from_ymd_opt(2024, 1, 1),
            date_max: NaiveDate::from_ymd_opt(2024, 6, 30),
            ..Default::default()
        };
        let query = sql(build_query(Book::find(), &filters, None));
        assert!(query.contains("\"books\".\"created\""));
    }

    #[test]
    fn search_word_matches_name_author_description_case_insensitively() {
        let filters = CatalogFilters {
            search_word: Some("King".to_string()),
            ..Default::default()
        };
        let query = sql(build_query(Book::find(), &filters, None));

        assert!(query.contains("LOWER"));
        assert!(query.contains("LIKE"));
        assert!(query.contains("%king%"));
        assert!(query.contains("\"books\".\"name\""));
        assert!(query.contains("\"books\".\"author\""));
        assert!(query.contains("\"books\".\"description\""));
        assert!(query.contains(" OR "));
    }

    #[test]
    fn sort_adds_deterministic_tie_break() {
        let query = sql(build_query(
            Book::find(),
            &CatalogFilters::default(),
            Some(SortKey::parse("score").unwrap()),
        ));
        assert!(query.contains("\"books\".\"score\" DESC"));
        assert!(query.contains("\"books\".\"id\" ASC"));
    }

    #[test]
    fn price_sort_orders_by_effective_price() {
        let query = sql(build_query(
            Book::find(),
            &CatalogFilters::default(),
            Some(SortKey::parse("min_price").unwrap()),
        ));
        assert!(query.contains("ORDER BY"));
        assert!(query.contains("\"books\".\"discount\""));
        assert!(query.contains("ASC"));
    }

    // ==================== Ranked Search Tests ====================

    #[test]
    fn ranked_search_puts_name_matches_first() {
        // "King" matches the first book's name and the second's author.
        let name_match = sample_book("King's Ransom", "Smith");
        let author_match = sample_book("Ransom", "Stephen King");

        let merged = merge_ranked(vec![name_match.clone()], vec![author_match.clone()]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, name_match.id);
        assert_eq!(merged[1].id, author_match.id);
    }

    #[test]
    fn ranked_search_deduplicates_double_matches() {
        // Matching on both name and author must not appear twice.
        let both = sample_book("Stephen King Reader", "Stephen King");
        let merged = merge_ranked(vec![both.clone()], vec![both.clone()]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn filters_is_empty_ignores_blank_search_word() {
        let filters = CatalogFilters {
            search_word: Some(String::new()),
            ..Default::default()
        };
        assert!(filters.is_empty());
    }
}
