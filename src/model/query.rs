use super::Item;

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
/// Highest page accepted; keeps `offset()` within a PostgreSQL `BIGINT` at any page size.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_LIMIT;

/// Columns an item listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Category,
    Weight,
    TimestampIn,
    ExpiryDate,
}

impl SortField {
    /// Unknown names fall back to `Id`.
    pub fn parse(name: &str) -> Self {
        match name {
            "category" => SortField::Category,
            "weight" => SortField::Weight,
            "timestamp_in" => SortField::TimestampIn,
            "expiry_date" => SortField::ExpiryDate,
            _ => SortField::Id,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Category => "category",
            SortField::Weight => "weight",
            SortField::TimestampIn => "timestamp_in",
            SortField::ExpiryDate => "expiry_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `desc` in any case means descending; everything else ascending.
    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

/// Filters, pagination and ordering for `ItemLedger::list`.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemQuery {
    pub category: Option<String>,
    pub perishable: Option<bool>,
    /// `Some(true)`: perishable and past expiry. `Some(false)`: everything else.
    pub expired: Option<bool>,
    page: u64,
    limit: u64,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            category: None,
            perishable: None,
            expired: None,
            page: 1,
            limit: DEFAULT_LIMIT,
            sort_by: SortField::Id,
            sort_order: SortOrder::Asc,
        }
    }
}

impl ItemQuery {
    /// Set the 1-based page, clamped to `1..=MAX_PAGE`.
    pub fn page(mut self, page: i64) -> Self {
        self.page = u64::try_from(page).unwrap_or(1).clamp(1, MAX_PAGE);
        self
    }

    /// Set the page size, clamped to `1..=MAX_LIMIT`.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = u64::try_from(limit).unwrap_or(1).clamp(1, MAX_LIMIT);
        self
    }

    pub fn sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.sort_order = order;
        self
    }

    pub fn page_number(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// One page of an item listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl ItemPage {
    pub fn new(items: Vec<Item>, total: u64, query: &ItemQuery) -> Self {
        Self {
            items,
            total,
            page: query.page_number(),
            limit: query.page_size(),
            total_pages: total.div_ceil(query.page_size()),
        }
    }
}
