//! SELECT statements for item listings.

use crate::model::{ItemQuery, SortField, SortOrder};
use chrono::NaiveDate;
use sea_query::{Condition, Expr, Order, PostgresQueryBuilder, Query, SelectStatement, Values};

pub const ITEM_COLUMNS: [&str; 12] = [
    "id",
    "category",
    "perishable",
    "weight",
    "dry",
    "fragile",
    "threshold",
    "expiry_date",
    "timestamp_in",
    "timestamp_out",
    "camera_id",
    "rfid",
];

fn filter_condition(query: &ItemQuery, today: NaiveDate) -> Condition {
    let mut condition = Condition::all();
    if let Some(category) = &query.category {
        condition = condition.add(Expr::col("category").eq(category.as_str()));
    }
    if let Some(perishable) = query.perishable {
        condition = condition.add(Expr::col("perishable").eq(perishable));
    }
    match query.expired {
        // matches /api/items/expired: checked-out goods are no longer on the shelf
        Some(true) => {
            condition = condition
                .add(Expr::col("perishable").eq(true))
                .add(Expr::col("expiry_date").lt(today))
                .add(Expr::col("timestamp_out").is_null());
        }
        Some(false) => {
            condition = condition.add(
                Condition::any()
                    .add(Expr::col("perishable").eq(false))
                    .add(Expr::col("expiry_date").is_null())
                    .add(Expr::col("expiry_date").gte(today)),
            );
        }
        None => {}
    }
    condition
}

/// The page of items matching `query`, ordered by the requested column then `id`.
pub fn select_items(query: &ItemQuery, today: NaiveDate) -> (String, Values) {
    let order = match query.sort_order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    };
    let mut select: SelectStatement = Query::select();
    select
        .columns(ITEM_COLUMNS)
        .from("items")
        .cond_where(filter_condition(query, today))
        .order_by(query.sort_by.column(), order);
    if query.sort_by != SortField::Id {
        select.order_by("id", Order::Asc);
    }
    select.limit(query.page_size()).offset(query.offset());
    select.build(PostgresQueryBuilder)
}

/// Number of items matching the filters of `query`, ignoring pagination.
pub fn count_items(query: &ItemQuery, today: NaiveDate) -> (String, Values) {
    Query::select()
        .expr(Expr::cust("COUNT(*)"))
        .from("items")
        .cond_where(filter_condition(query, today))
        .build(PostgresQueryBuilder)
}

/// In-stock perishable items past expiry, soonest expiry first.
pub fn select_expired(today: NaiveDate) -> (String, Values) {
    Query::select()
        .columns(ITEM_COLUMNS)
        .from("items")
        .and_where(Expr::col("perishable").eq(true))
        .and_where(Expr::col("expiry_date").lt(today))
        .and_where(Expr::col("timestamp_out").is_null())
        .order_by("expiry_date", Order::Asc)
        .order_by("id", Order::Asc)
        .build(PostgresQueryBuilder)
}
