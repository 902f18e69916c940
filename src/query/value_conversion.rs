//! Converting SeaQuery values into `may_postgres` parameters.
//!
//! The values are first copied into typed vectors, then a second pass builds the
//! `&dyn ToSql` slice pointing into those vectors, so the references stay valid for the
//! duration of the closure. Each vector holds `Option<T>` so a NULL is still sent with
//! the column's own type.

use crate::executor::DbError;
use chrono::{DateTime, NaiveDate, Utc};
use may_postgres::types::ToSql;
use sea_query::Value;

#[derive(Clone, Copy)]
enum Slot {
    Bool,
    BigInt,
    Double,
    String,
    Date,
    Timestamp,
}

/// Convert `values` and run `f` with the resulting parameter slice.
///
/// # Errors
///
/// Returns `DbError::Query` for value types the item queries never produce, and
/// whatever `f` returns.
pub fn with_converted_params<F, R>(values: &sea_query::Values, f: F) -> Result<R, DbError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, DbError>,
{
    let mut bools: Vec<Option<bool>> = Vec::new();
    let mut big_ints: Vec<Option<i64>> = Vec::new();
    let mut doubles: Vec<Option<f64>> = Vec::new();
    let mut strings: Vec<Option<String>> = Vec::new();
    let mut dates: Vec<Option<NaiveDate>> = Vec::new();
    let mut timestamps: Vec<Option<DateTime<Utc>>> = Vec::new();
    let mut slots: Vec<Slot> = Vec::new();

    // First pass: collect all values into typed vectors
    for value in values.iter() {
        let slot = match value {
            Value::Bool(b) => {
                bools.push(*b);
                Slot::Bool
            }
            Value::Int(i) => {
                big_ints.push(i.map(i64::from));
                Slot::BigInt
            }
            Value::BigInt(i) => {
                big_ints.push(*i);
                Slot::BigInt
            }
            Value::Unsigned(u) => {
                big_ints.push(u.map(i64::from));
                Slot::BigInt
            }
            Value::BigUnsigned(u) => {
                let v = u
                    .map(|u| {
                        i64::try_from(u).map_err(|_| {
                            DbError::Query(format!(
                                "BigUnsigned value {} exceeds i64::MAX, cannot be bound",
                                u
                            ))
                        })
                    })
                    .transpose()?;
                big_ints.push(v);
                Slot::BigInt
            }
            Value::Double(d) => {
                doubles.push(*d);
                Slot::Double
            }
            Value::String(s) => {
                strings.push(s.as_ref().map(|s| s.to_string()));
                Slot::String
            }
            Value::ChronoDate(d) => {
                dates.push(d.as_ref().map(|d| NaiveDate::clone(d)));
                Slot::Date
            }
            Value::ChronoDateTimeUtc(ts) => {
                timestamps.push(ts.as_ref().map(|ts| DateTime::<Utc>::clone(ts)));
                Slot::Timestamp
            }
            _ => {
                return Err(DbError::Query(format!(
                    "Unsupported value type in query: {:?}",
                    value
                )));
            }
        };
        slots.push(slot);
    }

    // Second pass: create references to the stored values
    let (mut bool_idx, mut int_idx, mut double_idx) = (0, 0, 0);
    let (mut string_idx, mut date_idx, mut ts_idx) = (0, 0, 0);
    let mut params: Vec<&dyn ToSql> = Vec::with_capacity(slots.len());

    for slot in slots {
        match slot {
            Slot::Bool => {
                params.push(&bools[bool_idx]);
                bool_idx += 1;
            }
            Slot::BigInt => {
                params.push(&big_ints[int_idx]);
                int_idx += 1;
            }
            Slot::Double => {
                params.push(&doubles[double_idx]);
                double_idx += 1;
            }
            Slot::String => {
                params.push(&strings[string_idx]);
                string_idx += 1;
            }
            Slot::Date => {
                params.push(&dates[date_idx]);
                date_idx += 1;
            }
            Slot::Timestamp => {
                params.push(&timestamps[ts_idx]);
                ts_idx += 1;
            }
        }
    }

    f(&params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::Values;

    #[test]
    fn test_params_keep_value_order() {
        let values = Values(vec![
            Value::String(Some("Food".to_string())),
            Value::Bool(Some(true)),
            Value::ChronoDate(None),
            Value::BigUnsigned(Some(10)),
            Value::BigUnsigned(Some(20)),
        ]);
        let count = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_oversized_unsigned_rejected() {
        let values = Values(vec![Value::BigUnsigned(Some(u64::MAX))]);
        let result = with_converted_params(&values, |_| Ok(()));
        assert!(matches!(result, Err(DbError::Query(_))));
    }

    #[test]
    fn test_unsupported_value_rejected() {
        let values = Values(vec![Value::Bytes(Some(vec![1, 2, 3]))]);
        let result = with_converted_params(&values, |_| Ok(()));
        assert!(matches!(result, Err(DbError::Query(_))));
    }
}
