//! Validation for stop reordering requests.
//!
//! A reorder request is a list of `{id, order}` pairs covering the stops a
//! client wants to move. The whole batch is validated before any row is
//! touched; the caller applies the accepted pairs inside one transaction.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One raw entry of a reorder payload. Both fields are optional so that a
/// missing field is reported as a validation error rather than a
/// deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct StopOrderInput {
    pub id: Option<i64>,
    pub order: Option<i64>,
}

/// A validated (stop id, new order) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopOrder {
    pub id: i64,
    pub order: i64,
}

/// Checks a reorder batch for shape and uniqueness.
///
/// Fails when the batch is empty, an entry lacks `id` or `order`, an order is
/// not a positive integer, or two entries propose the same order. On success
/// the pairs come back unchanged, in input order.
pub fn validate_stop_orders(input: &[StopOrderInput]) -> Result<Vec<StopOrder>, AppError> {
    if input.is_empty() {
        return Err(AppError::validation("stop orders list cannot be empty"));
    }

    let mut validated = Vec::with_capacity(input.len());
    for item in input {
        let (id, order) = match (item.id, item.order) {
            (Some(id), Some(order)) => (id, order),
            _ => {
                return Err(AppError::validation(
                    "each item must have 'id' and 'order' fields",
                ))
            }
        };
        if order < 1 {
            return Err(AppError::validation("order must be a positive integer"));
        }
        validated.push(StopOrder { id, order });
    }

    let distinct: HashSet<i64> = validated.iter().map(|pair| pair.order).collect();
    if distinct.len() != validated.len() {
        return Err(AppError::validation("duplicate orders are not allowed"));
    }

    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, order: i64) -> StopOrderInput {
        StopOrderInput {
            id: Some(id),
            order: Some(order),
        }
    }

    #[test]
    fn accepts_distinct_positive_orders() {
        let input = vec![entry(10, 2), entry(11, 1), entry(12, 3)];
        let validated = validate_stop_orders(&input).expect("valid batch");
        assert_eq!(
            validated,
            vec![
                StopOrder { id: 10, order: 2 },
                StopOrder { id: 11, order: 1 },
                StopOrder { id: 12, order: 3 },
            ]
        );
    }

    #[test]
    fn accepts_non_contiguous_orders() {
        let input = vec![entry(1, 5), entry(2, 100)];
        assert!(validate_stop_orders(&input).is_ok());
    }

    #[test]
    fn rejects_empty_batch() {
        let err = validate_stop_orders(&[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("empty")));
    }

    #[test]
    fn rejects_missing_order_field() {
        let input = vec![StopOrderInput {
            id: Some(1),
            order: None,
        }];
        let err = validate_stop_orders(&input).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("'id' and 'order'")));
    }

    #[test]
    fn rejects_missing_id_field() {
        let input = vec![StopOrderInput {
            id: None,
            order: Some(1),
        }];
        assert!(validate_stop_orders(&input).is_err());
    }

    #[test]
    fn rejects_zero_order() {
        let input = vec![entry(1, 0)];
        let err = validate_stop_orders(&input).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("positive")));
    }

    #[test]
    fn rejects_negative_order() {
        let input = vec![entry(1, -3)];
        assert!(validate_stop_orders(&input).is_err());
    }

    #[test]
    fn rejects_duplicate_orders() {
        let input = vec![entry(1, 2), entry(2, 2)];
        let err = validate_stop_orders(&input).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("duplicate")));
    }
}
