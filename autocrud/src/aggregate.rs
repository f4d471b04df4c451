//! In-memory evaluation of `count:` and `sum:` aggregates.
//!
//! Aggregates are computed on the materialized entity every time it is
//! encoded for output. A path such as `Items.Price` is resolved one segment
//! at a time; each segment is normalized with [`to_snake_case`] and arrays met
//! on the way are flattened, so `Items.Price` over
//! `{"items": [{"price": 2}, {"price": 3}]}` resolves to `[2, 3]`.

use serde_json::{Map, Number, Value};

use crate::metadata::{AggregateDescriptor, AggregateKind, EntityDescriptor};
use crate::naming::to_snake_case;

/// Computes every aggregate of `descriptor` and stores it under the
/// aggregate's field name.
pub fn apply(descriptor: &EntityDescriptor, object: &mut Map<String, Value>) {
    for aggregate in descriptor.aggregates() {
        let value = evaluate(aggregate, object);
        object.insert(aggregate.name.clone(), value);
    }
}

/// Value of one aggregate over an entity object.
#[must_use]
pub fn evaluate(aggregate: &AggregateDescriptor, object: &Map<String, Value>) -> Value {
    let values = resolve(object, &aggregate.path);
    match aggregate.kind {
        AggregateKind::Count => Value::from(values.len()),
        AggregateKind::Sum => sum(&values),
    }
}

/// Non-null values reached by a dot-separated path, arrays flattened.
#[must_use]
pub fn resolve<'a>(object: &'a Map<String, Value>, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let mut out = Vec::new();
    if let Some((first, rest)) = segments.split_first() {
        if let Some(value) = lookup(object, first) {
            collect(value, rest, &mut out);
        }
    }
    out
}

fn lookup<'a>(object: &'a Map<String, Value>, segment: &str) -> Option<&'a Value> {
    object
        .get(&to_snake_case(segment))
        .or_else(|| object.get(segment))
}

fn collect<'a>(current: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    match (current, segments.split_first()) {
        (Value::Array(items), _) => {
            for item in items {
                collect(item, segments, out);
            }
        }
        (Value::Null, _) => {}
        (value, None) => out.push(value),
        (Value::Object(map), Some((first, rest))) => {
            if let Some(next) = lookup(map, first) {
                collect(next, rest, out);
            }
        }
        _ => {}
    }
}

fn sum(values: &[&Value]) -> Value {
    let numbers: Vec<&Number> = values
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => Some(n),
            _ => None,
        })
        .collect();

    let integers: Option<Vec<i64>> = numbers.iter().map(|n| n.as_i64()).collect();
    if let Some(total) = integers.and_then(|ints| ints.into_iter().try_fold(0i64, i64::checked_add)) {
        return Value::from(total);
    }

    let total: f64 = numbers.iter().filter_map(|n| n.as_f64()).sum();
    Number::from_f64(total).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn aggregate(kind: AggregateKind, path: &str) -> AggregateDescriptor {
        AggregateDescriptor {
            name: "total".to_string(),
            kind,
            path: path.to_string(),
        }
    }

    #[test]
    fn test_count_flattens_lists() {
        let order = object(json!({"items": [{"price": 2}, {"price": 3}, {"price": null}]}));
        assert_eq!(evaluate(&aggregate(AggregateKind::Count, "Items"), &order), json!(3));
        assert_eq!(
            evaluate(&aggregate(AggregateKind::Count, "Items.Price"), &order),
            json!(2)
        );
    }

    #[test]
    fn test_sum_keeps_integers_integral() {
        let order = object(json!({"items": [{"unit_price": 2}, {"unit_price": 5}]}));
        assert_eq!(
            evaluate(&aggregate(AggregateKind::Sum, "Items.UnitPrice"), &order),
            json!(7)
        );
    }

    #[test]
    fn test_sum_of_floats() {
        let order = object(json!({"items": [{"price": 1.5}, {"price": 2}]}));
        assert_eq!(
            evaluate(&aggregate(AggregateKind::Sum, "items.price"), &order),
            json!(3.5)
        );
    }

    #[test]
    fn test_nested_lists_and_missing_paths() {
        let customer = object(json!({
            "orders": [
                {"items": [{"qty": 1}, {"qty": 2}]},
                {"items": [{"qty": 4}]}
            ]
        }));
        assert_eq!(
            evaluate(&aggregate(AggregateKind::Sum, "Orders.Items.Qty"), &customer),
            json!(7)
        );
        assert_eq!(evaluate(&aggregate(AggregateKind::Count, "Missing"), &customer), json!(0));
        assert_eq!(evaluate(&aggregate(AggregateKind::Sum, "Missing.X"), &customer), json!(0));
    }
}
