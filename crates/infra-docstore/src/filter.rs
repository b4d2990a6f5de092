// In-process evaluation of document filters and ordering

use consultorio_core::port::{Document, Filter, FilterOp, OrderBy};
use serde_json::Value;
use std::cmp::Ordering;

/// True when the document satisfies every filter (conjunction)
pub fn matches_all(doc: &Document, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| matches(doc, filter))
}

fn matches(doc: &Document, filter: &Filter) -> bool {
    // null counts as missing for the exclusion operators
    let field = doc.field(&filter.field);
    let present = field.filter(|v| !v.is_null());

    match filter.op {
        FilterOp::Eq => field.is_some_and(|v| same_value(v, &filter.value)),
        FilterOp::NotEq => present.is_some_and(|v| !same_value(v, &filter.value)),
        FilterOp::Lt => compare(field, &filter.value) == Some(Ordering::Less),
        FilterOp::Le => matches!(
            compare(field, &filter.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::Gt => compare(field, &filter.value) == Some(Ordering::Greater),
        FilterOp::Ge => matches!(
            compare(field, &filter.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::In => field.is_some_and(|v| candidates(&filter.value).any(|c| same_value(v, c))),
        FilterOp::NotIn => {
            present.is_some_and(|v| !candidates(&filter.value).any(|c| same_value(v, c)))
        }
        FilterOp::ArrayContains => field
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|item| same_value(item, &filter.value))),
        FilterOp::ArrayContainsAny => field.and_then(Value::as_array).is_some_and(|items| {
            items
                .iter()
                .any(|item| candidates(&filter.value).any(|c| same_value(item, c)))
        }),
    }
}

fn candidates(value: &Value) -> impl Iterator<Item = &Value> {
    value.as_array().into_iter().flatten()
}

/// Numbers compare by value, so `1` equals `1.0`
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering is defined only between values of the same type
fn compare(field: Option<&Value>, other: &Value) -> Option<Ordering> {
    match (field?, other) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Drop documents lacking the order field, then sort stably on it
pub fn sort_documents(docs: &mut Vec<Document>, order: &OrderBy) {
    docs.retain(|doc| doc.field(&order.field).is_some());
    docs.sort_by(|a, b| {
        let (Some(x), Some(y)) = (a.field(&order.field), b.field(&order.field)) else {
            return Ordering::Equal;
        };
        let ordering = type_rank(x)
            .cmp(&type_rank(y))
            .then_with(|| compare(Some(x), y).unwrap_or(Ordering::Equal));
        if order.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, value: Value) -> Document {
        match value {
            Value::Object(map) => Document::new(id, map),
            _ => unreachable!(),
        }
    }

    fn appointments() -> Vec<Document> {
        vec![
            doc("a1", json!({"status": "scheduled", "patient": {"id": "12345678901"}, "duration": 30, "tags": ["first"]})),
            doc("a2", json!({"status": "completed", "patient": {"id": "98765432100"}, "duration": 45.0})),
            doc("a3", json!({"status": "cancelled", "duration": "long", "tags": ["return", "urgent"]})),
        ]
    }

    fn ids(docs: &[Document], filter: Filter) -> Vec<String> {
        docs.iter()
            .filter(|d| matches_all(d, std::slice::from_ref(&filter)))
            .map(|d| d.id.clone())
            .collect()
    }

    #[test]
    fn test_equality_on_dotted_path() {
        let docs = appointments();
        assert_eq!(ids(&docs, Filter::eq("patient.id", "12345678901")), vec!["a1"]);
    }

    #[test]
    fn test_not_equal_excludes_missing_field() {
        let docs = appointments();
        let found = ids(&docs, Filter::new("patient.id", FilterOp::NotEq, "12345678901"));
        assert_eq!(found, vec!["a2"]);
    }

    #[test]
    fn test_ordering_only_within_type() {
        let docs = appointments();
        assert_eq!(ids(&docs, Filter::new("duration", FilterOp::Gt, 30)), vec!["a2"]);
        assert_eq!(ids(&docs, Filter::new("duration", FilterOp::Le, 45)), vec!["a1", "a2"]);
    }

    #[test]
    fn test_membership_operators() {
        let docs = appointments();
        assert_eq!(
            ids(&docs, Filter::new("status", FilterOp::In, json!(["scheduled", "cancelled"]))),
            vec!["a1", "a3"]
        );
        assert_eq!(
            ids(&docs, Filter::new("patient.id", FilterOp::NotIn, json!(["98765432100"]))),
            vec!["a1"]
        );
        assert_eq!(ids(&docs, Filter::new("tags", FilterOp::ArrayContains, "urgent")), vec!["a3"]);
        assert_eq!(
            ids(&docs, Filter::new("tags", FilterOp::ArrayContainsAny, json!(["first", "return"]))),
            vec!["a1", "a3"]
        );
    }

    #[test]
    fn test_sort_drops_missing_and_orders() {
        let mut docs = appointments();
        sort_documents(&mut docs, &OrderBy::desc("patient.id"));
        let order: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(order, vec!["a2", "a1"]);
    }
}
