//! Collection queries: `field[op]=value` predicates and `sort_by`.

use serde_json::Value;
use std::cmp::Ordering;
use tether_engine::query::{parse_filter_param, parse_sort_param, SORT_PARAM};
use tether_engine::{Operator, SortDirection};

/// A single `field[op]=value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

impl Condition {
    /// Whether the element's field satisfies the condition. Elements
    /// without the field never match.
    pub fn matches(&self, element: &Value) -> bool {
        let Some(ordering) = element
            .get(&self.field)
            .and_then(|actual| compare_to(actual, &self.value))
        else {
            return false;
        };
        match self.operator {
            Operator::Gte => ordering != Ordering::Less,
            Operator::Lte => ordering != Ordering::Greater,
            Operator::Exists => ordering == Ordering::Equal,
        }
    }
}

/// Decoded query of a collection GET.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Conditions, all of which must hold
    pub conditions: Vec<Condition>,
    /// Sort order, if requested
    pub sort: Option<(SortDirection, String)>,
}

impl ListQuery {
    /// Decode query pairs. Pairs that are neither a condition nor a sort are
    /// ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut query = Self::default();
        for (name, value) in pairs {
            if name == SORT_PARAM {
                match parse_sort_param(value) {
                    Some((direction, field)) => query.sort = Some((direction, field.to_string())),
                    None => tracing::debug!(value = %value, "Ignoring empty sort"),
                }
            } else if let Some((field, operator)) = parse_filter_param(name) {
                query.conditions.push(Condition {
                    field: field.to_string(),
                    operator,
                    value: value.clone(),
                });
            } else {
                tracing::debug!(param = %name, "Ignoring unknown query parameter");
            }
        }
        query
    }

    /// Filter then (stably) sort the elements.
    pub fn apply(&self, mut elements: Vec<Value>) -> Vec<Value> {
        elements.retain(|element| self.conditions.iter().all(|c| c.matches(element)));

        if let Some((direction, field)) = &self.sort {
            elements.sort_by(|a, b| {
                let ordering = order(a.get(field), b.get(field));
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }
        elements
    }
}

/// Compare a stored value with a query value. Numbers compare numerically,
/// everything else by its text.
fn compare_to(actual: &Value, expected: &str) -> Option<Ordering> {
    match actual {
        Value::Number(n) => {
            let expected: f64 = expected.trim().parse().ok()?;
            n.as_f64()?.partial_cmp(&expected)
        }
        Value::String(s) => Some(s.as_str().cmp(expected)),
        Value::Bool(b) => Some(b.to_string().as_str().cmp(expected)),
        _ => None,
    }
}

/// Total order over field values. Missing and null sort first.
fn order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
