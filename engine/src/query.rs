//! Query parameters and the default server-side encodings.
//!
//! Server-locus strategies turn themselves into query parameters through a
//! translator. Three translators can apply to one strategy; the first one
//! present wins:
//!
//! 1. the translator given when the strategy was constructed,
//! 2. the default translator configured on the [`Endpoint`](crate::Endpoint),
//! 3. the library defaults in this module.
//!
//! The library defaults encode filters as `field[operator]=value` and sorting
//! as `sort_by=+field` / `sort_by=-field`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Filter translator: `(field, operator, value) -> parameter`.
pub type FilterTranslator = Arc<dyn Fn(&str, Operator, &str) -> QueryParam + Send + Sync>;

/// Sort translator: `(direction, field) -> parameter`.
pub type SortTranslator = Arc<dyn Fn(SortDirection, &str) -> QueryParam + Send + Sync>;

/// Name of the query parameter used by the default sort encoding.
pub const SORT_PARAM: &str = "sort_by";

/// A single `name=value` query parameter, stored unencoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub value: String,
}

impl QueryParam {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Percent-encoded `name=value` form.
    pub fn encode(&self) -> String {
        format!(
            "{}={}",
            urlencoding::encode(&self.name),
            urlencoding::encode(&self.value)
        )
    }
}

impl fmt::Display for QueryParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Comparison applied by a filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Field is greater than or equal to the value.
    Gte,
    /// Field is less than or equal to the value.
    Lte,
    /// Field equals the value.
    Exists,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::Exists => "exists",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gte" => Ok(Operator::Gte),
            "lte" => Ok(Operator::Lte),
            "exists" => Ok(Operator::Exists),
            other => Err(format!("unknown filter operator: {other}")),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    fn sign(self) -> char {
        match self {
            SortDirection::Ascending => '+',
            SortDirection::Descending => '-',
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Library default filter encoding: `field[operator]=value`.
pub fn default_filter_translator(field: &str, operator: Operator, value: &str) -> QueryParam {
    QueryParam::new(format!("{field}[{operator}]"), value)
}

/// Library default sort encoding: `sort_by=+field` or `sort_by=-field`.
pub fn default_sort_translator(direction: SortDirection, field: &str) -> QueryParam {
    QueryParam::new(SORT_PARAM, format!("{}{field}", direction.sign()))
}

/// Split a default-encoded filter parameter name into field and operator.
///
/// `"name[exists]"` yields `("name", Operator::Exists)`.
pub fn parse_filter_param(name: &str) -> Option<(&str, Operator)> {
    let (field, rest) = name.split_once('[')?;
    let operator = rest.strip_suffix(']')?.parse().ok()?;
    if field.is_empty() {
        return None;
    }
    Some((field, operator))
}

/// Parse a default-encoded sort value.
///
/// A leading space counts as `+`: form decoding turns an unescaped `+` into
/// a space. A bare field name sorts ascending.
pub fn parse_sort_param(value: &str) -> Option<(SortDirection, &str)> {
    let (direction, field) = match value.chars().next()? {
        '+' | ' ' => (SortDirection::Ascending, &value[1..]),
        '-' => (SortDirection::Descending, &value[1..]),
        _ => (SortDirection::Ascending, value),
    };
    let field = field.trim();
    if field.is_empty() {
        return None;
    }
    Some((direction, field))
}

/// Join parameters into an encoded query string (without the leading `?`).
pub fn encode_query(params: &[QueryParam]) -> String {
    params
        .iter()
        .map(QueryParam::encode)
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_encoding() {
        let param = default_filter_translator("name", Operator::Exists, "Paul");
        assert_eq!(param.name, "name[exists]");
        assert_eq!(param.value, "Paul");
        assert_eq!(param.to_string(), "name[exists]=Paul");
    }

    #[test]
    fn default_sort_encoding() {
        assert_eq!(
            default_sort_translator(SortDirection::Ascending, "name").to_string(),
            "sort_by=+name"
        );
        assert_eq!(
            default_sort_translator(SortDirection::Descending, "name").to_string(),
            "sort_by=-name"
        );
    }

    #[test]
    fn encoding_escapes_reserved_characters() {
        let param = QueryParam::new("name[gte]", "a b&c");
        assert_eq!(param.encode(), "name%5Bgte%5D=a%20b%26c");

        let sort = default_sort_translator(SortDirection::Ascending, "name");
        assert_eq!(sort.encode(), "sort_by=%2Bname");
    }

    #[test]
    fn parse_filter_names() {
        assert_eq!(parse_filter_param("id[gte]"), Some(("id", Operator::Gte)));
        assert_eq!(parse_filter_param("id[lte]"), Some(("id", Operator::Lte)));
        assert_eq!(
            parse_filter_param("name[exists]"),
            Some(("name", Operator::Exists))
        );
        assert_eq!(parse_filter_param("name"), None);
        assert_eq!(parse_filter_param("name[like]"), None);
        assert_eq!(parse_filter_param("[gte]"), None);
        assert_eq!(parse_filter_param("id[gte"), None);
    }

    #[test]
    fn parse_sort_values() {
        assert_eq!(
            parse_sort_param("+name"),
            Some((SortDirection::Ascending, "name"))
        );
        assert_eq!(
            parse_sort_param(" name"),
            Some((SortDirection::Ascending, "name"))
        );
        assert_eq!(
            parse_sort_param("-id"),
            Some((SortDirection::Descending, "id"))
        );
        assert_eq!(
            parse_sort_param("name"),
            Some((SortDirection::Ascending, "name"))
        );
        assert_eq!(parse_sort_param("-"), None);
        assert_eq!(parse_sort_param(""), None);
    }

    #[test]
    fn parse_inverts_defaults() {
        let param = default_filter_translator("balance", Operator::Lte, "10");
        assert_eq!(
            parse_filter_param(&param.name),
            Some(("balance", Operator::Lte))
        );

        let sort = default_sort_translator(SortDirection::Descending, "balance");
        assert_eq!(
            parse_sort_param(&sort.value),
            Some((SortDirection::Descending, "balance"))
        );
    }

    #[test]
    fn operator_round_trips_through_str() {
        for op in [Operator::Gte, Operator::Lte, Operator::Exists] {
            assert_eq!(op.as_str().parse::<Operator>(), Ok(op));
        }
        assert!("eq".parse::<Operator>().is_err());
    }

    #[test]
    fn encode_query_joins_with_ampersand() {
        let params = vec![
            QueryParam::new("name[exists]", "Paul"),
            QueryParam::new("sort_by", "-name"),
        ];
        assert_eq!(
            encode_query(&params),
            "name%5Bexists%5D=Paul&sort_by=-name"
        );
        assert_eq!(encode_query(&[]), "");
    }
}
