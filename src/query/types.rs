use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::cluster::protocol::HTTP_HEADER_TAG_PREFIX;
use crate::error::{GatewayError, Result};
use crate::merge::facets::FacetKind;

/// How a client-facing tag value maps onto a name in the backend tag collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagNamespace {
    /// The value is the tag name itself.
    Plain,
    /// The value is an HTTP header name, stored lower-cased under `http:header:`.
    HttpHeader,
}

impl TagNamespace {
    pub fn tag_name(&self, value: &str) -> String {
        match self {
            TagNamespace::Plain => value.to_string(),
            TagNamespace::HttpHeader => {
                format!("{}{}", HTTP_HEADER_TAG_PREFIX, value.to_lowercase())
            }
        }
    }

    /// Query over the tag collection matching `pattern` within this namespace.
    pub fn wildcard_query(&self, pattern: &str) -> Value {
        match self {
            TagNamespace::Plain => json!({
                "bool": {
                    "must": { "wildcard": { "_id": pattern } },
                    "must_not": { "wildcard": { "_id": format!("{}*", HTTP_HEADER_TAG_PREFIX) } }
                }
            }),
            TagNamespace::HttpHeader => json!({
                "wildcard": { "_id": self.tag_name(pattern) }
            }),
        }
    }
}

/// The query fields whose values are tag names on the client side and numeric ids on
/// the backend side. Facets with these names carry ids that must be mapped back.
#[derive(Debug, Clone)]
pub struct TagFieldSet {
    fields: BTreeMap<String, TagNamespace>,
}

impl Default for TagFieldSet {
    fn default() -> Self {
        Self::empty()
            .with_field("ta", TagNamespace::Plain)
            .with_field("hh", TagNamespace::HttpHeader)
            .with_field("hh1", TagNamespace::HttpHeader)
            .with_field("hh2", TagNamespace::HttpHeader)
    }
}

impl TagFieldSet {
    pub fn empty() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: &str, namespace: TagNamespace) -> Self {
        self.fields.insert(name.to_string(), namespace);
        self
    }

    pub fn namespace(&self, field: &str) -> Option<TagNamespace> {
        self.fields.get(field).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn parse(order: &str) -> Self {
        if order.eq_ignore_ascii_case("asc") {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    fn from_value(entry: &Value) -> Option<Self> {
        match entry {
            Value::String(field) => Some(SortKey {
                direction: if field == "_score" {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                },
                field: field.clone(),
            }),
            Value::Object(map) => {
                let (field, options) = map.iter().next()?;
                let direction = match options {
                    Value::String(order) => SortDirection::parse(order),
                    Value::Object(options) => options
                        .get("order")
                        .and_then(Value::as_str)
                        .map(SortDirection::parse)
                        .unwrap_or(SortDirection::Descending),
                    _ => SortDirection::Descending,
                };
                Some(SortKey {
                    field: field.clone(),
                    direction,
                })
            }
            _ => None,
        }
    }
}

/// The parts of a client query that drive merging: declared facets, sort and window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSpec {
    pub facets: Vec<(String, FacetKind)>,
    pub sort: Vec<SortKey>,
    pub from: Option<usize>,
    pub size: Option<usize>,
}

impl SearchSpec {
    pub fn parse(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| GatewayError::InvalidRequest(format!("query is not JSON: {}", e)))?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(query: &Value) -> Self {
        let facets = query
            .get("facets")
            .and_then(Value::as_object)
            .map(|facets| {
                facets
                    .iter()
                    .map(|(name, definition)| {
                        (name.clone(), FacetKind::from_definition(definition))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let sort = match query.get("sort") {
            Some(Value::Array(entries)) => entries.iter().filter_map(SortKey::from_value).collect(),
            Some(single) => SortKey::from_value(single).into_iter().collect(),
            None => Vec::new(),
        };

        Self {
            facets,
            sort,
            from: query.get("from").and_then(numeric_param).map(|n| n as usize),
            size: query.get("size").and_then(numeric_param).map(|n| n as usize),
        }
    }

    pub fn has_facets(&self) -> bool {
        !self.facets.is_empty()
    }

    /// Also declares each facet `result` reports (kind taken from its `_type`) that is not
    /// declared yet. Used when the client sent no query to read facets from.
    #[must_use]
    pub fn with_reported_facets(mut self, result: &Value) -> Self {
        let Some(facets) = result.get("facets").and_then(Value::as_object) else {
            return self;
        };
        for (name, facet) in facets {
            if self.facets.iter().any(|(declared, _)| declared == name) {
                continue;
            }
            if let Some(kind) = facet
                .get("_type")
                .and_then(Value::as_str)
                .and_then(FacetKind::from_type_tag)
            {
                self.facets.push((name.clone(), kind));
            }
        }
        self
    }
}

/// Reads a pagination parameter sent either as a JSON number or a numeric string.
pub fn numeric_param(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
