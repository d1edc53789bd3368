//! # Filter Engine
//!
//! A filter is a JSON object keyed by field name. Each value is either a
//! literal (string equality) or an operator object such as
//! `{"gt": 3, "lt": 10}`. A record matches when every field clause matches,
//! and every operator inside a clause must pass as well.
//!
//! A field missing from the record fails its clause whatever the operator.
//! Coercion failures exclude the record rather than raising errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::UnknownOperatorPolicy;
use super::errors::{QueryError, QueryResult};
use super::record::{coerce_f64, coerce_string, Record};

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// String equality
    Eq,
    /// Numeric greater than
    Gt,
    /// Numeric less than
    Lt,
    /// Membership in a list (native equality)
    In,
    /// Substring match on string forms
    Contains,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::In => "in",
            FilterOperator::Contains => "contains",
        }
    }

    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "eq" => Some(FilterOperator::Eq),
            "gt" => Some(FilterOperator::Gt),
            "lt" => Some(FilterOperator::Lt),
            "in" => Some(FilterOperator::In),
            "contains" => Some(FilterOperator::Contains),
            _ => None,
        }
    }

    /// Evaluate this operator against a present field value
    pub fn eval(&self, value: &Value, target: &Value) -> bool {
        match self {
            FilterOperator::Eq => coerce_string(value) == coerce_string(target),
            FilterOperator::Gt => match (coerce_f64(value), coerce_f64(target)) {
                (Some(v), Some(t)) => v > t,
                _ => false,
            },
            FilterOperator::Lt => match (coerce_f64(value), coerce_f64(target)) {
                (Some(v), Some(t)) => v < t,
                _ => false,
            },
            FilterOperator::In => target
                .as_array()
                .map(|items| items.iter().any(|item| native_eq(value, item)))
                .unwrap_or(false),
            FilterOperator::Contains => coerce_string(value).contains(&*coerce_string(target)),
        }
    }
}

/// JSON equality where integers and floats of equal magnitude are the same
fn native_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Right-hand side of a field clause
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `{"field": literal}`
    Literal(Value),
    /// `{"field": {"op": target, ...}}`
    Operators(Vec<(FilterOperator, Value)>),
}

/// One field's predicate
#[derive(Debug, Clone, PartialEq)]
pub struct FieldClause {
    pub field: String,
    pub condition: Condition,
}

impl FieldClause {
    pub fn matches(&self, record: &Record) -> bool {
        let value = match record.get(&self.field) {
            Some(v) => v,
            None => return false,
        };

        match &self.condition {
            Condition::Literal(literal) => FilterOperator::Eq.eval(value, literal),
            Condition::Operators(ops) => ops.iter().all(|(op, target)| op.eval(value, target)),
        }
    }
}

/// A conjunction of field clauses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<FieldClause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality-on-literal clause
    pub fn literal(mut self, field: impl Into<String>, value: Value) -> Self {
        self.clauses.push(FieldClause {
            field: field.into(),
            condition: Condition::Literal(value),
        });
        self
    }

    /// Add an operator clause
    pub fn op(mut self, field: impl Into<String>, op: FilterOperator, target: Value) -> Self {
        let field = field.into();
        if let Some(FieldClause {
            condition: Condition::Operators(ops),
            ..
        }) = self.clauses.iter_mut().find(|c| c.field == field)
        {
            ops.push((op, target));
            return self;
        }

        self.clauses.push(FieldClause {
            field,
            condition: Condition::Operators(vec![(op, target)]),
        });
        self
    }

    pub fn clauses(&self) -> &[FieldClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Parse the `filters` request parameter.
    ///
    /// Returns `Ok(None)` when the text is not JSON or not a JSON object; such
    /// filters are ignored rather than failing the request. Unknown operators
    /// follow `policy`.
    pub fn parse(text: &str, policy: UnknownOperatorPolicy) -> QueryResult<Option<Self>> {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(&value, policy),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring malformed filters parameter");
                Ok(None)
            }
        }
    }

    /// Build a filter from an already-decoded JSON value
    pub fn from_value(value: &Value, policy: UnknownOperatorPolicy) -> QueryResult<Option<Self>> {
        let object = match value.as_object() {
            Some(o) => o,
            None => {
                tracing::debug!("ignoring filters parameter that is not a JSON object");
                return Ok(None);
            }
        };

        let mut clauses = Vec::with_capacity(object.len());
        for (field, condition) in object {
            let condition = match condition {
                Value::Object(ops) => {
                    let mut parsed = Vec::with_capacity(ops.len());
                    for (name, target) in ops {
                        match FilterOperator::parse(name) {
                            Some(op) => parsed.push((op, target.clone())),
                            None => match policy {
                                UnknownOperatorPolicy::Ignore => {
                                    tracing::debug!(
                                        field = %field,
                                        operator = %name,
                                        "ignoring unknown filter operator"
                                    );
                                }
                                UnknownOperatorPolicy::Reject => {
                                    return Err(QueryError::BadRequest(format!(
                                        "unknown filter operator '{}' on field '{}'",
                                        name, field
                                    )));
                                }
                            },
                        }
                    }
                    Condition::Operators(parsed)
                }
                literal => Condition::Literal(literal.clone()),
            };

            clauses.push(FieldClause {
                field: field.clone(),
                condition,
            });
        }

        Ok(Some(Self { clauses }))
    }

    /// Check if a record satisfies every clause
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }
}
