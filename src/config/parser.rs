//! Validation of raw input into an immutable, total `RawConfig`

use super::schema::{Cardinality, ParamKind, ParameterSpec, SchemaRegistry, Value, ValueType};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Input validation error
///
/// Parsing is fail-fast: the first violation found in registry order is
/// reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing required parameter `{field}` (--{})", .field.replace('_', "-"))]
    MissingRequired { field: String },

    #[error("invalid {expected} value `{value}` for `{field}`")]
    TypeMismatch {
        field: String,
        expected: ParamKind,
        value: String,
    },

    #[error("invalid choice `{value}` for `{field}` (choose from {})", .allowed.join(", "))]
    InvalidChoice {
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("`{field}` expects {expected}, got {count} value(s)")]
    InvalidCardinality {
        field: String,
        expected: Cardinality,
        count: usize,
    },

    #[error("unknown parameter `{field}`")]
    UnknownParameter { field: String },
}

impl ParseError {
    /// Name of the offending parameter
    pub fn field(&self) -> &str {
        match self {
            Self::MissingRequired { field }
            | Self::TypeMismatch { field, .. }
            | Self::InvalidChoice { field, .. }
            | Self::InvalidCardinality { field, .. }
            | Self::UnknownParameter { field } => field,
        }
    }
}

/// Typed access error on a `RawConfig`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("parameter `{0}` is not present in the configuration")]
    Missing(String),

    #[error("parameter `{field}` is not {expected:?}")]
    WrongType { field: String, expected: ValueType },
}

/// Unvalidated input: canonical parameter name to the tokens supplied for it
///
/// A flag given without a value is stored with no tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInput {
    values: BTreeMap<String, Vec<String>>,
}

impl RawInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply tokens for a parameter, replacing earlier ones
    pub fn with<I, S>(mut self, name: &str, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(name, tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Supply a bare flag
    pub fn with_flag(mut self, name: &str) -> Self {
        self.insert(name, Vec::new());
        self
    }

    pub(crate) fn insert(&mut self, name: &str, tokens: Vec<String>) {
        self.values.insert(name.to_string(), tokens);
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.values.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Layer `overrides` on top of this input; overriding entries win
    pub fn merge(mut self, overrides: RawInput) -> Self {
        self.values.extend(overrides.values);
        self
    }
}

/// Validated configuration: every registered parameter mapped to a typed value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawConfig {
    values: BTreeMap<String, Value>,
}

impl RawConfig {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn lookup(&self, name: &str) -> Result<&Value, LookupError> {
        self.values
            .get(name)
            .ok_or_else(|| LookupError::Missing(name.to_string()))
    }

    fn wrong_type(name: &str, expected: ValueType) -> LookupError {
        LookupError::WrongType {
            field: name.to_string(),
            expected,
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool, LookupError> {
        match self.lookup(name)? {
            Value::Bool(b) => Ok(*b),
            _ => Err(Self::wrong_type(name, ValueType::Flag)),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64, LookupError> {
        match self.lookup(name)? {
            Value::Int(i) => Ok(*i),
            _ => Err(Self::wrong_type(name, ValueType::Int)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, LookupError> {
        match self.lookup(name)? {
            Value::Float(x) => Ok(*x),
            _ => Err(Self::wrong_type(name, ValueType::Float)),
        }
    }

    pub fn string(&self, name: &str) -> Result<&str, LookupError> {
        match self.lookup(name)? {
            Value::Str(s) => Ok(s),
            _ => Err(Self::wrong_type(name, ValueType::Str)),
        }
    }

    pub fn int_list(&self, name: &str) -> Result<&[i64], LookupError> {
        match self.lookup(name)? {
            Value::IntList(items) => Ok(items),
            _ => Err(Self::wrong_type(name, ValueType::IntList)),
        }
    }

    pub fn string_list(&self, name: &str) -> Result<&[String], LookupError> {
        match self.lookup(name)? {
            Value::StrList(items) => Ok(items),
            _ => Err(Self::wrong_type(name, ValueType::StrList)),
        }
    }
}

/// Validate `input` against `registry`, producing a total `RawConfig`
///
/// For each registered parameter, in registration order: take the supplied
/// tokens or fall back to the default, coerce them to the declared type,
/// check cardinality, then check the choice set.
pub fn parse(input: &RawInput, registry: &SchemaRegistry) -> Result<RawConfig, ParseError> {
    if let Some(unknown) = input.names().find(|name| !registry.contains(name)) {
        return Err(ParseError::UnknownParameter {
            field: unknown.to_string(),
        });
    }

    let mut values = BTreeMap::new();
    for spec in registry.all_specs() {
        let value = match input.get(spec.name()) {
            Some(tokens) => coerce(spec, tokens)?,
            None => match spec.default_value() {
                Some(default) => {
                    log::debug!("{}: using default {}", spec.name(), default);
                    default.clone()
                }
                None => {
                    return Err(ParseError::MissingRequired {
                        field: spec.name().to_string(),
                    })
                }
            },
        };

        if let Some(bad) = spec.choice_violation(&value) {
            return Err(ParseError::InvalidChoice {
                field: spec.name().to_string(),
                value: bad.to_string(),
                allowed: spec.allowed_values().unwrap_or_default().to_vec(),
            });
        }

        values.insert(spec.name().to_string(), value);
    }

    Ok(RawConfig { values })
}

fn coerce(spec: &ParameterSpec, tokens: &[String]) -> Result<Value, ParseError> {
    let cardinality_error = || ParseError::InvalidCardinality {
        field: spec.name().to_string(),
        expected: spec.cardinality(),
        count: tokens.len(),
    };

    match spec.value_type() {
        ValueType::Flag => match tokens {
            [] => Ok(Value::Bool(true)),
            [token] => parse_bool(token)
                .map(Value::Bool)
                .ok_or_else(|| type_mismatch(spec, token)),
            _ => Err(cardinality_error()),
        },
        ValueType::Int | ValueType::Float | ValueType::Str => match tokens {
            [token] => coerce_scalar(spec, token),
            _ => Err(cardinality_error()),
        },
        ValueType::IntList | ValueType::StrList => {
            if tokens.is_empty() && spec.is_required() {
                return Err(cardinality_error());
            }
            coerce_list(spec, tokens)
        }
    }
}

fn coerce_scalar(spec: &ParameterSpec, token: &str) -> Result<Value, ParseError> {
    match spec.kind() {
        ParamKind::Int => parse_int(token)
            .map(Value::Int)
            .ok_or_else(|| type_mismatch(spec, token)),
        ParamKind::Float => token
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| type_mismatch(spec, token)),
        ParamKind::String => Ok(Value::Str(token.to_string())),
        ParamKind::Bool => parse_bool(token)
            .map(Value::Bool)
            .ok_or_else(|| type_mismatch(spec, token)),
    }
}

fn coerce_list(spec: &ParameterSpec, tokens: &[String]) -> Result<Value, ParseError> {
    match spec.kind() {
        ParamKind::Int => tokens
            .iter()
            .map(|t| parse_int(t).ok_or_else(|| type_mismatch(spec, t)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::IntList),
        _ => Ok(Value::StrList(tokens.to_vec())),
    }
}

fn parse_int(token: &str) -> Option<i64> {
    token.trim().parse::<i64>().ok()
}

fn parse_bool(token: &str) -> Option<bool> {
    match token.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn type_mismatch(spec: &ParameterSpec, token: &str) -> ParseError {
    ParseError::TypeMismatch {
        field: spec.name().to_string(),
        expected: spec.kind(),
        value: token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::registry;

    fn minimal() -> RawInput {
        RawInput::new()
            .with("source_names", ["market1501"])
            .with("target_names", ["market1501"])
    }

    #[test]
    fn test_defaults_fill_every_parameter() {
        let raw = parse(&minimal(), registry()).unwrap();
        assert_eq!(raw.len(), registry().len());
        assert_eq!(raw.int("height").unwrap(), 256);
        assert_eq!(raw.string("criterion").unwrap(), "xent");
        assert_eq!(raw.int_list("stepsize").unwrap(), &[20, 40]);
        assert!(!raw.bool("evaluate").unwrap());
    }

    #[test]
    fn test_missing_source_names() {
        let input = RawInput::new().with("target_names", ["dukemtmcreid"]);
        let err = parse(&input, registry()).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingRequired {
                field: "source_names".to_string()
            }
        );
    }

    #[test]
    fn test_missing_target_names() {
        let input = RawInput::new().with("source_names", ["market1501"]);
        let err = parse(&input, registry()).unwrap_err();
        assert!(matches!(err, ParseError::MissingRequired { ref field } if field == "target_names"));
    }

    #[test]
    fn test_empty_required_list_rejected() {
        let input = minimal().with("source_names", Vec::<String>::new());
        let err = parse(&input, registry()).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidCardinality {
                expected: Cardinality::List,
                count: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_optional_list_accepts_zero_values() {
        let input = minimal().with("abd_dan", Vec::<String>::new());
        let raw = parse(&input, registry()).unwrap();
        assert!(raw.string_list("abd_dan").unwrap().is_empty());
    }

    #[test]
    fn test_type_mismatch_int() {
        let input = minimal().with("height", ["tall"]);
        let err = parse(&input, registry()).unwrap_err();
        assert_eq!(
            err,
            ParseError::TypeMismatch {
                field: "height".to_string(),
                expected: ParamKind::Int,
                value: "tall".to_string(),
            }
        );
    }

    #[test]
    fn test_type_mismatch_float() {
        let input = minimal().with("lr", ["fast"]);
        let err = parse(&input, registry()).unwrap_err();
        assert!(matches!(err, ParseError::TypeMismatch { expected: ParamKind::Float, .. }));
    }

    #[test]
    fn test_type_mismatch_inside_list() {
        let input = minimal().with("stepsize", ["10", "x", "30"]);
        let err = parse(&input, registry()).unwrap_err();
        assert!(matches!(err, ParseError::TypeMismatch { ref value, .. } if value == "x"));
    }

    #[test]
    fn test_scalar_rejects_multiple_values() {
        let input = minimal().with("width", ["128", "64"]);
        let err = parse(&input, registry()).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidCardinality {
                field: "width".to_string(),
                expected: Cardinality::Scalar,
                count: 2,
            }
        );
    }

    #[test]
    fn test_invalid_choice() {
        let input = minimal().with("data_augment", ["flip"]);
        let err = parse(&input, registry()).unwrap_err();
        match err {
            ParseError::InvalidChoice {
                field,
                value,
                allowed,
            } => {
                assert_eq!(field, "data_augment");
                assert_eq!(value, "flip");
                assert_eq!(allowed.len(), 7);
            }
            other => panic!("Expected InvalidChoice, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_choice_accepted() {
        let input = minimal().with("pool_tracklet_features", ["max"]);
        let raw = parse(&input, registry()).unwrap();
        assert_eq!(raw.string("pool_tracklet_features").unwrap(), "max");
    }

    #[test]
    fn test_unknown_parameter() {
        let input = minimal().with("learning_rate", ["0.1"]);
        let err = parse(&input, registry()).unwrap_err();
        assert_eq!(err.field(), "learning_rate");
        assert!(matches!(err, ParseError::UnknownParameter { .. }));
    }

    #[test]
    fn test_flag_forms() {
        let raw = parse(&minimal().with_flag("evaluate"), registry()).unwrap();
        assert!(raw.bool("evaluate").unwrap());

        let raw = parse(&minimal().with("use_cpu", ["false"]), registry()).unwrap();
        assert!(!raw.bool("use_cpu").unwrap());

        let err = parse(&minimal().with("use_cpu", ["maybe"]), registry()).unwrap_err();
        assert!(matches!(err, ParseError::TypeMismatch { expected: ParamKind::Bool, .. }));
    }

    #[test]
    fn test_negative_numbers_parse() {
        let raw = parse(&minimal().with("eval_freq", ["-1"]), registry()).unwrap();
        assert_eq!(raw.int("eval_freq").unwrap(), -1);
    }

    #[test]
    fn test_stepsize_order_preserved() {
        let raw = parse(&minimal().with("stepsize", ["25", "5", "15", "5"]), registry()).unwrap();
        assert_eq!(raw.int_list("stepsize").unwrap(), &[25, 5, 15, 5]);
    }

    #[test]
    fn test_merge_overrides_win() {
        let base = minimal().with("height", ["384"]).with("width", ["192"]);
        let merged = base.merge(RawInput::new().with("height", ["512"]));
        assert_eq!(merged.get("height").unwrap(), &["512".to_string()]);
        assert_eq!(merged.get("width").unwrap(), &["192".to_string()]);
    }

    #[test]
    fn test_lookup_errors() {
        let raw = parse(&minimal().with("seed", ["-3"]), registry()).unwrap();
        assert!(matches!(raw.string("height"), Err(LookupError::WrongType { .. })));
        assert!(matches!(raw.int("nope"), Err(LookupError::Missing(_))));
        assert_eq!(raw.int("seed"), Ok(-3));
    }

    #[test]
    fn test_error_messages_name_the_field() {
        let err = parse(&RawInput::new(), registry()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required parameter `source_names` (--source-names)"
        );

        let err = parse(&minimal().with("pool_tracklet_features", ["sum"]), registry()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid choice `sum` for `pool_tracklet_features` (choose from avg, max)"
        );
    }
}
