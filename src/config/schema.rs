//! Parameter schema: typed parameter specs and the sealed registry
//!
//! Every recognized parameter is described by a [`ParameterSpec`]: its
//! canonical name, value type, default, and an optional choice set. Specs are
//! collected by a [`SchemaBuilder`], which rejects malformed or conflicting
//! entries, and then sealed into an immutable [`SchemaRegistry`].

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Registry construction error
///
/// These indicate a defect in the catalog itself, never bad user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Duplicate parameter name: {0}")]
    DuplicateName(String),

    #[error("Short alias -{short} of `{name}` is already taken")]
    DuplicateShort { short: char, name: String },

    #[error("Invalid default for `{name}`: {reason}")]
    InvalidDefault { name: String, reason: String },

    #[error("Choice set on non-string parameter `{0}`")]
    ChoicesOnNonString(String),
}

/// Scalar kind of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    String,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "boolean"),
            Self::Int => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "string"),
        }
    }
}

/// Whether a parameter takes a single value or an ordered list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Cardinality {
    Scalar,
    List,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "a single value"),
            Self::List => write!(f, "a list of values"),
        }
    }
}

/// Concrete value type of a parameter: kind and cardinality combined
///
/// Only the combinations the pipeline actually uses are representable, so a
/// boolean list can never be declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueType {
    /// Presence flag, `false` unless given
    Flag,
    Int,
    Float,
    Str,
    IntList,
    StrList,
}

impl ValueType {
    pub fn kind(self) -> ParamKind {
        match self {
            Self::Flag => ParamKind::Bool,
            Self::Int | Self::IntList => ParamKind::Int,
            Self::Float => ParamKind::Float,
            Self::Str | Self::StrList => ParamKind::String,
        }
    }

    pub fn cardinality(self) -> Cardinality {
        match self {
            Self::IntList | Self::StrList => Cardinality::List,
            Self::Flag | Self::Int | Self::Float | Self::Str => Cardinality::Scalar,
        }
    }
}

/// A typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    IntList(Vec<i64>),
    StrList(Vec<String>),
}

impl Value {
    /// The value type this value inhabits
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Flag,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Str(_) => ValueType::Str,
            Self::IntList(_) => ValueType::IntList,
            Self::StrList(_) => ValueType::StrList,
        }
    }

    /// String elements subject to a choice constraint
    pub(crate) fn choice_elements(&self) -> Vec<&str> {
        match self {
            Self::Str(s) => vec![s.as_str()],
            Self::StrList(items) => items.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) if s.is_empty() => write!(f, "\"\""),
            Self::Str(s) => write!(f, "{s}"),
            Self::IntList(items) => {
                let parts: Vec<String> = items.iter().map(i64::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::StrList(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Declaration of one recognized parameter
///
/// Constructed through the typed constructors so the default always matches
/// the declared type:
///
/// ```
/// use reid_config::config::ParameterSpec;
///
/// let height = ParameterSpec::int("height", 256).help("height of an image");
/// let sources = ParameterSpec::str_list("source_names", &[]).short('s').required();
/// assert!(sources.is_required());
/// assert_eq!(height.flag_name(), "height");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    name: String,
    value_type: ValueType,
    default: Option<Value>,
    required: bool,
    choices: Option<Vec<String>>,
    short: Option<char>,
    help: String,
}

impl ParameterSpec {
    fn new(name: &str, value_type: ValueType, default: Value) -> Self {
        Self {
            name: name.to_string(),
            value_type,
            default: Some(default),
            required: false,
            choices: None,
            short: None,
            help: String::new(),
        }
    }

    /// Boolean flag, `false` unless given
    pub fn flag(name: &str) -> Self {
        Self::new(name, ValueType::Flag, Value::Bool(false))
    }

    pub fn int(name: &str, default: i64) -> Self {
        Self::new(name, ValueType::Int, Value::Int(default))
    }

    pub fn float(name: &str, default: f64) -> Self {
        Self::new(name, ValueType::Float, Value::Float(default))
    }

    pub fn str(name: &str, default: &str) -> Self {
        Self::new(name, ValueType::Str, Value::Str(default.to_string()))
    }

    pub fn int_list(name: &str, default: &[i64]) -> Self {
        Self::new(name, ValueType::IntList, Value::IntList(default.to_vec()))
    }

    pub fn str_list(name: &str, default: &[&str]) -> Self {
        let items = default.iter().map(|s| s.to_string()).collect();
        Self::new(name, ValueType::StrList, Value::StrList(items))
    }

    /// Mark the parameter as required
    ///
    /// A required parameter has no default; input lacking it is rejected.
    pub fn required(mut self) -> Self {
        self.required = true;
        self.default = None;
        self
    }

    /// Restrict accepted values to a fixed set
    pub fn choices(mut self, allowed: &[&str]) -> Self {
        self.choices = Some(allowed.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Single-character command-line alias
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    /// Canonical name, e.g. `source_names`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Long command-line flag without the leading dashes, e.g. `source-names`
    pub fn flag_name(&self) -> String {
        self.name.replace('_', "-")
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn kind(&self) -> ParamKind {
        self.value_type.kind()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.value_type.cardinality()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn allowed_values(&self) -> Option<&[String]> {
        self.choices.as_deref()
    }

    pub fn short_alias(&self) -> Option<char> {
        self.short
    }

    pub fn help_text(&self) -> &str {
        &self.help
    }

    /// First element of `value` outside the choice set, if any
    pub fn choice_violation<'a>(&self, value: &'a Value) -> Option<&'a str> {
        let allowed = self.choices.as_ref()?;
        value
            .choice_elements()
            .into_iter()
            .find(|candidate| !allowed.iter().any(|a| a == candidate))
    }

    fn check(&self) -> Result<(), SchemaError> {
        if self.choices.is_some() && self.kind() != ParamKind::String {
            return Err(SchemaError::ChoicesOnNonString(self.name.clone()));
        }

        if let Some(default) = &self.default {
            if let Some(bad) = self.choice_violation(default) {
                return Err(SchemaError::InvalidDefault {
                    name: self.name.clone(),
                    reason: format!("`{bad}` is not an allowed value"),
                });
            }
        }

        Ok(())
    }
}

/// Collects parameter specs before sealing
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    specs: Vec<ParameterSpec>,
    index: HashMap<String, usize>,
    shorts: HashMap<char, String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter spec
    ///
    /// Fails if the name or short alias is already registered, or if the
    /// spec's default violates its own choice set.
    pub fn register(&mut self, spec: ParameterSpec) -> Result<&mut Self, SchemaError> {
        if self.index.contains_key(spec.name()) {
            return Err(SchemaError::DuplicateName(spec.name().to_string()));
        }
        if let Some(short) = spec.short_alias() {
            if self.shorts.contains_key(&short) {
                return Err(SchemaError::DuplicateShort {
                    short,
                    name: spec.name().to_string(),
                });
            }
        }
        spec.check()?;

        if let Some(short) = spec.short_alias() {
            self.shorts.insert(short, spec.name().to_string());
        }
        self.index.insert(spec.name().to_string(), self.specs.len());
        self.specs.push(spec);
        Ok(self)
    }

    /// Freeze the collected specs; no further registration is possible
    pub fn seal(self) -> SchemaRegistry {
        SchemaRegistry {
            specs: self.specs,
            index: self.index,
        }
    }
}

/// Immutable catalog of every recognized parameter
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    specs: Vec<ParameterSpec>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// All specs in registration order
    pub fn all_specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Specs that must be supplied explicitly
    pub fn required(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.specs.iter().filter(|s| s.is_required())
    }
}
