//! YAML configuration files as an input source
//!
//! A config file is a flat mapping from parameter name to value:
//!
//! ```yaml
//! source-names: [market1501]
//! target_names: [market1501, dukemtmcreid]
//! criterion: htri
//! stepsize: [20, 40]
//! evaluate: true
//! ```
//!
//! Keys may use either underscore or dash spelling. Values are reduced to the
//! same token lists the command line produces, so both sources share one
//! validation path.

use super::parser::RawInput;
use crate::error::{Error, Result};
use serde_yaml::Value as Yaml;
use std::fs;
use std::path::Path;

/// Read a YAML config file into a `RawInput`
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RawInput> {
    let text = fs::read_to_string(path.as_ref()).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    input_from_yaml(&text)
}

/// Convert YAML text into a `RawInput`
pub fn input_from_yaml(text: &str) -> Result<RawInput> {
    let doc: Yaml = serde_yaml::from_str(text)
        .map_err(|e| Error::Serialization(format!("Failed to parse YAML config: {e}")))?;

    let mapping = match doc {
        Yaml::Mapping(mapping) => mapping,
        Yaml::Null => return Ok(RawInput::new()),
        _ => {
            return Err(Error::ConfigError(
                "Config file must be a mapping of parameter names to values".to_string(),
            ))
        }
    };

    let mut input = RawInput::new();
    for (key, value) in mapping {
        let name = match key {
            Yaml::String(s) => s.replace('-', "_"),
            other => {
                return Err(Error::ConfigError(format!(
                    "Parameter names must be strings, got {other:?}"
                )))
            }
        };
        let tokens = tokens_of(&name, value)?;
        input.insert(&name, tokens);
    }
    Ok(input)
}

fn tokens_of(name: &str, value: Yaml) -> Result<Vec<String>> {
    match value {
        Yaml::Null => Ok(Vec::new()),
        Yaml::Sequence(items) => items
            .into_iter()
            .map(|item| {
                scalar_token(&item).ok_or_else(|| {
                    Error::ConfigError(format!("`{name}`: list elements must be scalars"))
                })
            })
            .collect(),
        other => scalar_token(&other)
            .map(|token| vec![token])
            .ok_or_else(|| {
                Error::ConfigError(format!("`{name}`: nested mappings are not supported"))
            }),
    }
}

fn scalar_token(value: &Yaml) -> Option<String> {
    match value {
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::String(s) => Some(s.clone()),
        _ => None,
    }
}
