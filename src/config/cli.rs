//! Command-line surface generated from the parameter registry
//!
//! The fixed options (`--config`, `--format`, `-v`, `-q`) come from the
//! derived [`Cli`]; one argument per registered parameter is appended with the
//! clap builder API. Clap only collects tokens here. Type, choice, and
//! cardinality checks happen in [`parse`](super::parser::parse), so the
//! command line and YAML files are validated identically.
//!
//! # Usage
//!
//! ```bash
//! reid-config -s market1501 -t market1501
//! reid-config -s market1501 -t market1501 dukemtmcreid --criterion htri --stepsize 20 40 60
//! reid-config --config abd.yaml --lr 0.0001 --format json
//! ```

use super::load::load_config;
use super::parser::{ParseError, RawInput};
use super::schema::{ParameterSpec, SchemaRegistry, ValueType};
use super::ConfigBundle;
use crate::error::{Error, Result};
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory, FromArgMatches, Parser};
use serde_json::Value as Json;
use std::path::PathBuf;

/// Options that are not training parameters
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "reid-config")]
#[command(version)]
#[command(
    about = "Validate multi-branch ReID training parameters and print the derived configuration"
)]
#[command(
    after_help = "Setting the `ns` environment variable (any value) keeps --train-sampler even for triplet criteria."
)]
pub struct Cli {
    /// YAML file supplying parameter values (command-line flags take precedence)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text, json, yaml)
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Default `env_logger` filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Output format for the derived configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            _ => Err(format!(
                "Unknown output format: {}. Valid formats: text, json, yaml",
                s
            )),
        }
    }
}

/// Parsed command line: fixed options plus the raw parameter tokens
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub cli: Cli,
    /// Parameter tokens given on the command line
    pub input: RawInput,
}

impl Invocation {
    /// Command-line input layered over the `--config` file, if any
    pub fn resolve_input(&self) -> Result<RawInput> {
        let base = match &self.cli.config {
            Some(path) => load_config(path)?,
            None => RawInput::new(),
        };
        Ok(base.merge(self.input.clone()))
    }
}

/// Full clap command: fixed options plus one argument per parameter
///
/// A repeated option replaces the earlier occurrence, so `-s a -s b` yields
/// `[b]`. Several values in one occurrence are kept together and left for
/// the parser to judge.
pub fn command(registry: &SchemaRegistry) -> Command {
    registry
        .all_specs()
        .iter()
        .fold(Cli::command().args_override_self(true), |cmd, spec| {
            cmd.arg(parameter_arg(spec))
        })
}

fn parameter_arg(spec: &ParameterSpec) -> Arg {
    let mut arg = Arg::new(spec.name().to_string())
        .long(spec.flag_name())
        .help(help_line(spec));
    if let Some(short) = spec.short_alias() {
        arg = arg.short(short);
    }

    let value_name = spec.name().to_uppercase();
    match spec.value_type() {
        ValueType::Flag => arg.action(ArgAction::SetTrue),
        ValueType::Int | ValueType::Float => arg
            .num_args(1..)
            .action(ArgAction::Set)
            .allow_negative_numbers(true)
            .value_name(value_name),
        ValueType::IntList => arg
            .num_args(0..)
            .action(ArgAction::Set)
            .allow_negative_numbers(true)
            .value_name(value_name),
        ValueType::Str => arg
            .num_args(1..)
            .action(ArgAction::Set)
            .value_name(value_name),
        ValueType::StrList => arg
            .num_args(0..)
            .action(ArgAction::Set)
            .value_name(value_name),
    }
}

fn help_line(spec: &ParameterSpec) -> String {
    let mut help = spec.help_text().to_string();
    let suffix = if spec.is_required() {
        Some("[required]".to_string())
    } else if spec.value_type() == ValueType::Flag {
        None
    } else {
        spec.default_value().map(|d| format!("[default: {d}]"))
    };
    if let Some(suffix) = suffix {
        if !help.is_empty() {
            help.push(' ');
        }
        help.push_str(&suffix);
    }
    if let Some(allowed) = spec.allowed_values() {
        help.push_str(&format!(" [possible values: {}]", allowed.join(" | ")));
    }
    help
}

/// Collect the parameter tokens actually given on the command line
pub fn input_from_matches(matches: &ArgMatches, registry: &SchemaRegistry) -> RawInput {
    let mut input = RawInput::new();
    for spec in registry.all_specs() {
        let id = spec.name();
        if spec.value_type() == ValueType::Flag {
            if matches.get_flag(id) {
                input.insert(id, Vec::new());
            }
            continue;
        }
        if matches.value_source(id) == Some(ValueSource::CommandLine) {
            let tokens = matches
                .get_many::<String>(id)
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            input.insert(id, tokens);
        }
    }
    input
}

/// Parse command-line tokens (first token is the program name)
pub fn parse_args<I, T>(
    args: I,
    registry: &SchemaRegistry,
) -> std::result::Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command(registry).try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    let input = input_from_matches(&matches, registry);
    Ok(Invocation { cli, input })
}

/// Turn a validation failure into a clap usage error
///
/// Exiting through the returned error prints the usage line and the message
/// to stderr and terminates with status 2.
pub fn usage_error(cmd: &mut Command, err: &ParseError) -> clap::Error {
    let kind = match err {
        ParseError::MissingRequired { .. } => ErrorKind::MissingRequiredArgument,
        ParseError::TypeMismatch { .. } => ErrorKind::ValueValidation,
        ParseError::InvalidChoice { .. } => ErrorKind::InvalidValue,
        ParseError::InvalidCardinality { .. } => ErrorKind::WrongNumberOfValues,
        ParseError::UnknownParameter { .. } => ErrorKind::UnknownArgument,
    };
    cmd.error(kind, err)
}

/// Render the derived configuration in the requested format
pub fn render(bundle: &ConfigBundle, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(bundle)
            .map_err(|e| Error::Serialization(format!("JSON serialization error: {e}"))),
        OutputFormat::Yaml => serde_yaml::to_string(bundle)
            .map_err(|e| Error::Serialization(format!("YAML serialization error: {e}"))),
        OutputFormat::Text => render_text(bundle),
    }
}

fn render_text(bundle: &ConfigBundle) -> Result<String> {
    let tree = serde_json::to_value(bundle)
        .map_err(|e| Error::Serialization(format!("JSON serialization error: {e}")))?;

    let mut out = String::new();
    if let Json::Object(sections) = tree {
        for (section, fields) in sections {
            out.push_str(&format!("[{section}]\n"));
            if let Json::Object(fields) = fields {
                for (name, value) in fields {
                    out.push_str(&format!("  {name}: {}\n", text_value(&value)));
                }
            }
        }
    }
    Ok(out)
}

fn text_value(value: &Json) -> String {
    match value {
        Json::Null => "-".to_string(),
        Json::String(s) if s.is_empty() => "\"\"".to_string(),
        Json::String(s) => s.clone(),
        Json::Array(items) => {
            let parts: Vec<String> = items.iter().map(text_value).collect();
            format!("[{}]", parts.join(", "))
        }
        other => other.to_string(),
    }
}
