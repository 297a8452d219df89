//! Parameter schema, parsing, and configuration derivation
//!
//! The pipeline runs once per process:
//!
//! ```text
//! tokens / YAML ──► RawInput ──parse()──► RawConfig ──derive_*()──► DataConfig, OptimizerConfig, ...
//!                                  ▲
//!                           SchemaRegistry
//! ```
//!
//! # Example
//!
//! ```
//! use reid_config::config::{derive_data_config, parse, registry, RawInput};
//!
//! let input = RawInput::new()
//!     .with("source_names", ["market1501"])
//!     .with("target_names", ["market1501"])
//!     .with("criterion", ["htri"]);
//! let raw = parse(&input, registry()).unwrap();
//!
//! let data = derive_data_config(&raw, false).unwrap();
//! assert_eq!(data.train_sampler, "RandomIdentitySampler");
//! ```

mod bundle;
mod catalog;
mod cli;
mod derived;
mod load;
mod parser;
mod schema;

#[cfg(test)]
mod tests;


pub use bundle::{sampler_override_present, ConfigBundle};
pub use catalog::{build_registry, registry, DATA_AUGMENT_CHOICES, POOL_TRACKLET_CHOICES};
pub use cli::{
    command, input_from_matches, parse_args, render, usage_error, Cli, Invocation, OutputFormat,
};
pub use derived::{
    derive_data_config, derive_eval_config, derive_loss_config, derive_model_config,
    derive_optimizer_config, derive_runtime_config, derive_schedule_config,
    derive_video_data_config, effective_train_sampler, DataConfig, EvalConfig, LossConfig,
    ModelConfig, OptimizerConfig, RuntimeConfig, ScheduleConfig, VideoDataConfig,
    RANDOM_IDENTITY_SAMPLER, SAMPLER_OVERRIDE_ENV,
};
pub use load::{input_from_yaml, load_config};
pub use parser::{parse, LookupError, ParseError, RawConfig, RawInput};
pub use schema::{
    Cardinality, ParamKind, ParameterSpec, SchemaBuilder, SchemaError, SchemaRegistry, Value,
    ValueType,
};
