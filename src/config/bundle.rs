//! One-shot configuration bootstrap
//!
//! Runs schema → parse → derive exactly once and keeps every result as an
//! immutable value that can be shared by reference with any consumer.

use super::catalog::registry;
use super::cli::parse_args;
use super::derived::{
    derive_data_config, derive_eval_config, derive_loss_config, derive_model_config,
    derive_optimizer_config, derive_runtime_config, derive_schedule_config,
    derive_video_data_config, DataConfig, EvalConfig, LossConfig, ModelConfig, OptimizerConfig,
    RuntimeConfig, ScheduleConfig, VideoDataConfig, RANDOM_IDENTITY_SAMPLER, SAMPLER_OVERRIDE_ENV,
};
use super::parser::{parse, RawConfig};
use crate::error::Result;
use serde::Serialize;

/// Whether the sampler override variable is set, regardless of its value
pub fn sampler_override_present() -> bool {
    std::env::var_os(SAMPLER_OVERRIDE_ENV).is_some()
}

/// Every configuration derived from one validated `RawConfig`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigBundle {
    pub data: DataConfig,
    pub video: VideoDataConfig,
    pub optimizer: OptimizerConfig,
    pub model: ModelConfig,
    pub loss: LossConfig,
    pub schedule: ScheduleConfig,
    pub eval: EvalConfig,
    pub runtime: RuntimeConfig,
    #[serde(skip)]
    raw: RawConfig,
}

impl ConfigBundle {
    /// Derive all sub-configurations from `raw`
    pub fn derive(raw: RawConfig, sampler_override: bool) -> Result<Self> {
        let data = derive_data_config(&raw, sampler_override)?;
        let loss = derive_loss_config(&raw)?;

        if loss.uses_triplet() {
            if sampler_override {
                log::warn!(
                    "criterion `{}` uses triplet loss but ${} is set; keeping sampler `{}`",
                    loss.criterion,
                    SAMPLER_OVERRIDE_ENV,
                    data.train_sampler
                );
            } else {
                log::info!(
                    "criterion `{}` uses triplet loss; train sampler forced to {}",
                    loss.criterion,
                    RANDOM_IDENTITY_SAMPLER
                );
            }
        }

        Ok(Self {
            data,
            video: derive_video_data_config(&raw)?,
            optimizer: derive_optimizer_config(&raw)?,
            model: derive_model_config(&raw)?,
            loss,
            schedule: derive_schedule_config(&raw)?,
            eval: derive_eval_config(&raw)?,
            runtime: derive_runtime_config(&raw)?,
            raw,
        })
    }

    /// Run the full pipeline on command-line tokens
    ///
    /// The first token is the program name, as with `std::env::args`. A
    /// `--config` file, if given, is read and layered under the flags.
    pub fn from_args<I, T>(args: I, sampler_override: bool) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let registry = registry();
        let invocation = parse_args(args, registry)?;
        let raw = parse(&invocation.resolve_input()?, registry)?;
        Self::derive(raw, sampler_override)
    }

    /// The validated parameters the bundle was derived from
    pub fn raw(&self) -> &RawConfig {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::ParseError;
    use crate::error::Error;

    #[test]
    fn test_from_args_defaults() {
        let bundle =
            ConfigBundle::from_args(["reid-config", "-s", "market1501", "-t", "market1501"], false)
                .unwrap();
        assert_eq!(bundle.data.height, 256);
        assert_eq!(bundle.data.train_sampler, "");
        assert_eq!(bundle.optimizer.optim, "adam");
        assert_eq!(bundle.schedule.stepsize, vec![20, 40]);
        assert_eq!(bundle.raw().string("arch").unwrap(), "resnet50");
    }

    #[test]
    fn test_from_args_triplet() {
        let args = [
            "reid-config",
            "-s",
            "dukemtmcreid",
            "-t",
            "dukemtmcreid",
            "--criterion",
            "htri",
        ];
        let forced = ConfigBundle::from_args(args, false).unwrap();
        assert_eq!(forced.data.train_sampler, RANDOM_IDENTITY_SAMPLER);

        let kept = ConfigBundle::from_args(args, true).unwrap();
        assert_eq!(kept.data.train_sampler, "");
    }

    #[test]
    fn test_from_args_negative_integers() {
        let bundle = ConfigBundle::from_args(
            [
                "reid-config",
                "-s",
                "a",
                "-t",
                "a",
                "--seed",
                "-1",
                "--start-eval",
                "-1",
                "--stepsize",
                "-1",
                "20",
            ],
            false,
        )
        .unwrap();
        assert_eq!(bundle.runtime.seed, -1);
        assert_eq!(bundle.eval.start_eval, -1);
        assert_eq!(bundle.schedule.stepsize, vec![-1, 20]);
    }

    #[test]
    fn test_from_args_missing_required() {
        let err = ConfigBundle::from_args(["reid-config", "-t", "market1501"], false).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::MissingRequired { ref field }) if field == "source_names"
        ));
    }

    #[test]
    fn test_bundle_serializes_without_raw() {
        let bundle =
            ConfigBundle::from_args(["reid-config", "-s", "viper", "-t", "viper"], false).unwrap();
        let json = serde_json::to_value(&bundle).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert!(keys.iter().any(|k| *k == "data"));
        assert!(!keys.iter().any(|k| *k == "raw"));
    }
}
