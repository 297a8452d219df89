//! Subsystem configurations derived from a `RawConfig`
//!
//! Each `derive_*` function is a pure projection: it reads the named fields
//! out of a validated `RawConfig` and nothing else. The only computed field is
//! `DataConfig::train_sampler`, whose value depends on the loss criterion and
//! on an override signal the caller probes from the environment.

use super::parser::{LookupError, RawConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable whose presence disables the forced identity sampler
pub const SAMPLER_OVERRIDE_ENV: &str = "ns";

/// Sampler forced for triplet-based criteria
pub const RANDOM_IDENTITY_SAMPLER: &str = "RandomIdentitySampler";

/// Substring marking a triplet-based criterion
const TRIPLET_CRITERION: &str = "htri";

/// Image data manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    pub source_names: Vec<String>,
    pub target_names: Vec<String>,
    pub root: PathBuf,
    pub split_id: i64,
    pub height: i64,
    pub width: i64,
    pub train_batch_size: i64,
    pub test_batch_size: i64,
    pub workers: i64,
    /// Effective sampler; see [`derive_data_config`]
    pub train_sampler: String,
    pub num_instances: i64,
    pub cuhk03_labeled: bool,
    pub cuhk03_classic_split: bool,
    pub data_augment: String,
}

/// Video data manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDataConfig {
    pub source_names: Vec<String>,
    pub target_names: Vec<String>,
    pub root: PathBuf,
    pub split_id: i64,
    pub height: i64,
    pub width: i64,
    pub train_batch_size: i64,
    pub test_batch_size: i64,
    pub workers: i64,
    /// Images sampled per tracklet
    pub seq_len: i64,
    pub sample_method: String,
}

/// Optimizer hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub optim: String,
    pub lr: f64,
    pub weight_decay: f64,
    pub momentum: f64,
    pub sgd_dampening: f64,
    pub sgd_nesterov: bool,
    pub rmsprop_alpha: f64,
    pub adam_beta1: f64,
    pub adam_beta2: f64,
}

/// Architecture composition handed to the model builder
///
/// Branch names and attention module names are passed through unchecked; the
/// model builder decides whether it recognizes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub arch: String,
    pub compatibility: bool,
    pub branches: Vec<String>,
    pub dropout: f64,

    pub global_dim: i64,
    pub global_max_pooling: bool,

    pub abd_dim: i64,
    pub abd_np: i64,
    pub abd_dan: Vec<String>,
    pub abd_dan_no_head: bool,
    pub shallow_cam: bool,

    pub np_dim: i64,
    pub np_np: i64,
    pub np_with_global: bool,
    pub np_max_pooling: bool,

    pub dan_dim: i64,
    pub dan_dan: Vec<String>,
    pub dan_dan_no_head: bool,

    /// Over-fitting regularizer
    pub use_of: bool,
    pub of_beta: f64,
    pub of_start_epoch: i64,
    pub of_position: Vec<String>,

    /// Over-weighting regularizer
    pub use_ow: bool,
    pub ow_beta: f64,
}

/// Loss selection and weighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossConfig {
    pub criterion: String,
    pub label_smooth: bool,
    pub margin: f64,
    pub num_instances: i64,
    pub htri_only: bool,
    pub lambda_xent: f64,
    pub lambda_htri: f64,
}

impl LossConfig {
    /// Whether the criterion includes a triplet loss
    pub fn uses_triplet(&self) -> bool {
        is_triplet_criterion(&self.criterion)
    }
}

/// Epoch schedule and fine-tuning control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub max_epoch: i64,
    pub start_epoch: i64,
    /// Learning rate decay epochs, in the order given
    pub stepsize: Vec<i64>,
    pub gamma: f64,
    pub fixbase: bool,
    pub fixbase_epoch: i64,
    pub open_layers: Vec<String>,
}

/// Evaluation controls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalConfig {
    pub evaluate: bool,
    /// `-1` evaluates only after the last epoch
    pub eval_freq: i64,
    pub start_eval: i64,
    pub flip_eval: bool,
    pub use_metric_cuhk03: bool,
    pub visualize_ranks: bool,
    pub pool_tracklet_features: String,
    pub load_weights: Option<PathBuf>,
}

/// Process-level settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub print_freq: i64,
    pub seed: i64,
    pub resume: Option<PathBuf>,
    pub save_dir: PathBuf,
    pub use_cpu: bool,
    pub gpu_devices: String,
    pub use_avai_gpus: bool,
}

fn is_triplet_criterion(criterion: &str) -> bool {
    criterion.contains(TRIPLET_CRITERION)
}

fn strings(raw: &RawConfig, name: &str) -> Result<Vec<String>, LookupError> {
    raw.string_list(name).map(<[String]>::to_vec)
}

fn optional_path(raw: &RawConfig, name: &str) -> Result<Option<PathBuf>, LookupError> {
    let value = raw.string(name)?;
    Ok((!value.is_empty()).then(|| PathBuf::from(value)))
}

/// Effective training sampler
///
/// Triplet criteria need identity-balanced batches, so the identity sampler
/// is forced unless `sampler_override` is set. Otherwise the configured
/// sampler passes through verbatim, empty string included.
pub fn effective_train_sampler(
    criterion: &str,
    configured: &str,
    sampler_override: bool,
) -> String {
    if !is_triplet_criterion(criterion) || sampler_override {
        configured.to_string()
    } else {
        RANDOM_IDENTITY_SAMPLER.to_string()
    }
}

/// Project the image data manager configuration
pub fn derive_data_config(
    raw: &RawConfig,
    sampler_override: bool,
) -> Result<DataConfig, LookupError> {
    Ok(DataConfig {
        source_names: strings(raw, "source_names")?,
        target_names: strings(raw, "target_names")?,
        root: PathBuf::from(raw.string("root")?),
        split_id: raw.int("split_id")?,
        height: raw.int("height")?,
        width: raw.int("width")?,
        train_batch_size: raw.int("train_batch_size")?,
        test_batch_size: raw.int("test_batch_size")?,
        workers: raw.int("workers")?,
        train_sampler: effective_train_sampler(
            raw.string("criterion")?,
            raw.string("train_sampler")?,
            sampler_override,
        ),
        num_instances: raw.int("num_instances")?,
        cuhk03_labeled: raw.bool("cuhk03_labeled")?,
        cuhk03_classic_split: raw.bool("cuhk03_classic_split")?,
        data_augment: raw.string("data_augment")?.to_string(),
    })
}

/// Project the video data manager configuration
pub fn derive_video_data_config(raw: &RawConfig) -> Result<VideoDataConfig, LookupError> {
    Ok(VideoDataConfig {
        source_names: strings(raw, "source_names")?,
        target_names: strings(raw, "target_names")?,
        root: PathBuf::from(raw.string("root")?),
        split_id: raw.int("split_id")?,
        height: raw.int("height")?,
        width: raw.int("width")?,
        train_batch_size: raw.int("train_batch_size")?,
        test_batch_size: raw.int("test_batch_size")?,
        workers: raw.int("workers")?,
        seq_len: raw.int("seq_len")?,
        sample_method: raw.string("sample_method")?.to_string(),
    })
}

/// Project the optimizer hyperparameters
pub fn derive_optimizer_config(raw: &RawConfig) -> Result<OptimizerConfig, LookupError> {
    Ok(OptimizerConfig {
        optim: raw.string("optim")?.to_string(),
        lr: raw.float("lr")?,
        weight_decay: raw.float("weight_decay")?,
        momentum: raw.float("momentum")?,
        sgd_dampening: raw.float("sgd_dampening")?,
        sgd_nesterov: raw.bool("sgd_nesterov")?,
        rmsprop_alpha: raw.float("rmsprop_alpha")?,
        adam_beta1: raw.float("adam_beta1")?,
        adam_beta2: raw.float("adam_beta2")?,
    })
}

/// Project the architecture composition
pub fn derive_model_config(raw: &RawConfig) -> Result<ModelConfig, LookupError> {
    Ok(ModelConfig {
        arch: raw.string("arch")?.to_string(),
        compatibility: raw.bool("compatibility")?,
        branches: strings(raw, "branches")?,
        dropout: raw.float("dropout")?,
        global_dim: raw.int("global_dim")?,
        global_max_pooling: raw.bool("global_max_pooling")?,
        abd_dim: raw.int("abd_dim")?,
        abd_np: raw.int("abd_np")?,
        abd_dan: strings(raw, "abd_dan")?,
        abd_dan_no_head: raw.bool("abd_dan_no_head")?,
        shallow_cam: raw.bool("shallow_cam")?,
        np_dim: raw.int("np_dim")?,
        np_np: raw.int("np_np")?,
        np_with_global: raw.bool("np_with_global")?,
        np_max_pooling: raw.bool("np_max_pooling")?,
        dan_dim: raw.int("dan_dim")?,
        dan_dan: strings(raw, "dan_dan")?,
        dan_dan_no_head: raw.bool("dan_dan_no_head")?,
        use_of: raw.bool("use_of")?,
        of_beta: raw.float("of_beta")?,
        of_start_epoch: raw.int("of_start_epoch")?,
        of_position: strings(raw, "of_position")?,
        use_ow: raw.bool("use_ow")?,
        ow_beta: raw.float("ow_beta")?,
    })
}

pub fn derive_loss_config(raw: &RawConfig) -> Result<LossConfig, LookupError> {
    Ok(LossConfig {
        criterion: raw.string("criterion")?.to_string(),
        label_smooth: raw.bool("label_smooth")?,
        margin: raw.float("margin")?,
        num_instances: raw.int("num_instances")?,
        htri_only: raw.bool("htri_only")?,
        lambda_xent: raw.float("lambda_xent")?,
        lambda_htri: raw.float("lambda_htri")?,
    })
}

pub fn derive_schedule_config(raw: &RawConfig) -> Result<ScheduleConfig, LookupError> {
    Ok(ScheduleConfig {
        max_epoch: raw.int("max_epoch")?,
        start_epoch: raw.int("start_epoch")?,
        stepsize: raw.int_list("stepsize")?.to_vec(),
        gamma: raw.float("gamma")?,
        fixbase: raw.bool("fixbase")?,
        fixbase_epoch: raw.int("fixbase_epoch")?,
        open_layers: strings(raw, "open_layers")?,
    })
}

pub fn derive_eval_config(raw: &RawConfig) -> Result<EvalConfig, LookupError> {
    Ok(EvalConfig {
        evaluate: raw.bool("evaluate")?,
        eval_freq: raw.int("eval_freq")?,
        start_eval: raw.int("start_eval")?,
        flip_eval: raw.bool("flip_eval")?,
        use_metric_cuhk03: raw.bool("use_metric_cuhk03")?,
        visualize_ranks: raw.bool("visualize_ranks")?,
        pool_tracklet_features: raw.string("pool_tracklet_features")?.to_string(),
        load_weights: optional_path(raw, "load_weights")?,
    })
}

pub fn derive_runtime_config(raw: &RawConfig) -> Result<RuntimeConfig, LookupError> {
    Ok(RuntimeConfig {
        print_freq: raw.int("print_freq")?,
        seed: raw.int("seed")?,
        resume: optional_path(raw, "resume")?,
        save_dir: PathBuf::from(raw.string("save_dir")?),
        use_cpu: raw.bool("use_cpu")?,
        gpu_devices: raw.string("gpu_devices")?.to_string(),
        use_avai_gpus: raw.bool("use_avai_gpus")?,
    })
}
