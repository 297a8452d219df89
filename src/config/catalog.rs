//! The ReID training parameter catalog
//!
//! Registration order here is the order parameters are validated in, shown in
//! `--help`, and printed by the text output.

use super::schema::{ParameterSpec, SchemaError, SchemaRegistry};
use once_cell::sync::Lazy;

/// Allowed `--data-augment` combinations
pub const DATA_AUGMENT_CHOICES: [&str; 7] = [
    "none",
    "crop",
    "random-erase",
    "color-jitter",
    "crop,random-erase",
    "crop,color-jitter",
    "crop,color-jitter,random-erase",
];

/// Allowed `--pool-tracklet-features` strategies
pub const POOL_TRACKLET_CHOICES: [&str; 2] = ["avg", "max"];

static REGISTRY: Lazy<SchemaRegistry> = Lazy::new(|| {
    build_registry().expect("built-in parameter catalog must not contain conflicting entries")
});

/// Process-wide registry, built on first use and shared afterwards
pub fn registry() -> &'static SchemaRegistry {
    &REGISTRY
}

/// Build a fresh, sealed registry holding the full catalog
pub fn build_registry() -> Result<SchemaRegistry, SchemaError> {
    let mut builder = SchemaRegistry::builder();
    for spec in catalog() {
        builder.register(spec)?;
    }
    Ok(builder.seal())
}

fn catalog() -> Vec<ParameterSpec> {
    let mut specs = Vec::with_capacity(80);
    specs.extend(dataset_params());
    specs.extend(video_params());
    specs.extend(cuhk03_params());
    specs.extend(optimizer_params());
    specs.extend(schedule_params());
    specs.extend(loss_params());
    specs.push(
        ParameterSpec::str("arch", "resnet50")
            .short('a')
            .help("backbone architecture"),
    );
    specs.extend(eval_params());
    specs.extend(runtime_params());
    specs.extend(branch_params());
    specs
}

fn dataset_params() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::str("root", "data").help("root path to data directory"),
        ParameterSpec::str_list("source_names", &[])
            .short('s')
            .required()
            .help("source datasets (delimited by space)"),
        ParameterSpec::str_list("target_names", &[])
            .short('t')
            .required()
            .help("target datasets (delimited by space)"),
        ParameterSpec::int("workers", 4)
            .short('j')
            .help("number of data loading workers"),
        ParameterSpec::int("height", 256).help("height of an image"),
        ParameterSpec::int("width", 128).help("width of an image"),
        ParameterSpec::int("split_id", 0).help("split index (0-based)"),
        ParameterSpec::str("train_sampler", "").help("sampler for the training loader"),
        ParameterSpec::str("data_augment", "crop")
            .choices(&DATA_AUGMENT_CHOICES)
            .help("training-time augmentation combination"),
    ]
}

fn video_params() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::int("seq_len", 15).help("number of images to sample in a tracklet"),
        ParameterSpec::str("sample_method", "evenly")
            .help("how to sample images from a tracklet"),
        ParameterSpec::str("pool_tracklet_features", "avg")
            .choices(&POOL_TRACKLET_CHOICES)
            .help("how to pool features over a tracklet"),
    ]
}

fn cuhk03_params() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::flag("cuhk03_labeled")
            .help("use labeled images instead of detected images"),
        ParameterSpec::flag("cuhk03_classic_split").help("use the classic CUHK03 split"),
        ParameterSpec::flag("use_metric_cuhk03").help("use the CUHK03 metric for evaluation"),
    ]
}

fn optimizer_params() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::str("optim", "adam").help("optimization algorithm"),
        ParameterSpec::float("lr", 0.0003).help("initial learning rate"),
        ParameterSpec::float("weight_decay", 5e-4).help("weight decay"),
        ParameterSpec::float("momentum", 0.9).help("momentum factor for sgd and rmsprop"),
        ParameterSpec::float("sgd_dampening", 0.0).help("dampening for sgd momentum"),
        ParameterSpec::flag("sgd_nesterov").help("enable Nesterov momentum for sgd"),
        ParameterSpec::float("rmsprop_alpha", 0.99).help("rmsprop smoothing constant"),
        ParameterSpec::float("adam_beta1", 0.9)
            .help("exponential decay rate for adam's first moment"),
        ParameterSpec::float("adam_beta2", 0.999)
            .help("exponential decay rate for adam's second moment"),
    ]
}

fn schedule_params() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::int("max_epoch", 60).help("maximum epochs to run"),
        ParameterSpec::int("start_epoch", 0).help("manual epoch number (useful on restart)"),
        ParameterSpec::int_list("stepsize", &[20, 40])
            .help("epochs at which to decay the learning rate"),
        ParameterSpec::float("gamma", 0.1).help("learning rate decay factor"),
        ParameterSpec::int("train_batch_size", 32).help("training batch size"),
        ParameterSpec::int("test_batch_size", 100).help("test batch size"),
        ParameterSpec::flag("fixbase").help("always keep the base network frozen"),
        ParameterSpec::int("fixbase_epoch", 10)
            .help("epochs to train only the newly initialized layers"),
        ParameterSpec::str_list("open_layers", &["classifier"])
            .help("layers left trainable while the rest is frozen"),
    ]
}

fn loss_params() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::str("criterion", "xent").help("training loss identifier"),
        ParameterSpec::flag("label_smooth")
            .help("use label smoothing in the cross entropy loss"),
        ParameterSpec::float("margin", 0.3).help("margin for triplet loss"),
        ParameterSpec::int("num_instances", 4).help("number of instances per identity"),
        ParameterSpec::flag("htri_only").help("only use hard triplet loss"),
        ParameterSpec::float("lambda_xent", 1.0).help("weight of the cross entropy loss"),
        ParameterSpec::float("lambda_htri", 0.1).help("weight of the hard triplet loss"),
    ]
}

fn eval_params() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::str("load_weights", "")
            .help("pretrained weights to load, skipping layers that do not match in size"),
        ParameterSpec::flag("evaluate").help("evaluate only"),
        ParameterSpec::int("eval_freq", -1)
            .help("evaluation frequency in epochs (-1 evaluates only at the end)"),
        ParameterSpec::int("start_eval", 0).help("first epoch after which to evaluate"),
        ParameterSpec::flag("flip_eval").help("also evaluate horizontally flipped images"),
    ]
}

fn runtime_params() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::int("print_freq", 10).help("print frequency"),
        ParameterSpec::int("seed", 1).help("manual seed"),
        ParameterSpec::str("resume", "").help("checkpoint to resume from"),
        ParameterSpec::str("save_dir", "log").help("directory for logs and model weights"),
        ParameterSpec::flag("use_cpu").help("use cpu"),
        ParameterSpec::str("gpu_devices", "0").help("gpu device ids for CUDA_VISIBLE_DEVICES"),
        ParameterSpec::flag("use_avai_gpus")
            .help("use available gpus instead of the specified devices"),
        ParameterSpec::flag("visualize_ranks")
            .help("visualize ranked results (evaluation mode only)"),
    ]
}

fn branch_params() -> Vec<ParameterSpec> {
    vec![
        ParameterSpec::flag("compatibility"),
        ParameterSpec::str_list("branches", &["global", "abd"])
            .help("architecture branches to build"),
        ParameterSpec::float("dropout", 0.5),
        ParameterSpec::int("global_dim", 1024),
        ParameterSpec::flag("global_max_pooling"),
        ParameterSpec::int("abd_dim", 1024),
        ParameterSpec::int("abd_np", 2),
        ParameterSpec::str_list("abd_dan", &[]),
        ParameterSpec::flag("abd_dan_no_head"),
        ParameterSpec::flag("shallow_cam"),
        ParameterSpec::int("np_dim", 1024),
        ParameterSpec::int("np_np", 2),
        ParameterSpec::flag("np_with_global"),
        ParameterSpec::flag("np_max_pooling"),
        ParameterSpec::int("dan_dim", 1024),
        ParameterSpec::str_list("dan_dan", &[]),
        ParameterSpec::flag("dan_dan_no_head"),
        ParameterSpec::flag("use_of").help("enable the over-fitting regularizer"),
        ParameterSpec::float("of_beta", 1e-6),
        ParameterSpec::int("of_start_epoch", 23),
        ParameterSpec::str_list(
            "of_position",
            &["before", "after", "cam", "pam", "intermediate"],
        ),
        ParameterSpec::flag("use_ow").help("enable the over-weighting regularizer"),
        ParameterSpec::float("ow_beta", 1e-3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ParamKind, Value, ValueType};

    #[test]
    fn test_catalog_builds() {
        let registry = build_registry().unwrap();
        assert_eq!(registry.len(), 77);
    }

    #[test]
    fn test_shared_registry_is_built_once() {
        let a = registry() as *const SchemaRegistry;
        let b = registry() as *const SchemaRegistry;
        assert_eq!(a, b);
    }

    #[test]
    fn test_only_dataset_names_are_required() {
        let required: Vec<&str> = registry().required().map(|s| s.name()).collect();
        assert_eq!(required, vec!["source_names", "target_names"]);
    }

    #[test]
    fn test_geometry_defaults() {
        let reg = registry();
        assert_eq!(reg.get("height").unwrap().default_value(), Some(&Value::Int(256)));
        assert_eq!(reg.get("width").unwrap().default_value(), Some(&Value::Int(128)));
        assert_eq!(
            reg.get("train_sampler").unwrap().default_value(),
            Some(&Value::Str(String::new()))
        );
    }

    #[test]
    fn test_schedule_defaults() {
        let reg = registry();
        assert_eq!(
            reg.get("stepsize").unwrap().default_value(),
            Some(&Value::IntList(vec![20, 40]))
        );
        assert_eq!(reg.get("max_epoch").unwrap().default_value(), Some(&Value::Int(60)));
        assert_eq!(reg.get("gamma").unwrap().default_value(), Some(&Value::Float(0.1)));
    }

    #[test]
    fn test_branch_defaults() {
        let branches = registry().get("branches").unwrap();
        assert_eq!(branches.value_type(), ValueType::StrList);
        assert_eq!(
            branches.default_value(),
            Some(&Value::StrList(vec!["global".into(), "abd".into()]))
        );
    }

    #[test]
    fn test_choice_constrained_params() {
        let constrained: Vec<&str> = registry()
            .all_specs()
            .iter()
            .filter(|s| s.allowed_values().is_some())
            .map(|s| s.name())
            .collect();
        assert_eq!(constrained, vec!["data_augment", "pool_tracklet_features"]);
        assert_eq!(
            registry().get("data_augment").unwrap().allowed_values().unwrap().len(),
            7
        );
    }

    #[test]
    fn test_short_aliases() {
        let reg = registry();
        assert_eq!(reg.get("source_names").unwrap().short_alias(), Some('s'));
        assert_eq!(reg.get("target_names").unwrap().short_alias(), Some('t'));
        assert_eq!(reg.get("workers").unwrap().short_alias(), Some('j'));
        assert_eq!(reg.get("arch").unwrap().short_alias(), Some('a'));
    }

    #[test]
    fn test_optimizer_params_are_floats_except_name_and_nesterov() {
        let reg = registry();
        for name in [
            "lr",
            "weight_decay",
            "momentum",
            "sgd_dampening",
            "rmsprop_alpha",
            "adam_beta1",
            "adam_beta2",
        ] {
            assert_eq!(reg.get(name).unwrap().kind(), ParamKind::Float, "{name}");
        }
        assert_eq!(reg.get("optim").unwrap().kind(), ParamKind::String);
        assert_eq!(reg.get("sgd_nesterov").unwrap().kind(), ParamKind::Bool);
    }
}
