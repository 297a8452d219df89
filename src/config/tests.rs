//! Integration tests for config module

use super::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_end_to_end_config_loading() {
    let yaml = r#"
source_names: [market1501, dukemtmcreid]
target_names: [market1501]
height: 384
width: 128
criterion: htri
train_sampler: RandomSampler
optim: amsgrad
lr: 0.0003
stepsize: [20, 40, 60]
branches: [global, abd, np]
abd_dan: [cam, pam]
use_of: true
data_augment: crop,random-erase
"#;

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(yaml.as_bytes()).unwrap();

    let input = load_config(temp_file.path()).unwrap();
    let raw = parse(&input, registry()).unwrap();
    let bundle = ConfigBundle::derive(raw, false).unwrap();

    assert_eq!(bundle.data.source_names.len(), 2);
    assert_eq!(bundle.data.height, 384);
    assert_eq!(bundle.data.train_sampler, RANDOM_IDENTITY_SAMPLER);
    assert_eq!(bundle.data.data_augment, "crop,random-erase");
    assert_eq!(bundle.optimizer.optim, "amsgrad");
    assert_eq!(bundle.schedule.stepsize, vec![20, 40, 60]);
    assert_eq!(bundle.model.branches.len(), 3);
    assert!(bundle.model.use_of);
    assert!(bundle.loss.uses_triplet());
}

#[test]
fn test_command_line_overrides_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(b"source_names: [cuhk03]\ntarget_names: [cuhk03]\nheight: 384\nmax_epoch: 80\n")
        .unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();

    let bundle = ConfigBundle::from_args(
        ["reid-config", "--config", path.as_str(), "--height", "256", "--cuhk03-labeled"],
        false,
    )
    .unwrap();

    assert_eq!(bundle.data.height, 256);
    assert_eq!(bundle.schedule.max_epoch, 80);
    assert_eq!(bundle.data.source_names, vec!["cuhk03".to_string()]);
    assert!(bundle.data.cuhk03_labeled);
}

#[test]
fn test_file_values_are_validated() {
    let err = parse(
        &input_from_yaml("source_names: [a]\ntarget_names: [a]\npool_tracklet_features: sum\n")
            .unwrap(),
        registry(),
    )
    .unwrap_err();
    assert_eq!(err.field(), "pool_tracklet_features");
}

#[test]
fn test_file_unknown_key() {
    let input = input_from_yaml("source_names: [a]\ntarget_names: [a]\nlearning-rate: 0.1\n").unwrap();
    let err = parse(&input, registry()).unwrap_err();
    assert!(matches!(err, ParseError::UnknownParameter { ref field } if field == "learning_rate"));
}

#[test]
fn test_minimal_snapshot() {
    let raw = parse(
        &RawInput::new()
            .with("source_names", ["market1501"])
            .with("target_names", ["market1501"]),
        registry(),
    )
    .unwrap();
    let bundle = ConfigBundle::derive(raw, false).unwrap();

    assert_eq!(bundle.data.height, 256);
    assert_eq!(bundle.data.width, 128);
    assert_eq!(bundle.data.train_batch_size, 32);
    assert_eq!(bundle.data.test_batch_size, 100);
    assert_eq!(bundle.data.train_sampler, "");
    assert_eq!(bundle.video.seq_len, 15);
    assert_eq!(bundle.video.sample_method, "evenly");
    assert!((bundle.optimizer.lr - 0.0003).abs() < 1e-12);
    assert_eq!(bundle.schedule.max_epoch, 60);
    assert_eq!(bundle.eval.eval_freq, -1);
    assert_eq!(bundle.runtime.gpu_devices, "0");
}
