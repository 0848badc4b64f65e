use bclone_core::checkpoint::{self, CheckpointMeta};
use bclone_core::error::Error;
use bclone_core::network::build_policy_net;
use bclone_core::policy::{ImitationPolicy, PolicyConfig};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use std::fs;
use std::path::PathBuf;

fn checkpoint_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("bclone-checkpoint-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn config(stochastic: bool) -> PolicyConfig {
    PolicyConfig {
        obs_dim: 4,
        action_dim: 2,
        hidden_layers: vec![16, 16],
        learning_rate: 1e-3,
        stochastic,
    }
}

#[test]
fn save_and_load_round_trip_is_identity() {
    let device = Device::Cpu;
    let dir = checkpoint_dir("round-trip");
    let policy = ImitationPolicy::trainable(config(false), device.clone()).unwrap();
    let observation = Tensor::randn(0f32, 1., 4, &device).unwrap();
    let before = policy.predict(&observation).unwrap().to_vec1::<f32>().unwrap();

    policy.save(&dir).unwrap();
    let restored = ImitationPolicy::restore(&dir, device).unwrap();
    let after = restored
        .predict(&observation)
        .unwrap()
        .to_vec1::<f32>()
        .unwrap();

    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert!((b - a).abs() < 1e-6, "prediction drifted: {b} vs {a}");
    }
    assert!(!restored.is_trainable());
    assert_eq!(restored.obs_dim(), 4);
    assert_eq!(restored.action_dim(), 2);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn repeated_saves_overwrite() {
    let device = Device::Cpu;
    let dir = checkpoint_dir("overwrite");
    let mut policy = ImitationPolicy::trainable(config(false), device.clone()).unwrap();
    policy.save(&dir).unwrap();

    // one training step changes the parameters, the second save must win
    let observations = Tensor::randn(0f32, 1., (8, 4), &device).unwrap();
    let labels = Tensor::randn(0f32, 1., (8, 2), &device).unwrap();
    policy.train_step(&observations, &labels).unwrap();
    policy.save(&dir).unwrap();

    let observation = Tensor::randn(0f32, 1., 4, &device).unwrap();
    let expected = policy.predict(&observation).unwrap().to_vec1::<f32>().unwrap();
    let restored = ImitationPolicy::restore(&dir, device).unwrap();
    let got = restored
        .predict(&observation)
        .unwrap()
        .to_vec1::<f32>()
        .unwrap();
    for (e, g) in expected.iter().zip(&got) {
        assert!((e - g).abs() < 1e-6);
    }
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_checkpoint_fails_to_load() {
    let dir = checkpoint_dir("missing");
    fs::create_dir_all(&dir).unwrap();
    let err = ImitationPolicy::restore(&dir, Device::Cpu).unwrap_err();
    assert!(matches!(err, Error::CheckpointLoad { .. }));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn structurally_incompatible_checkpoint_fails_to_load() {
    let device = Device::Cpu;
    let dir = checkpoint_dir("mismatch");
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let net = build_policy_net(4, &[8, 2], &vb, checkpoint::POLICY_SCOPE).unwrap();
    // metadata promising a wider hidden layer than the blob holds
    let meta = CheckpointMeta {
        obs_dim: 4,
        action_dim: 2,
        hidden_layers: vec![32],
        stochastic: false,
    };
    checkpoint::save(&dir, &meta, &net).unwrap();

    let err = ImitationPolicy::restore(&dir, device).unwrap_err();
    assert!(matches!(err, Error::CheckpointLoad { .. }));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn stochastic_flag_survives_the_round_trip() {
    let device = Device::Cpu;
    let dir = checkpoint_dir("stochastic");
    let policy = ImitationPolicy::trainable(config(true), device.clone()).unwrap();
    assert!(policy.is_stochastic());
    policy.save(&dir).unwrap();

    let restored = ImitationPolicy::restore(&dir, device.clone()).unwrap();
    assert!(restored.is_stochastic());
    let observation = Tensor::randn(0f32, 1., 4, &device).unwrap();
    let action = restored.predict(&observation).unwrap();
    assert_eq!(action.dims(), [2]);
    let _ = fs::remove_dir_all(&dir);
}
