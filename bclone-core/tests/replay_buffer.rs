use bclone_core::error::Error;
use bclone_core::replay_buffer::{ReplayBuffer, Rollout};
use bclone_core::rng::set_global_seed;
use candle_core::{Device, Tensor};

fn vector(values: &[f32]) -> Tensor {
    Tensor::from_vec(values.to_vec(), values.len(), &Device::Cpu).unwrap()
}

/// Rollout of single-element transitions whose observation values are the
/// given markers, so retained transitions can be identified after eviction.
fn marker_rollout(markers: std::ops::Range<i32>) -> Rollout {
    let mut rollout = Rollout::default();
    for marker in markers {
        rollout.push_step(vector(&[marker as f32]), vector(&[-(marker as f32)]));
    }
    rollout
}

fn sampled_markers(buffer: &ReplayBuffer, batch_size: usize) -> Vec<i32> {
    let (observations, actions) = buffer.sample_batch(batch_size).unwrap();
    let rows = observations.to_vec2::<f32>().unwrap();
    let action_rows = actions.to_vec2::<f32>().unwrap();
    // alignment: row i of both batches belongs to the same transition
    for (row, action_row) in rows.iter().zip(&action_rows) {
        assert_eq!(row[0], -action_row[0]);
    }
    rows.into_iter().map(|row| row[0] as i32).collect()
}

#[test]
fn capacity_bound_evicts_oldest_first() {
    let mut buffer = ReplayBuffer::new(10, 1, 1);
    buffer
        .add_rollouts(vec![marker_rollout(0..7), marker_rollout(7..15)])
        .unwrap();
    assert_eq!(buffer.len(), 10);

    set_global_seed(0);
    let mut markers = sampled_markers(&buffer, 10);
    markers.sort();
    assert_eq!(markers, (5..15).collect::<Vec<_>>());
}

#[test]
fn sampled_transitions_were_added_and_not_evicted() {
    let mut buffer = ReplayBuffer::new(4, 1, 1);
    buffer.add_rollouts(vec![marker_rollout(0..6)]).unwrap();
    for marker in sampled_markers(&buffer, 3) {
        assert!((2..6).contains(&marker), "sampled evicted marker {marker}");
    }
}

#[test]
fn empty_buffer_cannot_be_sampled() {
    let buffer = ReplayBuffer::new(8, 1, 1);
    let err = buffer.sample_batch(4).unwrap_err();
    assert!(matches!(err, Error::InsufficientData));
}

#[test]
fn undersized_buffer_samples_with_replacement() {
    let mut buffer = ReplayBuffer::new(16, 1, 1);
    buffer.add_rollouts(vec![marker_rollout(0..3)]).unwrap();
    let (observations, actions) = buffer.sample_batch(8).unwrap();
    assert_eq!(observations.dims(), [8, 1]);
    assert_eq!(actions.dims(), [8, 1]);
}

#[test]
fn large_batch_sampling_has_no_duplicates() {
    let mut buffer = ReplayBuffer::new(32, 1, 1);
    buffer.add_rollouts(vec![marker_rollout(0..20)]).unwrap();
    let mut markers = sampled_markers(&buffer, 20);
    markers.sort();
    markers.dedup();
    assert_eq!(markers.len(), 20);
}

#[test]
fn observation_of_wrong_length_is_rejected() {
    let mut buffer = ReplayBuffer::new(8, 3, 1);
    let mut rollout = Rollout::default();
    rollout.push_step(vector(&[1., 2.]), vector(&[0.]));
    let err = buffer.add_rollouts(vec![rollout]).unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 3,
            got: 2,
            ..
        }
    ));
    assert!(buffer.is_empty());
}

#[test]
fn unaligned_rollout_is_rejected() {
    let mut buffer = ReplayBuffer::new(8, 1, 1);
    let rollout = Rollout {
        observations: vec![vector(&[1.]), vector(&[2.])],
        actions: vec![vector(&[0.])],
    };
    let err = buffer.add_rollouts(vec![rollout]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
    assert!(buffer.is_empty());
}

#[test]
fn variable_length_rollouts_accumulate() {
    let mut buffer = ReplayBuffer::new(100, 1, 1);
    buffer.add_rollouts(vec![marker_rollout(0..4)]).unwrap();
    buffer
        .add_rollouts(vec![marker_rollout(4..5), marker_rollout(5..9)])
        .unwrap();
    assert_eq!(buffer.len(), 9);
    assert_eq!(buffer.capacity(), 100);
}
