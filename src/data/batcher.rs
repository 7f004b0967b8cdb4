// ============================================================
// Joint Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<JointSample>
// into model-ready tensors on one device.
//
// Input:  N samples, each padded to the same length L
// Output: JointBatch with
//           tokens    [N, L]    Int
//           mask      [N, L]    Int
//           tags      [N, L]    Int
//           relations [N, L, L] Int   (gold relation id per pair,
//                                      subject = dim 1, object = dim 2)
//           segment_hints Option<[N, L] Float>
//
// All tensors of one batch live on the batcher's device; mixing
// devices inside a forward pass is a fatal caller error.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::JointSample;

/// A batch of joint-extraction samples ready for the forward pass.
#[derive(Debug, Clone)]
pub struct JointBatch<B: Backend> {
    /// Token ids, shape [batch, L].
    pub tokens: Tensor<B, 2, Int>,

    /// Padding mask, shape [batch, L]; 1 = real token.
    pub mask: Tensor<B, 2, Int>,

    /// Gold tag ids, shape [batch, L].
    pub tags: Tensor<B, 2, Int>,

    /// Gold relation matrix, shape [batch, L, L]; entry (i, j) is
    /// the relation id of subject token i and object token j,
    /// 0 for no relation.
    pub relations: Tensor<B, 3, Int>,

    /// Optional segmentation-hint channel, shape [batch, L].
    /// Present only when every sample in the batch carries hints.
    pub segment_hints: Option<Tensor<B, 2>>,
}

impl<B: Backend> JointBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.tokens.dims()[0]
    }

    pub fn seq_len(&self) -> usize {
        self.tokens.dims()[1]
    }
}

/// Holds the target device so every tensor of a batch is created
/// in one place.
#[derive(Clone, Debug)]
pub struct JointBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> JointBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<JointSample, JointBatch<B>> for JointBatcher<B> {
    fn batch(&self, items: Vec<JointSample>) -> JointBatch<B> {
        let batch_size = items.len();
        // Uniform padded length across the dataset.
        let seq_len = items[0].padded_len();

        let token_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.token_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.mask.iter().map(|&x| x as i32))
            .collect();

        let tag_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.tag_ids.iter().map(|&x| x as i32))
            .collect();

        // Densify the sparse relation lists into [N, L, L].
        let mut relation_flat = vec![0i32; batch_size * seq_len * seq_len];
        for (n, sample) in items.iter().enumerate() {
            for &(subject, object, rel) in &sample.relations {
                relation_flat[n * seq_len * seq_len + subject * seq_len + object] = rel as i32;
            }
        }

        let tokens = Tensor::<B, 1, Int>::from_ints(token_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let mask = Tensor::<B, 1, Int>::from_ints(mask_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let tags = Tensor::<B, 1, Int>::from_ints(tag_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let relations = Tensor::<B, 1, Int>::from_ints(relation_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len, seq_len]);

        // Hints are all-or-nothing: a batch mixing hinted and
        // unhinted samples drops the channel.
        let segment_hints = if items.iter().all(|s| s.segment_hints.is_some()) {
            let hint_flat: Vec<f32> = items
                .iter()
                .flat_map(|s| s.segment_hints.as_ref().unwrap().iter().copied())
                .collect();
            Some(
                Tensor::<B, 1>::from_floats(hint_flat.as_slice(), &self.device)
                    .reshape([batch_size, seq_len]),
            )
        } else {
            None
        };

        JointBatch { tokens, mask, tags, relations, segment_hints }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn two_samples() -> Vec<JointSample> {
        let mut a = JointSample::unannotated(vec![5, 6, 7, 0], vec![1, 1, 1, 0]);
        a.tag_ids = vec![1, 2, 0, 0];
        a.relations = vec![(0, 2, 3)];
        let b = JointSample::unannotated(vec![8, 9, 0, 0], vec![1, 1, 0, 0]);
        vec![a, b]
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = JointBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(two_samples());
        assert_eq!(batch.batch_size(), 2);
        assert_eq!(batch.seq_len(), 4);
        assert_eq!(batch.tokens.dims(), [2, 4]);
        assert_eq!(batch.relations.dims(), [2, 4, 4]);
        assert!(batch.segment_hints.is_none());
    }

    #[test]
    fn test_relation_densification() {
        let batcher = JointBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(two_samples());
        let flat: Vec<i64> = batch.relations.into_data().iter::<i64>().collect();
        // Sample 0, subject 0, object 2 carries relation 3.
        assert_eq!(flat[0 * 16 + 0 * 4 + 2], 3);
        // Everything else is background.
        assert_eq!(flat.iter().filter(|&&r| r != 0).count(), 1);
    }

    #[test]
    fn test_segment_hints_all_or_nothing() {
        let mut samples = two_samples();
        samples[0].segment_hints = Some(vec![1.0, 0.0, 1.0, 0.0]);
        let batcher = JointBatcher::<TestBackend>::new(Default::default());
        // Only one sample has hints: channel is dropped.
        assert!(batcher.batch(samples.clone()).segment_hints.is_none());

        samples[1].segment_hints = Some(vec![1.0, 1.0, 0.0, 0.0]);
        let batch = batcher.batch(samples);
        assert_eq!(batch.segment_hints.unwrap().dims(), [2, 4]);
    }
}
