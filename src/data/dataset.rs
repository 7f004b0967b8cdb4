// ============================================================
// Joint Extraction Samples
// ============================================================
// One sample is a fully tokenised, padded sentence with its NER
// and relation annotations. Relations are stored sparsely as
// (subject, object, relation_id) entries; the batcher densifies
// them into the [L, L] gold matrix the loss consumes.

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One padded, annotated example of length L.
///
/// Invariant: `token_ids`, `mask` and `tag_ids` share the same
/// length, and every sample in one dataset shares that length too
/// (padding/truncation is an upstream responsibility).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointSample {
    /// Token ids, padded with the pad token to length L.
    pub token_ids: Vec<u32>,

    /// 1 = real token, 0 = padding. Real tokens form a prefix.
    pub mask: Vec<u32>,

    /// Gold BIO tag ids, 0 (outside) on padding positions.
    pub tag_ids: Vec<u32>,

    /// Sparse gold relations: (subject position, object position,
    /// relation id). Pairs not listed have relation id 0.
    pub relations: Vec<(usize, usize, u32)>,

    /// Optional per-token segmentation-hint channel supplied by an
    /// external segmenter. Length L when present.
    pub segment_hints: Option<Vec<f32>>,
}

impl JointSample {
    /// A sample with no annotations, used for pure inference. Gold
    /// tags and relations are all-background and never read in
    /// Infer mode.
    pub fn unannotated(token_ids: Vec<u32>, mask: Vec<u32>) -> Self {
        let len = token_ids.len();
        Self {
            token_ids,
            mask,
            tag_ids: vec![0; len],
            relations: Vec::new(),
            segment_hints: None,
        }
    }

    /// Padded length L.
    pub fn padded_len(&self) -> usize {
        self.token_ids.len()
    }

    /// True (unpadded) length implied by the mask.
    pub fn true_len(&self) -> usize {
        self.mask.iter().filter(|&&m| m != 0).count()
    }
}

pub struct JointDataset {
    samples: Vec<JointSample>,
}

impl JointDataset {
    pub fn new(samples: Vec<JointSample>) -> Self {
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

impl Dataset<JointSample> for JointDataset {
    fn get(&self, index: usize) -> Option<JointSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
