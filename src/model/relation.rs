// ============================================================
// Relation Selection Head
// ============================================================
// Scores every ordered token pair against every relation type.
//
// Axis convention, used consistently by the loss, the threshold
// step and the triple decoder: in all [B, L, L, ...] tensors,
// dim 1 indexes the SUBJECT token and dim 2 the OBJECT token.
//
// Scoring:
//   s = subject_proj(x)   broadcast along the object axis
//   o = object_proj(x)    broadcast along the subject axis
//   pair = tanh(combiner(cat(s, o)))         [B, L, L, E]
//   logits[b,i,j,r] = pair[b,i,j] . rel_emb[r]
//
// Training uses elementwise BCE-with-logits against the one-hot
// gold relation id. Nearly every pair holds no relation, so every
// non-background class carries a large class weight and positive
// weight while the background class keeps weight 1. Losses are
// masked to valid pairs (outer product of the sequence mask with
// itself) and normalised by the valid-token count.

use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{softplus, tanh},
};

use crate::config::JointModelConfig;

#[derive(Module, Debug)]
pub struct RelationHead<B: Backend> {
    subject_proj: Linear<B>,
    object_proj: Linear<B>,
    pair_combiner: Linear<B>,
    relation_embedding: Embedding<B>,
    num_relations: usize,
    class_weight: f64,
    pos_weight: f64,
}

impl<B: Backend> RelationHead<B> {
    /// `feature_dim` is the width of the per-position relation
    /// input (encoder output + tag embedding + extra channels).
    pub fn init(cfg: &JointModelConfig, feature_dim: usize, device: &B::Device) -> Self {
        let e = cfg.relation_embedding_dim;
        Self {
            subject_proj: LinearConfig::new(feature_dim, e).init(device),
            object_proj: LinearConfig::new(feature_dim, e).init(device),
            pair_combiner: LinearConfig::new(2 * e, e).init(device),
            relation_embedding: EmbeddingConfig::new(cfg.num_relations, e).init(device),
            num_relations: cfg.num_relations,
            class_weight: cfg.relation_class_weight,
            pos_weight: cfg.relation_pos_weight,
        }
    }

    /// Raw pair scores, [B, L, L, R].
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch, seq_len, _] = input.dims();
        let e = self.relation_embedding.weight.dims()[1];

        // [B, L, E] each; subject varies along dim 1, object along
        // dim 2 of the pair grid.
        let subject = self.subject_proj.forward(input.clone());
        let object = self.object_proj.forward(input);

        let subject = subject
            .unsqueeze_dim::<4>(2)
            .expand([batch, seq_len, seq_len, e]);
        let object = object
            .unsqueeze_dim::<4>(1)
            .expand([batch, seq_len, seq_len, e]);

        let pair = tanh(
            self.pair_combiner
                .forward(Tensor::cat(vec![subject, object], 3)),
        ); // [B, L, L, E]

        // Dot product against every relation embedding.
        let rel_weight = self.relation_embedding.weight.val(); // [R, E]
        pair.reshape([batch * seq_len * seq_len, e])
            .matmul(rel_weight.transpose())
            .reshape([batch, seq_len, seq_len, self.num_relations])
    }

    /// Masked, class-weighted BCE-with-logits loss.
    ///
    /// logits: [B, L, L, R]; gold: [B, L, L] relation ids;
    /// mask: [B, L]. Pairs touching a padding position contribute
    /// exactly zero; the sum is normalised by the valid-token
    /// count.
    pub fn masked_bce(
        &self,
        logits: Tensor<B, 4>,
        gold: Tensor<B, 3, Int>,
        mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 1> {
        let [batch, seq_len, _, r] = logits.dims();
        let device = logits.device();

        // One-hot gold: compare ids against 0..R along a new axis.
        let classes = Tensor::<B, 1, Int>::arange(0..r as i64, &device)
            .reshape([1, 1, 1, r])
            .expand([batch, seq_len, seq_len, r]);
        let gold_ids = gold
            .unsqueeze_dim::<4>(3)
            .expand([batch, seq_len, seq_len, r]);
        let target = gold_ids.equal(classes).float(); // [B, L, L, R]

        // Per-class weights: background (class 0) stays at 1.
        let mut class_w = vec![self.class_weight as f32; r];
        class_w[0] = 1.0;
        let mut pos_w = vec![self.pos_weight as f32; r];
        pos_w[0] = 1.0;
        let class_w = Tensor::<B, 1>::from_floats(class_w.as_slice(), &device).reshape([1, 1, 1, r]);
        let pos_w = Tensor::<B, 1>::from_floats(pos_w.as_slice(), &device).reshape([1, 1, 1, r]);

        // Stable BCE with logits:
        //   pos_w * y * softplus(-x) + (1 - y) * softplus(x)
        let positive = target.clone() * pos_w * softplus(logits.clone().neg(), 1.0);
        let negative = (target.neg().add_scalar(1.0)) * softplus(logits, 1.0);
        let loss = (positive + negative) * class_w; // [B, L, L, R]

        // Valid pairs: both subject and object unpadded.
        let mask_f = mask.float();
        let pair_mask = mask_f.clone().unsqueeze_dim::<3>(2)
            * mask_f.clone().unsqueeze_dim::<3>(1); // [B, L, L]
        let masked = loss * pair_mask.unsqueeze_dim::<4>(3);

        masked.sum() / mask_f.sum()
    }

    /// Threshold raw scores into the binary presence tensor.
    ///
    /// Sigmoid probabilities are shifted by (threshold - 0.5) and
    /// rounded, which moves the decision boundary to `threshold`
    /// with a single scalar.
    pub fn decide(&self, logits: Tensor<B, 4>, threshold: f64) -> Tensor<B, 4, Int> {
        let probs = burn::tensor::activation::sigmoid(logits);
        probs.sub_scalar(threshold - 0.5).round().int()
    }
}
