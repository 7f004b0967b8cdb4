// ============================================================
// Joint NER + Relation Extraction Model
// ============================================================
// Ties the pieces together, one synchronous dataflow per batch:
//
//   tokens ─► Encoder ─► (attention weights?) ─► tag scores
//                │                                   │
//                │                            CRF nll + decode
//                │                                   │
//                │        choose_labels(mode, rate, rng)
//                │                                   │
//                └───► cat(features, tag embedding, extras)
//                                                    │
//                                        RelationHead scores
//                                                    │
//                                     masked BCE + threshold
//
// Modes:
//   Train — both losses, teacher-forcing policy picks the tag
//           sequence feeding the relation head
//   Eval  — both losses, relation head always sees predictions
//   Infer — predictions only, no losses
//
// The model owns its parameters exclusively; an external
// optimizer updates them between calls, never during one. All
// tensors of one invocation live on the device resolved at
// construction.

use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
};
use rand::Rng;

use crate::{
    config::{EncoderKind, JointModelConfig},
    data::batcher::JointBatch,
    error::ModelError,
    model::{
        attention::AttentionPooling,
        crf::LinearChainCrf,
        encoder::{Encoder, RecurrentEncoder, SharedTransformerEncoder, TransformerEncoder},
        relation::RelationHead,
    },
    policy::{choose_labels, ForwardMode, LabelSource},
};

/// What one forward pass returns. Losses are present in Train and
/// Eval modes, absent in Infer mode.
#[derive(Debug)]
pub struct JointOutput<B: Backend> {
    /// CRF negative log-likelihood, summed over the batch.
    pub ner_loss: Option<Tensor<B, 1>>,

    /// Masked, class-weighted relation BCE.
    pub relation_loss: Option<Tensor<B, 1>>,

    /// Decoded tag path per example, truncated to true length.
    pub tags: Vec<Vec<usize>>,

    /// Binary relation presence, [B, L, L, R]; dim 1 = subject,
    /// dim 2 = object.
    pub relations: Tensor<B, 4, Int>,
}

impl<B: Backend> JointOutput<B> {
    /// Sum of both losses when training/evaluating, None in Infer
    /// mode.
    pub fn total_loss(&self) -> Option<Tensor<B, 1>> {
        match (&self.ner_loss, &self.relation_loss) {
            (Some(ner), Some(rel)) => Some(ner.clone() + rel.clone()),
            _ => None,
        }
    }
}

#[derive(Module, Debug)]
pub struct JointModel<B: Backend> {
    encoder: Encoder<B>,
    attention: Option<AttentionPooling<B>>,
    tag_scorer: Linear<B>,
    crf: LinearChainCrf<B>,
    tag_embedding: Embedding<B>,
    relation_head: RelationHead<B>,
    teach_rate: f64,
    relation_threshold: f64,
    use_segment_hints: bool,
}

impl JointModelConfig {
    /// Build the model on `device`. Fails fast on configurations
    /// the architecture cannot honour (see `validate`).
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<JointModel<B>, ModelError> {
        self.build(device, None)
    }

    /// Like `init`, but seeds the token embedding table from a
    /// pretrained [vocab_size, embedding_dim] matrix. The table
    /// stays trainable. Transformer variants keep their own
    /// embeddings and ignore the matrix.
    pub fn init_with_pretrained<B: Backend>(
        &self,
        device: &B::Device,
        pretrained: Tensor<B, 2>,
    ) -> Result<JointModel<B>, ModelError> {
        let [rows, cols] = pretrained.dims();
        if rows != self.vocab_size || cols != self.embedding_dim {
            return Err(ModelError::PretrainedShapeMismatch {
                rows,
                cols,
                vocab_size: self.vocab_size,
                embedding_dim: self.embedding_dim,
            });
        }
        self.build(device, Some(pretrained))
    }

    fn build<B: Backend>(
        &self,
        device: &B::Device,
        pretrained: Option<Tensor<B, 2>>,
    ) -> Result<JointModel<B>, ModelError> {
        self.validate()?;

        let encoder = match self.encoder {
            EncoderKind::Recurrent => {
                Encoder::Recurrent(RecurrentEncoder::init(self, device, pretrained))
            }
            kind => {
                if pretrained.is_some() {
                    tracing::warn!(
                        "pretrained embedding table ignored for {kind:?} encoder"
                    );
                }
                match kind {
                    EncoderKind::Transformer => {
                        Encoder::Transformer(TransformerEncoder::init(self, device))
                    }
                    EncoderKind::SharedTransformer => {
                        Encoder::SharedTransformer(SharedTransformerEncoder::init(self, device))
                    }
                    EncoderKind::Recurrent => unreachable!(),
                }
            }
        };

        let attention = self
            .use_attention
            .then(|| AttentionPooling::init(self.hidden_dim, self.num_layers, device));

        let extras = self.extra_channels();
        let feature_dim = 2 * self.hidden_dim;
        let ner_input_dim = feature_dim + extras;
        let relation_input_dim = feature_dim + self.tag_embedding_dim + extras;

        tracing::info!(
            "joint model ready: {:?} encoder, {} layers, hidden {}, {} tags, {} relations",
            self.encoder,
            self.num_layers,
            self.hidden_dim,
            self.num_tags,
            self.num_relations,
        );

        Ok(JointModel {
            encoder,
            attention,
            tag_scorer: LinearConfig::new(ner_input_dim, self.num_tags).init(device),
            crf: LinearChainCrf::init(self.num_tags, device),
            tag_embedding: EmbeddingConfig::new(self.num_tags, self.tag_embedding_dim)
                .init(device),
            relation_head: RelationHead::init(self, relation_input_dim, device),
            teach_rate: self.teach_rate,
            relation_threshold: self.relation_threshold,
            use_segment_hints: self.use_segment_hints,
        })
    }
}

impl<B: Backend> JointModel<B> {
    /// One forward pass over a batch.
    ///
    /// The RNG drives only the teacher-forcing draw; substituting
    /// a fixed generator makes the mode branch deterministic.
    /// Shape mismatches (e.g. a hints-configured model fed a batch
    /// without hints) fail fast inside the tensor ops.
    pub fn forward(
        &self,
        batch: &JointBatch<B>,
        mode: ForwardMode,
        rng: &mut impl Rng,
    ) -> JointOutput<B> {
        let [batch_size, seq_len] = batch.tokens.dims();
        let device = batch.tokens.device();

        let encoded = self.encoder.encode(batch.tokens.clone(), batch.mask.clone());

        // Extra feature channels shared by both heads.
        let attention_weights = match (&self.attention, encoded.final_state) {
            (Some(pooling), Some(state)) => {
                Some(pooling.forward(encoded.features.clone(), state))
            }
            _ => None,
        };
        let segment_hints = self
            .use_segment_hints
            .then(|| batch.segment_hints.clone())
            .flatten()
            .map(|h| h.unsqueeze_dim::<3>(2));

        let mut ner_parts = vec![encoded.features.clone()];
        ner_parts.extend(attention_weights.clone());
        ner_parts.extend(segment_hints.clone());
        let ner_scores = self.tag_scorer.forward(Tensor::cat(ner_parts, 2)); // [B, L, T]

        // Decoding always runs: the relation head may consume the
        // predicted path even while training.
        let pred_tags = self.crf.decode(ner_scores.clone(), batch.mask.clone());
        let ner_loss = (mode != ForwardMode::Infer).then(|| {
            self.crf
                .nll(ner_scores, batch.tags.clone(), batch.mask.clone())
        });

        // The joint coupling point: embed gold or predicted tags.
        let labels = match choose_labels(mode, self.teach_rate, rng) {
            LabelSource::Gold => batch.tags.clone(),
            LabelSource::Predicted => {
                // Predicted paths stop at true length; pad with the
                // outside tag back up to L.
                let mut flat = vec![0i32; batch_size * seq_len];
                for (n, path) in pred_tags.iter().enumerate() {
                    for (t, &tag) in path.iter().enumerate() {
                        flat[n * seq_len + t] = tag as i32;
                    }
                }
                Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &device)
                    .reshape([batch_size, seq_len])
            }
        };
        let label_embeddings = self.tag_embedding.forward(labels); // [B, L, tag_dim]

        let mut rel_parts = vec![encoded.features, label_embeddings];
        rel_parts.extend(attention_weights);
        rel_parts.extend(segment_hints);
        let rel_logits = self.relation_head.forward(Tensor::cat(rel_parts, 2));

        let relation_loss = (mode != ForwardMode::Infer).then(|| {
            self.relation_head.masked_bce(
                rel_logits.clone(),
                batch.relations.clone(),
                batch.mask.clone(),
            )
        });
        let relations = self
            .relation_head
            .decide(rel_logits, self.relation_threshold);

        JointOutput { ner_loss, relation_loss, tags: pred_tags, relations }
    }
}
