// ============================================================
// Model Configuration
// ============================================================
// Every scalar the model consumes at construction time lives
// here. The struct is immutable after construction; Burn's
// #[derive(Config)] supplies the builder-style `new`/`with_*`
// API plus Serialize/Deserialize, so a config can round-trip
// through JSON without extra derives.
//
// Loading configs from disk or CLI flags is a caller concern,
// not part of this crate.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Which sequence encoder the model is built with.
///
/// Selected once at construction; the forward path never branches
/// on it again (the encoder is a tagged variant, see
/// `model::encoder::Encoder`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderKind {
    /// Stacked bidirectional GRU over (optionally pretrained)
    /// token embeddings. The only variant with a final hidden
    /// state, and therefore the only one attention pooling
    /// supports.
    Recurrent,

    /// Transformer encoder with one set of weights per layer.
    Transformer,

    /// Transformer encoder with a single block reused across
    /// layers and a factorized (narrow) token embedding.
    SharedTransformer,
}

/// Hyperparameters for [`crate::model::JointModel`].
///
/// `hidden_dim` is H per direction; every encoder variant emits
/// per-token features of width 2H (transformers run at d_model =
/// 2H directly).
#[derive(Config, Debug)]
pub struct JointModelConfig {
    /// Token vocabulary size (embedding table rows).
    pub vocab_size: usize,

    /// Closed tag set size T (BIO-style entity tags, id 0 = O).
    pub num_tags: usize,

    /// Closed relation set size R (id 0 = no relation).
    pub num_relations: usize,

    /// Token embedding width (recurrent input / factorized width).
    #[config(default = 128)]
    pub embedding_dim: usize,

    /// Hidden width H per direction.
    #[config(default = 128)]
    pub hidden_dim: usize,

    /// Encoder depth (GRU layers or transformer blocks).
    #[config(default = 2)]
    pub num_layers: usize,

    /// Width of the tag-label embedding fed to the relation head.
    pub tag_embedding_dim: usize,

    /// Width of the relation embeddings and of the pair
    /// interaction vector they are scored against.
    pub relation_embedding_dim: usize,

    /// Dropout on token embeddings (recurrent variant); 0 disables.
    #[config(default = 0.5)]
    pub embedding_dropout: f64,

    /// Dropout between stacked recurrent layers; 0 disables.
    #[config(default = 0.0)]
    pub recurrent_dropout: f64,

    /// Encoder variant selector.
    #[config(default = "EncoderKind::Recurrent")]
    pub encoder: EncoderKind,

    /// Concatenate a per-token attention weight channel onto the
    /// NER and relation inputs. Recurrent encoder only.
    #[config(default = false)]
    pub use_attention: bool,

    /// Concatenate an externally supplied segmentation-hint channel
    /// (the batch must then carry `segment_hints`).
    #[config(default = false)]
    pub use_segment_hints: bool,

    /// Teacher-forcing rate: in Train mode, predicted tags feed the
    /// relation head with this probability, gold with 1 - rate.
    #[config(default = 0.5)]
    pub teach_rate: f64,

    /// Sigmoid decision threshold for relation presence.
    #[config(default = 0.9)]
    pub relation_threshold: f64,

    /// BCE class weight for every non-background relation class.
    #[config(default = 50.0)]
    pub relation_class_weight: f64,

    /// BCE positive-class weight for every non-background class.
    #[config(default = 20.0)]
    pub relation_pos_weight: f64,

    /// Id of the padding token in the vocabulary.
    #[config(default = 0)]
    pub pad_token_id: usize,

    /// Attention heads per transformer block (transformer variants).
    #[config(default = 4)]
    pub num_heads: usize,

    /// Feed-forward width inside transformer blocks.
    #[config(default = 512)]
    pub ffn_dim: usize,

    /// Maximum sequence length the position embedding covers
    /// (transformer variants).
    #[config(default = 512)]
    pub max_seq_len: usize,

    /// Dropout inside transformer blocks.
    #[config(default = 0.1)]
    pub transformer_dropout: f64,
}

impl JointModelConfig {
    /// Reject configurations the model cannot honour. Called by
    /// `init`; failing here is the only recoverable error path,
    /// everything downstream fails fast in the tensor ops.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.use_attention && self.encoder != EncoderKind::Recurrent {
            return Err(ModelError::AttentionUnsupported { encoder: self.encoder });
        }
        for (name, value) in [
            ("teach_rate", self.teach_rate),
            ("relation_threshold", self.relation_threshold),
            ("embedding_dropout", self.embedding_dropout),
            ("recurrent_dropout", self.recurrent_dropout),
            ("transformer_dropout", self.transformer_dropout),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ModelError::RateOutOfRange { name, value });
            }
        }
        // One background class plus at least one real tag/relation.
        if self.num_tags < 2 {
            return Err(ModelError::VocabTooSmall {
                name: "num_tags",
                min: 2,
                value: self.num_tags,
            });
        }
        if self.num_relations < 2 {
            return Err(ModelError::VocabTooSmall {
                name: "num_relations",
                min: 2,
                value: self.num_relations,
            });
        }
        Ok(())
    }

    /// Width of the extra channels concatenated onto both the NER
    /// and the relation inputs.
    pub fn extra_channels(&self) -> usize {
        usize::from(self.use_attention) + usize::from(self.use_segment_hints)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> JointModelConfig {
        JointModelConfig::new(100, 5, 4, 16, 8)
    }

    #[test]
    fn test_valid_default_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_attention_with_transformer_rejected() {
        let cfg = base_config()
            .with_encoder(EncoderKind::Transformer)
            .with_use_attention(true);
        assert!(matches!(
            cfg.validate(),
            Err(ModelError::AttentionUnsupported { .. })
        ));
    }

    #[test]
    fn test_attention_with_recurrent_accepted() {
        let cfg = base_config().with_use_attention(true);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let cfg = base_config().with_relation_threshold(1.5);
        assert!(matches!(
            cfg.validate(),
            Err(ModelError::RateOutOfRange { name: "relation_threshold", .. })
        ));
    }

    #[test]
    fn test_degenerate_vocab_rejected() {
        let cfg = JointModelConfig::new(100, 5, 1, 16, 8);
        assert!(matches!(
            cfg.validate(),
            Err(ModelError::VocabTooSmall { name: "num_relations", .. })
        ));
    }

    #[test]
    fn test_extra_channel_count() {
        assert_eq!(base_config().extra_channels(), 0);
        let cfg = base_config()
            .with_use_attention(true)
            .with_use_segment_hints(true);
        assert_eq!(cfg.extra_channels(), 2);
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg = base_config().with_encoder(EncoderKind::SharedTransformer);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: JointModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.encoder, EncoderKind::SharedTransformer);
        assert_eq!(back.vocab_size, cfg.vocab_size);
    }
}
