// ============================================================
// Model Errors
// ============================================================
// Construction-time failures only. Once a model is built, shape
// mismatches inside the forward pass are caller errors and panic
// in the tensor ops; numeric instability (NaN losses) propagates
// to the training loop untouched.

use thiserror::Error;

use crate::config::EncoderKind;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Attention pooling reads the recurrent encoder's final hidden
    /// state; transformer variants do not produce one.
    #[error("attention pooling requires the recurrent encoder, got {encoder:?}")]
    AttentionUnsupported { encoder: EncoderKind },

    /// A rate/threshold hyperparameter left its valid range.
    #[error("{name} must lie in [0, 1], got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },

    /// The pretrained embedding table does not match the configured
    /// vocabulary or embedding dimension.
    #[error(
        "pretrained embedding table is {rows}x{cols}, \
         expected {vocab_size}x{embedding_dim}"
    )]
    PretrainedShapeMismatch {
        rows: usize,
        cols: usize,
        vocab_size: usize,
        embedding_dim: usize,
    },

    /// Vocabulary sizes the heads depend on must be non-trivial.
    #[error("{name} must be at least {min}, got {value}")]
    VocabTooSmall {
        name: &'static str,
        min: usize,
        value: usize,
    },
}
