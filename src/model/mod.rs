// ============================================================
// Model Layer (Burn)
// ============================================================
// All model code lives in this layer; the domain layer never
// imports burn.
//
//   encoder.rs   — the three sequence-encoder variants behind one
//                  enum: stacked bidirectional GRU, per-layer
//                  transformer, shared-weight transformer
//   attention.rs — optional per-token attention pooling over the
//                  recurrent encoder's final hidden states
//   crf.rs       — linear-chain CRF: masked log-likelihood for
//                  training, Viterbi decoding for inference
//   relation.rs  — pairwise relation-selection head: bilinear
//                  scoring over all (subject, object) pairs and
//                  the masked, class-weighted BCE loss
//   joint.rs     — the joint model tying NER output into the
//                  relation input, with the train/eval/infer modes
//
// One forward pass is a single synchronous dataflow graph; the
// model holds no mutable state across calls except its parameters,
// which only an external optimizer updates.

/// Sequence encoder variants
pub mod encoder;

/// Attention pooling over recurrent final states
pub mod attention;

/// Linear-chain conditional random field
pub mod crf;

/// Pairwise relation-selection head
pub mod relation;

/// Joint model orchestration
pub mod joint;

pub use joint::{JointModel, JointOutput};
