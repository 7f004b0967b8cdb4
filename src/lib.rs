// ============================================================
// Joint Entity & Relation Extraction
// ============================================================
// A Burn implementation of a joint model that reads a tokenised
// sentence once and predicts both its entity mentions and the
// relations between them:
//
//   1. a sequence encoder (bidirectional GRU stack, or a
//      transformer / weight-shared transformer variant) turns
//      token ids into contextual features,
//   2. a linear-chain CRF scores and decodes BIO tag paths,
//   3. a pairwise selection head scores every ordered token pair
//      against every relation type.
//
// The two tasks share the encoder and are coupled through the
// predicted (or, under teacher forcing, gold) tag embeddings that
// feed the relation head. Training minimises the sum of the CRF
// negative log-likelihood and a masked, class-weighted relation
// BCE.
//
// Layering, outside in:
//
//   domain   — vocabularies, spans, triples, boundary traits;
//              no tensors
//   data     — samples, datasets and the tensor batcher
//   model    — encoder, attention pooling, CRF, relation head
//              and the joint model tying them together
//   policy   — the teacher-forcing label-source decision
//   triples  — decoding predictions into persistable triples
//
// The crate is a library: tokenisation, training orchestration
// and persistence live with its consumers, behind the `domain`
// boundary traits and the plain data types in `data`.

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod model;
pub mod policy;
pub mod triples;

pub use config::{EncoderKind, JointModelConfig};
pub use data::batcher::{JointBatch, JointBatcher};
pub use data::dataset::{JointDataset, JointSample};
pub use error::ModelError;
pub use model::{JointModel, JointOutput};
pub use policy::{ForwardMode, LabelSource};
