// ============================================================
// Domain Layer
// ============================================================
// Pure Rust types that define what the system talks about,
// with no Burn tensors, no I/O and no ML code:
//
//   vocab.rs  — closed tag and relation vocabularies
//   triple.rs — entity spans and (subject, relation, object)
//               triples, the shape the downstream consumer gets
//   traits.rs — boundary traits for collaborators that live
//               outside this crate (graph persistence)
//
// Keeping this layer framework-free means the decoding logic in
// `triples` is testable without constructing a model.

// Tag and relation id <-> name tables
pub mod vocab;

// Entity spans and extracted triples
pub mod triple;

// Boundary traits implemented outside the crate
pub mod traits;
