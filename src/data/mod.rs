// ============================================================
// Data Layer
// ============================================================
// From annotated samples to device-ready tensor batches:
//
//   JointSample  → one padded, annotated sentence
//       │
//       ▼
//   JointDataset → implements Burn's Dataset trait
//       │
//       ▼
//   JointBatcher → stacks samples into JointBatch tensors
//       │
//       ▼
//   DataLoader   → feeds batches to training / inference
//
// Tokenization, sentence splitting and padding happen upstream of
// this crate; every sample arrives already padded to one uniform
// length with its mask built. The batcher only stacks.

/// Annotated samples and the Burn Dataset impl
pub mod dataset;

/// Stacks samples into tensor batches on one device
pub mod batcher;
