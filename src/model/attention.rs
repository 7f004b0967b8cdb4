// ============================================================
// Attention Pooling
// ============================================================
// Produces one scalar weight per token position from the
// recurrent encoder's output and final hidden states. The weight
// is concatenated onto the NER and relation inputs as an extra
// feature channel; it carries no loss of its own.
//
// Computation:
//   1. collapse the bidirectional output by summing its forward
//      and backward halves, tanh         -> [B, L, H]
//   2. project the stacked final states over the layer axis
//      down to one vector per example    -> [B, H, 1]
//   3. batched dot product of 1 and 2    -> [B, L]
//   4. softmax over the sequence axis    -> [B, L, 1]
//
// Invariant: the weights of one example sum to 1 over L.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{softmax, tanh},
};

#[derive(Module, Debug)]
pub struct AttentionPooling<B: Backend> {
    layer_proj: Linear<B>,
    hidden_dim: usize,
}

impl<B: Backend> AttentionPooling<B> {
    /// `num_layers` is the recurrent encoder depth; the projection
    /// collapses its 2 * num_layers final states.
    pub fn init(hidden_dim: usize, num_layers: usize, device: &B::Device) -> Self {
        Self {
            layer_proj: LinearConfig::new(2 * num_layers, 1).init(device),
            hidden_dim,
        }
    }

    /// encoder_out: [B, L, 2H]; final_state: [B, H, 2 * layers].
    /// Returns per-position weights [B, L, 1].
    pub fn forward(&self, encoder_out: Tensor<B, 3>, final_state: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, seq_len, _] = encoder_out.dims();
        let h = self.hidden_dim;

        let forward_half = encoder_out.clone().slice([0..batch, 0..seq_len, 0..h]);
        let backward_half = encoder_out.slice([0..batch, 0..seq_len, h..2 * h]);
        let out_squeeze = tanh(forward_half + backward_half); // [B, L, H]

        let hidden_squeeze = self.layer_proj.forward(final_state); // [B, H, 1]

        let scores = out_squeeze
            .matmul(hidden_squeeze)
            .reshape([batch, seq_len]); // [B, L]

        softmax(scores, 1).unsqueeze_dim(2) // [B, L, 1]
    }
}
