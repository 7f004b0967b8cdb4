// ============================================================
// Sequence Encoder Variants
// ============================================================
// Contract shared by all variants:
//
//   encode(tokens [B, L] Int, mask [B, L] Int)
//       -> features [B, L, 2H] (+ optional final state)
//
// The factor 2 comes from bidirectionality in the recurrent
// variant; the transformer variants run at d_model = 2H so the
// downstream heads see one width regardless of the encoder.
//
// Only the recurrent variant yields a final hidden state, which
// attention pooling needs; config validation rejects attention
// with the transformer variants before construction.

use burn::{
    module::Param,
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        gru::{Gru, GruConfig},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear,
        LinearConfig,
    },
    prelude::*,
    tensor::Distribution,
};

use crate::config::JointModelConfig;

/// Output of one encoding pass.
pub struct Encoded<B: Backend> {
    /// Contextual per-token features, shape [B, L, 2H].
    pub features: Tensor<B, 3>,

    /// Final per-layer, per-direction hidden states, shape
    /// [B, H, 2 * num_layers]. Recurrent variant only.
    pub final_state: Option<Tensor<B, 3>>,
}

/// The encoder strategy, fixed at construction. The forward path
/// dispatches once here and never branches on the variant again.
#[derive(Module, Debug)]
pub enum Encoder<B: Backend> {
    Recurrent(RecurrentEncoder<B>),
    Transformer(TransformerEncoder<B>),
    SharedTransformer(SharedTransformerEncoder<B>),
}

impl<B: Backend> Encoder<B> {
    pub fn encode(&self, tokens: Tensor<B, 2, Int>, mask: Tensor<B, 2, Int>) -> Encoded<B> {
        match self {
            Encoder::Recurrent(e) => e.encode(tokens),
            Encoder::Transformer(e) => e.encode(tokens, mask),
            Encoder::SharedTransformer(e) => e.encode(tokens, mask),
        }
    }
}

// ─── Recurrent variant ────────────────────────────────────────────────────────

/// One bidirectional layer: a forward GRU plus a backward GRU run
/// over the flipped sequence, outputs concatenated to 2H.
#[derive(Module, Debug)]
pub struct BiGruLayer<B: Backend> {
    forward_rnn: Gru<B>,
    backward_rnn: Gru<B>,
    hidden_dim: usize,
}

impl<B: Backend> BiGruLayer<B> {
    fn init(d_input: usize, d_hidden: usize, device: &B::Device) -> Self {
        Self {
            forward_rnn: GruConfig::new(d_input, d_hidden, true).init(device),
            backward_rnn: GruConfig::new(d_input, d_hidden, true).init(device),
            hidden_dim: d_hidden,
        }
    }

    /// Returns (features [B, L, 2H], forward final [B, H],
    /// backward final [B, H]).
    ///
    /// The initial hidden state is redrawn from a standard normal
    /// on every call: batches are independent, never continuations
    /// of a longer sequence.
    fn forward(&self, input: Tensor<B, 3>) -> (Tensor<B, 3>, Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, seq_len, _] = input.dims();
        let device = input.device();

        // Burn's GRU takes its state as a [B, L, H] buffer.
        let state_shape = [batch, seq_len, self.hidden_dim];
        let init_f = Tensor::random(state_shape, Distribution::Normal(0.0, 1.0), &device);
        let init_b = Tensor::random(state_shape, Distribution::Normal(0.0, 1.0), &device);

        let out_f = self.forward_rnn.forward(input.clone(), Some(init_f));
        // Flip, run, flip back so position t of both directions
        // lines up.
        let out_b = self
            .backward_rnn
            .forward(input.flip([1]), Some(init_b))
            .flip([1]);

        let final_f = out_f
            .clone()
            .slice([0..batch, seq_len - 1..seq_len, 0..self.hidden_dim])
            .reshape([batch, self.hidden_dim]);
        // After flipping back, the backward direction's last step
        // sits at position 0.
        let final_b = out_b
            .clone()
            .slice([0..batch, 0..1, 0..self.hidden_dim])
            .reshape([batch, self.hidden_dim]);

        (Tensor::cat(vec![out_f, out_b], 2), final_f, final_b)
    }
}

/// Stacked bidirectional GRU over (optionally pretrained) token
/// embeddings.
#[derive(Module, Debug)]
pub struct RecurrentEncoder<B: Backend> {
    embedding: Embedding<B>,
    embedding_dropout: Dropout,
    layers: Vec<BiGruLayer<B>>,
    inter_dropout: Dropout,
}

impl<B: Backend> RecurrentEncoder<B> {
    /// `pretrained`, when given, replaces the embedding table with
    /// a [vocab_size, embedding_dim] matrix. The table stays
    /// trainable either way.
    pub fn init(
        cfg: &JointModelConfig,
        device: &B::Device,
        pretrained: Option<Tensor<B, 2>>,
    ) -> Self {
        let mut embedding =
            EmbeddingConfig::new(cfg.vocab_size, cfg.embedding_dim).init(device);
        if let Some(table) = pretrained {
            tracing::info!("initializing token embeddings from pretrained table");
            embedding.weight = Param::from_tensor(table);
        }

        let layers = (0..cfg.num_layers)
            .map(|i| {
                let d_input = if i == 0 { cfg.embedding_dim } else { 2 * cfg.hidden_dim };
                BiGruLayer::init(d_input, cfg.hidden_dim, device)
            })
            .collect();

        Self {
            embedding,
            embedding_dropout: DropoutConfig::new(cfg.embedding_dropout).init(),
            layers,
            inter_dropout: DropoutConfig::new(cfg.recurrent_dropout).init(),
        }
    }

    fn encode(&self, tokens: Tensor<B, 2, Int>) -> Encoded<B> {
        let mut x = self.embedding_dropout.forward(self.embedding.forward(tokens));

        // Final states collected in (fwd, bwd) order per layer,
        // stacked to [B, H, 2 * num_layers] for attention pooling.
        let mut finals: Vec<Tensor<B, 2>> = Vec::with_capacity(2 * self.layers.len());
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            let (features, final_f, final_b) = layer.forward(x);
            finals.push(final_f);
            finals.push(final_b);
            x = if i < last { self.inter_dropout.forward(features) } else { features };
        }

        let final_state = Tensor::stack::<3>(finals, 2);
        Encoded { features: x, final_state: Some(final_state) }
    }
}

// ─── Transformer variants ─────────────────────────────────────────────────────

/// One pre-norm-free (post-norm) encoder block: self-attention
/// with pad masking, GELU feed-forward, residuals + layer norm.
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    self_attn: MultiHeadAttention<B>,
    ffn_linear1: Linear<B>,
    ffn_linear2: Linear<B>,
    norm1: LayerNorm<B>,
    norm2: LayerNorm<B>,
    dropout: Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    fn init(d_model: usize, num_heads: usize, d_ff: usize, dropout: f64, device: &B::Device) -> Self {
        Self {
            self_attn: MultiHeadAttentionConfig::new(d_model, num_heads)
                .with_dropout(dropout)
                .init(device),
            ffn_linear1: LinearConfig::new(d_model, d_ff).init(device),
            ffn_linear2: LinearConfig::new(d_ff, d_model).init(device),
            norm1: LayerNormConfig::new(d_model).init(device),
            norm2: LayerNormConfig::new(d_model).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self
            .ffn_linear2
            .forward(burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

fn position_embeddings<B: Backend>(
    position_embedding: &Embedding<B>,
    batch: usize,
    seq_len: usize,
    device: &B::Device,
) -> Tensor<B, 3> {
    // Self-attention is permutation-invariant, so position is
    // injected explicitly.
    let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, device)
        .unsqueeze::<2>()
        .expand([batch, seq_len]);
    position_embedding.forward(positions)
}

/// Padding positions (mask == 0) become true so attention skips
/// them.
fn pad_mask_from<B: Backend>(mask: Tensor<B, 2, Int>) -> Tensor<B, 2, Bool> {
    mask.equal_elem(0)
}

/// Transformer encoder with distinct weights per layer, running at
/// d_model = 2H.
#[derive(Module, Debug)]
pub struct TransformerEncoder<B: Backend> {
    token_embedding: Embedding<B>,
    position_embedding: Embedding<B>,
    blocks: Vec<EncoderBlock<B>>,
    dropout: Dropout,
}

impl<B: Backend> TransformerEncoder<B> {
    pub fn init(cfg: &JointModelConfig, device: &B::Device) -> Self {
        let d_model = 2 * cfg.hidden_dim;
        Self {
            token_embedding: EmbeddingConfig::new(cfg.vocab_size, d_model).init(device),
            position_embedding: EmbeddingConfig::new(cfg.max_seq_len, d_model).init(device),
            blocks: (0..cfg.num_layers)
                .map(|_| {
                    EncoderBlock::init(
                        d_model,
                        cfg.num_heads,
                        cfg.ffn_dim,
                        cfg.transformer_dropout,
                        device,
                    )
                })
                .collect(),
            dropout: DropoutConfig::new(cfg.transformer_dropout).init(),
        }
    }

    fn encode(&self, tokens: Tensor<B, 2, Int>, mask: Tensor<B, 2, Int>) -> Encoded<B> {
        let [batch, seq_len] = tokens.dims();
        let device = tokens.device();
        let pad_mask = pad_mask_from(mask);

        let tok_emb = self.token_embedding.forward(tokens);
        let pos_emb = position_embeddings(&self.position_embedding, batch, seq_len, &device);
        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for block in &self.blocks {
            x = block.forward(x, pad_mask.clone());
        }
        Encoded { features: x, final_state: None }
    }
}

/// Compact transformer: one block reused across the configured
/// depth (cross-layer weight sharing) and a factorized token
/// embedding (embed narrow, project up to 2H).
#[derive(Module, Debug)]
pub struct SharedTransformerEncoder<B: Backend> {
    token_embedding: Embedding<B>,
    embedding_projection: Linear<B>,
    position_embedding: Embedding<B>,
    block: EncoderBlock<B>,
    num_layers: usize,
    dropout: Dropout,
}

impl<B: Backend> SharedTransformerEncoder<B> {
    pub fn init(cfg: &JointModelConfig, device: &B::Device) -> Self {
        let d_model = 2 * cfg.hidden_dim;
        Self {
            token_embedding: EmbeddingConfig::new(cfg.vocab_size, cfg.embedding_dim).init(device),
            embedding_projection: LinearConfig::new(cfg.embedding_dim, d_model).init(device),
            position_embedding: EmbeddingConfig::new(cfg.max_seq_len, d_model).init(device),
            block: EncoderBlock::init(
                d_model,
                cfg.num_heads,
                cfg.ffn_dim,
                cfg.transformer_dropout,
                device,
            ),
            num_layers: cfg.num_layers,
            dropout: DropoutConfig::new(cfg.transformer_dropout).init(),
        }
    }

    fn encode(&self, tokens: Tensor<B, 2, Int>, mask: Tensor<B, 2, Int>) -> Encoded<B> {
        let [batch, seq_len] = tokens.dims();
        let device = tokens.device();
        let pad_mask = pad_mask_from(mask);

        let tok_emb = self.embedding_projection.forward(self.token_embedding.forward(tokens));
        let pos_emb = position_embeddings(&self.position_embedding, batch, seq_len, &device);
        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for _ in 0..self.num_layers {
            x = self.block.forward(x, pad_mask.clone());
        }
        Encoded { features: x, final_state: None }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderKind;

    type TestBackend = burn::backend::NdArray;

    fn cfg() -> JointModelConfig {
        JointModelConfig::new(50, 5, 4, 16, 8)
            .with_embedding_dim(12)
            .with_hidden_dim(10)
            .with_num_layers(2)
            .with_num_heads(2)
            .with_ffn_dim(32)
            .with_max_seq_len(16)
    }

    fn toy_batch(device: &<TestBackend as Backend>::Device) -> (Tensor<TestBackend, 2, Int>, Tensor<TestBackend, 2, Int>) {
        let tokens = Tensor::from_ints([[3, 4, 5, 0], [6, 7, 0, 0]], device);
        let mask = Tensor::from_ints([[1, 1, 1, 0], [1, 1, 0, 0]], device);
        (tokens, mask)
    }

    #[test]
    fn test_recurrent_shapes_and_final_state() {
        let device = Default::default();
        let enc = RecurrentEncoder::<TestBackend>::init(&cfg(), &device, None);
        let (tokens, _mask) = toy_batch(&device);
        let out = enc.encode(tokens);
        assert_eq!(out.features.dims(), [2, 4, 20]);
        assert_eq!(out.final_state.unwrap().dims(), [2, 10, 4]);
    }

    #[test]
    fn test_transformer_shapes_no_final_state() {
        let device = Default::default();
        let enc = TransformerEncoder::<TestBackend>::init(&cfg(), &device);
        let (tokens, mask) = toy_batch(&device);
        let out = enc.encode(tokens, mask);
        assert_eq!(out.features.dims(), [2, 4, 20]);
        assert!(out.final_state.is_none());
    }

    #[test]
    fn test_shared_transformer_shapes() {
        let device = Default::default();
        let c = cfg().with_encoder(EncoderKind::SharedTransformer);
        let enc = SharedTransformerEncoder::<TestBackend>::init(&c, &device);
        let (tokens, mask) = toy_batch(&device);
        let out = enc.encode(tokens, mask);
        assert_eq!(out.features.dims(), [2, 4, 20]);
        assert!(out.final_state.is_none());
    }

    #[test]
    fn test_pretrained_table_is_used() {
        let device = Default::default();
        let c = cfg();
        let table = Tensor::<TestBackend, 2>::ones([c.vocab_size, c.embedding_dim], &device);
        let enc = RecurrentEncoder::<TestBackend>::init(&c, &device, Some(table));
        let weight: Vec<f32> = enc.embedding.weight.val().into_data().iter::<f32>().collect();
        assert!(weight.iter().all(|&w| (w - 1.0).abs() < 1e-6));
    }
}
