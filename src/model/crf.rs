// ============================================================
// Linear-Chain Conditional Random Field
// ============================================================
// Sequence-level tag model over per-token emission scores, with
// learned transition weights plus dedicated start and end
// transition vectors:
//
//   score(y, x) = start[y_0] + Σ_t emit[t, y_t]
//               + Σ_t trans[y_{t-1}, y_t] + end[y_last]
//
// Training computes the masked negative log-likelihood of the
// gold path with the forward algorithm (a log-sum-exp recursion
// over the sequence, differentiable end to end). Inference runs
// Viterbi decoding on the host; the decoded path of each example
// stops at its true length, so padding never leaks into either
// the likelihood or the prediction.

use burn::{module::Param, prelude::*, tensor::Distribution};

#[derive(Module, Debug)]
pub struct LinearChainCrf<B: Backend> {
    /// Transition weights, [T, T], indexed [from, to].
    transitions: Param<Tensor<B, 2>>,

    /// Score of starting a sequence in each tag, [T].
    start_transitions: Param<Tensor<B, 1>>,

    /// Score of ending a sequence in each tag, [T].
    end_transitions: Param<Tensor<B, 1>>,

    num_tags: usize,
}

impl<B: Backend> LinearChainCrf<B> {
    pub fn init(num_tags: usize, device: &B::Device) -> Self {
        // Small uniform init keeps early likelihoods well scaled.
        let uniform = Distribution::Uniform(-0.1, 0.1);
        Self {
            transitions: Param::from_tensor(Tensor::random(
                [num_tags, num_tags],
                uniform,
                device,
            )),
            start_transitions: Param::from_tensor(Tensor::random([num_tags], uniform, device)),
            end_transitions: Param::from_tensor(Tensor::random([num_tags], uniform, device)),
            num_tags,
        }
    }

    /// Negative log-likelihood of the gold tag paths, summed over
    /// the batch. Steps with mask 0 contribute nothing.
    ///
    /// emissions: [B, L, T], tags: [B, L], mask: [B, L] (1 = real,
    /// real tokens form a prefix).
    pub fn nll(
        &self,
        emissions: Tensor<B, 3>,
        tags: Tensor<B, 2, Int>,
        mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 1> {
        let gold = self.path_score(emissions.clone(), tags, mask.clone());
        let log_z = self.partition(emissions, mask);
        (gold - log_z).neg().sum()
    }

    /// Score of the gold path per example, [B, 1].
    fn path_score(
        &self,
        emissions: Tensor<B, 3>,
        tags: Tensor<B, 2, Int>,
        mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let [batch, seq_len, t] = emissions.dims();
        let device = emissions.device();
        let mask_f = mask.clone().float();

        // Emission score of the gold tag at every valid step.
        let emit_scores = emissions
            .gather(2, tags.clone().unsqueeze_dim::<3>(2))
            .reshape([batch, seq_len]);
        let emit_sum = (emit_scores * mask_f.clone()).sum_dim(1); // [B, 1]

        // Transition scores along the gold path. A step counts only
        // if its target position is valid; since real tokens form a
        // prefix, the source is then valid too.
        let trans_sum = if seq_len > 1 {
            let prev = tags.clone().slice([0..batch, 0..seq_len - 1]);
            let next = tags.clone().slice([0..batch, 1..seq_len]);
            let flat_index = prev.mul_scalar(t as i64) + next;
            let flat_trans = self
                .transitions
                .val()
                .reshape([1, t * t])
                .expand([batch, t * t]);
            let step_mask = mask_f.slice([0..batch, 1..seq_len]);
            (flat_trans.gather(1, flat_index) * step_mask).sum_dim(1)
        } else {
            Tensor::zeros([batch, 1], &device)
        };

        let start_score = self
            .start_transitions
            .val()
            .reshape([1, t])
            .expand([batch, t])
            .gather(1, tags.clone().slice([0..batch, 0..1]));

        // End transition of the tag at the last valid position.
        let lengths = mask.sum_dim(1); // [B, 1], Int
        let last_tags = tags.gather(1, lengths.sub_scalar(1));
        let end_score = self
            .end_transitions
            .val()
            .reshape([1, t])
            .expand([batch, t])
            .gather(1, last_tags);

        emit_sum + trans_sum + start_score + end_score
    }

    /// Log partition function per example, [B, 1], via the forward
    /// algorithm. On masked steps the recursion carries the old
    /// alpha through unchanged.
    fn partition(&self, emissions: Tensor<B, 3>, mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch, seq_len, t] = emissions.dims();
        let mask_f = mask.float();

        let start = self.start_transitions.val().reshape([1, t]).expand([batch, t]);
        let mut alpha = emissions
            .clone()
            .slice([0..batch, 0..1, 0..t])
            .reshape([batch, t])
            + start; // [B, T]

        let trans = self.transitions.val().unsqueeze::<3>(); // [1, T, T]

        for step in 1..seq_len {
            let emit_t = emissions
                .clone()
                .slice([0..batch, step..step + 1, 0..t])
                .reshape([batch, t]);

            // scores[b, i, j] = alpha[b, i] + trans[i, j] + emit[b, j]
            let scores = alpha.clone().unsqueeze_dim::<3>(2)
                + trans.clone()
                + emit_t.unsqueeze_dim::<3>(1);
            let next = logsumexp_mid(scores); // [B, T]

            let mask_t = mask_f.clone().slice([0..batch, step..step + 1]); // [B, 1]
            let keep = mask_t.clone().neg().add_scalar(1.0);
            alpha = next * mask_t + alpha * keep;
        }

        alpha = alpha + self.end_transitions.val().unsqueeze::<2>();
        logsumexp_last(alpha)
    }

    /// Most probable tag path per example (Viterbi), truncated to
    /// the true length given by the mask.
    ///
    /// Decoding carries no gradient, so it runs on host data.
    pub fn decode(&self, emissions: Tensor<B, 3>, mask: Tensor<B, 2, Int>) -> Vec<Vec<usize>> {
        let [batch, seq_len, t] = emissions.dims();
        let emit: Vec<f32> = emissions.into_data().iter::<f32>().collect();
        let trans: Vec<f32> = self.transitions.val().into_data().iter::<f32>().collect();
        let start: Vec<f32> = self.start_transitions.val().into_data().iter::<f32>().collect();
        let end: Vec<f32> = self.end_transitions.val().into_data().iter::<f32>().collect();
        let mask_host: Vec<i64> = mask.into_data().iter::<i64>().collect();

        let mut paths = Vec::with_capacity(batch);
        for n in 0..batch {
            let len = mask_host[n * seq_len..(n + 1) * seq_len]
                .iter()
                .filter(|&&m| m != 0)
                .count();
            if len == 0 {
                paths.push(Vec::new());
                continue;
            }

            let e = |step: usize, tag: usize| emit[n * seq_len * t + step * t + tag];

            // score[tag] = best score of any path ending in tag at
            // the current step; backptr remembers the argmax.
            let mut score: Vec<f32> = (0..t).map(|j| start[j] + e(0, j)).collect();
            let mut backptr: Vec<Vec<usize>> = Vec::with_capacity(len);

            for step in 1..len {
                let mut next = vec![f32::NEG_INFINITY; t];
                let mut ptr = vec![0usize; t];
                for cur in 0..t {
                    for prev in 0..t {
                        let s = score[prev] + trans[prev * t + cur];
                        if s > next[cur] {
                            next[cur] = s;
                            ptr[cur] = prev;
                        }
                    }
                    next[cur] += e(step, cur);
                }
                score = next;
                backptr.push(ptr);
            }

            let mut best_tag = 0;
            let mut best_score = f32::NEG_INFINITY;
            for (j, s) in score.iter().enumerate() {
                let total = s + end[j];
                if total > best_score {
                    best_score = total;
                    best_tag = j;
                }
            }

            let mut path = vec![best_tag];
            for ptr in backptr.iter().rev() {
                path.push(ptr[*path.last().unwrap()]);
            }
            path.reverse();
            paths.push(path);
        }
        paths
    }
}

/// Log-sum-exp over the middle axis of [B, T, T] -> [B, T],
/// stabilised by subtracting the per-slice maximum.
fn logsumexp_mid<B: Backend>(scores: Tensor<B, 3>) -> Tensor<B, 2> {
    let [batch, _, t] = scores.dims();
    let max = scores.clone().max_dim(1); // [B, 1, T]
    let summed = (scores - max.clone()).exp().sum_dim(1).log() + max;
    summed.reshape([batch, t])
}

/// Log-sum-exp over the last axis of [B, T] -> [B, 1].
fn logsumexp_last<B: Backend>(scores: Tensor<B, 2>) -> Tensor<B, 2> {
    let max = scores.clone().max_dim(1); // [B, 1]
    (scores - max.clone()).exp().sum_dim(1).log() + max
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    /// CRF with all transition parameters zeroed, so only the
    /// emissions drive scores.
    fn zeroed_crf(num_tags: usize) -> LinearChainCrf<TestBackend> {
        let device = Default::default();
        let mut crf = LinearChainCrf::init(num_tags, &device);
        crf.transitions = Param::from_tensor(Tensor::zeros([num_tags, num_tags], &device));
        crf.start_transitions = Param::from_tensor(Tensor::zeros([num_tags], &device));
        crf.end_transitions = Param::from_tensor(Tensor::zeros([num_tags], &device));
        crf
    }

    #[test]
    fn test_decode_respects_mask_length() {
        let device = Default::default();
        let crf = LinearChainCrf::<TestBackend>::init(3, &device);
        let emissions = Tensor::random([2, 5, 3], Distribution::Normal(0.0, 1.0), &device);
        let mask = Tensor::from_ints([[1, 1, 1, 0, 0], [1, 1, 1, 1, 1]], &device);

        let paths = crf.decode(emissions, mask);
        assert_eq!(paths[0].len(), 3);
        assert_eq!(paths[1].len(), 5);
    }

    #[test]
    fn test_decode_matches_emission_argmax_without_transitions() {
        let device = Default::default();
        let crf = zeroed_crf(3);
        // Per-step argmax: [2, 0, 1].
        let emissions = Tensor::<TestBackend, 3>::from_floats(
            [[[0.1, 0.2, 5.0], [4.0, 0.3, 0.1], [0.2, 3.0, 0.4]]],
            &device,
        );
        let mask = Tensor::from_ints([[1, 1, 1]], &device);

        let paths = crf.decode(emissions, mask);
        assert_eq!(paths[0], vec![2, 0, 1]);
    }

    #[test]
    fn test_nll_finite_and_non_negative() {
        let device = Default::default();
        let crf = LinearChainCrf::<TestBackend>::init(4, &device);
        let emissions = Tensor::random([2, 6, 4], Distribution::Normal(0.0, 1.0), &device);
        let tags = Tensor::from_ints([[1, 2, 3, 0, 0, 0], [2, 2, 1, 3, 0, 0]], &device);
        let mask = Tensor::from_ints([[1, 1, 1, 0, 0, 0], [1, 1, 1, 1, 0, 0]], &device);

        let loss: f32 = crf.nll(emissions, tags, mask).into_scalar().elem();
        assert!(loss.is_finite());
        // NLL of a normalised distribution is non-negative.
        assert!(loss >= 0.0, "nll {loss} < 0");
    }

    #[test]
    fn test_padding_does_not_change_nll() {
        let device = Default::default();
        let crf = LinearChainCrf::<TestBackend>::init(3, &device);
        let mask = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 0, 0]], &device);
        let tags = Tensor::from_ints([[1, 2, 0, 0]], &device);

        let base = Tensor::<TestBackend, 3>::from_floats(
            [[[0.5, 1.0, -0.5], [1.5, 0.0, 2.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]]],
            &device,
        );
        // Same emissions with garbage in the padded tail.
        let noisy = Tensor::<TestBackend, 3>::from_floats(
            [[[0.5, 1.0, -0.5], [1.5, 0.0, 2.0], [9.0, -9.0, 4.0], [-3.0, 7.0, 1.0]]],
            &device,
        );

        let a: f32 = crf
            .nll(base, tags.clone(), mask.clone())
            .into_scalar()
            .elem();
        let b: f32 = crf.nll(noisy, tags, mask).into_scalar().elem();
        assert!((a - b).abs() < 1e-4, "padding leaked into nll: {a} vs {b}");
    }

    #[test]
    fn test_strong_transitions_override_emissions() {
        let device = Default::default();
        let mut crf = zeroed_crf(2);
        // Make tag 0 -> tag 1 overwhelmingly preferred.
        crf.transitions = Param::from_tensor(Tensor::from_floats(
            [[-10.0, 10.0], [-10.0, -10.0]],
            &device,
        ));
        // Emissions alone would pick [0, 0].
        let emissions =
            Tensor::<TestBackend, 3>::from_floats([[[1.0, 0.0], [1.0, 0.5]]], &device);
        let mask = Tensor::from_ints([[1, 1]], &device);

        let paths = crf.decode(emissions, mask);
        assert_eq!(paths[0], vec![0, 1]);
    }
}
