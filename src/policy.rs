// ============================================================
// Forward Mode & Teacher-Forcing Policy
// ============================================================
// The relation head consumes a tag sequence that is either the
// gold annotation or the CRF's own prediction. Which one is a
// per-step stochastic decision, isolated here as a plain function
// with an injected RNG so the model stays deterministic under a
// substituted generator.

use rand::Rng;

/// The three ways a batch can flow through the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    /// Compute both losses; tag source follows the teacher-forcing
    /// draw.
    Train,

    /// Compute both losses; tag source is always the prediction,
    /// so the measured loss reflects end-to-end behaviour.
    Eval,

    /// No losses, predictions only.
    Infer,
}

/// Which tag sequence feeds the relation head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    /// The gold tag annotation from the batch.
    Gold,

    /// The CRF-decoded prediction.
    Predicted,
}

/// Teacher-forcing rule.
///
/// In `Train` mode a uniform draw above `teach_rate` selects the
/// gold tags, i.e. gold is used with probability `1 - teach_rate`;
/// otherwise the prediction is used, exposing the relation head to
/// its own tagging noise. `Eval` and `Infer` never see gold.
pub fn choose_labels(mode: ForwardMode, teach_rate: f64, rng: &mut impl Rng) -> LabelSource {
    match mode {
        ForwardMode::Train => {
            if rng.gen::<f64>() > teach_rate {
                LabelSource::Gold
            } else {
                LabelSource::Predicted
            }
        }
        ForwardMode::Eval | ForwardMode::Infer => LabelSource::Predicted,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_eval_never_uses_gold() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            // Regardless of the draw, eval must stay on predictions.
            assert_eq!(
                choose_labels(ForwardMode::Eval, 0.0, &mut rng),
                LabelSource::Predicted
            );
        }
    }

    #[test]
    fn test_infer_never_uses_gold() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert_eq!(
                choose_labels(ForwardMode::Infer, 0.0, &mut rng),
                LabelSource::Predicted
            );
        }
    }

    #[test]
    fn test_train_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        // teach_rate 1.0: the draw can never exceed it.
        for _ in 0..1000 {
            assert_eq!(
                choose_labels(ForwardMode::Train, 1.0, &mut rng),
                LabelSource::Predicted
            );
        }
        // teach_rate 0.0: a uniform draw in (0, 1) always exceeds it.
        for _ in 0..1000 {
            assert_eq!(
                choose_labels(ForwardMode::Train, 0.0, &mut rng),
                LabelSource::Gold
            );
        }
    }

    #[test]
    fn test_train_mixes_both_sources() {
        let mut rng = StdRng::seed_from_u64(7);
        let draws: Vec<LabelSource> = (0..1000)
            .map(|_| choose_labels(ForwardMode::Train, 0.5, &mut rng))
            .collect();
        let gold = draws.iter().filter(|s| **s == LabelSource::Gold).count();
        // At rate 0.5 both outcomes must occur; the exact split is
        // around 500 either way.
        assert!(gold > 300 && gold < 700, "gold count {gold} implausible");
    }
}
