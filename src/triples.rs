// ============================================================
// Triple Decoding
// ============================================================
// Turns raw model predictions into the shapes a consumer can
// persist: BIO tag paths become entity spans, and the binary
// relation tensor becomes (subject, relation, object) triples
// joining the spans that contain the flagged token positions.
//
// This layer is deliberately tensor-light: the only tensor it
// touches is the [B, L, L, R] decision tensor, read once into
// host memory. Everything after that is plain Rust over the
// domain types, so span grouping and triple assembly are testable
// without a model.

use burn::prelude::*;

use crate::domain::{
    triple::{EntitySpan, Triple},
    vocab::{BioRole, RelationVocab, TagVocab},
};

/// Group a decoded tag path into contiguous entity spans.
///
/// Decoding is tolerant: an I- tag without a matching open span
/// (stray continuation, or a type switch mid-span) opens a new
/// span rather than being dropped, which keeps every non-outside
/// token inside some span.
pub fn spans_from_tags(tags: &[usize], vocab: &TagVocab) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    let mut open: Option<EntitySpan> = None;

    for (pos, &tag) in tags.iter().enumerate() {
        match vocab.role(tag) {
            BioRole::Begin => {
                spans.extend(open.take());
                let ty = vocab.entity_type(tag).unwrap_or_default();
                open = Some(EntitySpan::new(pos, pos + 1, ty));
            }
            BioRole::Inside => {
                let ty = vocab.entity_type(tag).unwrap_or_default();
                match &mut open {
                    Some(span) if span.entity_type == ty => span.end = pos + 1,
                    _ => {
                        spans.extend(open.take());
                        open = Some(EntitySpan::new(pos, pos + 1, ty));
                    }
                }
            }
            BioRole::Outside => spans.extend(open.take()),
        }
    }
    spans.extend(open);
    spans
}

/// Join predicted relation positions to the spans containing them.
///
/// `pairs` holds (subject position, object position, relation id)
/// entries; a pair whose subject or object falls outside every
/// span, or whose relation id is background or unknown, is
/// dropped. Results are deduplicated, so head-token and tail-token
/// flags of the same span pair collapse into one triple.
pub fn assemble_triples(
    spans: &[EntitySpan],
    pairs: &[(usize, usize, usize)],
    relations: &RelationVocab,
) -> Vec<Triple> {
    let span_at = |pos: usize| spans.iter().find(|s| s.contains(pos));

    let mut triples: Vec<Triple> = Vec::new();
    for &(subject_pos, object_pos, rel) in pairs {
        if rel == 0 {
            continue;
        }
        let (Some(subject), Some(object), Some(name)) =
            (span_at(subject_pos), span_at(object_pos), relations.name(rel))
        else {
            continue;
        };
        let triple = Triple::new(subject.clone(), name, object.clone());
        if !triples.contains(&triple) {
            triples.push(triple);
        }
    }
    triples
}

/// Read the binary decision tensor of one example back to sparse
/// (subject, object, relation) entries, restricted to the first
/// `length` positions. Dim 1 of the tensor is the subject axis,
/// dim 2 the object axis.
pub fn relation_pairs<B: Backend>(
    decisions: Tensor<B, 4, Int>,
    example: usize,
    length: usize,
) -> Vec<(usize, usize, usize)> {
    let [_, seq_len, _, num_relations] = decisions.dims();
    let flat: Vec<i64> = decisions
        .slice([example..example + 1])
        .into_data()
        .iter::<i64>()
        .collect();

    let mut pairs = Vec::new();
    for subject in 0..length.min(seq_len) {
        for object in 0..length.min(seq_len) {
            for rel in 1..num_relations {
                let idx = (subject * seq_len + object) * num_relations + rel;
                if flat[idx] != 0 {
                    pairs.push((subject, object, rel));
                }
            }
        }
    }
    pairs
}

/// Full decode of one example: tag path + decision tensor in,
/// triples out.
pub fn decode_example<B: Backend>(
    tags: &[usize],
    decisions: Tensor<B, 4, Int>,
    example: usize,
    tag_vocab: &TagVocab,
    relation_vocab: &RelationVocab,
) -> Vec<Triple> {
    let spans = spans_from_tags(tags, tag_vocab);
    let pairs = relation_pairs(decisions, example, tags.len());
    assemble_triples(&spans, &pairs, relation_vocab)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn vocab() -> TagVocab {
        TagVocab::from_entity_types(&["PER", "ORG"])
    }

    fn relations() -> RelationVocab {
        RelationVocab::new(
            ["none", "works_for", "founded", "located_in"]
                .map(String::from)
                .to_vec(),
        )
    }

    #[test]
    fn test_span_grouping() {
        // O  B-PER I-PER O  B-ORG
        let spans = spans_from_tags(&[0, 1, 2, 0, 3], &vocab());
        assert_eq!(
            spans,
            vec![EntitySpan::new(1, 3, "PER"), EntitySpan::new(4, 5, "ORG")]
        );
    }

    #[test]
    fn test_adjacent_begins_split_spans() {
        // B-PER B-PER I-PER
        let spans = spans_from_tags(&[1, 1, 2], &vocab());
        assert_eq!(
            spans,
            vec![EntitySpan::new(0, 1, "PER"), EntitySpan::new(1, 3, "PER")]
        );
    }

    #[test]
    fn test_stray_inside_opens_span() {
        // I-ORG with no opener, then a type switch I-PER
        let spans = spans_from_tags(&[4, 2], &vocab());
        assert_eq!(
            spans,
            vec![EntitySpan::new(0, 1, "ORG"), EntitySpan::new(1, 2, "PER")]
        );
    }

    #[test]
    fn test_triple_assembly_dedupes_span_pairs() {
        let spans = vec![EntitySpan::new(0, 2, "PER"), EntitySpan::new(3, 5, "ORG")];
        // Both tokens of the subject span flag the same relation.
        let pairs = vec![(0, 3, 1), (1, 3, 1), (2, 3, 1)];
        let triples = assemble_triples(&spans, &pairs, &relations());
        // Pair (2, 3) has no subject span and is dropped.
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].relation, "works_for");
        assert_eq!(triples[0].subject, spans[0]);
        assert_eq!(triples[0].object, spans[1]);
    }

    #[test]
    fn test_background_and_unknown_relations_dropped() {
        let spans = vec![EntitySpan::new(0, 1, "PER"), EntitySpan::new(1, 2, "ORG")];
        let pairs = vec![(0, 1, 0), (0, 1, 99)];
        assert!(assemble_triples(&spans, &pairs, &relations()).is_empty());
    }

    #[test]
    fn test_relation_pairs_respect_length() {
        let device = Default::default();
        // One example, L = 3, R = 2; flag (0, 2, 1) and (2, 0, 1).
        let mut flat = vec![0i32; 3 * 3 * 2];
        flat[(0 * 3 + 2) * 2 + 1] = 1;
        flat[(2 * 3 + 0) * 2 + 1] = 1;
        let decisions = Tensor::<TestBackend, 1, Int>::from_ints(flat.as_slice(), &device)
            .reshape([1, 3, 3, 2]);

        let full = relation_pairs(decisions.clone(), 0, 3);
        assert_eq!(full, vec![(0, 2, 1), (2, 0, 1)]);

        // Truncated to length 2: both flagged pairs touch position 2.
        assert!(relation_pairs(decisions, 0, 2).is_empty());
    }

    #[test]
    fn test_decode_example_end_to_end() {
        let device = Default::default();
        // Tags: B-PER I-PER O B-ORG; relation works_for from the
        // PER head token to the ORG token.
        let tags = vec![1usize, 2, 0, 3];
        let mut flat = vec![0i32; 4 * 4 * 4];
        flat[(0 * 4 + 3) * 4 + 1] = 1;
        let decisions = Tensor::<TestBackend, 1, Int>::from_ints(flat.as_slice(), &device)
            .reshape([1, 4, 4, 4]);

        let triples = decode_example(&tags, decisions, 0, &vocab(), &relations());
        assert_eq!(
            triples,
            vec![Triple::new(
                EntitySpan::new(0, 2, "PER"),
                "works_for",
                EntitySpan::new(3, 4, "ORG"),
            )]
        );
    }
}
