// ============================================================
// Entity Spans & Triples
// ============================================================
// The shapes the downstream consumer receives: contiguous token
// spans carrying an entity type, and (subject, relation, object)
// triples joining two spans. Token positions index into the
// unpadded token sequence of one example.

use serde::{Deserialize, Serialize};

/// A contiguous entity mention: token positions [start, end).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub entity_type: String,
}

impl EntitySpan {
    pub fn new(start: usize, end: usize, entity_type: impl Into<String>) -> Self {
        Self { start, end, entity_type: entity_type.into() }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, pos: usize) -> bool {
        (self.start..self.end).contains(&pos)
    }
}

/// One extracted fact: subject span, relation name, object span.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: EntitySpan,
    pub relation: String,
    pub object: EntitySpan,
}

impl Triple {
    pub fn new(subject: EntitySpan, relation: impl Into<String>, object: EntitySpan) -> Self {
        Self { subject, relation: relation.into(), object }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_containment() {
        let span = EntitySpan::new(2, 5, "PER");
        assert_eq!(span.len(), 3);
        assert!(span.contains(2));
        assert!(span.contains(4));
        assert!(!span.contains(5));
    }
}
