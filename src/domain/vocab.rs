// ============================================================
// Tag & Relation Vocabularies
// ============================================================
// Both label sets are closed: their sizes are fixed when the
// model is constructed and id 0 is reserved for the background
// class ("O" for tags, "no relation" for relations).
//
// Entity tags follow the BIO scheme: "B-PER" opens a PER span,
// "I-PER" continues it, "O" is outside any span. The span
// grouping itself lives in `triples`; this module only maps ids
// to labels and answers the B-/I-/O question.

use serde::{Deserialize, Serialize};

/// The three structural roles a BIO label can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioRole {
    Begin,
    Inside,
    Outside,
}

/// Closed set of BIO entity tags. Index = tag id, entry 0 must be
/// the outside label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagVocab {
    labels: Vec<String>,
}

impl TagVocab {
    pub fn new(labels: Vec<String>) -> Self {
        debug_assert!(!labels.is_empty());
        Self { labels }
    }

    /// Build the usual alternating B-/I- vocabulary for a list of
    /// entity types: ["O", "B-a", "I-a", "B-b", "I-b", ...].
    pub fn from_entity_types(types: &[&str]) -> Self {
        let mut labels = vec!["O".to_string()];
        for ty in types {
            labels.push(format!("B-{ty}"));
            labels.push(format!("I-{ty}"));
        }
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Structural role of a tag id. Unknown ids count as outside,
    /// which keeps decoding total over any id the CRF can emit.
    pub fn role(&self, id: usize) -> BioRole {
        match self.labels.get(id).map(String::as_str) {
            Some(l) if l.starts_with("B-") => BioRole::Begin,
            Some(l) if l.starts_with("I-") => BioRole::Inside,
            _ => BioRole::Outside,
        }
    }

    /// Entity type name with the B-/I- prefix stripped, None for
    /// outside tags.
    pub fn entity_type(&self, id: usize) -> Option<&str> {
        match self.role(id) {
            BioRole::Outside => None,
            _ => self.labels.get(id).map(|l| &l[2..]),
        }
    }
}

/// Closed set of relation types. Index = relation id, entry 0 must
/// be the no-relation class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationVocab {
    names: Vec<String>,
}

impl RelationVocab {
    pub fn new(names: Vec<String>) -> Self {
        debug_assert!(!names.is_empty());
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bio_vocab_layout() {
        let vocab = TagVocab::from_entity_types(&["PER", "ORG"]);
        assert_eq!(vocab.len(), 5);
        assert_eq!(vocab.label(0), Some("O"));
        assert_eq!(vocab.label(1), Some("B-PER"));
        assert_eq!(vocab.label(4), Some("I-ORG"));
    }

    #[test]
    fn test_roles_and_types() {
        let vocab = TagVocab::from_entity_types(&["PER"]);
        assert_eq!(vocab.role(0), BioRole::Outside);
        assert_eq!(vocab.role(1), BioRole::Begin);
        assert_eq!(vocab.role(2), BioRole::Inside);
        assert_eq!(vocab.entity_type(1), Some("PER"));
        assert_eq!(vocab.entity_type(0), None);
        // Out-of-range ids decay to outside instead of panicking.
        assert_eq!(vocab.role(99), BioRole::Outside);
    }
}
