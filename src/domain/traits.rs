// ============================================================
// Boundary Traits
// ============================================================
// Collaborators that live outside this crate are specified here
// as traits only. The production deployment persists triples to a
// graph database and serves queries over HTTP; none of that logic
// belongs to the model crate, so the crate defines the seam and
// nothing else.
//
// Implementations:
//   - a graph-database writer (external crate / application)
//   - MemoryTripleStore below, used in tests and demos

use crate::domain::triple::Triple;

/// Anything that can persist extracted triples and answer simple
/// entity lookups. Errors are implementation-defined, so the trait
/// surfaces them as boxed errors rather than forcing a store
/// error type onto the model crate.
pub trait TripleStore {
    /// Persist a batch of triples. Duplicates are the store's
    /// problem; callers may hand over the same fact twice.
    fn persist(&mut self, triples: &[Triple]) -> Result<(), Box<dyn std::error::Error>>;

    /// All stored triples whose subject or object span carries the
    /// given entity type.
    fn by_entity_type(&self, entity_type: &str) -> Vec<Triple>;
}

/// In-memory store for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryTripleStore {
    triples: Vec<Triple>,
}

impl MemoryTripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn all(&self) -> &[Triple] {
        &self.triples
    }
}

impl TripleStore for MemoryTripleStore {
    fn persist(&mut self, triples: &[Triple]) -> Result<(), Box<dyn std::error::Error>> {
        for t in triples {
            if !self.triples.contains(t) {
                self.triples.push(t.clone());
            }
        }
        Ok(())
    }

    fn by_entity_type(&self, entity_type: &str) -> Vec<Triple> {
        self.triples
            .iter()
            .filter(|t| {
                t.subject.entity_type == entity_type || t.object.entity_type == entity_type
            })
            .cloned()
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::triple::EntitySpan;

    fn sample_triple() -> Triple {
        Triple::new(
            EntitySpan::new(0, 1, "PER"),
            "works_for",
            EntitySpan::new(3, 5, "ORG"),
        )
    }

    #[test]
    fn test_memory_store_deduplicates() {
        let mut store = MemoryTripleStore::new();
        store.persist(&[sample_triple(), sample_triple()]).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_entity_type_lookup() {
        let mut store = MemoryTripleStore::new();
        store.persist(&[sample_triple()]).unwrap();
        assert_eq!(store.by_entity_type("ORG").len(), 1);
        assert!(store.by_entity_type("LOC").is_empty());
    }
}
