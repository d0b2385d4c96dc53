//! The set of ingested documents available for retrieval.

use indexmap::IndexMap;

use crate::document::{Chunk, Document};

/// Ingested documents keyed by id, iterated in insertion order.
///
/// Replacing an existing id keeps the document's original position, so
/// retrieval order stays reproducible across re-ingestion.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: IndexMap<String, Document>,
}

impl Corpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, returning the one it replaced, if any.
    pub fn insert(&mut self, document: Document) -> Option<Document> {
        self.documents.insert(document.id.clone(), document)
    }

    /// Look up a document by id.
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    /// Remove a document by id, preserving the order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<Document> {
        self.documents.shift_remove(id)
    }

    /// Remove every document.
    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Total number of chunks across all documents.
    pub fn chunk_count(&self) -> usize {
        self.documents.values().map(|doc| doc.chunks.len()).sum()
    }

    /// Document ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Every chunk, documents first then chunks, in order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.documents.values().flat_map(|doc| doc.chunks.iter())
    }
}

impl FromIterator<Document> for Corpus {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        let mut corpus = Corpus::new();
        for document in iter {
            corpus.insert(document);
        }
        corpus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, chunks: usize) -> Document {
        Document {
            id: id.into(),
            text: format!("text of {id}"),
            chunks: (0..chunks)
                .map(|index| Chunk {
                    document_id: id.into(),
                    index,
                    text: format!("{id}-{index}"),
                    embedding: vec![1.0],
                })
                .collect(),
        }
    }

    #[test]
    fn iterates_in_insertion_order() {
        let corpus: Corpus = [doc("b", 1), doc("a", 2), doc("c", 0)].into_iter().collect();
        assert_eq!(corpus.ids().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(corpus.chunk_count(), 3);
        let texts: Vec<&str> = corpus.chunks().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["b-0", "a-0", "a-1"]);
    }

    #[test]
    fn reingestion_replaces_in_place() {
        let mut corpus: Corpus = [doc("a", 1), doc("b", 1)].into_iter().collect();
        let previous = corpus.insert(doc("a", 3)).unwrap();

        assert_eq!(previous.chunks.len(), 1);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(corpus.get("a").unwrap().chunks.len(), 3);
    }

    #[test]
    fn remove_and_clear() {
        let mut corpus: Corpus = [doc("a", 1), doc("b", 1), doc("c", 1)].into_iter().collect();
        corpus.remove("b");
        assert_eq!(corpus.ids().collect::<Vec<_>>(), vec!["a", "c"]);

        corpus.clear();
        assert!(corpus.is_empty());
        assert_eq!(corpus.chunk_count(), 0);
    }
}
