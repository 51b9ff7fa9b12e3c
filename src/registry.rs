use crate::types::Document;

/// Documents attached to the active session, in attach order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentRegistry {
    documents: Vec<Document>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `document` unless its id is already present. Returns whether it was inserted.
    pub fn add(&mut self, document: Document) -> bool {
        if self.contains(&document.document_id) {
            return false;
        }
        self.documents.push(document);
        true
    }

    pub fn remove(&mut self, document_id: &str) -> bool {
        let before = self.documents.len();
        self.documents.retain(|doc| doc.document_id != document_id);
        self.documents.len() != before
    }

    /// Swaps in a new document set, keeping the first occurrence of any repeated id.
    pub fn replace_all(&mut self, documents: Vec<Document>) {
        self.documents.clear();
        for document in documents {
            self.add(document);
        }
    }

    pub fn list(&self) -> &[Document] {
        &self.documents
    }

    pub fn ids(&self) -> Vec<String> {
        self.documents
            .iter()
            .map(|doc| doc.document_id.clone())
            .collect()
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.documents
            .iter()
            .any(|doc| doc.document_id == document_id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
