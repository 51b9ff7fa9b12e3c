//! Which attached documents scope the next query.
//!
//! Once any document exists the selection always holds at least one id: the
//! last selected document cannot be deselected, and an emptied selection is
//! reseeded from the registry on the next [`SelectionModel::reconcile`].

/// What a [`SelectionModel::toggle`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
    /// The id was the only selected document and was left in place.
    Protected,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionModel {
    selected: Vec<String>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, document_id: &str) -> Toggle {
        match self.selected.iter().position(|id| id == document_id) {
            Some(_) if self.selected.len() == 1 => Toggle::Protected,
            Some(index) => {
                self.selected.remove(index);
                Toggle::Deselected
            }
            None => {
                self.selected.push(document_id.to_string());
                Toggle::Selected
            }
        }
    }

    /// Brings the selection in line with the registry's current ids.
    pub fn reconcile(&mut self, document_ids: &[String]) {
        self.selected.retain(|id| document_ids.contains(id));
        if self.selected.is_empty() {
            for id in document_ids {
                if !self.selected.contains(id) {
                    self.selected.push(id.clone());
                }
            }
        }
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, document_id: &str) -> bool {
        self.selected.iter().any(|id| id == document_id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}
