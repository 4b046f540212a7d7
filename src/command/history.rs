use crate::document::Document;

/// Linear snapshot history over the document facets.
///
/// `commit` records the state *before* an edit. `undo`/`redo` swap the live
/// document with the top of one stack and push the pre-swap live document onto
/// the other, so the two directions are exact inverses. History is unbounded;
/// snapshots share untouched stroke lists so each entry costs O(layers).
#[derive(Debug, Clone, Default)]
pub struct SnapshotHistory {
    undo_stack: Vec<Document>,
    redo_stack: Vec<Document>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the pre-edit state and invalidate the redo branch
    pub fn commit(&mut self, before: Document) {
        self.undo_stack.push(before);
        self.redo_stack.clear();
    }

    /// Step back one edit. Returns false (and changes nothing) on an empty stack.
    pub fn undo(&mut self, live: &mut Document) -> bool {
        match self.undo_stack.pop() {
            Some(previous) => {
                self.redo_stack.push(std::mem::replace(live, previous));
                true
            }
            None => false,
        }
    }

    /// Step forward one edit. Returns false (and changes nothing) on an empty stack.
    pub fn redo(&mut self, live: &mut Document) -> bool {
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack.push(std::mem::replace(live, next));
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edited(doc: &Document, name: &str) -> Document {
        let mut next = doc.clone();
        next.add_row(name);
        next
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut history = SnapshotHistory::new();
        let mut doc = Document::new();
        assert!(!history.undo(&mut doc));
        assert!(!history.redo(&mut doc));
        assert_eq!(doc, Document::new());
    }

    #[test]
    fn test_undo_redo_swap() {
        let mut history = SnapshotHistory::new();
        let v0 = Document::new();
        let v1 = edited(&v0, "a");

        history.commit(v0.clone());
        let mut live = v1.clone();

        assert!(history.undo(&mut live));
        assert_eq!(live, v0);
        assert!(history.can_redo());

        assert!(history.redo(&mut live));
        assert_eq!(live, v1);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_commit_clears_redo() {
        let mut history = SnapshotHistory::new();
        let mut live = Document::new();

        history.commit(live.clone());
        live = edited(&live, "a");
        history.undo(&mut live);
        assert_eq!(history.redo_len(), 1);

        history.commit(live.clone());
        assert_eq!(history.redo_len(), 0);
        assert_eq!(history.undo_len(), 1);
    }
}
