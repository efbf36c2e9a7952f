use bson::Bson;

use crate::error::CollectionError;

/// Narrow contract the mutation coordinator drives every registered dynamic
/// view through (§4.5). The view's own filter/sort/map pipeline — what a
/// query compiler would build on top of this — is out of scope here; this
/// crate only owns the collaborator boundary the core invokes.
pub trait DynamicView: Send {
    /// Re-check whether `position` belongs in the view's result set.
    /// `is_new` distinguishes a freshly-inserted document from a mutated
    /// existing one, since some views treat first-seen differently (e.g.
    /// resumable cursors).
    fn evaluate_document(&mut self, position: usize, is_new: bool);

    /// Drop `position` from the view's result set and shift any internal
    /// bookkeeping that stores positions, mirroring the core's own
    /// position-shift invariant (§4.1).
    fn remove_document(&mut self, position: usize);

    fn start_transaction(&mut self);
    fn commit(&mut self);
    fn rollback(&mut self);

    fn to_json(&self) -> Bson;
}

/// Ordered collection of registered views, offered as a convenience for a
/// `Collection` to drive uniformly; the coordinator could just as well hold
/// a `Vec<Box<dyn DynamicView>>` directly.
#[derive(Default)]
pub struct ViewRegistry {
    views: Vec<Box<dyn DynamicView>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, view: Box<dyn DynamicView>) {
        self.views.push(view);
    }

    pub fn evaluate_document(&mut self, position: usize, is_new: bool) {
        for view in &mut self.views {
            view.evaluate_document(position, is_new);
        }
    }

    pub fn remove_document(&mut self, position: usize) {
        for view in &mut self.views {
            view.remove_document(position);
        }
    }

    pub fn start_transaction(&mut self) {
        for view in &mut self.views {
            view.start_transaction();
        }
    }

    pub fn commit(&mut self) {
        for view in &mut self.views {
            view.commit();
        }
    }

    pub fn rollback(&mut self) {
        for view in &mut self.views {
            view.rollback();
        }
    }

    pub fn to_json(&self) -> Vec<Bson> {
        self.views.iter().map(|v| v.to_json()).collect()
    }
}

/// Returned when a caller asks for a view by name that was never registered.
pub fn unknown_view(name: &str) -> CollectionError {
    CollectionError::NotFound(format!("dynamic view not registered: {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingView {
        seen: Vec<(usize, bool)>,
        removed: Vec<usize>,
        txn_depth: i32,
    }

    impl DynamicView for RecordingView {
        fn evaluate_document(&mut self, position: usize, is_new: bool) {
            self.seen.push((position, is_new));
        }

        fn remove_document(&mut self, position: usize) {
            self.removed.push(position);
        }

        fn start_transaction(&mut self) {
            self.txn_depth += 1;
        }

        fn commit(&mut self) {
            self.txn_depth = 0;
        }

        fn rollback(&mut self) {
            self.txn_depth = 0;
            self.seen.clear();
            self.removed.clear();
        }

        fn to_json(&self) -> Bson {
            Bson::Int32(self.seen.len() as i32)
        }
    }

    #[test]
    fn registry_fans_out_to_every_view() {
        let mut registry = ViewRegistry::new();
        registry.register(Box::new(RecordingView {
            seen: vec![],
            removed: vec![],
            txn_depth: 0,
        }));
        registry.evaluate_document(3, true);
        registry.remove_document(1);
        assert_eq!(registry.to_json(), vec![Bson::Int32(1)]);
    }

    #[test]
    fn rollback_clears_pending_view_state() {
        let mut registry = ViewRegistry::new();
        registry.register(Box::new(RecordingView {
            seen: vec![],
            removed: vec![],
            txn_depth: 0,
        }));
        registry.start_transaction();
        registry.evaluate_document(0, true);
        registry.rollback();
        assert_eq!(registry.to_json(), vec![Bson::Int32(0)]);
    }
}
