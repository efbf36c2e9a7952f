use bson::Bson;

use crate::document::Document;

/// Narrow contract for a pluggable full-text search collaborator (§4.6).
/// The index/search algorithm itself is out of scope; the core only needs
/// somewhere to forward document lifecycle events at their `Data` position.
pub trait FullTextSearch: Send {
    fn add_document(&mut self, doc: &Document, position: usize);
    fn update_document(&mut self, doc: &Document, position: usize);
    fn remove_document(&mut self, doc: &Document, position: usize);
    fn clear(&mut self);
    fn to_json(&self) -> Bson;
}

/// Construct a collection's FTS collaborator from constructor options.
/// Realised as an explicit factory rather than a process-wide plugin
/// registry (see REDESIGN FLAGS): the caller passes a closure producing a
/// fresh `Box<dyn FullTextSearch>`, or none at all when FTS isn't wanted.
pub type FullTextSearchFactory = Box<dyn Fn() -> Box<dyn FullTextSearch>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingFts {
        added: usize,
        updated: usize,
        removed: usize,
    }

    impl FullTextSearch for CountingFts {
        fn add_document(&mut self, _doc: &Document, _position: usize) {
            self.added += 1;
        }

        fn update_document(&mut self, _doc: &Document, _position: usize) {
            self.updated += 1;
        }

        fn remove_document(&mut self, _doc: &Document, _position: usize) {
            self.removed += 1;
        }

        fn clear(&mut self) {
            self.added = 0;
            self.updated = 0;
            self.removed = 0;
        }

        fn to_json(&self) -> Bson {
            Bson::Int32(self.added as i32)
        }
    }

    #[test]
    fn factory_produces_independent_instances() {
        let factory: FullTextSearchFactory = Box::new(|| Box::new(CountingFts::default()));
        let mut a = factory();
        let mut b = factory();
        a.add_document(&bson::doc! {}, 0);
        assert_eq!(a.to_json(), Bson::Int32(1));
        assert_eq!(b.to_json(), Bson::Int32(0));
        b.clear();
    }
}
