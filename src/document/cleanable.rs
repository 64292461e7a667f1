//! Lazy `cleaned_source` caching, shared by every document kind.

use std::cell::{Ref, RefCell};

/// A document whose cleaned prose is expensive enough to cache. Subclasses
/// provide `compute_cleaned`; `cleaned_source` computes it once and returns
/// the cached value on every subsequent call until `invalidate_cleaned` runs.
pub trait CleanableDocument {
    fn compute_cleaned(&self) -> String;
    fn cleaned_cache(&self) -> &RefCell<Option<String>>;

    fn cleaned_source(&self) -> Ref<'_, str> {
        if self.cleaned_cache().borrow().is_none() {
            let computed = self.compute_cleaned();
            *self.cleaned_cache().borrow_mut() = Some(computed);
        }
        Ref::map(self.cleaned_cache().borrow(), |opt| opt.as_deref().unwrap())
    }

    fn invalidate_cleaned(&self) {
        *self.cleaned_cache().borrow_mut() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        cache: RefCell<Option<String>>,
        computations: Cell<u32>,
    }

    impl CleanableDocument for Counter {
        fn compute_cleaned(&self) -> String {
            self.computations.set(self.computations.get() + 1);
            "clean".to_string()
        }

        fn cleaned_cache(&self) -> &RefCell<Option<String>> {
            &self.cache
        }
    }

    #[test]
    fn computes_once_until_invalidated() {
        let doc = Counter { cache: RefCell::new(None), computations: Cell::new(0) };
        assert_eq!(&*doc.cleaned_source(), "clean");
        assert_eq!(&*doc.cleaned_source(), "clean");
        assert_eq!(doc.computations.get(), 1);

        doc.invalidate_cleaned();
        assert_eq!(&*doc.cleaned_source(), "clean");
        assert_eq!(doc.computations.get(), 2);
    }
}
