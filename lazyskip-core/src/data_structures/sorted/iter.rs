use crate::data_structures::sorted::lazy_skip_list::LazySkipList;
use crate::data_structures::sorted::skip_node::SkipNodePtr;
use crate::guard::Guard;

/// Iterator over a [`LazySkipList`] with guard protection.
///
/// Holds a read guard for the whole walk, so every node it reaches stays
/// allocated. For epoch-based guards this pins the thread; for the deferred
/// guard it is a no-op.
///
/// The walk is best-effort under concurrent mutation: values inserted or
/// erased while iterating may or may not be observed.
pub struct Iter<'a, T, G: Guard, M, R, S> {
    _guard: G::ReadGuard,
    set: &'a LazySkipList<T, G, M, R, S>,
    current: Option<SkipNodePtr<T>>,
}

impl<'a, T, G: Guard, M, R, S> Iter<'a, T, G, M, R, S> {
    pub(crate) fn new(set: &'a LazySkipList<T, G, M, R, S>) -> Self {
        let guard = G::pin();
        let first = set.next_live(set.head());
        Iter {
            _guard: guard,
            set,
            current: first,
        }
    }
}

impl<T: Clone, G: Guard, M, R, S> Iterator for Iter<'_, T, G, M, R, S> {
    // Clones, since a reference could not outlive the guard moved into the
    // iterator.
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = self.set.next_live(node);

        // Safety: the read guard protects the node
        unsafe { (*node).value().cloned() }
    }
}
