use std::collections::HashSet;
use std::hash::Hash;

/// Reacts to nodes being added to a page. Each batch of added handles is
/// tested against the matcher and every handle fires at most once, however
/// many batches it shows up in.
pub struct Watch<H> {
    matcher: Box<dyn Fn(&H) -> bool + Send + Sync>,
    seen: HashSet<H>,
}

impl<H: Clone + Eq + Hash> Watch<H> {
    pub fn new(matcher: impl Fn(&H) -> bool + Send + Sync + 'static) -> Self {
        Self {
            matcher: Box::new(matcher),
            seen: HashSet::new(),
        }
    }

    /// Handles already dealt with elsewhere; they will never fire.
    pub fn mark_seen(&mut self, handles: impl IntoIterator<Item = H>) {
        self.seen.extend(handles);
    }

    /// Newly matching handles from `added`, in batch order.
    pub fn observe(&mut self, added: impl IntoIterator<Item = H>) -> Vec<H> {
        let mut fired = Vec::new();
        for handle in added {
            if self.seen.contains(&handle) || !(self.matcher)(&handle) {
                continue;
            }
            self.seen.insert(handle.clone());
            fired.push(handle);
        }
        fired
    }
}

impl<H> std::fmt::Debug for Watch<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watch")
            .field("seen", &self.seen.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_matching_handle() {
        let mut watch = Watch::new(|n: &u32| n % 2 == 0);
        assert_eq!(watch.observe([1, 2, 3, 4]), vec![2, 4]);
        assert_eq!(watch.observe([4, 6, 2]), vec![6]);
        assert!(watch.observe([6, 2]).is_empty());
    }

    #[test]
    fn duplicates_within_one_batch_fire_once() {
        let mut watch = Watch::new(|_: &&str| true);
        assert_eq!(watch.observe(["a", "a", "b"]), vec!["a", "b"]);
    }

    #[test]
    fn premarked_handles_never_fire() {
        let mut watch = Watch::new(|_: &u32| true);
        watch.mark_seen([7, 8]);
        assert_eq!(watch.observe([7, 8, 9]), vec![9]);
    }
}
