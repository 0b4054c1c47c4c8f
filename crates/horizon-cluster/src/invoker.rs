//! Algorithm ownership and invocation.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_cluster_core::logging::targets;

use crate::algorithm::{AlgorithmContext, AlgorithmRef, ClusterAlgorithm, ClusterResult};
use crate::error::AlgorithmError;
use crate::registry::Item;

type WeakAlgorithm<D> = Weak<Mutex<dyn ClusterAlgorithm<D>>>;

/// Owns the active algorithm and disposes replaced instances exactly once.
pub struct AlgorithmInvoker<D> {
    current: Option<AlgorithmRef<D>>,
    /// Every instance already destroyed that is still alive somewhere.
    destroyed: Vec<WeakAlgorithm<D>>,
    invocations: u64,
}

impl<D: 'static> AlgorithmInvoker<D> {
    pub fn new(algorithm: Option<AlgorithmRef<D>>) -> Self {
        Self {
            current: algorithm,
            destroyed: Vec::new(),
            invocations: 0,
        }
    }

    /// Install `next`, destroying the previous instance.
    ///
    /// Returns `false` if `next` is the instance already installed.
    pub fn replace(&mut self, next: Option<AlgorithmRef<D>>) -> bool {
        let same = match (&self.current, &next) {
            (Some(current), Some(next)) => Arc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if same {
            return false;
        }

        if let Some(previous) = std::mem::replace(&mut self.current, next) {
            self.destroy(&previous);
        }
        tracing::debug!(
            target: targets::INVOKER,
            installed = self.current.is_some(),
            "algorithm replaced"
        );
        true
    }

    /// A handle to the active algorithm, cloned so callers can run it without
    /// holding the invoker.
    pub fn current(&self) -> Option<AlgorithmRef<D>> {
        self.current.clone()
    }

    pub fn has_algorithm(&self) -> bool {
        self.current.is_some()
    }

    /// Number of invocations recorded through [`Self::record_invocation`].
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    pub fn record_invocation(&mut self) {
        self.invocations += 1;
    }

    /// Destroy the active instance, leaving no algorithm installed.
    pub fn teardown(&mut self) {
        if let Some(current) = self.current.take() {
            self.destroy(&current);
        }
    }

    fn destroy(&mut self, algorithm: &AlgorithmRef<D>) {
        self.destroyed.retain(|weak| weak.strong_count() > 0);
        let already = self
            .destroyed
            .iter()
            .filter_map(Weak::upgrade)
            .any(|done| Arc::ptr_eq(&done, algorithm));
        if already {
            tracing::trace!(target: targets::INVOKER, "algorithm already destroyed");
            return;
        }
        algorithm.lock().destroy();
        self.destroyed.push(Arc::downgrade(algorithm));
        tracing::debug!(target: targets::INVOKER, "algorithm destroyed");
    }
}

/// Run `algorithm` once over `items`.
///
/// Errors are returned untouched; there is no retry and no fallback.
pub fn invoke<D>(
    algorithm: &AlgorithmRef<D>,
    items: &[Item<D>],
    context: &AlgorithmContext,
) -> Result<ClusterResult<D>, AlgorithmError> {
    tracing::trace!(
        target: targets::INVOKER,
        items = items.len(),
        zoom = context.zoom,
        "invoking algorithm"
    );
    algorithm.lock().cluster(items, context)
}

impl<D> std::fmt::Debug for AlgorithmInvoker<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmInvoker")
            .field("installed", &self.current.is_some())
            .field("invocations", &self.invocations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::algorithm::algorithm_ref;
    use crate::geo::{LatLng, LatLngBounds};

    struct Counting {
        destroyed: Arc<AtomicUsize>,
    }

    impl ClusterAlgorithm<()> for Counting {
        fn cluster(
            &mut self,
            items: &[Item<()>],
            _context: &AlgorithmContext,
        ) -> Result<ClusterResult<()>, AlgorithmError> {
            Ok(ClusterResult {
                clusters: Vec::new(),
                points: items.to_vec(),
            })
        }

        fn destroy(&mut self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting() -> (AlgorithmRef<()>, Arc<AtomicUsize>) {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let algorithm = algorithm_ref(Counting {
            destroyed: destroyed.clone(),
        });
        (algorithm, destroyed)
    }

    #[test]
    fn test_replace_destroys_previous_once() {
        let (first, first_destroyed) = counting();
        let (second, second_destroyed) = counting();
        let mut invoker = AlgorithmInvoker::new(Some(first.clone()));

        assert!(!invoker.replace(Some(first.clone())));
        assert_eq!(first_destroyed.load(Ordering::SeqCst), 0);

        assert!(invoker.replace(Some(second.clone())));
        assert_eq!(first_destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(second_destroyed.load(Ordering::SeqCst), 0);

        invoker.teardown();
        assert_eq!(second_destroyed.load(Ordering::SeqCst), 1);
        assert!(!invoker.has_algorithm());

        invoker.teardown();
        assert_eq!(second_destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reinstalling_destroyed_instance_is_not_destroyed_twice() {
        let (first, first_destroyed) = counting();
        let mut invoker = AlgorithmInvoker::new(Some(first.clone()));
        invoker.replace(None);
        invoker.replace(Some(first.clone()));
        invoker.replace(None);
        assert_eq!(first_destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reinstall_after_another_swap_is_not_destroyed_twice() {
        let (a, a_destroyed) = counting();
        let (b, b_destroyed) = counting();
        let (c, c_destroyed) = counting();
        let mut invoker = AlgorithmInvoker::new(Some(a.clone()));

        invoker.replace(Some(b.clone()));
        invoker.replace(Some(a.clone()));
        invoker.replace(Some(c.clone()));
        invoker.replace(Some(b.clone()));
        invoker.teardown();

        assert_eq!(a_destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(b_destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(c_destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invoke_passes_items_and_context() {
        let (algorithm, _) = counting();
        let items = vec![Item::new("a", LatLng::new(1.0, 1.0), ())];
        let context = AlgorithmContext {
            zoom: 10.0,
            bounds: LatLngBounds::new(0.0, 0.0, 2.0, 2.0),
        };
        let result = invoke(&algorithm, &items, &context).unwrap();
        assert_eq!(result.points, items);
    }
}
