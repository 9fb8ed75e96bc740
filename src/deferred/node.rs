//! Deferred nodes and the link chain behind them.
//!
//! Every node owns a memo slot and a shared [`Source`]: either the root
//! factory or a link to its predecessor. Links reach the predecessor node
//! weakly and its source strongly, so a dropped intermediate can be revived
//! as a fresh node and recomputed. Forcing walks the chain upward in a loop
//! until it meets a forced node or the root, then fills the slots on the way
//! back down, which keeps stack depth constant however long the chain is.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::Outcome;
use crate::trace::trace_event;

// =============================================================================
// Chain
// =============================================================================

/// A node seen without its outcome type, as the forcing loop walks it.
trait Stage {
    fn is_forced(&self) -> bool;

    /// The node that must be forced before this one can run, if any.
    fn dependency(&self) -> Option<Rc<dyn Stage>>;

    /// Fills the memo slot, assuming the dependency is already forced.
    fn prime(&self);
}

/// The predecessor side of a derived node, with the predecessor's type erased.
trait Upstream<N> {
    fn dependency(&self) -> Option<Rc<dyn Stage>>;

    fn produce(&self) -> N;

    fn detach(&mut self) -> Option<Box<dyn Unlink>>;
}

/// One step of an iterative teardown of the link chain.
trait Unlink {
    /// Takes the next owned source out of this one, when this is its last owner.
    fn unlink(&mut self) -> Option<Box<dyn Unlink>>;
}

enum Source<M> {
    Root(Box<dyn Fn() -> M>),
    Derived(Box<dyn Upstream<M>>),
}

impl<M: Outcome> Source<M> {
    fn dependency(&self) -> Option<Rc<dyn Stage>> {
        match self {
            Self::Root(_) => None,
            Self::Derived(upstream) => upstream.dependency(),
        }
    }

    fn produce(&self) -> M {
        match self {
            Self::Root(computation) => computation(),
            Self::Derived(upstream) => upstream.produce(),
        }
    }
}

impl<M: 'static> Unlink for Rc<Source<M>> {
    fn unlink(&mut self) -> Option<Box<dyn Unlink>> {
        match Rc::get_mut(self)? {
            Source::Root(_) => None,
            Source::Derived(upstream) => upstream.detach(),
        }
    }
}

struct Link<M: 'static, N> {
    predecessor: RefCell<Weak<Node<M>>>,
    upstream: Option<Rc<Source<M>>>,
    step: Box<dyn Fn(M) -> N>,
}

impl<M: 'static, N> Link<M, N> {
    fn take_upstream(&mut self) -> Option<Box<dyn Unlink>> {
        self.upstream
            .take()
            .map(|upstream| Box::new(upstream) as Box<dyn Unlink>)
    }
}

impl<M: Outcome, N> Link<M, N> {
    /// The live predecessor, or a fresh unforced copy of it when every
    /// handle to it is gone. The copy stays reachable through the weak link
    /// for as long as the caller holds it.
    fn predecessor(&self) -> Option<Rc<Node<M>>> {
        let live = self.predecessor.borrow().upgrade();
        if live.is_some() {
            return live;
        }
        let upstream = self.upstream.as_ref()?;
        trace_event!("deferred predecessor dropped; recomputing");
        let revived = Rc::new(Node {
            memo: OnceCell::new(),
            source: Rc::clone(upstream),
        });
        *self.predecessor.borrow_mut() = Rc::downgrade(&revived);
        Some(revived)
    }
}

impl<M: Outcome, N: Outcome> Upstream<N> for Link<M, N> {
    fn dependency(&self) -> Option<Rc<dyn Stage>> {
        self.predecessor().map(|node| node as Rc<dyn Stage>)
    }

    fn produce(&self) -> N {
        match self.predecessor() {
            Some(node) => (self.step)(node.force()),
            None => unreachable!("a link loses its upstream only while it is dropped"),
        }
    }

    fn detach(&mut self) -> Option<Box<dyn Unlink>> {
        self.take_upstream()
    }
}

impl<M: 'static, N> Drop for Link<M, N> {
    fn drop(&mut self) {
        let mut next = self.take_upstream();
        while let Some(mut current) = next {
            next = current.unlink();
        }
    }
}

// =============================================================================
// Node
// =============================================================================

struct Node<M> {
    memo: OnceCell<M>,
    source: Rc<Source<M>>,
}

impl<M: Outcome> Node<M> {
    fn force(&self) -> M {
        if let Some(outcome) = self.memo.get() {
            return outcome.clone();
        }
        let primed = self.prime_ancestors();
        let outcome = self.resolve().clone();
        drop(primed);
        outcome
    }

    fn resolve(&self) -> &M {
        self.memo.get_or_init(|| {
            trace_event!("deferred node detonated");
            self.source.produce()
        })
    }

    /// Forces every unforced ancestor, nearest-to-root first.
    ///
    /// The returned stages keep revived predecessors alive until the caller
    /// has read their memo.
    fn prime_ancestors(&self) -> Vec<Rc<dyn Stage>> {
        let mut pending = Vec::new();
        let mut next = self.source.dependency();
        while let Some(stage) = next {
            if stage.is_forced() {
                break;
            }
            next = stage.dependency();
            pending.push(stage);
        }
        for stage in pending.iter().rev() {
            stage.prime();
        }
        pending
    }
}

impl<M: Outcome> Stage for Node<M> {
    fn is_forced(&self) -> bool {
        self.memo.get().is_some()
    }

    fn dependency(&self) -> Option<Rc<dyn Stage>> {
        self.source.dependency()
    }

    fn prime(&self) {
        self.resolve();
    }
}

/// A computation yielding an [`Outcome`], run at most once per node.
///
/// Cloning a `Deferred` shares the node: every clone observes the same memo
/// slot. Derived nodes (`map`, `flat_map`, ...) get their own slot and hold
/// their predecessor only through a [`Weak`] link. Forcing a derived node
/// reuses the predecessor's memo while some other handle keeps it alive and
/// recomputes through the predecessor's own source once it is gone, so long
/// composition chains never pin their intermediate results. Forcing and
/// dropping both run in constant stack depth.
///
/// # Examples
///
/// ```rust
/// use lazuli::control::Either;
/// use lazuli::deferred::Deferred;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let runs = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&runs);
/// let deferred: Deferred<Either<String, i32>> = Deferred::new(move || {
///     counter.set(counter.get() + 1);
///     Either::Right(5)
/// });
///
/// let doubled = deferred.map(|value| value * 2);
/// let label = doubled.map(|value| format!("value {value}"));
/// assert_eq!(runs.get(), 0);
///
/// let render = |outcome: &Deferred<Either<String, String>>| {
///     outcome.fold(|error| error, |text| text)
/// };
/// assert_eq!(render(&label), "value 10");
/// assert_eq!(render(&label), "value 10");
/// assert_eq!(runs.get(), 1);
/// ```
pub struct Deferred<M> {
    node: Rc<Node<M>>,
}

impl<M: Outcome> Deferred<M> {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Wraps `computation` without running it.
    pub fn new<F>(computation: F) -> Self
    where
        F: Fn() -> M + 'static,
    {
        Self::from_source(Source::Root(Box::new(computation)))
    }

    /// A node that is already forced to `outcome`.
    pub fn ready(outcome: M) -> Self {
        Self {
            node: Rc::new(Node {
                memo: OnceCell::from(outcome.clone()),
                source: Rc::new(Source::Root(Box::new(move || outcome.clone()))),
            }),
        }
    }

    fn from_source(source: Source<M>) -> Self {
        Self {
            node: Rc::new(Node {
                memo: OnceCell::new(),
                source: Rc::new(source),
            }),
        }
    }

    /// A node whose outcome is `step` applied to this node's outcome.
    ///
    /// The derived node reaches this one through a weak link; when the link
    /// is dead it recomputes through this node's source.
    fn derive<N, S>(&self, step: S) -> Deferred<N>
    where
        N: Outcome,
        S: Fn(M) -> N + 'static,
    {
        Deferred::from_source(Source::Derived(Box::new(Link {
            predecessor: RefCell::new(Rc::downgrade(&self.node)),
            upstream: Some(Rc::clone(&self.node.source)),
            step: Box::new(step),
        })))
    }

    // =========================================================================
    // Composition
    // =========================================================================

    /// Transforms the success payload.
    pub fn map<U, F>(&self, function: F) -> Deferred<M::Rebind<U>>
    where
        U: Clone + 'static,
        F: Fn(M::Value) -> U + 'static,
    {
        self.derive(move |outcome| outcome.map_value(&function))
    }

    /// Chains another deferred computation on the success payload.
    ///
    /// The node returned by `function` is forced as part of forcing the
    /// derived node.
    pub fn flat_map<U, F>(&self, function: F) -> Deferred<M::Rebind<U>>
    where
        U: Clone + 'static,
        F: Fn(M::Value) -> Deferred<M::Rebind<U>> + 'static,
    {
        self.derive(move |outcome| outcome.bind_value(|value| function(value).unwrap()))
    }

    /// Chains an eager outcome on the success payload.
    pub fn and_then<U, F>(&self, function: F) -> Deferred<M::Rebind<U>>
    where
        U: Clone + 'static,
        F: Fn(M::Value) -> M::Rebind<U> + 'static,
    {
        self.derive(move |outcome| outcome.bind_value(&function))
    }

    /// Replaces a failure with the outcome `function` builds from it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lazuli::deferred::Deferred;
    ///
    /// let parsed: Deferred<Result<i32, String>> =
    ///     Deferred::new(|| "x".parse::<i32>().map_err(|error| error.to_string()));
    /// let recovered = parsed.recover(|_| Ok(0));
    /// assert_eq!(recovered.unwrap(), Ok(0));
    /// ```
    pub fn recover<F>(&self, function: F) -> Self
    where
        F: Fn(M::Failure) -> M + 'static,
    {
        self.derive(move |outcome| outcome.fold_branches(&function, M::success))
    }

    /// Falls back to `alternative` on failure.
    ///
    /// `alternative` is forced only when this node fails.
    pub fn otherwise(&self, alternative: &Self) -> Self {
        let alternative = alternative.clone();
        self.derive(move |outcome| outcome.fold_branches(|_| alternative.unwrap(), M::success))
    }

    // =========================================================================
    // Forcing
    // =========================================================================

    /// Forces the node and returns its outcome.
    ///
    /// The computation runs on the first call only; later calls return the
    /// memoized outcome.
    pub fn unwrap(&self) -> M {
        self.node.force()
    }

    /// Forces the node and folds both branches into one value.
    pub fn fold<T, FF, FS>(&self, on_failure: FF, on_success: FS) -> T
    where
        FF: FnOnce(M::Failure) -> T,
        FS: FnOnce(M::Value) -> T,
    {
        self.unwrap().fold_branches(on_failure, on_success)
    }

    /// Returns `true` once this node's memo slot is filled.
    #[inline]
    pub fn is_forced(&self) -> bool {
        self.node.memo.get().is_some()
    }
}

impl<M> Clone for Deferred<M> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<M: fmt::Debug> fmt::Debug for Deferred<M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node.memo.get() {
            Some(outcome) => formatter.debug_tuple("Deferred").field(outcome).finish(),
            None => formatter.write_str("Deferred(<unforced>)"),
        }
    }
}

static_assertions::assert_not_impl_any!(Deferred<Option<i32>>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Either;
    use rstest::rstest;
    use std::cell::Cell;

    fn counting(value: i32) -> (Deferred<Option<i32>>, Rc<Cell<usize>>) {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let deferred = Deferred::new(move || {
            counter.set(counter.get() + 1);
            Some(value)
        });
        (deferred, runs)
    }

    #[rstest]
    fn test_new_does_not_run() {
        let (deferred, runs) = counting(1);
        assert!(!deferred.is_forced());
        assert_eq!(runs.get(), 0);
    }

    #[rstest]
    fn test_unwrap_memoizes() {
        let (deferred, runs) = counting(1);
        assert_eq!(deferred.unwrap(), Some(1));
        assert_eq!(deferred.clone().unwrap(), Some(1));
        assert!(deferred.is_forced());
        assert_eq!(runs.get(), 1);
    }

    #[rstest]
    fn test_derived_reuses_live_predecessor() {
        let (deferred, runs) = counting(2);
        let plus_one = deferred.map(|value| value + 1);
        let times_ten = plus_one.map(|value| value * 10);
        assert_eq!(times_ten.unwrap(), Some(30));
        assert_eq!(plus_one.unwrap(), Some(3));
        assert_eq!(deferred.unwrap(), Some(2));
        assert_eq!(runs.get(), 1);
    }

    #[rstest]
    fn test_dropped_intermediate_falls_back() {
        let (deferred, runs) = counting(2);
        let plus_one = deferred.map(|value| value + 1);
        let times_ten = plus_one.map(|value| value * 10);
        drop(plus_one);
        assert_eq!(times_ten.unwrap(), Some(30));
        assert_eq!(runs.get(), 1);
        assert!(deferred.is_forced());
    }

    #[rstest]
    fn test_dropped_root_recomputes_from_factory() {
        let (deferred, runs) = counting(2);
        assert_eq!(deferred.unwrap(), Some(2));
        let times_ten = deferred.map(|value| value * 10);
        drop(deferred);
        assert_eq!(times_ten.unwrap(), Some(20));
        assert_eq!(runs.get(), 2);
    }

    #[rstest]
    fn test_revived_predecessors_are_released_after_forcing() {
        let (deferred, runs) = counting(1);
        let mut current = deferred.map(|value| value + 1);
        for _ in 0..3 {
            current = current.map(|value| value + 1);
        }
        assert_eq!(current.unwrap(), Some(5));
        assert_eq!(runs.get(), 1);
        assert_eq!(Rc::strong_count(&current.node.source), 1);
    }

    #[rstest]
    fn test_shared_source_survives_drop_of_one_branch() {
        let (deferred, runs) = counting(3);
        let base = deferred.map(|value| value * 2);
        let left = base.map(|value| value + 1);
        let right = base.map(|value| value - 1);
        drop(base);
        drop(deferred);
        drop(left);
        assert_eq!(right.unwrap(), Some(5));
        assert_eq!(runs.get(), 1);
    }

    #[rstest]
    fn test_ready_is_forced() {
        let deferred: Deferred<Result<i32, String>> = Deferred::ready(Ok(7));
        assert!(deferred.is_forced());
        assert_eq!(format!("{deferred:?}"), "Deferred(Ok(7))");
    }

    #[rstest]
    fn test_otherwise_forces_alternative_only_on_failure() {
        let (alternative, runs) = counting(9);
        let present: Deferred<Option<i32>> = Deferred::ready(Some(1));
        let absent: Deferred<Option<i32>> = Deferred::ready(None);
        assert_eq!(present.otherwise(&alternative).unwrap(), Some(1));
        assert_eq!(runs.get(), 0);
        assert_eq!(absent.otherwise(&alternative).unwrap(), Some(9));
        assert_eq!(runs.get(), 1);
    }

    #[rstest]
    fn test_flat_map_on_either() {
        let deferred: Deferred<Either<String, i32>> = Deferred::ready(Either::Right(4));
        let halved = deferred.flat_map(|value| {
            Deferred::new(move || {
                if value % 2 == 0 {
                    Either::Right(value / 2)
                } else {
                    Either::Left(format!("{value} is odd"))
                }
            })
        });
        assert_eq!(halved.unwrap(), Either::Right(2));
    }

    #[rstest]
    fn test_debug_unforced() {
        let (deferred, _) = counting(1);
        assert_eq!(format!("{deferred:?}"), "Deferred(<unforced>)");
    }
}
