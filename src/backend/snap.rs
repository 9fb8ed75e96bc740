//! Memoizing decorator.
//!
//! [`Snap`] wraps another backend together with a queue of pending
//! transformations. Building a chain only records steps; the first
//! materializing call drains the wrapped backend once, replays the queue
//! over the realized buffer and keeps the result. Every later call reads the
//! kept [`Eager`] value.
//!
//! Type-preserving operations (`filter`, `check`, `slice`, `sort_by`,
//! `reverse`, `distinct`, `append`) extend the queue and share the wrapped
//! backend with the receiver, so two snaps derived from the same parent
//! drain it only once between them. Type-changing operations (`map`,
//! `try_map`, `group_by`) start a new layer whose wrapped backend is the
//! receiver itself.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::backend::{Backend, Eager, Snap};
//!
//! let snap = Snap::wrap(Eager::from(vec![3, 1, 2]));
//! let sorted = snap.sort().reverse();
//! assert!(!sorted.is_realized());
//!
//! assert_eq!(sorted.to_vec(), Ok(vec![3, 2, 1]));
//! assert!(sorted.is_realized());
//! ```

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::mem;
use std::rc::Rc;

use smallvec::SmallVec;

use super::{Backend, Eager, Element, Traversal};
use crate::error::{CollectionError, Result};
use crate::trace::trace_event;

type Step<T> = Rc<dyn Fn(Eager<T>) -> Result<Eager<T>>>;

type Drain<T> = Box<dyn FnOnce() -> Result<Eager<T>>>;

// =============================================================================
// Transformation Queue
// =============================================================================

struct QueueNode<T> {
    step: Step<T>,
    earlier: Option<Rc<QueueNode<T>>>,
    len: usize,
}

impl<T> Drop for QueueNode<T> {
    fn drop(&mut self) {
        let mut next = self.earlier.take();
        while let Some(node) = next {
            next = Rc::try_unwrap(node).ok().and_then(|mut owned| owned.earlier.take());
        }
    }
}

/// Pending steps as a persistent list, newest first.
///
/// Extending shares the existing steps with the receiver, so a chain of
/// `n` derived snaps holds `n` list nodes in total.
struct TransformationQueue<T> {
    last: Option<Rc<QueueNode<T>>>,
}

impl<T> TransformationQueue<T> {
    const fn new() -> Self {
        Self { last: None }
    }

    fn len(&self) -> usize {
        self.last.as_ref().map_or(0, |node| node.len)
    }

    fn pushed(&self, step: Step<T>) -> Self {
        Self {
            last: Some(Rc::new(QueueNode {
                step,
                len: self.len() + 1,
                earlier: self.last.clone(),
            })),
        }
    }

    /// The steps in the order they were added.
    fn steps(&self) -> SmallVec<[Step<T>; 8]> {
        let mut steps = SmallVec::with_capacity(self.len());
        let mut current = self.last.as_ref();
        while let Some(node) = current {
            steps.push(Rc::clone(&node.step));
            current = node.earlier.as_ref();
        }
        steps.reverse();
        steps
    }
}

impl<T> Clone for TransformationQueue<T> {
    fn clone(&self) -> Self {
        Self {
            last: self.last.clone(),
        }
    }
}

// =============================================================================
// Origin
// =============================================================================

enum OriginState<T> {
    Pending(Drain<T>),
    Draining,
    Drained(Result<Eager<T>>),
}

/// The wrapped backend, drained at most once and shared by every snap
/// derived from it without a type change.
struct Origin<T> {
    state: RefCell<OriginState<T>>,
}

impl<T: Element> Origin<T> {
    fn pending<F>(drain: F) -> Rc<Self>
    where
        F: FnOnce() -> Result<Eager<T>> + 'static,
    {
        Rc::new(Self {
            state: RefCell::new(OriginState::Pending(Box::new(drain))),
        })
    }

    fn settled(result: Result<Eager<T>>) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(OriginState::Drained(result)),
        })
    }

    /// Drains the wrapped backend on the first call and replays the outcome
    /// afterwards.
    ///
    /// A drain that re-enters its own origin, or one that panicked midway,
    /// leaves the origin in `Draining` and reports
    /// [`CollectionError::MaterializationInProgress`].
    fn drain(&self) -> Result<Eager<T>> {
        let previous = {
            let mut state = self
                .state
                .try_borrow_mut()
                .map_err(|_| CollectionError::MaterializationInProgress)?;
            mem::replace(&mut *state, OriginState::Draining)
        };
        match previous {
            OriginState::Pending(drain) => {
                trace_event!("snap origin draining");
                let result = drain();
                self.settle(result.clone())?;
                result
            }
            OriginState::Drained(result) => {
                self.settle(result.clone())?;
                result
            }
            OriginState::Draining => Err(CollectionError::MaterializationInProgress),
        }
    }

    fn settle(&self, result: Result<Eager<T>>) -> Result<()> {
        let mut state = self
            .state
            .try_borrow_mut()
            .map_err(|_| CollectionError::MaterializationInProgress)?;
        *state = OriginState::Drained(result);
        Ok(())
    }
}

// =============================================================================
// Snap State
// =============================================================================

enum SnapState<T> {
    Pending {
        origin: Rc<Origin<T>>,
        queue: TransformationQueue<T>,
    },
    Realizing,
    Realized(Result<Eager<T>>),
}

struct SnapNode<T> {
    state: RefCell<SnapState<T>>,
}

// =============================================================================
// Snap
// =============================================================================

/// A backend that realizes its chain once and keeps the result.
///
/// # Invariants
///
/// - The wrapped backend is drained at most once, however many snaps share
///   it and however often they are materialized.
/// - Queued steps run in the order they were added, after the drain.
/// - Once realized, a snap never runs user code again; a failure is kept as
///   the terminal state.
pub struct Snap<T> {
    node: Rc<SnapNode<T>>,
}

impl<T: Element> Snap<T> {
    /// Decorates `backend` with an empty transformation queue.
    ///
    /// `backend` is not touched until the snap is materialized.
    pub fn wrap<B>(backend: B) -> Self
    where
        B: Backend<T>,
    {
        Self::from_origin(Origin::pending(move || backend.memoize()))
    }

    /// A snap that is already realized as `eager`.
    pub fn realized(eager: Eager<T>) -> Self {
        Self::from_state(SnapState::Realized(Ok(eager)))
    }

    fn from_origin(origin: Rc<Origin<T>>) -> Self {
        Self::from_state(SnapState::Pending {
            origin,
            queue: TransformationQueue::new(),
        })
    }

    fn from_state(state: SnapState<T>) -> Self {
        Self {
            node: Rc::new(SnapNode {
                state: RefCell::new(state),
            }),
        }
    }

    /// Returns `true` once the chain has been realized, successfully or not.
    pub fn is_realized(&self) -> bool {
        self.node
            .state
            .try_borrow()
            .is_ok_and(|state| matches!(*state, SnapState::Realized(_)))
    }

    /// Number of steps waiting to run on materialization.
    pub fn queue_len(&self) -> usize {
        self.node.state.try_borrow().map_or(0, |state| match &*state {
            SnapState::Pending { queue, .. } => queue.len(),
            SnapState::Realizing | SnapState::Realized(_) => 0,
        })
    }

    fn kept(&self) -> Option<Result<Eager<T>>> {
        match &*self.node.state.try_borrow().ok()? {
            SnapState::Realized(result) => Some(result.clone()),
            SnapState::Pending { .. } | SnapState::Realizing => None,
        }
    }

    /// A drain of this snap for a new layer: the kept value when realized,
    /// otherwise a deferred memoize of `self`.
    fn upstream(&self) -> Drain<T> {
        match self.kept() {
            Some(result) => Box::new(move || result),
            None => {
                let parent = self.clone();
                Box::new(move || parent.memoize())
            }
        }
    }

    /// A new snap sharing this snap's origin with `step` queued last.
    fn extend<S>(&self, step: S) -> Self
    where
        S: Fn(Eager<T>) -> Result<Eager<T>> + 'static,
    {
        let step: Step<T> = Rc::new(step);
        let shared = self.node.state.try_borrow().ok().and_then(|state| match &*state {
            SnapState::Pending { origin, queue } => Some((Rc::clone(origin), queue.clone())),
            SnapState::Realized(result) => {
                Some((Origin::settled(result.clone()), TransformationQueue::new()))
            }
            SnapState::Realizing => None,
        });
        let (origin, queue) = shared.unwrap_or_else(|| {
            let upstream = self.upstream();
            (Origin::pending(upstream), TransformationQueue::new())
        });
        Self::from_state(SnapState::Pending {
            origin,
            queue: queue.pushed(step),
        })
    }

    /// A new layer that transforms this snap's realized buffer with `whole`.
    fn layer<U, W>(&self, whole: W) -> Snap<U>
    where
        U: Element,
        W: FnOnce(Eager<T>) -> Result<Eager<U>> + 'static,
    {
        let upstream = self.upstream();
        Snap::from_origin(Origin::pending(move || upstream().and_then(whole)))
    }
}

impl<T: Element> Backend<T> for Snap<T> {
    type Rebind<U: Element> = Snap<U>;

    fn empty() -> Self {
        Self::realized(Eager::default())
    }

    fn iterate(&self) -> Traversal<T> {
        let snap = self.clone();
        Traversal::suspended(move || Traversal::from_realized(snap.memoize()))
    }

    fn memoize(&self) -> Result<Eager<T>> {
        if let Some(result) = self.kept() {
            return result;
        }
        let previous = {
            let mut state = self
                .node
                .state
                .try_borrow_mut()
                .map_err(|_| CollectionError::MaterializationInProgress)?;
            mem::replace(&mut *state, SnapState::Realizing)
        };
        let result = match previous {
            SnapState::Pending { origin, queue } => {
                trace_event!(steps = queue.len(), "snap memoizing");
                origin.drain().and_then(|eager| {
                    queue
                        .steps()
                        .into_iter()
                        .try_fold(eager, |current, step| step(current))
                })
            }
            SnapState::Realized(result) => result,
            SnapState::Realizing => return Err(CollectionError::MaterializationInProgress),
        };
        let mut state = self
            .node
            .state
            .try_borrow_mut()
            .map_err(|_| CollectionError::MaterializationInProgress)?;
        *state = SnapState::Realized(result.clone());
        result
    }

    fn size(&self) -> Result<usize> {
        self.memoize().map(|eager| eager.len())
    }

    fn get(&self, index: usize) -> Result<T> {
        self.memoize()?.get(index)
    }

    fn map<U, F>(&self, function: F) -> Snap<U>
    where
        U: Element,
        F: Fn(T) -> U + 'static,
    {
        self.layer(move |eager| Ok(eager.map(function)))
    }

    fn try_map<U, F>(&self, function: F) -> Result<Snap<U>>
    where
        U: Element,
        F: Fn(T) -> Result<U> + 'static,
    {
        Ok(self.layer(move |eager| eager.try_map(function)))
    }

    fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + 'static,
    {
        let predicate = Rc::new(predicate);
        self.extend(move |eager| {
            let predicate = Rc::clone(&predicate);
            Ok(eager.filter(move |value| predicate(value)))
        })
    }

    fn check<F>(&self, inspection: F) -> Result<Self>
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        let inspection = Rc::new(inspection);
        Ok(self.extend(move |eager| {
            let inspection = Rc::clone(&inspection);
            eager.check(move |value| inspection(value))
        }))
    }

    fn append(&self, other: &Self) -> Self {
        let other = other.clone();
        self.extend(move |eager| other.memoize().map(|tail| eager.append(&tail)))
    }

    fn slice(&self, start: usize, end: usize) -> Self {
        self.extend(move |eager| Ok(eager.slice(start, end)))
    }

    fn sort_by<C>(&self, comparator: C) -> Self
    where
        C: Fn(&T, &T) -> Ordering + 'static,
    {
        let comparator = Rc::new(comparator);
        self.extend(move |eager| {
            let comparator = Rc::clone(&comparator);
            Ok(eager.sort_by(move |left, right| comparator(left, right)))
        })
    }

    fn reverse(&self) -> Self {
        self.extend(|eager| Ok(eager.reverse()))
    }

    fn distinct(&self) -> Self
    where
        T: Eq + Hash,
    {
        self.extend(|eager| Ok(eager.distinct()))
    }

    fn group_by<K, F>(&self, key: F) -> Result<Snap<(K, Eager<T>)>>
    where
        K: Element + Eq + Hash,
        F: Fn(&T) -> K + 'static,
    {
        Ok(self.layer(move |eager| eager.group_by(key)))
    }
}

impl<T> Clone for Snap<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T> fmt::Debug for Snap<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = formatter.debug_struct("Snap");
        match self.node.state.try_borrow().as_deref() {
            Ok(SnapState::Pending { queue, .. }) => {
                debug.field("state", &"pending").field("queued", &queue.len())
            }
            Ok(SnapState::Realized(Ok(eager))) => debug
                .field("state", &"realized")
                .field("size", &eager.len()),
            Ok(SnapState::Realized(Err(error))) => {
                debug.field("state", &"failed").field("error", error)
            }
            Ok(SnapState::Realizing) | Err(_) => debug.field("state", &"realizing"),
        };
        debug.finish()
    }
}
