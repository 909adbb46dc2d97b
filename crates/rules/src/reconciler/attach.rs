//! Wiring a [`Reconciler`] to a host's change subscription.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use inner_defaults_core::{HostTree, NodeId, Subscription};
use tracing::info;

use super::{ReconcileStats, Reconciler};

struct Shared {
    reconciler: RefCell<Reconciler>,
    /// Tree enumerations taken by notifications that arrived while a pass
    /// was already running. Non-empty means another pass is due.
    queued: RefCell<Vec<HashSet<NodeId>>>,
    /// Totals as of the last finished pass, readable during a pass.
    stats: Cell<ReconcileStats>,
    seen_len: Cell<usize>,
}

impl Shared {
    /// Run passes until no notification arrived during the last one.
    ///
    /// A re-entrant notification only records which ids were present at
    /// that moment. Before the next pass every recorded enumeration is used
    /// for eviction, so an id removed and re-inserted mid-pass is processed
    /// again.
    fn on_notify<T: HostTree + ?Sized>(&self, tree: &T) {
        let Ok(mut reconciler) = self.reconciler.try_borrow_mut() else {
            let present = tree.all_ids().into_iter().collect();
            self.queued.borrow_mut().push(present);
            return;
        };

        loop {
            let queued = std::mem::take(&mut *self.queued.borrow_mut());
            for present in &queued {
                reconciler.evict_absent(present);
            }

            reconciler.handle_change(tree);
            self.stats.set(reconciler.stats());
            self.seen_len.set(reconciler.seen_len());

            if self.queued.borrow().is_empty() {
                break;
            }
        }
    }
}

/// A reconciler subscribed to a host tree.
///
/// The accessors never touch the running reconciler, so listeners may call
/// them from inside a pass; they then report the last finished pass.
pub struct Attachment {
    shared: Rc<Shared>,
    subscription: Subscription,
}

impl Reconciler {
    /// Prime against `tree`, then process every later change notification.
    ///
    /// The listener holds the tree weakly; once the tree is dropped it does
    /// nothing.
    pub fn attach<T: HostTree + 'static>(mut self, tree: &Rc<T>) -> Attachment {
        self.prime(tree.as_ref());

        let shared = Rc::new(Shared {
            stats: Cell::new(self.stats()),
            seen_len: Cell::new(self.seen_len()),
            reconciler: RefCell::new(self),
            queued: RefCell::new(Vec::new()),
        });

        let listener_shared = Rc::clone(&shared);
        let weak_tree = Rc::downgrade(tree);
        let subscription = tree.subscribe(Rc::new(move || {
            if let Some(tree) = weak_tree.upgrade() {
                listener_shared.on_notify(tree.as_ref());
            }
        }));

        info!("reconciler attached");
        Attachment {
            shared,
            subscription,
        }
    }
}

impl Attachment {
    pub fn stats(&self) -> ReconcileStats {
        self.shared.stats.get()
    }

    pub fn seen_len(&self) -> usize {
        self.shared.seen_len.get()
    }

    /// Unsubscribe and return the final totals.
    pub fn detach(self) -> ReconcileStats {
        let stats = self.stats();
        self.subscription.unsubscribe();
        info!(passes = stats.passes, updated = stats.updated, "reconciler detached");
        stats
    }
}
