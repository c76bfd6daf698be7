//! Per-object animation bindings.
//!
//! A binding references an [`AnimationResource`] weakly and selects one of its
//! outputs. It owns no layer or strip data. Reassigning the resource goes
//! through [`BindingRegistry`](crate::registry::BindingRegistry), which keeps
//! the resource's user count in step; the binding itself only exposes the
//! non-blocking update guard that makes a reassignment exclusive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, Weak};

use log::debug;

use crate::animation::{AnimationHandle, AnimationResource};
use crate::ids::{OutputIndex, OwnerId};
use crate::registry::{release_user, Released};

/// Mutable part of a binding.
#[derive(Clone, Debug, Default)]
pub struct BindingState {
    pub(crate) resource: Option<Weak<AnimationResource>>,
    pub selected_output: Option<OutputIndex>,
    /// Output name used to match outputs by name when the stable index does not apply.
    pub output_name: String,
    /// Set once the registry dropped this binding.
    pub(crate) detached: bool,
    /// The owner was destroyed while an update was in flight; the update's
    /// guard finishes the teardown when it ends.
    pub(crate) pending_destroy: bool,
}

impl BindingState {
    /// The bound resource, if it is still alive.
    pub fn resource(&self) -> Option<AnimationHandle> {
        self.resource.as_ref().and_then(Weak::upgrade)
    }

    /// Whether the stored (possibly dead) reference points at `resource`.
    pub(crate) fn points_at(&self, resource: &AnimationResource) -> bool {
        self.resource
            .as_ref()
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), resource))
    }

    /// Pointer identity with `other`, treating "none" == "none".
    pub(crate) fn is_bound_to(&self, other: Option<&AnimationHandle>) -> bool {
        match (&self.resource, other) {
            (None, None) => true,
            (Some(_), Some(strong)) => self.points_at(strong),
            _ => false,
        }
    }

    /// Release the bound resource's user and mark the binding dead.
    /// Returns `None` when nothing live was bound or the binding was already detached.
    pub(crate) fn detach(&mut self) -> Option<Released> {
        self.pending_destroy = false;
        if self.detached {
            return None;
        }
        self.detached = true;
        let released = self.resource().map(|old| release_user(&old));
        self.resource = None;
        released
    }
}

/// Animation binding of one owner (scene object).
#[derive(Debug)]
pub struct AnimationBinding {
    owner: OwnerId,
    /// Display name of the owner, used as the last fallback when matching outputs.
    owner_name: String,
    /// Kind tag of the owner ("OB", "CA", ...). Outputs tagged for another kind never match by name.
    id_type: Option<String>,
    state: Mutex<BindingState>,
    updating: AtomicBool,
}

impl AnimationBinding {
    pub(crate) fn new(owner: OwnerId, owner_name: String, id_type: Option<String>) -> Self {
        Self {
            owner,
            owner_name,
            id_type,
            state: Mutex::new(BindingState::default()),
            updating: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    #[inline]
    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    #[inline]
    pub fn id_type(&self) -> Option<&str> {
        self.id_type.as_deref()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, BindingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> BindingState {
        self.state().clone()
    }

    /// The bound resource, if any and still alive.
    pub fn bound_resource(&self) -> Option<AnimationHandle> {
        self.state().resource()
    }

    pub fn selected_output(&self) -> Option<OutputIndex> {
        self.state().selected_output
    }

    pub fn output_name(&self) -> String {
        self.state().output_name.clone()
    }

    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::Acquire)
    }

    /// Try to become the single writer of this binding. Never blocks.
    ///
    /// Returns `None` when another update is in flight (including a re-entrant
    /// one from the same thread); the caller should skip its update.
    pub fn try_begin_update(&self) -> Option<UpdateGuard<'_>> {
        self.updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| UpdateGuard { binding: self })
    }
}

/// Exclusive update scope on one binding; released on drop.
#[derive(Debug)]
pub struct UpdateGuard<'a> {
    binding: &'a AnimationBinding,
}

impl UpdateGuard<'_> {
    pub fn binding(&self) -> &AnimationBinding {
        self.binding
    }

    /// End the update scope explicitly.
    pub fn end(self) {}
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        // The flag is cleared while the state lock is held, so a concurrent
        // destroy either sees the guard free or leaves its request for us.
        let mut state = self.binding.state();
        if state.pending_destroy {
            let released = state.detach();
            debug!(
                "{} finished deferred teardown: released={:?}",
                self.binding.owner,
                released.map(|r| r.resource)
            );
        }
        self.binding.updating.store(false, Ordering::Release);
    }
}
