//! Process-wide table of animation bindings and the owner of all user-count bookkeeping.
//!
//! Every change of a binding's resource goes through
//! [`BindingRegistry::set_bound_resource`], so a resource's
//! `reference_count` always equals the number of bindings pointing at it.

use std::sync::{Arc, RwLock};

use hashbrown::HashMap;
use log::debug;

use crate::animation::{AnimationHandle, AnimationResource};
use crate::binding::{AnimationBinding, UpdateGuard};
use crate::config::Config;
use crate::error::{AnimError, Result};
use crate::ids::{IdAllocator, OutputIndex, OwnerId, ResourceId};

/// Notification from the host's object storage.
pub trait ObjectLifecycle {
    fn object_destroyed(&self, owner: OwnerId);
}

/// What happened to the previously bound resource when a binding let go of it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Released {
    pub resource: ResourceId,
    pub remaining_users: u32,
    /// No users and no keep-alive handles remain.
    pub eligible_for_destruction: bool,
}

/// Outcome of a reassignment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rebind {
    /// Already bound to that resource (or both none).
    Unchanged,
    /// Teardown of a binding that was mid-update; the release happens when that update ends.
    Deferred,
    Changed {
        released: Option<Released>,
        acquired: Option<ResourceId>,
    },
}

/// Owner → binding table.
#[derive(Debug)]
pub struct BindingRegistry {
    bindings: RwLock<HashMap<OwnerId, Arc<AnimationBinding>>>,
    ids: std::sync::Mutex<IdAllocator>,
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl BindingRegistry {
    pub fn new(cfg: &Config) -> Self {
        Self {
            bindings: RwLock::new(HashMap::with_capacity(cfg.registry_capacity)),
            ids: std::sync::Mutex::new(IdAllocator::new()),
        }
    }

    /// Allocate a fresh owner id for hosts that do not bring their own.
    pub fn alloc_owner(&self) -> OwnerId {
        self.ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .alloc_owner()
    }

    /// Return the owner's binding, creating an empty one if absent.
    pub fn create_binding_for(&self, owner: OwnerId) -> Arc<AnimationBinding> {
        self.create_binding_for_named(owner, "")
    }

    /// As [`create_binding_for`](Self::create_binding_for), recording the owner's display name.
    /// The name of an existing binding is left unchanged.
    pub fn create_binding_for_named(&self, owner: OwnerId, name: &str) -> Arc<AnimationBinding> {
        self.create_binding_for_typed(owner, name, None)
    }

    /// As [`create_binding_for_named`](Self::create_binding_for_named), also recording the
    /// owner's kind tag. Name matching then skips outputs tagged for another kind.
    pub fn create_binding_for_typed(
        &self,
        owner: OwnerId,
        name: &str,
        id_type: Option<&str>,
    ) -> Arc<AnimationBinding> {
        if let Some(existing) = self.binding(owner) {
            return existing;
        }
        let mut map = self.bindings.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(map.entry(owner).or_insert_with(|| {
            Arc::new(AnimationBinding::new(
                owner,
                name.to_string(),
                id_type.map(str::to_string),
            ))
        }))
    }

    pub fn binding(&self, owner: OwnerId) -> Option<Arc<AnimationBinding>> {
        self.bindings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&owner)
            .cloned()
    }

    fn require(&self, owner: OwnerId) -> Result<Arc<AnimationBinding>> {
        self.binding(owner).ok_or(AnimError::BindingNotFound(owner))
    }

    /// Point `owner`'s binding at `resource` (or at nothing), adjusting user counts.
    ///
    /// Fails with `Busy` when another update of the same binding is in flight.
    pub fn set_bound_resource(
        &self,
        owner: OwnerId,
        resource: Option<&AnimationHandle>,
    ) -> Result<Rebind> {
        let binding = self.require(owner)?;
        Self::rebind(&binding, resource)
    }

    /// Display-sync path: like [`set_bound_resource`](Self::set_bound_resource) but a busy
    /// binding is skipped silently (`Ok(None)`); the next observation cycle retries.
    pub fn sync_bound_resource(
        &self,
        owner: OwnerId,
        resource: Option<&AnimationHandle>,
    ) -> Result<Option<Rebind>> {
        match self.set_bound_resource(owner, resource) {
            Ok(rebind) => Ok(Some(rebind)),
            Err(AnimError::Busy(owner)) => {
                debug!("skipping resource sync for {owner}: update in flight");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn rebind(binding: &AnimationBinding, resource: Option<&AnimationHandle>) -> Result<Rebind> {
        let guard = binding
            .try_begin_update()
            .ok_or(AnimError::Busy(binding.owner()))?;
        Self::rebind_locked(&guard, resource)
    }

    fn rebind_locked(guard: &UpdateGuard<'_>, resource: Option<&AnimationHandle>) -> Result<Rebind> {
        let binding = guard.binding();
        let mut state = binding.state();
        if state.detached {
            return Err(AnimError::BindingNotFound(binding.owner()));
        }
        if state.is_bound_to(resource) {
            return Ok(Rebind::Unchanged);
        }

        let released = state.resource().map(|old| release_user(&old));

        let acquired = resource.map(|new| {
            new.add_user();
            new.id()
        });
        state.resource = resource.map(Arc::downgrade);

        debug!(
            "{} rebound: released={:?} acquired={:?}",
            binding.owner(),
            released.map(|r| r.resource),
            acquired
        );
        Ok(Rebind::Changed { released, acquired })
    }

    /// Release the owner's resource and forget the binding.
    ///
    /// Never fails with `Busy`: when an update of the binding is in flight the
    /// binding leaves the registry at once and its resource is released as soon
    /// as that update ends ([`Rebind::Deferred`]). Holders of the removed binding
    /// can no longer reassign it.
    pub fn destroy_binding(&self, owner: OwnerId) -> Result<Rebind> {
        let binding = self.require(owner)?;
        self.bindings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&owner);
        binding.state().pending_destroy = true;

        let Some(guard) = binding.try_begin_update() else {
            debug!("{owner} destroyed mid-update; release deferred to the end of that update");
            return Ok(Rebind::Deferred);
        };
        let rebind = {
            let mut state = binding.state();
            if state.detached {
                // The in-flight update ended between our request and our acquire.
                Rebind::Deferred
            } else {
                match state.detach() {
                    Some(released) => Rebind::Changed {
                        released: Some(released),
                        acquired: None,
                    },
                    None => Rebind::Unchanged,
                }
            }
        };
        guard.end();
        Ok(rebind)
    }

    pub fn select_output(&self, owner: OwnerId, output: Option<OutputIndex>) -> Result<()> {
        let binding = self.require(owner)?;
        binding.state().selected_output = output;
        Ok(())
    }

    pub fn set_output_name(&self, owner: OwnerId, name: &str) -> Result<()> {
        let binding = self.require(owner)?;
        binding.state().output_name = name.to_string();
        Ok(())
    }

    /// Select the best-matching output of the bound resource (see
    /// [`AnimationResource::find_suitable_output_for`]).
    /// Returns the selection; the binding is left alone when nothing matches.
    pub fn assign_suitable_output(&self, owner: OwnerId) -> Result<Option<OutputIndex>> {
        let binding = self.require(owner)?;
        let Some(resource) = binding.bound_resource() else {
            return Ok(None);
        };
        let Some(index) = resource.find_suitable_output_for(&binding) else {
            return Ok(None);
        };
        // An untagged output takes the owner's kind once it is assigned.
        let name = {
            let mut data = resource.write();
            match data.find_output_mut(index) {
                Some(output) => {
                    if output.id_type.is_none() {
                        output.id_type = binding.id_type().map(str::to_string);
                    }
                    output.name.clone()
                }
                None => String::new(),
            }
        };
        let mut state = binding.state();
        state.selected_output = Some(index);
        state.output_name = name;
        Ok(Some(index))
    }

    /// Owners whose binding currently points at `resource`.
    pub fn bindings_for(&self, resource: &AnimationResource) -> Vec<OwnerId> {
        let mut owners: Vec<OwnerId> = self
            .bindings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|b| b.state().points_at(resource))
            .map(|b| b.owner())
            .collect();
        owners.sort_by_key(|o| o.0);
        owners
    }

    /// Recount the bindings pointing at `resource`; always equals its `reference_count`.
    pub fn users_of(&self, resource: &AnimationResource) -> u32 {
        self.bindings_for(resource).len() as u32
    }

    pub fn len(&self) -> usize {
        self.bindings.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop one user of `old` and report what is left.
pub(crate) fn release_user(old: &AnimationResource) -> Released {
    let remaining_users = old.remove_user();
    let eligible_for_destruction = old.is_eligible_for_destruction();
    if eligible_for_destruction {
        debug!("animation {} has no users left and is eligible for destruction", old.id());
    }
    Released {
        resource: old.id(),
        remaining_users,
        eligible_for_destruction,
    }
}

impl ObjectLifecycle for BindingRegistry {
    fn object_destroyed(&self, owner: OwnerId) {
        match self.destroy_binding(owner) {
            Ok(_) | Err(AnimError::BindingNotFound(_)) => {}
            Err(e) => log::warn!("could not tear down binding of destroyed {owner}: {e}"),
        }
    }
}
