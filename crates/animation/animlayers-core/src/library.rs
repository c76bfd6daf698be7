//! Datablock store: owns strong handles to every animation resource.
//!
//! Bindings hold weak references, so a resource stays alive as long as the
//! library keeps it. [`AnimationLibrary::purge_orphans`] drops the ones nobody
//! uses or keeps alive.

use log::debug;

use crate::animation::{AnimationData, AnimationHandle, AnimationResource};
use crate::config::Config;
use crate::ids::ResourceId;

#[derive(Debug, Default)]
pub struct AnimationLibrary {
    cfg: Config,
    items: Vec<AnimationHandle>,
}

impl AnimationLibrary {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            items: Vec::new(),
        }
    }

    /// Create an empty resource, store it, and hand back a strong handle.
    pub fn new_animation(&mut self, name: &str) -> AnimationHandle {
        let handle = AnimationResource::create_with_config(name, &self.cfg);
        self.items.push(handle.clone());
        handle
    }

    /// Store prepared data as a new resource.
    pub fn load(&mut self, data: AnimationData) -> AnimationHandle {
        let handle = AnimationResource::from_data(data);
        self.items.push(handle.clone());
        handle
    }

    /// Store an existing handle. Storing the same resource twice is a no-op.
    pub fn insert(&mut self, handle: AnimationHandle) {
        if self.get(handle.id()).is_none() {
            self.items.push(handle);
        }
    }

    pub fn get(&self, id: ResourceId) -> Option<&AnimationHandle> {
        self.items.iter().find(|h| h.id() == id)
    }

    /// First resource with this name. Names are not unique.
    pub fn find_by_name(&self, name: &str) -> Option<&AnimationHandle> {
        self.items.iter().find(|h| h.read().name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimationHandle> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every resource with zero users and no keep-alive. Returns the removed ids.
    pub fn purge_orphans(&mut self) -> Vec<ResourceId> {
        let mut removed = Vec::new();
        self.items.retain(|h| {
            if h.is_eligible_for_destruction() {
                removed.push(h.id());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            debug!("purged {} orphan animation resource(s)", removed.len());
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BindingRegistry;

    #[test]
    fn purge_keeps_used_and_kept_alive_resources() {
        let mut lib = AnimationLibrary::default();
        let used = lib.new_animation("used");
        let kept = lib.new_animation("kept");
        let orphan = lib.new_animation("orphan");

        let registry = BindingRegistry::default();
        let owner = registry.alloc_owner();
        registry.create_binding_for(owner);
        registry.set_bound_resource(owner, Some(&used)).unwrap();
        let _pin = kept.keep_alive();

        let removed = lib.purge_orphans();
        assert_eq!(removed, vec![orphan.id()]);
        assert_eq!(lib.len(), 2);
        assert!(lib.get(used.id()).is_some());
        assert!(lib.get(kept.id()).is_some());
    }

    #[test]
    fn dropping_library_handle_invalidates_weak_bindings() {
        let mut lib = AnimationLibrary::default();
        let registry = BindingRegistry::default();
        let owner = registry.alloc_owner();
        let binding = registry.create_binding_for(owner);
        {
            let anim = lib.new_animation("A");
            registry.set_bound_resource(owner, Some(&anim)).unwrap();
            registry.set_bound_resource(owner, None).unwrap();
        }
        assert_eq!(lib.purge_orphans().len(), 1);
        assert!(binding.bound_resource().is_none());
        assert!(lib.is_empty());
    }

    #[test]
    fn insert_is_idempotent_and_lookup_by_name() {
        let mut lib = AnimationLibrary::default();
        let a = AnimationResource::create("Walk");
        lib.insert(a.clone());
        lib.insert(a.clone());
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.find_by_name("Walk").map(|h| h.id()), Some(a.id()));
        assert!(lib.find_by_name("Run").is_none());
    }
}
