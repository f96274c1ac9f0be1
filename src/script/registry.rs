use std::any::TypeId;

use super::Behavior;

/// Result of removing a behaviour kind from a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The behaviour was attached and has been dropped.
    Removed,
    /// The node has behaviours, but none of the requested kind.
    Missing,
    /// The node never had a behaviour attached.
    NoRegistry,
}

impl RemoveOutcome {
    /// Boolean view of the outcome: only [`RemoveOutcome::Missing`] is `false`.
    pub fn as_bool(self) -> bool {
        self != RemoveOutcome::Missing
    }
}

/// Behaviours attached to a single node, at most one per concrete type.
///
/// Entries keep the order in which their kind was first attached; that order
/// is the order the stage invokes them in.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: Vec<(TypeId, Box<dyn Behavior>)>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, kind: TypeId) -> Option<usize> {
        self.entries.iter().position(|(k, _)| *k == kind)
    }

    /// Store `behavior`, replacing any behaviour of the same type in place.
    ///
    /// The replaced behaviour is dropped without any hook being called.
    pub fn insert<T: Behavior>(&mut self, behavior: T) -> &mut T {
        let kind = TypeId::of::<T>();
        let index = match self.position(kind) {
            Some(index) => {
                self.entries[index].1 = Box::new(behavior);
                index
            }
            None => {
                self.entries.push((kind, Box::new(behavior)));
                self.entries.len() - 1
            }
        };
        let entry: &mut dyn Behavior = &mut *self.entries[index].1;
        entry
            .as_any_mut()
            .downcast_mut::<T>()
            .expect("entry was just written with this type")
    }

    pub fn get<T: Behavior>(&self) -> Option<&T> {
        let index = self.position(TypeId::of::<T>())?;
        let entry: &dyn Behavior = &*self.entries[index].1;
        entry.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: Behavior>(&mut self) -> Option<&mut T> {
        let index = self.position(TypeId::of::<T>())?;
        let entry: &mut dyn Behavior = &mut *self.entries[index].1;
        entry.as_any_mut().downcast_mut::<T>()
    }

    pub fn contains<T: Behavior>(&self) -> bool {
        self.position(TypeId::of::<T>()).is_some()
    }

    /// Drop the behaviour of type `T`. Returns `false` if there was none.
    pub fn remove<T: Behavior>(&mut self) -> bool {
        match self.position(TypeId::of::<T>()) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Attached behaviours in attachment order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Behavior> {
        self.entries.iter().map(|(_, b)| &**b)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn Behavior> {
        self.entries.iter_mut().map(|(_, b)| &mut **b as &mut dyn Behavior)
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|b| b.base().id()))
            .finish()
    }
}

/// Registry operations over an optional registry, which is created on the
/// first attachment and dropped as a whole by `clear`.
pub(crate) trait RegistrySlot {
    fn registry(&self) -> Option<&ComponentRegistry>;
    fn registry_mut(&mut self) -> Option<&mut ComponentRegistry>;
    fn registry_or_create(&mut self) -> &mut ComponentRegistry;
    fn take_registry(&mut self) -> Option<ComponentRegistry>;

    fn remove_outcome<T: Behavior>(&mut self) -> RemoveOutcome {
        match self.registry_mut() {
            None => RemoveOutcome::NoRegistry,
            Some(registry) => {
                if registry.remove::<T>() {
                    RemoveOutcome::Removed
                } else {
                    RemoveOutcome::Missing
                }
            }
        }
    }
}

impl RegistrySlot for Option<ComponentRegistry> {
    fn registry(&self) -> Option<&ComponentRegistry> {
        self.as_ref()
    }

    fn registry_mut(&mut self) -> Option<&mut ComponentRegistry> {
        self.as_mut()
    }

    fn registry_or_create(&mut self) -> &mut ComponentRegistry {
        self.get_or_insert_with(ComponentRegistry::new)
    }

    fn take_registry(&mut self) -> Option<ComponentRegistry> {
        self.take()
    }
}
