// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Per-context shared resources.

Some objects (the sprite vertex ring buffer, for example) must exist exactly
once per context no matter how many clients use them.  They are stored here,
keyed by their own type, so each client type gets one slot without any
string keys.
*/

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::{Debug, Formatter};

#[derive(Default)]
pub struct SharedResources {
    entries: HashMap<TypeId, Box<dyn Any>>,
}

impl SharedResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.entries
            .get_mut(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_mut::<T>())
    }

    /// Returns the resource of type `T`, creating it with `create` on first use.
    ///
    /// If `create` fails nothing is stored and the next call tries again.
    pub fn get_or_try_insert_with<T: Any, E>(
        &mut self,
        create: impl FnOnce() -> Result<T, E>,
    ) -> Result<&mut T, E> {
        let entry = match self.entries.entry(TypeId::of::<T>()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => vacant.insert(Box::new(create()?)),
        };
        Ok(entry
            .downcast_mut::<T>()
            .expect("entries are keyed by their own TypeId"))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Debug for SharedResources {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedResources")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::SharedResources;

    #[derive(Debug, PartialEq)]
    struct Ring(u32);
    #[derive(Debug, PartialEq)]
    struct Other(u32);

    #[test]
    fn creates_once_per_type() {
        let mut shared = SharedResources::new();
        let mut calls = 0;
        for _ in 0..3 {
            let ring = shared
                .get_or_try_insert_with(|| {
                    calls += 1;
                    Ok::<_, ()>(Ring(7))
                })
                .unwrap();
            ring.0 += 1;
        }
        assert_eq!(calls, 1);
        assert_eq!(shared.get::<Ring>(), Some(&Ring(10)));
        assert_eq!(shared.get::<Other>(), None);
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn failed_creation_stores_nothing() {
        let mut shared = SharedResources::new();
        let r = shared.get_or_try_insert_with(|| Err::<Ring, _>("no memory"));
        assert_eq!(r.unwrap_err(), "no memory");
        assert!(shared.is_empty());
    }
}
