//! Stable opaque IDs, allocated deterministically by prefix (§3).
//!
//! Mirrors the arena/ID-allocation pattern used for address spaces: an
//! artifact never reuses or renumbers an ID once handed out, and every ID
//! type stringifies with its prefix (`m0`, `d2`, `n14`, ...).

use std::fmt;
use std::marker::PhantomData;

macro_rules! opaque_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }
    };
}

opaque_id!(ModuleId, "m");
opaque_id!(DeviceId, "d");
opaque_id!(NetId, "n");
opaque_id!(InstanceId, "i");
opaque_id!(EndpointId, "e");

/// Pattern expression ids print as `expr<k>` rather than sharing a
/// single-letter prefix with the graph-entity ids (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expr{}", self.0)
    }
}

impl From<u32> for ExprId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Monotonically-increasing allocator for one ID type, scoped to a single
/// artifact build. Atomized-graph allocators are distinct instances from
/// patterned-graph allocators, so ids never collide across artifacts even
/// though both use the same id types (§3 "IDs are allocated fresh per
/// artifact").
#[derive(Debug, Clone)]
pub struct IdAllocator<T> {
    next: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for IdAllocator<T> {
    fn default() -> Self {
        Self {
            next: 0,
            _marker: PhantomData,
        }
    }
}

impl<T: From<u32>> IdAllocator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> T {
        let id = self.next;
        self.next += 1;
        T::from(id)
    }

    pub fn len(&self) -> u32 {
        self.next
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }
}

/// A reference to any graph entity, used as the key for pattern-origin and
/// source-span registries that span multiple entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityId {
    Module(ModuleId),
    Device(DeviceId),
    Net(NetId),
    Instance(InstanceId),
    Endpoint(EndpointId),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Module(id) => write!(f, "{id}"),
            EntityId::Device(id) => write!(f, "{id}"),
            EntityId::Net(id) => write!(f, "{id}"),
            EntityId::Instance(id) => write!(f, "{id}"),
            EntityId::Endpoint(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_print_with_their_prefix() {
        assert_eq!(ModuleId::from_raw(0).to_string(), "m0");
        assert_eq!(NetId::from_raw(14).to_string(), "n14");
        assert_eq!(ExprId::from_raw(3).to_string(), "expr3");
    }

    #[test]
    fn allocator_hands_out_sequential_ids_never_reused() {
        let mut alloc: IdAllocator<NetId> = IdAllocator::new();
        let a = alloc.alloc();
        let b = alloc.alloc();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(alloc.len(), 2);
    }
}
