//! The per-instance slot store: object headers and inline/extension slots.
//!
//! This module stands in for the "object layout primitives" the real VM
//! exposes as an external contract. The real VM's garbage collector owns
//! this memory, relocates it, and exposes from-/to-space predicates; since
//! the GC is an external collaborator this crate does not implement, the
//! heap here is a simple non-relocating arena that satisfies the same
//! accessor surface.

use crate::shape::ShapeId;
use crate::value::{ObjectId, Tag, Word};

/// The three concrete layouts that share this slot store.
///
/// Closures and arrays reserve leading slots (`FPTR_SLOT_IDX`,
/// `ARRTBL_SLOT_IDX`, `ARRLEN_SLOT_IDX`) that the protocol layer and
/// interpreter give meaning to; the store itself treats all three kinds
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    Object,
    Closure,
    Array,
}

/// One instance's header plus its inline slot vector.
#[derive(Debug, Clone)]
struct ObjectData {
    kind: LayoutKind,
    shape_idx: ShapeId,
    slots: Vec<(Word, Tag)>,
    next: Option<ObjectId>,
}

/// A non-relocating arena of [`ObjectData`]. Stands in for the VM's
/// external object-layout primitives.
#[derive(Default)]
pub struct ObjectHeap {
    objects: Vec<ObjectData>,
}

impl ObjectHeap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh instance with `cap` inline slots plus `extra` slots
    /// reserved beyond `cap` (used by `new_clos` for captured cells). All
    /// slots start tagged [`Tag::Undefined`].
    pub fn alloc(&mut self, kind: LayoutKind, cap: u32, extra: u32) -> ObjectId {
        let total = cap
            .checked_add(extra)
            .expect("object capacity overflowed u32");
        let id = ObjectId(u32::try_from(self.objects.len()).expect("object heap overflowed u32"));
        self.objects.push(ObjectData {
            kind,
            // Callers always set a real shape immediately after `alloc`;
            // until then this points harmlessly at shape index 0 (the root).
            shape_idx: ShapeId::default(),
            slots: vec![(0, Tag::Undefined); total as usize],
            next: None,
        });
        id
    }

    fn get(&self, id: ObjectId) -> &ObjectData {
        &self.objects[id.0 as usize]
    }

    fn get_mut(&mut self, id: ObjectId) -> &mut ObjectData {
        &mut self.objects[id.0 as usize]
    }

    #[must_use]
    pub fn get_kind(&self, id: ObjectId) -> LayoutKind {
        self.get(id).kind
    }

    #[must_use]
    pub fn get_cap(&self, id: ObjectId) -> u32 {
        u32::try_from(self.get(id).slots.len()).expect("capacity always fits u32")
    }

    #[must_use]
    pub fn get_word(&self, id: ObjectId, i: u32) -> Word {
        self.get(id).slots[i as usize].0
    }

    #[must_use]
    pub fn get_tag(&self, id: ObjectId, i: u32) -> Tag {
        self.get(id).slots[i as usize].1
    }

    pub fn set_word(&mut self, id: ObjectId, i: u32, w: Word) {
        self.get_mut(id).slots[i as usize].0 = w;
    }

    pub fn set_tag(&mut self, id: ObjectId, i: u32, t: Tag) {
        self.get_mut(id).slots[i as usize].1 = t;
    }

    #[must_use]
    pub fn get_next(&self, id: ObjectId) -> Option<ObjectId> {
        self.get(id).next
    }

    pub fn set_next(&mut self, id: ObjectId, next: Option<ObjectId>) {
        self.get_mut(id).next = next;
    }

    #[must_use]
    pub fn get_shape_idx(&self, id: ObjectId) -> ShapeId {
        self.get(id).shape_idx
    }

    pub fn set_shape_idx(&mut self, id: ObjectId, shape: ShapeId) {
        self.get_mut(id).shape_idx = shape;
    }

    /// GC phase predicate: this heap has no from-space, so nothing is ever
    /// mid-collection in it.
    #[must_use]
    pub fn in_from_space(&self, _id: ObjectId) -> bool {
        false
    }

    /// GC phase predicate: this heap is single-space, so every live id is
    /// "in to-space".
    #[must_use]
    pub fn in_to_space(&self, _id: ObjectId) -> bool {
        true
    }
}
