//! Partial type information used by the compiler for specialization.
//!
//! A [`ValueType`] is a lattice element: `⊤` (all-unknown) downward to a
//! fully pinned value.

use std::hash::{Hash, Hasher};

use crate::context::VmContext;
use crate::shape::ShapeId;
use crate::value::{FunctionRef, Tag, ValuePair, Word};

/// The three mutually-exclusive payload kinds a [`ValueType`] may carry.
///
/// At most one of `shape_known`, `fptr_known`, `val_known` is ever true
/// because their storage aliases one word; modeling that as a three-way
/// enum instead of three `Option`s makes the exclusion structural rather
/// than a runtime invariant to maintain by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Payload {
    None,
    Shape(ShapeId),
    Fptr(FunctionRef),
    Val(Word),
}

/// A compact record of partial knowledge about a value.
#[derive(Debug, Clone, Copy)]
pub struct ValueType {
    tag_known: bool,
    tag: Tag,
    payload: Payload,
    /// Usable by the compiler to elide overflow checks: the value is known
    /// to be strictly less than its tag's maximum.
    pub sub_max: bool,
}

impl ValueType {
    /// `⊤`: nothing known about the value.
    pub const ANY: ValueType = ValueType {
        tag_known: false,
        tag: Tag::Int32,
        payload: Payload::None,
        sub_max: false,
    };

    /// Build a type that only knows the tag (used in tests and by callers
    /// that don't have a live object/function to hand).
    #[must_use]
    pub const fn from_tag(tag: Tag) -> Self {
        ValueType {
            tag_known: true,
            tag,
            payload: Payload::None,
            sub_max: false,
        }
    }

    /// Builds the type that exactly describes a concrete value.
    #[must_use]
    pub fn from_value(ctx: &VmContext, v: ValuePair) -> Self {
        let payload = if v.tag.is_object() {
            Payload::Shape(ctx.heap.get_shape_idx(v.as_object_id()))
        } else if v.tag == Tag::FunPtr {
            Payload::Fptr(FunctionRef(v.word as u32))
        } else if v.tag == Tag::Int32 {
            Payload::Val(v.word)
        } else {
            Payload::None
        };
        ValueType {
            tag_known: true,
            tag: v.tag,
            payload,
            sub_max: false,
        }
    }

    #[must_use]
    pub fn tag(&self) -> Option<Tag> {
        self.tag_known.then_some(self.tag)
    }

    #[must_use]
    pub fn shape(&self) -> Option<ShapeId> {
        match self.payload {
            Payload::Shape(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn fptr(&self) -> Option<FunctionRef> {
        match self.payload {
            Payload::Fptr(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub fn word(&self) -> Option<Word> {
        match self.payload {
            Payload::Val(w) => Some(w),
            _ => None,
        }
    }

    /// Pointwise meet: a field is known in the result iff it's known in both
    /// inputs and the underlying payloads agree.
    #[must_use]
    pub fn join(a: ValueType, b: ValueType) -> ValueType {
        let tag_known = a.tag_known && b.tag_known && a.tag == b.tag;
        let payload = if a.payload == b.payload {
            a.payload
        } else {
            Payload::None
        };
        ValueType {
            tag_known,
            tag: if tag_known { a.tag } else { Tag::Int32 },
            payload,
            sub_max: a.sub_max && b.sub_max,
        }
    }

    /// `a` refines `b`: `join(a, b) == b`.
    #[must_use]
    pub fn is_subtype(self, other: ValueType) -> bool {
        ValueType::join(self, other) == other
    }

    /// Project a value's type down to what a shape node may store: strips
    /// `shape_known`, `val_known`, and `sub_max` unconditionally, then
    /// applies the two configuration options.
    ///
    /// When the stripped-away shape belongs to a closure and
    /// `shape_nofptrspec` is not set, the closure's own recorded function
    /// identity is lifted into `fptr` so callsite specialization survives
    /// the shape becoming unknown.
    #[must_use]
    pub fn prop_type(
        self,
        shapes: &mut crate::shape::ShapeRegistry,
        shape_notagspec: bool,
        shape_nofptrspec: bool,
    ) -> ValueType {
        let mut payload = match self.payload {
            Payload::Val(_) => Payload::None,
            Payload::Shape(shape_id) => {
                if shape_nofptrspec {
                    Payload::None
                } else {
                    match shapes.closure_fptr(shape_id) {
                        Some(f) => Payload::Fptr(f),
                        None => Payload::None,
                    }
                }
            }
            other => other,
        };
        if shape_nofptrspec {
            if let Payload::Fptr(_) = payload {
                payload = Payload::None;
            }
        }

        ValueType {
            tag_known: self.tag_known && !shape_notagspec,
            tag: self.tag,
            payload,
            sub_max: false,
        }
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        if self.tag_known != other.tag_known {
            return false;
        }
        if self.tag_known && self.tag != other.tag {
            return false;
        }
        self.sub_max == other.sub_max && self.payload == other.payload
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag_known.hash(state);
        if self.tag_known {
            self.tag.hash(state);
        }
        self.sub_max.hash(state);
        self.payload.hash(state);
    }
}
