//! Property attribute bits.

use bitflags::bitflags;

bitflags! {
    /// A bit set over `{configurable, writable, enumerable, extensible,
    /// deleted, accessor}`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Attributes: u8 {
        /// The property's attributes may be changed and the property may be deleted.
        const CONFIGURABLE = 1 << 0;
        /// The property's value may be reassigned.
        const WRITABLE = 1 << 1;
        /// The property appears in `for-in`-style enumeration.
        const ENUMERABLE = 1 << 2;
        /// New properties may be added to the object holding this shape.
        const EXTENSIBLE = 1 << 3;
        /// Tombstone: the shape node is skipped by lookup without breaking the chain.
        const DELETED = 1 << 4;
        /// The slot holds a getter/setter pair rather than a plain value.
        ///
        /// Dispatch on this bit belongs to the interpreter, not this core;
        /// the core only preserves the bit.
        const ACCESSOR = 1 << 5;
    }
}

impl Attributes {
    /// Attributes given to an ordinary user-defined property.
    pub const DEFAULT: Attributes = Attributes::CONFIGURABLE
        .union(Attributes::WRITABLE)
        .union(Attributes::ENUMERABLE)
        .union(Attributes::EXTENSIBLE);

    /// Attributes given to an enumerable constant via `def_const`.
    pub const CONST_ENUM: Attributes = Attributes::ENUMERABLE.union(Attributes::EXTENSIBLE);

    /// Attributes given to a non-enumerable constant via `def_const`.
    pub const CONST_NOT_ENUM: Attributes = Attributes::EXTENSIBLE;
}

/// Attributes given to an ordinary user-defined property, published under
/// the name external callers expect.
pub const ATTR_DEFAULT: Attributes = Attributes::DEFAULT;
/// Attributes given to an enumerable constant, published under the name
/// external callers expect.
pub const ATTR_CONST_ENUM: Attributes = Attributes::CONST_ENUM;
/// Attributes given to a non-enumerable constant, published under the name
/// external callers expect.
pub const ATTR_CONST_NOT_ENUM: Attributes = Attributes::CONST_NOT_ENUM;
