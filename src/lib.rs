//! Hidden-class shape tree and per-instance property store for a
//! dynamic-language VM.
//!
//! The crate is organized as one focused module per concept:
//!
//! - [`value`]: the tagged [`value::ValuePair`] carrier and object/function
//!   handles.
//! - [`attrs`]: the [`attrs::Attributes`] bit set.
//! - [`value_type`]: [`value_type::ValueType`], the partial-type lattice
//!   used for specialization.
//! - [`shape`]: the [`shape::ShapeRegistry`] hidden-class tree.
//! - [`object`]: the [`object::ObjectHeap`] inline/extension slot store.
//! - [`protocol`]: `get`/`set`/`def_const`/`set_prop_attrs`, the property
//!   access protocol built on top of the previous modules.
//! - [`context`]: [`context::VmContext`], threading all of the above
//!   through every call instead of relying on ambient globals.

pub mod attrs;
pub mod context;
pub mod object;
pub mod protocol;
pub mod shape;
pub mod value;
pub mod value_type;

pub use self::attrs::Attributes;
pub use self::context::{Config, VmContext};
pub use self::object::{LayoutKind, ObjectHeap};
pub use self::shape::{ShapeId, ShapeRegistry};
pub use self::value::{FunctionRef, ObjectId, Tag, ValuePair, Word};
pub use self::value_type::ValueType;
