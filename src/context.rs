//! The explicit VM context threading the shape registry, object heap, and
//! function reference set through every operation.
//!
//! Spec §9 flags the shape registry and function reference set as
//! process-wide singletons in the source VM and recommends threading a
//! context explicitly instead of relying on ambient globals; `VmContext` is
//! that context.

use crate::object::{LayoutKind, ObjectHeap};
use crate::protocol;
use crate::shape::ShapeRegistry;
use crate::value::{FunctionRef, ObjectId, Tag, ValuePair};

/// Minimum inline slot capacity for any newly allocated object (spec §3, §6).
pub const OBJ_MIN_CAP: u32 = 8;
/// Slot index reserved for `__proto__` across every layout kind (spec §3, §6).
pub const PROTO_SLOT_IDX: u32 = 0;
/// Slot index reserved for a closure's function pointer (spec §3, §6).
pub const FPTR_SLOT_IDX: u32 = 1;
/// Slot index reserved for an array's element table (spec §3, §6).
pub const ARRTBL_SLOT_IDX: u32 = 1;
/// Slot index reserved for an array's length (spec §3, §6).
pub const ARRLEN_SLOT_IDX: u32 = 2;

/// Runtime-configurable knobs read by the value-type projection (spec §4.1, §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    /// Strip `tag_known` from every shape-stored property type.
    pub shape_notagspec: bool,
    /// Never lift a closure's function identity across a shape transition.
    pub shape_nofptrspec: bool,
}

/// The append-only set of function identities the VM has registered
/// (spec §5's "function reference set").
#[derive(Default)]
pub struct FunctionTable {
    count: u32,
}

impl FunctionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function and return its stable identity.
    pub fn register(&mut self) -> FunctionRef {
        let id = FunctionRef(self.count);
        self.count = self.count.checked_add(1).expect("function table overflowed u32");
        id
    }
}

/// All VM-owned state the property protocol operates over.
pub struct VmContext {
    pub shapes: ShapeRegistry,
    pub heap: ObjectHeap,
    pub functions: FunctionTable,
    pub config: Config,
    /// The designated global object, if any; shape flips on it are counted
    /// separately in `shapes.num_shape_flips_global` (spec §4.4 step 4).
    pub global_object: Option<ObjectId>,
}

impl Default for VmContext {
    fn default() -> Self {
        Self::new()
    }
}

impl VmContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shapes: ShapeRegistry::new(),
            heap: ObjectHeap::new(),
            functions: FunctionTable::new(),
            config: Config::default(),
            global_object: None,
        }
    }

    /// `new_obj(proto, cap=MIN_CAP)` (spec §4.5).
    pub fn new_obj(&mut self, proto: ValuePair) -> ObjectId {
        self.new_obj_with_cap(proto, OBJ_MIN_CAP)
    }

    /// `new_obj` with an explicit initial inline capacity (still clamped up
    /// to `OBJ_MIN_CAP`).
    pub fn new_obj_with_cap(&mut self, proto: ValuePair, cap: u32) -> ObjectId {
        let cap = cap.max(OBJ_MIN_CAP);
        let id = self.heap.alloc(LayoutKind::Object, cap, 0);
        self.heap.set_shape_idx(id, self.shapes.root());
        protocol::def_const(self, id, "__proto__", proto, false);
        id
    }

    /// `new_clos(proto, num_cells, fun)` (spec §4.5): allocates `MIN_CAP`
    /// inline slots plus `num_cells` captured cells, registers `__proto__`
    /// and `__fptr__` as constants.
    pub fn new_clos(&mut self, proto: ValuePair, num_cells: u32, fun: FunctionRef) -> ObjectId {
        let id = self.heap.alloc(LayoutKind::Closure, OBJ_MIN_CAP, num_cells);
        self.heap.set_shape_idx(id, self.shapes.root());
        protocol::def_const(self, id, "__proto__", proto, false);
        protocol::def_const(self, id, "__fptr__", ValuePair::from_function(fun), false);
        id
    }

    /// Allocates an `ARRAY` instance with `MIN_CAP` inline slots and
    /// registers `__proto__`, `__arrtbl__` and `__arrlen__`. Element
    /// indexing beyond the reserved `length`/`table` slots is out of scope
    /// (spec §1 Non-goals); this constructor and the accessors below exist
    /// because §6 names them as part of the core's external surface.
    ///
    /// `__arrtbl__`/`__arrlen__` are registered as ordinary shape
    /// properties, exactly like `__fptr__` on closures, purely so their
    /// slot indices are reserved in the shape's numbering: a later
    /// `set_prop` on this array must not be handed the same slot index the
    /// raw accessors below read and write directly.
    pub fn new_arr(&mut self, proto: ValuePair) -> ObjectId {
        let id = self.heap.alloc(LayoutKind::Array, OBJ_MIN_CAP, 0);
        self.heap.set_shape_idx(id, self.shapes.root());
        protocol::def_const(self, id, "__proto__", proto, false);
        protocol::def_const(self, id, "__arrtbl__", ValuePair::UNDEFINED, false);
        protocol::def_const(self, id, "__arrlen__", ValuePair::new(0, Tag::Int32), false);
        id
    }

    #[must_use]
    pub fn get_shape(&self, obj: ObjectId) -> crate::shape::ShapeId {
        self.heap.get_shape_idx(obj)
    }

    /// Reserved-slot accessor (spec §6): a closure's recorded function identity.
    #[must_use]
    pub fn get_fun_ptr(&self, obj: ObjectId) -> FunctionRef {
        debug_assert_eq!(self.heap.get_kind(obj), LayoutKind::Closure);
        FunctionRef(self.heap.get_word(obj, FPTR_SLOT_IDX) as u32)
    }

    /// Reserved-slot accessor (spec §6): an array's backing element table.
    #[must_use]
    pub fn get_arr_tbl(&self, obj: ObjectId) -> ValuePair {
        debug_assert_eq!(self.heap.get_kind(obj), LayoutKind::Array);
        ValuePair::new(
            self.heap.get_word(obj, ARRTBL_SLOT_IDX),
            self.heap.get_tag(obj, ARRTBL_SLOT_IDX),
        )
    }

    /// Reserved-slot accessor (spec §6).
    pub fn set_arr_tbl(&mut self, obj: ObjectId, table: ValuePair) {
        debug_assert_eq!(self.heap.get_kind(obj), LayoutKind::Array);
        self.heap.set_word(obj, ARRTBL_SLOT_IDX, table.word);
        self.heap.set_tag(obj, ARRTBL_SLOT_IDX, table.tag);
    }

    /// Reserved-slot accessor (spec §6): an array's length.
    #[must_use]
    pub fn get_arr_len(&self, obj: ObjectId) -> u64 {
        debug_assert_eq!(self.heap.get_kind(obj), LayoutKind::Array);
        self.heap.get_word(obj, ARRLEN_SLOT_IDX)
    }

    /// Reserved-slot accessor (spec §6).
    pub fn set_arr_len(&mut self, obj: ObjectId, len: u64) {
        debug_assert_eq!(self.heap.get_kind(obj), LayoutKind::Array);
        self.heap.set_word(obj, ARRLEN_SLOT_IDX, len);
        self.heap.set_tag(obj, ARRLEN_SLOT_IDX, Tag::Int32);
    }

    /// Generic raw-slot read in the same global slot-index space `get_prop`
    /// uses (spec §6's `get_slot_pair`).
    #[must_use]
    pub fn get_slot_pair(&self, obj: ObjectId, slot: u32) -> ValuePair {
        protocol::get_slot_pair(self, obj, slot)
    }

    /// Generic raw-slot write (spec §6's `set_slot_pair`).
    pub fn set_slot_pair(&mut self, obj: ObjectId, slot: u32, value: ValuePair) {
        protocol::set_slot_pair(self, obj, slot, value);
    }
}
