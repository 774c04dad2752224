//! The property access protocol: `get` / `set` / `define-const` /
//! `set-attributes`, including the prototype walk and the inline/extension
//! slot routing shared by every entry point.

use crate::attrs::Attributes;
use crate::context::VmContext;
use crate::shape::ShapeId;
use crate::value::{ObjectId, Tag, ValuePair};
use crate::value_type::ValueType;

const PROTO_NAME: &str = "__proto__";

/// Read the value at `name` on `obj`, walking the prototype chain on a miss.
/// Returns [`ValuePair::UNDEFINED`] if nothing defines `name` anywhere up
/// the chain.
#[must_use]
pub fn get_prop(ctx: &mut VmContext, obj: ObjectId, name: &str) -> ValuePair {
    let shape_id = ctx.heap.get_shape_idx(obj);
    match ctx.shapes.get_def_shape(shape_id, name) {
        Some(def) => {
            let slot = ctx
                .shapes
                .node(def)
                .slot_idx()
                .expect("a defined property always has a slot");
            get_slot_pair(ctx, obj, slot)
        }
        None => {
            let proto = get_prop(ctx, obj, PROTO_NAME);
            if proto.tag == Tag::Null {
                ValuePair::UNDEFINED
            } else {
                get_prop(ctx, proto.as_object_id(), name)
            }
        }
    }
}

/// Define or overwrite `name` on `obj` with the default attribute set.
pub fn set_prop(ctx: &mut VmContext, obj: ObjectId, name: &str, value: ValuePair) -> bool {
    set_prop_with_attrs(ctx, obj, name, value, Attributes::DEFAULT)
}

/// Full form of `set_prop`, taking the attributes a brand-new definition
/// should receive.
pub fn set_prop_with_attrs(
    ctx: &mut VmContext,
    obj: ObjectId,
    name: &str,
    value: ValuePair,
    def_attrs: Attributes,
) -> bool {
    let vt = ValueType::from_value(ctx, value).prop_type(
        &mut ctx.shapes,
        ctx.config.shape_notagspec,
        ctx.config.shape_nofptrspec,
    );

    let shape_id = ctx.heap.get_shape_idx(obj);
    let def = match ctx.shapes.get_def_shape(shape_id, name) {
        None => {
            if !ctx.shapes.node(shape_id).attrs().contains(Attributes::EXTENSIBLE) {
                return false;
            }
            let d = ctx.shapes.def_prop(shape_id, name, vt, def_attrs, None);
            ctx.heap.set_shape_idx(obj, d);
            d
        }
        Some(d) => {
            if !ctx.shapes.node(d).attrs().contains(Attributes::WRITABLE) {
                return false;
            }
            if !vt.is_subtype(ctx.shapes.node(d).vtype()) {
                ctx.shapes.num_shape_flips += 1;
                if ctx.global_object == Some(obj) {
                    ctx.shapes.num_shape_flips_global += 1;
                }
                let forked = ctx.shapes.def_prop(shape_id, name, vt, def_attrs, Some(d));
                ctx.heap.set_shape_idx(obj, forked);
                ctx.shapes
                    .get_def_shape(forked, name)
                    .expect("just defined on the fork")
            } else {
                d
            }
        }
    };

    let slot = ctx
        .shapes
        .node(def)
        .slot_idx()
        .expect("a defined property always has a slot");
    set_slot_pair(ctx, obj, slot, value);
    true
}

/// Define `name` as a constant: fails if `name` is already defined
/// anywhere up `obj`'s own shape chain.
pub fn def_const(
    ctx: &mut VmContext,
    obj: ObjectId,
    name: &str,
    value: ValuePair,
    enumerable: bool,
) -> bool {
    let shape_id = ctx.heap.get_shape_idx(obj);
    if ctx.shapes.get_def_shape(shape_id, name).is_some() {
        return false;
    }
    let attrs = if enumerable {
        Attributes::CONST_ENUM
    } else {
        Attributes::CONST_NOT_ENUM
    };
    set_prop_with_attrs(ctx, obj, name, value, attrs)
}

/// Install a redefinition of `def_shape` on `obj` with new attributes, type
/// and name unchanged.
pub fn set_prop_attrs(
    ctx: &mut VmContext,
    obj: ObjectId,
    def_shape: ShapeId,
    attrs: Attributes,
) -> ShapeId {
    let shape_id = ctx.heap.get_shape_idx(obj);
    let name = ctx
        .shapes
        .node(def_shape)
        .prop_name()
        .expect("cannot change attributes of the root")
        .to_owned();
    let vtype = ctx.shapes.node(def_shape).vtype();
    let new_shape = ctx
        .shapes
        .def_prop(shape_id, &name, vtype, attrs, Some(def_shape));
    ctx.heap.set_shape_idx(obj, new_shape);
    new_shape
}

/// Read the global slot `slot` on `obj`, routing to the overflow extension
/// if `slot` falls outside `obj`'s inline capacity. The extension's slot
/// indices share the same global index space as the inline vector.
#[must_use]
pub fn get_slot_pair(ctx: &VmContext, obj: ObjectId, slot: u32) -> ValuePair {
    let cap = ctx.heap.get_cap(obj);
    if slot < cap {
        ValuePair::new(ctx.heap.get_word(obj, slot), ctx.heap.get_tag(obj, slot))
    } else {
        let ext = ctx
            .heap
            .get_next(obj)
            .expect("a slot beyond capacity requires an extension to already exist");
        let local = slot - cap;
        ValuePair::new(ctx.heap.get_word(ext, local), ctx.heap.get_tag(ext, local))
    }
}

/// Write the global slot `slot` on `obj`, growing the overflow extension as
/// needed.
pub fn set_slot_pair(ctx: &mut VmContext, obj: ObjectId, slot: u32, value: ValuePair) {
    let cap = ctx.heap.get_cap(obj);
    if slot < cap {
        ctx.heap.set_word(obj, slot, value.word);
        ctx.heap.set_tag(obj, slot, value.tag);
        return;
    }
    let ext = extend_for(ctx, obj, slot);
    let local = slot - cap;
    ctx.heap.set_word(ext, local, value.word);
    ctx.heap.set_tag(ext, local, value.tag);
}

/// Ensure `obj` has an extension table large enough to hold global index
/// `slot`, growing it (by doubling) as many times as needed, and return
/// that extension's id.
///
/// Resolves the §9 Open Question on extension growth: each regrowth copies
/// exactly the old extension's valid local slots (`0..old_cap`) into the
/// new extension at identical local offsets; the inline vector is never
/// touched, since it lives in `obj` itself.
fn extend_for(ctx: &mut VmContext, obj: ObjectId, slot: u32) -> ObjectId {
    let cap = ctx.heap.get_cap(obj);
    debug_assert!(slot >= cap, "extend_for called for an inline slot");

    if ctx.heap.get_next(obj).is_none() {
        let kind = ctx.heap.get_kind(obj);
        let initial_cap = cap.checked_mul(2).expect("capacity overflowed u32");
        let ext = ctx.heap.alloc(kind, initial_cap, 0);
        ctx.heap.set_next(obj, Some(ext));
    }

    loop {
        let ext = ctx.heap.get_next(obj).expect("just ensured above");
        let local = slot - cap;
        let ext_cap = ctx.heap.get_cap(ext);
        if local < ext_cap {
            return ext;
        }

        let kind = ctx.heap.get_kind(ext);
        let new_cap = ext_cap.checked_mul(2).expect("capacity overflowed u32");
        let new_ext = ctx.heap.alloc(kind, new_cap, 0);
        for i in 0..ext_cap {
            ctx.heap.set_word(new_ext, i, ctx.heap.get_word(ext, i));
            ctx.heap.set_tag(new_ext, i, ctx.heap.get_tag(ext, i));
        }
        ctx.heap.set_next(obj, Some(new_ext));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VmContext;
    use crate::value::Tag;

    #[test]
    fn scenario_growth_beyond_inline_capacity() {
        let mut ctx = VmContext::new();
        let o = ctx.new_obj_with_cap(ValuePair::NULL, 8);
        for i in 0..20u64 {
            let name = format!("p{i}");
            assert!(set_prop(&mut ctx, o, &name, ValuePair::new(i, Tag::Int32)));
        }
        for i in 0..20u64 {
            let name = format!("p{i}");
            let v = get_prop(&mut ctx, o, &name);
            assert_eq!(v.word, i);
            assert_eq!(v.tag, Tag::Int32);
        }
        assert!(ctx.heap.get_next(o).is_some());
    }

    #[test]
    fn scenario_type_flip_preserves_slot_and_counts_once() {
        let mut ctx = VmContext::new();
        let o = ctx.new_obj(ValuePair::NULL);
        assert!(set_prop(&mut ctx, o, "x", ValuePair::new(1, Tag::Int32)));
        let shape_after_first = ctx.heap.get_shape_idx(o);

        assert!(set_prop(&mut ctx, o, "x", ValuePair::new(0xdead, Tag::String)));
        let shape_after_second = ctx.heap.get_shape_idx(o);

        assert_ne!(shape_after_first, shape_after_second);
        assert_eq!(ctx.shapes.num_shape_flips, 1);

        let v = get_prop(&mut ctx, o, "x");
        assert_eq!(v.tag, Tag::String);
        assert_eq!(v.word, 0xdead);
    }

    #[test]
    fn scenario_prototype_walk() {
        let mut ctx = VmContext::new();
        let p = ctx.new_obj(ValuePair::NULL);
        assert!(set_prop(&mut ctx, p, "k", ValuePair::new(42, Tag::Int32)));

        let o = ctx.new_obj(ValuePair::from_object(p, Tag::Object));
        assert_eq!(get_prop(&mut ctx, o, "k").word, 42);

        assert!(set_prop(&mut ctx, o, "k", ValuePair::new(7, Tag::Int32)));
        assert_eq!(get_prop(&mut ctx, o, "k").word, 7);
        assert_eq!(get_prop(&mut ctx, p, "k").word, 42);
    }

    #[test]
    fn scenario_non_extensible_rejection() {
        let mut ctx = VmContext::new();
        let o = ctx.new_obj(ValuePair::NULL);
        // `o`'s current shape is the definition of `__proto__`, its only
        // property so far; redefining it without the EXTENSIBLE bit makes
        // the object as a whole reject new properties (spec §4.4 step 3).
        let cur_shape = ctx.heap.get_shape_idx(o);
        set_prop_attrs(&mut ctx, o, cur_shape, Attributes::empty());

        assert!(!set_prop(&mut ctx, o, "new", ValuePair::new(1, Tag::Int32)));
        assert_eq!(get_prop(&mut ctx, o, "new").tag, Tag::Undefined);
    }

    #[test]
    fn scenario_const_redefinition_rejected() {
        let mut ctx = VmContext::new();
        let o = ctx.new_obj(ValuePair::NULL);
        assert!(def_const(&mut ctx, o, "PI", ValuePair::new(3, Tag::Int32), true));
        assert!(!set_prop(&mut ctx, o, "PI", ValuePair::new(4, Tag::Int32)));
        assert_eq!(get_prop(&mut ctx, o, "PI").word, 3);
    }

    #[test]
    fn scenario_enum_table() {
        let mut ctx = VmContext::new();
        let o = ctx.new_obj(ValuePair::NULL);
        assert!(set_prop(&mut ctx, o, "a", ValuePair::new(1, Tag::Int32)));
        assert!(set_prop_with_attrs(
            &mut ctx,
            o,
            "b",
            ValuePair::new(2, Tag::Int32),
            Attributes::DEFAULT & !Attributes::ENUMERABLE
        ));
        assert!(set_prop(&mut ctx, o, "c", ValuePair::new(3, Tag::Int32)));

        let shape = ctx.heap.get_shape_idx(o);
        let a_slot = ctx.shapes.get_def_shape(shape, "a").unwrap();
        let b_slot = ctx.shapes.get_def_shape(shape, "b").unwrap();
        let c_slot = ctx.shapes.get_def_shape(shape, "c").unwrap();
        let a_idx = ctx.shapes.node(a_slot).slot_idx().unwrap() as usize;
        let b_idx = ctx.shapes.node(b_slot).slot_idx().unwrap() as usize;
        let c_idx = ctx.shapes.node(c_slot).slot_idx().unwrap() as usize;

        let table = ctx.shapes.gen_enum_tbl(shape).to_vec();
        assert_eq!(table[a_idx].as_ref().unwrap().0.as_ref(), "a");
        assert!(table[b_idx].is_none());
        assert_eq!(table[c_idx].as_ref().unwrap().0.as_ref(), "c");
    }

    #[test]
    fn name_stability_survives_intervening_allocations() {
        let mut ctx = VmContext::new();
        let o = ctx.new_obj(ValuePair::NULL);
        let transient = String::from("transient-name");
        assert!(set_prop(&mut ctx, o, &transient, ValuePair::new(99, Tag::Int32)));
        drop(transient);

        // Allocate a bunch of unrelated objects to perturb the heap.
        for _ in 0..16 {
            let _ = ctx.new_obj(ValuePair::NULL);
        }

        let name_copy = String::from("transient-name");
        assert_eq!(get_prop(&mut ctx, o, &name_copy).word, 99);
    }
}
