use shapevm_core::{protocol, Attributes, Tag, ValuePair, VmContext};

/// Builds a small prototype chain and checks that shape forks triggered by
/// type changes, attribute redefinitions, and extension growth don't
/// disturb properties they don't touch.
#[test]
fn object_lifecycle_across_prototype_chain_and_reshapes() {
    let mut ctx = VmContext::new();

    let base = ctx.new_obj(ValuePair::NULL);
    assert!(protocol::def_const(
        &mut ctx,
        base,
        "VERSION",
        ValuePair::new(1, Tag::Int32),
        true,
    ));
    assert!(protocol::set_prop(&mut ctx, base, "name", ValuePair::new(0, Tag::String)));

    let child = ctx.new_obj(ValuePair::from_object(base, Tag::Object));
    assert_eq!(protocol::get_prop(&mut ctx, child, "VERSION").word, 1);

    // Redefining a constant through the normal `set` path is rejected; the
    // inherited value is unaffected.
    assert!(!protocol::set_prop(&mut ctx, base, "VERSION", ValuePair::new(2, Tag::Int32)));
    assert_eq!(protocol::get_prop(&mut ctx, child, "VERSION").word, 1);

    // A type change on `child`'s own "name" forks its shape but must not
    // perturb `base`'s.
    let base_shape_before = ctx.get_shape(base);
    assert!(protocol::set_prop(&mut ctx, child, "name", ValuePair::new(99, Tag::Int32)));
    assert_eq!(ctx.get_shape(base), base_shape_before);
    assert_eq!(protocol::get_prop(&mut ctx, child, "name").tag, Tag::Int32);
    assert_eq!(protocol::get_prop(&mut ctx, base, "name").tag, Tag::String);

    // Push `child` well past its inline capacity; every property, old and
    // new, must still read back correctly afterward.
    for i in 0..32u64 {
        let key = format!("extra{i}");
        assert!(protocol::set_prop(&mut ctx, child, &key, ValuePair::new(i, Tag::Int32)));
    }
    for i in 0..32u64 {
        let key = format!("extra{i}");
        assert_eq!(protocol::get_prop(&mut ctx, child, &key).word, i);
    }
    assert_eq!(protocol::get_prop(&mut ctx, child, "VERSION").word, 1);

    // Looking up an undefined name anywhere on the chain yields `undefined`,
    // not a panic, even past a null-terminated prototype link.
    assert_eq!(protocol::get_prop(&mut ctx, child, "nonexistent").tag, Tag::Undefined);
}

/// Closures and arrays carry their reserved slots through the same shape
/// machinery as plain objects; function identity and array bookkeeping
/// must round-trip independently of whatever else has been defined.
#[test]
fn closures_and_arrays_carry_reserved_slots_through_reshapes() {
    let mut ctx = VmContext::new();
    let f = ctx.functions.register();
    let clos = ctx.new_clos(ValuePair::NULL, 1, f);
    assert_eq!(ctx.get_fun_ptr(clos), f);

    assert!(protocol::set_prop(&mut ctx, clos, "captured", ValuePair::new(7, Tag::Int32)));
    assert_eq!(ctx.get_fun_ptr(clos), f);
    assert_eq!(protocol::get_prop(&mut ctx, clos, "captured").word, 7);

    let arr = ctx.new_arr(ValuePair::NULL);
    ctx.set_arr_len(arr, 3);
    ctx.set_arr_tbl(arr, ValuePair::new(0x1234, Tag::RefPtr));
    assert!(protocol::set_prop(&mut ctx, arr, "label", ValuePair::new(5, Tag::Int32)));
    assert_eq!(ctx.get_arr_len(arr), 3);
    assert_eq!(ctx.get_arr_tbl(arr).word, 0x1234);
}

/// A non-extensible object rejects new properties but keeps answering for
/// ones it already has, and the shape-flip counters track only genuine
/// type-driven redefinitions.
#[test]
fn extensibility_and_shape_flip_accounting() {
    let mut ctx = VmContext::new();
    let o = ctx.new_obj(ValuePair::NULL);
    assert!(protocol::set_prop(&mut ctx, o, "x", ValuePair::new(1, Tag::Int32)));

    let shape = ctx.get_shape(o);
    let def_x = ctx.shapes.get_def_shape(shape, "x").unwrap();
    let writable_not_extensible = Attributes::WRITABLE | Attributes::ENUMERABLE;
    protocol::set_prop_attrs(&mut ctx, o, def_x, writable_not_extensible);

    assert!(!protocol::set_prop(&mut ctx, o, "y", ValuePair::new(2, Tag::Int32)));
    assert_eq!(protocol::get_prop(&mut ctx, o, "x").word, 1);
    assert_eq!(ctx.shapes.num_shape_flips, 0);

    assert!(protocol::set_prop(&mut ctx, o, "x", ValuePair::new(42, Tag::Int32)));
    assert_eq!(ctx.shapes.num_shape_flips, 0, "writing the same tag is not a flip");
    assert_eq!(protocol::get_prop(&mut ctx, o, "x").word, 42);
}
