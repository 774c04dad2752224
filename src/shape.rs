//! The hidden-class shape tree.
//!
//! A [`ShapeRegistry`] is a process-wide, append-only forest of
//! [`ShapeNode`]s. Children are addressed by [`ShapeId`] rather than by an
//! owning pointer, so the parent edge in a node is a back-reference, not
//! ownership; the registry's `Vec` is the only owner.

use std::collections::HashMap;

use crate::attrs::Attributes;
use crate::value_type::ValueType;

/// A dense, append-only index into a [`ShapeRegistry`].
///
/// Shapes are never removed or reindexed, so a `ShapeId` remains valid for
/// the lifetime of the registry that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u32);

impl ShapeId {
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl Default for ShapeId {
    /// Every registry's root lives at index 0; used as a harmless
    /// placeholder for freshly allocated objects before their real shape is
    /// assigned.
    fn default() -> Self {
        ShapeId(0)
    }
}

/// One edge in the hidden-class tree: a property definition with a parent.
#[derive(Debug, Clone)]
pub struct ShapeNode {
    parent: Option<ShapeId>,
    prop_name: Option<Box<str>>,
    /// `None` only for the root; otherwise the global slot index this
    /// property occupies on every object sharing this shape.
    slot_idx: Option<u32>,
    vtype: ValueType,
    attrs: Attributes,
    transitions: HashMap<Box<str>, HashMap<ValueType, Vec<(Attributes, ShapeId)>>>,
    lookup_cache: HashMap<Box<str>, Option<ShapeId>>,
    enum_table: Option<Vec<Option<(Box<str>, Attributes)>>>,
}

impl ShapeNode {
    fn root() -> Self {
        Self {
            parent: None,
            prop_name: None,
            slot_idx: None,
            vtype: ValueType::ANY,
            attrs: Attributes::EXTENSIBLE,
            transitions: HashMap::new(),
            lookup_cache: HashMap::new(),
            enum_table: None,
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<ShapeId> {
        self.parent
    }

    #[must_use]
    pub fn prop_name(&self) -> Option<&str> {
        self.prop_name.as_deref()
    }

    #[must_use]
    pub fn slot_idx(&self) -> Option<u32> {
        self.slot_idx
    }

    #[must_use]
    pub fn vtype(&self) -> ValueType {
        self.vtype
    }

    #[must_use]
    pub fn attrs(&self) -> Attributes {
        self.attrs
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The VM-wide, append-only registry of shapes.
///
/// Threaded explicitly by callers rather than kept as a global singleton.
pub struct ShapeRegistry {
    nodes: Vec<ShapeNode>,
    root: ShapeId,
    /// Incremented once per shape allocated.
    pub num_shapes: u64,
    /// Incremented once per redefinition triggered by a type mismatch.
    pub num_shape_flips: u64,
    /// Like `num_shape_flips` but counted only for flips on the designated
    /// global object.
    pub num_shape_flips_global: u64,
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![ShapeNode::root()],
            root: ShapeId(0),
            num_shapes: 1,
            num_shape_flips: 0,
            num_shape_flips_global: 0,
        }
    }

    #[must_use]
    pub fn root(&self) -> ShapeId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: ShapeId) -> &ShapeNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: ShapeId) -> &mut ShapeNode {
        &mut self.nodes[id.0 as usize]
    }

    fn push(&mut self, node: ShapeNode) -> ShapeId {
        let id = ShapeId(u32::try_from(self.nodes.len()).expect("shape registry overflowed u32"));
        self.nodes.push(node);
        self.num_shapes += 1;
        id
    }

    /// Define-or-redefine a property named `name` starting from `self_id`.
    ///
    /// Deduplicates via the cached transition table, then either appends a
    /// fresh child (`def_shape == None`) or forks a sibling branch that
    /// preserves every slot index (`def_shape == Some(_)`).
    pub fn def_prop(
        &mut self,
        self_id: ShapeId,
        name: &str,
        vtype: ValueType,
        attrs: Attributes,
        def_shape: Option<ShapeId>,
    ) -> ShapeId {
        if let Some(existing) = self
            .node(self_id)
            .transitions
            .get(name)
            .and_then(|by_type| by_type.get(&vtype))
            .and_then(|candidates| candidates.iter().find(|(a, _)| *a == attrs))
            .map(|(_, id)| *id)
        {
            return existing;
        }

        let new_id = match def_shape {
            None => {
                let slot_idx = Some(self.node(self_id).slot_idx.map_or(0, |s| s + 1));
                self.push(ShapeNode {
                    parent: Some(self_id),
                    prop_name: Some(name.into()),
                    slot_idx,
                    vtype,
                    attrs,
                    transitions: HashMap::new(),
                    lookup_cache: HashMap::new(),
                    enum_table: None,
                })
            }
            Some(def_shape_id) => self.fork_redefinition(self_id, def_shape_id, name, vtype, attrs),
        };

        self.node_mut(self_id)
            .transitions
            .entry(name.into())
            .or_default()
            .entry(vtype)
            .or_default()
            .push((attrs, new_id));

        new_id
    }

    /// Replays every property defined between `self_id` and `def_shape_id`
    /// (exclusive) onto a fresh sibling of `def_shape_id`, preserving every
    /// slot index along the way.
    fn fork_redefinition(
        &mut self,
        self_id: ShapeId,
        def_shape_id: ShapeId,
        name: &str,
        vtype: ValueType,
        attrs: Attributes,
    ) -> ShapeId {
        let mut chain = Vec::new();
        let mut cur = self_id;
        while cur != def_shape_id {
            let node = self.node(cur);
            chain.push((
                node.prop_name
                    .clone()
                    .expect("only the root has no prop_name, and the root can't be a def_shape ancestor here"),
                node.vtype,
                node.attrs,
            ));
            cur = node
                .parent
                .expect("def_shape must be an ancestor of self");
        }

        let def_parent = self
            .node(def_shape_id)
            .parent
            .expect("redefinition target must not be the root");
        let mut fork = self.def_prop(def_parent, name, vtype, attrs, None);
        for (n, t, a) in chain.into_iter().rev() {
            fork = self.def_prop(fork, &n, t, a, None);
        }
        fork
    }

    /// Find the shape that defines `name`, walking from `self_id` toward the
    /// root and caching the result.
    pub fn get_def_shape(&mut self, self_id: ShapeId, name: &str) -> Option<ShapeId> {
        if let Some(cached) = self.node(self_id).lookup_cache.get(name) {
            return *cached;
        }

        let mut cur = Some(self_id);
        let mut found = None;
        while let Some(id) = cur {
            let node = self.node(id);
            if node.prop_name.as_deref() == Some(name) && !node.attrs.contains(Attributes::DELETED)
            {
                found = Some(id);
                break;
            }
            cur = node.parent;
        }

        self.node_mut(self_id)
            .lookup_cache
            .insert(name.into(), found);
        found
    }

    /// Lazily build and memoize the enumeration table for `self_id`: one
    /// slot per property index up to `self_id`'s `slot_idx`, populated only
    /// for enumerable, non-deleted properties.
    pub fn gen_enum_tbl(&mut self, self_id: ShapeId) -> &[Option<(Box<str>, Attributes)>] {
        if self.node(self_id).enum_table.is_none() {
            let len = self.node(self_id).slot_idx.map_or(0, |s| s as usize + 1);
            let mut table = vec![None; len];

            let mut cur = Some(self_id);
            while let Some(id) = cur {
                let node = self.node(id);
                if let (Some(slot), Some(name)) = (node.slot_idx, node.prop_name.as_deref()) {
                    if node.attrs.contains(Attributes::ENUMERABLE)
                        && !node.attrs.contains(Attributes::DELETED)
                        && table[slot as usize].is_none()
                    {
                        table[slot as usize] = Some((Box::from(name), node.attrs));
                    }
                }
                cur = node.parent;
            }

            self.node_mut(self_id).enum_table = Some(table);
        }

        self.node(self_id)
            .enum_table
            .as_deref()
            .expect("just populated above")
    }

    /// Look up `__fptr__` on `shape_id` and return the function identity
    /// recorded in its stored type, if any.
    ///
    /// Used by [`ValueType::prop_type`] to lift closure call-site
    /// specialization across shape transitions.
    pub(crate) fn closure_fptr(&mut self, shape_id: ShapeId) -> Option<crate::value::FunctionRef> {
        let def = self.get_def_shape(shape_id, "__fptr__")?;
        self.node(def).vtype.fptr()
    }
}
