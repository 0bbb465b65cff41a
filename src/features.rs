use std::collections::VecDeque;
use std::mem;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::{ConstValue, InstructionKind};
use crate::pool::{ClassId, ClassPool, MethodId, OverrideSetId};

/// Three-phase feature extraction over a class pool: hierarchy linking,
/// reference-graph construction, then override-equivalence computation.
pub struct FeatureProcessor<'p> {
    pool: &'p mut ClassPool,
}

impl<'p> FeatureProcessor<'p> {
    pub fn new(pool: &'p mut ClassPool) -> Self {
        FeatureProcessor { pool }
    }

    /// Run all three phases over the primary set. Each phase finishes over
    /// every class before the next starts: reference extraction needs the
    /// whole hierarchy linked, and override computation needs both.
    pub fn process_all(&mut self) {
        self.pool.ensure_root();

        let linking = self.pool.primary_ids();
        tracing::debug!(classes = linking.len(), "linking class hierarchy");
        for class in linking {
            self.process_class_a(class);
        }

        let extracting = self.pool.primary_ids();
        tracing::debug!(classes = extracting.len(), "extracting reference graph");
        for class in extracting {
            self.process_class_b(class);
        }

        let grouping = self.pool.primary_ids();
        tracing::debug!(classes = grouping.len(), "computing override sets");
        for class in grouping {
            self.process_class_c(class);
        }
    }

    /// Phase A: collect string constants and link the declared hierarchy of
    /// one class, creating superclass and interface entities on demand.
    pub fn process_class_a(&mut self, class: ClassId) {
        for method in self.pool.class(class).methods.clone() {
            let constants: Vec<String> = self
                .pool
                .method(method)
                .instructions
                .iter()
                .filter_map(|insn| match &insn.kind {
                    InstructionKind::ConstString(value) => Some(value.clone()),
                    _ => None,
                })
                .collect();
            self.pool.class_mut(class).strings.extend(constants);
        }

        for field in self.pool.class(class).fields.clone() {
            if let Some(ConstValue::String(value)) = &self.pool.field(field).value {
                let value = value.clone();
                self.pool.class_mut(class).strings.push(value);
            }
        }

        if let Some(super_name) = self.pool.class(class).declared_super.clone() {
            if self.pool.class(class).super_class.is_none() {
                let super_class = self.pool.find_or_create_class(&super_name);
                self.pool.class_mut(class).super_class = Some(super_class);
                self.pool.class_mut(super_class).sub_classes.insert(class);
            }
        }

        for interface_name in self.pool.class(class).declared_interfaces.clone() {
            let interface = self.pool.find_or_create_class(&interface_name);
            if self.pool.class_mut(class).interfaces.insert(interface) {
                self.pool.class_mut(interface).implementers.insert(class);
            }
        }
    }

    /// Phase B: walk every method body and record reference edges.
    fn process_class_b(&mut self, class: ClassId) {
        for method in self.pool.class(class).methods.clone() {
            self.process_method_insns(method);
        }
    }

    fn process_method_insns(&mut self, method: MethodId) {
        let instructions = self.pool.method(method).instructions.clone();
        for insn in &instructions {
            match &insn.kind {
                InstructionKind::Invoke(site) => {
                    let owner = self.pool.find_or_create_class(&site.owner);
                    let Some(target) = self.pool.resolve_method(
                        owner,
                        &site.name,
                        &site.descriptor,
                        site.interface_owner,
                    ) else {
                        continue;
                    };

                    self.pool.method_mut(target).refs_in.insert(method);
                    self.pool.method_mut(method).refs_out.insert(target);

                    let target_owner = self.pool.method(target).owner;
                    self.pool
                        .class_mut(target_owner)
                        .method_type_refs
                        .insert(method);
                    self.pool.method_mut(method).class_refs.insert(target_owner);
                }
                InstructionKind::FieldAccess(site) => {
                    let owner = self.pool.find_or_create_class(&site.owner);
                    let Some(target) =
                        self.pool.resolve_field(owner, &site.name, &site.descriptor)
                    else {
                        continue;
                    };

                    if site.kind.is_read() {
                        self.pool.field_mut(target).read_refs.insert(method);
                        self.pool.method_mut(method).field_read_refs.insert(target);
                    } else {
                        self.pool.field_mut(target).write_refs.insert(method);
                        self.pool.method_mut(method).field_write_refs.insert(target);
                    }

                    let target_owner = self.pool.field(target).owner;
                    self.pool
                        .class_mut(target_owner)
                        .method_type_refs
                        .insert(method);
                    self.pool.method_mut(method).class_refs.insert(target_owner);
                }
                InstructionKind::TypeRef(name) => {
                    let target = self.pool.find_or_create_class(name);
                    self.pool.class_mut(target).method_type_refs.insert(method);
                    self.pool.method_mut(method).class_refs.insert(target);
                }
                InstructionKind::ConstString(_) | InstructionKind::Other(_) => {}
            }
        }
    }

    /// Phase C: group methods into override-equivalence sets by walking the
    /// hierarchy above `class` breadth-first, superclass before interfaces.
    fn process_class_c(&mut self, class: ClassId) {
        let mut seen: FxHashMap<String, MethodId> = FxHashMap::default();
        let mut queue = VecDeque::new();
        let mut visited = FxHashSet::default();

        queue.push_back(class);
        visited.insert(class);

        while let Some(cls) = queue.pop_front() {
            for method in self.pool.class(cls).methods.clone() {
                let signature = self.pool.method(method).signature();

                if self.pool.method(method).is_hierarchy_barrier() {
                    self.override_set(method);
                } else if let Some(&prev) = seen.get(&signature) {
                    self.merge_overrides(method, prev);
                } else {
                    seen.insert(signature, method);
                    self.override_set(method);
                }
            }

            if let Some(super_class) = self.pool.class(cls).super_class {
                if visited.insert(super_class) {
                    queue.push_back(super_class);
                }
            }
            for interface in self.pool.class(cls).interfaces.clone() {
                if visited.insert(interface) {
                    queue.push_back(interface);
                }
            }
        }
    }

    /// Override-set handle for `method`, allocating the singleton on first use.
    fn override_set(&mut self, method: MethodId) -> OverrideSetId {
        if let Some(set) = self.pool.method(method).overrides {
            return set;
        }
        let set = self.pool.alloc_override_set(method);
        self.pool.method_mut(method).overrides = Some(set);
        set
    }

    /// Fold `method` into the override set already recorded for its signature.
    fn merge_overrides(&mut self, method: MethodId, prev: MethodId) {
        let prev_set = self.override_set(prev);
        match self.pool.method(method).overrides {
            None => {
                self.pool.method_mut(method).overrides = Some(prev_set);
                self.pool.override_set_mut(prev_set).insert(method);
            }
            Some(current) if current != prev_set => {
                // Distinct sets from earlier walks: move every member over and
                // repoint it, leaving the old set empty and unreferenced.
                let moved = mem::take(self.pool.override_set_mut(prev_set));
                for member in moved {
                    self.pool.override_set_mut(current).insert(member);
                    self.pool.method_mut(member).overrides = Some(current);
                }
            }
            Some(_) => {}
        }
    }
}
