use std::collections::VecDeque;

use indexmap::IndexSet;
use rustc_hash::FxHashSet;

use crate::flags::{ACC_ABSTRACT, ACC_INTERFACE, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC};
use crate::pool::{ClassId, ClassPool, FieldId, MethodId};

/// Class entity owned by a [`ClassPool`] arena, named by its binary name.
#[derive(Clone, Debug)]
pub struct ClassFile {
    pub id: ClassId,
    pub name: String,
    pub access: u16,
    pub major_version: u16,
    pub minor_version: u16,
    /// Superclass name as declared in the class file.
    pub declared_super: Option<String>,
    /// Interface names as declared in the class file.
    pub declared_interfaces: Vec<String>,
    pub super_class: Option<ClassId>,
    pub sub_classes: IndexSet<ClassId>,
    pub interfaces: IndexSet<ClassId>,
    pub implementers: IndexSet<ClassId>,
    pub methods: Vec<MethodId>,
    pub fields: Vec<FieldId>,
    /// String constants collected from method bodies and field initializers.
    pub strings: Vec<String>,
    /// Methods whose bodies reference this class.
    pub method_type_refs: IndexSet<MethodId>,
    /// Element type, for array entities only.
    pub element_class: Option<ClassId>,
}

impl ClassFile {
    pub fn is_interface(&self) -> bool {
        self.access & ACC_INTERFACE != 0
    }

    pub fn is_array(&self) -> bool {
        self.name.starts_with('[')
    }
}

impl ClassPool {
    /// First method declared on `class` matching name and descriptor.
    pub fn find_method(&self, class: ClassId, name: &str, descriptor: &str) -> Option<MethodId> {
        self.class(class).methods.iter().copied().find(|&id| {
            let method = self.method(id);
            method.name == name && method.descriptor == descriptor
        })
    }

    /// First field declared on `class` matching name and descriptor.
    pub fn find_field(&self, class: ClassId, name: &str, descriptor: &str) -> Option<FieldId> {
        self.class(class).fields.iter().copied().find(|&id| {
            let field = self.field(id);
            field.name == name && field.descriptor == descriptor
        })
    }

    /// Resolve a method reference against `class` the way the VM linker would.
    ///
    /// `to_interface` selects interface dispatch: the superclass chain is then
    /// only consulted one level up, and only for public instance methods.
    pub fn resolve_method(
        &self,
        class: ClassId,
        name: &str,
        descriptor: &str,
        to_interface: bool,
    ) -> Option<MethodId> {
        if !to_interface {
            if let Some(found) = self.find_method(class, name, descriptor) {
                return Some(found);
            }

            let mut current = self.class(class).super_class;
            while let Some(cls) = current {
                if let Some(found) = self.find_method(cls, name, descriptor) {
                    return Some(found);
                }
                current = self.class(cls).super_class;
            }

            self.resolve_interface_method(class, name, descriptor)
        } else {
            if let Some(found) = self.find_method(class, name, descriptor) {
                return Some(found);
            }

            if let Some(super_class) = self.class(class).super_class {
                if let Some(found) = self.find_method(super_class, name, descriptor) {
                    let method = self.method(found);
                    if method.access & (ACC_PUBLIC | ACC_STATIC) == ACC_PUBLIC {
                        return Some(found);
                    }
                }
            }

            self.resolve_interface_method(class, name, descriptor)
        }
    }

    /// Maximally-specific lookup over every interface reachable from `class`
    /// and its superclass chain.
    fn resolve_interface_method(
        &self,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Option<MethodId> {
        let mut queue = VecDeque::new();
        let mut visited = FxHashSet::default();

        let mut current = Some(class);
        while let Some(cls) = current {
            for &interface in &self.class(cls).interfaces {
                if visited.insert(interface) {
                    queue.push_back(interface);
                }
            }
            current = self.class(cls).super_class;
        }

        if queue.is_empty() {
            return None;
        }

        let mut matches: IndexSet<MethodId> = IndexSet::new();
        let mut found_non_abstract = false;

        while let Some(cls) = queue.pop_front() {
            if let Some(found) = self.find_method(cls, name, descriptor) {
                let method = self.method(found);
                if method.access & (ACC_PRIVATE | ACC_STATIC) == 0 {
                    matches.insert(found);
                    if method.access & ACC_ABSTRACT == 0 {
                        found_non_abstract = true;
                    }
                }
            }

            for &interface in &self.class(cls).interfaces {
                if visited.insert(interface) {
                    queue.push_back(interface);
                }
            }
        }

        if matches.is_empty() {
            return None;
        }
        if matches.len() == 1 {
            return matches.first().copied();
        }

        if found_non_abstract {
            matches.retain(|&id| self.method(id).access & ACC_ABSTRACT == 0);
            if matches.len() == 1 {
                return matches.first().copied();
            }
        }

        // Drop any candidate declared by a super-interface of another
        // candidate's owner, in discovery order.
        let mut candidates: Vec<MethodId> = matches.iter().copied().collect();
        let mut index = 0;
        while index < candidates.len() {
            let owner = self.method(candidates[index]).owner;
            let superseded = candidates.iter().enumerate().any(|(other, &id)| {
                other != index && self.has_super_interface(self.method(id).owner, owner)
            });
            if superseded {
                candidates.remove(index);
            } else {
                index += 1;
            }
        }

        if candidates.len() > 1 {
            tracing::trace!(
                name,
                descriptor,
                candidates = candidates.len(),
                "ambiguous interface method, keeping first discovered"
            );
        }

        candidates.first().copied()
    }

    /// True when `target` is a direct or transitive super-interface of `class`.
    fn has_super_interface(&self, class: ClassId, target: ClassId) -> bool {
        let mut queue: VecDeque<ClassId> = self.class(class).interfaces.iter().copied().collect();
        let mut visited: FxHashSet<ClassId> = queue.iter().copied().collect();

        while let Some(cls) = queue.pop_front() {
            if cls == target {
                return true;
            }
            for &interface in &self.class(cls).interfaces {
                if visited.insert(interface) {
                    queue.push_back(interface);
                }
            }
        }

        false
    }

    /// Resolve a field reference against `class`: the class itself, then its
    /// interfaces depth-first, then the superclass chain.
    pub fn resolve_field(&self, class: ClassId, name: &str, descriptor: &str) -> Option<FieldId> {
        if let Some(found) = self.find_field(class, name, descriptor) {
            return Some(found);
        }

        if !self.class(class).interfaces.is_empty() {
            let mut queue: VecDeque<ClassId> =
                self.class(class).interfaces.iter().copied().collect();
            let mut visited: FxHashSet<ClassId> = queue.iter().copied().collect();

            while let Some(cls) = queue.pop_front() {
                if let Some(found) = self.find_field(cls, name, descriptor) {
                    return Some(found);
                }
                for &interface in &self.class(cls).interfaces {
                    if visited.insert(interface) {
                        queue.push_front(interface);
                    }
                }
            }
        }

        let mut current = self.class(class).super_class;
        while let Some(cls) = current {
            if let Some(found) = self.find_field(cls, name, descriptor) {
                return Some(found);
            }
            current = self.class(cls).super_class;
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::ACC_FINAL;
    use crate::ir::{ClassDecl, FieldDecl, MethodDecl};
    use crate::pool::OBJECT_CLASS;

    fn class_decl(
        name: &str,
        super_name: Option<&str>,
        interfaces: &[&str],
        access: u16,
    ) -> ClassDecl {
        ClassDecl {
            name: name.to_string(),
            access,
            major_version: 52,
            minor_version: 0,
            super_name: super_name.map(str::to_string),
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    fn method_decl(name: &str, descriptor: &str, access: u16) -> MethodDecl {
        MethodDecl {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            instructions: Vec::new(),
        }
    }

    fn field_decl(name: &str, descriptor: &str, access: u16) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            value: None,
        }
    }

    fn interface_decl(name: &str, interfaces: &[&str]) -> ClassDecl {
        class_decl(
            name,
            Some(OBJECT_CLASS),
            interfaces,
            ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT,
        )
    }

    #[test]
    fn declared_method_shadows_superclass() {
        let mut pool = ClassPool::new();
        let mut a = class_decl("A", Some(OBJECT_CLASS), &[], ACC_PUBLIC);
        a.methods.push(method_decl("foo", "()V", ACC_PUBLIC));
        let mut b = class_decl("B", Some("A"), &[], ACC_PUBLIC);
        b.methods.push(method_decl("foo", "()V", ACC_PUBLIC));
        pool.add_class(a);
        let b_id = pool.add_class(b);
        pool.init();

        let resolved = pool.resolve_method(b_id, "foo", "()V", false).expect("resolved");
        assert_eq!(pool.method(resolved).owner, b_id);
    }

    #[test]
    fn virtual_dispatch_walks_superclass_chain() {
        let mut pool = ClassPool::new();
        let mut a = class_decl("A", Some(OBJECT_CLASS), &[], ACC_PUBLIC);
        a.methods.push(method_decl("foo", "()V", ACC_PUBLIC));
        let a_id = pool.add_class(a);
        pool.add_class(class_decl("B", Some("A"), &[], ACC_PUBLIC));
        let c_id = pool.add_class(class_decl("C", Some("B"), &[], ACC_PUBLIC));
        pool.init();

        let resolved = pool.resolve_method(c_id, "foo", "()V", false).expect("resolved");
        assert_eq!(pool.method(resolved).owner, a_id);
    }

    #[test]
    fn virtual_dispatch_falls_back_to_interfaces() {
        let mut pool = ClassPool::new();
        let mut i = interface_decl("I", &[]);
        i.methods.push(method_decl("m", "()V", ACC_PUBLIC | ACC_ABSTRACT));
        let i_id = pool.add_class(i);
        let c_id = pool.add_class(class_decl("C", Some(OBJECT_CLASS), &["I"], ACC_PUBLIC));
        pool.init();

        let resolved = pool.resolve_method(c_id, "m", "()V", false).expect("resolved");
        assert_eq!(pool.method(resolved).owner, i_id);
    }

    #[test]
    fn interface_dispatch_checks_only_immediate_superclass() {
        let mut pool = ClassPool::new();
        let mut a = class_decl("A", Some(OBJECT_CLASS), &[], ACC_PUBLIC);
        a.methods.push(method_decl("m", "()V", ACC_PUBLIC));
        pool.add_class(a);
        pool.add_class(class_decl("B", Some("A"), &[], ACC_PUBLIC));
        let c_id = pool.add_class(class_decl("C", Some("B"), &[], ACC_PUBLIC));
        pool.init();

        assert_eq!(pool.resolve_method(c_id, "m", "()V", true), None);
        // The same lookup through virtual dispatch still walks the chain.
        assert!(pool.resolve_method(c_id, "m", "()V", false).is_some());
    }

    #[test]
    fn interface_dispatch_accepts_public_instance_superclass_match() {
        let mut pool = ClassPool::new();
        let mut b = class_decl("B", Some(OBJECT_CLASS), &[], ACC_PUBLIC);
        b.methods.push(method_decl("m", "()V", ACC_PUBLIC | ACC_FINAL));
        let b_id = pool.add_class(b);
        let c_id = pool.add_class(class_decl("C", Some("B"), &[], ACC_PUBLIC));
        pool.init();

        let resolved = pool.resolve_method(c_id, "m", "()V", true).expect("resolved");
        assert_eq!(pool.method(resolved).owner, b_id);
    }

    #[test]
    fn interface_dispatch_rejects_static_and_non_public_superclass_matches() {
        let mut pool = ClassPool::new();
        let mut b = class_decl("B", Some(OBJECT_CLASS), &[], ACC_PUBLIC);
        b.methods.push(method_decl("stat", "()V", ACC_PUBLIC | ACC_STATIC));
        b.methods.push(method_decl("pkg", "()V", 0));
        pool.add_class(b);
        let c_id = pool.add_class(class_decl("C", Some("B"), &[], ACC_PUBLIC));
        pool.init();

        assert_eq!(pool.resolve_method(c_id, "stat", "()V", true), None);
        assert_eq!(pool.resolve_method(c_id, "pkg", "()V", true), None);
    }

    #[test]
    fn interface_resolution_collects_from_whole_super_chain() {
        let mut pool = ClassPool::new();
        let mut i = interface_decl("I", &[]);
        i.methods.push(method_decl("m", "()V", ACC_PUBLIC | ACC_ABSTRACT));
        let i_id = pool.add_class(i);
        pool.add_class(class_decl("A", Some(OBJECT_CLASS), &["I"], ACC_PUBLIC));
        let b_id = pool.add_class(class_decl("B", Some("A"), &[], ACC_PUBLIC));
        pool.init();

        let resolved = pool.resolve_method(b_id, "m", "()V", true).expect("resolved");
        assert_eq!(pool.method(resolved).owner, i_id);
    }

    #[test]
    fn interface_resolution_prefers_non_abstract_candidates() {
        let mut pool = ClassPool::new();
        let mut i1 = interface_decl("I1", &[]);
        i1.methods.push(method_decl("m", "()V", ACC_PUBLIC | ACC_ABSTRACT));
        let mut i2 = interface_decl("I2", &[]);
        i2.methods.push(method_decl("m", "()V", ACC_PUBLIC));
        pool.add_class(i1);
        let i2_id = pool.add_class(i2);
        let c_id = pool.add_class(class_decl("C", Some(OBJECT_CLASS), &["I1", "I2"], ACC_PUBLIC));
        pool.init();

        let resolved = pool.resolve_method(c_id, "m", "()V", true).expect("resolved");
        assert_eq!(pool.method(resolved).owner, i2_id);
    }

    #[test]
    fn diamond_default_methods_pick_first_declared_interface() {
        let mut pool = ClassPool::new();
        let mut i1 = interface_decl("I1", &[]);
        i1.methods.push(method_decl("m", "()V", ACC_PUBLIC));
        let mut i2 = interface_decl("I2", &[]);
        i2.methods.push(method_decl("m", "()V", ACC_PUBLIC));
        let i1_id = pool.add_class(i1);
        pool.add_class(i2);
        let c_id = pool.add_class(class_decl("C", Some(OBJECT_CLASS), &["I1", "I2"], ACC_PUBLIC));
        pool.init();

        let resolved = pool.resolve_method(c_id, "m", "()V", true).expect("resolved");
        assert_eq!(pool.method(resolved).owner, i1_id);
    }

    #[test]
    fn subinterface_declaration_wins_over_superinterface() {
        let mut pool = ClassPool::new();
        let mut i = interface_decl("I", &[]);
        i.methods.push(method_decl("m", "()V", ACC_PUBLIC | ACC_ABSTRACT));
        let mut j = interface_decl("J", &["I"]);
        j.methods.push(method_decl("m", "()V", ACC_PUBLIC | ACC_ABSTRACT));
        pool.add_class(i);
        let j_id = pool.add_class(j);
        let c_id = pool.add_class(class_decl("C", Some(OBJECT_CLASS), &["J"], ACC_PUBLIC));
        pool.init();

        let resolved = pool.resolve_method(c_id, "m", "()V", true).expect("resolved");
        assert_eq!(pool.method(resolved).owner, j_id);
    }

    #[test]
    fn interface_candidates_exclude_static_and_private() {
        let mut pool = ClassPool::new();
        let mut i = interface_decl("I", &[]);
        i.methods.push(method_decl("stat", "()V", ACC_PUBLIC | ACC_STATIC));
        i.methods.push(method_decl("priv", "()V", ACC_PRIVATE));
        pool.add_class(i);
        let c_id = pool.add_class(class_decl("C", Some(OBJECT_CLASS), &["I"], ACC_PUBLIC));
        pool.init();

        assert_eq!(pool.resolve_method(c_id, "stat", "()V", true), None);
        assert_eq!(pool.resolve_method(c_id, "priv", "()V", true), None);
    }

    #[test]
    fn field_resolution_checks_interfaces_before_superclass() {
        let mut pool = ClassPool::new();
        let mut a = class_decl("A", Some(OBJECT_CLASS), &[], ACC_PUBLIC);
        a.fields.push(field_decl("x", "I", ACC_PUBLIC));
        a.fields.push(field_decl("y", "I", ACC_PUBLIC));
        let mut j = interface_decl("J", &[]);
        j.fields.push(field_decl("y", "I", ACC_PUBLIC | ACC_STATIC | ACC_FINAL));
        let a_id = pool.add_class(a);
        let j_id = pool.add_class(j);
        let b_id = pool.add_class(class_decl("B", Some("A"), &["J"], ACC_PUBLIC));
        pool.init();

        let x = pool.resolve_field(b_id, "x", "I").expect("x resolved");
        assert_eq!(pool.field(x).owner, a_id);
        let y = pool.resolve_field(b_id, "y", "I").expect("y resolved");
        assert_eq!(pool.field(y).owner, j_id);
    }

    #[test]
    fn field_search_is_depth_first_over_interfaces() {
        let mut pool = ClassPool::new();
        let mut j = interface_decl("J", &[]);
        j.fields.push(field_decl("f", "I", ACC_PUBLIC | ACC_STATIC | ACC_FINAL));
        let mut i2 = interface_decl("I2", &[]);
        i2.fields.push(field_decl("f", "I", ACC_PUBLIC | ACC_STATIC | ACC_FINAL));
        let j_id = pool.add_class(j);
        pool.add_class(interface_decl("I1", &["J"]));
        pool.add_class(i2);
        let c_id = pool.add_class(class_decl("C", Some(OBJECT_CLASS), &["I1", "I2"], ACC_PUBLIC));
        pool.init();

        let resolved = pool.resolve_field(c_id, "f", "I").expect("resolved");
        assert_eq!(pool.field(resolved).owner, j_id);
    }

    #[test]
    fn field_resolution_ignores_superclass_interfaces() {
        let mut pool = ClassPool::new();
        let mut j = interface_decl("J", &[]);
        j.fields.push(field_decl("f", "I", ACC_PUBLIC | ACC_STATIC | ACC_FINAL));
        pool.add_class(j);
        pool.add_class(class_decl("A", Some(OBJECT_CLASS), &["J"], ACC_PUBLIC));
        let b_id = pool.add_class(class_decl("B", Some("A"), &[], ACC_PUBLIC));
        pool.init();

        assert_eq!(pool.resolve_field(b_id, "f", "I"), None);
    }

    #[test]
    fn missing_member_resolves_to_none() {
        let mut pool = ClassPool::new();
        let c_id = pool.add_class(class_decl("C", Some(OBJECT_CLASS), &[], ACC_PUBLIC));
        pool.init();

        assert_eq!(pool.resolve_method(c_id, "absent", "()V", false), None);
        assert_eq!(pool.resolve_method(c_id, "absent", "()V", true), None);
        assert_eq!(pool.resolve_field(c_id, "absent", "I"), None);
    }
}
