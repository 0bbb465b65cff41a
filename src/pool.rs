use indexmap::{IndexMap, IndexSet};

use crate::class::ClassFile;
use crate::classpath::{ClasspathSource, EmptyClasspath};
use crate::features::FeatureProcessor;
use crate::flags::ACC_PUBLIC;
use crate::ir::{ClassDecl, FieldDecl, MethodDecl};
use crate::member::{Field, Method};

/// Binary name of the hierarchy root.
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// Format version stamped on synthesized placeholder entities.
const PLACEHOLDER_VERSION: (u16, u16) = (50, 0);

/// Identity of a class entity within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(u32);

impl ClassId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Identity of a method entity within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(u32);

impl MethodId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Identity of a field entity within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(u32);

impl FieldId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Identity of an override-equivalence set within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverrideSetId(u32);

impl OverrideSetId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Arena-owned universe of classes under analysis.
///
/// The pool owns every class, method, and field entity; cross-entity links are
/// ids into the pool, valid for the pool's whole lifetime. Classes split into
/// a primary (analyzed) set and a shared set holding classpath loads and
/// synthesized placeholders.
pub struct ClassPool {
    classes: Vec<ClassFile>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    override_sets: Vec<IndexSet<MethodId>>,
    primary: IndexMap<String, ClassId>,
    shared: IndexMap<String, ClassId>,
    classpath: Box<dyn ClasspathSource>,
    processed: bool,
}

impl ClassPool {
    /// Empty pool with nothing behind missing-class lookups.
    pub fn new() -> Self {
        Self::with_classpath(Box::new(EmptyClasspath))
    }

    /// Empty pool backed by `classpath` for missing-class lookups.
    pub fn with_classpath(classpath: Box<dyn ClasspathSource>) -> Self {
        ClassPool {
            classes: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            override_sets: Vec::new(),
            primary: IndexMap::new(),
            shared: IndexMap::new(),
            classpath,
            processed: false,
        }
    }

    pub fn class(&self, id: ClassId) -> &ClassFile {
        &self.classes[id.index() as usize]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassFile {
        &mut self.classes[id.index() as usize]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index() as usize]
    }

    pub fn method_mut(&mut self, id: MethodId) -> &mut Method {
        &mut self.methods[id.index() as usize]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index() as usize]
    }

    pub fn field_mut(&mut self, id: FieldId) -> &mut Field {
        &mut self.fields[id.index() as usize]
    }

    /// Members of an override-equivalence set.
    pub fn overrides(&self, id: OverrideSetId) -> &IndexSet<MethodId> {
        &self.override_sets[id.index() as usize]
    }

    pub(crate) fn override_set_mut(&mut self, id: OverrideSetId) -> &mut IndexSet<MethodId> {
        &mut self.override_sets[id.index() as usize]
    }

    /// New singleton override set containing just `method`.
    pub(crate) fn alloc_override_set(&mut self, method: MethodId) -> OverrideSetId {
        let id = OverrideSetId::new(self.override_sets.len() as u32);
        let mut members = IndexSet::new();
        members.insert(method);
        self.override_sets.push(members);
        id
    }

    /// Register `decl` in the primary (analyzed) set.
    pub fn add_class(&mut self, decl: ClassDecl) -> ClassId {
        let id = self.intern_class(decl);
        let name = self.class(id).name.clone();
        self.primary.insert(name, id);
        id
    }

    /// Drop `class` from the primary set. The entity itself stays alive and
    /// any links pointing at it remain valid.
    pub fn remove_class(&mut self, class: ClassId) {
        let name = self.class(class).name.clone();
        self.primary.shift_remove(&name);
    }

    /// Register `decl` in the shared (classpath) set.
    pub fn add_shared_class(&mut self, decl: ClassDecl) -> ClassId {
        let id = self.intern_class(decl);
        let name = self.class(id).name.clone();
        self.shared.insert(name, id);
        id
    }

    /// Drop `class` from the shared set.
    pub fn remove_shared_class(&mut self, class: ClassId) {
        let name = self.class(class).name.clone();
        self.shared.shift_remove(&name);
    }

    /// Exact lookup in the primary set.
    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.primary.get(name).copied()
    }

    /// Exact lookup in the shared set.
    pub fn find_shared_class(&self, name: &str) -> Option<ClassId> {
        self.shared.get(name).copied()
    }

    /// Number of primary classes.
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Primary classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassFile> {
        self.primary.values().map(|&id| self.class(id))
    }

    /// First primary class matching `predicate`.
    pub fn find_class_by(&self, predicate: impl Fn(&ClassFile) -> bool) -> Option<&ClassFile> {
        self.classes().find(|&cls| predicate(cls))
    }

    pub(crate) fn primary_ids(&self) -> Vec<ClassId> {
        self.primary.values().copied().collect()
    }

    /// Resolve `name` to a class entity, creating one if needed. Never fails:
    /// names without loadable bytes produce placeholder entities.
    pub fn find_or_create_class(&mut self, name: &str) -> ClassId {
        if let Some(id) = self.find_class(name).or_else(|| self.find_shared_class(name)) {
            return id;
        }

        if name.starts_with('[') {
            let element = self.find_array_class(name);
            let id = self.synthesize_class(name);
            self.class_mut(id).element_class = Some(element);
            return id;
        }

        self.load_missing_class(name)
    }

    /// Make sure the hierarchy root exists before any linking runs.
    pub fn ensure_root(&mut self) -> ClassId {
        self.find_or_create_class(OBJECT_CLASS)
    }

    /// Run hierarchy linking, reference extraction, and override computation
    /// over the current primary set. A second call is a no-op.
    pub fn init(&mut self) {
        if self.processed {
            tracing::debug!("class pool already processed, skipping");
            return;
        }
        self.processed = true;
        FeatureProcessor::new(self).process_all();
    }

    /// Append a method declaration to `class`.
    pub fn add_method(&mut self, class: ClassId, decl: MethodDecl) -> MethodId {
        let id = MethodId::new(self.methods.len() as u32);
        self.methods.push(Method {
            id,
            owner: class,
            name: decl.name,
            descriptor: decl.descriptor,
            access: decl.access,
            instructions: decl.instructions,
            refs_in: IndexSet::new(),
            refs_out: IndexSet::new(),
            field_read_refs: IndexSet::new(),
            field_write_refs: IndexSet::new(),
            class_refs: IndexSet::new(),
            overrides: None,
        });
        self.classes[class.index() as usize].methods.push(id);
        id
    }

    /// Detach a method from its owner's declaration list. The entity stays in
    /// the arena so existing reference edges keep their meaning.
    pub fn remove_method(&mut self, class: ClassId, method: MethodId) {
        self.classes[class.index() as usize]
            .methods
            .retain(|&id| id != method);
    }

    /// Append a field declaration to `class`.
    pub fn add_field(&mut self, class: ClassId, decl: FieldDecl) -> FieldId {
        let id = FieldId::new(self.fields.len() as u32);
        self.fields.push(Field {
            id,
            owner: class,
            name: decl.name,
            descriptor: decl.descriptor,
            access: decl.access,
            value: decl.value,
            read_refs: IndexSet::new(),
            write_refs: IndexSet::new(),
        });
        self.classes[class.index() as usize].fields.push(id);
        id
    }

    /// Detach a field from its owner's declaration list.
    pub fn remove_field(&mut self, class: ClassId, field: FieldId) {
        self.classes[class.index() as usize]
            .fields
            .retain(|&id| id != field);
    }

    /// Hand back the current structural state of `class` for an external
    /// class-file writer. Falls back to declared hierarchy names when no
    /// links have been computed yet.
    pub fn export_class(&self, class: ClassId) -> ClassDecl {
        let cls = self.class(class);

        let super_name = cls
            .super_class
            .map(|id| self.class(id).name.clone())
            .or_else(|| cls.declared_super.clone());
        let interfaces = if cls.interfaces.is_empty() {
            cls.declared_interfaces.clone()
        } else {
            cls.interfaces
                .iter()
                .map(|&id| self.class(id).name.clone())
                .collect()
        };

        ClassDecl {
            name: cls.name.clone(),
            access: cls.access,
            major_version: cls.major_version,
            minor_version: cls.minor_version,
            super_name,
            interfaces,
            methods: cls
                .methods
                .iter()
                .map(|&id| {
                    let method = self.method(id);
                    MethodDecl {
                        name: method.name.clone(),
                        descriptor: method.descriptor.clone(),
                        access: method.access,
                        instructions: method.instructions.clone(),
                    }
                })
                .collect(),
            fields: cls
                .fields
                .iter()
                .map(|&id| {
                    let field = self.field(id);
                    FieldDecl {
                        name: field.name.clone(),
                        descriptor: field.descriptor.clone(),
                        access: field.access,
                        value: field.value.clone(),
                    }
                })
                .collect(),
        }
    }

    fn intern_class(&mut self, decl: ClassDecl) -> ClassId {
        let id = ClassId::new(self.classes.len() as u32);
        let ClassDecl {
            name,
            access,
            major_version,
            minor_version,
            super_name,
            interfaces,
            methods,
            fields,
        } = decl;

        self.classes.push(ClassFile {
            id,
            name,
            access,
            major_version,
            minor_version,
            declared_super: super_name,
            declared_interfaces: interfaces,
            super_class: None,
            sub_classes: IndexSet::new(),
            interfaces: IndexSet::new(),
            implementers: IndexSet::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            strings: Vec::new(),
            method_type_refs: IndexSet::new(),
            element_class: None,
        });

        for method in methods {
            self.add_method(id, method);
        }
        for field in fields {
            self.add_field(id, field);
        }

        id
    }

    /// Element entity for an array name, resolving through all bracket and
    /// `L…;` wrapping.
    fn find_array_class(&mut self, name: &str) -> ClassId {
        let element = name.trim_start_matches('[');
        let element = element
            .strip_prefix('L')
            .and_then(|rest| rest.strip_suffix(';'))
            .unwrap_or(element);
        self.find_or_create_class(element)
    }

    fn load_missing_class(&mut self, name: &str) -> ClassId {
        if name.len() > 1 {
            match self.classpath.load(name) {
                Ok(Some(decl)) => {
                    let declared = decl.name.clone();
                    let id = self.add_shared_class(decl);
                    if declared != name {
                        tracing::warn!(
                            requested = name,
                            found = %declared,
                            "classpath returned a differently named class"
                        );
                        self.shared.insert(name.to_string(), id);
                    }
                    FeatureProcessor::new(self).process_class_a(id);
                    return id;
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(class = name, %error, "classpath lookup failed");
                }
            }
        }

        self.synthesize_class(name)
    }

    /// Register a placeholder entity for a name with no loadable bytes.
    fn synthesize_class(&mut self, name: &str) -> ClassId {
        tracing::debug!(class = name, "synthesizing placeholder class");

        let super_name = if name == OBJECT_CLASS {
            None
        } else {
            Some(OBJECT_CLASS.to_string())
        };
        let id = self.add_shared_class(ClassDecl {
            name: name.to_string(),
            access: ACC_PUBLIC,
            major_version: PLACEHOLDER_VERSION.0,
            minor_version: PLACEHOLDER_VERSION.1,
            super_name,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        });
        FeatureProcessor::new(self).process_class_a(id);
        id
    }
}

impl Default for ClassPool {
    fn default() -> Self {
        Self::new()
    }
}
