use indexmap::IndexSet;

use crate::flags::{ACC_ABSTRACT, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC};
use crate::ir::{ConstValue, Instruction};
use crate::pool::{ClassId, FieldId, MethodId, OverrideSetId};

/// Method entity owned by a [`ClassPool`](crate::pool::ClassPool) arena.
#[derive(Clone, Debug)]
pub struct Method {
    pub id: MethodId,
    pub owner: ClassId,
    pub name: String,
    pub descriptor: String,
    pub access: u16,
    pub instructions: Vec<Instruction>,
    /// Methods that call this one.
    pub refs_in: IndexSet<MethodId>,
    /// Methods this one calls.
    pub refs_out: IndexSet<MethodId>,
    /// Fields this method reads.
    pub field_read_refs: IndexSet<FieldId>,
    /// Fields this method writes.
    pub field_write_refs: IndexSet<FieldId>,
    /// Classes referenced from this method's body.
    pub class_refs: IndexSet<ClassId>,
    /// Override-equivalence set, shared with every method in the same virtual slot.
    pub overrides: Option<OverrideSetId>,
}

impl Method {
    /// Name and descriptor joined into the signature key, e.g. `foo()V`.
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }

    pub fn is_public(&self) -> bool {
        self.access & ACC_PUBLIC != 0
    }

    pub fn is_static(&self) -> bool {
        self.access & ACC_STATIC != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access & ACC_ABSTRACT != 0
    }

    /// Private and static methods never participate in overriding.
    pub fn is_hierarchy_barrier(&self) -> bool {
        self.access & (ACC_PRIVATE | ACC_STATIC) != 0
    }
}

/// Field entity owned by a [`ClassPool`](crate::pool::ClassPool) arena.
#[derive(Clone, Debug)]
pub struct Field {
    pub id: FieldId,
    pub owner: ClassId,
    pub name: String,
    pub descriptor: String,
    pub access: u16,
    /// Constant initializer, when the declaration carried one.
    pub value: Option<ConstValue>,
    /// Methods that read this field.
    pub read_refs: IndexSet<MethodId>,
    /// Methods that write this field.
    pub write_refs: IndexSet<MethodId>,
}

impl Field {
    pub fn is_static(&self) -> bool {
        self.access & ACC_STATIC != 0
    }
}
