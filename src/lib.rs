//! Static-analysis core for decoded JVM class files: inheritance-hierarchy
//! linking, linker-style member resolution, and reference-graph extraction
//! over an open-world class set.
//!
//! Decoded classes ([`ClassDecl`]) enter a [`ClassPool`]; [`ClassPool::init`]
//! links the hierarchy (loading or synthesizing referenced classes on
//! demand), resolves every symbolic member reference the way the VM linker
//! would, and records call, field-access, type-usage, and
//! override-equivalence relations on the pooled entities. Binary
//! decode/encode and archive traversal stay outside the crate, behind
//! [`ClasspathSource`] and [`ClassPool::export_class`].

pub mod class;
pub mod classpath;
pub mod features;
pub mod flags;
pub mod ir;
pub mod member;
pub mod pool;

pub use class::ClassFile;
pub use classpath::{ClasspathSource, DirectoryClasspath, EmptyClasspath, MemoryClasspath};
pub use features::FeatureProcessor;
pub use ir::{
    CallKind, CallSite, ClassDecl, ConstValue, FieldDecl, FieldKind, FieldSite, Instruction,
    InstructionKind, MethodDecl,
};
pub use member::{Field, Method};
pub use pool::{ClassId, ClassPool, FieldId, MethodId, OverrideSetId, OBJECT_CLASS};
