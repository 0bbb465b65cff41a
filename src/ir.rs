/// Decoded form of one class file, as produced by an external class-file reader.
#[derive(Clone, Debug)]
pub struct ClassDecl {
    pub name: String,
    pub access: u16,
    pub major_version: u16,
    pub minor_version: u16,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodDecl>,
    pub fields: Vec<FieldDecl>,
}

/// Decoded method declaration plus the analysis view of its body.
#[derive(Clone, Debug)]
pub struct MethodDecl {
    pub name: String,
    pub descriptor: String,
    pub access: u16,
    pub instructions: Vec<Instruction>,
}

/// Decoded field declaration.
#[derive(Clone, Debug)]
pub struct FieldDecl {
    pub name: String,
    pub descriptor: String,
    pub access: u16,
    pub value: Option<ConstValue>,
}

/// Constant-pool value attached to a field declaration.
#[derive(Clone, Debug)]
pub enum ConstValue {
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

/// Bytecode instruction captured for analysis.
#[derive(Clone, Debug)]
pub struct Instruction {
    pub offset: u32,
    pub kind: InstructionKind,
}

/// Instruction kinds needed for reference-graph construction.
#[derive(Clone, Debug)]
pub enum InstructionKind {
    Invoke(CallSite),
    FieldAccess(FieldSite),
    /// Cast, instance check, instantiation, or array creation naming a class.
    TypeRef(String),
    ConstString(String),
    Other(u8),
}

/// Call site extracted from an invoke instruction.
#[derive(Clone, Debug)]
pub struct CallSite {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub kind: CallKind,
    /// True when the reference came through an interface-method constant.
    pub interface_owner: bool,
}

/// Invoke opcode classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum CallKind {
    Virtual,
    Interface,
    Special,
    Static,
}

/// Field access site extracted from a get/put instruction.
#[derive(Clone, Debug)]
pub struct FieldSite {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub kind: FieldKind,
}

/// Field opcode classification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum FieldKind {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

impl FieldKind {
    /// True for the load side of a field access.
    pub fn is_read(self) -> bool {
        matches!(self, FieldKind::GetStatic | FieldKind::GetField)
    }
}
