use indexmap::IndexMap;
use crate::parsing::ast::Purity;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionID(pub(super) usize);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct StructID(pub(super) usize);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct LocalID(pub(super) usize);

impl LocalID {
    pub fn render(&self) -> String {
        format!("%{}", self.0)
    }
}

#[derive(Debug)]
pub struct LIR {
    pub functions: IndexMap<FunctionID, Function>,
    pub externs: IndexMap<FunctionID, Extern>,
    pub structs: IndexMap<StructID, Struct>,
    pub main_function: Option<FunctionID>
}

impl LIR {
    pub fn function_name(&self, id: FunctionID) -> &str {
        if let Some(function) = self.functions.get(&id) {
            &function.name
        } else {
            &self.externs[&id].name
        }
    }
}

#[derive(Debug)]
pub struct Function {
    pub id: FunctionID,
    pub name: String,
    pub purity: Purity,
    pub params: Vec<(String, Type, LocalID)>,
    pub ret: Type,
    pub body: Vec<Instruction>
}

#[derive(Debug)]
pub struct Extern {
    pub id: FunctionID,
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type
}

#[derive(Debug)]
pub struct Struct {
    pub id: StructID,
    pub name: String,
    pub fields: Vec<(String, Type)>
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Type {
    Void,
    Bool,
    Int(u8),
    // runtime-sized: a length followed by inline element storage
    Array(Box<Type>),
    Struct(StructID),
    Function(Vec<Type>, Box<Type>),
    Ptr(Box<Type>)
}

// A stack machine: every value-producing instruction pushes one value.
// StoreLocal pops; ArraySet and SetField leave the stored value pushed so
// assignment has a value.
#[derive(Clone, Debug)]
pub enum Instruction {
    LoadInt(i64, u8),
    LoadString(String),
    Not,
    Add,
    Sub,
    Mul,
    Lt,
    Eq,
    JoinString,
    Dup,
    Pop,
    DeclareLocal(LocalID, Type),
    LoadLocal(LocalID),
    StoreLocal(LocalID),
    Call(FunctionID, usize),
    CallVoid(FunctionID, usize),
    CreateStruct(StructID, usize),
    GetField(StructID, usize),
    SetField(StructID, usize),
    ArrayNew(Type),
    ArrayGet,
    ArraySet,
    IfElse { then_do: Vec<Instruction>, else_do: Vec<Instruction>, ty: Option<Type> },
    While { cond: Vec<Instruction>, body: Vec<Instruction> },
    Return,
    ReturnVoid
}
