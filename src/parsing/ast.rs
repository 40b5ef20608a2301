use std::path::PathBuf;
use crate::source::{HasLoc, Location};

#[derive(Debug, Eq, PartialEq)]
pub struct AST<'a> {
    pub name: String,
    pub files: Vec<File<'a>>
}

impl<'a> AST<'a> {
    pub fn from_files(name: String, files: Vec<File<'a>>) -> AST<'a> {
        AST { name, files }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct File<'a> {
    pub path: PathBuf,
    pub top_levels: Vec<TopLevel<'a>>
}

#[derive(Debug, Eq, PartialEq)]
pub enum TopLevel<'a> {
    Function(Function<'a>),
    Extern(Extern<'a>),
    Struct(Struct<'a>)
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Purity {
    Pure,
    Impure,
    Sealed,
    FunIO
}

#[derive(Debug, Eq, PartialEq)]
pub struct Function<'a> {
    pub name: String,
    pub purity: Purity,
    pub type_parameters: Vec<TypeParameter<'a>>,
    pub parameters: Vec<Parameter<'a>>,
    pub return_type: Option<Box<Type<'a>>>,
    pub body: Block<'a>,
    pub loc: Location<'a>
}

#[derive(Debug, Eq, PartialEq)]
pub struct Extern<'a> {
    pub name: String,
    pub parameter_types: Vec<Type<'a>>,
    pub return_type: Box<Type<'a>>,
    pub loc: Location<'a>
}

#[derive(Debug, Eq, PartialEq)]
pub struct Struct<'a> {
    pub name: String,
    pub type_parameters: Vec<TypeParameter<'a>>,
    pub fields: Vec<Field<'a>>,
    pub loc: Location<'a>
}

#[derive(Debug, Eq, PartialEq)]
pub struct Field<'a> {
    pub name: String,
    pub typ: Box<Type<'a>>,
    pub loc: Location<'a>
}

#[derive(Debug, Eq, PartialEq)]
pub struct TypeParameter<'a> {
    pub name: String,
    pub loc: Location<'a>
}

#[derive(Debug, Eq, PartialEq)]
pub struct Parameter<'a> {
    pub name: String,
    pub typ: Option<Box<Type<'a>>>,
    pub loc: Location<'a>
}

#[derive(Debug, Eq, PartialEq)]
pub struct Block<'a> {
    pub items: Vec<BlockItem<'a>>,
    pub loc: Location<'a>
}

#[derive(Debug, Eq, PartialEq)]
pub enum BlockItem<'a> {
    Binding { name: String, mutable: bool, value: Box<Expr<'a>>, loc: Location<'a> },
    Func(Function<'a>),
    Expr(Expr<'a>)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Eq,
    Lt,
    Join
}

#[derive(Debug, Eq, PartialEq)]
pub enum Expr<'a> {
    Number { value: i64, loc: Location<'a> },
    StringLiteral { value: String, loc: Location<'a> },
    Name { name: String, loc: Location<'a> },
    Not { sub: Box<Expr<'a>>, loc: Location<'a> },
    BinOp { left: Box<Expr<'a>>, op: BinOp, right: Box<Expr<'a>>, loc: Location<'a> },
    Assign { target: Box<Expr<'a>>, value: Box<Expr<'a>>, loc: Location<'a> },
    Index { source: Box<Expr<'a>>, index: Box<Expr<'a>>, loc: Location<'a> },
    Member { source: Box<Expr<'a>>, field: String, loc: Location<'a> },
    Call { callee: String, arguments: Vec<Expr<'a>>, loc: Location<'a> },
    If { cond: Box<Expr<'a>>, then_do: Box<Expr<'a>>, else_do: Box<Expr<'a>>, loc: Location<'a> },
    While { cond: Box<Expr<'a>>, body: Box<Expr<'a>>, loc: Location<'a> },
    Block(Block<'a>),
    NewStruct { name: String, type_args: Vec<Type<'a>>, arguments: Vec<Expr<'a>>, loc: Location<'a> },
    NewArray { element: Box<Type<'a>>, size: Box<Expr<'a>>, default: Box<Expr<'a>>, loc: Location<'a> }
}

impl<'a> HasLoc<'a> for Expr<'a> {
    fn loc(&self) -> Location<'a> {
        match self {
            Expr::Number { loc, .. } => *loc,
            Expr::StringLiteral { loc, .. } => *loc,
            Expr::Name { loc, .. } => *loc,
            Expr::Not { loc, .. } => *loc,
            Expr::BinOp { loc, .. } => *loc,
            Expr::Assign { loc, .. } => *loc,
            Expr::Index { loc, .. } => *loc,
            Expr::Member { loc, .. } => *loc,
            Expr::Call { loc, .. } => *loc,
            Expr::If { loc, .. } => *loc,
            Expr::While { loc, .. } => *loc,
            Expr::Block(Block { loc, .. }) => *loc,
            Expr::NewStruct { loc, .. } => *loc,
            Expr::NewArray { loc, .. } => *loc
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum Type<'a> {
    Name { name: String, loc: Location<'a> },
    Parameterized { name: String, args: Vec<Type<'a>>, loc: Location<'a> },
    Function { parameters: Vec<Type<'a>>, ret: Box<Type<'a>>, loc: Location<'a> }
}

impl<'a> HasLoc<'a> for Type<'a> {
    fn loc(&self) -> Location<'a> {
        match self {
            Type::Name { loc, .. } => *loc,
            Type::Parameterized { loc, .. } => *loc,
            Type::Function { loc, .. } => *loc
        }
    }
}
