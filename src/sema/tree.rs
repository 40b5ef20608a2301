use slotmap::{new_key_type, SlotMap};
use crate::parsing::ast::Purity;
use crate::sema::types::Ty;
use crate::source::Location;

new_key_type! {
    pub struct ExprKey;
    pub struct FuncKey;
    pub struct StructKey;
}

pub struct Program<'s> {
    pub name: String,
    pub exprs: SlotMap<ExprKey, Expr<'s>>,
    pub funcs: SlotMap<FuncKey, Func<'s>>,
    pub structs: SlotMap<StructKey, StructDef<'s>>,

    // Top-level functions and externs, in declaration order. Lambda lifting
    // appends the functions it hoists.
    pub top_levels: Vec<FuncKey>,
    pub main: Option<FuncKey>
}

pub struct Expr<'s> {
    pub kind: ExprKind,
    pub ty: Option<Ty>,
    pub loc: Location<'s>
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum UnOp {
    Not
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Eq,
    Lt,
    Join,
    Seq,
    Assign,
    Index
}

#[derive(Debug)]
pub enum ExprKind {
    Number(i64),
    StringLiteral(String),
    Unit,
    Variable { name: String, binding: Option<ExprKey> },
    Unary { op: UnOp, sub: ExprKey },
    Binary { op: BinOp, lhs: ExprKey, rhs: ExprKey },
    Member { source: ExprKey, field: String, index: Option<usize> },
    Binding { name: String, mutable: bool, init: ExprKey, reg: Option<ExprKey>, body: ExprKey },
    FuncDef { def_site: ExprKey, body: ExprKey },
    If { cond: ExprKey, then_do: ExprKey, else_do: ExprKey },
    While { cond: ExprKey, body: ExprKey },
    Call { callee_name: String, callee: Option<ExprKey>, args: Vec<ExprKey> },
    Register { name: String, source: ExprKey, mutable: bool },
    RegisterFunArg { name: String },
    Func(FuncKey),
    Closure { func: FuncKey, captured: Vec<(String, ExprKey)> },
    Array { elem: Ty, size: ExprKey, default: ExprKey },
    Constructor { struct_: StructKey, type_args: Vec<Ty>, args: Vec<ExprKey> }
}

impl ExprKind {
    // Ownership edges only; back-references (variable bindings, call
    // callees, closure funcs, register sources) are not children.
    pub fn children(&self) -> Vec<ExprKey> {
        match self {
            ExprKind::Number(_) | ExprKind::StringLiteral(_) | ExprKind::Unit
            | ExprKind::Variable { .. } | ExprKind::RegisterFunArg { .. }
            | ExprKind::Func(_) | ExprKind::Register { .. } | ExprKind::Closure { .. } => vec![],
            ExprKind::Unary { sub, .. } => vec![*sub],
            ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            ExprKind::Member { source, .. } => vec![*source],
            ExprKind::Binding { init, body, .. } => vec![*init, *body],
            ExprKind::FuncDef { def_site, body } => vec![*def_site, *body],
            ExprKind::If { cond, then_do, else_do } => vec![*cond, *then_do, *else_do],
            ExprKind::While { cond, body } => vec![*cond, *body],
            ExprKind::Call { args, .. } => args.clone(),
            ExprKind::Array { size, default, .. } => vec![*size, *default],
            ExprKind::Constructor { args, .. } => args.clone()
        }
    }
}

pub struct Func<'s> {
    pub name: String,
    pub purity: Purity,
    pub generics: Vec<(String, u32)>,
    pub params: Vec<Param>,
    pub ret: Ty,
    pub body: Option<ExprKey>,
    pub def_site: ExprKey,
    pub loc: Location<'s>
}

impl Func<'_> {
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    pub fn is_extern(&self) -> bool {
        self.body.is_none()
    }

    pub fn sig(&self) -> Ty {
        Ty::Function {
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
            ret: Box::new(self.ret.clone())
        }
    }
}

pub struct Param {
    pub name: String,
    pub ty: Ty,
    pub reg: Option<ExprKey>
}

pub struct StructDef<'s> {
    pub name: String,
    pub params: Vec<(String, u32)>,
    pub fields: Vec<(String, Ty)>,
    pub loc: Location<'s>
}

impl<'s> Program<'s> {
    pub fn new(name: String) -> Program<'s> {
        Program {
            name,
            exprs: SlotMap::with_key(),
            funcs: SlotMap::with_key(),
            structs: SlotMap::with_key(),
            top_levels: Vec::new(),
            main: None
        }
    }

    pub fn alloc(&mut self, kind: ExprKind, loc: Location<'s>) -> ExprKey {
        self.exprs.insert(Expr { kind, ty: None, loc })
    }

    pub fn kind(&self, key: ExprKey) -> &ExprKind {
        &self.exprs[key].kind
    }

    pub fn is_mutable(&self, key: ExprKey) -> bool {
        match &self.exprs[key].kind {
            ExprKind::Variable { binding: Some(binding), .. } => self.is_mutable(*binding),
            ExprKind::Register { mutable, .. } => *mutable,
            ExprKind::Binary { op: BinOp::Index, .. } => true,
            ExprKind::Member { .. } => true,
            _ => false
        }
    }

    // Every expression of the subtree rooted at `root`, preorder.
    pub fn walk(&self, root: ExprKey, visit: &mut impl FnMut(ExprKey)) {
        visit(root);
        for child in self.exprs[root].kind.children() {
            self.walk(child, visit);
        }
    }
}
