use std::collections::HashMap;
use crate::parsing::ast;
use crate::sema::SemaError;
use crate::sema::tree::{BinOp, ExprKind, Func, FuncKey, Param, Program, StructDef, StructKey, UnOp};
use crate::sema::types::Ty;
use crate::source::{HasLoc, Location};
use crate::util::Counter;

pub fn declare<'s>(ast: &ast::AST<'s>, counter: &mut Counter) -> Result<Program<'s>, Vec<SemaError<'s>>> {
    let mut declarer = Declarer {
        program: Program::new(ast.name.clone()),
        struct_names: HashMap::new(),
        func_names: HashMap::new(),
        counter,
        errors: Vec::new()
    };

    declarer.collect_struct_prototypes(ast);
    declarer.collect_struct_fields(ast);
    let protos = declarer.collect_function_prototypes(ast);
    declarer.collect_function_bodies(protos);

    if declarer.errors.is_empty() {
        Ok(declarer.program)
    } else {
        Err(declarer.errors)
    }
}

struct Declarer<'c, 's> {
    program: Program<'s>,
    struct_names: HashMap<String, StructKey>,
    func_names: HashMap<String, Location<'s>>,
    counter: &'c mut Counter,
    errors: Vec<SemaError<'s>>
}

impl<'c, 's> Declarer<'c, 's> {
    fn collect_struct_prototypes(&mut self, ast: &ast::AST<'s>) {
        for file in &ast.files {
            for top in &file.top_levels {
                let ast::TopLevel::Struct(struct_) = top else { continue };
                if let Some(&prev) = self.struct_names.get(&struct_.name) {
                    let prev_loc = self.program.structs[prev].loc;
                    self.errors.push(SemaError::Duplicate(struct_.name.clone(), struct_.loc, prev_loc));
                    continue;
                }
                let params = struct_.type_parameters.iter()
                    .map(|tp| (tp.name.clone(), self.counter.next()))
                    .collect();
                let key = self.program.structs.insert(StructDef {
                    name: struct_.name.clone(),
                    params,
                    fields: Vec::new(),
                    loc: struct_.loc
                });
                self.struct_names.insert(struct_.name.clone(), key);
            }
        }
    }

    fn collect_struct_fields(&mut self, ast: &ast::AST<'s>) {
        for file in &ast.files {
            for top in &file.top_levels {
                let ast::TopLevel::Struct(struct_) = top else { continue };
                let Some(&key) = self.struct_names.get(&struct_.name) else { continue };
                let generics: HashMap<String, u32> = self.program.structs[key].params.iter().cloned().collect();
                let mut fields: Vec<(String, Ty)> = Vec::new();
                for field in &struct_.fields {
                    if fields.iter().any(|(name, _)| name == &field.name) {
                        self.errors.push(SemaError::Duplicate(field.name.clone(), field.loc, struct_.loc));
                        continue;
                    }
                    let ty = self.resolve_type(&field.typ, &generics);
                    fields.push((field.name.clone(), ty));
                }
                self.program.structs[key].fields = fields;
            }
        }
    }

    fn collect_function_prototypes<'x>(&mut self, ast: &'x ast::AST<'s>) -> Vec<(FuncKey, &'x ast::Function<'s>)> {
        let mut protos = Vec::new();
        for file in &ast.files {
            for top in &file.top_levels {
                match top {
                    ast::TopLevel::Function(function) => {
                        if self.check_duplicate_function(&function.name, function.loc) {
                            continue;
                        }
                        let key = self.declare_function_prototype(function, &HashMap::new());
                        self.program.top_levels.push(key);
                        if function.name == "main" && function.type_parameters.is_empty() {
                            self.program.main = Some(key);
                        }
                        protos.push((key, function));
                    },
                    ast::TopLevel::Extern(extern_) => {
                        if self.check_duplicate_function(&extern_.name, extern_.loc) {
                            continue;
                        }
                        let no_generics = HashMap::new();
                        let params = extern_.parameter_types.iter().enumerate()
                            .map(|(i, t)| Param { name: format!("${i}"), ty: self.resolve_type(t, &no_generics), reg: None })
                            .collect();
                        let ret = self.resolve_type(&extern_.return_type, &no_generics);
                        let key = self.program.funcs.insert(Func {
                            name: extern_.name.clone(),
                            purity: ast::Purity::Impure,
                            generics: Vec::new(),
                            params,
                            ret,
                            body: None,
                            def_site: Default::default(),
                            loc: extern_.loc
                        });
                        let def_site = self.program.alloc(ExprKind::Func(key), extern_.loc);
                        self.program.funcs[key].def_site = def_site;
                        self.program.top_levels.push(key);
                    },
                    ast::TopLevel::Struct(_) => {}
                }
            }
        }
        protos
    }

    fn check_duplicate_function(&mut self, name: &str, loc: Location<'s>) -> bool {
        if let Some(&prev) = self.func_names.get(name) {
            self.errors.push(SemaError::Duplicate(name.to_owned(), loc, prev));
            return true;
        }
        self.func_names.insert(name.to_owned(), loc);
        false
    }

    fn declare_function_prototype(&mut self, function: &ast::Function<'s>, enclosing_generics: &HashMap<String, u32>) -> FuncKey {
        let mut generics_env = enclosing_generics.clone();
        let mut generics = Vec::new();
        for tp in &function.type_parameters {
            let id = self.counter.next();
            generics.push((tp.name.clone(), id));
            generics_env.insert(tp.name.clone(), id);
        }
        let params = function.parameters.iter().map(|p| {
            let ty = match &p.typ {
                Some(t) => self.resolve_type(t, &generics_env),
                None => self.fresh_var()
            };
            Param { name: p.name.clone(), ty, reg: None }
        }).collect();
        let ret = match &function.return_type {
            Some(t) => self.resolve_type(t, &generics_env),
            None => self.fresh_var()
        };
        let key = self.program.funcs.insert(Func {
            name: function.name.clone(),
            purity: function.purity,
            generics,
            params,
            ret,
            body: None,
            def_site: Default::default(),
            loc: function.loc
        });
        let def_site = self.program.alloc(ExprKind::Func(key), function.loc);
        self.program.funcs[key].def_site = def_site;
        key
    }

    fn collect_function_bodies<'x>(&mut self, protos: Vec<(FuncKey, &'x ast::Function<'s>)>) {
        for (key, function) in protos {
            let generics_env: HashMap<String, u32> = self.program.funcs[key].generics.iter().cloned().collect();
            let body = self.lower_block(&function.body, &generics_env);
            self.program.funcs[key].body = Some(body);
        }
    }

    // A nested def declares and lowers in one step; it is only visible to
    // the rest of the block anyway.
    fn declare_nested_function(&mut self, function: &ast::Function<'s>, enclosing_generics: &HashMap<String, u32>) -> FuncKey {
        let key = self.declare_function_prototype(function, enclosing_generics);
        let mut generics_env = enclosing_generics.clone();
        generics_env.extend(self.program.funcs[key].generics.iter().cloned());
        let body = self.lower_block(&function.body, &generics_env);
        self.program.funcs[key].body = Some(body);
        key
    }

    fn lower_block(&mut self, block: &ast::Block<'s>, generics: &HashMap<String, u32>) -> crate::sema::tree::ExprKey {
        self.lower_items(&block.items, block.loc, generics)
    }

    fn lower_items(&mut self, items: &[ast::BlockItem<'s>], loc: Location<'s>, generics: &HashMap<String, u32>) -> crate::sema::tree::ExprKey {
        let Some((first, rest)) = items.split_first() else {
            return self.program.alloc(ExprKind::Unit, loc);
        };
        match first {
            ast::BlockItem::Binding { name, mutable, value, loc: binding_loc } => {
                let init = self.lower_expr(value, generics);
                let body = if rest.is_empty() {
                    // the block's value is the freshly bound one
                    self.program.alloc(ExprKind::Variable { name: name.clone(), binding: None }, *binding_loc)
                } else {
                    self.lower_items(rest, loc, generics)
                };
                self.program.alloc(ExprKind::Binding {
                    name: name.clone(), mutable: *mutable, init, reg: None, body
                }, *binding_loc)
            },
            ast::BlockItem::Func(function) => {
                let key = self.declare_nested_function(function, generics);
                let def_site = self.program.funcs[key].def_site;
                let body = if rest.is_empty() {
                    self.program.alloc(ExprKind::Unit, loc)
                } else {
                    self.lower_items(rest, loc, generics)
                };
                self.program.alloc(ExprKind::FuncDef { def_site, body }, function.loc)
            },
            ast::BlockItem::Expr(expr) => {
                let head = self.lower_expr(expr, generics);
                if rest.is_empty() {
                    head
                } else {
                    let tail = self.lower_items(rest, loc, generics);
                    self.program.alloc(ExprKind::Binary { op: BinOp::Seq, lhs: head, rhs: tail }, expr.loc())
                }
            }
        }
    }

    fn lower_expr(&mut self, expr: &ast::Expr<'s>, generics: &HashMap<String, u32>) -> crate::sema::tree::ExprKey {
        let loc = expr.loc();
        let kind = match expr {
            ast::Expr::Number { value, .. } => ExprKind::Number(*value),
            ast::Expr::StringLiteral { value, .. } => ExprKind::StringLiteral(value.clone()),
            ast::Expr::Name { name, .. } => ExprKind::Variable { name: name.clone(), binding: None },
            ast::Expr::Not { sub, .. } => {
                let sub = self.lower_expr(sub, generics);
                ExprKind::Unary { op: UnOp::Not, sub }
            },
            ast::Expr::BinOp { left, op, right, .. } => {
                let lhs = self.lower_expr(left, generics);
                let rhs = self.lower_expr(right, generics);
                let op = match op {
                    ast::BinOp::Add => BinOp::Add,
                    ast::BinOp::Sub => BinOp::Sub,
                    ast::BinOp::Mul => BinOp::Mul,
                    ast::BinOp::Eq => BinOp::Eq,
                    ast::BinOp::Lt => BinOp::Lt,
                    ast::BinOp::Join => BinOp::Join
                };
                ExprKind::Binary { op, lhs, rhs }
            },
            ast::Expr::Assign { target, value, .. } => {
                let lhs = self.lower_expr(target, generics);
                let rhs = self.lower_expr(value, generics);
                ExprKind::Binary { op: BinOp::Assign, lhs, rhs }
            },
            ast::Expr::Index { source, index, .. } => {
                let lhs = self.lower_expr(source, generics);
                let rhs = self.lower_expr(index, generics);
                ExprKind::Binary { op: BinOp::Index, lhs, rhs }
            },
            ast::Expr::Member { source, field, .. } => {
                let source = self.lower_expr(source, generics);
                ExprKind::Member { source, field: field.clone(), index: None }
            },
            ast::Expr::Call { callee, arguments, .. } => {
                let args = arguments.iter().map(|a| self.lower_expr(a, generics)).collect();
                ExprKind::Call { callee_name: callee.clone(), callee: None, args }
            },
            ast::Expr::If { cond, then_do, else_do, .. } => {
                let cond = self.lower_expr(cond, generics);
                let then_do = self.lower_expr(then_do, generics);
                let else_do = self.lower_expr(else_do, generics);
                ExprKind::If { cond, then_do, else_do }
            },
            ast::Expr::While { cond, body, .. } => {
                let cond = self.lower_expr(cond, generics);
                let body = self.lower_expr(body, generics);
                ExprKind::While { cond, body }
            },
            ast::Expr::Block(block) => return self.lower_block(block, generics),
            ast::Expr::NewStruct { name, type_args, arguments, .. } => {
                let args = arguments.iter().map(|a| self.lower_expr(a, generics)).collect();
                let type_args: Vec<Ty> = type_args.iter().map(|t| self.resolve_type(t, generics)).collect();
                let Some(&key) = self.struct_names.get(name) else {
                    self.errors.push(SemaError::UnknownType(name.clone(), loc));
                    return self.program.alloc(ExprKind::Unit, loc);
                };
                let expected = self.program.structs[key].params.len();
                if expected != type_args.len() {
                    self.errors.push(SemaError::MismatchedTypeArguments { expected, got: type_args.len(), loc });
                }
                ExprKind::Constructor { struct_: key, type_args, args }
            },
            ast::Expr::NewArray { element, size, default, .. } => {
                let elem = self.resolve_type(element, generics);
                let size = self.lower_expr(size, generics);
                let default = self.lower_expr(default, generics);
                ExprKind::Array { elem, size, default }
            }
        };
        self.program.alloc(kind, loc)
    }

    fn fresh_var(&mut self) -> Ty {
        let id = self.counter.next();
        Ty::Generic { name: format!("?{id}"), id }
    }

    // Builtins take precedence, then the enclosing generic parameters,
    // then user structs.
    fn resolve_type(&mut self, typ: &ast::Type<'s>, generics: &HashMap<String, u32>) -> Ty {
        match typ {
            ast::Type::Name { name, loc } => {
                if let Some(ty) = Ty::builtin(name) {
                    return ty.clone();
                }
                if let Some(&id) = generics.get(name) {
                    return Ty::Generic { name: name.clone(), id };
                }
                if let Some(&key) = self.struct_names.get(name) {
                    let expected = self.program.structs[key].params.len();
                    if expected != 0 {
                        self.errors.push(SemaError::MismatchedTypeArguments { expected, got: 0, loc: *loc });
                        return Ty::Void;
                    }
                    return Ty::Struct { key, name: name.clone(), args: vec![] };
                }
                self.errors.push(SemaError::UnknownType(name.clone(), *loc));
                Ty::Void
            },
            ast::Type::Parameterized { name, args, loc } => {
                let args: Vec<Ty> = args.iter().map(|a| self.resolve_type(a, generics)).collect();
                match name.as_str() {
                    "Array" | "Ptr" => {
                        if args.len() != 1 {
                            self.errors.push(SemaError::MismatchedTypeArguments { expected: 1, got: args.len(), loc: *loc });
                            return Ty::Void;
                        }
                        let inner = Box::new(args.into_iter().next().unwrap());
                        if name == "Array" { Ty::Array(inner) } else { Ty::Ptr(inner) }
                    },
                    _ => {
                        let Some(&key) = self.struct_names.get(name) else {
                            self.errors.push(SemaError::UnknownType(name.clone(), *loc));
                            return Ty::Void;
                        };
                        let expected = self.program.structs[key].params.len();
                        if expected != args.len() {
                            self.errors.push(SemaError::MismatchedTypeArguments { expected, got: args.len(), loc: *loc });
                            return Ty::Void;
                        }
                        Ty::Struct { key, name: name.clone(), args }
                    }
                }
            },
            ast::Type::Function { parameters, ret, .. } => {
                let params = parameters.iter().map(|p| self.resolve_type(p, generics)).collect();
                let ret = Box::new(self.resolve_type(ret, generics));
                Ty::Function { params, ret }
            }
        }
    }
}
