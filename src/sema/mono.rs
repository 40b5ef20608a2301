use std::collections::{HashMap, VecDeque};
use crate::emit::{lir, Builder, FunctionBuilder};
use crate::sema::SemaError;
use crate::sema::tree::{BinOp, ExprKey, ExprKind, FuncKey, Program, StructKey, UnOp};
use crate::sema::types::Ty;
use crate::util::map_join;

pub fn monomorphize<'s>(program: &Program<'s>) -> Result<lir::LIR, Vec<SemaError<'s>>> {
    let mono = Monomorphizer {
        program,
        builder: Builder::new(),
        func_instances: HashMap::new(),
        struct_instances: HashMap::new(),
        queue: VecDeque::new(),
        locals: HashMap::new(),
        errors: Vec::new()
    };
    mono.run()
}

enum Queued {
    Function { func: FuncKey, tuple: Vec<Ty>, id: lir::FunctionID },
    Struct { struct_: StructKey, tuple: Vec<Ty>, id: lir::StructID }
}

struct Monomorphizer<'p, 's> {
    program: &'p Program<'s>,
    builder: Builder,

    func_instances: HashMap<FuncKey, HashMap<Vec<Ty>, lir::FunctionID>>,
    struct_instances: HashMap<StructKey, HashMap<Vec<Ty>, lir::StructID>>,
    queue: VecDeque<Queued>,

    locals: HashMap<ExprKey, lir::LocalID>,
    errors: Vec<SemaError<'s>>
}

impl<'p, 's> Monomorphizer<'p, 's> {
    fn run(mut self) -> Result<lir::LIR, Vec<SemaError<'s>>> {
        // seeds: every non-generic top-level function and extern
        let seeds: Vec<FuncKey> = self.program.top_levels.iter().copied()
            .filter(|&fkey| !self.program.funcs[fkey].is_generic())
            .collect();
        for fkey in seeds {
            self.queue_function(fkey, Vec::new());
        }
        if let Some(main) = self.program.main {
            let id = self.queue_function(main, Vec::new());
            self.builder.main_function(id);
        }

        while let Some(queued) = self.queue.pop_front() {
            match queued {
                Queued::Function { func, tuple, id } => self.resolve_function(func, tuple, id),
                Queued::Struct { struct_, tuple, id } => self.resolve_struct(struct_, tuple, id)
            }
            if !self.errors.is_empty() {
                return Err(self.errors);
            }
        }
        Ok(self.builder.finish())
    }

    fn instance_name(name: &str, tuple: &[Ty]) -> String {
        if tuple.is_empty() {
            name.to_owned()
        } else {
            format!("{}<{}>", name, map_join(tuple, Ty::render))
        }
    }

    fn queue_function(&mut self, func: FuncKey, tuple: Vec<Ty>) -> lir::FunctionID {
        debug_assert!(tuple.iter().all(Ty::is_concrete));
        if let Some(id) = self.func_instances.get(&func).and_then(|m| m.get(&tuple)) {
            return *id;
        }
        let proto = &self.program.funcs[func];
        let map: HashMap<u32, Ty> = proto.generics.iter().map(|(_, id)| *id).zip(tuple.iter().cloned()).collect();
        let name = Self::instance_name(&proto.name, &tuple);
        let is_extern = proto.is_extern();
        let param_tys: Vec<Ty> = proto.params.iter().map(|p| p.ty.clone()).collect();
        let ret = proto.ret.clone();

        let id = if is_extern {
            let params = param_tys.iter().map(|t| self.lower_ty(t, &map)).collect();
            let ret = self.lower_ty(&ret, &map);
            self.builder.declare_extern(name, params, ret)
        } else {
            self.builder.declare_function()
        };
        self.func_instances.entry(func).or_default().insert(tuple.clone(), id);
        if !is_extern {
            self.queue.push_back(Queued::Function { func, tuple, id });
        }
        id
    }

    fn resolve_function(&mut self, func: FuncKey, tuple: Vec<Ty>, id: lir::FunctionID) {
        let proto = &self.program.funcs[func];
        let map: HashMap<u32, Ty> = proto.generics.iter().map(|(_, id)| *id).zip(tuple.iter().cloned()).collect();
        let name = Self::instance_name(&proto.name, &tuple);
        let purity = proto.purity;
        let loc = proto.loc;
        let params: Vec<(String, Ty, ExprKey)> = proto.params.iter()
            .map(|p| (p.name.clone(), p.ty.clone(), p.reg.expect("unbound parameter")))
            .collect();
        let ret = proto.ret.clone();
        let body = proto.body.expect("extern queued for resolution");

        for (call, callee, args) in self.find_calls(body) {
            let callee_tuple = self.call_tuple(callee, &args, call, &map);
            if callee == func && callee_tuple != tuple {
                let grows = tuple.iter().zip(&callee_tuple).all(|(t, c)| c.contains(t));
                if grows {
                    let name = self.program.funcs[func].name.clone();
                    self.errors.push(SemaError::UnboundedGenericRecursion(name, loc));
                    return;
                }
            }
            self.queue_function(callee, callee_tuple);
        }
        if !self.errors.is_empty() {
            return;
        }

        self.locals.clear();
        let mut fb = FunctionBuilder::new(name, purity);
        for (param_name, param_ty, reg) in params {
            let ty = self.lower_ty(&param_ty, &map);
            let local = fb.param(param_name, ty);
            self.locals.insert(reg, local);
        }
        let pushed = self.lower_expr(body, &map, &mut fb);
        fb.ret(pushed);
        let ret = self.lower_ty(&ret, &map);
        self.builder.define_function(id, fb, ret);
    }

    fn resolve_struct(&mut self, struct_: StructKey, tuple: Vec<Ty>, id: lir::StructID) {
        let def = &self.program.structs[struct_];
        let name = Self::instance_name(&def.name, &tuple);
        let map: HashMap<u32, Ty> = def.params.iter().map(|(_, id)| *id).zip(tuple.iter().cloned()).collect();
        let fields: Vec<(String, Ty)> = def.fields.clone();
        let fields = fields.into_iter().map(|(n, t)| (n, self.lower_ty(&t, &map))).collect();
        self.builder.define_struct(id, name, fields);
    }

    fn queue_struct(&mut self, struct_: StructKey, tuple: Vec<Ty>) -> lir::StructID {
        if let Some(id) = self.struct_instances.get(&struct_).and_then(|m| m.get(&tuple)) {
            return *id;
        }
        let id = self.builder.declare_struct();
        self.struct_instances.entry(struct_).or_default().insert(tuple.clone(), id);
        self.queue.push_back(Queued::Struct { struct_, tuple, id });
        id
    }

    // Every direct call below `body`, along with its callee and arguments.
    fn find_calls(&self, body: ExprKey) -> Vec<(ExprKey, FuncKey, Vec<ExprKey>)> {
        let mut sites = Vec::new();
        self.program.walk(body, &mut |e| {
            if let ExprKind::Call { callee: Some(callee), args, .. } = self.program.kind(e) {
                let target = match self.program.kind(*callee) {
                    ExprKind::Func(k) => *k,
                    ExprKind::Closure { func, .. } => *func,
                    _ => return
                };
                sites.push((e, target, args.clone()));
            }
        });
        sites
    }

    // The concrete instantiation of the callee's generic parameters, deduced
    // from the site's resolved argument and result types.
    fn call_tuple(&mut self, callee: FuncKey, args: &[ExprKey], call: ExprKey, map: &HashMap<u32, Ty>) -> Vec<Ty> {
        let proto = &self.program.funcs[callee];
        if proto.generics.is_empty() {
            return Vec::new();
        }
        let mut bindings = HashMap::new();
        for (param, &arg) in proto.params.iter().zip(args) {
            let site = self.program.exprs[arg].ty.as_ref().expect("untyped argument").subs(map);
            match_generics(&param.ty, &site, &mut bindings);
        }
        let site_ret = self.program.exprs[call].ty.as_ref().expect("untyped call").subs(map);
        match_generics(&proto.ret, &site_ret, &mut bindings);

        let generics = self.program.funcs[callee].generics.clone();
        let loc = self.program.exprs[call].loc;
        generics.iter()
            .map(|(_, id)| bindings.get(id).cloned().unwrap_or_else(|| {
                self.errors.push(SemaError::CouldNotInferType(loc));
                Ty::Void
            }))
            .collect()
    }

    fn lower_expr(&mut self, e: ExprKey, map: &HashMap<u32, Ty>, fb: &mut FunctionBuilder) -> bool {
        let ty = self.program.exprs[e].ty.as_ref().expect("untyped expression").subs(map);
        match &self.program.exprs[e].kind {
            ExprKind::Number(value) => {
                let value = *value;
                let bits = match ty {
                    Ty::Int { bits } => bits,
                    _ => 32
                };
                fb.load_int(value, bits);
                true
            },
            ExprKind::StringLiteral(value) => {
                let value = value.clone();
                fb.load_string(value);
                true
            },
            ExprKind::Unit => false,
            ExprKind::Variable { binding, .. } => {
                let binding = binding.expect("unbound variable");
                if ty == Ty::Void {
                    false
                } else {
                    fb.load_local(self.locals[&binding]);
                    true
                }
            },
            ExprKind::Unary { op: UnOp::Not, sub } => {
                let sub = *sub;
                self.lower_expr(sub, map, fb);
                fb.not();
                true
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                match op {
                    BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Lt | BinOp::Eq | BinOp::Join => {
                        self.lower_expr(lhs, map, fb);
                        self.lower_expr(rhs, map, fb);
                        match op {
                            BinOp::Add => fb.add(),
                            BinOp::Sub => fb.sub(),
                            BinOp::Mul => fb.mul(),
                            BinOp::Lt => fb.lt(),
                            BinOp::Eq => fb.eq(),
                            BinOp::Join => fb.join_string(),
                            _ => unreachable!()
                        }
                        true
                    },
                    BinOp::Seq => {
                        if self.lower_expr(lhs, map, fb) {
                            fb.pop();
                        }
                        self.lower_expr(rhs, map, fb)
                    },
                    BinOp::Assign => self.lower_assign(lhs, rhs, map, fb),
                    BinOp::Index => {
                        self.lower_expr(lhs, map, fb);
                        self.lower_expr(rhs, map, fb);
                        fb.array_get();
                        true
                    }
                }
            },
            ExprKind::Member { source, index, .. } => {
                let (source, index) = (*source, index.expect("unresolved member"));
                let source_ty = self.program.exprs[source].ty.as_ref().expect("untyped member source").subs(map);
                self.lower_expr(source, map, fb);
                let struct_ = self.struct_id_of(&source_ty);
                fb.get_field(struct_, index);
                true
            },
            ExprKind::Binding { init, reg, body, .. } => {
                let (init, reg, body) = (*init, reg.expect("unbound binding"), *body);
                if self.lower_expr(init, map, fb) {
                    let init_ty = self.program.exprs[init].ty.as_ref().expect("untyped init").subs(map);
                    let local = fb.declare_local(self.lower_ty(&init_ty, map));
                    fb.store_local(local);
                    self.locals.insert(reg, local);
                }
                self.lower_expr(body, map, fb)
            },
            ExprKind::FuncDef { body, .. } => {
                let body = *body;
                self.lower_expr(body, map, fb)
            },
            ExprKind::If { cond, then_do, else_do } => {
                let (cond, then_do, else_do) = (*cond, *then_do, *else_do);
                let void = ty == Ty::Void;
                self.lower_expr(cond, map, fb);
                fb.push_block();
                if self.lower_expr(then_do, map, fb) && void {
                    fb.pop();
                }
                let then_block = fb.pop_block();
                fb.push_block();
                if self.lower_expr(else_do, map, fb) && void {
                    fb.pop();
                }
                let else_block = fb.pop_block();
                let lowered = if void { None } else { Some(self.lower_ty(&ty, map)) };
                fb.if_else(then_block, else_block, lowered);
                !void
            },
            ExprKind::While { cond, body } => {
                let (cond, body) = (*cond, *body);
                fb.push_block();
                self.lower_expr(cond, map, fb);
                let cond_block = fb.pop_block();
                fb.push_block();
                if self.lower_expr(body, map, fb) {
                    fb.pop();
                }
                let body_block = fb.pop_block();
                fb.while_loop(cond_block, body_block);
                false
            },
            ExprKind::Call { callee, args, .. } => {
                let callee = callee.expect("unbound call");
                let args = args.clone();
                let target = match *self.program.kind(callee) {
                    ExprKind::Func(k) => k,
                    ExprKind::Closure { func, .. } => func,
                    _ => panic!("call to non-function")
                };
                for &arg in &args {
                    self.lower_expr(arg, map, fb);
                }
                let tuple = self.call_tuple(target, &args, e, map);
                let id = self.queue_function(target, tuple);
                let returns = ty != Ty::Void;
                fb.call(id, args.len(), returns);
                returns
            },
            ExprKind::Array { elem, size, default } => {
                let (elem, size, default) = (elem.clone(), *size, *default);
                self.lower_expr(size, map, fb);
                self.lower_expr(default, map, fb);
                let lowered = self.lower_ty(&elem, map);
                fb.array_new(lowered);
                true
            },
            ExprKind::Constructor { struct_, type_args, args } => {
                let (struct_, type_args, args) = (*struct_, type_args.clone(), args.clone());
                for &arg in &args {
                    self.lower_expr(arg, map, fb);
                }
                let tuple: Vec<Ty> = type_args.iter().map(|t| t.subs(map)).collect();
                let id = self.queue_struct(struct_, tuple);
                fb.create_struct(id, args.len());
                true
            },
            ExprKind::Register { .. } | ExprKind::RegisterFunArg { .. }
            | ExprKind::Func(_) | ExprKind::Closure { .. } => {
                unreachable!("not a value position")
            }
        }
    }

    fn lower_assign(&mut self, lhs: ExprKey, rhs: ExprKey, map: &HashMap<u32, Ty>, fb: &mut FunctionBuilder) -> bool {
        match &self.program.exprs[lhs].kind {
            ExprKind::Variable { binding, .. } => {
                let binding = binding.expect("unbound variable");
                self.lower_expr(rhs, map, fb);
                fb.dup();
                fb.store_local(self.locals[&binding]);
                true
            },
            ExprKind::Binary { op: BinOp::Index, lhs: source, rhs: index } => {
                let (source, index) = (*source, *index);
                self.lower_expr(source, map, fb);
                self.lower_expr(index, map, fb);
                self.lower_expr(rhs, map, fb);
                fb.array_set();
                true
            },
            ExprKind::Member { source, index, .. } => {
                let (source, index) = (*source, index.expect("unresolved member"));
                let source_ty = self.program.exprs[source].ty.as_ref().expect("untyped member source").subs(map);
                self.lower_expr(source, map, fb);
                self.lower_expr(rhs, map, fb);
                let struct_ = self.struct_id_of(&source_ty);
                fb.set_field(struct_, index);
                true
            },
            _ => panic!("assignment to immutable place")
        }
    }

    fn struct_id_of(&mut self, ty: &Ty) -> lir::StructID {
        let Ty::Struct { key, args, .. } = ty else {
            panic!("expected a struct type, found {}", ty.render())
        };
        self.queue_struct(*key, args.clone())
    }

    fn lower_ty(&mut self, ty: &Ty, map: &HashMap<u32, Ty>) -> lir::Type {
        let ty = ty.subs(map);
        self.lower_concrete(&ty)
    }

    fn lower_concrete(&mut self, ty: &Ty) -> lir::Type {
        match ty {
            Ty::Void => lir::Type::Void,
            Ty::Bool => lir::Type::Bool,
            Ty::Int { bits } => lir::Type::Int(*bits),
            Ty::String => lir::Type::Array(Box::new(lir::Type::Int(8))),
            Ty::Array(elem) => lir::Type::Array(Box::new(self.lower_concrete(elem))),
            Ty::Struct { key, args, .. } => lir::Type::Struct(self.queue_struct(*key, args.clone())),
            Ty::Function { params, ret } => {
                let params = params.iter().map(|t| self.lower_concrete(t)).collect();
                lir::Type::Function(params, Box::new(self.lower_concrete(ret)))
            },
            Ty::Ptr(inner) => lir::Type::Ptr(Box::new(self.lower_concrete(inner))),
            Ty::Generic { name, .. } => panic!("unsubstituted generic parameter {name}")
        }
    }
}

// Structural lock-step walk deriving a binding for each generic parameter
// position in the signature.
pub fn match_generics(sig: &Ty, site: &Ty, out: &mut HashMap<u32, Ty>) {
    match (sig, site) {
        (Ty::Generic { id, .. }, _) => {
            out.entry(*id).or_insert_with(|| site.clone());
        },
        (Ty::Array(a), Ty::Array(b)) => match_generics(a, b, out),
        (Ty::Ptr(a), Ty::Ptr(b)) => match_generics(a, b, out),
        (Ty::Struct { args: xs, .. }, Ty::Struct { args: ys, .. }) => {
            for (x, y) in xs.iter().zip(ys) {
                match_generics(x, y, out);
            }
        },
        (Ty::Function { params: xs, ret: xr }, Ty::Function { params: ys, ret: yr }) => {
            for (x, y) in xs.iter().zip(ys) {
                match_generics(x, y, out);
            }
            match_generics(xr, yr, out);
        },
        _ => {}
    }
}
