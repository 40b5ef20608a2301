use std::collections::{HashMap, HashSet};
use crate::sema::SemaError;
use crate::sema::tree::{BinOp, ExprKey, ExprKind, Program, UnOp};
use crate::sema::types::Ty;
use crate::util::Counter;

pub fn infer<'s>(program: &mut Program<'s>, counter: &mut Counter) -> Result<(), Vec<SemaError<'s>>> {
    let mut inferer = TypeInferer {
        program,
        counter,
        eqns: Vec::new(),
        tys: HashMap::new(),
        bindings: HashMap::new(),
        members: Vec::new(),
        accesses: Vec::new(),
        errors: Vec::new(),
        failed: false
    };
    inferer.accumulate();
    inferer.unify_all();
    inferer.finish()
}

struct TypeInferer<'p, 'c, 's> {
    program: &'p mut Program<'s>,
    counter: &'c mut Counter,

    // accumulated equalities between expressions, plus direct type facts
    eqns: Vec<(ExprKey, ExprKey)>,
    tys: HashMap<ExprKey, Ty>,
    bindings: HashMap<u32, Ty>,

    // deferred until their source type is known
    members: Vec<ExprKey>,
    accesses: Vec<ExprKey>,

    errors: Vec<SemaError<'s>>,
    failed: bool
}

impl<'p, 'c, 's> TypeInferer<'p, 'c, 's> {
    // Phase 1: walk every function body and record constraints.
    fn accumulate(&mut self) {
        let funcs: Vec<_> = self.program.funcs.keys().collect();
        for fkey in funcs {
            let func = &self.program.funcs[fkey];
            let def_site = func.def_site;
            let sig = func.sig();
            let ret = func.ret.clone();
            let params: Vec<(Option<ExprKey>, Ty)> = func.params.iter().map(|p| (p.reg, p.ty.clone())).collect();
            let body = func.body;

            self.ty(def_site, sig);
            let Some(body) = body else { continue };
            for (reg, ty) in params {
                self.ty(reg.expect("unbound parameter"), ty);
            }
            self.ty(body, ret);

            let mut exprs = Vec::new();
            self.program.walk(body, &mut |e| exprs.push(e));
            for e in exprs {
                self.constrain(e);
            }
        }
    }

    fn constrain(&mut self, e: ExprKey) {
        let loc = self.program.exprs[e].loc;
        match &self.program.exprs[e].kind {
            ExprKind::Number(_) => {
                self.ty(e, Ty::Int { bits: 32 });
            },
            ExprKind::StringLiteral(_) => {
                self.ty(e, Ty::String);
            },
            ExprKind::Unit => {
                self.ty(e, Ty::Void);
            },
            ExprKind::Variable { binding, .. } => {
                let binding = binding.expect("unbound variable in inference");
                self.eqn(e, binding);
            },
            ExprKind::Unary { op: UnOp::Not, sub } => {
                let sub = *sub;
                self.ty(sub, Ty::Bool);
                self.ty(e, Ty::Bool);
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let (op, lhs, rhs) = (*op, *lhs, *rhs);
                match op {
                    BinOp::Add | BinOp::Sub | BinOp::Mul => {
                        self.eqn(e, lhs);
                        self.eqn(e, rhs);
                    },
                    BinOp::Eq | BinOp::Lt => {
                        self.eqn(lhs, rhs);
                        self.ty(e, Ty::Bool);
                    },
                    BinOp::Join => {
                        self.ty(lhs, Ty::String);
                        self.ty(rhs, Ty::String);
                        self.ty(e, Ty::String);
                    },
                    BinOp::Seq => {
                        self.eqn(e, rhs);
                    },
                    BinOp::Assign => {
                        if !self.program.is_mutable(lhs) {
                            self.errors.push(SemaError::AssignToImmutable(loc));
                        }
                        self.eqn(e, lhs);
                        self.eqn(lhs, rhs);
                    },
                    BinOp::Index => {
                        self.ty(rhs, Ty::Int { bits: 32 });
                        self.accesses.push(e);
                    }
                }
            },
            ExprKind::Member { .. } => {
                self.members.push(e);
            },
            ExprKind::Binding { init, reg, body, .. } => {
                let (init, reg, body) = (*init, reg.expect("unbound binding"), *body);
                self.eqn(reg, init);
                self.eqn(e, body);
            },
            ExprKind::FuncDef { body, .. } => {
                let body = *body;
                self.eqn(e, body);
            },
            ExprKind::If { cond, then_do, else_do } => {
                let (cond, then_do, else_do) = (*cond, *then_do, *else_do);
                self.ty(cond, Ty::Bool);
                self.eqn(e, then_do);
                self.eqn(then_do, else_do);
            },
            ExprKind::While { cond, .. } => {
                let cond = *cond;
                self.ty(cond, Ty::Bool);
                self.ty(e, Ty::Void);
            },
            ExprKind::Call { callee, args, .. } => {
                let Some(callee) = *callee else { return };
                let args = args.clone();
                let ExprKind::Func(fkey) = *self.program.kind(callee) else { return };
                let func = &self.program.funcs[fkey];
                let generics = func.generics.clone();
                let mut params: Vec<Ty> = func.params.iter().map(|p| p.ty.clone()).collect();
                let mut ret = func.ret.clone();

                if args.len() != params.len() {
                    self.errors.push(SemaError::ArityMismatch { expected: params.len(), got: args.len(), loc });
                    return;
                }
                if !generics.is_empty() {
                    // a fresh set of unification variables per call site
                    let fresh: HashMap<u32, Ty> = generics.iter().map(|(name, id)| {
                        let fresh_id = self.counter.next();
                        (*id, Ty::Generic { name: name.clone(), id: fresh_id })
                    }).collect();
                    params = params.iter().map(|t| t.subs(&fresh)).collect();
                    ret = ret.subs(&fresh);
                }
                for (arg, param) in args.iter().zip(params) {
                    self.ty(*arg, param);
                }
                self.ty(e, ret);
            },
            ExprKind::Register { source, .. } => {
                let source = *source;
                self.eqn(e, source);
            },
            ExprKind::RegisterFunArg { .. } | ExprKind::Func(_) => {},
            ExprKind::Closure { .. } => unreachable!("closure before lambda lifting"),
            ExprKind::Array { elem, size, default } => {
                let (elem, size, default) = (elem.clone(), *size, *default);
                self.ty(size, Ty::Int { bits: 32 });
                self.ty(default, elem.clone());
                self.ty(e, Ty::Array(Box::new(elem)));
            },
            ExprKind::Constructor { struct_, type_args, args } => {
                let (struct_, type_args, args) = (*struct_, type_args.clone(), args.clone());
                let def = &self.program.structs[struct_];
                let name = def.name.clone();
                let fields: Vec<Ty> = def.fields.iter().map(|(_, t)| t.clone()).collect();
                let map: HashMap<u32, Ty> = def.params.iter().map(|(_, id)| *id)
                    .zip(type_args.iter().cloned()).collect();
                if args.len() != fields.len() {
                    self.errors.push(SemaError::ArityMismatch { expected: fields.len(), got: args.len(), loc });
                    return;
                }
                for (arg, field) in args.iter().zip(fields) {
                    self.ty(*arg, field.subs(&map));
                }
                self.ty(e, Ty::Struct { key: struct_, name, args: type_args });
            }
        }
    }

    fn eqn(&mut self, lhs: ExprKey, rhs: ExprKey) {
        self.eqns.push((lhs, rhs));
    }

    fn ty(&mut self, e: ExprKey, t: Ty) -> bool {
        match self.tys.get(&e).cloned() {
            None => {
                self.tys.insert(e, t);
                true
            },
            Some(existing) => {
                let loc = self.program.exprs[e].loc;
                let a = self.chase(&existing);
                let b = self.chase(&t);
                self.unify(&a, &b, loc)
            }
        }
    }

    // Phase 2: fixed-point union-find over the constraint set, re-running
    // the deferred member/index resolutions whenever anything moved.
    fn unify_all(&mut self) {
        loop {
            let mut progress = false;
            let eqns = self.eqns.clone();
            for (lhs, rhs) in eqns {
                if self.failed {
                    return;
                }
                let a = self.lookup(lhs);
                let b = self.lookup(rhs);
                match (a, b) {
                    (Some(a), Some(b)) => {
                        let loc = self.program.exprs[lhs].loc;
                        progress |= self.unify(&a, &b, loc);
                    },
                    (Some(a), None) => {
                        self.tys.insert(rhs, a);
                        progress = true;
                    },
                    (None, Some(b)) => {
                        self.tys.insert(lhs, b);
                        progress = true;
                    },
                    (None, None) => {}
                }
            }
            progress |= self.resolve_members();
            progress |= self.resolve_accesses();
            if !progress || self.failed {
                return;
            }
        }
    }

    fn lookup(&self, e: ExprKey) -> Option<Ty> {
        self.tys.get(&e).map(|t| self.chase(t))
    }

    fn chase(&self, ty: &Ty) -> Ty {
        match ty {
            Ty::Generic { id, .. } => {
                match self.bindings.get(id) {
                    Some(bound) => self.chase(&bound.clone()),
                    None => ty.clone()
                }
            },
            Ty::Array(elem) => Ty::Array(Box::new(self.chase(elem))),
            Ty::Ptr(inner) => Ty::Ptr(Box::new(self.chase(inner))),
            Ty::Struct { key, name, args } => {
                Ty::Struct { key: *key, name: name.clone(), args: args.iter().map(|t| self.chase(t)).collect() }
            },
            Ty::Function { params, ret } => {
                Ty::Function { params: params.iter().map(|t| self.chase(t)).collect(), ret: Box::new(self.chase(ret)) }
            },
            _ => ty.clone()
        }
    }

    fn unify(&mut self, a: &Ty, b: &Ty, loc: crate::source::Location<'s>) -> bool {
        match (a, b) {
            (Ty::Generic { id: ia, .. }, Ty::Generic { id: ib, .. }) => {
                if ia == ib {
                    return false;
                }
                // deterministic tie-break: the younger variable points at the older
                if ia < ib {
                    self.bindings.insert(*ib, a.clone());
                } else {
                    self.bindings.insert(*ia, b.clone());
                }
                true
            },
            (Ty::Generic { id, .. }, other) | (other, Ty::Generic { id, .. }) => {
                if other.contains_generic(*id) {
                    self.mismatch(a, b, loc);
                    return false;
                }
                self.bindings.insert(*id, other.clone());
                true
            },
            (Ty::Void, Ty::Void) | (Ty::Bool, Ty::Bool) | (Ty::String, Ty::String) => false,
            (Ty::Int { bits: x }, Ty::Int { bits: y }) if x == y => false,
            // String is structurally an Array<Int8>
            (Ty::String, Ty::Array(elem)) | (Ty::Array(elem), Ty::String) => {
                let elem = elem.as_ref().clone();
                self.unify(&elem, &Ty::Int { bits: 8 }, loc)
            },
            (Ty::Array(x), Ty::Array(y)) | (Ty::Ptr(x), Ty::Ptr(y)) => {
                let (x, y) = (x.as_ref().clone(), y.as_ref().clone());
                self.unify(&x, &y, loc)
            },
            (Ty::Struct { key: ka, args: xs, .. }, Ty::Struct { key: kb, args: ys, .. }) => {
                if ka != kb || xs.len() != ys.len() {
                    self.mismatch(a, b, loc);
                    return false;
                }
                let pairs: Vec<_> = xs.iter().cloned().zip(ys.iter().cloned()).collect();
                let mut progress = false;
                for (x, y) in pairs {
                    progress |= self.unify(&x, &y, loc);
                }
                progress
            },
            (Ty::Function { params: xs, ret: xr }, Ty::Function { params: ys, ret: yr }) => {
                if xs.len() != ys.len() {
                    self.mismatch(a, b, loc);
                    return false;
                }
                let pairs: Vec<_> = xs.iter().cloned().zip(ys.iter().cloned()).collect();
                let (xr, yr) = (xr.as_ref().clone(), yr.as_ref().clone());
                let mut progress = false;
                for (x, y) in pairs {
                    progress |= self.unify(&x, &y, loc);
                }
                progress | self.unify(&xr, &yr, loc)
            },
            _ => {
                self.mismatch(a, b, loc);
                false
            }
        }
    }

    fn mismatch(&mut self, a: &Ty, b: &Ty, loc: crate::source::Location<'s>) {
        self.errors.push(SemaError::TypeMismatch { expected: a.render(), got: b.render(), loc });
        self.failed = true;
    }

    // Phase 3: struct projections and array accesses resolve once their
    // source type is known.
    fn resolve_members(&mut self) -> bool {
        let mut progress = false;
        let pending = std::mem::take(&mut self.members);
        for e in pending {
            let loc = self.program.exprs[e].loc;
            let ExprKind::Member { source, field, .. } = &self.program.exprs[e].kind else { unreachable!() };
            let (source, field) = (*source, field.clone());
            let Some(source_ty) = self.lookup(source) else {
                self.members.push(e);
                continue;
            };
            match source_ty {
                Ty::Struct { key, args, name } => {
                    let def = &self.program.structs[key];
                    let Some(index) = def.fields.iter().position(|(n, _)| n == &field) else {
                        self.errors.push(SemaError::UnknownField { field, struct_name: name, loc });
                        continue;
                    };
                    let map: HashMap<u32, Ty> = def.params.iter().map(|(_, id)| *id)
                        .zip(args.iter().cloned()).collect();
                    let field_ty = def.fields[index].1.subs(&map);
                    let ExprKind::Member { index: slot, .. } = &mut self.program.exprs[e].kind else { unreachable!() };
                    *slot = Some(index);
                    self.ty(e, field_ty);
                    progress = true;
                },
                Ty::Generic { .. } => {
                    self.members.push(e);
                },
                _ => {
                    self.errors.push(SemaError::CannotInferMemberType(field, loc));
                }
            }
        }
        progress
    }

    fn resolve_accesses(&mut self) -> bool {
        let mut progress = false;
        let pending = std::mem::take(&mut self.accesses);
        for e in pending {
            let loc = self.program.exprs[e].loc;
            let ExprKind::Binary { op: BinOp::Index, lhs, .. } = &self.program.exprs[e].kind else { unreachable!() };
            let lhs = *lhs;
            let Some(source_ty) = self.lookup(lhs) else {
                self.accesses.push(e);
                continue;
            };
            match source_ty {
                Ty::Array(elem) => {
                    self.ty(e, *elem);
                    progress = true;
                },
                Ty::String => {
                    self.ty(e, Ty::Int { bits: 8 });
                    progress = true;
                },
                Ty::Generic { .. } => {
                    self.accesses.push(e);
                },
                _ => {
                    self.errors.push(SemaError::CannotInferArrayAccess(loc));
                }
            }
        }
        progress
    }

    fn finish(mut self) -> Result<(), Vec<SemaError<'s>>> {
        for e in std::mem::take(&mut self.members) {
            let loc = self.program.exprs[e].loc;
            let ExprKind::Member { field, .. } = &self.program.exprs[e].kind else { unreachable!() };
            self.errors.push(SemaError::CannotInferMemberType(field.clone(), loc));
        }
        for e in std::mem::take(&mut self.accesses) {
            let loc = self.program.exprs[e].loc;
            self.errors.push(SemaError::CannotInferArrayAccess(loc));
        }

        // a declared generic that unified with something concrete was misused
        let funcs: Vec<_> = self.program.funcs.keys().collect();
        for fkey in funcs.iter() {
            let func = &self.program.funcs[*fkey];
            let loc = func.loc;
            for (name, id) in func.generics.clone() {
                if self.bindings.contains_key(&id) {
                    let bound = self.chase(&Ty::Generic { name: name.clone(), id });
                    self.errors.push(SemaError::TypeMismatch { expected: name, got: bound.render(), loc });
                }
            }
        }

        if !self.errors.is_empty() {
            return Err(self.errors);
        }

        // population: write the solved types into the tree, and the
        // functions' now-concrete signatures back into their prototypes
        for (e, t) in self.tys.clone() {
            self.program.exprs[e].ty = Some(self.chase(&t));
        }
        for fkey in funcs.iter() {
            let ret = self.chase(&self.program.funcs[*fkey].ret);
            self.program.funcs[*fkey].ret = ret;
            for i in 0..self.program.funcs[*fkey].params.len() {
                let ty = self.chase(&self.program.funcs[*fkey].params[i].ty);
                self.program.funcs[*fkey].params[i].ty = ty;
            }
        }

        // every expression is typed, generic residue only inside generic bodies
        let declared: HashSet<u32> = self.program.funcs.values()
            .flat_map(|f| f.generics.iter().map(|(_, id)| *id))
            .chain(self.program.structs.values().flat_map(|s| s.params.iter().map(|(_, id)| *id)))
            .collect();
        for fkey in funcs {
            let Some(body) = self.program.funcs[fkey].body else { continue };
            let mut exprs = Vec::new();
            self.program.walk(body, &mut |e| exprs.push(e));
            for e in exprs {
                let loc = self.program.exprs[e].loc;
                match &self.program.exprs[e].ty {
                    None => self.errors.push(SemaError::CouldNotInferType(loc)),
                    Some(t) => {
                        let mut ids = Vec::new();
                        collect_generic_ids(t, &mut ids);
                        if ids.iter().any(|id| !declared.contains(id)) {
                            self.errors.push(SemaError::CouldNotInferType(loc));
                        }
                    }
                }
            }
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

fn collect_generic_ids(ty: &Ty, out: &mut Vec<u32>) {
    match ty {
        Ty::Generic { id, .. } => out.push(*id),
        Ty::Array(elem) => collect_generic_ids(elem, out),
        Ty::Ptr(inner) => collect_generic_ids(inner, out),
        Ty::Struct { args, .. } => {
            for arg in args {
                collect_generic_ids(arg, out);
            }
        },
        Ty::Function { params, ret } => {
            for param in params {
                collect_generic_ids(param, out);
            }
            collect_generic_ids(ret, out);
        },
        _ => {}
    }
}
