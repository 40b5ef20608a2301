use std::collections::HashMap;
use crate::parsing::ast::Purity;
use crate::sema::SemaError;
use crate::sema::tree::{ExprKey, ExprKind, FuncKey, Program};

pub fn bind<'s>(program: &mut Program<'s>) -> Result<(), Vec<SemaError<'s>>> {
    let mut globals = HashMap::new();
    for &fkey in &program.top_levels {
        let func = &program.funcs[fkey];
        globals.insert(func.name.clone(), func.def_site);
    }

    let mut binder = Binder { program, errors: Vec::new() };
    let top_levels = binder.program.top_levels.clone();
    for fkey in top_levels {
        if binder.program.funcs[fkey].body.is_some() {
            binder.bind_func(fkey, &mut globals.clone());
        }
    }

    if binder.errors.is_empty() {
        Ok(())
    } else {
        Err(binder.errors)
    }
}

struct Binder<'p, 's> {
    program: &'p mut Program<'s>,
    errors: Vec<SemaError<'s>>
}

impl<'p, 's> Binder<'p, 's> {
    fn bind_func(&mut self, fkey: FuncKey, env: &mut HashMap<String, ExprKey>) {
        let func = &self.program.funcs[fkey];
        let purity = func.purity;
        let body = func.body.expect("extern in bind_func");
        let loc = func.loc;
        let param_names: Vec<String> = func.params.iter().map(|p| p.name.clone()).collect();

        let mut shadowed = Vec::new();
        for (i, name) in param_names.into_iter().enumerate() {
            let reg = self.program.alloc(ExprKind::RegisterFunArg { name: name.clone() }, loc);
            self.program.funcs[fkey].params[i].reg = Some(reg);
            shadowed.push((name.clone(), env.insert(name, reg)));
        }
        self.bind_expr(body, env, purity);
        self.restore(env, shadowed);
    }

    fn restore(&mut self, env: &mut HashMap<String, ExprKey>, shadowed: Vec<(String, Option<ExprKey>)>) {
        for (name, prev) in shadowed.into_iter().rev() {
            match prev {
                Some(key) => { env.insert(name, key); },
                None => { env.remove(&name); }
            }
        }
    }

    fn bind_expr(&mut self, e: ExprKey, env: &mut HashMap<String, ExprKey>, purity: Purity) {
        let loc = self.program.exprs[e].loc;
        match &self.program.exprs[e].kind {
            ExprKind::Variable { name, .. } => {
                let name = name.clone();
                let Some(&def) = env.get(&name) else {
                    self.errors.push(SemaError::UnboundName(name, loc));
                    return;
                };
                if matches!(self.program.kind(def), ExprKind::Func(_)) {
                    self.errors.push(SemaError::NotAValue(name, loc));
                    return;
                }
                let ExprKind::Variable { binding, .. } = &mut self.program.exprs[e].kind else { unreachable!() };
                *binding = Some(def);
            },
            ExprKind::Binding { name, mutable, init, body, .. } => {
                let (name, mutable, init, body) = (name.clone(), *mutable, *init, *body);
                self.bind_expr(init, env, purity);
                let reg = self.program.alloc(ExprKind::Register { name: name.clone(), source: init, mutable }, loc);
                let ExprKind::Binding { reg: reg_slot, .. } = &mut self.program.exprs[e].kind else { unreachable!() };
                *reg_slot = Some(reg);
                let prev = env.insert(name.clone(), reg);
                self.bind_expr(body, env, purity);
                self.restore(env, vec![(name, prev)]);
            },
            ExprKind::FuncDef { def_site, body } => {
                let (def_site, body) = (*def_site, *body);
                let ExprKind::Func(fkey) = *self.program.kind(def_site) else { unreachable!() };
                let name = self.program.funcs[fkey].name.clone();
                let prev = env.insert(name.clone(), def_site);
                self.bind_func(fkey, env);
                self.bind_expr(body, env, purity);
                self.restore(env, vec![(name, prev)]);
            },
            ExprKind::Call { callee_name, args, .. } => {
                let (name, args) = (callee_name.clone(), args.clone());
                for arg in args {
                    self.bind_expr(arg, env, purity);
                }
                let Some(&def) = env.get(&name) else {
                    self.errors.push(SemaError::UnboundName(name, loc));
                    return;
                };
                let ExprKind::Func(callee_func) = *self.program.kind(def) else {
                    self.errors.push(SemaError::NotCallable(name, loc));
                    return;
                };
                let callee_purity = self.program.funcs[callee_func].purity;
                if purity == Purity::Pure && matches!(callee_purity, Purity::Impure | Purity::FunIO) {
                    self.errors.push(SemaError::ImpureCall(name.clone(), loc));
                }
                let ExprKind::Call { callee, .. } = &mut self.program.exprs[e].kind else { unreachable!() };
                *callee = Some(def);
            },
            _ => {
                for child in self.program.exprs[e].kind.children() {
                    self.bind_expr(child, env, purity);
                }
            }
        }
    }
}
