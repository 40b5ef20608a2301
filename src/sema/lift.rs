use indexmap::IndexMap;
use crate::sema::tree::{Expr, ExprKey, ExprKind, Param, Program};

pub fn lift(program: &mut Program) {
    let top_levels = program.top_levels.clone();
    for fkey in top_levels {
        if let Some(body) = program.funcs[fkey].body {
            lift_in(program, body);
        }
    }
}

fn lift_in(program: &mut Program, e: ExprKey) {
    let ExprKind::FuncDef { def_site, body } = *program.kind(e) else {
        for child in program.exprs[e].kind.children() {
            lift_in(program, child);
        }
        return;
    };

    let ExprKind::Func(func) = *program.kind(def_site) else { unreachable!() };
    let func_body = program.funcs[func].body.expect("nested extern");
    lift_in(program, func_body);

    // free variables, in first-reference order
    let mut bound: Vec<String> = program.funcs[func].params.iter().map(|p| p.name.clone()).collect();
    let mut captured = IndexMap::new();
    free_vars(program, func_body, &mut bound, &mut captured);

    // one synthetic parameter slot per captured name
    let func_loc = program.funcs[func].loc;
    let mut new_params = Vec::new();
    for (name, &outer) in &captured {
        let ty = program.exprs[outer].ty.clone();
        let reg = program.exprs.insert(Expr {
            kind: ExprKind::RegisterFunArg { name: name.clone() },
            ty,
            loc: func_loc
        });
        new_params.push((name.clone(), reg));
    }

    // activation-record values become a prefix of every call's arguments;
    // this happens before the retarget so recursive calls pick up the
    // parameter slots below
    inject_activation_records(program, func_body, def_site, &captured);
    inject_activation_records(program, body, def_site, &captured);

    for ((_, &outer), (_, reg)) in captured.iter().zip(&new_params) {
        rewrite_binding(program, func_body, outer, *reg);
    }

    let mut params: Vec<Param> = new_params.iter().map(|(name, reg)| Param {
        name: name.clone(),
        ty: program.exprs[*reg].ty.clone().expect("untyped capture"),
        reg: Some(*reg)
    }).collect();
    params.append(&mut program.funcs[func].params);
    program.funcs[func].params = params;

    program.exprs[def_site].kind = ExprKind::Closure {
        func,
        captured: captured.iter().map(|(name, &outer)| (name.clone(), outer)).collect()
    };
    program.top_levels.push(func);

    lift_in(program, body);
}

fn free_vars(program: &Program, e: ExprKey, bound: &mut Vec<String>, out: &mut IndexMap<String, ExprKey>) {
    match &program.exprs[e].kind {
        ExprKind::Variable { name, binding } => {
            if bound.contains(name) {
                return;
            }
            let binding = binding.expect("unbound variable in lifting");
            if matches!(program.kind(binding), ExprKind::Register { .. } | ExprKind::RegisterFunArg { .. }) {
                out.entry(name.clone()).or_insert(binding);
            }
        },
        ExprKind::Binding { name, init, body, .. } => {
            let (name, init, body) = (name.clone(), *init, *body);
            free_vars(program, init, bound, out);
            bound.push(name);
            free_vars(program, body, bound, out);
            bound.pop();
        },
        ExprKind::FuncDef { def_site, body } => {
            // inner functions are already lifted at this point
            let name = match program.kind(*def_site) {
                ExprKind::Closure { func, .. } | ExprKind::Func(func) => program.funcs[*func].name.clone(),
                _ => unreachable!()
            };
            bound.push(name);
            free_vars(program, *body, bound, out);
            bound.pop();
        },
        _ => {
            for child in program.exprs[e].kind.children() {
                free_vars(program, child, bound, out);
            }
        }
    }
}

// Retargets every variable below `root` that is bound to `old` onto `new`.
fn rewrite_binding(program: &mut Program, root: ExprKey, old: ExprKey, new: ExprKey) {
    let mut to_rewrite = Vec::new();
    program.walk(root, &mut |e| {
        if let ExprKind::Variable { binding: Some(binding), .. } = program.kind(e) {
            if *binding == old {
                to_rewrite.push(e);
            }
        }
    });
    for e in to_rewrite {
        let ExprKind::Variable { binding, .. } = &mut program.exprs[e].kind else { unreachable!() };
        *binding = Some(new);
    }
}

fn inject_activation_records(program: &mut Program, root: ExprKey, def_site: ExprKey, captured: &IndexMap<String, ExprKey>) {
    let mut call_sites = Vec::new();
    program.walk(root, &mut |e| {
        if let ExprKind::Call { callee: Some(callee), .. } = program.kind(e) {
            if *callee == def_site {
                call_sites.push(e);
            }
        }
    });
    for call in call_sites {
        let loc = program.exprs[call].loc;
        let mut prefix = Vec::new();
        for (name, &outer) in captured {
            let ty = program.exprs[outer].ty.clone();
            prefix.push(program.exprs.insert(Expr {
                kind: ExprKind::Variable { name: name.clone(), binding: Some(outer) },
                ty,
                loc
            }));
        }
        let ExprKind::Call { args, .. } = &mut program.exprs[call].kind else { unreachable!() };
        prefix.append(args);
        *args = prefix;
    }
}
