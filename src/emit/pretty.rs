use std::fmt::Write;
use crate::emit::lir::{Instruction, LIR, Type};
use crate::parsing::ast::Purity;
use crate::util::map_join;

impl LIR {
    pub fn render(&self) -> String {
        let mut out = String::new();
        for extern_ in self.externs.values() {
            writeln!(out, "extern {} ({}) -> {}", extern_.name, map_join(&extern_.params, |t| self.render_type(t)), self.render_type(&extern_.ret)).unwrap();
        }
        for struct_ in self.structs.values() {
            writeln!(out, "struct {} {{", struct_.name).unwrap();
            for (name, ty) in &struct_.fields {
                writeln!(out, "  {}: {}", name, self.render_type(ty)).unwrap();
            }
            writeln!(out, "}}").unwrap();
        }
        for function in self.functions.values() {
            let params = map_join(&function.params, |(name, ty, local)| {
                format!("{}: {} @{}", name, self.render_type(ty), local.render())
            });
            let purity = match function.purity {
                Purity::Pure => "",
                Purity::Impure => "imp ",
                Purity::Sealed => "sealed ",
                Purity::FunIO => "io "
            };
            let marker = if self.main_function == Some(function.id) { " [main]" } else { "" };
            writeln!(out, "{}fn {} ({}) -> {}{}", purity, function.name, params, self.render_type(&function.ret), marker).unwrap();
            self.render_block(&function.body, 1, &mut out);
        }
        out
    }

    fn render_block(&self, instructions: &[Instruction], depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        for instruction in instructions {
            match instruction {
                Instruction::LoadInt(value, bits) => writeln!(out, "{pad}load.i{bits} {value}").unwrap(),
                Instruction::LoadString(value) => writeln!(out, "{pad}load.str {value:?}").unwrap(),
                Instruction::Not => writeln!(out, "{pad}not").unwrap(),
                Instruction::Add => writeln!(out, "{pad}add").unwrap(),
                Instruction::Sub => writeln!(out, "{pad}sub").unwrap(),
                Instruction::Mul => writeln!(out, "{pad}mul").unwrap(),
                Instruction::Lt => writeln!(out, "{pad}lt").unwrap(),
                Instruction::Eq => writeln!(out, "{pad}eq").unwrap(),
                Instruction::JoinString => writeln!(out, "{pad}join").unwrap(),
                Instruction::Dup => writeln!(out, "{pad}dup").unwrap(),
                Instruction::Pop => writeln!(out, "{pad}pop").unwrap(),
                Instruction::DeclareLocal(local, ty) => writeln!(out, "{pad}local {} {}", local.render(), self.render_type(ty)).unwrap(),
                Instruction::LoadLocal(local) => writeln!(out, "{pad}load {}", local.render()).unwrap(),
                Instruction::StoreLocal(local) => writeln!(out, "{pad}store {}", local.render()).unwrap(),
                Instruction::Call(function, args) => writeln!(out, "{pad}call {} {}", self.function_name(*function), args).unwrap(),
                Instruction::CallVoid(function, args) => writeln!(out, "{pad}call.void {} {}", self.function_name(*function), args).unwrap(),
                Instruction::CreateStruct(struct_, fields) => writeln!(out, "{pad}new {} {}", self.structs[struct_].name, fields).unwrap(),
                Instruction::GetField(struct_, index) => writeln!(out, "{pad}getfield {} {}", self.structs[struct_].name, index).unwrap(),
                Instruction::SetField(struct_, index) => writeln!(out, "{pad}setfield {} {}", self.structs[struct_].name, index).unwrap(),
                Instruction::ArrayNew(elem) => writeln!(out, "{pad}array.new {}", self.render_type(elem)).unwrap(),
                Instruction::ArrayGet => writeln!(out, "{pad}array.get").unwrap(),
                Instruction::ArraySet => writeln!(out, "{pad}array.set").unwrap(),
                Instruction::IfElse { then_do, else_do, ty } => {
                    match ty {
                        Some(ty) => writeln!(out, "{pad}if -> {}", self.render_type(ty)).unwrap(),
                        None => writeln!(out, "{pad}if").unwrap()
                    }
                    self.render_block(then_do, depth + 1, out);
                    writeln!(out, "{pad}else").unwrap();
                    self.render_block(else_do, depth + 1, out);
                    writeln!(out, "{pad}end").unwrap();
                },
                Instruction::While { cond, body } => {
                    writeln!(out, "{pad}while").unwrap();
                    self.render_block(cond, depth + 1, out);
                    writeln!(out, "{pad}do").unwrap();
                    self.render_block(body, depth + 1, out);
                    writeln!(out, "{pad}end").unwrap();
                },
                Instruction::Return => writeln!(out, "{pad}ret").unwrap(),
                Instruction::ReturnVoid => writeln!(out, "{pad}ret.void").unwrap()
            }
        }
    }

    fn render_type(&self, ty: &Type) -> String {
        match ty {
            Type::Void => "void".into(),
            Type::Bool => "bool".into(),
            Type::Int(bits) => format!("i{bits}"),
            Type::Array(elem) => format!("[{}]", self.render_type(elem)),
            Type::Struct(struct_) => self.structs[struct_].name.clone(),
            Type::Function(params, ret) => {
                format!("({}) -> {}", map_join(params, |t| self.render_type(t)), self.render_type(ret))
            },
            Type::Ptr(inner) => format!("*{}", self.render_type(inner))
        }
    }
}
