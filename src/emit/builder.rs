use indexmap::IndexMap;
use crate::emit::lir;
use crate::parsing::ast::Purity;

pub struct Builder {
    functions: IndexMap<lir::FunctionID, Option<lir::Function>>,
    externs: IndexMap<lir::FunctionID, lir::Extern>,
    structs: IndexMap<lir::StructID, Option<lir::Struct>>,
    main_function: Option<lir::FunctionID>,
    next_function: usize
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            functions: IndexMap::new(),
            externs: IndexMap::new(),
            structs: IndexMap::new(),
            main_function: None,
            next_function: 0
        }
    }

    pub fn finish(self) -> lir::LIR {
        let Builder { functions, externs, structs, main_function, .. } = self;
        lir::LIR {
            functions: functions.into_iter().map(|(k, v)| (k, v.expect("function declared but never defined"))).collect(),
            externs,
            structs: structs.into_iter().map(|(k, v)| (k, v.expect("struct declared but never defined"))).collect(),
            main_function
        }
    }

    fn next_function_id(&mut self) -> lir::FunctionID {
        let id = lir::FunctionID(self.next_function);
        self.next_function += 1;
        id
    }

    pub fn declare_function(&mut self) -> lir::FunctionID {
        let id = self.next_function_id();
        self.functions.insert(id, None);
        id
    }

    pub fn define_function(&mut self, id: lir::FunctionID, fb: FunctionBuilder, ret: lir::Type) {
        let function = fb.finish(id, ret);
        if self.functions.get_mut(&id).expect("function never declared").replace(function).is_some() {
            panic!("function already defined");
        }
    }

    pub fn declare_extern(&mut self, name: String, params: Vec<lir::Type>, ret: lir::Type) -> lir::FunctionID {
        let id = self.next_function_id();
        self.externs.insert(id, lir::Extern { id, name, params, ret });
        id
    }

    pub fn declare_struct(&mut self) -> lir::StructID {
        let id = lir::StructID(self.structs.len());
        self.structs.insert(id, None);
        id
    }

    pub fn define_struct(&mut self, id: lir::StructID, name: String, fields: Vec<(String, lir::Type)>) {
        if self.structs.get_mut(&id).expect("struct never declared").replace(lir::Struct { id, name, fields }).is_some() {
            panic!("struct already defined");
        }
    }

    pub fn main_function(&mut self, id: lir::FunctionID) {
        self.main_function = Some(id);
    }
}

pub struct FunctionBuilder {
    name: String,
    purity: Purity,
    params: Vec<(String, lir::Type, lir::LocalID)>,
    next_local: usize,
    blocks: Vec<Vec<lir::Instruction>>
}

impl FunctionBuilder {
    pub fn new(name: String, purity: Purity) -> FunctionBuilder {
        FunctionBuilder {
            name,
            purity,
            params: Vec::new(),
            next_local: 0,
            blocks: vec![Vec::new()]
        }
    }

    fn finish(self, id: lir::FunctionID, ret: lir::Type) -> lir::Function {
        let FunctionBuilder { name, purity, params, mut blocks, .. } = self;
        assert_eq!(blocks.len(), 1, "unclosed block in function builder");
        lir::Function { id, name, purity, params, ret, body: blocks.pop().unwrap() }
    }

    fn next_local_id(&mut self) -> lir::LocalID {
        let id = lir::LocalID(self.next_local);
        self.next_local += 1;
        id
    }

    fn emit(&mut self, instruction: lir::Instruction) {
        self.blocks.last_mut().unwrap().push(instruction);
    }

    pub fn param(&mut self, name: String, ty: lir::Type) -> lir::LocalID {
        let id = self.next_local_id();
        self.params.push((name, ty, id));
        id
    }

    pub fn declare_local(&mut self, ty: lir::Type) -> lir::LocalID {
        let id = self.next_local_id();
        self.emit(lir::Instruction::DeclareLocal(id, ty));
        id
    }

    pub fn push_block(&mut self) {
        self.blocks.push(Vec::new());
    }

    pub fn pop_block(&mut self) -> Vec<lir::Instruction> {
        assert!(self.blocks.len() > 1, "popped the root block");
        self.blocks.pop().unwrap()
    }

    pub fn load_int(&mut self, value: i64, bits: u8) {
        self.emit(lir::Instruction::LoadInt(value, bits));
    }

    pub fn load_string(&mut self, value: String) {
        self.emit(lir::Instruction::LoadString(value));
    }

    pub fn not(&mut self) {
        self.emit(lir::Instruction::Not);
    }

    pub fn add(&mut self) {
        self.emit(lir::Instruction::Add);
    }

    pub fn sub(&mut self) {
        self.emit(lir::Instruction::Sub);
    }

    pub fn mul(&mut self) {
        self.emit(lir::Instruction::Mul);
    }

    pub fn lt(&mut self) {
        self.emit(lir::Instruction::Lt);
    }

    pub fn eq(&mut self) {
        self.emit(lir::Instruction::Eq);
    }

    pub fn join_string(&mut self) {
        self.emit(lir::Instruction::JoinString);
    }

    pub fn dup(&mut self) {
        self.emit(lir::Instruction::Dup);
    }

    pub fn pop(&mut self) {
        self.emit(lir::Instruction::Pop);
    }

    pub fn load_local(&mut self, local: lir::LocalID) {
        self.emit(lir::Instruction::LoadLocal(local));
    }

    pub fn store_local(&mut self, local: lir::LocalID) {
        self.emit(lir::Instruction::StoreLocal(local));
    }

    pub fn call(&mut self, function: lir::FunctionID, args: usize, returns: bool) {
        if returns {
            self.emit(lir::Instruction::Call(function, args));
        } else {
            self.emit(lir::Instruction::CallVoid(function, args));
        }
    }

    pub fn create_struct(&mut self, struct_: lir::StructID, fields: usize) {
        self.emit(lir::Instruction::CreateStruct(struct_, fields));
    }

    pub fn get_field(&mut self, struct_: lir::StructID, index: usize) {
        self.emit(lir::Instruction::GetField(struct_, index));
    }

    pub fn set_field(&mut self, struct_: lir::StructID, index: usize) {
        self.emit(lir::Instruction::SetField(struct_, index));
    }

    pub fn array_new(&mut self, elem: lir::Type) {
        self.emit(lir::Instruction::ArrayNew(elem));
    }

    pub fn array_get(&mut self) {
        self.emit(lir::Instruction::ArrayGet);
    }

    pub fn array_set(&mut self) {
        self.emit(lir::Instruction::ArraySet);
    }

    pub fn if_else(&mut self, then_do: Vec<lir::Instruction>, else_do: Vec<lir::Instruction>, ty: Option<lir::Type>) {
        self.emit(lir::Instruction::IfElse { then_do, else_do, ty });
    }

    pub fn while_loop(&mut self, cond: Vec<lir::Instruction>, body: Vec<lir::Instruction>) {
        self.emit(lir::Instruction::While { cond, body });
    }

    pub fn ret(&mut self, with_value: bool) {
        if with_value {
            self.emit(lir::Instruction::Return);
        } else {
            self.emit(lir::Instruction::ReturnVoid);
        }
    }
}

#[cfg(test)]
mod test {
    use crate::emit::builder::{Builder, FunctionBuilder};
    use crate::emit::lir;
    use crate::parsing::ast::Purity;

    #[test]
    fn test_build_function() {
        let mut builder = Builder::new();
        let id = builder.declare_function();
        let mut fb = FunctionBuilder::new("answer".into(), Purity::Pure);
        fb.load_int(42, 32);
        fb.ret(true);
        builder.define_function(id, fb, lir::Type::Int(32));
        builder.main_function(id);

        let built = builder.finish();
        assert_eq!(built.functions.len(), 1);
        assert_eq!(built.main_function, Some(id));
        let function = &built.functions[&id];
        assert_eq!(function.name, "answer");
        assert_eq!(function.body.len(), 2);
    }

    #[test]
    fn test_build_blocks() {
        let mut fb = FunctionBuilder::new("f".into(), Purity::Pure);
        fb.push_block();
        fb.load_int(1, 32);
        let then_do = fb.pop_block();
        fb.push_block();
        fb.load_int(2, 32);
        let else_do = fb.pop_block();
        fb.if_else(then_do, else_do, Some(lir::Type::Int(32)));
        fb.ret(true);

        let mut builder = Builder::new();
        let id = builder.declare_function();
        builder.define_function(id, fb, lir::Type::Int(32));
        let built = builder.finish();
        assert!(matches!(built.functions[&id].body[0], lir::Instruction::IfElse { .. }));
    }

    #[test]
    #[should_panic]
    fn test_define_twice() {
        let mut builder = Builder::new();
        let id = builder.declare_function();
        builder.define_function(id, FunctionBuilder::new("f".into(), Purity::Pure), lir::Type::Void);
        builder.define_function(id, FunctionBuilder::new("f".into(), Purity::Pure), lir::Type::Void);
    }
}
