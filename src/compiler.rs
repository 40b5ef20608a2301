use std::io;
use std::path::Path;
use typed_arena::Arena;
use crate::parsing::{ast, parse_file, ParserError};
use crate::sema::{self, SemaError};
use crate::source::Source;

pub enum CompileResult<'a> {
    CouldNotParse(Vec<ParserError<'a>>),
    CouldNotAnalyze(Vec<SemaError<'a>>),
    Success(String)
}

pub struct Compiler {
    sources: Arena<Source>
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler { sources: Arena::new() }
    }

    pub fn add_root(&self, path: &Path) -> io::Result<&Source> {
        let source = Source::from_file(path)?;
        Ok(self.sources.alloc(source))
    }

    pub fn add_text(&self, name: &str, text: &str) -> &Source {
        self.sources.alloc(Source::from_text(name, text))
    }

    // Parses every added source, merges the files into one program and
    // runs the pipeline. On success the rendered backend IR is returned.
    pub fn compile(&mut self) -> CompileResult {
        let mut files = Vec::new();
        let mut errors = Vec::new();
        for source in self.sources.iter_mut() {
            match parse_file(source) {
                Ok(file) => files.push(file),
                Err(e) => errors.extend(e)
            }
        }
        if !errors.is_empty() {
            return CompileResult::CouldNotParse(errors);
        }

        let ast = ast::AST::from_files("<program>".into(), files);
        match sema::lower(ast) {
            Ok(built) => CompileResult::Success(built.render()),
            Err(e) => CompileResult::CouldNotAnalyze(e)
        }
    }
}

#[cfg(test)]
mod test {
    use crate::compiler::{Compiler, CompileResult};

    #[test]
    fn test_compile_success() {
        let mut compiler = Compiler::new();
        compiler.add_text("<main>", "def main() -> Int32 { 0 }");
        let CompileResult::Success(rendered) = compiler.compile() else { panic!() };
        assert!(rendered.contains("fn main"));
        assert!(rendered.contains("[main]"));
    }

    #[test]
    fn test_compile_merges_files() {
        let mut compiler = Compiler::new();
        compiler.add_text("<lib>", "def double(x: Int32) -> Int32 { x * 2 }");
        compiler.add_text("<main>", "def main() -> Int32 { double(21) }");
        let CompileResult::Success(rendered) = compiler.compile() else { panic!() };
        assert!(rendered.contains("fn double"));
        assert!(rendered.contains("call double"));
    }

    #[test]
    fn test_compile_parse_error() {
        let mut compiler = Compiler::new();
        compiler.add_text("<main>", "def main( {");
        assert!(matches!(compiler.compile(), CompileResult::CouldNotParse(_)));
    }

    #[test]
    fn test_compile_analysis_error() {
        let mut compiler = Compiler::new();
        compiler.add_text("<main>", "def main() -> Int32 { nope }");
        assert!(matches!(compiler.compile(), CompileResult::CouldNotAnalyze(_)));
    }
}
