use std::path::PathBuf;
use std::process::ExitCode;
use clap::Parser;
use crate::compiler::{CompileResult, Compiler};
use crate::error::Message;

mod compiler;
mod emit;
mod error;
mod parsing;
mod sema;
mod source;
mod util;

#[derive(Parser)]
#[command(name = "splc", about = "Compiler for the SPL language")]
struct Args {
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[arg(short, long)]
    output: Option<PathBuf>
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut compiler = Compiler::new();
    for file in &args.files {
        if let Err(e) = compiler.add_root(file) {
            eprintln!("Error: Could not read '{}': {}.", file.display(), e);
            return ExitCode::FAILURE;
        }
    }

    match compiler.compile() {
        CompileResult::CouldNotParse(errors) => {
            for error in &errors {
                error.render();
            }
            ExitCode::FAILURE
        },
        CompileResult::CouldNotAnalyze(errors) => {
            for error in &errors {
                error.render();
            }
            ExitCode::FAILURE
        },
        CompileResult::Success(rendered) => {
            match &args.output {
                Some(path) => {
                    if let Err(e) = std::fs::write(path, rendered) {
                        eprintln!("Error: Could not write '{}': {}.", path.display(), e);
                        return ExitCode::FAILURE;
                    }
                },
                None => print!("{rendered}")
            }
            ExitCode::SUCCESS
        }
    }
}
