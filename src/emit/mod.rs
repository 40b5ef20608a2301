pub mod lir;
mod builder;
mod pretty;

pub use builder::{Builder, FunctionBuilder};
