pub mod ast;
pub mod environment;
pub mod interpreter;
pub mod lox;
pub mod parser;
pub mod scanner;
pub mod token;
