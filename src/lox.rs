use crate::ast::AstPrinter;
use crate::interpreter::{ErrorType, Interpreter};
use crate::parser::Parser;
use crate::scanner;
use std::io::{self, Write};
use strum_macros::Display;
use tracing::{debug, instrument};

/// Outcome of running one source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Status {
    #[strum(serialize = "ok")]
    Ok,
    #[strum(serialize = "syntax error")]
    SyntaxError,
    #[strum(serialize = "runtime error")]
    RuntimeError,
}

impl Status {
    /// sysexits-style process exit code.
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::SyntaxError => 65,
            Status::RuntimeError => 70,
        }
    }
}

/// One interpreter session: program output goes to `W`, error reports to `E`.
/// Global variables survive across calls to `run`.
pub struct Lox<W: Write, E: Write> {
    interpreter: Interpreter<W>,
    diagnostics: E,
    print_ast: bool,
    had_error: bool,
    had_runtime_error: bool,
}

impl Lox<io::Stdout, io::Stderr> {
    pub fn stdio() -> Lox<io::Stdout, io::Stderr> {
        Lox::new(io::stdout(), io::stderr())
    }
}

impl<W: Write, E: Write> Lox<W, E> {
    pub fn new(out: W, diagnostics: E) -> Lox<W, E> {
        Lox {
            interpreter: Interpreter::new(out),
            diagnostics,
            print_ast: false,
            had_error: false,
            had_runtime_error: false,
        }
    }
    /// Also write each parsed statement, as a parenthesized tree, to the
    /// diagnostics sink before executing it.
    pub fn print_ast(mut self, enabled: bool) -> Lox<W, E> {
        self.print_ast = enabled;
        self
    }
    /// Whether the last `run` hit a scan or parse error.
    pub fn had_error(&self) -> bool {
        self.had_error
    }
    /// Whether any `run` of this session hit a runtime error.
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }
    pub fn output(&self) -> &W {
        self.interpreter.output()
    }
    pub fn diagnostics(&self) -> &E {
        &self.diagnostics
    }
    #[instrument(level = "debug", skip_all, fields(len = source.len()))]
    pub fn run(&mut self, source: &str) -> io::Result<Status> {
        self.had_error = false;

        let (tokens, scan_errors) = scanner::scan_tokens(source);
        for e in &scan_errors {
            writeln!(self.diagnostics, "{}", e)?;
        }
        self.had_error = !scan_errors.is_empty();

        let statements = match Parser::new(&tokens).parse() {
            Ok(statements) => statements,
            Err(errors) => {
                for e in &errors {
                    writeln!(self.diagnostics, "{}", e)?;
                }
                self.had_error = true;
                debug!(errors = errors.len(), "parse failed, skipping execution");
                return Ok(Status::SyntaxError);
            }
        };
        if self.had_error {
            debug!("scan errors reported, skipping execution");
            return Ok(Status::SyntaxError);
        }

        if self.print_ast {
            let mut printer = AstPrinter {};
            for stmt in &statements {
                let tree: String = stmt.accept(&mut printer);
                writeln!(self.diagnostics, "{}", tree)?;
            }
        }

        match self.interpreter.interpret(&statements) {
            Ok(()) => Ok(Status::Ok),
            Err(ErrorType::Runtime(e)) => {
                debug!(line = e.token.line, "runtime error");
                writeln!(self.diagnostics, "{}", e)?;
                self.had_runtime_error = true;
                Ok(Status::RuntimeError)
            }
            Err(ErrorType::Output(e)) => Err(e),
        }
    }
}
