use crate::ast::{Expression, Statement, Value, Visitor};
use crate::environment::Environment;
use crate::token::{Token, TokenType};
use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use tracing::debug;

/// A fault raised while evaluating, tied to the operator or name token
/// that was being evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError<'a> {
    pub token: &'a Token<'a>,
    pub message: String,
}

impl<'a> fmt::Display for RuntimeError<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \n[line {}]", self.message, self.token.line)
    }
}

impl<'a> Error for RuntimeError<'a> {}

#[derive(Debug)]
pub enum ErrorType<'a> {
    Runtime(RuntimeError<'a>),
    Output(io::Error),
}

impl<'a> fmt::Display for ErrorType<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorType::Runtime(e) => write!(f, "{}", e),
            ErrorType::Output(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl<'a> Error for ErrorType<'a> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ErrorType::Runtime(_) => None,
            ErrorType::Output(e) => Some(e),
        }
    }
}

impl<'a> From<RuntimeError<'a>> for ErrorType<'a> {
    fn from(e: RuntimeError<'a>) -> Self {
        ErrorType::Runtime(e)
    }
}

impl<'a> From<io::Error> for ErrorType<'a> {
    fn from(e: io::Error) -> Self {
        ErrorType::Output(e)
    }
}

/// Tree-walking evaluator. The global frame lives as long as the
/// interpreter, so successive `interpret` calls share variables.
pub struct Interpreter<W: Write> {
    pub environment: Environment,
    out: W,
}

impl<'a, W: Write> Visitor<Expression<'a>, Result<Value, RuntimeError<'a>>> for Interpreter<W> {
    fn visit(&mut self, expr: &Expression<'a>) -> Result<Value, RuntimeError<'a>> {
        match expr {
            Expression::Literal(x) => Ok(Value::from(x)),
            Expression::Grouping(x) => self.evaluate(x),
            Expression::Unary { operator, right } => {
                let rv = self.evaluate(right)?;
                match operator.tokentype {
                    TokenType::Minus => match rv {
                        Value::Number(r) => Ok(Value::Number(-r)),
                        _ => Err(error(*operator, "Operand must be a number.")),
                    },
                    TokenType::Bang => Ok(Value::Boolean(!is_truthy(&rv))),
                    _ => Err(error(*operator, "Unknown unary operator.")),
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let lv = self.evaluate(left)?;
                let rv = self.evaluate(right)?;
                binary(*operator, lv, rv)
            }
            Expression::Variable(token) => self.environment.get(*token),
            Expression::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.assign(*name, value.clone())?;
                Ok(value)
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                match operator.tokentype {
                    TokenType::Or => {
                        if is_truthy(&left) {
                            Ok(left)
                        } else {
                            self.evaluate(right)
                        }
                    }
                    TokenType::And => {
                        if !is_truthy(&left) {
                            Ok(left)
                        } else {
                            self.evaluate(right)
                        }
                    }
                    _ => Err(error(*operator, "Unknown logical operator.")),
                }
            }
        }
    }
}

impl<'a, W: Write> Visitor<Statement<'a>, Result<(), ErrorType<'a>>> for Interpreter<W> {
    fn visit(&mut self, stmt: &Statement<'a>) -> Result<(), ErrorType<'a>> {
        match stmt {
            Statement::Print(e) => {
                let val = self.evaluate(e)?;
                writeln!(self.out, "{}", val)?;
            }
            Statement::Expression(e) => {
                self.evaluate(e)?;
            }
            Statement::Var { name, initializer } => {
                let val = match initializer {
                    Some(e) => self.evaluate(e)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme, val);
            }
            Statement::Block(stmts) => self.execute_block(stmts)?,
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }
            }
            Statement::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }
            }
        }
        Ok(())
    }
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Interpreter<W> {
        Interpreter {
            environment: Environment::new(),
            out,
        }
    }
    pub fn output(&self) -> &W {
        &self.out
    }
    fn evaluate<'a>(&mut self, expr: &Expression<'a>) -> Result<Value, RuntimeError<'a>> {
        expr.accept(self)
    }
    pub fn execute<'a>(&mut self, stmt: &Statement<'a>) -> Result<(), ErrorType<'a>> {
        stmt.accept(self)
    }
    /// Runs `statements` in a fresh frame. The frame is popped whether or
    /// not a statement failed.
    pub fn execute_block<'a>(&mut self, statements: &[Statement<'a>]) -> Result<(), ErrorType<'a>> {
        self.environment.start_block();
        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
        self.environment.end_block();
        result
    }
    /// Executes statements in order, stopping at the first error.
    pub fn interpret<'a>(&mut self, statements: &[Statement<'a>]) -> Result<(), ErrorType<'a>> {
        debug!(statements = statements.len(), "interpreting");
        for stmt in statements {
            self.execute(stmt)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

fn binary<'a>(operator: &'a Token<'a>, lv: Value, rv: Value) -> Result<Value, RuntimeError<'a>> {
    match operator.tokentype {
        TokenType::EqualEqual => Ok(Value::Boolean(is_equal(&lv, &rv))),
        TokenType::BangEqual => Ok(Value::Boolean(!is_equal(&lv, &rv))),
        TokenType::Plus => match (lv, rv) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            (Value::String(mut l), Value::String(r)) => {
                l.push_str(r.as_str());
                Ok(Value::String(l))
            }
            _ => Err(error(
                operator,
                "Operands must be two numbers or two strings.",
            )),
        },
        _ => {
            let (l, r) = match (lv, rv) {
                (Value::Number(l), Value::Number(r)) => (l, r),
                _ => return Err(error(operator, "Operands must be numbers.")),
            };
            match operator.tokentype {
                TokenType::Minus => Ok(Value::Number(l - r)),
                TokenType::Slash => Ok(Value::Number(l / r)),
                TokenType::Star => Ok(Value::Number(l * r)),
                TokenType::Greater => Ok(Value::Boolean(l > r)),
                TokenType::GreaterEqual => Ok(Value::Boolean(l >= r)),
                TokenType::Less => Ok(Value::Boolean(l < r)),
                TokenType::LessEqual => Ok(Value::Boolean(l <= r)),
                _ => Err(error(operator, "Unknown binary operator.")),
            }
        }
    }
}

fn error<'a>(token: &'a Token<'a>, message: &str) -> RuntimeError<'a> {
    RuntimeError {
        token,
        message: message.to_string(),
    }
}

/// `nil` and `false` are falsy; everything else, including `0` and `""`, is truthy.
pub fn is_truthy(x: &Value) -> bool {
    match x {
        Value::Nil => false,
        Value::Boolean(x) => *x,
        Value::Number(_) => true,
        Value::String(_) => true,
    }
}

/// Equality never coerces: values of different types are simply unequal.
pub fn is_equal(lv: &Value, rv: &Value) -> bool {
    match (lv, rv) {
        (Value::Nil, Value::Nil) => true,
        (Value::Boolean(l), Value::Boolean(r)) => l == r,
        (Value::Number(l), Value::Number(r)) => l == r,
        (Value::String(l), Value::String(r)) => l == r,
        _ => false,
    }
}
