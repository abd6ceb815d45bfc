use super::token::Token;
use std::fmt;
use std::fmt::Formatter;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(x) => write!(f, "{}", x),
            // f64's Display already omits the ".0" of integral values.
            Value::Number(x) => write!(f, "{}", x),
            Value::String(x) => write!(f, "{}", x),
        }
    }
}

/// Payload of a literal expression. String contents borrow from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal<'a> {
    Nil,
    Boolean(bool),
    Number(f64),
    String(&'a str),
}

impl<'a> From<&Literal<'a>> for Value {
    fn from(literal: &Literal<'a>) -> Value {
        match *literal {
            Literal::Nil => Value::Nil,
            Literal::Boolean(x) => Value::Boolean(x),
            Literal::Number(x) => Value::Number(x),
            Literal::String(x) => Value::String(x.to_string()),
        }
    }
}

#[derive(Debug)]
pub enum Expression<'a> {
    Binary {
        left: Box<Expression<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expression<'a>>,
    },
    Grouping(Box<Expression<'a>>),
    Literal(Literal<'a>),
    Logical {
        left: Box<Expression<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expression<'a>>,
    },
    Unary {
        operator: &'a Token<'a>,
        right: Box<Expression<'a>>,
    },
    Variable(&'a Token<'a>),
    Assign {
        name: &'a Token<'a>,
        value: Box<Expression<'a>>,
    },
}

/// One traversal over a node family. `Output` is whatever the traversal
/// produces per node.
pub trait Visitor<T, Output> {
    fn visit(&mut self, n: &T) -> Output;
}

impl<'a> Expression<'a> {
    pub fn accept<T, V>(&self, v: &mut V) -> T
    where
        V: Visitor<Expression<'a>, T> + ?Sized,
    {
        v.visit(self)
    }
}

#[derive(Debug)]
pub enum Statement<'a> {
    Print(Expression<'a>),
    Expression(Expression<'a>),
    Var {
        name: &'a Token<'a>,
        initializer: Option<Expression<'a>>,
    },
    Block(Vec<Statement<'a>>),
    If {
        condition: Expression<'a>,
        then_branch: Box<Statement<'a>>,
        else_branch: Option<Box<Statement<'a>>>,
    },
    While {
        condition: Expression<'a>,
        body: Box<Statement<'a>>,
    },
}

impl<'a> Statement<'a> {
    pub fn accept<T, V>(&self, v: &mut V) -> T
    where
        V: Visitor<Statement<'a>, T> + ?Sized,
    {
        v.visit(self)
    }
}

/// Renders trees as nested parenthesized text, for debugging.
pub struct AstPrinter {}

impl AstPrinter {
    fn parenthesize(&mut self, name: &str, args: Vec<&Expression>) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for arg in args {
            let rendered: String = arg.accept(self);
            x.push_str(" ");
            x.push_str(rendered.as_str());
        }
        x.push_str(")");
        x
    }
    fn parenthesize_statements(&mut self, name: &str, parts: Vec<String>) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for part in parts {
            x.push_str(" ");
            x.push_str(part.as_str());
        }
        x.push_str(")");
        x
    }
}

impl<'a> Visitor<Expression<'a>, String> for AstPrinter {
    fn visit(&mut self, n: &Expression<'a>) -> String {
        match n {
            Expression::Binary {
                left,
                operator,
                right,
            } => self.parenthesize(operator.lexeme, vec![&**left, &**right]),
            Expression::Grouping(x) => self.parenthesize("group", vec![&**x]),
            Expression::Literal(x) => Value::from(x).to_string(),
            Expression::Unary { operator, right } => {
                self.parenthesize(operator.lexeme, vec![&**right])
            }
            Expression::Variable(x) => x.lexeme.to_string(),
            Expression::Assign { name, value } => {
                let value: String = value.accept(self);
                format!("(= {} {})", name.lexeme, value)
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => self.parenthesize(operator.lexeme, vec![&**left, &**right]),
        }
    }
}

impl<'a> Visitor<Statement<'a>, String> for AstPrinter {
    fn visit(&mut self, n: &Statement<'a>) -> String {
        match n {
            Statement::Print(e) => self.parenthesize("print", vec![e]),
            Statement::Expression(e) => self.parenthesize(";", vec![e]),
            Statement::Var { name, initializer } => match initializer {
                Some(e) => {
                    let value: String = e.accept(self);
                    self.parenthesize_statements("var", vec![name.lexeme.to_string(), value])
                }
                None => self.parenthesize_statements("var", vec![name.lexeme.to_string()]),
            },
            Statement::Block(stmts) => {
                let parts: Vec<String> = stmts.iter().map(|s| s.accept(self)).collect();
                self.parenthesize_statements("block", parts)
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut parts: Vec<String> = vec![condition.accept(self), then_branch.accept(self)];
                if let Some(else_branch) = else_branch {
                    parts.push(else_branch.accept(self));
                }
                self.parenthesize_statements("if", parts)
            }
            Statement::While { condition, body } => {
                let parts: Vec<String> = vec![condition.accept(self), body.accept(self)];
                self.parenthesize_statements("while", parts)
            }
        }
    }
}

#[cfg(test)]
mod ast_tests {
    use crate::ast::{AstPrinter, Expression, Literal, Statement, Value};
    use crate::token::{Token, TokenType};
    use pretty_assertions::assert_eq;

    #[test]
    fn basic_ast_test() {
        let minus = Token {
            tokentype: TokenType::Minus,
            lexeme: "-",
            line: 1,
        };
        let star = Token {
            tokentype: TokenType::Star,
            lexeme: "*",
            line: 1,
        };
        let expression = Expression::Binary {
            left: Box::new(Expression::Unary {
                operator: &minus,
                right: Box::new(Expression::Literal(Literal::Number(123.0))),
            }),
            operator: &star,
            right: Box::new(Expression::Grouping(Box::new(Expression::Literal(
                Literal::Number(45.67),
            )))),
        };
        let mut visitor = AstPrinter {};
        let printed: String = expression.accept(&mut visitor);
        assert_eq!(printed, "(* (- 123) (group 45.67))");
    }

    #[test]
    fn statements_print() {
        let name = Token {
            tokentype: TokenType::Identifier("a"),
            lexeme: "a",
            line: 1,
        };
        let block = Statement::Block(vec![
            Statement::Var {
                name: &name,
                initializer: Some(Expression::Literal(Literal::String("hi"))),
            },
            Statement::Var {
                name: &name,
                initializer: None,
            },
            Statement::While {
                condition: Expression::Literal(Literal::Boolean(true)),
                body: Box::new(Statement::Print(Expression::Variable(&name))),
            },
        ]);
        let mut visitor = AstPrinter {};
        let printed: String = block.accept(&mut visitor);
        assert_eq!(printed, "(block (var a hi) (var a) (while true (print a)))");
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(Value::String("ab".to_string()).to_string(), "ab");
    }

    #[test]
    fn literals_become_values() {
        assert_eq!(Value::from(&Literal::Nil), Value::Nil);
        assert_eq!(Value::from(&Literal::Boolean(true)), Value::Boolean(true));
        assert_eq!(Value::from(&Literal::Number(1.5)), Value::Number(1.5));
        assert_eq!(Value::from(&Literal::String("s")), Value::String("s".to_string()));
        let mut visitor = AstPrinter {};
        let printed: String = Expression::Literal(Literal::Nil).accept(&mut visitor);
        assert_eq!(printed, "nil");
    }
}
