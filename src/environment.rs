use super::ast::Value;
use super::interpreter::RuntimeError;
use super::token::Token;
use tracing::trace;

use std::collections::BTreeMap;

/// Chain of scope frames, innermost last. A frame encloses every frame
/// pushed after it; index 0 is the global frame and is never popped.
#[derive(Debug)]
pub struct Environment {
    values: Vec<BTreeMap<String, Value>>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            values: vec![BTreeMap::new()],
        }
    }
    pub fn start_block(&mut self) {
        self.values.push(BTreeMap::new());
        trace!(depth = self.values.len(), "enter frame");
    }
    pub fn end_block(&mut self) {
        if self.values.len() > 1 {
            self.values.pop();
        }
        trace!(depth = self.values.len(), "leave frame");
    }
    /// Number of live frames, including the global one.
    pub fn depth(&self) -> usize {
        self.values.len()
    }
    /// Binds `name` in the innermost frame, replacing any binding it already had there.
    pub fn define(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.values.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }
    pub fn get<'a>(&self, token: &'a Token<'a>) -> Result<Value, RuntimeError<'a>> {
        for cur in self.values.iter().rev() {
            if let Some(x) = cur.get(token.lexeme) {
                return Ok(x.clone());
            }
        }
        Err(undefined(token))
    }
    pub fn assign<'a>(&mut self, token: &'a Token<'a>, value: Value) -> Result<(), RuntimeError<'a>> {
        for cur in self.values.iter_mut().rev() {
            if let Some(x) = cur.get_mut(token.lexeme) {
                *x = value;
                return Ok(());
            }
        }
        Err(undefined(token))
    }
}

fn undefined<'a>(token: &'a Token<'a>) -> RuntimeError<'a> {
    RuntimeError {
        token,
        message: format!("Undefined variable '{}'.", token.lexeme),
    }
}

#[cfg(test)]
mod environment_tests {
    use crate::ast::Value;
    use crate::environment::Environment;
    use crate::token::{Token, TokenType};
    use pretty_assertions::assert_eq;

    fn name(lexeme: &str) -> Token {
        Token {
            tokentype: TokenType::Identifier(lexeme),
            lexeme,
            line: 7,
        }
    }

    #[test]
    fn define_and_get() {
        let mut env = Environment::new();
        let a = name("a");
        env.define("a", Value::Number(1.0));
        assert_eq!(env.get(&a).ok(), Some(Value::Number(1.0)));
        env.define("a", Value::Boolean(true));
        assert_eq!(env.get(&a).ok(), Some(Value::Boolean(true)));
    }

    #[test]
    fn inner_frame_shadows_outer() {
        let mut env = Environment::new();
        let a = name("a");
        env.define("a", Value::Number(1.0));
        env.start_block();
        env.define("a", Value::Number(2.0));
        assert_eq!(env.get(&a).ok(), Some(Value::Number(2.0)));
        env.end_block();
        assert_eq!(env.get(&a).ok(), Some(Value::Number(1.0)));
    }

    #[test]
    fn assign_walks_outward() {
        let mut env = Environment::new();
        let a = name("a");
        env.define("a", Value::Number(1.0));
        env.start_block();
        env.start_block();
        assert!(env.assign(&a, Value::String("x".to_string())).is_ok());
        env.end_block();
        env.end_block();
        assert_eq!(env.get(&a).ok(), Some(Value::String("x".to_string())));
    }

    #[test]
    fn undefined_names_fail() {
        let mut env = Environment::new();
        let b = name("b");
        let err = env.get(&b).err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("Undefined variable 'b'. \n[line 7]"));
        assert!(env.assign(&b, Value::Nil).is_err());
        env.start_block();
        env.define("b", Value::Nil);
        env.end_block();
        assert!(env.get(&b).is_err());
    }

    #[test]
    fn global_frame_is_never_popped() {
        let mut env = Environment::new();
        env.end_block();
        assert_eq!(env.depth(), 1);
        env.define("a", Value::Nil);
        assert!(env.get(&name("a")).is_ok());
    }
}
