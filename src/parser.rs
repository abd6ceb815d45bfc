use super::ast::{Expression, Literal, Statement};
use super::token::{Token, TokenType};
use std::error::Error;
use std::fmt;
use std::fmt::Formatter;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError<'a> {
    pub message: String,
    pub token: &'a Token<'a>,
}

impl<'a> fmt::Display for ParseError<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.token.tokentype {
            TokenType::EOF => write!(
                f,
                "[line {}] error at end: {}",
                self.token.line,
                self.message.as_str()
            ),
            _ => write!(
                f,
                "[line {}] error at '{}': {}",
                self.token.line,
                self.token.lexeme,
                self.message.as_str()
            ),
        }
    }
}

impl<'a> Error for ParseError<'a> {}

type ParseResult<'a, T> = Result<T, ParseError<'a>>;

/// Deepest allowed nesting of statements and expressions. Evaluation recurses
/// once per level, so this also bounds the interpreter's stack use.
const MAX_NESTING: usize = 255;

/// Read past the last token. A list that does not end with `EOF` behaves as
/// if it did.
static END: Token<'static> = Token {
    tokentype: TokenType::EOF,
    lexeme: "",
    line: 0,
};

/// Recursive-descent parser over a token list as produced by
/// `scanner::scan_tokens`.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    current: usize,
    depth: usize,
    errors: Vec<ParseError<'a>>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Parser<'a> {
        Parser {
            tokens,
            current: 0,
            depth: 0,
            errors: Vec::new(),
        }
    }
    /// Parses every declaration. All syntax errors are collected; if there
    /// was any, no statements are returned at all.
    pub fn parse(mut self) -> Result<Vec<Statement<'a>>, Vec<ParseError<'a>>> {
        let mut statements: Vec<Statement<'a>> = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        debug!(
            statements = statements.len(),
            errors = self.errors.len(),
            "parsed tokens"
        );
        if self.errors.is_empty() {
            Ok(statements)
        } else {
            Err(self.errors)
        }
    }
    fn declaration(&mut self) -> Option<Statement<'a>> {
        let result = match self.peek().tokentype {
            TokenType::Var => {
                self.advance();
                self.var_declaration()
            }
            _ => self.statement(),
        };
        match result {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                debug!(line = e.token.line, message = e.message.as_str(), "parse error");
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }
    fn var_declaration(&mut self) -> ParseResult<'a, Statement<'a>> {
        let name = match self.peek().tokentype {
            TokenType::Identifier(_) => self.advance(),
            _ => return Err(self.error(self.peek(), "Expect variable name.")),
        };
        let initializer = match self.peek().tokentype {
            TokenType::Equal => {
                self.advance();
                Some(self.expression()?)
            }
            _ => None,
        };
        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Statement::Var { name, initializer })
    }
    fn statement(&mut self) -> ParseResult<'a, Statement<'a>> {
        self.nested(Self::statement_kind)
    }
    fn statement_kind(&mut self) -> ParseResult<'a, Statement<'a>> {
        match self.peek().tokentype {
            TokenType::If => {
                self.advance();
                self.if_statement()
            }
            TokenType::Print => {
                self.advance();
                self.print_statement()
            }
            TokenType::LeftBrace => {
                self.advance();
                Ok(Statement::Block(self.block()?))
            }
            TokenType::While => {
                self.advance();
                self.while_statement()
            }
            TokenType::For => {
                self.advance();
                self.for_statement()
            }
            _ => self.expression_statement(),
        }
    }
    fn for_statement(&mut self) -> ParseResult<'a, Statement<'a>> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;
        let initializer: Option<Statement<'a>> = match self.peek().tokentype {
            TokenType::Semicolon => {
                self.advance();
                None
            }
            TokenType::Var => {
                self.advance();
                Some(self.var_declaration()?)
            }
            _ => Some(self.expression_statement()?),
        };

        let condition = match self.peek().tokentype {
            TokenType::Semicolon => Expression::Literal(Literal::Boolean(true)),
            _ => self.expression()?,
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment: Option<Expression<'a>> = match self.peek().tokentype {
            TokenType::RightParen => None,
            _ => Some(self.expression()?),
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(x) = increment {
            body = Statement::Block(vec![body, Statement::Expression(x)])
        }
        body = Statement::While {
            condition,
            body: Box::new(body),
        };
        match initializer {
            None => Ok(body),
            Some(x) => Ok(Statement::Block(vec![x, body])),
        }
    }
    fn while_statement(&mut self) -> ParseResult<'a, Statement<'a>> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = self.statement()?;
        Ok(Statement::While {
            condition,
            body: Box::new(body),
        })
    }
    fn if_statement(&mut self) -> ParseResult<'a, Statement<'a>> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = match self.peek().tokentype {
            TokenType::Else => {
                self.advance();
                Some(Box::new(self.statement()?))
            }
            _ => None,
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }
    fn block(&mut self) -> ParseResult<'a, Vec<Statement<'a>>> {
        let mut statements: Vec<Statement<'a>> = Vec::new();
        while !self.is_at_end() {
            if let TokenType::RightBrace = self.peek().tokentype {
                break;
            }
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }
    fn print_statement(&mut self) -> ParseResult<'a, Statement<'a>> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Statement::Print(expr))
    }
    fn expression_statement(&mut self) -> ParseResult<'a, Statement<'a>> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Statement::Expression(expr))
    }
    fn expression(&mut self) -> ParseResult<'a, Expression<'a>> {
        self.nested(Self::assignment)
    }
    fn assignment(&mut self) -> ParseResult<'a, Expression<'a>> {
        let expr = self.or()?;
        match self.peek().tokentype {
            TokenType::Equal => {
                let equals = self.advance();
                let value = self.nested(Self::assignment)?;
                match expr {
                    Expression::Variable(x) => Ok(Expression::Assign {
                        name: x,
                        value: Box::new(value),
                    }),
                    // Reported, but the parser is still in a sane state.
                    _ => {
                        let e = self.error(equals, "Invalid assignment target.");
                        self.errors.push(e);
                        Ok(expr)
                    }
                }
            }
            _ => Ok(expr),
        }
    }
    fn or(&mut self) -> ParseResult<'a, Expression<'a>> {
        let mut expr = self.and()?;
        while let TokenType::Or = self.peek().tokentype {
            let operator = self.advance();
            let right = self.and()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn and(&mut self) -> ParseResult<'a, Expression<'a>> {
        let mut expr = self.equality()?;
        while let TokenType::And = self.peek().tokentype {
            let operator = self.advance();
            let right = self.equality()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn equality(&mut self) -> ParseResult<'a, Expression<'a>> {
        let mut expr = self.comparison()?;
        loop {
            match self.peek().tokentype {
                TokenType::BangEqual | TokenType::EqualEqual => {
                    let operator = self.advance();
                    let right = self.comparison()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn comparison(&mut self) -> ParseResult<'a, Expression<'a>> {
        let mut expr = self.term()?;
        loop {
            match self.peek().tokentype {
                TokenType::Greater
                | TokenType::GreaterEqual
                | TokenType::Less
                | TokenType::LessEqual => {
                    let operator = self.advance();
                    let right = self.term()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn term(&mut self) -> ParseResult<'a, Expression<'a>> {
        let mut expr = self.factor()?;
        loop {
            match self.peek().tokentype {
                TokenType::Minus | TokenType::Plus => {
                    let operator = self.advance();
                    let right = self.factor()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn factor(&mut self) -> ParseResult<'a, Expression<'a>> {
        let mut expr = self.unary()?;
        loop {
            match self.peek().tokentype {
                TokenType::Slash | TokenType::Star => {
                    let operator = self.advance();
                    let right = self.unary()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn unary(&mut self) -> ParseResult<'a, Expression<'a>> {
        match self.peek().tokentype {
            TokenType::Bang | TokenType::Minus => {
                let operator = self.advance();
                let right = self.nested(Self::unary)?;
                Ok(Expression::Unary {
                    operator,
                    right: Box::new(right),
                })
            }
            _ => self.primary(),
        }
    }
    fn primary(&mut self) -> ParseResult<'a, Expression<'a>> {
        let literal = match self.peek().tokentype {
            TokenType::False => Some(Literal::Boolean(false)),
            TokenType::True => Some(Literal::Boolean(true)),
            TokenType::Nil => Some(Literal::Nil),
            TokenType::Number(x) => Some(Literal::Number(x)),
            TokenType::String(x) => Some(Literal::String(x)),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expression::Literal(literal));
        }
        match self.peek().tokentype {
            TokenType::Identifier(_) => Ok(Expression::Variable(self.advance())),
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                Ok(Expression::Grouping(Box::new(expr)))
            }
            _ => Err(self.error(self.peek(), "Expect expression.")),
        }
    }
    /// Runs one recursive rule one level deeper, failing instead of
    /// recursing once the nesting limit is reached.
    fn nested<T>(&mut self, rule: fn(&mut Self) -> ParseResult<'a, T>) -> ParseResult<'a, T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(self.peek(), "Too much nesting."));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if let TokenType::Semicolon = self.previous().tokentype {
                return;
            }
            match self.peek().tokentype {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => (),
            }
            self.advance();
        }
    }
    fn consume(&mut self, expected: TokenType<'a>, msg: &str) -> ParseResult<'a, &'a Token<'a>> {
        if self.peek().tokentype.same_kind(&expected) {
            Ok(self.advance())
        } else {
            Err(self.error(self.peek(), msg))
        }
    }
    fn advance(&mut self) -> &'a Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    fn is_at_end(&self) -> bool {
        matches!(self.peek().tokentype, TokenType::EOF)
    }
    fn peek(&self) -> &'a Token<'a> {
        self.tokens.get(self.current).unwrap_or(&END)
    }
    fn previous(&self) -> &'a Token<'a> {
        self.tokens
            .get(self.current.saturating_sub(1))
            .unwrap_or(&END)
    }
    fn error(&self, token: &'a Token<'a>, msg: &str) -> ParseError<'a> {
        ParseError {
            message: msg.to_string(),
            token,
        }
    }
}

#[cfg(test)]
mod parser_tests {
    use crate::ast::AstPrinter;
    use crate::parser::Parser;
    use crate::scanner;
    use crate::token::{Token, TokenType};
    use pretty_assertions::assert_eq;

    fn print_all(source: &str) -> Vec<String> {
        let (tokens, errors) = scanner::scan_tokens(source);
        assert!(errors.is_empty());
        let statements = match Parser::new(&tokens).parse() {
            Ok(statements) => statements,
            Err(errors) => panic!("unexpected parse errors: {:?}", errors),
        };
        let mut printer = AstPrinter {};
        statements
            .iter()
            .map(|s| s.accept(&mut printer))
            .collect()
    }

    fn errors_of(source: &str) -> Vec<String> {
        let (tokens, _) = scanner::scan_tokens(source);
        match Parser::new(&tokens).parse() {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn precedence() {
        assert_eq!(
            print_all("1 + 2 * 3 - -4 / 5 == 6 > 7;"),
            vec!["(; (== (- (+ 1 (* 2 3)) (/ (- 4) 5)) (> 6 7)))"]
        );
    }

    #[test]
    fn left_associative_binary() {
        assert_eq!(print_all("1 - 2 - 3;"), vec!["(; (- (- 1 2) 3))"]);
    }

    #[test]
    fn logical_binds_looser_than_equality() {
        assert_eq!(
            print_all("a or b and c == d;"),
            vec!["(; (or a (and b (== c d))))"]
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(print_all("a = b = 3;"), vec!["(; (= a (= b 3)))"]);
    }

    #[test]
    fn grouping_and_literals() {
        assert_eq!(
            print_all("print (!true) == nil;"),
            vec!["(print (== (group (! true)) nil))"]
        );
    }

    #[test]
    fn var_with_and_without_initializer() {
        assert_eq!(
            print_all("var a; var b = 'x';"),
            vec!["(var a)", "(var b x)"]
        );
    }

    #[test]
    fn if_else_and_while() {
        assert_eq!(
            print_all("if (a) print 1; else { print 2; } while (b) b = false;"),
            vec![
                "(if a (print 1) (block (print 2)))",
                "(while b (; (= b false)))"
            ]
        );
    }

    #[test]
    fn for_desugars_to_while() {
        assert_eq!(
            print_all("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0) (while (< i 3) (block (print i) (; (= i (+ i 1))))))"]
        );
    }

    #[test]
    fn for_with_empty_clauses() {
        assert_eq!(print_all("for (;;) print 1;"), vec!["(while true (print 1))"]);
    }

    #[test]
    fn missing_variable_name() {
        assert_eq!(
            errors_of("var = 1;"),
            vec!["[line 1] error at '=': Expect variable name."]
        );
    }

    #[test]
    fn error_at_end() {
        assert_eq!(
            errors_of("print 1"),
            vec!["[line 1] error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn invalid_assignment_target_is_not_fatal() {
        assert_eq!(
            errors_of("1 = 2;\nprint 3"),
            vec![
                "[line 1] error at '=': Invalid assignment target.",
                "[line 2] error at end: Expect ';' after value."
            ]
        );
    }

    #[test]
    fn recovers_after_each_bad_statement() {
        assert_eq!(
            errors_of("print ;\nvar x = 1;\nprint (1;\nx = 2;\n{ print 4;"),
            vec![
                "[line 1] error at ';': Expect expression.",
                "[line 3] error at ';': Expect ')' after expression.",
                "[line 5] error at end: Expect '}' after block."
            ]
        );
    }

    #[test]
    fn reserved_words_are_not_expressions() {
        assert_eq!(
            errors_of("class;"),
            vec!["[line 1] error at 'class': Expect expression."]
        );
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let deep = format!("print {}1{};", "(".repeat(1000), ")".repeat(1000));
        assert_eq!(
            errors_of(&deep),
            vec!["[line 1] error at '(': Too much nesting."]
        );
        let unary = format!("print {}true;", "!".repeat(1000));
        assert_eq!(
            errors_of(&unary),
            vec!["[line 1] error at '!': Too much nesting."]
        );
        let blocks = format!("{}{}", "{".repeat(1000), "}".repeat(1000));
        assert_eq!(errors_of(&blocks)[0], "[line 1] error at '{': Too much nesting.");
    }

    #[test]
    fn nesting_below_the_limit_parses() {
        let source = format!("print {}1{};", "(".repeat(200), ")".repeat(200));
        let printed = print_all(&source);
        assert_eq!(printed.len(), 1);
        assert!(printed[0].starts_with("(print (group (group"));
    }

    #[test]
    fn missing_end_token_is_implied() {
        let empty: Vec<Token> = Vec::new();
        assert!(Parser::new(&empty).parse().map(|s| s.is_empty()).unwrap_or(false));

        let tokens = vec![
            Token {
                tokentype: TokenType::Print,
                lexeme: "print",
                line: 1,
            },
            Token {
                tokentype: TokenType::Number(1.0),
                lexeme: "1",
                line: 1,
            },
        ];
        let errors: Vec<String> = match Parser::new(&tokens).parse() {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        };
        assert_eq!(errors, vec!["[line 0] error at end: Expect ';' after value."]);
    }
}
