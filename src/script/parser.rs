//! Recursive-descent parser producing a whole [`Program`] before anything runs

use serde_json::Value;

use super::ScriptError;
use super::ast::{Call, Expr, Program, Stmt, StmtKind};
use super::lexer::{Token, TokenKind, tokenize};
use super::namespace::Namespace;

const DECLARATION_KEYWORDS: &[&str] = &["let", "const", "var"];

/// Deepest expression nesting accepted; bounds parser and evaluator recursion
pub const MAX_NESTING: usize = 64;

pub fn parse_program(source: &str) -> Result<Program, ScriptError> {
    let tokens = tokenize(source)?;
    Parser {
        tokens,
        pos: 0,
        depth: 0,
    }
    .program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Parse {
            line: self.line(),
            message: message.into(),
        }
    }

    /// Enter one more level of nesting. Callers restore `depth` when they return.
    fn nest(&mut self) -> Result<(), ScriptError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(())
    }

    fn expect(&mut self, expected: TokenKind) -> Result<(), ScriptError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {}, found {}", expected, self.peek())))
        }
    }

    fn program(mut self) -> Result<Program, ScriptError> {
        let mut statements = Vec::new();
        loop {
            while *self.peek() == TokenKind::Separator {
                self.advance();
            }
            if *self.peek() == TokenKind::Eof {
                break;
            }
            statements.push(self.statement()?);
            match self.peek() {
                TokenKind::Separator | TokenKind::Eof => {}
                other => return Err(self.error(format!("expected end of statement, found {}", other))),
            }
        }
        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        let line = self.line();

        if let TokenKind::Ident(word) = self.peek() {
            let word = word.clone();

            if DECLARATION_KEYWORDS.contains(&word.as_str())
                && matches!(self.peek_nth(1), TokenKind::Ident(_))
            {
                self.advance();
                let name = self.assign_target()?;
                self.expect(TokenKind::Assign)?;
                let value = self.expression()?;
                return Ok(Stmt {
                    kind: StmtKind::Assign { name, value },
                    line,
                });
            }

            match self.peek_nth(1) {
                TokenKind::Assign => {
                    let name = self.assign_target()?;
                    self.advance();
                    let value = self.expression()?;
                    return Ok(Stmt {
                        kind: StmtKind::Assign { name, value },
                        line,
                    });
                }
                TokenKind::PlusAssign => {
                    let name = self.assign_target()?;
                    self.advance();
                    let value = self.expression()?;
                    return Ok(Stmt {
                        kind: StmtKind::AddAssign { name, value },
                        line,
                    });
                }
                _ => {}
            }
        }

        Ok(Stmt {
            kind: StmtKind::Expr(self.expression()?),
            line,
        })
    }

    /// Consume the name on the left of an assignment, rejecting built-ins and literals
    fn assign_target(&mut self) -> Result<String, ScriptError> {
        match self.advance() {
            TokenKind::Ident(name) if Namespace::is_reserved(&name) => {
                Err(ScriptError::ReservedName(name))
            }
            TokenKind::Ident(name) => Ok(name),
            other => Err(self.error(format!("expected a variable name, found {}", other))),
        }
    }

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        let base = self.depth;
        self.nest()?;

        let mut terms = vec![self.unary()?];
        while *self.peek() == TokenKind::Plus {
            self.advance();
            terms.push(self.unary()?);
        }

        self.depth = base;
        Ok(match terms.len() {
            1 => terms.remove(0),
            _ => Expr::Sum(terms),
        })
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let base = self.depth;
        let expr = match self.peek() {
            TokenKind::Minus => {
                self.advance();
                self.nest()?;
                Expr::Neg(Box::new(self.unary()?))
            }
            // every built-in completes before the next statement; `await` is noise
            TokenKind::Ident(word) if word == "await" => {
                self.advance();
                self.nest()?;
                self.unary()?
            }
            _ => self.postfix()?,
        };
        self.depth = base;
        Ok(expr)
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let base = self.depth;
        let mut expr = self.primary()?;
        loop {
            if matches!(self.peek(), TokenKind::Dot | TokenKind::LBracket | TokenKind::LParen) {
                self.nest()?;
            }
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    match self.advance() {
                        TokenKind::Ident(field) => expr = Expr::Member(Box::new(expr), field),
                        other => {
                            return Err(self.error(format!("expected a property name, found {}", other)));
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                TokenKind::LParen => {
                    let Expr::Var(function) = expr else {
                        return Err(self.error("only built-in functions can be called"));
                    };
                    expr = Expr::Call(self.call(function)?);
                }
                _ => break,
            }
        }
        self.depth = base;
        Ok(expr)
    }

    fn call(&mut self, function: String) -> Result<Call, ScriptError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        let mut kwargs = Vec::new();

        while *self.peek() != TokenKind::RParen {
            if let (TokenKind::Ident(name), TokenKind::Assign) = (self.peek(), self.peek_nth(1)) {
                let name = name.clone();
                self.advance();
                self.advance();
                kwargs.push((name, self.expression()?));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                args.push(self.expression()?);
            }

            if *self.peek() == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        Ok(Call {
            function,
            args,
            kwargs,
        })
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        match self.advance() {
            TokenKind::Str(s) => Ok(Expr::Literal(Value::String(s))),
            TokenKind::Num(n) => Ok(Expr::Literal(Value::Number(n))),
            TokenKind::Ident(word) => Ok(match word.as_str() {
                "true" | "True" => Expr::Literal(Value::Bool(true)),
                "false" | "False" => Expr::Literal(Value::Bool(false)),
                "null" | "None" | "undefined" => Expr::Literal(Value::Null),
                _ => Expr::Var(word),
            }),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let mut items = Vec::new();
                while *self.peek() != TokenKind::RBracket {
                    items.push(self.expression()?);
                    if *self.peek() == TokenKind::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Expr::Array(items))
            }
            TokenKind::LBrace => {
                let mut entries = Vec::new();
                while *self.peek() != TokenKind::RBrace {
                    let key = match self.advance() {
                        TokenKind::Str(s) | TokenKind::Ident(s) => s,
                        TokenKind::Num(n) => n.to_string(),
                        other => {
                            return Err(self.error(format!("expected an object key, found {}", other)));
                        }
                    };
                    self.expect(TokenKind::Colon)?;
                    entries.push((key, self.expression()?));
                    if *self.peek() == TokenKind::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace)?;
                Ok(Expr::Object(entries))
            }
            other => Err(self.error(format!("unexpected {}", other))),
        }
    }
}
