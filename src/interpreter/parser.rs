use crate::ast::{AssignTarget, BinaryOp, Expr, ExprKind, Literal, Program, Stmt, StmtKind, UnaryOp};
use crate::diagnostic::{Diagnostic, Span};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace};

/// Binding strength of prefix `not`: looser than comparisons, tighter than `and`.
const NOT_PRECEDENCE: u8 = 3;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{span}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("{span}: expected {expected}, found end of input")]
    UnexpectedEndOfInput { expected: String, span: Span },
    #[error("{span}: {message}")]
    InvalidSyntax { message: String, span: Span },
}

impl ParseError {
    pub fn invalid(message: impl Into<String>, span: Span) -> Self {
        Self::InvalidSyntax { message: message.into(), span }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEndOfInput { span, .. }
            | Self::InvalidSyntax { span, .. } => *span,
        }
    }

    pub fn line(&self) -> usize {
        self.span().line
    }

    pub fn column(&self) -> usize {
        self.span().column
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::UnexpectedToken { expected, found, span } => {
                Diagnostic::error("E0101", format!("expected {}, found {}", expected, found))
                    .with_label(*span, format!("expected {} here", expected))
            }
            Self::UnexpectedEndOfInput { expected, span } => {
                Diagnostic::error("E0102", format!("unexpected end of input, expected {}", expected))
                    .with_label(*span, "input ends here")
            }
            Self::InvalidSyntax { message, span } => {
                Diagnostic::error("E0103", format!("invalid syntax: {}", message)).with_label(*span, "")
            }
        }
    }
}

/// Position in the token buffer. Always ends with an `End` token, so peeking
/// never runs off the buffer.
struct Cursor {
    tokens: Vec<Token>,
    position: usize,
}

impl Cursor {
    fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::End) {
            let span = tokens
                .last()
                .map(|token| Span::new(token.span.end, token.span.end, token.span.line, token.span.column))
                .unwrap_or_else(|| Span::new(0, 0, 1, 1));
            tokens.push(Token::new(TokenKind::End, "", span));
        }
        Self { tokens, position: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.kind().same_kind(kind)
    }

    fn at_end(&self) -> bool {
        self.at(&TokenKind::End)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.at_end() {
            trace!(position = self.position, token = %token.kind, "advance");
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn previous_span(&self) -> Span {
        self.position
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map_or_else(|| self.peek().span, |token| token.span)
    }
}

fn binary_operator(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Or => BinaryOp::Or,
        TokenKind::And => BinaryOp::And,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::LessEq => BinaryOp::LessEq,
        TokenKind::GreaterEq => BinaryOp::GreaterEq,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        _ => return None,
    };
    Some(op)
}

fn augmented_operator(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::PlusEq => BinaryOp::Add,
        TokenKind::MinusEq => BinaryOp::Sub,
        TokenKind::StarEq => BinaryOp::Mul,
        TokenKind::SlashEq => BinaryOp::Div,
        TokenKind::PercentEq => BinaryOp::Mod,
        _ => return None,
    };
    Some(op)
}

/// Parses a token stream into a program, collecting every independent error.
pub fn parse(tokens: Vec<Token>) -> Result<Program, Vec<ParseError>> {
    Parser::new(tokens).parse_program()
}

pub struct Parser {
    cursor: Cursor,
    errors: Vec<ParseError>,
    loop_depth: usize,
    function_depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            cursor: Cursor::new(tokens),
            errors: Vec::new(),
            loop_depth: 0,
            function_depth: 0,
        }
    }

    pub fn parse_program(mut self) -> Result<Program, Vec<ParseError>> {
        let mut statements = Vec::new();
        while !self.cursor.at_end() {
            if self.cursor.eat(&TokenKind::Newline).is_some() {
                continue;
            }
            let start = self.cursor.position;
            match self.parse_statement() {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    self.recover(error);
                    if self.cursor.position == start {
                        self.cursor.advance();
                    }
                }
            }
        }

        debug!(statements = statements.len(), errors = self.errors.len(), "parsed program");
        if self.errors.is_empty() {
            Ok(statements)
        } else {
            Err(self.errors)
        }
    }

    fn recover(&mut self, error: ParseError) {
        trace!(%error, "recovering");
        self.errors.push(error);
        self.synchronize();
    }

    /// Skips the rest of the broken statement: through the end of its line
    /// and any block hanging off that line, `elif`/`else` arms included.
    /// A DEDENT that closes the enclosing block is left in place.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.cursor.kind() {
                TokenKind::End => return,
                TokenKind::Indent => {
                    depth += 1;
                    self.cursor.advance();
                }
                TokenKind::Dedent => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.cursor.advance();
                    let continues_chain = self.cursor.at(&TokenKind::Elif) || self.cursor.at(&TokenKind::Else);
                    if depth == 0 && !continues_chain {
                        return;
                    }
                }
                TokenKind::Newline => {
                    self.cursor.advance();
                    if depth == 0 && !self.cursor.at(&TokenKind::Indent) {
                        return;
                    }
                }
                _ => {
                    self.cursor.advance();
                }
            }
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.cursor.peek();
        match token.kind {
            TokenKind::End => ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                span: token.span,
            },
            _ => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.describe(),
                span: token.span,
            },
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.cursor.at(kind) {
            Ok(self.cursor.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(Rc<str>, Span), ParseError> {
        match self.cursor.kind() {
            TokenKind::Ident(name) => {
                let name = Rc::from(name.as_str());
                let token = self.cursor.advance();
                Ok((name, token.span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn end_statement(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::Newline, "end of line").map(|_| ())
    }

    /// Parses comma-separated items up to `close`, after the opening bracket
    /// has been consumed. A trailing comma is allowed.
    fn delimited<T>(
        &mut self,
        close: &TokenKind,
        close_desc: &str,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<(Vec<T>, Span), ParseError> {
        let mut items = Vec::new();
        while !self.cursor.at(close) {
            items.push(item(self)?);
            if self.cursor.eat(&TokenKind::Comma).is_none() {
                break;
            }
        }
        let closing = self.expect(close, close_desc)?;
        Ok((items, closing.span))
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        ensure_sufficient_stack(|| self.statement())
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.peek().span;
        match self.cursor.kind() {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Def => self.parse_def(),
            TokenKind::Return => {
                if self.function_depth == 0 {
                    return Err(ParseError::invalid("'return' outside function", start));
                }
                self.cursor.advance();
                let value = if self.cursor.at(&TokenKind::Newline) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                let span = start.merge(self.cursor.previous_span());
                self.end_statement()?;
                Ok(Stmt::new(StmtKind::Return(value), span))
            }
            TokenKind::Break | TokenKind::Continue => {
                let token = self.cursor.peek().kind.clone();
                if self.loop_depth == 0 {
                    return Err(ParseError::invalid(format!("'{}' outside loop", token), start));
                }
                self.cursor.advance();
                self.end_statement()?;
                let kind = match token {
                    TokenKind::Break => StmtKind::Break,
                    _ => StmtKind::Continue,
                };
                Ok(Stmt::new(kind, start))
            }
            TokenKind::Pass => {
                self.cursor.advance();
                self.end_statement()?;
                Ok(Stmt::new(StmtKind::Pass, start))
            }
            TokenKind::Indent => Err(ParseError::invalid("unexpected indent", start)),
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.peek().span;
        let expr = self.parse_expression()?;
        let kind = if self.cursor.eat(&TokenKind::Assign).is_some() {
            let target = Self::assign_target(expr)?;
            let value = self.parse_expression()?;
            StmtKind::Assign { target, value }
        } else if let Some(op) = augmented_operator(self.cursor.kind()) {
            self.cursor.advance();
            let target = Self::assign_target(expr)?;
            let value = self.parse_expression()?;
            StmtKind::AugAssign { target, op, value }
        } else {
            StmtKind::Expr(expr)
        };

        let span = start.merge(self.cursor.previous_span());
        self.end_statement()?;
        Ok(Stmt::new(kind, span))
    }

    fn assign_target(expr: Expr) -> Result<AssignTarget, ParseError> {
        match expr.kind {
            ExprKind::Identifier(name) => Ok(AssignTarget::Name(name)),
            ExprKind::Index { target, index } => Ok(AssignTarget::Index { target, index }),
            ExprKind::Attribute { .. } => Err(ParseError::invalid("cannot assign to attribute", expr.span)),
            ExprKind::Call { .. } => Err(ParseError::invalid("cannot assign to function call", expr.span)),
            ExprKind::Literal(_) => Err(ParseError::invalid("cannot assign to literal", expr.span)),
            _ => Err(ParseError::invalid("cannot assign to expression", expr.span)),
        }
    }

    /// `: NEWLINE INDENT statement+ DEDENT`, recovering per statement.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::Colon, "`:`")?;
        self.expect(&TokenKind::Newline, "end of line after `:`")?;
        self.expect(&TokenKind::Indent, "an indented block")?;

        let mut body = Vec::new();
        while !self.cursor.at(&TokenKind::Dedent) && !self.cursor.at_end() {
            let start = self.cursor.position;
            match self.parse_statement() {
                Ok(statement) => body.push(statement),
                Err(error) => {
                    self.recover(error);
                    if self.cursor.position == start && !self.cursor.at(&TokenKind::Dedent) {
                        self.cursor.advance();
                    }
                }
            }
        }
        self.expect(&TokenKind::Dedent, "end of block")?;
        Ok(body)
    }

    fn parse_loop_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        body
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.advance().span;
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        let mut branches = vec![(condition, body)];
        let mut else_branch = None;

        loop {
            if self.cursor.eat(&TokenKind::Elif).is_some() {
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                branches.push((condition, body));
            } else if self.cursor.eat(&TokenKind::Else).is_some() {
                else_branch = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }

        let span = start.merge(self.cursor.previous_span());
        Ok(Stmt::new(StmtKind::If { branches, else_branch }, span))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.advance().span;
        let condition = self.parse_expression()?;
        let body = self.parse_loop_body()?;
        let span = start.merge(self.cursor.previous_span());
        Ok(Stmt::new(StmtKind::While { condition, body }, span))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.advance().span;
        let (variable, _) = self.expect_ident("loop variable name")?;
        self.expect(&TokenKind::In, "`in`")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_loop_body()?;
        let span = start.merge(self.cursor.previous_span());
        Ok(Stmt::new(StmtKind::For { variable, iterable, body }, span))
    }

    fn parse_params(&mut self, close: &TokenKind, close_desc: &str) -> Result<Rc<[Rc<str>]>, ParseError> {
        let (params, _) = self.delimited(close, close_desc, |parser| parser.expect_ident("parameter name"))?;
        let mut names: Vec<Rc<str>> = Vec::with_capacity(params.len());
        for (name, span) in params {
            if names.contains(&name) {
                return Err(ParseError::invalid(format!("duplicate parameter '{}'", name), span));
            }
            names.push(name);
        }
        Ok(names.into())
    }

    fn parse_def(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.advance().span;
        let (name, _) = self.expect_ident("function name")?;
        self.expect(&TokenKind::LParen, "`(`")?;
        let params = self.parse_params(&TokenKind::RParen, "`)`")?;

        self.function_depth += 1;
        let enclosing_loops = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.parse_block();
        self.function_depth -= 1;
        self.loop_depth = enclosing_loops;
        let body = body?;

        let span = start.merge(self.cursor.previous_span());
        Ok(Stmt::new(StmtKind::FunctionDef { name, params, body: body.into() }, span))
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| {
            if self.cursor.at(&TokenKind::Lambda) {
                self.parse_lambda()
            } else {
                self.parse_binary(1)
            }
        })
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let start = self.cursor.advance().span;
        let params = self.parse_params(&TokenKind::Colon, "`:`")?;
        let body = self.parse_expression()?;
        let span = start.merge(body.span);
        let body_span = body.span;
        let body: Rc<[Stmt]> = Rc::from(vec![Stmt::new(StmtKind::Return(Some(body)), body_span)]);
        Ok(Expr::new(ExprKind::Lambda { params, body }, span))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_prefix(min_precedence)?;

        while let Some(op) = binary_operator(self.cursor.kind()) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.cursor.advance();
            let right = ensure_sufficient_stack(|| self.parse_binary(precedence + 1))?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_prefix(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        if self.cursor.at(&TokenKind::Not) && min_precedence <= NOT_PRECEDENCE {
            let start = self.cursor.advance().span;
            let operand = ensure_sufficient_stack(|| self.parse_binary(NOT_PRECEDENCE))?;
            let span = start.merge(operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_unary()
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.cursor.at(&TokenKind::Minus) {
            let start = self.cursor.advance().span;
            let operand = ensure_sufficient_stack(|| self.parse_unary())?;
            let span = start.merge(operand.span);
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.cursor.kind() {
                TokenKind::LParen => {
                    self.cursor.advance();
                    let (args, end) = self.delimited(&TokenKind::RParen, "`)`", |parser| parser.parse_expression())?;
                    let span = expr.span.merge(end);
                    expr = Expr::new(ExprKind::Call { callee: Box::new(expr), args }, span);
                }
                TokenKind::LBracket => {
                    self.cursor.advance();
                    let index = self.parse_expression()?;
                    let end = self.expect(&TokenKind::RBracket, "`]`")?.span;
                    let span = expr.span.merge(end);
                    expr = Expr::new(
                        ExprKind::Index {
                            target: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.cursor.advance();
                    let (name, end) = self.expect_ident("attribute name")?;
                    let span = expr.span.merge(end);
                    expr = Expr::new(ExprKind::Attribute { target: Box::new(expr), name }, span);
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let span = self.cursor.peek().span;
        let kind = match self.cursor.kind() {
            TokenKind::Int(n) => ExprKind::Literal(Literal::Int(*n)),
            TokenKind::Float(x) => ExprKind::Literal(Literal::Float(*x)),
            TokenKind::Str(s) => ExprKind::Literal(Literal::Str(Rc::from(s.as_str()))),
            TokenKind::True => ExprKind::Literal(Literal::Bool(true)),
            TokenKind::False => ExprKind::Literal(Literal::Bool(false)),
            TokenKind::None => ExprKind::Literal(Literal::None),
            TokenKind::Ident(name) => ExprKind::Identifier(Rc::from(name.as_str())),
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.parse_expression()?;
                let end = self.expect(&TokenKind::RParen, "`)`")?.span;
                return Ok(Expr::new(inner.kind, span.merge(end)));
            }
            TokenKind::LBracket => {
                self.cursor.advance();
                let (items, end) = self.delimited(&TokenKind::RBracket, "`]`", |parser| parser.parse_expression())?;
                return Ok(Expr::new(ExprKind::List(items), span.merge(end)));
            }
            TokenKind::LBrace => {
                self.cursor.advance();
                let (entries, end) = self.delimited(&TokenKind::RBrace, "`}`", |parser| {
                    let key = parser.parse_expression()?;
                    parser.expect(&TokenKind::Colon, "`:`")?;
                    let value = parser.parse_expression()?;
                    Ok((key, value))
                })?;
                return Ok(Expr::new(ExprKind::Map(entries), span.merge(end)));
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.cursor.advance();
        Ok(Expr::new(kind, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn program(source: &str) -> Program {
        parse(tokenize(source).expect("lexes")).expect("parses")
    }

    fn errors(source: &str) -> Vec<ParseError> {
        parse(tokenize(source).expect("lexes")).expect_err("should fail to parse")
    }

    fn sexpr(expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(n)) => n.to_string(),
            ExprKind::Literal(Literal::Float(x)) => x.to_string(),
            ExprKind::Literal(Literal::Str(s)) => format!("{:?}", s),
            ExprKind::Literal(Literal::Bool(b)) => b.to_string(),
            ExprKind::Literal(Literal::None) => "None".to_string(),
            ExprKind::Identifier(name) => name.to_string(),
            ExprKind::Unary { op, operand } => {
                let op = match op {
                    UnaryOp::Neg => "neg",
                    UnaryOp::Not => "not",
                };
                format!("({} {})", op, sexpr(operand))
            }
            ExprKind::Binary { left, op, right } => {
                format!("({} {} {})", op.symbol(), sexpr(left), sexpr(right))
            }
            ExprKind::Call { callee, args } => {
                let args: String = args.iter().map(|arg| format!(" {}", sexpr(arg))).collect();
                format!("(call {}{})", sexpr(callee), args)
            }
            ExprKind::Index { target, index } => format!("([] {} {})", sexpr(target), sexpr(index)),
            ExprKind::Attribute { target, name } => format!("(. {} {})", sexpr(target), name),
            ExprKind::List(items) => {
                format!("[{}]", items.iter().map(sexpr).collect::<Vec<_>>().join(" "))
            }
            ExprKind::Map(entries) => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", sexpr(key), sexpr(value)))
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            ExprKind::Lambda { params, .. } => format!("(lambda {})", params.join(" ")),
        }
    }

    fn expr(source: &str) -> String {
        let statements = program(source);
        match &statements[0].kind {
            StmtKind::Expr(expr) => sexpr(expr),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_precedence_and_associativity() {
        assert_eq!(expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(expr("1 - 2 - 3"), "(- (- 1 2) 3)");
        assert_eq!(expr("(1 + 2) * 3"), "(* (+ 1 2) 3)");
        assert_eq!(expr("8 / 4 % 3"), "(% (/ 8 4) 3)");
        assert_eq!(expr("-x * y"), "(* (neg x) y)");
        assert_eq!(expr("--x"), "(neg (neg x))");
    }

    #[test]
    fn test_logical_precedence() {
        assert_eq!(expr("a or b and not c == d"), "(or a (and b (not (== c d))))");
        assert_eq!(expr("not a and b"), "(and (not a) b)");
        assert_eq!(expr("not not a"), "(not (not a))");
        assert_eq!(expr("a < b + 1"), "(< a (+ b 1))");
    }

    #[test]
    fn test_comparisons_associate_left() {
        assert_eq!(expr("a < b < c"), "(< (< a b) c)");
        assert_eq!(expr("a == b != c"), "(!= (== a b) c)");
    }

    #[test]
    fn test_not_is_rejected_inside_arithmetic() {
        let errors = errors("x = 1 + not y\n");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ParseError::UnexpectedToken { found, .. } if found == "`not`"));
    }

    #[test]
    fn test_postfix_chains() {
        assert_eq!(expr("a.b(1)[0]"), "([] (call (. a b) 1) 0)");
        assert_eq!(expr("f()()"), "(call (call f))");
        assert_eq!(expr("xs[i + 1].upper()"), "(call (. ([] xs (+ i 1)) upper))");
    }

    #[test]
    fn test_collection_literals_allow_trailing_commas() {
        assert_eq!(expr("[1, 2,]"), "[1 2]");
        assert_eq!(expr("[]"), "[]");
        assert_eq!(expr("{'k': 1, 2: [3],}"), "{\"k\": 1, 2: [3]}");
        assert_eq!(expr("f(a,\n  b,\n)"), "(call f a b)");
    }

    #[test]
    fn test_lambda_becomes_return_block() {
        let statements = program("double = lambda x: x * 2\n");
        let StmtKind::Assign { value, .. } = &statements[0].kind else {
            panic!("expected assignment");
        };
        let ExprKind::Lambda { params, body } = &value.kind else {
            panic!("expected lambda");
        };
        assert_eq!(params.len(), 1);
        assert!(matches!(&body[0].kind, StmtKind::Return(Some(expr)) if sexpr(expr) == "(* x 2)"));
        assert_eq!(expr("(lambda: 1)()"), "(call (lambda ))");
    }

    #[test]
    fn test_if_elif_else_chain() {
        let source = "if a:\n    x = 1\nelif b:\n    x = 2\nelif c:\n    pass\nelse:\n    x = 3\n";
        let statements = program(source);
        assert_eq!(statements.len(), 1);
        let StmtKind::If { branches, else_branch } = &statements[0].kind else {
            panic!("expected if");
        };
        let conditions: Vec<String> = branches.iter().map(|(condition, _)| sexpr(condition)).collect();
        assert_eq!(conditions, vec!["a", "b", "c"]);
        assert_eq!(else_branch.as_ref().map(Vec::len), Some(1));
        assert_eq!(statements[0].span.line, 1);
    }

    #[test]
    fn test_function_definition() {
        let statements = program("def add(a, b,):\n    total = a + b\n    return total\n");
        let StmtKind::FunctionDef { name, params, body } = &statements[0].kind else {
            panic!("expected def");
        };
        assert_eq!(&**name, "add");
        assert_eq!(params.iter().map(|p| p.to_string()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(body.len(), 2);
        assert_eq!(body[1].span.line, 3);
    }

    #[test]
    fn test_loops_and_assignments() {
        let statements = program("for x in xs:\n    total += x\n    if x:\n        break\nxs[0] = 5\nm['k'] %= 2\n");
        assert_eq!(statements.len(), 3);
        assert!(matches!(&statements[0].kind, StmtKind::For { variable, body, .. } if &**variable == "x" && body.len() == 2));
        assert!(matches!(
            &statements[1].kind,
            StmtKind::Assign { target: AssignTarget::Index { .. }, .. }
        ));
        assert!(matches!(
            &statements[2].kind,
            StmtKind::AugAssign { op: BinaryOp::Mod, target: AssignTarget::Index { .. }, .. }
        ));
        assert_eq!(statements[2].span.line, 6);
    }

    #[test]
    fn test_collects_independent_errors() {
        let errors = errors("x = = 1\ny = 2\nz = )\n");
        let lines: Vec<usize> = errors.iter().map(ParseError::line).collect();
        assert_eq!(lines, vec![1, 3]);
        assert!(matches!(&errors[0], ParseError::UnexpectedToken { expected, .. } if expected == "expression"));
    }

    #[test]
    fn test_recovery_skips_block_of_broken_header() {
        let errors = errors("def f(:\n    return 1\nx = 1\ny = = 2\n");
        let positions: Vec<(usize, usize)> = errors.iter().map(|e| (e.line(), e.column())).collect();
        assert_eq!(positions, vec![(1, 7), (4, 5)]);
    }

    #[test]
    fn test_recovery_inside_block_keeps_enclosing_structure() {
        let errors = errors("while a:\n    x = )\n    y = 1\nz = ]\n");
        let lines: Vec<usize> = errors.iter().map(ParseError::line).collect();
        assert_eq!(lines, vec![2, 4]);
    }

    #[test]
    fn test_recovery_skips_remaining_if_arms() {
        let errors = errors("if a b:\n    x = 1\nelse:\n    x = 2\ny = = 1\n");
        let lines: Vec<usize> = errors.iter().map(ParseError::line).collect();
        assert_eq!(lines, vec![1, 5]);
    }

    #[test]
    fn test_unexpected_indent_is_one_error() {
        let errors = errors("x = 1\n    y = 2\nz = 3\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0], ParseError::invalid("unexpected indent", errors[0].span()));
        assert_eq!(errors[0].line(), 2);
    }

    #[test]
    fn test_missing_block() {
        let errors = errors("if a:\nb = 1\n");
        assert!(matches!(&errors[0], ParseError::UnexpectedToken { expected, .. } if expected == "an indented block"));
    }

    #[test]
    fn test_context_checks() {
        assert!(matches!(&errors("break\n")[0], ParseError::InvalidSyntax { message, .. } if message == "'break' outside loop"));
        assert!(matches!(&errors("return 1\n")[0], ParseError::InvalidSyntax { message, .. } if message == "'return' outside function"));
        let nested = errors("while True:\n    def f():\n        continue\n");
        assert!(matches!(&nested[0], ParseError::InvalidSyntax { message, .. } if message == "'continue' outside loop"));
        assert!(matches!(&errors("def f(a, a):\n    pass\n")[0], ParseError::InvalidSyntax { message, .. } if message == "duplicate parameter 'a'"));
    }

    #[test]
    fn test_invalid_assignment_targets() {
        for source in ["f() = 1\n", "1 = x\n", "a.b = 2\n", "a + b = 3\n"] {
            let errors = errors(source);
            assert!(matches!(errors[0], ParseError::InvalidSyntax { .. }), "{}", source);
        }
    }

    #[test]
    fn test_end_token_is_appended_when_missing() {
        let tokens = vec![
            Token::new(TokenKind::Ident("x".to_string()), "x", Span::new(0, 1, 1, 1)),
            Token::new(TokenKind::Assign, "=", Span::new(2, 3, 1, 3)),
        ];
        let errors = parse(tokens).unwrap_err();
        assert!(matches!(errors[0], ParseError::UnexpectedEndOfInput { .. }));
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(program(""), Vec::<Stmt>::new());
        assert_eq!(program("# nothing\n"), Vec::<Stmt>::new());
    }

    #[test]
    fn test_deeply_nested_expression_does_not_overflow() {
        let source = format!("x = {}1{}\n", "(".repeat(2_000), ")".repeat(2_000));
        let statements = program(&source);
        assert!(matches!(&statements[0].kind, StmtKind::Assign { value, .. } if sexpr(value) == "1"));
    }
}
