use crate::diagnostic::{Diagnostic, LineIndex, Span};
use crate::token::{Token, TokenKind};
use chumsky::prelude::*;
use thiserror::Error;
use tracing::debug;

const TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("{span}: unknown character {found:?}")]
    UnknownCharacter { found: char, span: Span },
    #[error("{span}: unterminated string literal")]
    UnterminatedString { span: Span },
    #[error("{span}: unindent to width {width} does not match any outer indentation level")]
    InconsistentDedent { width: usize, span: Span },
    #[error("{span}: integer literal `{literal}` does not fit in 64 bits")]
    InvalidNumber { literal: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            Self::UnknownCharacter { span, .. }
            | Self::UnterminatedString { span }
            | Self::InconsistentDedent { span, .. }
            | Self::InvalidNumber { span, .. } => *span,
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
            Self::UnknownCharacter { found, span } => {
                Diagnostic::error("E0001", format!("unknown character {:?}", found))
                    .with_label(*span, "not valid here")
            }
            Self::UnterminatedString { span } => {
                Diagnostic::error("E0002", "unterminated string literal")
                    .with_label(*span, "string starts here")
                    .with_note("strings must be closed on the line they start")
            }
            Self::InconsistentDedent { width, span } => Diagnostic::error(
                "E0003",
                format!("unindent to width {} matches no outer level", width),
            )
            .with_label(*span, "inconsistent dedent"),
            Self::InvalidNumber { literal, span } => {
                Diagnostic::error("E0004", format!("integer literal `{}` is too large", literal))
                    .with_label(*span, "out of range for a 64-bit integer")
            }
        }
    }
}

/// Scanner output before layout: either a finished token or a problem that
/// becomes a `LexError` once it is reached in source order.
#[derive(Debug, Clone, PartialEq)]
enum Raw {
    Token(TokenKind),
    Unknown(char),
    UnterminatedString,
    InvalidNumber,
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn scanner<'a>() -> impl Parser<'a, &'a str, Vec<(Raw, SimpleSpan)>, extra::Err<Simple<'a, char>>> {
    let newline = just('\n').to(Raw::Token(TokenKind::Newline));

    let number = text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(|literal: &str| {
            if literal.contains('.') {
                literal
                    .parse()
                    .map_or(Raw::InvalidNumber, |value| Raw::Token(TokenKind::Float(value)))
            } else {
                literal
                    .parse()
                    .map_or(Raw::InvalidNumber, |value| Raw::Token(TokenKind::Int(value)))
            }
        });

    let string = |quote: char| {
        let escape = just('\\')
            .ignore_then(any().filter(|c: &char| *c != '\n'))
            .map(unescape);
        let plain = any().filter(move |c: &char| *c != quote && *c != '\\' && *c != '\n');
        just(quote)
            .ignore_then(plain.or(escape).repeated().collect::<String>())
            .then(just(quote).or_not())
            .map(|(text, closing)| match closing {
                Some(_) => Raw::Token(TokenKind::Str(text)),
                None => Raw::UnterminatedString,
            })
    };

    let word = text::ident().map(|word: &str| {
        Raw::Token(TokenKind::keyword(word).unwrap_or_else(|| TokenKind::Ident(word.to_string())))
    });

    let compound = choice((
        just("==").to(TokenKind::EqEq),
        just("!=").to(TokenKind::NotEq),
        just("<=").to(TokenKind::LessEq),
        just(">=").to(TokenKind::GreaterEq),
        just("+=").to(TokenKind::PlusEq),
        just("-=").to(TokenKind::MinusEq),
        just("*=").to(TokenKind::StarEq),
        just("/=").to(TokenKind::SlashEq),
        just("%=").to(TokenKind::PercentEq),
    ));

    let single = choice((
        just('+').to(TokenKind::Plus),
        just('-').to(TokenKind::Minus),
        just('*').to(TokenKind::Star),
        just('/').to(TokenKind::Slash),
        just('%').to(TokenKind::Percent),
        just('<').to(TokenKind::Less),
        just('>').to(TokenKind::Greater),
        just('=').to(TokenKind::Assign),
        just('(').to(TokenKind::LParen),
        just(')').to(TokenKind::RParen),
        just('[').to(TokenKind::LBracket),
        just(']').to(TokenKind::RBracket),
        just('{').to(TokenKind::LBrace),
        just('}').to(TokenKind::RBrace),
        just(',').to(TokenKind::Comma),
        just(':').to(TokenKind::Colon),
        just('.').to(TokenKind::Dot),
    ));

    let operator = compound.or(single).map(Raw::Token);
    let unknown = any().map(Raw::Unknown);

    let token = choice((newline, number, string('"'), string('\''), word, operator, unknown))
        .map_with(|raw, e| (raw, e.span()));

    let comment = just('#')
        .then(any().filter(|c: &char| *c != '\n').repeated())
        .ignored();
    let filler = one_of(" \t\r\x0c").ignored().or(comment).repeated();

    filler
        .clone()
        .ignore_then(token.then_ignore(filler).repeated().collect())
        .then_ignore(end())
}

fn indentation_width(prefix: &str) -> usize {
    prefix.chars().fold(0, |width, c| match c {
        '\t' => (width / TAB_WIDTH + 1) * TAB_WIDTH,
        _ => width + 1,
    })
}

/// Turns scanned lexemes into logical lines: NEWLINE at line ends outside
/// brackets, INDENT/DEDENT from the indentation stack.
struct Layout<'a> {
    source: &'a str,
    index: LineIndex<'a>,
    indents: Vec<usize>,
    bracket_depth: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl<'a> Layout<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            index: LineIndex::new(source),
            indents: vec![0],
            bracket_depth: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn run(mut self, scanned: Vec<(Raw, SimpleSpan)>) -> Result<Vec<Token>, LexError> {
        for (raw, range) in scanned {
            let span = self.index.span(range.start, range.end);
            match raw {
                Raw::Token(TokenKind::Newline) => self.newline(span),
                Raw::Token(kind) => self.push(kind, span)?,
                Raw::Unknown(found) => return Err(LexError::UnknownCharacter { found, span }),
                Raw::UnterminatedString => return Err(LexError::UnterminatedString { span }),
                Raw::InvalidNumber => {
                    let literal = self.source[span.start..span.end].to_string();
                    return Err(LexError::InvalidNumber { literal, span });
                }
            }
        }
        Ok(self.finish())
    }

    fn newline(&mut self, span: Span) {
        if self.bracket_depth == 0 && !self.at_line_start {
            self.tokens.push(Token::new(TokenKind::Newline, "\n", span));
            self.at_line_start = true;
        }
    }

    fn push(&mut self, kind: TokenKind, span: Span) -> Result<(), LexError> {
        if self.at_line_start {
            self.indent_to(span)?;
            self.at_line_start = false;
        }
        if kind.opens_bracket() {
            self.bracket_depth += 1;
        } else if kind.closes_bracket() {
            self.bracket_depth = self.bracket_depth.saturating_sub(1);
        }
        let lexeme = &self.source[span.start..span.end];
        self.tokens.push(Token::new(kind, lexeme, span));
        Ok(())
    }

    fn indent_to(&mut self, first: Span) -> Result<(), LexError> {
        let line_start = self.index.line_start(first.line);
        let width = indentation_width(&self.source[line_start..first.start]);
        let marker = Span::new(first.start, first.start, first.line, first.column);

        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.tokens.push(Token::new(TokenKind::Indent, "", marker));
            return Ok(());
        }

        while width < self.indents.last().copied().unwrap_or(0) {
            self.indents.pop();
            self.tokens.push(Token::new(TokenKind::Dedent, "", marker));
        }
        if width != self.indents.last().copied().unwrap_or(0) {
            return Err(LexError::InconsistentDedent { width, span: marker });
        }
        Ok(())
    }

    fn finish(mut self) -> Vec<Token> {
        let end = self.index.span(self.source.len(), self.source.len());
        if !self.at_line_start {
            self.tokens.push(Token::new(TokenKind::Newline, "", end));
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.tokens.push(Token::new(TokenKind::Dedent, "", end));
        }
        self.tokens.push(Token::new(TokenKind::End, "", end));
        debug!(tokens = self.tokens.len(), "tokenized source");
        self.tokens
    }
}

/// Splits source text into tokens, stopping at the first lexical error.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let scanned = scanner().parse(source).into_result().map_err(|errors| {
        let offset = errors.first().map_or(0, |error| error.span().start);
        let index = LineIndex::new(source);
        let found = source[offset..].chars().next().unwrap_or('\0');
        let end = offset + found.len_utf8();
        LexError::UnknownCharacter { found, span: index.span(offset, end) }
    })?;
    Layout::new(source).run(scanned)
}
