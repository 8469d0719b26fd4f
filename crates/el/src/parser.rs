//! Parser for EL expressions and templates.
//!
//! A template is literal text with embedded `${...}` or `#{...}` expressions. Each
//! embedded body is parsed by a recursive descent parser working on the tokens of a
//! [`Lexer`].
//!
//! # Grammar
//!
//! Operator precedence from lowest to highest:
//!
//! ```text
//! expression     → assignment ( ";" expression )?
//! assignment     → lambda ( "=" assignment )?
//! lambda         → conditional ( "->" lambda )?
//! conditional    → logical_or ( "?" expression ":" conditional | "?:" conditional )?
//! logical_or     → logical_and ( ("||" | "or") logical_and )*
//! logical_and    → comparison ( ("&&" | "and") comparison )*
//! comparison     → concat ( ("==" | "!=" | "<" | "<=" | ">" | ">=" | "=~") concat )*
//! concat         → additive ( "+=" additive )*
//! additive       → multiplicative ( ("+" | "-") multiplicative )*
//! multiplicative → term ( ("*" | "/" | "%") term )*
//! term           → simple_term ( "[" expression "]" | "(" arguments ")" | "." identifier )*
//! simple_term    → literal | identifier | "(" expression ")" | "(" names ")"
//!                | "[" list "]" | "{" set_or_map "}"
//!                | ("-" | "!" | "not" | "+" | "empty") term
//! ```
//!
//! Keyword spellings (`div`, `mod`, `eq`, `ne`, `lt`, `le`, `gt`, `ge`, `and`, `or`,
//! `matches`, `cat`) are accepted wherever the symbol is.
//!
//! # Name resolution
//!
//! Identifiers are bound while parsing, in this order: parameters of an enclosing
//! lambda, names bound by the context's variable mapper, implicit objects, functions
//! known to the function mapper (`prefix:local` or unprefixed), and finally plain
//! identifiers that are looked up through the resolver chain at evaluation time.
//!
//! # Examples
//!
//! ```rust
//! use uel::ElContext;
//! use uel::ast::{BinaryOperator, Expr};
//! use uel::parser::Parser;
//!
//! let ctx = ElContext::new();
//!
//! let expr = Parser::new(&ctx, "Hello ${name}!").parse().unwrap();
//! assert!(matches!(expr, Expr::Interpolate { .. }));
//!
//! let expr = Parser::new(&ctx, "1 + 2").parse_expr().unwrap();
//! assert!(matches!(expr, Expr::Binary { op: BinaryOperator::Add, .. }));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::ast::{
    BinaryOperator, CompareOperator, Expr, LogicalOperator, MapEntry, UnaryOperator,
};
use crate::context::ElContext;
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, describe_char, is_ident_start};

type ParseResult<T> = Result<T, ParseError>;

/// Parser for a single source text.
///
/// A parser is consumed by [`Parser::parse`] or [`Parser::parse_expr`], so it cannot
/// be reused after an error.
pub struct Parser<'a> {
    context: &'a ElContext,
    lexer: Lexer<'a>,
    method_expression: bool,
    check_escape: bool,
    /// Nesting depth of call argument lists
    parsing_args: usize,
    /// Parameter names of the enclosing lambdas, innermost last
    lambda_scopes: Vec<HashSet<String>>,
}

impl<'a> Parser<'a> {
    pub fn new(context: &'a ElContext, source: &'a str) -> Self {
        Self {
            context,
            lexer: Lexer::new(source),
            method_expression: false,
            check_escape: true,
            parsing_args: 0,
            lambda_scopes: Vec::new(),
        }
    }

    /// Parse a method expression: a single reference to something invocable, such as
    /// `#{bean.action}`. Operators are only allowed inside call arguments.
    pub fn method_expression(mut self, method_expression: bool) -> Self {
        self.method_expression = method_expression;
        self
    }

    /// Whether `\$`, `\#` and `\\` are unescaped in template text. On by default.
    pub fn check_escape(mut self, check_escape: bool) -> Self {
        self.check_escape = check_escape;
        self
    }

    /// Parses the source as a template.
    pub fn parse(self) -> ParseResult<Expr> {
        self.parse_interpolate()
    }

    /// Parses the source as literal text with embedded `${...}` or `#{...}`
    /// expressions.
    ///
    /// Text without any embedded expression becomes a single string literal (the empty
    /// string for empty input). Otherwise the segments are joined left to right with
    /// [`Expr::Interpolate`].
    pub fn parse_interpolate(mut self) -> ParseResult<Expr> {
        let mut text = String::new();
        let mut expr: Option<Expr> = None;
        let mut delimiter: Option<char> = None;

        while let Some(ch) = self.lexer.read() {
            if self.check_escape && ch == '\\' {
                match self.lexer.read() {
                    Some(escaped @ ('$' | '#' | '\\')) => text.push(escaped),
                    _ => {
                        text.push('\\');
                        self.lexer.unread();
                    }
                }
                continue;
            }

            if (ch != '$' && ch != '#') || self.lexer.peek_char() != Some('{') {
                text.push(ch);
                continue;
            }
            self.lexer.read();

            if self.method_expression && (expr.is_some() || !text.is_empty()) {
                return Err(self.invalid_method_expression());
            }
            match delimiter {
                Some(open) if open != ch => {
                    return Err(self.lexer.error(format!(
                        "Mixed '#' and '$'. Expected '{open}' at '{ch}'"
                    )));
                }
                _ => delimiter = Some(ch),
            }

            if !text.is_empty() {
                expr = Some(append(expr, Expr::String(std::mem::take(&mut text))));
            }

            let body = self.read_embedded_body()?;
            let right = self.sub_parser(&body).parse_expr()?;
            expr = Some(append(expr, right));
        }

        if !text.is_empty() {
            if self.method_expression && expr.is_some() {
                return Err(self.invalid_method_expression());
            }
            expr = Some(append(expr, Expr::String(text)));
        }

        Ok(expr.unwrap_or_else(|| Expr::String(String::new())))
    }

    /// Reads the body of an embedded expression up to its closing `}`. Nested braces
    /// are balanced and quoted strings are copied verbatim, so a `}` inside either does
    /// not end the body.
    fn read_embedded_body(&mut self) -> ParseResult<String> {
        let mut body = String::new();
        let mut depth = 0usize;

        while let Some(ch) = self.lexer.read() {
            match ch {
                '}' if depth == 0 => return Ok(body),
                '{' => depth += 1,
                '}' => depth -= 1,
                '\'' | '"' => {
                    body.push(ch);
                    self.copy_quoted(ch, &mut body);
                    continue;
                }
                _ => {}
            }
            body.push(ch);
        }

        Err(self.lexer.error("expected '}' at end of EL expression"))
    }

    fn copy_quoted(&mut self, quote: char, body: &mut String) {
        while let Some(ch) = self.lexer.read() {
            body.push(ch);
            if ch == quote {
                return;
            }
            if ch == '\\' {
                if let Some(escaped) = self.lexer.read() {
                    body.push(escaped);
                }
            }
        }
    }

    fn sub_parser<'b>(&self, source: &'b str) -> Parser<'b>
    where
        'a: 'b,
    {
        Parser {
            context: self.context,
            lexer: Lexer::new(source),
            method_expression: self.method_expression,
            check_escape: self.check_escape,
            parsing_args: 0,
            lambda_scopes: Vec::new(),
        }
    }

    /// Parses the whole source as a single expression without template delimiters.
    pub fn parse_expr(mut self) -> ParseResult<Expr> {
        let expr = self.expression()?;
        match self.lexer.scan_token()? {
            Token::Eof => Ok(expr),
            token => Err(self.lexer.error(format!(
                "Unexpected {} after end of expression.",
                token.describe()
            ))),
        }
    }

    fn invalid_method_expression(&self) -> ParseError {
        self.lexer.error("Invalid method expression")
    }

    /// Rejects operators at the top level of a method expression.
    fn check_method_operator(&self) -> ParseResult<()> {
        if self.method_expression && self.parsing_args == 0 {
            Err(self.invalid_method_expression())
        } else {
            Ok(())
        }
    }

    fn expect(&mut self, expected: Token, message: &str) -> ParseResult<()> {
        let token = self.lexer.scan_token()?;
        if token == expected {
            Ok(())
        } else {
            Err(self
                .lexer
                .error(message.replace("{}", &token.describe())))
        }
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        let left = self.assignment()?;
        match self.lexer.scan_token()? {
            Token::Semicolon => Ok(Expr::Semicolon {
                left: Box::new(left),
                right: Box::new(self.expression()?),
            }),
            _ => {
                self.lexer.unread_token();
                Ok(left)
            }
        }
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let target = self.lambda()?;
        match self.lexer.scan_token()? {
            Token::Assign => Ok(Expr::Assign {
                target: Box::new(target),
                value: Box::new(self.assignment()?),
            }),
            _ => {
                self.lexer.unread_token();
                Ok(target)
            }
        }
    }

    fn lambda(&mut self) -> ParseResult<Expr> {
        let left = self.conditional()?;
        if self.lexer.scan_token()? != Token::Lambda {
            self.lexer.unread_token();
            return Ok(left);
        }

        let params = match &left {
            Expr::LambdaParams(params) => params.clone(),
            other => match other.lambda_param_name() {
                Some(name) => vec![name.to_string()],
                None => {
                    return Err(self.lexer.error(format!(
                        "Expected lambda parameters before `->' but found `{other}'."
                    )));
                }
            },
        };

        self.lambda_scopes.push(params.iter().cloned().collect());
        let body = self.lambda();
        self.lambda_scopes.pop();

        Ok(Expr::Lambda {
            params,
            body: Arc::new(body?),
        })
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let test = self.logical_or()?;
        match self.lexer.scan_token()? {
            Token::Question => {
                self.check_method_operator()?;
                let then = self.expression()?;
                self.expect(
                    Token::Colon,
                    "Expected ':' at {}.  Conditional syntax is 'expr ? expr : expr'.",
                )?;
                let otherwise = self.conditional()?;
                Ok(Expr::Conditional {
                    test: Box::new(test),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                })
            }
            Token::Elvis => {
                self.check_method_operator()?;
                let default = self.conditional()?;
                Ok(Expr::ConditionalNull {
                    value: Box::new(test),
                    default: Box::new(default),
                })
            }
            _ => {
                self.lexer.unread_token();
                Ok(test)
            }
        }
    }

    fn logical_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.logical_and()?;
        while self.lexer.scan_token()? == Token::Or {
            self.check_method_operator()?;
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.lexer.unread_token();
        Ok(left)
    }

    fn logical_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.comparison()?;
        while self.lexer.scan_token()? == Token::And {
            self.check_method_operator()?;
            let right = self.comparison()?;
            left = Expr::Logical {
                op: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.lexer.unread_token();
        Ok(left)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.concat()?;
        loop {
            let op = match self.lexer.scan_token()? {
                Token::Eq => CompareOperator::Eq,
                Token::Ne => CompareOperator::Ne,
                Token::Lt => CompareOperator::Lt,
                Token::Le => CompareOperator::Le,
                Token::Gt => CompareOperator::Gt,
                Token::Ge => CompareOperator::Ge,
                Token::Matches => CompareOperator::Matches,
                _ => {
                    self.lexer.unread_token();
                    return Ok(left);
                }
            };
            self.check_method_operator()?;
            let right = self.concat()?;
            left = Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn concat(&mut self) -> ParseResult<Expr> {
        let mut left = self.additive()?;
        while self.lexer.scan_token()? == Token::Concat {
            self.check_method_operator()?;
            let right = self.additive()?;
            left = Expr::Concat {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.lexer.unread_token();
        Ok(left)
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.lexer.scan_token()? {
                Token::Add => BinaryOperator::Add,
                Token::Sub => BinaryOperator::Sub,
                _ => {
                    self.lexer.unread_token();
                    return Ok(left);
                }
            };
            self.check_method_operator()?;
            let right = self.multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.term()?;
        loop {
            let op = match self.lexer.scan_token()? {
                Token::Mul => BinaryOperator::Mul,
                Token::Div => BinaryOperator::Div,
                Token::Mod => BinaryOperator::Mod,
                _ => {
                    self.lexer.unread_token();
                    return Ok(left);
                }
            };
            self.check_method_operator()?;
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    /// A simple term followed by any number of `[index]`, `(args)` and `.name`
    /// suffixes.
    fn term(&mut self) -> ParseResult<Expr> {
        let mut term = self.simple_term()?;

        loop {
            match self.lexer.scan_token()? {
                Token::LBracket => {
                    let index = self.expression()?;
                    self.expect(
                        Token::RBracket,
                        "Expected `]' at {}.  All open array braces must have matching closing brace.",
                    )?;
                    term = term.create_field(index);
                }
                Token::LParen => {
                    let args = self.args()?;
                    let rendered = term.to_string();
                    term = term.create_method(args).ok_or_else(|| {
                        self.lexer.error(format!(
                            "Method call not supported in this context `{rendered}'."
                        ))
                    })?;
                }
                Token::Dot => {
                    self.lexer.skip_whitespace();
                    let name = match self.lexer.read() {
                        Some(ch) if is_ident_start(ch) => self.lexer.read_name(ch),
                        other => {
                            return Err(self.lexer.error(format!(
                                "Expected identifier at {}.  Field references must be identifiers.",
                                describe_char(other)
                            )));
                        }
                    };
                    term = term.create_field(Expr::String(name));
                }
                Token::Not if term.is_constant() => {
                    return Err(self.lexer.error("invalid expression"));
                }
                _ => {
                    self.lexer.unread_token();
                    return Ok(term);
                }
            }
        }
    }

    /// Parses call arguments after the opening `(`, including the closing `)`.
    fn args(&mut self) -> ParseResult<Vec<Expr>> {
        self.parsing_args += 1;
        let args = self.args_inner();
        self.parsing_args -= 1;
        args
    }

    fn args_inner(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();

        self.lexer.skip_whitespace();
        if self.lexer.peek_char() == Some(')') {
            self.lexer.read();
            return Ok(args);
        }

        loop {
            args.push(self.expression()?);
            match self.lexer.scan_token()? {
                Token::Comma => continue,
                Token::RParen => return Ok(args),
                token => {
                    return Err(self.lexer.error(format!(
                        "Expected `)' at {}.  All functions must have matching closing parenthesis.",
                        token.describe()
                    )));
                }
            }
        }
    }

    fn simple_term(&mut self) -> ParseResult<Expr> {
        self.lexer.skip_whitespace();
        let ch = self.lexer.read();

        match ch {
            Some('0'..='9') => {
                self.check_method_operator()?;
                self.number(ch)
            }
            Some('.') if self.lexer.peek_char().is_some_and(|c| c.is_ascii_digit()) => {
                self.check_method_operator()?;
                self.number(ch)
            }
            Some('-') => {
                self.check_method_operator()?;
                Ok(unary(UnaryOperator::Minus, self.term()?))
            }
            Some('!') => {
                self.check_method_operator()?;
                Ok(unary(UnaryOperator::Not, self.term()?))
            }
            Some('+') => {
                self.check_method_operator()?;
                self.term()
            }
            Some('(') => self.parenthesized(),
            Some('[') => self.list(),
            Some('{') => self.set_or_map(),
            Some(quote @ ('\'' | '"')) => self.string(quote),
            Some(first) if is_ident_start(first) => self.identifier(first),
            other => Err(self
                .lexer
                .error(format!("Unexpected character at {}.", describe_char(other)))),
        }
    }

    /// Scans a number literal whose first character has been read.
    ///
    /// Integers without fraction or exponent become [`Expr::Long`] and must fit in an
    /// `i64`. Everything else becomes [`Expr::Double`] with the usual rounding.
    fn number(&mut self, first: Option<char>) -> ParseResult<Expr> {
        let mut text = String::new();
        let mut ch = first;

        while let Some(digit) = ch.filter(char::is_ascii_digit) {
            text.push(digit);
            ch = self.lexer.read();
        }

        if !matches!(ch, Some('.' | 'e' | 'E')) {
            self.lexer.unread();
            return text
                .parse::<i64>()
                .map(Expr::Long)
                .map_err(|_| self.lexer.error("number too large"));
        }

        if ch == Some('.') {
            text.push('.');
            ch = self.lexer.read();
            while let Some(digit) = ch.filter(char::is_ascii_digit) {
                text.push(digit);
                ch = self.lexer.read();
            }
        }

        if matches!(ch, Some('e' | 'E')) {
            let mut exponent = String::new();

            ch = self.lexer.read();
            if let Some(sign @ ('-' | '+')) = ch {
                exponent.push(sign);
                ch = self.lexer.read();
            }
            while let Some(digit) = ch.filter(char::is_ascii_digit) {
                exponent.push(digit);
                ch = self.lexer.read();
            }
            // `1e` and `1e-` carry no exponent digits and read as a plain `1.0`
            if exponent.chars().any(|c| c.is_ascii_digit()) {
                text.push('e');
                text.push_str(&exponent);
            }
        }

        self.lexer.unread();
        text.parse::<f64>()
            .map(Expr::Double)
            .map_err(|_| self.lexer.error(format!("invalid number `{text}'")))
    }

    /// Scans a string literal whose opening quote has been read.
    ///
    /// A backslash takes the next character literally. A quote directly following the
    /// closing quote is kept as a literal quote and the string continues.
    fn string(&mut self, quote: char) -> ParseResult<Expr> {
        let mut text = String::new();

        loop {
            match self.lexer.read() {
                None => return Err(self.lexer.error("Unterminated string literal")),
                Some('\\') => match self.lexer.read() {
                    Some(escaped) => text.push(escaped),
                    None => return Err(self.lexer.error("Unterminated string literal")),
                },
                Some(ch) if ch != quote => text.push(ch),
                Some(_) => match self.lexer.read() {
                    Some(ch) if ch == quote => text.push(ch),
                    _ => {
                        self.lexer.unread();
                        return Ok(Expr::String(text));
                    }
                },
            }
        }
    }

    /// `(expr)`, `()` and `(a, b)` after the opening parenthesis. The latter two are
    /// lambda parameter lists.
    fn parenthesized(&mut self) -> ParseResult<Expr> {
        self.lexer.skip_whitespace();
        if self.lexer.peek_char() == Some(')') {
            self.lexer.read();
            return Ok(Expr::LambdaParams(Vec::new()));
        }

        let expr = self.expression()?;
        self.lexer.skip_whitespace();
        match self.lexer.read() {
            Some(')') => Ok(expr),
            Some(',') => {
                let mut names = vec![expr];
                names.extend(self.args()?);
                let params = names
                    .iter()
                    .map(|name| {
                        name.lambda_param_name().map(str::to_string).ok_or_else(|| {
                            self.lexer.error(format!(
                                "Expected lambda parameter name but found `{name}'."
                            ))
                        })
                    })
                    .collect::<ParseResult<Vec<_>>>()?;
                Ok(Expr::LambdaParams(params))
            }
            other => Err(self.lexer.error(format!(
                "Expected `)' at {}.  All open parentheses must have matching closing parentheses.",
                describe_char(other)
            ))),
        }
    }

    fn list(&mut self) -> ParseResult<Expr> {
        let mut items = Vec::new();

        self.lexer.skip_whitespace();
        if self.lexer.peek_char() == Some(']') {
            self.lexer.read();
            return Ok(Expr::List(items));
        }

        loop {
            items.push(self.expression()?);
            match self.lexer.scan_token()? {
                Token::Comma => continue,
                Token::RBracket => return Ok(Expr::List(items)),
                token => {
                    return Err(self
                        .lexer
                        .error(format!("Expected ']' at {}.", token.describe())));
                }
            }
        }
    }

    /// `{a, b}` is a set and `{k: v}` a map; the separator after the first element
    /// decides, and every further element must have the same shape. `{}` is an empty
    /// set.
    fn set_or_map(&mut self) -> ParseResult<Expr> {
        let mut items = Vec::new();
        let mut entries = Vec::new();

        self.lexer.skip_whitespace();
        if self.lexer.peek_char() == Some('}') {
            self.lexer.read();
            return Ok(Expr::Set(items));
        }

        let mut is_map: Option<bool> = None;
        loop {
            let key = self.expression()?;
            let mut token = self.lexer.scan_token()?;
            let entry_is_map = token == Token::Colon;

            match *is_map.get_or_insert(entry_is_map) {
                true if entry_is_map => {
                    let value = self.expression()?;
                    entries.push(MapEntry { key, value });
                    token = self.lexer.scan_token()?;
                }
                true => {
                    return Err(self
                        .lexer
                        .error(format!("Expected ':' at {}.", token.describe())));
                }
                false if entry_is_map => {
                    return Err(self
                        .lexer
                        .error(format!("Unexpected ':' at {}.", token.describe())));
                }
                false => items.push(key),
            }

            match token {
                Token::Comma => continue,
                Token::RBrace if is_map == Some(true) => return Ok(Expr::Map(entries)),
                Token::RBrace => return Ok(Expr::Set(items)),
                token => {
                    return Err(self
                        .lexer
                        .error(format!("Expected '}}' at {}.", token.describe())));
                }
            }
        }
    }

    fn identifier(&mut self, first: char) -> ParseResult<Expr> {
        let name = self.lexer.read_name(first);

        if let Some(function) = self.qualified_function(&name) {
            return Ok(function);
        }

        match name.as_str() {
            "null" => return Ok(Expr::Null),
            "true" => return Ok(Expr::Boolean(true)),
            "false" => return Ok(Expr::Boolean(false)),
            "not" => return Ok(unary(UnaryOperator::Not, self.term()?)),
            "empty" => return Ok(unary(UnaryOperator::Empty, self.term()?)),
            _ => {}
        }

        if self
            .lambda_scopes
            .iter()
            .any(|scope| scope.contains(&name))
        {
            return Ok(Expr::LambdaVar(name));
        }

        if let Some(expression) = self.context.variable_mapper().resolve_variable(&name) {
            return Ok(Expr::Variable { name, expression });
        }

        if self.context.is_implicit_object(&name) {
            return Ok(Expr::Implicit(name));
        }

        if let Some(function) = self.context.functions().resolve("", &name) {
            return Ok(Expr::Function { name, function });
        }

        Ok(Expr::Identifier(name))
    }

    /// Consumes `:local` after `prefix` if the function mapper knows `prefix:local`.
    fn qualified_function(&mut self, prefix: &str) -> Option<Expr> {
        if self.lexer.peek_char() != Some(':') {
            return None;
        }
        let checkpoint = self.lexer.index();
        self.lexer.read();

        if let Some(first) = self.lexer.read().filter(|ch| is_ident_start(*ch)) {
            let local = self.lexer.read_name(first);
            if let Some(function) = self.context.functions().resolve(prefix, &local) {
                return Some(Expr::Function {
                    name: format!("{prefix}:{local}"),
                    function,
                });
            }
        }

        self.lexer.reset(checkpoint);
        None
    }
}

fn unary(op: UnaryOperator, expr: Expr) -> Expr {
    Expr::Unary {
        op,
        expr: Box::new(expr),
    }
}

fn append(left: Option<Expr>, right: Expr) -> Expr {
    match left {
        Some(left) => Expr::Interpolate {
            left: Box::new(left),
            right: Box::new(right),
        },
        None => right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        let ctx = ElContext::new();
        Parser::new(&ctx, source).parse_expr().unwrap()
    }

    #[test]
    fn numbers() {
        assert_eq!(expr("42"), Expr::Long(42));
        assert_eq!(expr("4.25"), Expr::Double(4.25));
        assert_eq!(expr(".5"), Expr::Double(0.5));
        assert_eq!(expr("1e3"), Expr::Double(1000.0));
        assert_eq!(expr("15E-1"), Expr::Double(1.5));
        assert_eq!(expr("2.5e+2"), Expr::Double(250.0));
    }

    #[test]
    fn long_overflow_is_an_error() {
        let ctx = ElContext::new();
        let err = Parser::new(&ctx, "99999999999999999999")
            .parse_expr()
            .unwrap_err();
        assert_eq!(err.message, "number too large");
    }

    #[test]
    fn string_quote_handling() {
        assert_eq!(expr(r"'a\'b'"), Expr::String("a'b".into()));
        assert_eq!(expr("'it''s'"), Expr::String("it's".into()));
        assert_eq!(expr(r"'a\''"), Expr::String("a'".into()));
        assert_eq!(expr(r#""say \"hi\"""#), Expr::String("say \"hi\"".into()));
    }

    #[test]
    fn qualified_names_fall_back_to_identifiers() {
        let ctx = ElContext::new();
        let parsed = Parser::new(&ctx, "{a:b}").parse_expr().unwrap();
        assert_eq!(
            parsed,
            Expr::Map(vec![MapEntry {
                key: Expr::Identifier("a".into()),
                value: Expr::Identifier("b".into()),
            }])
        );

        let parsed = Parser::new(&ctx, "fn:trim").parse_expr().unwrap();
        assert!(matches!(parsed, Expr::Function { ref name, .. } if name == "fn:trim"));
    }

    #[test]
    fn lambda_scope_is_popped_after_body() {
        let parsed = expr("(x -> x)(1) + x");
        let Expr::Binary { left, right, .. } = parsed else {
            panic!("expected binary expression");
        };
        assert!(matches!(*left, Expr::Call { .. }));
        assert_eq!(*right, Expr::Identifier("x".into()));
    }
}
