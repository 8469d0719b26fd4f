//! Token scanner used by the [`Parser`](crate::parser::Parser).
//!
//! The lexer works on a cursor into the source text. It offers two levels of
//! pushback: one character (`read`/`unread`), used by the parser for literals and
//! template text, and one token (`scan_token`/`unread_token`), used by the precedence
//! climbing loops. Unreading a token rewinds to where the scan started, before any
//! skipped whitespace, so a following character read sees exactly what the token scan
//! saw.

use nom::bytes::complete::take_while;
use nom::character::complete::multispace0;
use nom::error::Error as NomError;

use crate::error::ParseError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// End of input
    Eof,
    /// An identifier that is not a keyword operator
    Identifier(String),
    /// `+` or `cat`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/` or `div`
    Div,
    /// `%` or `mod`
    Mod,
    /// `==` or `eq`
    Eq,
    /// `!=` or `ne`
    Ne,
    /// `<` or `lt`
    Lt,
    /// `<=` or `le`
    Le,
    /// `>` or `gt`
    Gt,
    /// `>=` or `ge`
    Ge,
    /// `&&` or `and`
    And,
    /// `||` or `or`
    Or,
    /// `!`
    Not,
    /// `=~` or `matches`
    Matches,
    /// `+=`
    Concat,
    /// `=`
    Assign,
    /// `->`
    Lambda,
    /// `;`
    Semicolon,
    /// `?`
    Question,
    /// `?:`
    Elvis,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// Any other character
    Char(char),
}

impl Token {
    /// Returns the source text of the token.
    pub fn symbol(&self) -> String {
        let symbol = match self {
            Token::Eof => "",
            Token::Identifier(name) => return name.clone(),
            Token::Char(ch) => return ch.to_string(),
            Token::Add => "+",
            Token::Sub => "-",
            Token::Mul => "*",
            Token::Div => "/",
            Token::Mod => "%",
            Token::Eq => "==",
            Token::Ne => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::And => "&&",
            Token::Or => "||",
            Token::Not => "!",
            Token::Matches => "=~",
            Token::Concat => "+=",
            Token::Assign => "=",
            Token::Lambda => "->",
            Token::Semicolon => ";",
            Token::Question => "?",
            Token::Elvis => "?:",
            Token::Colon => ":",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
        };
        symbol.to_string()
    }

    /// Describes the token for an error message: `` `x' ``, `end of line` or
    /// `end of file`.
    pub fn describe(&self) -> String {
        match self {
            Token::Eof => describe_char(None),
            Token::Char(ch) => describe_char(Some(*ch)),
            other => format!("`{}'", other.symbol()),
        }
    }
}

/// Describes a character for an error message.
pub fn describe_char(ch: Option<char>) -> String {
    match ch {
        None => "end of file".to_string(),
        Some('\n') => "end of line".to_string(),
        Some(ch) => format!("`{ch}'"),
    }
}

/// Returns true if the character can start an identifier.
pub fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

/// Returns true if the character can continue an identifier.
pub fn is_ident_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

fn keyword(name: String) -> Token {
    match name.as_str() {
        "div" => Token::Div,
        "mod" => Token::Mod,
        "eq" => Token::Eq,
        "ne" => Token::Ne,
        "lt" => Token::Lt,
        "le" => Token::Le,
        "gt" => Token::Gt,
        "ge" => Token::Ge,
        "and" => Token::And,
        "or" => Token::Or,
        "matches" => Token::Matches,
        "cat" => Token::Add,
        _ => Token::Identifier(name),
    }
}

/// Cursor based scanner over an expression source.
#[derive(Debug)]
pub struct Lexer<'a> {
    source: &'a str,
    /// Byte offset of the next character
    index: usize,
    /// Offset before the last character read, restored by `unread`
    last_char: usize,
    /// Token pushed back by `unread_token`
    peek: Option<Token>,
    last_token: Token,
    last_index_start: usize,
    last_index_end: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            index: 0,
            last_char: 0,
            peek: None,
            last_token: Token::Eof,
            last_index_start: 0,
            last_index_end: 0,
        }
    }

    /// The complete source text.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// The unread part of the source text.
    pub fn rest(&self) -> &'a str {
        &self.source[self.index..]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Moves the cursor back to an offset previously returned by [`Lexer::index`].
    pub fn reset(&mut self, index: usize) {
        self.peek = None;
        self.index = index;
        self.last_char = index;
    }

    /// Reads the next character. Discards a pushed back token.
    pub fn read(&mut self) -> Option<char> {
        self.peek = None;
        self.last_char = self.index;
        let ch = self.rest().chars().next()?;
        self.index += ch.len_utf8();
        Some(ch)
    }

    /// Unreads the last character read. Only one character of pushback is kept.
    pub fn unread(&mut self) {
        self.index = self.last_char;
    }

    /// Returns the next character without consuming it.
    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Skips spaces, tabs and line breaks.
    pub fn skip_whitespace(&mut self) {
        if let Ok((rest, _)) = multispace0::<_, NomError<&str>>(self.rest()) {
            self.advance_to(rest);
        }
    }

    /// Reads an identifier whose first character has already been read.
    pub fn read_name(&mut self, first: char) -> String {
        let mut name = String::from(first);
        if let Ok((rest, part)) = take_while::<_, _, NomError<&str>>(is_ident_part)(self.rest())
        {
            name.push_str(part);
            self.advance_to(rest);
        }
        name
    }

    fn advance_to(&mut self, rest: &str) {
        self.index = self.source.len() - rest.len();
        self.last_char = self.index;
    }

    /// Scans the next token, or returns the token pushed back by
    /// [`Lexer::unread_token`].
    pub fn scan_token(&mut self) -> Result<Token, ParseError> {
        self.last_index_start = self.index;

        let token = match self.peek.take() {
            Some(token) => {
                self.index = self.last_index_end;
                token
            }
            None => self.lex_token()?,
        };

        self.last_token = token.clone();
        self.last_index_end = self.index;
        Ok(token)
    }

    /// Pushes the last scanned token back.
    pub fn unread_token(&mut self) {
        self.index = self.last_index_start;
        self.peek = Some(self.last_token.clone());
    }

    fn lex_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();

        let Some(ch) = self.read() else {
            return Ok(Token::Eof);
        };

        let token = match ch {
            '+' => self.either('=', Token::Concat, Token::Add),
            '-' => self.either('>', Token::Lambda, Token::Sub),
            '*' => Token::Mul,
            '/' => Token::Div,
            '%' => Token::Mod,
            '!' => self.either('=', Token::Ne, Token::Not),
            '=' => match self.read() {
                Some('=') => Token::Eq,
                Some('~') => Token::Matches,
                _ => {
                    self.unread();
                    Token::Assign
                }
            },
            '&' => match self.read() {
                Some('&') => Token::And,
                other => {
                    return Err(
                        self.error(format!("expected '&&' at '&{}'", describe_char(other)))
                    );
                }
            },
            '|' => match self.read() {
                Some('|') => Token::Or,
                other => {
                    return Err(
                        self.error(format!("expected '||' at '|{}'", describe_char(other)))
                    );
                }
            },
            '<' => self.either('=', Token::Le, Token::Lt),
            '>' => self.either('=', Token::Ge, Token::Gt),
            '?' => self.either(':', Token::Elvis, Token::Question),
            ';' => Token::Semicolon,
            ':' => Token::Colon,
            ',' => Token::Comma,
            '.' => Token::Dot,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ch if is_ident_start(ch) => keyword(self.read_name(ch)),
            other => Token::Char(other),
        };

        Ok(token)
    }

    /// Returns `matched` if the next character is `next`, otherwise leaves it unread.
    fn either(&mut self, next: char, matched: Token, otherwise: Token) -> Token {
        if self.read() == Some(next) {
            matched
        } else {
            self.unread();
            otherwise
        }
    }

    /// Creates a parse error for this source.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.scan_token().unwrap();
            if token == Token::Eof {
                return tokens;
            }
            tokens.push(token);
        }
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            tokens("+= -> != == =~ && || <= >= ?: = < > ? !"),
            vec![
                Token::Concat,
                Token::Lambda,
                Token::Ne,
                Token::Eq,
                Token::Matches,
                Token::And,
                Token::Or,
                Token::Le,
                Token::Ge,
                Token::Elvis,
                Token::Assign,
                Token::Lt,
                Token::Gt,
                Token::Question,
                Token::Not,
            ]
        );
    }

    #[test]
    fn single_character_prefixes_are_pushed_back() {
        assert_eq!(
            tokens("a+b-c"),
            vec![
                Token::Identifier("a".into()),
                Token::Add,
                Token::Identifier("b".into()),
                Token::Sub,
                Token::Identifier("c".into()),
            ]
        );
    }

    #[test]
    fn keyword_operators() {
        assert_eq!(
            tokens("div mod eq ne lt le gt ge and or matches cat"),
            vec![
                Token::Div,
                Token::Mod,
                Token::Eq,
                Token::Ne,
                Token::Lt,
                Token::Le,
                Token::Gt,
                Token::Ge,
                Token::And,
                Token::Or,
                Token::Matches,
                Token::Add,
            ]
        );
        // keywords are case sensitive
        assert_eq!(tokens("DIV"), vec![Token::Identifier("DIV".into())]);
    }

    #[test]
    fn lone_ampersand_is_an_error() {
        let mut lexer = Lexer::new("a & b");
        lexer.scan_token().unwrap();
        let err = lexer.scan_token().unwrap_err();
        assert_eq!(err.message, "expected '&&' at '&` ''");
        assert_eq!(err.expression, "a & b");

        let mut lexer = Lexer::new("|");
        let err = lexer.scan_token().unwrap_err();
        assert_eq!(err.message, "expected '||' at '|end of file'");
    }

    #[test]
    fn unread_token_restores_whitespace() {
        let mut lexer = Lexer::new("a   ==  b");
        assert_eq!(
            lexer.scan_token().unwrap(),
            Token::Identifier("a".into())
        );
        assert_eq!(lexer.scan_token().unwrap(), Token::Eq);
        lexer.unread_token();
        assert_eq!(lexer.rest(), "   ==  b");
        assert_eq!(lexer.scan_token().unwrap(), Token::Eq);
        assert_eq!(lexer.rest(), "  b");

        // a character read after an unread token sees the token's text again
        lexer.scan_token().unwrap();
        lexer.unread_token();
        lexer.skip_whitespace();
        assert_eq!(lexer.read(), Some('b'));
    }

    #[test]
    fn character_pushback() {
        let mut lexer = Lexer::new("xé");
        assert_eq!(lexer.read(), Some('x'));
        assert_eq!(lexer.read(), Some('é'));
        lexer.unread();
        assert_eq!(lexer.read(), Some('é'));
        assert_eq!(lexer.read(), None);
        lexer.unread();
        assert_eq!(lexer.read(), None);
    }

    #[test]
    fn describes_tokens() {
        assert_eq!(Token::Eof.describe(), "end of file");
        assert_eq!(Token::Char('\n').describe(), "end of line");
        assert_eq!(Token::Char('#').describe(), "`#'");
        assert_eq!(Token::RParen.describe(), "`)'");
        assert_eq!(Token::Identifier("foo".into()).describe(), "`foo'");
    }
}
