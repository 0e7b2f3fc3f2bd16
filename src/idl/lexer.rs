//! IDL tokenizer

use super::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifiers and keywords; may contain dots (`shared.Address`)
    Ident(String),
    Int(i64),
    Double(f64),
    /// Quoted string literal, escapes resolved
    Literal(String),
    Punct(char),
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::Int(value) => format!("integer {}", value),
            TokenKind::Double(value) => format!("number {}", value),
            TokenKind::Literal(value) => format!("literal \"{}\"", value),
            TokenKind::Punct(c) => format!("'{}'", c),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

const PUNCTUATION: &[char] = &['{', '}', '<', '>', '(', ')', '[', ']', ',', ';', ':', '=', '*'];

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input; the last token is always `Eof`
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let (line, column) = (self.line, self.column);
            let kind = match self.peek() {
                None => TokenKind::Eof,
                Some(c) if c == '"' || c == '\'' => self.literal()?,
                Some(c) if c.is_ascii_digit() || c == '+' || c == '-' => self.number()?,
                Some(c) if c == '.' && self.starts_fraction() => self.number()?,
                Some(c) if c.is_ascii_alphabetic() || c == '_' => self.ident(),
                Some(c) if PUNCTUATION.contains(&c) => {
                    self.advance();
                    TokenKind::Punct(c)
                }
                Some(c) => return Err(self.error(format!("unexpected character '{}'", c))),
            };
            let done = kind == TokenKind::Eof;
            tokens.push(Token { kind, line, column });
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn starts_fraction(&self) -> bool {
        let mut ahead = self.chars.clone();
        ahead.next();
        matches!(ahead.peek(), Some(c) if c.is_ascii_digit())
    }

    fn error(&self, message: String) -> SyntaxError {
        SyntaxError {
            line: self.line,
            column: self.column,
            message,
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('#') => self.skip_line(),
                Some('/') => {
                    let mut ahead = self.chars.clone();
                    ahead.next();
                    match ahead.peek() {
                        Some('/') => self.skip_line(),
                        Some('*') => self.skip_block_comment()?,
                        _ => return Err(self.error("unexpected character '/'".to_string())),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.advance() {
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), SyntaxError> {
        self.advance();
        self.advance();
        let mut previous = '\0';
        while let Some(c) = self.advance() {
            if previous == '*' && c == '/' {
                return Ok(());
            }
            previous = c;
        }
        Err(self.error("unterminated block comment".to_string()))
    }

    fn literal(&mut self) -> Result<TokenKind, SyntaxError> {
        let quote = self.advance().unwrap_or('"');
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated string literal".to_string())),
                Some(c) if c == quote => return Ok(TokenKind::Literal(value)),
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(c) => value.push(c),
                    None => return Err(self.error("unterminated string literal".to_string())),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<TokenKind, SyntaxError> {
        let mut text = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            self.advance();
            text.push(sign);
        }

        if self.peek() == Some('0') {
            let mut ahead = self.chars.clone();
            ahead.next();
            if matches!(ahead.peek(), Some('x') | Some('X')) {
                self.advance();
                self.advance();
                let mut digits = String::new();
                while let Some(c) = self.peek().filter(|c| c.is_ascii_hexdigit()) {
                    self.advance();
                    digits.push(c);
                }
                let value = i64::from_str_radix(&digits, 16)
                    .map_err(|_| self.error(format!("invalid hex constant '0x{}'", digits)))?;
                return Ok(TokenKind::Int(if text == "-" { -value } else { value }));
            }
        }

        let mut is_double = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(c),
                '.' => {
                    is_double = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_double = true;
                    text.push(c);
                    self.advance();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        text.push(sign);
                    } else {
                        continue;
                    }
                }
                _ => break,
            }
            self.advance();
        }

        if is_double {
            text.parse::<f64>()
                .map(TokenKind::Double)
                .map_err(|_| self.error(format!("invalid number '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| self.error(format!("invalid integer '{}'", text)))
        }
    }

    fn ident(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        TokenKind::Ident(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_field_tokens() {
        assert_eq!(
            kinds("1: required i32 id,"),
            vec![
                TokenKind::Int(1),
                TokenKind::Punct(':'),
                TokenKind::Ident("required".into()),
                TokenKind::Ident("i32".into()),
                TokenKind::Ident("id".into()),
                TokenKind::Punct(','),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let input = "# hash\n// line\n/* block\n * more */ struct";
        assert_eq!(
            kinds(input),
            vec![TokenKind::Ident("struct".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("-3 0x1F 2.5 1e3 +7"),
            vec![
                TokenKind::Int(-3),
                TokenKind::Int(31),
                TokenKind::Double(2.5),
                TokenKind::Double(1000.0),
                TokenKind::Int(7),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_literals_and_dotted_identifiers() {
        assert_eq!(
            kinds(r#"include "shared.thrift" shared.Address 'it\'s'"#),
            vec![
                TokenKind::Ident("include".into()),
                TokenKind::Literal("shared.thrift".into()),
                TokenKind::Ident("shared.Address".into()),
                TokenKind::Literal("it's".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("struct\n  Account").tokenize().unwrap();
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn test_unterminated_literal() {
        let err = Lexer::new("\"open").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("struct A { 1: i32 id @ }").tokenize().unwrap_err();
        assert_eq!(err.message, "unexpected character '@'");
        assert_eq!(err.line, 1);
    }
}
