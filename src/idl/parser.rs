//! Recursive-descent IDL parser

use std::collections::{BTreeMap, HashSet};

use super::ast::{Definition, Document, Header};
use super::lexer::{Lexer, Token, TokenKind};
use super::SyntaxError;
use crate::schema::{
    BaseType, ConstDef, ConstValue, EnumDef, FieldDef, FieldType, Requiredness, StructDef,
    StructKind, TypedefDef,
};

/// Deepest container type or constant value the parser accepts
pub const MAX_NESTING: usize = 64;

/// IDL parser over a token stream
pub struct Parser<'a> {
    document: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Parse a complete document. `document` is stamped onto every
    /// declaration so merged registries can trace a name back to its source.
    pub fn parse(document: &'a str, source: &str) -> Result<Document, SyntaxError> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Self {
            document,
            tokens,
            pos: 0,
            depth: 0,
        };
        parser.parse_document()
    }

    fn parse_document(&mut self) -> Result<Document, SyntaxError> {
        let mut doc = Document::default();

        loop {
            let keyword = match &self.peek().kind {
                TokenKind::Eof => return Ok(doc),
                TokenKind::Ident(keyword) => keyword.clone(),
                other => {
                    let found = other.describe();
                    return Err(self.error(format!("expected a declaration, found {}", found)));
                }
            };

            match keyword.as_str() {
                "include" => {
                    self.advance();
                    doc.headers.push(Header::Include(self.expect_literal()?));
                }
                "cpp_include" => {
                    self.advance();
                    doc.headers.push(Header::CppInclude(self.expect_literal()?));
                }
                "namespace" => {
                    self.advance();
                    doc.headers.push(self.parse_namespace()?);
                }
                "const" => {
                    self.advance();
                    doc.definitions.push(Definition::Const(self.parse_const()?));
                }
                "typedef" => {
                    self.advance();
                    doc.definitions.push(Definition::Typedef(self.parse_typedef()?));
                }
                "enum" => {
                    self.advance();
                    doc.definitions.push(Definition::Enum(self.parse_enum()?));
                }
                "struct" => {
                    self.advance();
                    doc.definitions
                        .push(Definition::Struct(self.parse_struct(StructKind::Struct)?));
                }
                "union" => {
                    self.advance();
                    doc.definitions
                        .push(Definition::Struct(self.parse_struct(StructKind::Union)?));
                }
                "exception" => {
                    self.advance();
                    doc.definitions
                        .push(Definition::Struct(self.parse_struct(StructKind::Exception)?));
                }
                "service" => {
                    self.advance();
                    doc.definitions.push(self.parse_service()?);
                }
                "senum" => return Err(self.error("senum declarations are not supported".into())),
                other => {
                    return Err(self.error(format!("expected a declaration, found identifier '{}'", other)))
                }
            }

            self.skip_separator();
        }
    }

    // =========================================================================
    // Headers
    // =========================================================================

    fn parse_namespace(&mut self) -> Result<Header, SyntaxError> {
        let scope = if self.eat_punct('*') {
            "*".to_string()
        } else {
            self.expect_ident()?
        };
        let name = match self.peek().kind.clone() {
            TokenKind::Literal(name) => {
                self.advance();
                name
            }
            _ => self.expect_ident()?,
        };
        Ok(Header::Namespace { scope, name })
    }

    // =========================================================================
    // Definitions
    // =========================================================================

    fn parse_const(&mut self) -> Result<ConstDef, SyntaxError> {
        let field_type = self.parse_field_type()?;
        let name = self.expect_ident()?;
        self.expect_punct('=')?;
        let value = self.parse_const_value()?;
        Ok(ConstDef {
            name,
            field_type,
            value,
        })
    }

    fn parse_typedef(&mut self) -> Result<TypedefDef, SyntaxError> {
        let target = self.parse_field_type()?;
        let alias = self.expect_ident()?;
        self.skip_annotations()?;
        Ok(TypedefDef {
            alias,
            target,
            document: self.document.to_string(),
        })
    }

    fn parse_enum(&mut self) -> Result<EnumDef, SyntaxError> {
        let name = self.expect_ident()?;
        self.expect_punct('{')?;

        let mut values: BTreeMap<i32, String> = BTreeMap::new();
        let mut next_ordinal: i64 = 0;
        while !self.eat_punct('}') {
            let (line, column) = (self.peek().line, self.peek().column);
            let label = self.expect_ident()?;
            let ordinal = if self.eat_punct('=') {
                self.expect_int()?
            } else {
                next_ordinal
            };
            let ordinal = i32::try_from(ordinal).map_err(|_| {
                self.error(format!("enum value {}.{} does not fit in i32", name, label))
            })?;
            if let Some(previous) = values.get(&ordinal) {
                return Err(SyntaxError {
                    line,
                    column,
                    message: format!(
                        "duplicate value {} in enum {}: {} and {}",
                        ordinal, name, previous, label
                    ),
                });
            }
            values.insert(ordinal, label);
            next_ordinal = i64::from(ordinal) + 1;

            self.skip_annotations()?;
            self.skip_separator();
        }
        self.skip_annotations()?;

        Ok(EnumDef {
            name,
            values,
            document: self.document.to_string(),
        })
    }

    fn parse_struct(&mut self, kind: StructKind) -> Result<StructDef, SyntaxError> {
        let name = self.expect_ident()?;
        self.eat_ident("xsd_all");
        self.expect_punct('{')?;

        let mut fields: Vec<FieldDef> = Vec::new();
        let mut seen_ids = HashSet::new();
        while !self.eat_punct('}') {
            let (line, column) = (self.peek().line, self.peek().column);
            let field = self.parse_field()?;
            if !seen_ids.insert(field.id) {
                return Err(SyntaxError {
                    line,
                    column,
                    message: format!("duplicate field id {} in {}", field.id, name),
                });
            }
            fields.push(field);
        }
        self.skip_annotations()?;

        Ok(StructDef {
            name,
            kind,
            fields,
            document: self.document.to_string(),
        })
    }

    fn parse_field(&mut self) -> Result<FieldDef, SyntaxError> {
        let id = match self.peek().kind.clone() {
            TokenKind::Int(id) => {
                self.advance();
                self.expect_punct(':')?;
                id
            }
            _ => {
                let found = self.peek().kind.describe();
                return Err(self.error(format!("expected explicit field id, found {}", found)));
            }
        };
        let id = i16::try_from(id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| self.error(format!("field id {} must be between 1 and {}", id, i16::MAX)))?;

        let requiredness = if self.eat_ident("required") {
            Requiredness::Required
        } else if self.eat_ident("optional") {
            Requiredness::Optional
        } else {
            Requiredness::Default
        };

        let field_type = self.parse_field_type()?;
        let name = self.expect_ident()?;
        let default = if self.eat_punct('=') {
            Some(self.parse_const_value()?)
        } else {
            None
        };
        self.eat_ident("xsd_optional");
        self.eat_ident("xsd_nillable");
        self.skip_annotations()?;
        self.skip_separator();

        Ok(FieldDef {
            id,
            name,
            field_type,
            requiredness,
            default,
        })
    }

    fn parse_service(&mut self) -> Result<Definition, SyntaxError> {
        let name = self.expect_ident()?;
        let extends = if self.eat_ident("extends") {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect_punct('{')?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.advance().kind {
                TokenKind::Punct('{') => depth += 1,
                TokenKind::Punct('}') => depth -= 1,
                TokenKind::Eof => {
                    return Err(self.error(format!("unterminated service {}", name)))
                }
                _ => {}
            }
        }
        self.skip_annotations()?;
        Ok(Definition::Service { name, extends })
    }

    // =========================================================================
    // Types and values
    // =========================================================================

    fn parse_field_type(&mut self) -> Result<FieldType, SyntaxError> {
        self.descend()?;
        let field_type = self.parse_field_type_inner();
        self.depth -= 1;
        field_type
    }

    fn parse_field_type_inner(&mut self) -> Result<FieldType, SyntaxError> {
        let name = self.expect_ident()?;
        let field_type = match name.as_str() {
            "map" => {
                self.skip_cpp_type()?;
                self.expect_punct('<')?;
                let key = self.parse_field_type()?;
                self.expect_punct(',')?;
                let value = self.parse_field_type()?;
                self.expect_punct('>')?;
                FieldType::Map(Box::new(key), Box::new(value))
            }
            "set" => {
                self.skip_cpp_type()?;
                self.expect_punct('<')?;
                let inner = self.parse_field_type()?;
                self.expect_punct('>')?;
                FieldType::Set(Box::new(inner))
            }
            "list" => {
                self.expect_punct('<')?;
                let inner = self.parse_field_type()?;
                self.expect_punct('>')?;
                self.skip_cpp_type()?;
                FieldType::List(Box::new(inner))
            }
            other => match BaseType::from_keyword(other) {
                Some(base) => FieldType::Base(base),
                None => FieldType::Named(name),
            },
        };
        self.skip_annotations()?;
        Ok(field_type)
    }

    fn parse_const_value(&mut self) -> Result<ConstValue, SyntaxError> {
        self.descend()?;
        let value = self.parse_const_value_inner();
        self.depth -= 1;
        value
    }

    fn parse_const_value_inner(&mut self) -> Result<ConstValue, SyntaxError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int(value) => Ok(ConstValue::Int(value)),
            TokenKind::Double(value) => Ok(ConstValue::Double(value)),
            TokenKind::Literal(value) => Ok(ConstValue::Literal(value)),
            TokenKind::Ident(name) => Ok(ConstValue::Identifier(name)),
            TokenKind::Punct('[') => {
                let mut items = Vec::new();
                while !self.eat_punct(']') {
                    items.push(self.parse_const_value()?);
                    self.skip_separator();
                }
                Ok(ConstValue::List(items))
            }
            TokenKind::Punct('{') => {
                let mut entries = Vec::new();
                while !self.eat_punct('}') {
                    let key = self.parse_const_value()?;
                    self.expect_punct(':')?;
                    let value = self.parse_const_value()?;
                    entries.push((key, value));
                    self.skip_separator();
                }
                Ok(ConstValue::Map(entries))
            }
            other => Err(SyntaxError {
                line: token.line,
                column: token.column,
                message: format!("expected a constant value, found {}", other.describe()),
            }),
        }
    }

    /// `cpp_type "..."` on containers
    fn skip_cpp_type(&mut self) -> Result<(), SyntaxError> {
        if self.eat_ident("cpp_type") {
            self.expect_literal()?;
        }
        Ok(())
    }

    /// `( key = "value", ... )`
    fn skip_annotations(&mut self) -> Result<(), SyntaxError> {
        if !self.eat_punct('(') {
            return Ok(());
        }
        while !self.eat_punct(')') {
            self.expect_ident()?;
            if self.eat_punct('=') {
                self.expect_literal()?;
            }
            self.skip_separator();
        }
        Ok(())
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn peek(&self) -> &Token {
        // tokenize() always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!("nesting deeper than {} levels", MAX_NESTING)));
        }
        self.depth += 1;
        Ok(())
    }

    fn error(&self, message: String) -> SyntaxError {
        let token = self.peek();
        SyntaxError {
            line: token.line,
            column: token.column,
            message,
        }
    }

    fn skip_separator(&mut self) {
        if !self.eat_punct(',') {
            self.eat_punct(';');
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek().kind == TokenKind::Punct(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, keyword: &str) -> bool {
        if matches!(&self.peek().kind, TokenKind::Ident(name) if name == keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<(), SyntaxError> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            let found = self.peek().kind.describe();
            Err(self.error(format!("expected '{}', found {}", c, found)))
        }
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected identifier, found {}", other.describe()))),
        }
    }

    fn expect_literal(&mut self) -> Result<String, SyntaxError> {
        match self.peek().kind.clone() {
            TokenKind::Literal(value) => {
                self.advance();
                Ok(value)
            }
            other => Err(self.error(format!("expected string literal, found {}", other.describe()))),
        }
    }

    fn expect_int(&mut self) -> Result<i64, SyntaxError> {
        match self.peek().kind.clone() {
            TokenKind::Int(value) => {
                self.advance();
                Ok(value)
            }
            other => Err(self.error(format!("expected integer, found {}", other.describe()))),
        }
    }
}
