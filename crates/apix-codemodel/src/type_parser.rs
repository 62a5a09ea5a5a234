//! Parser for C++ type spellings (`const QMap<QString, Foo*>&`, `int[4]`).

use crate::error::CodeModelError;
use crate::type_info::{ReferenceType, TypeInfo};

const BUILTIN_WORDS: &[&str] = &[
    "unsigned", "signed", "short", "long", "int", "char", "double", "float", "bool", "void",
    "wchar_t",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Scope,
    Less,
    Greater,
    Comma,
    Star,
    Amp,
    Array(String),
    Paren,
    Ellipsis,
}

impl TypeInfo {
    /// Parse a C++ type spelling into a [`TypeInfo`].
    ///
    /// # Errors
    /// Returns [`CodeModelError::TypeParse`] for unbalanced templates,
    /// unterminated arrays or stray tokens.
    pub fn parse(input: &str) -> Result<Self, CodeModelError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            input,
            tokens,
            pos: 0,
        };
        let info = parser.parse_type()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.error("unexpected trailing tokens"));
        }
        Ok(info)
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CodeModelError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            ':' if chars.get(i + 1) == Some(&':') => {
                tokens.push(Token::Scope);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Less);
                i += 1;
            }
            '>' => {
                tokens.push(Token::Greater);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '&' => {
                tokens.push(Token::Amp);
                i += 1;
            }
            '(' => {
                tokens.push(Token::Paren);
                // Everything after the first parenthesis belongs to the
                // function pointer signature, which is never resolved.
                break;
            }
            '.' if chars.get(i + 1) == Some(&'.') && chars.get(i + 2) == Some(&'.') => {
                tokens.push(Token::Ellipsis);
                i += 3;
            }
            '[' => {
                let start = i + 1;
                let Some(len) = chars[start..].iter().position(|&ch| ch == ']') else {
                    return Err(CodeModelError::TypeParse {
                        input: input.to_string(),
                        message: "unterminated array dimension".to_string(),
                    });
                };
                let dim: String = chars[start..start + len].iter().collect();
                tokens.push(Token::Array(dim.trim().to_string()));
                i = start + len + 1;
            }
            c if c.is_alphanumeric() || c == '_' || c == '-' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(CodeModelError::TypeParse {
                    input: input.to_string(),
                    message: format!("unexpected character '{other}'"),
                });
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> CodeModelError {
        CodeModelError::TypeParse {
            input: self.input.to_string(),
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_qualifiers(&mut self, info: &mut TypeInfo) {
        while let Some(Token::Ident(word)) = self.peek() {
            match word.as_str() {
                "const" => info.is_constant = true,
                "volatile" => info.is_volatile = true,
                "struct" | "class" | "enum" | "typename" | "union" => {}
                _ => break,
            }
            self.pos += 1;
        }
    }

    fn parse_type(&mut self) -> Result<TypeInfo, CodeModelError> {
        let mut info = TypeInfo::default();
        self.eat_qualifiers(&mut info);

        if self.peek() == Some(&Token::Ellipsis) {
            self.pos += 1;
            info.qualified_name.push("...".to_string());
            return Ok(info);
        }

        if self.peek() == Some(&Token::Scope) {
            // Leading `::` names the global scope.
            self.pos += 1;
        }
        self.parse_name(&mut info)?;
        self.eat_qualifiers(&mut info);

        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    info.indirections += 1;
                    // `T* const` qualifies the pointer, not the pointee.
                    let mut pointer_cv = TypeInfo::default();
                    self.eat_qualifiers(&mut pointer_cv);
                }
                Some(Token::Amp) => {
                    self.pos += 1;
                    info.reference_type = match info.reference_type {
                        ReferenceType::None => ReferenceType::LValue,
                        _ => ReferenceType::RValue,
                    };
                }
                Some(Token::Array(dim)) => {
                    info.arrays.push(dim.clone());
                    self.pos += 1;
                }
                Some(Token::Paren) => {
                    info.is_function_pointer = true;
                    self.pos = self.tokens.len();
                    break;
                }
                _ => break,
            }
        }
        Ok(info)
    }

    fn parse_name(&mut self, info: &mut TypeInfo) -> Result<(), CodeModelError> {
        loop {
            let Some(Token::Ident(first)) = self.peek().cloned() else {
                return Err(self.error("expected a type name"));
            };
            self.pos += 1;

            let mut part = first.clone();
            if BUILTIN_WORDS.contains(&first.as_str()) {
                while let Some(Token::Ident(next)) = self.peek() {
                    if !BUILTIN_WORDS.contains(&next.as_str()) {
                        break;
                    }
                    part.push(' ');
                    part.push_str(next);
                    self.pos += 1;
                }
            }
            info.qualified_name.push(part);

            if self.peek() == Some(&Token::Less) {
                self.pos += 1;
                info.arguments = self.parse_template_arguments()?;
            }

            if self.peek() == Some(&Token::Scope) {
                self.pos += 1;
                // `Outer<T>::Inner` keeps only the innermost instantiation.
                info.arguments.clear();
                continue;
            }
            return Ok(());
        }
    }

    fn parse_template_arguments(&mut self) -> Result<Vec<TypeInfo>, CodeModelError> {
        let mut arguments = Vec::new();
        if self.peek() == Some(&Token::Greater) {
            self.pos += 1;
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_type()?);
            match self.peek() {
                Some(Token::Comma) => self.pos += 1,
                Some(Token::Greater) => {
                    self.pos += 1;
                    return Ok(arguments);
                }
                _ => return Err(self.error("unbalanced template argument list")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("int", "int")]
    #[case("unsigned long long", "unsigned long long")]
    #[case("const QString &", "const QString&")]
    #[case("QList<Foo *>", "QList<Foo*>")]
    #[case("QMap<QString, QList<int>>", "QMap<QString, QList<int> >")]
    #[case("NS::Inner::Type**", "NS::Inner::Type**")]
    #[case("Foo&&", "Foo&&")]
    #[case("char[16]", "char[16]")]
    #[case("int const *", "const int*")]
    #[case("struct Foo *const", "Foo*")]
    fn parse_round_trips_spelling(#[case] input: &str, #[case] expected: &str) {
        let info = TypeInfo::parse(input).expect("type should parse");
        assert_eq!(info.to_string(), expected);
    }

    #[test]
    fn parse_splits_scopes_and_arguments() {
        let info = TypeInfo::parse("const NS::Box<NS::Item*>&").unwrap();
        assert_eq!(info.qualified_name, vec!["NS".to_string(), "Box".to_string()]);
        assert!(info.is_constant);
        assert_eq!(info.reference_type, ReferenceType::LValue);
        assert_eq!(info.arguments.len(), 1);
        assert_eq!(info.arguments[0].qualified_name_string(), "NS::Item");
        assert_eq!(info.arguments[0].indirections, 1);
    }

    #[test]
    fn parse_marks_function_pointers() {
        let info = TypeInfo::parse("void (*)(int)").unwrap();
        assert!(info.is_function_pointer);
    }

    #[test]
    fn parse_keeps_unbounded_array() {
        let info = TypeInfo::parse("int[]").unwrap();
        assert_eq!(info.arrays, vec![String::new()]);
    }

    #[test]
    fn parse_rejects_unbalanced_template() {
        assert!(TypeInfo::parse("QList<int").is_err());
    }

    #[test]
    fn parse_varargs() {
        let info = TypeInfo::parse("...").unwrap();
        assert_eq!(info.qualified_name_string(), "...");
    }
}
