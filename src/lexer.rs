//! 文本过滤语言的词法分析器

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        Token { kind, span: Span::new(start, self.position) }
    }

    /// 读取数字或日期字面量，可以包含数字、`.` 和 `-`，例如 `3.5`、`2024-01-31`
    fn read_number(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' || c == '-' {
                self.bump();
            } else {
                break;
            }
        }
        self.token(TokenKind::Number(&self.input[start..self.position]), start)
    }

    /// 读取双引号包围的字符串字面量
    /// 注意：开始的引号已经被调用者消费
    fn read_string(&mut self, start: usize) -> Token<'a> {
        let content_start = self.position;
        while let Some(c) = self.peek() {
            if c == '"' {
                let content = &self.input[content_start..self.position];
                self.bump();
                return self.token(TokenKind::String(content), start);
            }
            self.bump();
        }
        self.token(TokenKind::Illegal, start)
    }

    /// 读取标识符或关键字
    /// 标识符可以包含字母、数字、连字符、下划线和点
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        self.token(match_keyword(literal), start)
    }

    /// `!` 后面必须是 `=` 或 `~`
    fn read_negated(&mut self, start: usize) -> Token<'a> {
        let kind = match self.peek() {
            Some('=') => TokenKind::NotEq,
            Some('~') => TokenKind::NotTilde,
            _ => return self.token(TokenKind::Illegal, start),
        };
        self.bump();
        self.token(kind, start)
    }
}

fn match_keyword(s: &str) -> TokenKind<'_> {
    match s.to_ascii_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "state" => TokenKind::State,
        _ => TokenKind::Identifier(s),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let c = self.bump()?;

        let token = match c {
            '=' => self.token(TokenKind::Eq, start),
            '~' => self.token(TokenKind::Tilde, start),
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            ',' => self.token(TokenKind::Comma, start),
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Lte, start)
                } else {
                    self.token(TokenKind::Lt, start)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Gte, start)
                } else {
                    self.token(TokenKind::Gt, start)
                }
            }
            '!' => self.read_negated(start),
            '"' => self.read_string(start),
            c if c.is_ascii_digit() => self.read_number(start),
            c if c.is_alphabetic() || c == '_' => self.read_identifier(start),
            _ => self.token(TokenKind::Illegal, start),
        };
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        Lexer::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_attribute() {
        let input = r#"Title ~ "plan""#;
        let mut lexer = Lexer::new(input);

        assert_eq!(lexer.next().unwrap().kind, TokenKind::Identifier("Title"));
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Tilde);
        assert_eq!(lexer.next().unwrap().kind, TokenKind::String("plan"));
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_all_operators_and_punctuation() {
        assert_eq!(
            kinds("= != ~ !~ > < >= <= ( ) ,"),
            vec![
                TokenKind::Eq, TokenKind::NotEq, TokenKind::Tilde, TokenKind::NotTilde,
                TokenKind::Gt, TokenKind::Lt, TokenKind::Gte, TokenKind::Lte,
                TokenKind::LParen, TokenKind::RParen, TokenKind::Comma,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("AND or nOt IN state due_date Test-Run v1.2"),
            vec![
                TokenKind::And, TokenKind::Or, TokenKind::Not, TokenKind::In, TokenKind::State,
                TokenKind::Identifier("due_date"),
                TokenKind::Identifier("Test-Run"),
                TokenKind::Identifier("v1.2"),
            ]
        );
    }

    #[test]
    fn test_numbers_and_strings() {
        assert_eq!(
            kinds(r#"12345 3.5 2024-01-31 "hello world""#),
            vec![
                TokenKind::Number("12345"),
                TokenKind::Number("3.5"),
                TokenKind::Number("2024-01-31"),
                TokenKind::String("hello world"),
            ]
        );
    }

    #[test]
    fn test_mapping_and_group() {
        assert_eq!(
            kinds(r#"<Standard> title = "ISO" AND (a = 1 OR b != 2)"#),
            vec![
                TokenKind::Lt,
                TokenKind::Identifier("Standard"),
                TokenKind::Gt,
                TokenKind::Identifier("title"),
                TokenKind::Eq,
                TokenKind::String("ISO"),
                TokenKind::And,
                TokenKind::LParen,
                TokenKind::Identifier("a"),
                TokenKind::Eq,
                TokenKind::Number("1"),
                TokenKind::Or,
                TokenKind::Identifier("b"),
                TokenKind::NotEq,
                TokenKind::Number("2"),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_illegal_input() {
        assert_eq!(kinds("!"), vec![TokenKind::Illegal]);
        assert_eq!(kinds("#"), vec![TokenKind::Illegal]);
        assert_eq!(kinds(r#""unterminated"#), vec![TokenKind::Illegal]);
    }

    #[test]
    fn test_spans() {
        let tokens: Vec<_> = Lexer::new(r#"a >= "xy""#).collect();
        assert_eq!(tokens[0].span, Span::new(0, 1));
        assert_eq!(tokens[1].span, Span::new(2, 4));
        assert_eq!(tokens[2].span, Span::new(5, 9));
    }
}
