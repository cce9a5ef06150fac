//! 文本过滤语言的语法分析器
//!
//! 输出与高级搜索编辑器相同的扁平中缀条目列表，运算符优先级由 filter_builder 处理。
//!
//! ## 语法
//!
//! ```text
//! sequence  := term ((AND | OR) term)*
//! term      := '(' sequence ')' | mapping | state | attribute
//! attribute := name compop value            compop: = != ~ !~ < > <= >=
//! state     := STATE [NOT] IN '(' value (',' value)* ')'
//! mapping   := '<' IDENT '>' attribute [mapping | '(' mapping ((AND | OR) mapping)* ')']
//! name      := IDENT | STRING
//! value     := STRING | IDENT | NUMBER
//! ```
//!
//! ## 示例
//!
//! ```text
//! Title ~ "plan" AND (Owner = alice OR Owner = bob)
//! STATE NOT IN ("Deprecated")
//! <Standard> Title ~ iso <Regulation> Title = "SOX"
//! <Program> Title ~ core (<Audit> Title ~ q1 OR <Audit> Title ~ q2)
//! ```

use crate::item::{
    create_attribute, create_group, create_mapping_criteria, create_operator, create_state,
    AttributeFilter, ItemNode, LogicalOp, MappingCriteria, StateFilter, StateOperator,
};
use crate::token::{Span, Token, TokenKind};
use thiserror::Error;

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
    /// `STATE` 条件所属的模型
    model_name: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(message: String, span: Option<Span>) -> Self {
        Self { message, span }
    }

    fn at_position(message: String, span: Span) -> Self {
        Self { message, span: Some(span) }
    }
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
            model_name: String::new(),
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    fn match_token(&self, kind: &TokenKind) -> bool {
        self.peek()
            .is_some_and(|token| std::mem::discriminant(&token.kind) == std::mem::discriminant(kind))
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Span, ParseError> {
        match self.peek() {
            Some(token) if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) => {
                let span = token.span;
                self.position += 1;
                Ok(span)
            }
            Some(token) => Err(ParseError::at_position(
                format!("Expected {:?}, found {:?}", expected, token.kind),
                token.span,
            )),
            None => Err(ParseError::new(
                format!("Expected {:?}, but reached end of input", expected),
                None,
            )),
        }
    }

    /// 将整个输入解析为条目列表，空输入返回空列表
    pub fn parse(&mut self) -> Result<Vec<ItemNode>, ParseError> {
        if self.peek().is_none() {
            return Ok(Vec::new());
        }

        let items = self.parse_sequence(Self::parse_term)?;

        if let Some(token) = self.peek() {
            return Err(ParseError::at_position(
                format!("Expected AND or OR, found {:?}", token.kind),
                token.span,
            ));
        }
        Ok(items)
    }

    /// `operand ((AND | OR) operand)*`
    fn parse_sequence(
        &mut self,
        operand: fn(&mut Self) -> Result<ItemNode, ParseError>,
    ) -> Result<Vec<ItemNode>, ParseError> {
        let mut items = vec![operand(self)?];

        while let Some(op) = self.logical_operator() {
            self.advance();
            items.push(create_operator(Some(op)));
            items.push(operand(self)?);
        }

        Ok(items)
    }

    fn logical_operator(&self) -> Option<LogicalOp> {
        match self.peek()?.kind {
            TokenKind::And => Some(LogicalOp::And),
            TokenKind::Or => Some(LogicalOp::Or),
            _ => None,
        }
    }

    fn parse_term(&mut self) -> Result<ItemNode, ParseError> {
        let Some(token) = self.peek() else {
            return Err(ParseError::new("Unexpected end of input".to_string(), None));
        };

        match token.kind {
            TokenKind::LParen => {
                self.advance();
                let children = self.parse_sequence(Self::parse_term)?;
                self.expect(TokenKind::RParen)?;
                Ok(create_group(Some(children)))
            }
            TokenKind::Lt => self.parse_mapping(),
            TokenKind::State => self.parse_state(),
            _ => Ok(create_attribute(Some(self.parse_attribute()?))),
        }
    }

    fn parse_attribute(&mut self) -> Result<AttributeFilter, ParseError> {
        let field = self.parse_name()?;

        let operator = match self.advance() {
            Some(token) => token.kind.comparison_symbol().ok_or_else(|| {
                ParseError::at_position(
                    format!("Expected comparison operator, found {:?}", token.kind),
                    token.span,
                )
            })?,
            None => return Err(ParseError::new("Expected comparison operator".to_string(), None)),
        };

        let value = self.parse_value()?;
        Ok(AttributeFilter::new(field, operator, value))
    }

    fn parse_name(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Some(Token { kind: TokenKind::Identifier(s) | TokenKind::String(s), .. }) => Ok(s.to_string()),
            Some(token) => Err(ParseError::at_position(
                format!("Expected attribute name, found {:?}", token.kind),
                token.span,
            )),
            None => Err(ParseError::new("Expected attribute name".to_string(), None)),
        }
    }

    fn parse_value(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::String(s) | TokenKind::Identifier(s) | TokenKind::Number(s),
                ..
            }) => Ok(s.to_string()),
            Some(token) => Err(ParseError::at_position(
                format!("Expected value, found {:?}", token.kind),
                token.span,
            )),
            None => Err(ParseError::new("Expected value".to_string(), None)),
        }
    }

    /// 解析状态条件 `STATE [NOT] IN (v1, v2, ...)`
    fn parse_state(&mut self) -> Result<ItemNode, ParseError> {
        self.expect(TokenKind::State)?;

        let operator = if self.match_token(&TokenKind::Not) {
            self.advance();
            StateOperator::None
        } else {
            StateOperator::Any
        };

        self.expect(TokenKind::In)?;
        self.expect(TokenKind::LParen)?;

        let mut items = vec![self.parse_value()?];
        while self.match_token(&TokenKind::Comma) {
            self.advance();
            items.push(self.parse_value()?);
        }
        self.expect(TokenKind::RParen)?;

        Ok(create_state(Some(StateFilter {
            items,
            model_name: self.model_name.clone(),
            operator,
        })))
    }

    /// 解析 `<Object> attribute`，后面可以跟该对象映射到的条件
    fn parse_mapping(&mut self) -> Result<ItemNode, ParseError> {
        self.expect(TokenKind::Lt)?;

        let object_name = match self.advance() {
            Some(Token { kind: TokenKind::Identifier(name), .. }) => name.to_string(),
            Some(token) => {
                return Err(ParseError::at_position(
                    format!("Expected object name, found {:?}", token.kind),
                    token.span,
                ))
            }
            None => return Err(ParseError::new("Expected object name".to_string(), None)),
        };

        self.expect(TokenKind::Gt)?;
        let filter = self.parse_attribute()?;

        let mapped_to = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Lt) => Some(Box::new(self.parse_mapping()?)),
            Some(TokenKind::LParen) => {
                self.advance();
                let children = self.parse_sequence(Self::parse_mapping)?;
                self.expect(TokenKind::RParen)?;
                Some(Box::new(create_group(Some(children))))
            }
            _ => None,
        };

        Ok(create_mapping_criteria(Some(MappingCriteria {
            object_name,
            filter,
            mapped_to,
        })))
    }
}

/// 一步完成词法分析和语法分析
pub fn parse_filter(input: &str, model_name: &str) -> Result<Vec<ItemNode>, ParseError> {
    let tokens: Vec<_> = crate::lexer::Lexer::new(input).collect();
    if let Some(illegal) = tokens.iter().find(|t| t.kind == TokenKind::Illegal) {
        return Err(ParseError::at_position(
            format!("Illegal input {:?}", &input[illegal.span.start..illegal.span.end]),
            illegal.span,
        ));
    }
    Parser::new(&tokens).with_model(model_name).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Vec<ItemNode>, ParseError> {
        parse_filter(input, "Control")
    }

    fn attr(field: &str, op: &str, value: &str) -> ItemNode {
        create_attribute(Some(AttributeFilter::new(field, op, value)))
    }

    #[test]
    fn test_simple_attribute() {
        let items = parse(r#"Title ~ "plan""#).unwrap();
        assert_eq!(items, vec![attr("Title", "~", "plan")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   ").unwrap().is_empty());
    }

    #[test]
    fn test_sequence_keeps_infix_order() {
        let items = parse(r#"a = 1 OR b != x AND "Due Date" <= 2024-01-01"#).unwrap();
        assert_eq!(
            items,
            vec![
                attr("a", "=", "1"),
                create_operator(Some(LogicalOp::Or)),
                attr("b", "!=", "x"),
                create_operator(Some(LogicalOp::And)),
                attr("Due Date", "<=", "2024-01-01"),
            ]
        );
    }

    #[test]
    fn test_group() {
        let items = parse("a = 1 AND (b = 2 OR c = 3)").unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[2],
            create_group(Some(vec![
                attr("b", "=", "2"),
                create_operator(Some(LogicalOp::Or)),
                attr("c", "=", "3"),
            ]))
        );
    }

    #[test]
    fn test_state() {
        let items = parse(r#"STATE NOT IN ("Draft", Deprecated)"#).unwrap();
        assert_eq!(
            items,
            vec![create_state(Some(StateFilter {
                items: vec!["Draft".to_string(), "Deprecated".to_string()],
                model_name: "Control".to_string(),
                operator: StateOperator::None,
            }))]
        );
    }

    #[test]
    fn test_chained_mapping() {
        let items = parse(r#"<Standard> Title ~ iso <Regulation> Title = "SOX""#).unwrap();

        let [ItemNode::MappingCriteria(criteria)] = items.as_slice() else {
            panic!("Expected single mapping criteria, got {:?}", items);
        };
        assert_eq!(criteria.object_name, "Standard");
        assert_eq!(criteria.filter, AttributeFilter::new("Title", "~", "iso"));

        match criteria.mapped_to.as_deref() {
            Some(ItemNode::MappingCriteria(inner)) => {
                assert_eq!(inner.object_name, "Regulation");
                assert!(inner.mapped_to.is_none());
            }
            other => panic!("Expected nested mapping, got {:?}", other),
        }
    }

    #[test]
    fn test_mapping_to_group() {
        let items = parse("<Program> Title ~ core (<Audit> Title ~ q1 OR <Audit> Title ~ q2) AND x = 1").unwrap();
        assert_eq!(items.len(), 3);

        let ItemNode::MappingCriteria(criteria) = &items[0] else {
            panic!("Expected mapping criteria");
        };
        match criteria.mapped_to.as_deref() {
            Some(ItemNode::Group(children)) => {
                assert_eq!(children.len(), 3);
                assert_eq!(children[1], create_operator(Some(LogicalOp::Or)));
            }
            other => panic!("Expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_operator_between_terms() {
        let err = parse("a = 1 b = 2").unwrap_err();
        assert_eq!(err.span, Some(Span::new(6, 7)));
    }

    #[test]
    fn test_missing_comparison_operator() {
        let err = parse("Title plan").unwrap_err();
        assert!(err.message.contains("comparison operator"));
    }

    #[test]
    fn test_unclosed_group() {
        let err = parse("(a = 1 OR b = 2").unwrap_err();
        assert_eq!(err.span, None);
    }

    #[test]
    fn test_trailing_operator() {
        assert!(parse("a = 1 AND").is_err());
    }

    #[test]
    fn test_illegal_character() {
        let err = parse("a = 1 # b").unwrap_err();
        assert_eq!(err.span, Some(Span::new(6, 7)));
    }
}
