//! Recursive-descent parser for line-numbered programs.
//!
//! Every non-blank source line must start with a line number followed by
//! exactly one statement. The text after the line number is what
//! diagnostics later quote as the line text.

use log::debug;

use crate::ast::{ArrayDecl, BinaryOp, DataItem, Expr, PrintItem, Statement, UnaryOp};
use crate::error::CoreError;
use crate::lexer::{Keyword, Token, lex};
use crate::program::{InputRef, Instruction, Program};

/// Deepest nesting of expressions and `IF` statements accepted on one line.
///
/// The validator and interpreter walk the tree recursively, so this also
/// bounds their stack use.
const MAX_NESTING: usize = 128;

pub fn parse_program(source: &str) -> Result<Program, CoreError> {
    let mut program = Program::new();
    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let (number, text) = split_line_number(raw).map_err(|msg| CoreError::parse(line, msg))?;
        let statement = parse_statement(text).map_err(|msg| CoreError::parse(line, msg))?;
        program.insert(Instruction::new(InputRef::new(number), statement), text);
    }
    debug!("parsed {} program lines", program.len());
    Ok(program)
}

/// Parse the statement text of one line (without its line number).
pub fn parse_statement(text: &str) -> Result<Statement, String> {
    if is_remark(text) {
        return Ok(Statement::Rem);
    }
    let tokens = lex(text)?;
    let mut parser = Parser {
        tokens: &tokens,
        position: 0,
        depth: 0,
    };
    let statement = parser.statement()?;
    match parser.peek() {
        None => Ok(statement),
        Some(token) => Err(format!("unexpected {} after statement", describe(token))),
    }
}

fn split_line_number(raw: &str) -> Result<(u32, &str), String> {
    let trimmed = raw.trim_start();
    let digits = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if digits == 0 {
        return Err("line number expected".to_string());
    }
    let number = trimmed[..digits]
        .parse::<u32>()
        .map_err(|_| format!("line number {} is out of range", &trimmed[..digits]))?;
    let text = trimmed[digits..].trim_start();
    if text.is_empty() {
        return Err(format!("line {number} has no statement"));
    }
    Ok((number, text))
}

fn is_remark(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 3
        && bytes[..3].eq_ignore_ascii_case(b"REM")
        && bytes.get(3).is_none_or(|ch| !ch.is_ascii_alphanumeric())
}

struct Parser<'t> {
    tokens: &'t [Token],
    position: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn statement(&mut self) -> Result<Statement, String> {
        let token = self
            .advance()
            .ok_or_else(|| "statement expected".to_string())?;
        let statement = match token {
            Token::Keyword(Keyword::Let) => self.assignment()?,
            Token::Ident(_) => {
                self.position -= 1;
                self.assignment()?
            }
            Token::Keyword(Keyword::Print) => Statement::Print(self.print_items()?),
            Token::Keyword(Keyword::Dim) => Statement::Dim(self.array_decls()?),
            Token::Keyword(Keyword::If) => {
                self.nest()?;
                let condition = self.expr()?;
                self.expect(&Token::Keyword(Keyword::Then), "THEN")?;
                let then = match self.peek() {
                    Some(Token::Number(_)) => Statement::Goto(self.line_number()?),
                    _ => self.statement()?,
                };
                Statement::If {
                    condition,
                    then: Box::new(then),
                }
            }
            Token::Keyword(Keyword::Goto) => Statement::Goto(self.line_number()?),
            Token::Keyword(Keyword::Gosub) => Statement::Gosub(self.line_number()?),
            Token::Keyword(Keyword::Return) => Statement::Return,
            Token::Keyword(Keyword::End) => Statement::End,
            Token::Keyword(Keyword::Stop) => Statement::Stop,
            Token::Keyword(Keyword::While) => Statement::While(self.expr()?),
            Token::Keyword(Keyword::Wend) => Statement::Wend,
            Token::Keyword(Keyword::For) => {
                let target = self.unary()?;
                self.expect(&Token::Equal, "'='")?;
                let from = self.expr()?;
                self.expect(&Token::Keyword(Keyword::To), "TO")?;
                let to = self.expr()?;
                let step = if self.eat(&Token::Keyword(Keyword::Step)) {
                    Some(self.expr()?)
                } else {
                    None
                };
                Statement::For {
                    target,
                    from,
                    to,
                    step,
                }
            }
            Token::Keyword(Keyword::Next) => match self.peek() {
                Some(Token::Ident(name)) => {
                    let name = name.clone();
                    self.position += 1;
                    Statement::Next(Some(name))
                }
                _ => Statement::Next(None),
            },
            Token::Keyword(Keyword::Read) => {
                let mut targets = vec![self.unary()?];
                while self.eat(&Token::Comma) {
                    targets.push(self.unary()?);
                }
                Statement::Read(targets)
            }
            Token::Keyword(Keyword::Data) => Statement::Data(self.data_items()?),
            Token::Keyword(Keyword::Restore) => Statement::Restore,
            Token::Keyword(Keyword::Def) => self.def_fn()?,
            Token::Keyword(Keyword::Rem) => {
                // a remark after THEN swallows the rest of the line
                self.position = self.tokens.len();
                Statement::Rem
            }
            other => return Err(format!("unexpected {} at start of statement", describe(other))),
        };
        Ok(statement)
    }

    fn assignment(&mut self) -> Result<Statement, String> {
        let target = self.unary()?;
        self.expect(&Token::Equal, "'='")?;
        let value = self.expr()?;
        Ok(Statement::Let { target, value })
    }

    fn print_items(&mut self) -> Result<Vec<PrintItem>, String> {
        let mut items = Vec::new();
        while let Some(token) = self.peek() {
            match token {
                Token::Semicolon => {
                    self.position += 1;
                    items.push(PrintItem::Semicolon);
                }
                Token::Comma => {
                    self.position += 1;
                    items.push(PrintItem::Comma);
                }
                _ => items.push(PrintItem::Expr(self.expr()?)),
            }
        }
        Ok(items)
    }

    fn array_decls(&mut self) -> Result<Vec<ArrayDecl>, String> {
        let mut decls = Vec::new();
        loop {
            let name = self.ident()?;
            self.expect(&Token::LParen, "'('")?;
            let bounds = self.expr_list()?;
            self.expect(&Token::RParen, "')'")?;
            decls.push(ArrayDecl { name, bounds });
            if !self.eat(&Token::Comma) {
                return Ok(decls);
            }
        }
    }

    fn data_items(&mut self) -> Result<Vec<DataItem>, String> {
        let mut items = Vec::new();
        loop {
            let item = match self.advance() {
                Some(Token::Number(text)) => DataItem::Number(text.clone()),
                Some(Token::Minus) => match self.advance() {
                    Some(Token::Number(text)) => DataItem::Number(format!("-{text}")),
                    _ => return Err("number expected after '-' in DATA".to_string()),
                },
                Some(Token::Plus) => match self.advance() {
                    Some(Token::Number(text)) => DataItem::Number(text.clone()),
                    _ => return Err("number expected after '+' in DATA".to_string()),
                },
                Some(Token::Str(text)) => DataItem::Str(text.clone()),
                Some(Token::Ident(text)) => DataItem::Str(text.clone()),
                Some(other) => return Err(format!("unexpected {} in DATA", describe(other))),
                None => return Err("DATA item expected".to_string()),
            };
            items.push(item);
            if !self.eat(&Token::Comma) {
                return Ok(items);
            }
        }
    }

    fn def_fn(&mut self) -> Result<Statement, String> {
        let name = self.ident()?;
        if !is_fn_name(&name) {
            return Err(format!("function name must start with FN, found {name}"));
        }
        let mut params = Vec::new();
        if self.eat(&Token::LParen) {
            params.push(self.ident()?);
            while self.eat(&Token::Comma) {
                params.push(self.ident()?);
            }
            self.expect(&Token::RParen, "')'")?;
        }
        self.expect(&Token::Equal, "'='")?;
        let body = self.expr()?;
        Ok(Statement::DefFn { name, params, body })
    }

    fn expr(&mut self) -> Result<Expr, String> {
        let outer = self.depth;
        self.nest()?;
        let mut lhs = self.and()?;
        while self.eat(&Token::Keyword(Keyword::Or)) {
            self.nest()?;
            let rhs = self.and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        self.depth = outer;
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let outer = self.depth;
        let mut lhs = self.not()?;
        while self.eat(&Token::Keyword(Keyword::And)) {
            self.nest()?;
            let rhs = self.not()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        self.depth = outer;
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Keyword(Keyword::Not)) {
            let outer = self.depth;
            self.nest()?;
            let operand = self.not()?;
            self.depth = outer;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let outer = self.depth;
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Equal) => BinaryOp::Eq,
                Some(Token::NotEqual) => BinaryOp::Ne,
                Some(Token::Less) => BinaryOp::Lt,
                Some(Token::LessEqual) => BinaryOp::Le,
                Some(Token::Greater) => BinaryOp::Gt,
                Some(Token::GreaterEqual) => BinaryOp::Ge,
                _ => break,
            };
            self.position += 1;
            self.nest()?;
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = outer;
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let outer = self.depth;
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.position += 1;
            self.nest()?;
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = outer;
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, String> {
        let outer = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Keyword(Keyword::Mod)) => BinaryOp::Mod,
                _ => break,
            };
            self.position += 1;
            self.nest()?;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = outer;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Minus) {
            let outer = self.depth;
            self.nest()?;
            let operand = self.unary()?;
            self.depth = outer;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        if self.eat(&Token::Plus) {
            while self.eat(&Token::Plus) {}
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, String> {
        let outer = self.depth;
        let mut lhs = self.primary()?;
        while self.eat(&Token::Caret) {
            self.nest()?;
            let rhs = if self.eat(&Token::Minus) {
                Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(self.primary()?),
                }
            } else {
                self.primary()?
            };
            lhs = binary(BinaryOp::Pow, lhs, rhs);
        }
        self.depth = outer;
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Expr, String> {
        let token = self
            .advance()
            .ok_or_else(|| "expression expected".to_string())?;
        match token {
            Token::Number(text) => Ok(Expr::Number(text.clone())),
            Token::Str(text) => Ok(Expr::Str(text.clone())),
            Token::Ident(name) => {
                let name = name.clone();
                let args = if self.eat(&Token::LParen) {
                    let args = self.expr_list()?;
                    self.expect(&Token::RParen, "')'")?;
                    Some(args)
                } else {
                    None
                };
                if is_fn_name(&name) {
                    return Ok(Expr::FnCall {
                        name,
                        args: args.unwrap_or_default(),
                    });
                }
                Ok(match args {
                    Some(args) => Expr::Index { name, args },
                    None => Expr::Var(name),
                })
            }
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            other => Err(format!("unexpected {} in expression", describe(other))),
        }
    }

    fn expr_list(&mut self) -> Result<Vec<Expr>, String> {
        let mut exprs = vec![self.expr()?];
        while self.eat(&Token::Comma) {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    fn ident(&mut self) -> Result<String, String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name.clone()),
            Some(other) => Err(format!("name expected, found {}", describe(other))),
            None => Err("name expected".to_string()),
        }
    }

    fn line_number(&mut self) -> Result<u32, String> {
        match self.advance() {
            Some(Token::Number(text)) => text
                .parse::<u32>()
                .map_err(|_| format!("invalid line number {text}")),
            Some(other) => Err(format!("line number expected, found {}", describe(other))),
            None => Err("line number expected".to_string()),
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), String> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(other) => Err(format!("expected {what}, found {}", describe(other))),
            None => Err(format!("expected {what}")),
        }
    }

    /// Counts one more level of nesting on the current line.
    fn nest(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(format!("expression nested too deeply (limit {MAX_NESTING})"));
        }
        Ok(())
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// Names starting with `FN` belong to user-defined functions.
pub fn is_fn_name(name: &str) -> bool {
    name.len() > 2 && name.starts_with("FN")
}

fn describe(token: &Token) -> String {
    match token {
        Token::Keyword(keyword) => format!("{keyword:?}").to_ascii_uppercase(),
        Token::Ident(name) => format!("name {name}"),
        Token::Number(text) => format!("number {text}"),
        Token::Str(text) => format!("string \"{text}\""),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::LineSource;

    #[test]
    fn parses_numbered_lines_and_keeps_their_text() {
        let program = parse_program("20 PRINT 1/0\n10   LET X = 1\n").expect("parse");
        assert_eq!(program.len(), 2);
        assert_eq!(program.instructions()[0].input_ref, InputRef::new(10));
        assert_eq!(program.line_text(InputRef::new(10)), Some("LET X = 1"));
        assert_eq!(program.line_text(InputRef::new(20)), Some("PRINT 1/0"));
    }

    #[test]
    fn parses_implicit_let_and_array_targets() {
        let statement = parse_statement("A(I + 1) = 2 * 3").expect("parse");
        match statement {
            Statement::Let {
                target: Expr::Index { name, args },
                ..
            } => {
                assert_eq!(name, "A");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn parses_if_then_line_number_as_goto() {
        let statement = parse_statement("IF X > 1 THEN 100").expect("parse");
        assert!(matches!(
            statement,
            Statement::If { then, .. } if *then == Statement::Goto(100)
        ));
    }

    #[test]
    fn parses_for_with_step() {
        let statement = parse_statement("FOR I = 10 TO 1 STEP -1").expect("parse");
        assert!(matches!(statement, Statement::For { step: Some(_), .. }));
    }

    #[test]
    fn parses_def_fn_and_calls() {
        let statement = parse_statement("DEF FNA(X, Y) = X * Y + FNB(X)").expect("parse");
        match statement {
            Statement::DefFn { name, params, body } => {
                assert_eq!(name, "FNA");
                assert_eq!(params, vec!["X".to_string(), "Y".to_string()]);
                assert!(matches!(body, Expr::Binary { op: BinaryOp::Add, .. }));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn respects_operator_precedence() {
        let statement = parse_statement("X = 1 + 2 * 3 ^ 2").expect("parse");
        let Statement::Let { value, .. } = statement else {
            panic!("expected LET");
        };
        let Expr::Binary { op, rhs, .. } = value else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn parses_data_items() {
        let statement = parse_statement("DATA 1, -2.5, \"A,B\", WORD").expect("parse");
        assert_eq!(
            statement,
            Statement::Data(vec![
                DataItem::Number("1".to_string()),
                DataItem::Number("-2.5".to_string()),
                DataItem::Str("A,B".to_string()),
                DataItem::Str("WORD".to_string()),
            ])
        );
    }

    #[test]
    fn remarks_are_not_lexed() {
        assert_eq!(parse_statement("REM \"unbalanced @").expect("parse"), Statement::Rem);
        assert_eq!(parse_statement("rem").expect("parse"), Statement::Rem);
    }

    #[test]
    fn rejects_lines_without_numbers() {
        let err = parse_program("10 PRINT 1\nPRINT 2\n").unwrap_err();
        assert!(matches!(err, CoreError::ParseError { line: 2, .. }));
    }

    #[test]
    fn rejects_deeply_nested_parentheses() {
        let source = format!("10 PRINT {}1{}\n", "(".repeat(10_000), ")".repeat(10_000));
        let err = parse_program(&source).unwrap_err();
        match err {
            CoreError::ParseError { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("nested too deeply"), "{message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_long_negation_and_operator_chains() {
        let negations = format!("PRINT {}1", "-".repeat(50_000));
        assert!(parse_statement(&negations).unwrap_err().contains("nested too deeply"));
        let sum = format!("X = 1{}", "+1".repeat(10_000));
        assert!(parse_statement(&sum).unwrap_err().contains("nested too deeply"));
        let conditions = format!("{}PRINT 1", "IF 1 THEN ".repeat(10_000));
        assert!(parse_statement(&conditions).unwrap_err().contains("nested too deeply"));
    }

    #[test]
    fn accepts_nesting_within_the_limit() {
        let source = format!("PRINT {}1{}", "(".repeat(40), ")".repeat(40));
        assert!(matches!(parse_statement(&source), Ok(Statement::Print(_))));
        let sum = format!("X = 1{}", "+1".repeat(40));
        assert!(parse_statement(&sum).is_ok());
    }

    #[test]
    fn rejects_trailing_tokens() {
        let err = parse_statement("GOTO 10 20").unwrap_err();
        assert!(err.contains("after statement"));
    }
}
