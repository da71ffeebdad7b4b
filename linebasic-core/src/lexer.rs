//! Lexer for the statement part of a single program line.
//!
//! Keywords and identifiers are case-insensitive and are upper-cased
//! here. Numeric literals are scanned greedily and kept as raw text, so
//! `1.2.3` or `1E` reach the validator intact and are reported there.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Let,
    Print,
    Dim,
    If,
    Then,
    Goto,
    Gosub,
    Return,
    End,
    Stop,
    While,
    Wend,
    For,
    To,
    Step,
    Next,
    Read,
    Data,
    Restore,
    Def,
    Rem,
    Mod,
    And,
    Or,
    Not,
}

impl Keyword {
    fn from_ident(text: &str) -> Option<Keyword> {
        let keyword = match text {
            "LET" => Keyword::Let,
            "PRINT" => Keyword::Print,
            "DIM" => Keyword::Dim,
            "IF" => Keyword::If,
            "THEN" => Keyword::Then,
            "GOTO" => Keyword::Goto,
            "GOSUB" => Keyword::Gosub,
            "RETURN" => Keyword::Return,
            "END" => Keyword::End,
            "STOP" => Keyword::Stop,
            "WHILE" => Keyword::While,
            "WEND" => Keyword::Wend,
            "FOR" => Keyword::For,
            "TO" => Keyword::To,
            "STEP" => Keyword::Step,
            "NEXT" => Keyword::Next,
            "READ" => Keyword::Read,
            "DATA" => Keyword::Data,
            "RESTORE" => Keyword::Restore,
            "DEF" => Keyword::Def,
            "REM" => Keyword::Rem,
            "MOD" => Keyword::Mod,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            _ => return None,
        };
        Some(keyword)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(Keyword),
    /// Upper-cased identifier, `$` sigil included.
    Ident(String),
    /// Raw numeric text.
    Number(String),
    Str(String),

    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

/// Lex the statement text of one line.
///
/// Errors carry a human-readable message; the parser attaches the line.
pub fn lex(source: &str) -> Result<Vec<Token>, String> {
    let mut lexer = Lexer {
        source,
        chars: source.as_bytes(),
        index: 0,
    };
    lexer.run()
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    index: usize,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }

            let token = match ch {
                b'+' => self.simple_token(Token::Plus),
                b'-' => self.simple_token(Token::Minus),
                b'*' => self.simple_token(Token::Star),
                b'/' => self.simple_token(Token::Slash),
                b'^' => self.simple_token(Token::Caret),
                b'(' => self.simple_token(Token::LParen),
                b')' => self.simple_token(Token::RParen),
                b',' => self.simple_token(Token::Comma),
                b';' => self.simple_token(Token::Semicolon),
                b'=' => self.simple_token(Token::Equal),
                b'<' => {
                    self.consume_char();
                    match self.peek_char() {
                        Some(b'>') => self.simple_token(Token::NotEqual),
                        Some(b'=') => self.simple_token(Token::LessEqual),
                        _ => Token::Less,
                    }
                }
                b'>' => {
                    self.consume_char();
                    if self.peek_char() == Some(b'=') {
                        self.simple_token(Token::GreaterEqual)
                    } else {
                        Token::Greater
                    }
                }
                b'"' => self.lex_string()?,
                b'0'..=b'9' | b'.' => self.lex_number(),
                _ if ch.is_ascii_alphabetic() => self.lex_ident_or_keyword(),
                _ => {
                    let unexpected = self.source[self.index..].chars().next().unwrap_or('?');
                    return Err(format!("unexpected character '{unexpected}'"));
                }
            };
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn simple_token(&mut self, token: Token) -> Token {
        self.consume_char();
        token
    }

    fn lex_string(&mut self) -> Result<Token, String> {
        // opening quote
        self.consume_char();
        let start = self.index;
        while let Some(ch) = self.peek_char() {
            if ch == b'"' {
                let text = self.source[start..self.index].to_string();
                self.consume_char();
                return Ok(Token::Str(text));
            }
            self.consume_char();
        }
        Err("unterminated string literal".to_string())
    }

    fn lex_number(&mut self) -> Token {
        let start = self.index;
        while let Some(b'0'..=b'9' | b'.') = self.peek_char() {
            self.consume_char();
        }
        if let Some(b'e' | b'E') = self.peek_char() {
            self.consume_char();
            if let Some(b'+' | b'-') = self.peek_char() {
                self.consume_char();
            }
            while let Some(b'0'..=b'9' | b'.') = self.peek_char() {
                self.consume_char();
            }
        }
        Token::Number(self.source[start..self.index].to_ascii_uppercase())
    }

    fn lex_ident_or_keyword(&mut self) -> Token {
        let start = self.index;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() {
                self.consume_char();
            } else {
                break;
            }
        }
        if self.peek_char() == Some(b'$') {
            self.consume_char();
        }
        let text = self.source[start..self.index].to_ascii_uppercase();
        match Keyword::from_ident(&text) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Ident(text),
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.chars.len() {
            self.index += 1;
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_keywords_case_insensitively() {
        let tokens = lex("print a$; b").expect("lex");
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Print),
                Token::Ident("A$".to_string()),
                Token::Semicolon,
                Token::Ident("B".to_string()),
            ]
        );
    }

    #[test]
    fn lexes_compound_operators() {
        let tokens = lex("A <> B <= C >= D").expect("lex");
        assert!(tokens.contains(&Token::NotEqual));
        assert!(tokens.contains(&Token::LessEqual));
        assert!(tokens.contains(&Token::GreaterEqual));
    }

    #[test]
    fn keeps_malformed_numbers_as_raw_text() {
        let tokens = lex("X = 1.2.3 + 4e").expect("lex");
        assert_eq!(tokens[2], Token::Number("1.2.3".to_string()));
        assert_eq!(tokens[4], Token::Number("4E".to_string()));
    }

    #[test]
    fn lexes_exponents() {
        let tokens = lex("1E-3").expect("lex");
        assert_eq!(tokens, vec![Token::Number("1E-3".to_string())]);
    }

    #[test]
    fn rejects_unterminated_strings() {
        let err = lex("PRINT \"HELLO").unwrap_err();
        assert!(err.contains("unterminated"));
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = lex("PRINT @").unwrap_err();
        assert_eq!(err, "unexpected character '@'");
    }
}
