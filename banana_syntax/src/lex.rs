use crate::{
    error::{Error, ErrorKind},
    position::{Position, SourceFile, Span},
    token::{Keyword, Token, TokenKind},
};
use log::trace;
use std::{iter::Peekable, rc::Rc, str::Chars};

#[derive(Debug)]
pub struct Lexer<'a> {
    stream: Peekable<Chars<'a>>,
    start: Position,
    current: Position,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &'a Rc<SourceFile>) -> Self {
        Self {
            stream: file.text.chars().peekable(),
            start: Position::start_of(file.clone()),
            current: Position::start_of(file.clone()),
        }
    }

    /// Lexes the whole file. The first error stops lexing; on success the
    /// last token is always [`TokenKind::EOF`].
    pub fn lex_all(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens: Vec<Token> = Vec::default();
        loop {
            let token = self.lex()?;
            let done = token.kind == TokenKind::EOF;
            tokens.push(token);
            if done {
                break;
            }
        }
        trace!("Lexed {} tokens", tokens.len());
        Ok(tokens)
    }

    pub fn lex(&mut self) -> Result<Token, Error> {
        self.advance_while(|c| matches!(c, ' ' | '\t' | '\r'));
        self.start = self.current.clone();
        let Some(c) = self.advance() else {
            return Ok(self.make_token(TokenKind::EOF));
        };
        match c {
            '+' => Ok(self.lookahead_for_token('=', TokenKind::PLUS_EQUAL, TokenKind::PLUS)),
            '-' => Ok(self.lookahead_for_token('=', TokenKind::MINUS_EQUAL, TokenKind::MINUS)),
            '<' => Ok(self.lookahead_for_token('=', TokenKind::LESS_EQUAL, TokenKind::LESS)),
            '>' => Ok(self.lookahead_for_token(
                '=',
                TokenKind::GREATER_EQUAL,
                TokenKind::GREATER,
            )),
            '=' => {
                if self.advance_if(|c| c == '=').is_some() {
                    Ok(self.make_token(TokenKind::EQUAL_EQUAL))
                } else if self.advance_if(|c| c == '>').is_some() {
                    Ok(self.make_token(TokenKind::ARROW))
                } else {
                    Ok(self.make_token(TokenKind::EQUAL))
                }
            }
            '!' => {
                if self.advance_if(|c| c == '=').is_some() {
                    Ok(self.make_token(TokenKind::BANG_EQUAL))
                } else {
                    self.advance();
                    Err(self.error(ErrorKind::ExpectedCharacter, "'=' (after '!')"))
                }
            }
            '/' => self.lex_slash_or_comment(),
            '"' | '\'' => Ok(self.lex_string(c)),
            _ => {
                if let Some(t) = TokenKind::from_char(c) {
                    Ok(self.make_token(t))
                } else if c.is_ascii_alphabetic() {
                    Ok(self.lex_ident(c))
                } else if c.is_ascii_digit() {
                    Ok(self.lex_number(c))
                } else {
                    Err(self.error(ErrorKind::IllegalCharacter, format!("'{c}'")))
                }
            }
        }
    }

    fn lex_ident(&mut self, first: char) -> Token {
        let mut lexeme = String::from(first);
        while let Some(c) = self.advance_if(|c| c.is_ascii_alphanumeric() || c == '_') {
            lexeme.push(c);
        }
        let kind = match Keyword::from_keyword(&lexeme) {
            Some(kw) => TokenKind::KEYWORD(kw),
            None => TokenKind::IDENT,
        };
        Token::new(kind, self.span(), lexeme)
    }

    fn lex_number(&mut self, first: char) -> Token {
        let mut lexeme = String::from(first);
        let mut seen_dot = false;
        while let Some(c) = self.advance_if(|c| c.is_ascii_digit() || (c == '.' && !seen_dot)) {
            seen_dot |= c == '.';
            lexeme.push(c);
        }
        let kind = if seen_dot {
            TokenKind::FLOAT
        } else {
            TokenKind::INT
        };
        Token::new(kind, self.span(), lexeme)
    }

    /// Strings run up to the matching quote. An unterminated string simply
    /// runs to the end of the input.
    fn lex_string(&mut self, quote: char) -> Token {
        let mut value = String::default();
        let mut escaped = false;
        while let Some(c) = self.advance_if(|c| c != quote || escaped) {
            if escaped {
                value.push(match c {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else {
                value.push(c);
            }
        }
        // Consume the closing quote
        self.advance();
        Token::new(TokenKind::STRING, self.span(), value)
    }

    fn lex_slash_or_comment(&mut self) -> Result<Token, Error> {
        if self.advance_if(|c| c == '/').is_some() {
            // The newline is left behind so it still separates statements
            self.advance_while(|c| c != '\n');
            self.lex()
        } else {
            Ok(self.make_token(TokenKind::SLASH))
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.span(), String::default())
    }

    fn span(&self) -> Span {
        Span::new(self.start.clone(), self.current.clone())
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.stream.next()?;
        self.current.advance(c);
        Some(c)
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<char>
    where
        F: FnOnce(char) -> bool,
    {
        if self.stream.peek().filter(|&&c| cond(c)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_while<F>(&mut self, cond: F) -> Option<usize>
    where
        F: Fn(char) -> bool,
    {
        let mut count: usize = 0;
        while self.stream.peek().filter(|&&c| cond(c)).is_some() {
            count += 1;
            self.advance();
        }
        count.ne(&0).then_some(count)
    }

    fn lookahead_for_token(
        &mut self,
        match_char: char,
        if_match: TokenKind,
        no_match: TokenKind,
    ) -> Token {
        if self.advance_if(|c| c == match_char).is_some() {
            self.make_token(if_match)
        } else {
            self.make_token(no_match)
        }
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>) -> Error {
        Error::new(kind, message, self.span())
    }
}

pub fn tokenize(file: &Rc<SourceFile>) -> Result<Vec<Token>, Error> {
    Lexer::new(file).lex_all()
}
