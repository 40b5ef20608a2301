use std::fmt::{Debug, Formatter};
use phf::phf_map;
use unicode_ident::{is_xid_continue, is_xid_start};
use crate::source::{Location, Source};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum TokenType {
    Identifier,
    Number,
    StringLiteral,
    LeftAngle,
    RightAngle,
    LeftParenthesis,
    RightParenthesis,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Equal,
    Comma,
    Period,
    Colon,
    Semicolon,
    Plus,
    Minus,
    Star,
    Bang,
    Def,
    Io,
    Imp,
    Var,
    Val,
    Struct,
    If,
    Else,
    While,
    New,
    Unrecognized,
    EOF
}

const BASIC_TOKENS: phf::Map<char, TokenType> = phf_map! {
    '<' => TokenType::LeftAngle,
    '>' => TokenType::RightAngle,
    '(' => TokenType::LeftParenthesis,
    ')' => TokenType::RightParenthesis,
    '{' => TokenType::LeftBrace,
    '}' => TokenType::RightBrace,
    '[' => TokenType::LeftBracket,
    ']' => TokenType::RightBracket,
    '=' => TokenType::Equal,
    ',' => TokenType::Comma,
    '.' => TokenType::Period,
    ':' => TokenType::Colon,
    ';' => TokenType::Semicolon,
    '+' => TokenType::Plus,
    '-' => TokenType::Minus,
    '*' => TokenType::Star,
    '!' => TokenType::Bang
};

const KEYWORDS: phf::Map<&str, TokenType> = phf_map! {
    "def" => TokenType::Def,
    "io" => TokenType::Io,
    "imp" => TokenType::Imp,
    "var" => TokenType::Var,
    "val" => TokenType::Val,
    "struct" => TokenType::Struct,
    "if" => TokenType::If,
    "else" => TokenType::Else,
    "while" => TokenType::While,
    "new" => TokenType::New,
};

impl TokenType {
    pub fn name(&self) -> &'static str {
        match self {
            TokenType::Identifier => "an identifier",
            TokenType::Number => "a number",
            TokenType::StringLiteral => "a string literal",
            TokenType::LeftAngle => "'<'",
            TokenType::RightAngle => "'>'",
            TokenType::LeftParenthesis => "'('",
            TokenType::RightParenthesis => "')'",
            TokenType::LeftBrace => "'{'",
            TokenType::RightBrace => "'}'",
            TokenType::LeftBracket => "'['",
            TokenType::RightBracket => "']'",
            TokenType::Equal => "'='",
            TokenType::Comma => "','",
            TokenType::Period => "'.'",
            TokenType::Colon => "':'",
            TokenType::Semicolon => "';'",
            TokenType::Plus => "'+'",
            TokenType::Minus => "'-'",
            TokenType::Star => "'*'",
            TokenType::Bang => "'!'",
            TokenType::Def => "'def'",
            TokenType::Io => "'io'",
            TokenType::Imp => "'imp'",
            TokenType::Var => "'var'",
            TokenType::Val => "'val'",
            TokenType::Struct => "'struct'",
            TokenType::If => "'if'",
            TokenType::Else => "'else'",
            TokenType::While => "'while'",
            TokenType::New => "'new'",
            TokenType::Unrecognized => "unrecognized characters",
            TokenType::EOF => "the end of the file"
        }
    }
}

#[derive(Copy, Clone)]
pub struct Token<'a> {
    pub typ: TokenType,
    pub text: &'a str,
    pub leading_ws: bool,
    pub loc: Location<'a>
}

impl PartialEq<Self> for Token<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.typ == other.typ && self.text == other.text && self.leading_ws == other.leading_ws
    }
}

impl Eq for Token<'_> { }

impl Debug for Token<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token({:?}, {:?})", self.typ, self.text)
    }
}

pub struct Lexer<'a> {
    source: &'a Source,
    chars: Box<[(usize, char)]>,
    _idx: usize
}

impl<'a> Lexer<'a> {
    pub fn lex(source: &'a Source) -> Box<[Token<'a>]> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some(tok) = lexer.lex_token() {
            tokens.push(tok);
        }
        tokens.push(Token { typ: TokenType::EOF, text: "", leading_ws: false, loc: source.eof() });
        tokens.into_boxed_slice()
    }

    fn new(source: &'a Source) -> Self {
        let chars = source.text.char_indices().collect();
        Self { source, chars, _idx: 0 }
    }

    fn curr(&self) -> char {
        self.chars.get(self._idx).map_or('\0', |p| p.1)
    }

    fn idx(&self) -> usize {
        self.chars.get(self._idx).map_or(self.source.text.len(), |p| p.0)
    }

    fn advance(&mut self) {
        self._idx += 1;
    }

    fn is_done(&self) -> bool {
        self._idx >= self.chars.len()
    }

    fn create_token(&self, typ: TokenType, start: usize, end: usize, leading_ws: bool) -> Token<'a> {
        Token {
            typ,
            text: &self.source.text[start..end],
            leading_ws,
            loc: Location { source: self.source, start, len: end - start }
        }
    }

    fn is_unrecognized(c: char) -> bool {
        !BASIC_TOKENS.contains_key(&c)
            && !c.is_ascii_whitespace()
            && !c.is_ascii_digit()
            && !is_xid_start(c)
            && c != '"' && c != '#' && c != '\0'
    }

    fn lex_token(&mut self) -> Option<Token<'a>> {
        let mut leading_ws = false;
        while !self.is_done() {
            match self.curr() {
                c if BASIC_TOKENS.contains_key(&c) => {
                    let start = self.idx();
                    let ttype = BASIC_TOKENS[&c];
                    self.advance();
                    return Some(self.create_token(ttype, start, self.idx(), leading_ws));
                },
                c if c.is_ascii_whitespace() => {
                    leading_ws = true;
                    self.advance();
                },
                '#' => {
                    leading_ws = true;
                    while !self.is_done() && self.curr() != '\n' {
                        self.advance();
                    }
                },
                '"' => {
                    let start = self.idx();
                    self.advance();
                    while !self.is_done() && self.curr() != '"' {
                        if self.curr() == '\\' {
                            self.advance();
                        }
                        self.advance();
                    }
                    if self.is_done() {
                        return Some(self.create_token(TokenType::Unrecognized, start, self.idx(), leading_ws));
                    }
                    self.advance();
                    return Some(self.create_token(TokenType::StringLiteral, start, self.idx(), leading_ws));
                },
                c if c.is_ascii_digit() => {
                    let start = self.idx();
                    while self.curr().is_ascii_digit() {
                        self.advance();
                    }
                    return Some(self.create_token(TokenType::Number, start, self.idx(), leading_ws));
                },
                c if is_xid_start(c) => {
                    let start = self.idx();
                    while is_xid_continue(self.curr()) {
                        self.advance();
                    }
                    let token = self.create_token(TokenType::Identifier, start, self.idx(), leading_ws);

                    return if KEYWORDS.contains_key(token.text) {
                        Some(self.create_token(KEYWORDS[token.text], start, self.idx(), leading_ws))
                    } else {
                        Some(token)
                    }
                },
                _ => {
                    let start = self.idx();
                    while Lexer::is_unrecognized(self.curr()) && self.curr() != '\0' {
                        self.advance();
                    }
                    return Some(self.create_token(TokenType::Unrecognized, start, self.idx(), leading_ws));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use crate::parsing::lexer::{Lexer, Token, TokenType};
    use crate::source::{Location, Source};
    use TokenType::*;

    fn token<'a>(source: &'a Source, typ: TokenType, text: &'a str, leading_ws: bool) -> Token<'a> {
        Token { typ, text, leading_ws, loc: Location { source, start: 0, len: 0 } }
    }

    fn token_eof(source: &Source) -> Token {
        Token { typ: EOF, text: "", leading_ws: false, loc: source.eof() }
    }

    fn source(text: &str) -> Source {
        Source::from_text("<test>", text)
    }

    #[test]
    fn lex_empty() {
        let s = source("");
        let toks = Lexer::lex(&s);
        assert_eq!(toks, vec![token_eof(&s)].into());
    }

    #[test]
    fn lex_identifier() {
        let s = source("  alpha ");
        let toks = Lexer::lex(&s);
        assert_eq!(toks, vec![token(&s, Identifier, "alpha", true), token_eof(&s)].into());
    }

    #[test]
    fn lex_keywords() {
        let s = source("def io imp var val struct");
        let toks = Lexer::lex(&s);
        let types: Vec<TokenType> = toks.iter().map(|t| t.typ).collect();
        assert_eq!(types, vec![Def, Io, Imp, Var, Val, Struct, EOF]);
    }

    #[test]
    fn lex_maximal_munch() {
        let s = source("define");
        let toks = Lexer::lex(&s);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].typ, Identifier);
    }

    #[test]
    fn lex_number() {
        let s = source("204");
        let toks = Lexer::lex(&s);
        assert_eq!(toks, vec![token(&s, Number, "204", false), token_eof(&s)].into());
    }

    #[test]
    fn lex_string() {
        let s = source(r#""hi there""#);
        let toks = Lexer::lex(&s);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].typ, StringLiteral);
        assert_eq!(toks[0].text, r#""hi there""#);
    }

    #[test]
    fn lex_string_escape() {
        let s = source(r#""a\"b""#);
        let toks = Lexer::lex(&s);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].typ, StringLiteral);
    }

    #[test]
    fn lex_unterminated_string() {
        let s = source(r#""oops"#);
        let toks = Lexer::lex(&s);
        assert_eq!(toks[0].typ, Unrecognized);
    }

    #[test]
    fn lex_assign_symbol() {
        let s = source("x := 2");
        let toks = Lexer::lex(&s);
        let types: Vec<TokenType> = toks.iter().map(|t| t.typ).collect();
        assert_eq!(types, vec![Identifier, Colon, Equal, Number, EOF]);
        assert!(!toks[2].leading_ws);
    }

    #[test]
    fn lex_comment() {
        let s = source("a # the rest\nb");
        let toks = Lexer::lex(&s);
        let types: Vec<TokenType> = toks.iter().map(|t| t.typ).collect();
        assert_eq!(types, vec![Identifier, Identifier, EOF]);
        assert!(toks[1].leading_ws);
    }

    #[test]
    fn lex_unrecognized() {
        let s = source("```");
        let toks = Lexer::lex(&s);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].typ, Unrecognized);
    }
}
