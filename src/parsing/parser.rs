use std::fmt;
use std::path::PathBuf;
use crate::parsing::ast::*;
use crate::error::Message;
use crate::source::{HasLoc, Location, Source};
use crate::parsing::lexer::{Lexer, Token, TokenType};
use crate::util::map_join;

pub fn parse_file(source: &Source) -> Result<File, Vec<ParserError>> {
    Parser::parse_file(source)
}

#[derive(Debug)]
pub enum ParserError<'a> {
    UnexpectedToken(Token<'a>, Vec<TokenType>),
    ExpectedSymbol(Token<'a>, &'static str),
    CouldNotParseNumber(Token<'a>, &'static str),
    InvalidEscape(Token<'a>, char)
}

impl<'a> Message for ParserError<'a> {
    fn write_into<W: fmt::Write>(&self, to: &mut W) -> fmt::Result {
        match self {
            ParserError::UnexpectedToken(token, expected) => {
                if expected.len() == 1 {
                    writeln!(to, "Error: Unexpected token. Got {}, but expected {}.", token.typ.name(), expected[0].name())?;
                } else {
                    writeln!(to, "Error: Unexpected token. Got {}, but expected any of {}.", token.typ.name(), map_join(expected, |e| e.name()))?;
                }
                Self::show_location(&token.loc, to)
            },
            ParserError::ExpectedSymbol(token, expected) => {
                writeln!(to, "Error: Unexpected token. Got {}, but expected the symbol {}.", token.typ.name(), expected)?;
                Self::show_location(&token.loc, to)
            },
            ParserError::CouldNotParseNumber(token, as_a) => {
                writeln!(to, "Error: Could not parse number literal into a {}.", as_a)?;
                Self::show_location(&token.loc, to)
            },
            ParserError::InvalidEscape(token, c) => {
                writeln!(to, "Error: Invalid escape sequence '\\{}' in string literal.", c)?;
                Self::show_location(&token.loc, to)
            }
        }
    }
}

type ParseResult<T> = Result<T, usize>;

struct Parser<'a> {
    tokens: Box<[Token<'a>]>,
    idx: usize,
    errors: Vec<ParserError<'a>>
}

impl<'a> Parser<'a> {
    fn parse_file(source: &'a Source) -> Result<File<'a>, Vec<ParserError<'a>>> {
        let mut parser = Self::new(source);

        let mut top_levels = Vec::new();
        while parser.curr().typ != TokenType::EOF {
            let top_level = match parser.parse_top_level() {
                Ok(n) => n,
                Err(_) => return Err(parser.errors)
            };
            top_levels.push(top_level);
        }
        Ok(File { path: PathBuf::from(source.path.clone()), top_levels })
    }

    fn new(source: &'a Source) -> Parser<'a> {
        let tokens = Lexer::lex(source);
        Parser { tokens, idx: 0, errors: Vec::new() }
    }

    fn curr(&self) -> Token<'a> {
        self.tokens[self.idx]
    }

    fn peek(&self) -> Token<'a> {
        if self.idx + 1 >= self.tokens.len() {
            self.tokens[self.idx]
        } else {
            self.tokens[self.idx + 1]
        }
    }

    fn advance(&mut self) -> Token<'a> {
        let ret = self.curr();
        if self.idx + 1 < self.tokens.len() {
            self.idx += 1;
        }
        ret
    }

    fn expect(&mut self, ttype: TokenType) -> ParseResult<Token<'a>> {
        if self.curr().typ == ttype {
            Ok(self.advance())
        } else {
            self.errors.push(ParserError::UnexpectedToken(self.curr(), vec![ttype]));
            Err(0)
        }
    }

    fn expect_symbol(&mut self, first: TokenType, second: TokenType, name: &'static str) -> ParseResult<()> {
        if self.matches_symbol(first, second) {
            self.advance();
            self.advance();
            Ok(())
        } else {
            self.errors.push(ParserError::ExpectedSymbol(self.curr(), name));
            Err(0)
        }
    }

    fn matches_symbol(&self, first: TokenType, second: TokenType) -> bool {
        self.curr().typ == first && !self.peek().leading_ws && self.peek().typ == second
    }

    fn delimited_parse<T>(&mut self, left: TokenType, right: TokenType, mut each: impl FnMut(&mut Self) -> ParseResult<T>) -> ParseResult<(Vec<T>, Location<'a>)> {
        let start = self.expect(left)?;
        let mut items = Vec::new();
        while self.curr().typ != right {
            let item = each(self)?;
            items.push(item);
            if self.curr().typ == TokenType::Comma {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.expect(right)?;
        Ok((items, start.loc + end.loc))
    }

    fn parse_top_level(&mut self) -> ParseResult<TopLevel<'a>> {
        match self.curr().typ {
            TokenType::Def => Ok(TopLevel::Function(self.parse_function(Purity::Pure)?)),
            TokenType::Io => {
                self.expect(TokenType::Io)?;
                Ok(TopLevel::Function(self.parse_function(Purity::FunIO)?))
            },
            TokenType::Imp => self.parse_extern(),
            TokenType::Struct => self.parse_struct(),
            _ => {
                self.errors.push(ParserError::UnexpectedToken(self.curr(), vec![TokenType::Def, TokenType::Io, TokenType::Imp, TokenType::Struct]));
                Err(0)
            }
        }
    }

    fn parse_function(&mut self, purity: Purity) -> ParseResult<Function<'a>> {
        let start = self.expect(TokenType::Def)?;
        let name = self.expect(TokenType::Identifier)?;
        let type_parameters = if self.curr().typ == TokenType::LeftAngle {
            let (type_parameters, _) = self.delimited_parse(TokenType::LeftAngle, TokenType::RightAngle, Self::parse_type_parameter)?;
            type_parameters
        } else {
            vec![]
        };
        let (parameters, param_loc) = self.delimited_parse(TokenType::LeftParenthesis, TokenType::RightParenthesis, Self::parse_parameter)?;
        let return_type = if self.matches_symbol(TokenType::Minus, TokenType::RightAngle) {
            self.expect_symbol(TokenType::Minus, TokenType::RightAngle, "'->'")?;
            Some(Box::new(self.parse_type()?))
        } else {
            None
        };
        let body = self.parse_block()?;
        let loc = start.loc + return_type.as_ref().map_or(param_loc, |t| t.loc());
        Ok(Function { name: name.text.to_owned(), purity, type_parameters, parameters, return_type, body, loc })
    }

    fn parse_extern(&mut self) -> ParseResult<TopLevel<'a>> {
        let start = self.expect(TokenType::Imp)?;
        let name = self.expect(TokenType::Identifier)?;
        let (parameter_types, _) = self.delimited_parse(TokenType::LeftParenthesis, TokenType::RightParenthesis, |this| this.parse_type())?;
        self.expect_symbol(TokenType::Minus, TokenType::RightAngle, "'->'")?;
        let return_type = Box::new(self.parse_type()?);
        let end = self.expect(TokenType::Semicolon)?;
        Ok(TopLevel::Extern(Extern {
            name: name.text.to_owned(),
            parameter_types,
            return_type,
            loc: start.loc + end.loc
        }))
    }

    fn parse_struct(&mut self) -> ParseResult<TopLevel<'a>> {
        let start = self.expect(TokenType::Struct)?;
        let name = self.expect(TokenType::Identifier)?;
        let type_parameters = if self.curr().typ == TokenType::LeftAngle {
            let (type_parameters, _) = self.delimited_parse(TokenType::LeftAngle, TokenType::RightAngle, Self::parse_type_parameter)?;
            type_parameters
        } else {
            vec![]
        };
        let mut fields = Vec::new();
        self.expect(TokenType::LeftBrace)?;
        while self.curr().typ != TokenType::RightBrace {
            let field_name = self.expect(TokenType::Identifier)?;
            self.expect(TokenType::Colon)?;
            let typ = Box::new(self.parse_type()?);
            let end = self.expect(TokenType::Semicolon)?;
            fields.push(Field { name: field_name.text.to_owned(), typ, loc: field_name.loc + end.loc });
        }
        self.expect(TokenType::RightBrace)?;
        Ok(TopLevel::Struct(Struct { name: name.text.to_owned(), type_parameters, fields, loc: start.loc + name.loc }))
    }

    fn parse_type_parameter(&mut self) -> ParseResult<TypeParameter<'a>> {
        let name = self.expect(TokenType::Identifier)?;
        Ok(TypeParameter { name: name.text.to_owned(), loc: name.loc })
    }

    fn parse_parameter(&mut self) -> ParseResult<Parameter<'a>> {
        let name = self.expect(TokenType::Identifier)?;
        let (typ, loc) = if self.curr().typ == TokenType::Colon {
            self.expect(TokenType::Colon)?;
            let typ = Box::new(self.parse_type()?);
            let loc = name.loc + typ.loc();
            (Some(typ), loc)
        } else {
            (None, name.loc)
        };
        Ok(Parameter { name: name.text.to_owned(), typ, loc })
    }

    fn parse_block(&mut self) -> ParseResult<Block<'a>> {
        let start = self.expect(TokenType::LeftBrace)?;
        let mut items = Vec::new();
        while self.curr().typ != TokenType::RightBrace {
            let item = self.parse_block_item()?;
            items.push(item);
            if self.curr().typ == TokenType::Semicolon {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.expect(TokenType::RightBrace)?;
        Ok(Block { items, loc: start.loc + end.loc })
    }

    fn parse_block_item(&mut self) -> ParseResult<BlockItem<'a>> {
        match self.curr().typ {
            TokenType::Var | TokenType::Val => {
                let start = self.advance();
                let mutable = start.typ == TokenType::Var;
                let name = self.expect(TokenType::Identifier)?;
                self.expect(TokenType::Equal)?;
                let value = Box::new(self.parse_expr()?);
                let loc = start.loc + value.loc();
                Ok(BlockItem::Binding { name: name.text.to_owned(), mutable, value, loc })
            },
            TokenType::Def => Ok(BlockItem::Func(self.parse_function(Purity::Pure)?)),
            TokenType::Io => {
                self.expect(TokenType::Io)?;
                Ok(BlockItem::Func(self.parse_function(Purity::FunIO)?))
            },
            _ => Ok(BlockItem::Expr(self.parse_expr()?))
        }
    }

    fn parse_expr(&mut self) -> ParseResult<Expr<'a>> {
        self.parse_assign()
    }

    fn parse_assign(&mut self) -> ParseResult<Expr<'a>> {
        let target = self.parse_compare()?;
        if self.matches_symbol(TokenType::Colon, TokenType::Equal) {
            self.advance();
            self.advance();
            let value = Box::new(self.parse_assign()?);
            let loc = target.loc() + value.loc();
            Ok(Expr::Assign { target: Box::new(target), value, loc })
        } else {
            Ok(target)
        }
    }

    fn parse_compare(&mut self) -> ParseResult<Expr<'a>> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.matches_symbol(TokenType::Equal, TokenType::Equal) {
                self.advance();
                self.advance();
                BinOp::Eq
            } else if self.curr().typ == TokenType::LeftAngle {
                self.advance();
                BinOp::Lt
            } else {
                break;
            };
            let right = self.parse_additive()?;
            let loc = left.loc() + right.loc();
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), loc };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr<'a>> {
        let mut left = self.parse_factor()?;
        loop {
            let op = if self.matches_symbol(TokenType::Plus, TokenType::Plus) {
                self.advance();
                self.advance();
                BinOp::Join
            } else if self.curr().typ == TokenType::Plus {
                self.advance();
                BinOp::Add
            } else if self.curr().typ == TokenType::Minus {
                self.advance();
                BinOp::Sub
            } else {
                break;
            };
            let right = self.parse_factor()?;
            let loc = left.loc() + right.loc();
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), loc };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> ParseResult<Expr<'a>> {
        let mut left = self.parse_unary()?;
        while self.curr().typ == TokenType::Star {
            self.advance();
            let right = self.parse_unary()?;
            let loc = left.loc() + right.loc();
            left = Expr::BinOp { left: Box::new(left), op: BinOp::Mul, right: Box::new(right), loc };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr<'a>> {
        if self.curr().typ == TokenType::Bang {
            let start = self.advance();
            let sub = Box::new(self.parse_unary()?);
            let loc = start.loc + sub.loc();
            Ok(Expr::Not { sub, loc })
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr<'a>> {
        let mut left = self.parse_terminal()?;
        loop {
            match self.curr().typ {
                TokenType::Period => {
                    self.expect(TokenType::Period)?;
                    let field = self.expect(TokenType::Identifier)?;
                    let loc = left.loc() + field.loc;
                    left = Expr::Member { source: Box::new(left), field: field.text.to_owned(), loc };
                },
                TokenType::LeftBracket => {
                    self.expect(TokenType::LeftBracket)?;
                    let index = Box::new(self.parse_expr()?);
                    let end = self.expect(TokenType::RightBracket)?;
                    let loc = left.loc() + end.loc;
                    left = Expr::Index { source: Box::new(left), index, loc };
                },
                TokenType::LeftParenthesis => {
                    if !matches!(left, Expr::Name { .. }) {
                        break;
                    }
                    let Expr::Name { name, loc: name_loc } = left else { unreachable!() };
                    let (arguments, args_loc) = self.delimited_parse(TokenType::LeftParenthesis, TokenType::RightParenthesis, Self::parse_expr)?;
                    left = Expr::Call { callee: name, arguments, loc: name_loc + args_loc };
                },
                _ => break
            }
        }
        Ok(left)
    }

    fn parse_terminal(&mut self) -> ParseResult<Expr<'a>> {
        match self.curr().typ {
            TokenType::Identifier => {
                let tok = self.advance();
                Ok(Expr::Name { name: tok.text.to_owned(), loc: tok.loc })
            },
            TokenType::Number => {
                let tok = self.advance();
                let Ok(value) = tok.text.parse::<i64>() else {
                    self.errors.push(ParserError::CouldNotParseNumber(tok, "64-bit integer"));
                    return Err(0);
                };
                Ok(Expr::Number { value, loc: tok.loc })
            },
            TokenType::StringLiteral => {
                let tok = self.advance();
                let value = self.unescape(tok)?;
                Ok(Expr::StringLiteral { value, loc: tok.loc })
            },
            TokenType::LeftParenthesis => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenType::RightParenthesis)?;
                Ok(expr)
            },
            TokenType::LeftBrace => {
                Ok(Expr::Block(self.parse_block()?))
            },
            TokenType::If => {
                let start = self.advance();
                self.expect(TokenType::LeftParenthesis)?;
                let cond = Box::new(self.parse_expr()?);
                self.expect(TokenType::RightParenthesis)?;
                let then_do = Box::new(self.parse_expr()?);
                self.expect(TokenType::Else)?;
                let else_do = Box::new(self.parse_expr()?);
                let loc = start.loc + else_do.loc();
                Ok(Expr::If { cond, then_do, else_do, loc })
            },
            TokenType::While => {
                let start = self.advance();
                self.expect(TokenType::LeftParenthesis)?;
                let cond = Box::new(self.parse_expr()?);
                self.expect(TokenType::RightParenthesis)?;
                let body = Box::new(self.parse_expr()?);
                let loc = start.loc + body.loc();
                Ok(Expr::While { cond, body, loc })
            },
            TokenType::New => self.parse_new(),
            _ => {
                self.errors.push(ParserError::UnexpectedToken(self.curr(), vec![TokenType::Identifier, TokenType::Number, TokenType::LeftParenthesis]));
                Err(0)
            }
        }
    }

    fn parse_new(&mut self) -> ParseResult<Expr<'a>> {
        let start = self.expect(TokenType::New)?;
        let typ = self.parse_type()?;
        if self.curr().typ == TokenType::LeftBracket {
            self.expect(TokenType::LeftBracket)?;
            let size = Box::new(self.parse_expr()?);
            self.expect(TokenType::RightBracket)?;
            self.expect(TokenType::LeftParenthesis)?;
            let default = Box::new(self.parse_expr()?);
            let end = self.expect(TokenType::RightParenthesis)?;
            return Ok(Expr::NewArray { element: Box::new(typ), size, default, loc: start.loc + end.loc });
        }
        let (name, type_args) = match typ {
            Type::Name { name, .. } => (name, vec![]),
            Type::Parameterized { name, args, .. } => (name, args),
            Type::Function { loc, .. } => {
                self.errors.push(ParserError::UnexpectedToken(Token {
                    typ: TokenType::LeftParenthesis, text: "", leading_ws: false, loc
                }, vec![TokenType::Identifier]));
                return Err(0);
            }
        };
        let (arguments, args_loc) = self.delimited_parse(TokenType::LeftParenthesis, TokenType::RightParenthesis, Self::parse_expr)?;
        Ok(Expr::NewStruct { name, type_args, arguments, loc: start.loc + args_loc })
    }

    fn unescape(&mut self, tok: Token<'a>) -> ParseResult<String> {
        let inner = &tok.text[1..tok.text.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    self.errors.push(ParserError::InvalidEscape(tok, other));
                    return Err(0);
                },
                None => unreachable!("lexer guarantees terminated strings")
            }
        }
        Ok(out)
    }

    fn parse_type(&mut self) -> ParseResult<Type<'a>> {
        match self.curr().typ {
            TokenType::Identifier => {
                let name = self.advance();
                if self.curr().typ == TokenType::LeftAngle {
                    let (args, loc) = self.delimited_parse(TokenType::LeftAngle, TokenType::RightAngle, Self::parse_type)?;
                    Ok(Type::Parameterized { name: name.text.to_owned(), args, loc: name.loc + loc })
                } else {
                    Ok(Type::Name { name: name.text.to_owned(), loc: name.loc })
                }
            },
            TokenType::LeftParenthesis => {
                let (parameters, start) = self.delimited_parse(TokenType::LeftParenthesis, TokenType::RightParenthesis, Self::parse_type)?;
                self.expect_symbol(TokenType::Minus, TokenType::RightAngle, "'->'")?;
                let ret = Box::new(self.parse_type()?);
                let loc = start + ret.loc();
                Ok(Type::Function { parameters, ret, loc })
            },
            _ => {
                self.errors.push(ParserError::UnexpectedToken(self.curr(), vec![TokenType::Identifier, TokenType::LeftParenthesis]));
                Err(0)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::error::Message;
    use crate::parsing::ast::{BinOp, BlockItem, Expr, Purity, TopLevel, Type};
    use crate::parsing::parser::{parse_file, Parser};
    use crate::source::Source;

    fn source(text: &str) -> Source {
        Source::from_text("<test>", text)
    }

    #[test]
    fn test_expr_call() {
        let s = source("hello(ad, 1)");
        let mut p = Parser::new(&s);
        let e = p.parse_expr().unwrap_or_else(|_| panic!("{:?}", p.errors));

        let Expr::Call { callee, arguments, .. } = e else { panic!() };
        assert_eq!(callee, "hello");
        assert_eq!(arguments.len(), 2);
    }

    #[test]
    fn test_expr_precedence() {
        let s = source("1 + 2 * 3 == 7");
        let mut p = Parser::new(&s);
        let e = p.parse_expr().unwrap();

        let Expr::BinOp { op: BinOp::Eq, left, .. } = e else { panic!("{:?}", e) };
        let Expr::BinOp { op: BinOp::Add, right, .. } = *left else { panic!() };
        let Expr::BinOp { op: BinOp::Mul, .. } = *right else { panic!() };
    }

    #[test]
    fn test_expr_less_than() {
        let s = source("i < 10");
        let mut p = Parser::new(&s);
        let e = p.parse_expr().unwrap();

        let Expr::BinOp { op: BinOp::Lt, .. } = e else { panic!("{:?}", e) };
    }

    #[test]
    fn test_expr_join() {
        let s = source(r#""a" ++ "b""#);
        let mut p = Parser::new(&s);
        let e = p.parse_expr().unwrap();

        let Expr::BinOp { op: BinOp::Join, left, .. } = e else { panic!("{:?}", e) };
        let Expr::StringLiteral { value, .. } = *left else { panic!() };
        assert_eq!(value, "a");
    }

    #[test]
    fn test_expr_assign() {
        let s = source("x := x + 1");
        let mut p = Parser::new(&s);
        let e = p.parse_expr().unwrap();

        let Expr::Assign { target, .. } = e else { panic!("{:?}", e) };
        let Expr::Name { name, .. } = *target else { panic!() };
        assert_eq!(name, "x");
    }

    #[test]
    fn test_expr_member_index() {
        let s = source("p.first[0]");
        let mut p = Parser::new(&s);
        let e = p.parse_expr().unwrap();

        let Expr::Index { source: src, .. } = e else { panic!("{:?}", e) };
        let Expr::Member { field, .. } = *src else { panic!() };
        assert_eq!(field, "first");
    }

    #[test]
    fn test_expr_new_array() {
        let s = source("new Int32[10](0)");
        let mut p = Parser::new(&s);
        let e = p.parse_expr().unwrap_or_else(|_| panic!("{:?}", p.errors));

        let Expr::NewArray { element, .. } = e else { panic!("{:?}", e) };
        let Type::Name { name, .. } = *element else { panic!() };
        assert_eq!(name, "Int32");
    }

    #[test]
    fn test_expr_new_struct() {
        let s = source("new Pair<Int32>(1, 2)");
        let mut p = Parser::new(&s);
        let e = p.parse_expr().unwrap_or_else(|_| panic!("{:?}", p.errors));

        let Expr::NewStruct { name, type_args, arguments, .. } = e else { panic!("{:?}", e) };
        assert_eq!(name, "Pair");
        assert_eq!(type_args.len(), 1);
        assert_eq!(arguments.len(), 2);
    }

    #[test]
    fn test_function() {
        let s = source(r"
            def main() -> Int32 { 0 }
        ");
        let mut p = Parser::new(&s);
        let f = p.parse_function(Purity::Pure).unwrap_or_else(|_| panic!("{:?}", p.errors));

        assert_eq!(f.name, "main");
        assert!(f.parameters.is_empty());
        assert!(f.return_type.is_some());
    }

    #[test]
    fn test_function_generics() {
        let s = source(r"
            def id<T>(x: T) -> T { x }
        ");
        let mut p = Parser::new(&s);
        let f = p.parse_function(Purity::Pure).unwrap_or_else(|_| panic!("{:?}", p.errors));

        assert_eq!(f.type_parameters.len(), 1);
        assert_eq!(f.type_parameters[0].name, "T");
        assert_eq!(f.parameters.len(), 1);
    }

    #[test]
    fn test_function_untyped_parameter() {
        let s = source(r"
            def f(n) -> Int32 { n }
        ");
        let mut p = Parser::new(&s);
        let f = p.parse_function(Purity::Pure).unwrap();
        assert!(f.parameters[0].typ.is_none());
    }

    #[test]
    fn test_nested_def() {
        let s = source(r"
            def f(n: Int32) -> Int32 {
                def g() -> Int32 { n + 1 };
                g()
            }
        ");
        let mut p = Parser::new(&s);
        let f = p.parse_function(Purity::Pure).unwrap_or_else(|_| panic!("{:?}", p.errors));

        assert_eq!(f.body.items.len(), 2);
        let BlockItem::Func(g) = &f.body.items[0] else { panic!("{:?}", f.body.items) };
        assert_eq!(g.name, "g");
    }

    #[test]
    fn test_file() {
        let s = source(r#"
            struct Pair<T> {
                first: T;
                second: T;
            }

            imp puts(String) -> Void;

            io def greet(name: String) -> Void {
                puts("hello " ++ name)
            }

            def main() -> Int32 {
                var i = 0;
                while (i < 10) { i := i + 1 };
                i
            }
        "#);

        let file = parse_file(&s).unwrap_or_else(|e| panic!("{}", e[0].render_to_string()));
        assert_eq!(file.top_levels.len(), 4);
        let TopLevel::Function(greet) = &file.top_levels[2] else { panic!() };
        assert_eq!(greet.purity, Purity::FunIO);
    }

    #[test]
    fn test_parsing_error_missing_semicolon() {
        let s = source(r"
            def main() -> Int32 {
                val a = 0
                a
            }
        ");

        let errs = parse_file(&s).unwrap_err();
        assert!(!errs.is_empty());
        errs[0].render_to_string();
    }

    #[test]
    fn test_parsing_error_bad_toplevel() {
        let s = source("fn main() {}");
        parse_file(&s).unwrap_err();
    }
}
