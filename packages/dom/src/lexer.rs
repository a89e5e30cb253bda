//! Lexer for segment markup using logos
//!
//! Markup is lexed in two modes. [`ContentToken`] covers text, comments and
//! tag boundaries; after an opening tag name the lexer morphs into
//! [`TagToken`] to read attributes until the tag closes, then morphs back.

use logos::Logos;

/// Tokens outside of tags
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum ContentToken<'src> {
    #[regex(r"<!--([^-]|-[^-])*-->", |lex| {
        let s = lex.slice();
        &s[4..s.len() - 3]
    })]
    Comment(&'src str),

    // Doctype and other declarations carry no content
    #[regex(r"<![^-][^>]*>", logos::skip)]
    Declaration,

    #[regex(r"<[a-zA-Z][a-zA-Z0-9:_-]*", |lex| &lex.slice()[1..])]
    OpenTag(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9:_-]*[ \t\r\n]*>", |lex| {
        let s = lex.slice();
        s[2..s.len() - 1].trim_end()
    })]
    CloseTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),

    /// A `<` that does not start a tag is plain text
    #[token("<")]
    StrayLt,
}

/// Tokens inside an opening tag
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\x0C]+")]
pub enum TagToken<'src> {
    /// Attribute name, or an unquoted attribute value
    #[regex(r#"/?[^ \t\r\n\x0C"'<>=/]+(/[^ \t\r\n\x0C"'<>=/]+)*"#, |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    Quoted(&'src str),

    #[token(">")]
    End,

    #[token("/>")]
    SelfClose,

    #[token("/")]
    Slash,
}
