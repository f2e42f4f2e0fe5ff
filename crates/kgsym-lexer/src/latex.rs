//! LaTeX formula tokens.

use logos::Logos;

use crate::Terminal;

/// LaTeX tokens. Letters are single characters because `ab` means `a*b`.
#[derive(Logos, Debug, PartialEq, Eq, Clone)]
pub enum LatexToken {
    /// Control word without the backslash: `\frac` -> `frac`
    #[regex(r"\\[A-Za-z]+", |lex| lex.slice()[1..].to_owned())]
    Command(String),

    /// Spacing commands `\,` `\;` `\:` `\!` and `\ ` (ignored)
    #[regex(r"\\[,;:! ]", logos::skip)]
    Spacing,

    #[regex(r"[A-Za-z]", |lex| lex.slice().to_owned())]
    Letter(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_owned())]
    Number(String),

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token("^")]
    Caret,

    #[token("_")]
    Underscore,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token(",")]
    Comma,

    #[token("=")]
    Equals,

    /// Whitespace (ignored)
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Whitespace,

    /// End of input
    Eof,

    /// Lexer error
    Error,
}

impl Terminal for LatexToken {
    fn eof() -> Self {
        Self::Eof
    }

    fn error() -> Self {
        Self::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LatexLexer;

    fn kinds(input: &str) -> Vec<LatexToken> {
        LatexLexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_fraction() {
        let tokens = kinds(r"\frac{a}{b}");
        assert_eq!(
            tokens,
            vec![
                LatexToken::Command("frac".to_string()),
                LatexToken::LeftBrace,
                LatexToken::Letter("a".to_string()),
                LatexToken::RightBrace,
                LatexToken::LeftBrace,
                LatexToken::Letter("b".to_string()),
                LatexToken::RightBrace,
                LatexToken::Eof,
            ]
        );
    }

    #[test]
    fn test_letters_are_split() {
        let tokens = kinds("ab");
        assert_eq!(tokens[0], LatexToken::Letter("a".to_string()));
        assert_eq!(tokens[1], LatexToken::Letter("b".to_string()));
    }

    #[test]
    fn test_spacing_is_skipped() {
        let tokens = kinds(r"\int x \, dx");
        assert_eq!(
            tokens,
            vec![
                LatexToken::Command("int".to_string()),
                LatexToken::Letter("x".to_string()),
                LatexToken::Letter("d".to_string()),
                LatexToken::Letter("x".to_string()),
                LatexToken::Eof,
            ]
        );
    }

    #[test]
    fn test_scripts_and_numbers() {
        let tokens = kinds("x_1^{2.5}");
        assert_eq!(tokens[1], LatexToken::Underscore);
        assert_eq!(tokens[2], LatexToken::Number("1".to_string()));
        assert_eq!(tokens[3], LatexToken::Caret);
        assert_eq!(tokens[5], LatexToken::Number("2.5".to_string()));
    }

    #[test]
    fn test_unknown_character() {
        let tokens = kinds("a & b");
        assert_eq!(tokens[1], LatexToken::Error);
    }
}
