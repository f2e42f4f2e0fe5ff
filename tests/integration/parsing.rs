//! Integration tests for the lexer + parser pipelines
//! Tests the infix and LaTeX front ends against each other

use kgsym_ast::{Expr, KgError, Number, Symbol};
use kgsym_lexer::{InfixLexer, LatexLexer, LatexToken, Token};
use kgsym_parser::{Candidate, SymbolResolver, parse_expr, parse_latex};

fn infix(input: &str) -> Expr {
    parse_expr(input).unwrap()
}

fn latex(input: &str) -> Expr {
    parse_latex(input).unwrap()
}

#[test]
fn test_lexers_tokenize_same_formula() {
    let infix_tokens: Vec<Token> = InfixLexer::new("a*b**2")
        .tokenize()
        .into_iter()
        .map(|t| t.token)
        .collect();
    assert_eq!(
        infix_tokens,
        vec![
            Token::Ident("a".to_string()),
            Token::Star,
            Token::Ident("b".to_string()),
            Token::DoubleStar,
            Token::Integer("2".to_string()),
            Token::Eof,
        ]
    );

    let latex_tokens: Vec<LatexToken> = LatexLexer::new("ab^2")
        .tokenize()
        .into_iter()
        .map(|t| t.token)
        .collect();
    assert_eq!(
        latex_tokens,
        vec![
            LatexToken::Letter("a".to_string()),
            LatexToken::Letter("b".to_string()),
            LatexToken::Caret,
            LatexToken::Number("2".to_string()),
            LatexToken::Eof,
        ]
    );
}

#[test]
fn test_infix_and_latex_agree() {
    let pairs = [
        ("a + b*(a + c)", r"a + b(a + c)"),
        ("a/b - 1", r"\frac{a}{b} - 1"),
        ("x**(1/2)", r"\sqrt{x}"),
        ("sin(x)**2", r"\sin^2 x"),
        ("Sum(i**2, (i, 1, n))", r"\sum_{i=1}^{n} i^2"),
        ("Integral(x**2, (x, 0, 1))", r"\int_0^1 x^2 \, dx"),
    ];
    for (infix_text, latex_text) in pairs {
        assert_eq!(
            infix(infix_text),
            latex(latex_text),
            "{infix_text} vs {latex_text}"
        );
    }
}

#[test]
fn test_parsed_expressions_are_canonical() {
    let expr = infix("c + 2*a - a + b*0");
    assert_eq!(expr, infix("a + c"));
    assert_eq!(expr.to_string(), "a + c");

    match infix("x/4") {
        Expr::Mul(factors) => {
            assert_eq!(factors[0], Expr::Number(Number::Rational(1, 4)));
            assert_eq!(factors[1], Expr::symbol("x"));
        }
        _ => panic!("Expected product"),
    }
}

#[test]
fn test_display_reparses() {
    for input in ["b*(a + c) + a", "x**2 - 2*x + 1", "sin(x)/(1 + x)"] {
        let expr = infix(input);
        assert_eq!(infix(&expr.to_string()), expr, "{input}");
    }
}

#[test]
fn test_syntax_error_positions() {
    match parse_expr("a +\n  * b") {
        Err(KgError::Syntax { line, .. }) => assert_eq!(line, 2),
        _ => panic!("Expected syntax error"),
    }
    match parse_latex(r"\frac{a}") {
        Err(KgError::Syntax { .. }) => {}
        _ => panic!("Expected syntax error"),
    }
}

#[test]
fn test_latex_resolution_by_latex_string() {
    let resolver = SymbolResolver::new(vec![
        Candidate::new("I2000", "angle").with_latex(r"\alpha"),
        Candidate::new("I2001", "radius").with_latex("r"),
    ]);
    let resolved = resolver.resolve(&latex(r"r \cos(\alpha)")).unwrap();
    assert!(resolved.fresh.is_empty());

    let symbols = resolved.expr.symbols();
    assert!(symbols.contains(&Symbol::with_key("alpha", "I2000")));
    assert!(symbols.contains(&Symbol::with_key("r", "I2001")));
}

#[test]
fn test_latex_resolution_errors() {
    let resolver = SymbolResolver::new(vec![
        Candidate::new("I2000", "x"),
        Candidate::new("I2001", "x"),
    ]);
    match resolver.resolve(&latex("x + 1")) {
        Err(KgError::AmbiguousSymbol { candidates, .. }) => assert_eq!(candidates.len(), 2),
        _ => panic!("Expected ambiguous symbol"),
    }
    match resolver.resolve(&latex("y")) {
        Err(KgError::UnresolvedSymbol { name }) => assert_eq!(name, "y"),
        _ => panic!("Expected unresolved symbol"),
    }
}

#[test]
fn test_integer_overflow_in_both_front_ends() {
    let literal = "99999999999999999999";
    for result in [parse_expr(literal), parse_latex(literal)] {
        match result {
            Err(KgError::Syntax { message, .. }) => assert!(message.contains("out of range")),
            _ => panic!("Expected syntax error"),
        }
    }
}

#[test]
fn test_nesting_limit_in_both_front_ends() {
    let deep = format!("{}a{}", "(".repeat(50_000), ")".repeat(50_000));
    assert!(matches!(parse_expr(&deep), Err(KgError::Syntax { .. })));
    assert!(matches!(parse_latex(&deep), Err(KgError::Syntax { .. })));
}
