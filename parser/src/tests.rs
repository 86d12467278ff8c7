//! FILENAME: parser/src/tests.rs
//! PURPOSE: Consolidated unit tests for the parser crate.

use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::lexer::Lexer;
use crate::parser::parse;
use crate::token::Token;

fn num(n: f64) -> Expression {
    Expression::Number(n)
}

fn cell(label: &str) -> Expression {
    Expression::CellRef(label.to_string())
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn unary(op: UnaryOperator, operand: Expression) -> Expression {
    Expression::UnaryOp {
        op,
        operand: Box::new(operand),
    }
}

// ========================================
// LEXER TESTS
// ========================================

#[test]
fn lexer_tokenizes_simple_math() {
    let mut lexer = Lexer::new("1 + 2");

    assert_eq!(lexer.next_token(), Token::Number(1.0));
    assert_eq!(lexer.next_token(), Token::Plus);
    assert_eq!(lexer.next_token(), Token::Number(2.0));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_tokenizes_all_operators() {
    let mut lexer = Lexer::new("+ - * / ( )");

    assert_eq!(lexer.next_token(), Token::Plus);
    assert_eq!(lexer.next_token(), Token::Minus);
    assert_eq!(lexer.next_token(), Token::Asterisk);
    assert_eq!(lexer.next_token(), Token::Slash);
    assert_eq!(lexer.next_token(), Token::LParen);
    assert_eq!(lexer.next_token(), Token::RParen);
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_tokenizes_decimal_numbers() {
    let mut lexer = Lexer::new("3.14 .5 12.");

    assert_eq!(lexer.next_token(), Token::Number(3.14));
    assert_eq!(lexer.next_token(), Token::Number(0.5));
    assert_eq!(lexer.next_token(), Token::Number(12.0));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_lone_dot_is_illegal() {
    let mut lexer = Lexer::new(".");
    assert_eq!(lexer.next_token(), Token::Illegal('.'));
}

#[test]
fn lexer_tokenizes_references() {
    let mut lexer = Lexer::new("A1+AZ12");

    assert_eq!(lexer.next_token(), Token::Reference("A1".to_string()));
    assert_eq!(lexer.next_token(), Token::Plus);
    assert_eq!(lexer.next_token(), Token::Reference("AZ12".to_string()));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_preserves_label_case_and_shape() {
    // Not every label addresses a cell; the lexer does not judge.
    let mut lexer = Lexer::new("e2 R2D2");

    assert_eq!(lexer.next_token(), Token::Reference("e2".to_string()));
    assert_eq!(lexer.next_token(), Token::Reference("R2D2".to_string()));
}

#[test]
fn lexer_flags_unknown_characters() {
    let mut lexer = Lexer::new("1 # 2");

    assert_eq!(lexer.next_token(), Token::Number(1.0));
    assert_eq!(lexer.next_token(), Token::Illegal('#'));
}

// ========================================
// PARSER TESTS - LITERALS AND REFERENCES
// ========================================

#[test]
fn parser_parses_number_literal() {
    assert_eq!(parse("42").unwrap(), num(42.0));
}

#[test]
fn parser_parses_decimal_number() {
    assert_eq!(parse("3.14159").unwrap(), num(3.14159));
}

#[test]
fn parser_parses_cell_reference() {
    assert_eq!(parse("B12").unwrap(), cell("B12"));
}

#[test]
fn parser_accepts_unresolvable_labels() {
    // Syntactically a reference; which cell it names is not this crate's call.
    assert_eq!(parse("ZZZZ1").unwrap(), cell("ZZZZ1"));
}

// ========================================
// PARSER TESTS - OPERATORS AND PRECEDENCE
// ========================================

#[test]
fn parser_parses_addition() {
    assert_eq!(
        parse("1+2").unwrap(),
        binary(num(1.0), BinaryOperator::Add, num(2.0))
    );
}

#[test]
fn parser_honors_precedence() {
    // 1+2*3 must parse as 1+(2*3)
    assert_eq!(
        parse("1+2*3").unwrap(),
        binary(
            num(1.0),
            BinaryOperator::Add,
            binary(num(2.0), BinaryOperator::Multiply, num(3.0)),
        )
    );
}

#[test]
fn parser_honors_left_associativity() {
    // 1-2-3 must parse as (1-2)-3
    assert_eq!(
        parse("1-2-3").unwrap(),
        binary(
            binary(num(1.0), BinaryOperator::Subtract, num(2.0)),
            BinaryOperator::Subtract,
            num(3.0),
        )
    );
}

#[test]
fn parser_honors_parentheses() {
    assert_eq!(
        parse("(1+2)*3").unwrap(),
        binary(
            binary(num(1.0), BinaryOperator::Add, num(2.0)),
            BinaryOperator::Multiply,
            num(3.0),
        )
    );
}

#[test]
fn parser_parses_unary_sign() {
    assert_eq!(parse("-5").unwrap(), unary(UnaryOperator::Negate, num(5.0)));
    assert_eq!(parse("+A1").unwrap(), unary(UnaryOperator::Plus, cell("A1")));
}

#[test]
fn parser_parses_stacked_unary_signs() {
    assert_eq!(
        parse("--2").unwrap(),
        unary(UnaryOperator::Negate, unary(UnaryOperator::Negate, num(2.0)))
    );
}

#[test]
fn parser_parses_unary_in_binary_context() {
    // 1--2 is 1-(-2)
    assert_eq!(
        parse("1--2").unwrap(),
        binary(
            num(1.0),
            BinaryOperator::Subtract,
            unary(UnaryOperator::Negate, num(2.0)),
        )
    );
}

#[test]
fn parser_skips_whitespace() {
    assert_eq!(parse(" 1 +  2 ").unwrap(), parse("1+2").unwrap());
}

// ========================================
// PARSER TESTS - ERRORS
// ========================================

#[test]
fn parser_rejects_empty_input() {
    assert!(parse("").is_err());
    assert!(parse("   ").is_err());
}

#[test]
fn parser_rejects_trailing_tokens() {
    assert!(parse("1 2").is_err());
    assert!(parse("A1 B2").is_err());
    assert!(parse("1+2)").is_err());
}

#[test]
fn parser_rejects_unbalanced_parentheses() {
    assert!(parse("(1+2").is_err());
    assert!(parse("()").is_err());
}

#[test]
fn parser_rejects_misplaced_operators() {
    assert!(parse("1+").is_err());
    assert!(parse("*2").is_err());
    assert!(parse("1+*2").is_err());
}

#[test]
fn parser_rejects_illegal_characters() {
    assert!(parse("1 # 2").is_err());
    assert!(parse("A1 & A2").is_err());
}

// ========================================
// CANONICAL PRINTING
// ========================================

#[test]
fn print_drops_redundant_parentheses() {
    assert_eq!(parse("1+(2*3)").unwrap().to_string(), "1+2*3");
    assert_eq!(parse("(1)+(2)").unwrap().to_string(), "1+2");
    assert_eq!(parse("((A1))").unwrap().to_string(), "A1");
    assert_eq!(parse("(1+2)-3").unwrap().to_string(), "1+2-3");
    assert_eq!(parse("(1*2)/3").unwrap().to_string(), "1*2/3");
}

#[test]
fn print_keeps_meaningful_parentheses() {
    assert_eq!(parse("(1+2)*3").unwrap().to_string(), "(1+2)*3");
    assert_eq!(parse("1-(2+3)").unwrap().to_string(), "1-(2+3)");
    assert_eq!(parse("1-(2-3)").unwrap().to_string(), "1-(2-3)");
    assert_eq!(parse("8/(4/2)").unwrap().to_string(), "8/(4/2)");
    assert_eq!(parse("8/(4*2)").unwrap().to_string(), "8/(4*2)");
}

#[test]
fn print_handles_unary_sign() {
    assert_eq!(parse("-5").unwrap().to_string(), "-5");
    assert_eq!(parse("+5").unwrap().to_string(), "+5");
    assert_eq!(parse("-(1+2)").unwrap().to_string(), "-(1+2)");
    assert_eq!(parse("-(2*3)").unwrap().to_string(), "-2*3");
    assert_eq!(parse("1--2").unwrap().to_string(), "1--2");
}

#[test]
fn print_is_a_fixed_point() {
    for input in ["(1+2)*3", "1+(2*3)", "-(1+2)", "1-(2-3)", "A1/(B2*C3)"] {
        let printed = parse(input).unwrap().to_string();
        assert_eq!(parse(&printed).unwrap().to_string(), printed);
    }
}

#[test]
fn print_formats_numbers_plainly() {
    assert_eq!(parse("12.").unwrap().to_string(), "12");
    assert_eq!(parse("0.50").unwrap().to_string(), "0.5");
    assert_eq!(parse("3.14").unwrap().to_string(), "3.14");
}
