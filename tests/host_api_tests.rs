// Tests for the embedding API: host-bound variables, session state, options,
// the tokenizer and the symbol table.

use std::cell::Cell;

use gparse::numeric::{self, BinaryOp};
use gparse::{
    ErrorKind, ExternalRef, Kind, Lexer, NameTree, Named, NumericError, Parser, ParserOptions,
    Scope, Status, TokenType, Value,
};

#[test]
fn host_variables_are_shared_both_ways() {
    let counter = Cell::new(10i32);
    let ratio = Cell::new(0.5f64);
    let mut parser = Parser::new();
    parser.bind_external("counter", ExternalRef::Int(&counter)).unwrap();
    parser.bind_external("ratio", ExternalRef::Double(&ratio)).unwrap();

    assert_eq!(parser.execute("counter = counter * 2 + 1"), Status::Ok);
    assert_eq!(counter.get(), 21);

    counter.set(100);
    assert_eq!(parser.execute("counter + 1"), Status::Ok);
    assert_eq!(parser.ans(), Some(Value::Int(101)));

    // Host storage keeps its kind even in implicit mode.
    assert_eq!(parser.execute("counter = 2.9"), Status::Ok);
    assert_eq!(counter.get(), 2);
    assert_eq!(parser.find("counter").unwrap().kind(), Kind::Int);

    assert_eq!(parser.execute("ratio = 3"), Status::Ok);
    assert_eq!(ratio.get(), 3.0);
    assert!(parser.find("ratio").unwrap().is_external());
}

#[test]
fn host_variable_rejects_bool_from_number() {
    let flag = Cell::new(true);
    let mut parser = Parser::new();
    parser.bind_external("flag", ExternalRef::Bool(&flag)).unwrap();

    assert_eq!(parser.execute("flag = 0"), Status::Error);
    assert_eq!(parser.last_error().unwrap().kind, ErrorKind::TypeError);
    assert!(flag.get());

    assert_eq!(parser.execute("flag = !flag"), Status::Ok);
    assert!(!flag.get());
}

#[test]
fn bind_external_validates_names() {
    let value = Cell::new(1i64);
    let mut parser = Parser::new();

    let error = parser.bind_external("2x", ExternalRef::Int64(&value)).unwrap_err();
    assert_eq!(error.kind, ErrorKind::SyntaxError);

    let error = parser.bind_external("int", ExternalRef::Int64(&value)).unwrap_err();
    assert_eq!(error.kind, ErrorKind::SyntaxError);

    let variable = parser.bind_external("total", ExternalRef::Int64(&value)).unwrap();
    assert_eq!(variable.name(), "total");
    assert_eq!(variable.kind(), Kind::Int64);

    let error = parser.bind_external("total", ExternalRef::Int64(&value)).unwrap_err();
    assert_eq!(error.kind, ErrorKind::NameError);
}

#[test]
fn explicit_declarations_require_existing_targets() {
    let mut parser = Parser::with_options(ParserOptions {
        explicit_declarations: true,
        ..ParserOptions::default()
    });
    assert!(parser.explicit_declarations());

    assert_eq!(parser.execute("x = 1"), Status::Error);
    assert_eq!(parser.last_error().unwrap().kind, ErrorKind::NameError);
    assert_eq!(parser.error_column(), Some(0));
    assert!(parser.error_message().unwrap().contains("Undeclared variable 'x'"));
    assert!(parser.find("x").is_none());

    // Typed targets keep their kind.
    assert_eq!(parser.execute("int x; x = 2.7; x"), Status::Ok);
    assert_eq!(parser.ans(), Some(Value::Int(2)));

    parser.set_explicit_declarations(false);
    assert_eq!(parser.execute("y = 1.5"), Status::Ok);
    assert_eq!(parser.find("y").unwrap().value(), Value::Double(1.5));
}

#[test]
fn session_state_survives_between_calls() {
    let mut parser = Parser::new();
    assert!(parser.ans_as_double().is_nan());

    assert_eq!(parser.execute("x = 1"), Status::Ok);
    assert_eq!(parser.execute("x + 1"), Status::Ok);
    assert_eq!(parser.ans(), Some(Value::Int(2)));

    // Declarations and structs leave `ans` alone.
    assert_eq!(parser.execute("5"), Status::Ok);
    assert_eq!(parser.execute("int z = 3"), Status::Ok);
    assert_eq!(parser.execute("struct s { 42 }"), Status::Ok);
    assert_eq!(parser.ans(), Some(Value::Int(5)));

    assert_eq!(parser.execute("   "), Status::NoCommand);
    assert_eq!(parser.ans(), Some(Value::Int(5)));

    assert_eq!(parser.execute("true"), Status::Ok);
    assert_eq!(parser.ans_as_double(), 1.0);
}

#[test]
fn declarations_alone_leave_ans_empty() {
    let mut parser = Parser::new();
    assert_eq!(parser.execute("int q; double r = 2"), Status::Ok);
    assert!(parser.ans().is_none());
    assert!(parser.ans_as_double().is_nan());
    assert_eq!(parser.find("r").unwrap().as_double(), 2.0);
}

#[test]
fn failed_assignment_leaves_target_untouched() {
    let mut parser = Parser::new();
    assert_eq!(parser.execute("x = 1; x = x + true"), Status::Error);
    assert_eq!(parser.error_column(), Some(13));
    assert_eq!(parser.find("x").unwrap().value(), Value::Int(1));

    assert_eq!(parser.execute("int y = z"), Status::Error);
    assert_eq!(parser.last_error().unwrap().kind, ErrorKind::NameError);
    assert!(parser.find("y").is_none());
}

#[test]
fn statements_before_an_error_are_committed() {
    let mut parser = Parser::new();
    assert_eq!(parser.execute("a = 1; b = ; c = 3"), Status::Error);
    assert_eq!(parser.error_column(), Some(9));
    assert!(parser.find("a").is_some());
    assert!(parser.find("b").is_none());
    assert!(parser.find("c").is_none());
    assert_eq!(parser.ans(), Some(Value::Int(1)));

}

#[test]
fn failing_statement_commits_nothing() {
    let mut parser = Parser::new();

    assert_eq!(parser.execute("a = (b = 5) + true"), Status::Error);
    assert_eq!(parser.last_error().unwrap().kind, ErrorKind::TypeError);
    assert!(parser.find("a").is_none());
    assert!(parser.find("b").is_none());

    assert_eq!(parser.execute("int y = 2, z = nope"), Status::Error);
    assert_eq!(parser.last_error().unwrap().kind, ErrorKind::NameError);
    assert!(parser.find("y").is_none());
    assert!(parser.find("z").is_none());

    // A later initializer still sees the names before it.
    assert_eq!(parser.execute("int p = 1, q = p + 1"), Status::Ok);
    assert_eq!(parser.find("q").unwrap().value(), Value::Int(2));

    assert_eq!(parser.execute("int r = (p = 7), s = p + true"), Status::Error);
    assert_eq!(parser.find("p").unwrap().value(), Value::Int(1));
    assert!(parser.find("r").is_none());

    assert_eq!(parser.execute("n = 1; m = n++ + true"), Status::Error);
    assert_eq!(parser.find("n").unwrap().value(), Value::Int(1));
}

#[test]
fn failing_statement_leaves_host_storage_alone() {
    let level = Cell::new(10);
    let mut parser = Parser::new();
    parser.bind_external("level", ExternalRef::Int(&level)).unwrap();

    assert_eq!(parser.execute("x = (level = 3) * nope"), Status::Error);
    assert_eq!(level.get(), 10);

    assert_eq!(parser.execute("x = (level = 3) * 2"), Status::Ok);
    assert_eq!(level.get(), 3);
    assert_eq!(parser.ans(), Some(Value::Int(6)));
}

#[test]
fn errors_do_not_poison_the_instance() {
    let mut parser = Parser::new();
    assert_eq!(parser.execute("1 +"), Status::Error);
    assert!(parser.last_error().is_some());

    assert_eq!(parser.execute("1 + 1"), Status::Ok);
    assert!(parser.last_error().is_none());
    assert!(parser.error_message().is_none());
    assert_eq!(parser.ans(), Some(Value::Int(2)));
}

#[test]
fn repeated_execution_is_repeatable() {
    let mut first = Parser::new();
    let mut second = Parser::new();
    for parser in [&mut first, &mut second] {
        assert_eq!(parser.execute("int n = 4; n * n - 1"), Status::Ok);
    }
    assert_eq!(first.ans(), second.ans());
    assert_eq!(first.ans(), Some(Value::Int(15)));
}

#[test]
fn struct_bodies_are_isolated_scopes() {
    let mut parser = Parser::new();
    assert_eq!(
        parser.execute("struct point { int x = 3; y = x * 2; struct inner { int z } }"),
        Status::Ok
    );
    assert!(parser.ans().is_none());
    assert!(parser.find("x").is_none());

    let point = parser.global().find_struct("point").unwrap();
    assert_eq!(point.name(), "point");
    assert_eq!(point.find("y").unwrap().value(), Value::Int(6));
    assert!(point.find_struct("inner").unwrap().find("z").is_some());

    // Names outside are not visible inside.
    assert_eq!(parser.execute("w = 1; struct other { v = w }"), Status::Error);
    assert_eq!(parser.last_error().unwrap().kind, ErrorKind::NameError);
    assert_eq!(parser.error_column(), Some(26));
    assert!(parser.global().find_struct("other").is_none());
}

#[test]
fn failed_struct_body_can_be_retried() {
    let mut parser = Parser::new();
    assert_eq!(parser.execute("struct s { int a = 1; a + }"), Status::Error);
    assert!(parser.global().find_struct("s").is_none());

    assert_eq!(parser.execute("struct s { int a = 1; a + 1 }"), Status::Ok);
    assert_eq!(
        parser.global().find_struct("s").unwrap().find("a").unwrap().value(),
        Value::Int(1)
    );

    assert_eq!(parser.execute("struct s { int b }"), Status::Error);
    assert_eq!(parser.error_message(), Some("Struct 's' is already declared"));
}

#[test]
fn token_limit_is_configurable() {
    let mut parser = Parser::with_options(ParserOptions {
        max_tokens: 5,
        ..ParserOptions::default()
    });
    assert_eq!(parser.options().max_tokens, 5);

    assert_eq!(parser.execute("1 + 2 + 3"), Status::Ok);
    assert_eq!(parser.ans(), Some(Value::Int(6)));

    assert_eq!(parser.execute("1 + 2 + 3 + 4"), Status::Error);
    let error = parser.last_error().unwrap();
    assert_eq!(error.kind, ErrorKind::LimitError);
    assert_eq!(error.column(), 10);
}

#[test]
fn lexer_splits_statements_with_absolute_spans() {
    let source = "x = 1; y\n\n  z++";
    let statements = Lexer::new(source).scan_statements().unwrap();
    assert_eq!(statements.len(), 3);

    let first: Vec<_> = statements[0].iter().map(|token| token.token_type).collect();
    assert_eq!(first, vec![TokenType::Identifier, TokenType::Equal, TokenType::Number]);
    assert_eq!(statements[0][2].span.start, 4);

    assert_eq!(statements[1][0].lexeme, "y");
    assert_eq!(statements[1][0].span.start, 7);

    assert_eq!(statements[2][0].span.start, 12);
    assert_eq!(statements[2][1].token_type, TokenType::PlusPlus);
}

#[test]
fn lexer_keeps_exponent_signs_in_literals() {
    let statements = Lexer::new("1e+5 - e-5").scan_statements().unwrap();
    let lexemes: Vec<_> = statements[0].iter().map(|token| token.lexeme).collect();
    assert_eq!(lexemes, vec!["1e+5", "-", "e", "-", "5"]);
}

#[test]
fn lexer_classifies_keywords() {
    let statements = Lexer::new("int64 a and b or c xor void").scan_statements().unwrap();
    let types: Vec<_> = statements[0].iter().map(|token| token.token_type).collect();
    assert_eq!(
        types,
        vec![
            TokenType::TypeName(Kind::Int64),
            TokenType::Identifier,
            TokenType::And,
            TokenType::Identifier,
            TokenType::Or,
            TokenType::Identifier,
            TokenType::Caret,
            TokenType::Void,
        ]
    );
}

#[test]
fn lexer_captures_nested_blocks() {
    let source = "struct a { struct b { } } ";
    let statements = Lexer::new(source).scan_statements().unwrap();
    let block = statements[0][2];
    assert_eq!(block.token_type, TokenType::Block);
    assert_eq!(block.lexeme, "{ struct b { } }");
    assert_eq!(&source[block.block_contents()], " struct b { } ");
}

#[test]
fn lexer_reports_error_positions() {
    let error = Lexer::new("a = 1 # 2").scan_statements().unwrap_err();
    assert_eq!(error.kind, ErrorKind::SyntaxError);
    assert_eq!(error.column(), 6);

    let error = Lexer::new("x\n/* open").scan_statements().unwrap_err();
    assert_eq!(error.column(), 2);
}

#[derive(Debug)]
struct Entry(&'static str);

impl Named for Entry {
    fn name(&self) -> &str {
        self.0
    }
}

#[test]
fn name_tree_orders_and_rejects_duplicates() {
    let mut tree = NameTree::new();
    for name in ["delta", "alpha", "echo", "bravo", "charlie"] {
        tree.insert(Entry(name)).unwrap();
    }
    assert_eq!(tree.len(), 5);

    let names: Vec<_> = tree.iter().map(|entry| entry.0).collect();
    assert_eq!(names, vec!["alpha", "bravo", "charlie", "delta", "echo"]);

    let collision = tree.insert(Entry("bravo")).unwrap_err();
    assert_eq!(collision.name, "bravo");
    assert_eq!(tree.len(), 5);

    assert!(tree.contains("charlie"));
    assert!(tree.find("zulu").is_none());
}

#[test]
fn name_tree_degenerates_on_sorted_input() {
    let mut sorted = NameTree::new();
    for name in ["a", "b", "c", "d", "e"] {
        sorted.insert(Entry(name)).unwrap();
    }
    assert_eq!(sorted.height(), 5);

    let mut balanced = NameTree::new();
    for name in ["c", "b", "d", "a", "e"] {
        balanced.insert(Entry(name)).unwrap();
    }
    assert_eq!(balanced.height(), 3);
    assert!(NameTree::<Entry>::new().is_empty());
}

#[test]
fn scope_variables_follow_assignment_rules() {
    let mut scope = Scope::global();
    scope.declare("n", Kind::Byte).unwrap();
    assert!(scope.declare("n", Kind::Int).is_err());

    let n = scope.find_mut("n").unwrap();
    assert_eq!(n.value(), Value::Byte(0));
    assert_eq!(n.assign(Value::Int(258)).unwrap(), Value::Byte(2));
    assert_eq!(
        n.assign(Value::Bool(true)).unwrap_err(),
        NumericError::ImplicitCast {
            from: Kind::Bool,
            to: Kind::Byte
        }
    );
    assert_eq!(n.assign_dynamic(Value::Float(1.5)).unwrap(), Value::Float(1.5));
    assert_eq!(n.kind(), Kind::Float);
}

#[test]
fn explicit_casts_cover_every_kind() {
    assert_eq!(Value::Double(3.9).cast_explicit(Kind::Int), Value::Int(3));
    assert_eq!(Value::Double(300.7).cast_explicit(Kind::Byte), Value::Byte(44));
    assert_eq!(
        Value::Double(300.0).cast_explicit(Kind::Byte),
        Value::Int(300).cast_explicit(Kind::Byte)
    );
    assert_eq!(Value::Float(-1.5).cast_explicit(Kind::Byte), Value::Byte(255));
    assert_eq!(Value::Double(4294967297.0).cast_explicit(Kind::Int), Value::Int(1));
    assert_eq!(Value::Int(0).cast_explicit(Kind::Bool), Value::Bool(false));
    assert_eq!(Value::Bool(true).cast_explicit(Kind::Double), Value::Double(1.0));
    assert_eq!(Value::Int64(-1).cast_explicit(Kind::Int), Value::Int(-1));

    assert_eq!(Value::Bool(true).cast_implicit(Kind::Int), None);
    assert_eq!(Value::Int(3).cast_implicit(Kind::Bool), None);
    assert_eq!(Value::Int(3).cast_implicit(Kind::Double), Some(Value::Double(3.0)));
}

#[test]
fn values_print_in_literal_form() {
    assert_eq!(Value::Int64(5).to_string(), "5L");
    assert_eq!(Value::Float(2.0).to_string(), "2.0f");
    assert_eq!(Value::Byte(5).to_string(), "byte(5)");
    assert_eq!(Value::Double(2.5).to_string(), "2.5");
    assert_eq!(Value::Bool(false).to_string(), "false");
}

#[test]
fn numeric_engine_reports_typed_errors() {
    assert_eq!(
        numeric::binary(BinaryOp::Remainder, Value::Int(1), Value::Int(0)),
        Err(NumericError::DivisionByZero)
    );
    assert_eq!(
        numeric::binary(BinaryOp::ShiftLeft, Value::Byte(1), Value::Int(9)),
        Ok(Value::Int(512))
    );
    assert_eq!(
        numeric::binary(BinaryOp::Power, Value::Float(2.0), Value::Int(3)),
        Ok(Value::Float(8.0))
    );
}

#[test]
fn script_session_carries_into_later_input() {
    let mut parser = Parser::new();
    assert!(gparse::runner::run_in(&mut parser, "int k = 4; k * 2", None));
    assert_eq!(parser.ans(), Some(Value::Int(8)));

    assert_eq!(parser.execute("k + 1"), Status::Ok);
    assert_eq!(parser.ans(), Some(Value::Int(5)));

    assert!(!gparse::runner::run_in(&mut parser, "k = nope", None));
    assert_eq!(parser.find("k").unwrap().value(), Value::Int(4));
}
