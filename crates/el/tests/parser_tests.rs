use uel::ast::{BinaryOperator, CompareOperator, Expr, LogicalOperator, MapEntry, UnaryOperator};
use uel::{ElContext, ParseError, Parser, ValueExpression};

fn parse_ok(input: &str) -> Expr {
    let ctx = ElContext::new();
    Parser::new(&ctx, input)
        .parse_expr()
        .expect("parse should succeed")
}

fn parse_err(input: &str) -> ParseError {
    let ctx = ElContext::new();
    match Parser::new(&ctx, input).parse_expr() {
        Ok(expr) => panic!("expression unexpectedly parsed: {input} => {expr:?}"),
        Err(err) => err,
    }
}

fn template_ok(input: &str) -> Expr {
    let ctx = ElContext::new();
    Parser::new(&ctx, input)
        .parse()
        .expect("template should parse")
}

fn template_err(input: &str) -> ParseError {
    let ctx = ElContext::new();
    match Parser::new(&ctx, input).parse() {
        Ok(expr) => panic!("template unexpectedly parsed: {input} => {expr:?}"),
        Err(err) => err,
    }
}

fn id(name: &str) -> Box<Expr> {
    Box::new(Expr::Identifier(name.into()))
}

fn long(value: i64) -> Box<Expr> {
    Box::new(Expr::Long(value))
}

#[test]
fn literals() {
    assert_eq!(parse_ok("42"), Expr::Long(42));
    assert_eq!(parse_ok("3.25"), Expr::Double(3.25));
    assert_eq!(parse_ok("1.5e2"), Expr::Double(150.0));
    assert_eq!(parse_ok("true"), Expr::Boolean(true));
    assert_eq!(parse_ok("false"), Expr::Boolean(false));
    assert_eq!(parse_ok("null"), Expr::Null);
    assert_eq!(parse_ok("'single'"), Expr::String("single".into()));
    assert_eq!(parse_ok(r#""double""#), Expr::String("double".into()));
    assert_eq!(
        parse_ok(r#"'with \'escape\''"#),
        Expr::String("with 'escape'".into())
    );
    assert_eq!(
        parse_ok("-7"),
        Expr::Unary {
            op: UnaryOperator::Minus,
            expr: long(7),
        }
    );
}

#[test]
fn floating_literals_keep_full_precision() {
    assert_eq!(
        parse_ok("3.14159265358979323846"),
        Expr::Double(std::f64::consts::PI)
    );
    assert_eq!(
        parse_ok("0.12345678901234567890"),
        Expr::Double(0.12345678901234567890)
    );
    assert_eq!(parse_ok("1.00000000000000000000e2"), Expr::Double(100.0));
    assert_eq!(parse_ok("123456789012345678901.5"), Expr::Double(123456789012345678901.5));
    assert_eq!(parse_ok("5."), Expr::Double(5.0));
    assert_eq!(parse_err("123456789012345678901").message, "number too large");
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(
        parse_ok("2+3*4"),
        Expr::Binary {
            op: BinaryOperator::Add,
            left: long(2),
            right: Box::new(Expr::Binary {
                op: BinaryOperator::Mul,
                left: long(3),
                right: long(4),
            }),
        }
    );
}

#[test]
fn subtraction_is_left_associative() {
    assert_eq!(
        parse_ok("10-3-2"),
        Expr::Binary {
            op: BinaryOperator::Sub,
            left: Box::new(Expr::Binary {
                op: BinaryOperator::Sub,
                left: long(10),
                right: long(3),
            }),
            right: long(2),
        }
    );
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(
        parse_ok("a = b = 5"),
        Expr::Assign {
            target: id("a"),
            value: Box::new(Expr::Assign {
                target: id("b"),
                value: long(5),
            }),
        }
    );
}

#[test]
fn keyword_operators_match_symbols() {
    assert_eq!(parse_ok("a and b"), parse_ok("a && b"));
    assert_eq!(parse_ok("a or b"), parse_ok("a || b"));
    assert_eq!(parse_ok("a eq b"), parse_ok("a == b"));
    assert_eq!(parse_ok("a ne b"), parse_ok("a != b"));
    assert_eq!(parse_ok("a lt b"), parse_ok("a < b"));
    assert_eq!(parse_ok("a le b"), parse_ok("a <= b"));
    assert_eq!(parse_ok("a gt b"), parse_ok("a > b"));
    assert_eq!(parse_ok("a ge b"), parse_ok("a >= b"));
    assert_eq!(parse_ok("a div b"), parse_ok("a / b"));
    assert_eq!(parse_ok("a mod b"), parse_ok("a % b"));
    assert_eq!(parse_ok("a matches b"), parse_ok("a =~ b"));
    assert_eq!(parse_ok("a cat b"), parse_ok("a + b"));
    assert_eq!(parse_ok("not a"), parse_ok("!a"));
}

#[test]
fn logical_precedence() {
    assert_eq!(
        parse_ok("a || b && c == 1"),
        Expr::Logical {
            op: LogicalOperator::Or,
            left: id("a"),
            right: Box::new(Expr::Logical {
                op: LogicalOperator::And,
                left: id("b"),
                right: Box::new(Expr::Compare {
                    op: CompareOperator::Eq,
                    left: id("c"),
                    right: long(1),
                }),
            }),
        }
    );
}

#[test]
fn concat_sits_between_comparison_and_addition() {
    assert_eq!(
        parse_ok("a += b + 1 == c"),
        Expr::Compare {
            op: CompareOperator::Eq,
            left: Box::new(Expr::Concat {
                left: id("a"),
                right: Box::new(Expr::Binary {
                    op: BinaryOperator::Add,
                    left: id("b"),
                    right: long(1),
                }),
            }),
            right: id("c"),
        }
    );
}

#[test]
fn conditional_and_elvis() {
    assert_eq!(
        parse_ok("a ? 1 : 2"),
        Expr::Conditional {
            test: id("a"),
            then: long(1),
            otherwise: long(2),
        }
    );
    assert_eq!(
        parse_ok("a ? 1 : b ? 2 : 3"),
        Expr::Conditional {
            test: id("a"),
            then: long(1),
            otherwise: Box::new(Expr::Conditional {
                test: id("b"),
                then: long(2),
                otherwise: long(3),
            }),
        }
    );
    assert_eq!(
        parse_ok("a ?: 'default'"),
        Expr::ConditionalNull {
            value: id("a"),
            default: Box::new(Expr::String("default".into())),
        }
    );
}

#[test]
fn semicolon_sequences() {
    assert_eq!(
        parse_ok("a = 1; b"),
        Expr::Semicolon {
            left: Box::new(Expr::Assign {
                target: id("a"),
                value: long(1),
            }),
            right: id("b"),
        }
    );
}

#[test]
fn dot_and_bracket_access_are_equivalent() {
    let dotted = parse_ok("user.name");
    assert_eq!(dotted, parse_ok("user['name']"));
    assert_eq!(
        dotted,
        Expr::Field {
            object: id("user"),
            field: Box::new(Expr::String("name".into())),
        }
    );
    assert_eq!(
        parse_ok("items[0].name"),
        Expr::Field {
            object: Box::new(Expr::Field {
                object: id("items"),
                field: long(0),
            }),
            field: Box::new(Expr::String("name".into())),
        }
    );
}

#[test]
fn method_calls() {
    assert_eq!(
        parse_ok("user.greet('hi', 2)"),
        Expr::Method {
            object: id("user"),
            method: Box::new(Expr::String("greet".into())),
            args: vec![Expr::String("hi".into()), Expr::Long(2)],
        }
    );
    assert_eq!(
        parse_ok("f()"),
        Expr::Call {
            target: id("f"),
            args: vec![],
        }
    );
}

#[test]
fn method_call_on_literal_is_rejected() {
    let err = parse_err("5(1)");
    assert!(
        err.message.starts_with("Method call not supported in this context"),
        "{err}"
    );
}

#[test]
fn lambdas() {
    let expr = parse_ok("x -> x + 1");
    assert_eq!(
        expr,
        Expr::Lambda {
            params: vec!["x".into()],
            body: std::sync::Arc::new(Expr::Binary {
                op: BinaryOperator::Add,
                left: Box::new(Expr::LambdaVar("x".into())),
                right: long(1),
            }),
        }
    );

    let Expr::Lambda { params, body } = parse_ok("(a, b) -> a * b") else {
        panic!("expected lambda");
    };
    assert_eq!(params, vec!["a".to_string(), "b".to_string()]);
    assert!(matches!(body.as_ref(), Expr::Binary { op: BinaryOperator::Mul, .. }));

    let Expr::Lambda { params, .. } = parse_ok("() -> 42") else {
        panic!("expected lambda");
    };
    assert!(params.is_empty());
}

#[test]
fn nested_lambdas_see_outer_parameters() {
    let Expr::Lambda { body, .. } = parse_ok("x -> y -> x + y") else {
        panic!("expected lambda");
    };
    let Expr::Lambda { params, body } = body.as_ref() else {
        panic!("expected inner lambda");
    };
    assert_eq!(params, &vec!["y".to_string()]);
    assert_eq!(
        body.as_ref(),
        &Expr::Binary {
            op: BinaryOperator::Add,
            left: Box::new(Expr::LambdaVar("x".into())),
            right: Box::new(Expr::LambdaVar("y".into())),
        }
    );
}

#[test]
fn invoked_lambda() {
    assert!(matches!(parse_ok("(x -> x + 1)(5)"), Expr::Call { .. }));
}

#[test]
fn invalid_lambda_parameters() {
    parse_err("1 -> 2");
    parse_err("(a, 1) -> a");
}

#[test]
fn collection_literals() {
    assert_eq!(
        parse_ok("[1, 2, 2]"),
        Expr::List(vec![Expr::Long(1), Expr::Long(2), Expr::Long(2)])
    );
    assert_eq!(parse_ok("[]"), Expr::List(vec![]));
    assert_eq!(
        parse_ok("{1, 2}"),
        Expr::Set(vec![Expr::Long(1), Expr::Long(2)])
    );
    assert_eq!(parse_ok("{}"), Expr::Set(vec![]));
    assert_eq!(
        parse_ok("{'a': 1, 'b': 2}"),
        Expr::Map(vec![
            MapEntry {
                key: Expr::String("a".into()),
                value: Expr::Long(1),
            },
            MapEntry {
                key: Expr::String("b".into()),
                value: Expr::Long(2),
            },
        ])
    );
}

#[test]
fn mixed_set_and_map_entries_are_rejected() {
    let err = parse_err("{'a': 1, 'b'}");
    assert!(err.message.starts_with("Expected ':'"), "{err}");

    let err = parse_err("{'a', 'b': 2}");
    assert!(err.message.starts_with("Unexpected ':'"), "{err}");
}

#[test]
fn unmatched_parenthesis() {
    let err = parse_err("(1+2");
    assert_eq!(
        err.message,
        "Expected `)' at end of file.  All open parentheses must have matching closing parentheses."
    );
    assert_eq!(err.expression, "(1+2");
    assert!(err.to_string().ends_with(" in (1+2"));
}

#[test]
fn unmatched_brackets() {
    let err = parse_err("a[1");
    assert!(err.message.starts_with("Expected `]' at end of file"), "{err}");
    let err = parse_err("[1, 2");
    assert!(err.message.starts_with("Expected ']' at end of file"), "{err}");
    let err = parse_err("{1, 2");
    assert!(err.message.starts_with("Expected '}' at end of file"), "{err}");
    let err = parse_err("f(1, 2");
    assert!(err.message.starts_with("Expected `)' at end of file"), "{err}");
}

#[test]
fn missing_colon_in_conditional() {
    let err = parse_err("a ? 1");
    assert!(err.message.starts_with("Expected ':' at end of file"), "{err}");
}

#[test]
fn unexpected_characters() {
    let err = parse_err("1 + #");
    assert_eq!(err.message, "Unexpected character at `#'.");
    let err = parse_err("a\n+");
    assert_eq!(err.message, "Unexpected character at end of file.");
    parse_err("a b");
    parse_err("a & b");
    parse_err("'unterminated");
}

#[test]
fn not_after_constant_is_rejected() {
    let err = parse_err("5 !");
    assert_eq!(err.message, "invalid expression");
}

#[test]
fn field_names_must_be_identifiers() {
    let err = parse_err("a.1");
    assert!(err.message.starts_with("Expected identifier at `1'"), "{err}");
}

#[test]
fn template_text_only() {
    assert_eq!(template_ok(""), Expr::String(String::new()));
    assert_eq!(
        template_ok("plain text"),
        Expr::String("plain text".into())
    );
    assert_eq!(template_ok("cost: $5 #1"), Expr::String("cost: $5 #1".into()));
}

#[test]
fn template_segments() {
    assert_eq!(
        template_ok("a ${b} c"),
        Expr::Interpolate {
            left: Box::new(Expr::Interpolate {
                left: Box::new(Expr::String("a ".into())),
                right: id("b"),
            }),
            right: Box::new(Expr::String(" c".into())),
        }
    );
    assert_eq!(template_ok("#{x}"), Expr::Identifier("x".into()));
}

#[test]
fn template_escapes() {
    assert_eq!(template_ok(r"a\${b}"), Expr::String("a${b}".into()));
    assert_eq!(template_ok(r"a\\b"), Expr::String(r"a\b".into()));
    assert_eq!(template_ok(r"a\nb"), Expr::String(r"a\nb".into()));

    let ctx = ElContext::new();
    let raw = Parser::new(&ctx, r"a\${b}")
        .check_escape(false)
        .parse()
        .unwrap();
    assert!(matches!(raw, Expr::Interpolate { .. }));
}

#[test]
fn template_body_skips_braces_in_strings_and_maps() {
    assert_eq!(
        template_ok("${'}'}"),
        Expr::String("}".into())
    );
    assert!(matches!(template_ok("${{'a': 1}}"), Expr::Map(_)));
}

#[test]
fn template_errors() {
    let err = template_err("${a} #{b}");
    assert_eq!(err.message, "Mixed '#' and '$'. Expected '$' at '#'");
    let err = template_err("${a");
    assert_eq!(err.message, "expected '}' at end of EL expression");
    template_err("${1 +}");
}

#[test]
fn method_expressions() {
    let ctx = ElContext::new();
    let parse = |source: &str| {
        Parser::new(&ctx, source)
            .method_expression(true)
            .parse()
    };

    assert!(parse("#{bean.save}").is_ok());
    assert!(parse("#{bean.save(a + 1, b ? 1 : 2)}").is_ok());
    assert!(parse("just text").is_ok());

    for invalid in [
        "#{a + b}",
        "#{a ? b : c}",
        "#{a || b}",
        "#{a == b}",
        "#{1}",
        "#{-a}",
        "#{a}#{b}",
        "text #{a}",
        "#{a} text",
    ] {
        let err = parse(invalid).expect_err(invalid);
        assert_eq!(err.message, "Invalid method expression", "{invalid}");
    }
}

#[test]
fn names_bind_at_parse_time() {
    let mut ctx = ElContext::new().with_implicit_object("scope", 1);
    let bound = ValueExpression::parse(&ctx, "${40 + 2}").unwrap();
    ctx.variable_mapper_mut().set_variable("answer", bound);

    let parsed = Parser::new(&ctx, "answer").parse_expr().unwrap();
    assert!(matches!(parsed, Expr::Variable { ref name, .. } if name == "answer"));
    assert_eq!(
        Parser::new(&ctx, "scope").parse_expr().unwrap(),
        Expr::Implicit("scope".into())
    );
    assert!(matches!(
        Parser::new(&ctx, "fn:length").parse_expr().unwrap(),
        Expr::Function { .. }
    ));
    assert_eq!(
        Parser::new(&ctx, "other").parse_expr().unwrap(),
        Expr::Identifier("other".into())
    );
}

#[test]
fn ternary_with_identifiers_is_not_a_function_name() {
    assert_eq!(
        parse_ok("c?a:b"),
        Expr::Conditional {
            test: id("c"),
            then: id("a"),
            otherwise: id("b"),
        }
    );
}

#[test]
fn display_renders_source_like_text() {
    assert_eq!(parse_ok("a.b[c] + 1").to_string(), "(a.b[c] + 1)");
    assert_eq!(parse_ok("x -> x * 2").to_string(), "(x) -> (x * 2)");
    assert_eq!(parse_ok("{'k': [1, 2]}").to_string(), "{'k': [1, 2]}");
}

#[test]
fn constant_detection() {
    assert!(parse_ok("1 + 2 * 3").is_constant());
    assert!(parse_ok("[1, 'a', {2}]").is_constant());
    assert!(!parse_ok("1 + a").is_constant());
    assert!(template_ok("text").is_literal_text());
    assert!(!template_ok("${'text'}x").is_literal_text());
}
