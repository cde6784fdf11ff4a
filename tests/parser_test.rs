use pretty_assertions::assert_eq;
use viewchain::{
    ast::{Argument, Expression, Literal},
    chain, parse_expression, SyntaxError,
};

#[test]
fn test_parse_stack_with_children() {
    let source = r#"
        VStack(alignment: .leading, spacing: 8,
               Text("Title").font(.headline),
               Text("Body"))
            .padding(16)
    "#;
    let expr = parse_expression(source).unwrap();
    let node = chain::parse(&expr).unwrap();

    assert_eq!(node.constructor.name, "VStack");
    assert_eq!(node.constructor.arguments.len(), 4);
    assert_eq!(
        node.constructor.arguments[0],
        Argument::labeled("alignment", Expression::implicit_member("leading"))
    );
    assert_eq!(
        node.constructor.arguments[1],
        Argument::labeled("spacing", Expression::Literal(Literal::Integer(8)))
    );
    assert_eq!(node.modifiers.len(), 1);
    assert_eq!(node.modifiers[0].name, "padding");
}

#[test]
fn test_literal_forms() {
    let expr = parse_expression(r#"f(-3, 2.5, false, "a\"b", [])"#).unwrap();
    let Expression::Call { arguments, .. } = expr else {
        panic!("expected a call");
    };
    let values: Vec<Expression> = arguments.into_iter().map(|a| a.value).collect();
    assert_eq!(
        values,
        vec![
            Expression::Literal(Literal::Integer(-3)),
            Expression::Literal(Literal::Double(2.5)),
            Expression::Literal(Literal::Boolean(false)),
            Expression::Literal(Literal::String("a\"b".to_string())),
            Expression::Array(vec![]),
        ]
    );
}

#[test]
fn test_member_path_display() {
    let expr = parse_expression("Image.Scale.large").unwrap();
    assert_eq!(expr.as_path(), Some(vec!["Image", "Scale", "large"]));
    assert_eq!(expr.to_string(), "Image.Scale.large");
}

#[test]
fn test_trailing_garbage_is_rejected() {
    let err = parse_expression("Text(\"a\")\n  )").unwrap_err();
    match err {
        SyntaxError::TrailingInput { span, .. } => {
            assert_eq!(span.line, 2);
            assert_eq!(span.column, 3);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_empty_input_is_rejected() {
    assert!(parse_expression("   ").is_err());
}
