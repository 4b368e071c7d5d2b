use manos_doc_core::extensions::starter_kit;
use manos_doc_core::{
    AttributeSpec, ContentExpr, Mark, MarkDefinition, Node, NodeDefinition, Schema, SchemaError,
    build_schema,
};
use rstest::rstest;
use serde_json::json;

fn is_member(term: &str, kind: &str) -> bool {
    term == kind || (term == "block" && matches!(kind, "paragraph" | "heading"))
}

#[rstest]
#[case("paragraph block*", &["paragraph"], true)]
#[case("paragraph block*", &["paragraph", "heading", "paragraph"], true)]
#[case("paragraph block*", &["heading"], false)]
#[case("paragraph block*", &[], false)]
#[case("column{2,}", &["column", "column"], true)]
#[case("column{2,}", &["column"], false)]
#[case("column{2,3}", &["column", "column", "column", "column"], false)]
#[case("block+", &[], false)]
#[case("inline*", &[], true)]
#[case("(paragraph | heading)+", &["heading", "paragraph"], true)]
#[case("heading? paragraph", &["paragraph"], true)]
#[case("", &[], true)]
#[case("", &["paragraph"], false)]
fn content_expressions_match_child_sequences(
    #[case] expr: &str,
    #[case] kinds: &[&str],
    #[case] expected: bool,
) {
    let expr = ContentExpr::parse(expr).unwrap();
    assert_eq!(expr.matches(kinds, is_member), expected);
}

#[rstest]
#[case("paragraph{2")]
#[case("(paragraph")]
#[case("paragraph |")]
#[case("+")]
fn malformed_content_expressions_are_rejected(#[case] expr: &str) {
    let err = ContentExpr::parse(expr).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidContentExpression { .. }));
}

#[test]
fn content_expression_lists_referenced_names() {
    let expr = ContentExpr::parse("paragraph (block | list)*").unwrap();
    let names: Vec<&str> = expr.names().into_iter().collect();
    assert_eq!(names, vec!["block", "list", "paragraph"]);
}

#[test]
fn starter_schema_is_deterministic() {
    let a = build_schema(&starter_kit());
    let b = build_schema(&starter_kit());
    assert!(*a == *b);

    let names = |schema: &Schema| schema.nodes().iter().map(|n| n.name.clone()).collect::<Vec<_>>();
    assert_eq!(names(&a), names(&b));
}

#[test]
fn validate_document_rejects_unknown_types_and_attributes() {
    let schema = build_schema(&starter_kit());

    let ok = serde_json::from_value::<Node>(json!({
        "type": "doc",
        "content": [
            { "type": "heading", "attrs": { "level": 2, "blockId": "intro" }, "content": [
                { "type": "text", "text": "Title", "marks": [{ "type": "bold" }] }
            ]}
        ]
    }))
    .unwrap();
    assert!(schema.validate_document(&ok));

    let unknown_node = Node::doc(vec![Node::element("marquee", Default::default(), Vec::new())]);
    assert!(!schema.validate_document(&unknown_node));

    let unknown_mark = Node::doc(vec![Node::element(
        "paragraph",
        Default::default(),
        vec![Node::marked_text("x", vec![Mark::new("blink")])],
    )]);
    assert!(!schema.validate_document(&unknown_mark));

    let unknown_attr = Node::doc(vec![Node::paragraph("x").with_attr("color", "red")]);
    assert_eq!(
        schema.validate(&unknown_attr),
        Err(SchemaError::UnknownAttribute {
            node: "paragraph".into(),
            attr: "color".into(),
        })
    );

    let wrong_root = Node::paragraph("x");
    assert_eq!(
        schema.validate(&wrong_root),
        Err(SchemaError::InvalidRoot("paragraph".into()))
    );
}

#[test]
fn strict_validation_checks_content_expressions() {
    let schema = build_schema(&starter_kit());

    let empty_list = Node::doc(vec![Node::element("bulletList", Default::default(), Vec::new())]);
    assert!(schema.validate_document(&empty_list));
    assert!(matches!(
        schema.validate_content(&empty_list),
        Err(SchemaError::ContentMismatch { .. })
    ));

    let list = Node::doc(vec![Node::element(
        "bulletList",
        Default::default(),
        vec![Node::element("listItem", Default::default(), vec![Node::paragraph("one")])],
    )]);
    assert_eq!(schema.validate_content(&list), Ok(()));
}

#[test]
fn strict_validation_reports_unresolved_content_names() {
    let schema = Schema::new(
        vec![
            NodeDefinition::new("doc").content("section+"),
            NodeDefinition::new("text").group("inline"),
        ],
        Vec::new(),
    );
    let doc = Node::doc(Vec::new());
    assert!(schema.validate_document(&doc));
    assert_eq!(
        schema.validate_content(&doc),
        Err(SchemaError::UnknownNode("section".into()))
    );
}

#[test]
fn duplicate_definitions_last_one_wins() {
    let schema = Schema::new(
        vec![
            NodeDefinition::new("doc").content("block+"),
            NodeDefinition::new("paragraph").group("block").content("inline*"),
            NodeDefinition::new("text").group("inline"),
            NodeDefinition::new("paragraph")
                .group("block")
                .content("text*")
                .attribute("tone", AttributeSpec::new(json!("plain"))),
        ],
        vec![MarkDefinition::new("bold"), MarkDefinition::new("bold").inclusive(false)],
    );

    let paragraph = schema.node("paragraph").unwrap();
    assert_eq!(paragraph.content, "text*");
    assert!(paragraph.attributes.contains_key("tone"));
    assert_eq!(schema.nodes().len(), 3);
    assert_eq!(schema.nodes()[1].name, "paragraph");
    assert!(!schema.mark("bold").unwrap().inclusive);
}

#[test]
fn code_mark_excludes_other_formatting() {
    let schema = build_schema(&starter_kit());

    let marks = schema
        .add_mark(&[Mark::new("bold"), Mark::new("italic")], Mark::new("code"))
        .unwrap();
    assert_eq!(marks, vec![Mark::new("code")]);

    assert_eq!(schema.add_mark(&[Mark::new("code")], Mark::new("bold")), None);

    let marks = schema
        .add_mark(&[Mark::new("italic")], Mark::new("bold"))
        .unwrap();
    assert_eq!(marks, vec![Mark::new("bold"), Mark::new("italic")]);
}

#[test]
fn node_sizes_follow_the_position_model() {
    let schema = build_schema(&starter_kit());
    let doc = Node::doc(vec![
        Node::paragraph("Hello"),
        Node::element("horizontalRule", Default::default(), Vec::new()),
        Node::element(
            "bulletList",
            Default::default(),
            vec![Node::element("listItem", Default::default(), vec![Node::paragraph("ab")])],
        ),
    ]);

    assert_eq!(schema.node_size(doc.child(0).unwrap()), 7);
    assert_eq!(schema.node_size(doc.child(1).unwrap()), 1);
    assert_eq!(schema.node_size(doc.child(2).unwrap()), 8);
    assert_eq!(schema.content_size(&doc), 16);
    assert!(schema.is_textblock("heading"));
    assert!(!schema.is_textblock("blockquote"));
    assert!(schema.is_leaf("image"));
}
