use std::sync::Arc;

use manos_doc_core::extensions::starter_kit;
use manos_doc_core::markup::{doc_to_html, parse_fragment, parse_markup};
use manos_doc_core::{Attrs, Mark, Node, Schema, build_schema};
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn schema() -> Arc<Schema> {
    build_schema(&starter_kit())
}

fn attrs(value: serde_json::Value) -> Attrs {
    serde_json::from_value(value).unwrap()
}

fn reparse(schema: &Schema, html: &str) -> String {
    doc_to_html(schema, &parse_markup(schema, html))
}

#[rstest]
fn headings_render_their_level_and_anchor(schema: Arc<Schema>) {
    let doc = Node::doc(vec![Node::element(
        "heading",
        attrs(json!({ "level": 2, "blockId": "plan", "textAlign": "right" })),
        vec![Node::text("Plan")],
    )]);
    let html = doc_to_html(&schema, &doc);
    assert_eq!(
        html,
        r#"<h2 id="plan" data-block-id="plan" style="text-align:right">Plan</h2>"#
    );
    assert_eq!(parse_markup(&schema, &html), doc);
}

#[rstest]
fn marks_nest_in_registration_order(schema: Arc<Schema>) {
    let text = Node::marked_text(
        "go",
        vec![
            Mark::new("link").with_attr("href", "https://example.com"),
            Mark::new("italic"),
            Mark::new("bold"),
        ],
    );
    let doc = Node::doc(vec![Node::element("paragraph", Attrs::new(), vec![text])]);
    assert_eq!(
        doc_to_html(&schema, &doc),
        r#"<p><strong><em><a href="https://example.com" rel="noopener noreferrer nofollow">go</a></em></strong></p>"#
    );
}

#[rstest]
fn code_blocks_render_header_and_language_class(schema: Arc<Schema>) {
    let doc = Node::doc(vec![Node::element(
        "codeBlock",
        attrs(json!({ "language": "rust" })),
        vec![Node::text("let x = 1 < 2;")],
    )]);
    let html = doc_to_html(&schema, &doc);
    assert_eq!(
        html,
        concat!(
            r#"<div class="code-block" data-language="rust">"#,
            r#"<div class="code-block-header"><span class="code-block-language">rust</span>"#,
            r#"<button type="button" class="code-block-copy">Copy</button></div>"#,
            r#"<pre><code class="language-rust">let x = 1 &lt; 2;</code></pre></div>"#,
        )
    );
    assert_eq!(parse_markup(&schema, &html), doc);

    let plain = parse_markup(&schema, "<pre><code class=\"language-js\">a\n  b</code></pre>");
    let block = plain.child(0).unwrap().as_element().unwrap();
    assert_eq!(block.attr_str("language"), Some("js"));
    assert_eq!(block.text_content(), "a\n  b");
}

#[rstest]
#[case(json!({ "src": "a.png", "align": "center" }), r#"<img src="a.png">"#)]
#[case(json!({ "src": "a.png", "align": "left", "alt": "A" }), r#"<img data-align="left" alt="A" src="a.png">"#)]
#[case(json!({ "src": "a.png", "width": 300 }), r#"<img src="a.png" width="300">"#)]
fn images_only_mark_non_default_alignment(
    schema: Arc<Schema>,
    #[case] image: serde_json::Value,
    #[case] expected: &str,
) {
    let doc = Node::doc(vec![Node::element("image", attrs(image), Vec::new())]);
    assert_eq!(doc_to_html(&schema, &doc), expected);
}

#[rstest]
fn image_markup_parses_numeric_dimensions(schema: Arc<Schema>) {
    let doc = parse_markup(
        &schema,
        r#"<img src="a.png" width="300" height="auto" data-align="right">"#,
    );
    let image = doc.child(0).unwrap().as_element().unwrap();
    assert_eq!(image.kind, "image");
    assert_eq!(image.attr("width"), Some(&json!(300)));
    assert_eq!(image.attr("height"), Some(&json!("auto")));
    assert_eq!(image.attr_str("align"), Some("right"));

    let without_src = parse_markup(&schema, "<img alt=\"nothing\">");
    assert!(without_src.child(0).is_none_or(|n| n.kind() != "image"));
}

#[rstest]
fn callouts_and_columns_survive_markup(schema: Arc<Schema>) {
    let doc = Node::doc(vec![
        Node::element(
            "callout",
            attrs(json!({ "variant": "warning" })),
            vec![Node::paragraph("Careful")],
        ),
        Node::element(
            "columns",
            attrs(json!({ "layout": "1:2" })),
            vec![
                Node::element("column", Attrs::new(), vec![Node::paragraph("left")]),
                Node::element("column", Attrs::new(), vec![Node::paragraph("right")]),
            ],
        ),
    ]);
    let html = doc_to_html(&schema, &doc);
    assert_eq!(
        html,
        concat!(
            r#"<div data-type="callout" data-variant="warning" class="callout callout-warning"><p>Careful</p></div>"#,
            r#"<div data-type="columns" class="columns" data-layout="1:2">"#,
            r#"<div data-type="column" class="column"><p>left</p></div>"#,
            r#"<div data-type="column" class="column"><p>right</p></div></div>"#,
        )
    );
    assert_eq!(parse_markup(&schema, &html), doc);
}

#[rstest]
fn lists_and_breaks(schema: Arc<Schema>) {
    let html = r#"<ol start="3"><li><p>three</p></li></ol><p>a<br>b</p><hr>"#;
    assert_eq!(reparse(&schema, html), html);
    assert_eq!(
        reparse(&schema, "<ol start=\"1\"><li><p>x</p></li></ol>"),
        "<ol><li><p>x</p></li></ol>"
    );
}

#[rstest]
#[case("<section><p>one</p><span>two</span></section>", "<p>one</p><p>two</p>")]
#[case("<p>safe</p><script>alert(1)</script>", "<p>safe</p>")]
#[case(r#"<p><a href="javascript:alert(1)">click</a></p>"#, "<p>click</p>")]
#[case(r#"<p><a href="/docs" target="_blank">docs</a></p>"#, r#"<p><a href="/docs" target="_blank" rel="noopener noreferrer nofollow">docs</a></p>"#)]
#[case(r#"<p><span style="font-weight:700">heavy</span></p>"#, "<p><strong>heavy</strong></p>")]
#[case(r#"<p><b style="font-weight:normal">plain</b></p>"#, "<p>plain</p>")]
#[case("<p><del>gone</del> and <i>tilted</i></p>", "<p><s>gone</s> and <em>tilted</em></p>")]
#[case("<p><code><strong>x</strong></code></p>", "<p><code>x</code></p>")]
#[case(r#"<p style="text-align:sideways">x</p>"#, "<p>x</p>")]
#[case("loose text", "<p>loose text</p>")]
#[case("", "<p></p>")]
fn parse_rules_normalize_markup(schema: Arc<Schema>, #[case] html: &str, #[case] expected: &str) {
    assert_eq!(reparse(&schema, html), expected);
}

#[rstest]
fn containers_gain_a_leading_paragraph(schema: Arc<Schema>) {
    assert_eq!(
        reparse(&schema, "<ul><li><ul><li><p>nested</p></li></ul></li></ul>"),
        "<ul><li><p></p><ul><li><p>nested</p></li></ul></li></ul>"
    );
    assert_eq!(
        reparse(&schema, "<blockquote>quoted</blockquote>"),
        "<blockquote><p>quoted</p></blockquote>"
    );
}

#[rstest]
fn fragments_wrap_inline_runs(schema: Arc<Schema>) {
    let nodes = parse_fragment(&schema, "<strong>bold</strong> tail<h3>Head</h3>");
    let kinds: Vec<&str> = nodes.iter().map(|n| n.kind()).collect();
    assert_eq!(kinds, vec!["paragraph", "heading"]);
    assert_eq!(nodes[0].text_content(), "bold tail");
}

#[rstest]
fn serialization_is_deterministic(schema: Arc<Schema>) {
    let html = concat!(
        r#"<h1 id="a" data-block-id="a">Title</h1>"#,
        r#"<p style="text-align:center">one <strong><em>two</em></strong></p>"#,
        r#"<blockquote><p>three</p></blockquote>"#,
    );
    let first = reparse(&schema, html);
    let second = reparse(&schema, &first);
    assert_eq!(first, html);
    assert_eq!(first, second);
}

#[rstest]
fn text_and_attributes_are_escaped(schema: Arc<Schema>) {
    let doc = Node::doc(vec![
        Node::paragraph("a & b <c>"),
        Node::element("image", attrs(json!({ "src": "x.png?a=1&b=\"2\"" })), Vec::new()),
    ]);
    assert_eq!(
        doc_to_html(&schema, &doc),
        r#"<p>a &amp; b &lt;c&gt;</p><img src="x.png?a=1&amp;b=&quot;2&quot;">"#
    );
}

#[rstest]
fn html_serializer_escapes_by_context(schema: Arc<Schema>) {
    let doc = Node::doc(vec![
        Node::paragraph("a\u{a0}b"),
        Node::element(
            "image",
            attrs(json!({ "src": "a.png", "alt": "<b> & \"c\"" })),
            Vec::new(),
        ),
    ]);
    let html = doc_to_html(&schema, &doc);
    assert_eq!(
        html,
        r#"<p>a&nbsp;b</p><img alt="<b> &amp; &quot;c&quot;" src="a.png">"#
    );
    assert_eq!(parse_markup(&schema, &html), doc);
}
