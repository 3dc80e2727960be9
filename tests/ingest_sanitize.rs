// tests/ingest_sanitize.rs
use feed_river::ingest::sanitize::{sanitize, ELLIPSIS, MAX_BODY_CHARS};

fn assert_clean(out: &str) {
    assert!(!out.contains("http://") && !out.contains("https://"), "url leaked: {out}");
    assert!(!out.contains('<') && !out.contains('>'), "markup leaked: {out}");
}

#[test]
fn anchor_and_image_markup_never_leaks() {
    let inputs = [
        r#"<a href="https://x.test/a">https://x.test/a</a>"#,
        r#"Before <A HREF='http://x.test'>caps anchor</A> after"#,
        r#"<p>Photo: <img src="https://x.test/p.png" alt="https://x.test/alt"></p> caption"#,
        r#"<div><a href="https://x.test"><img src="https://x.test/i.png"/></a>text https://bare.test/url more</div>"#,
        r#"&lt;a href="https://x.test"&gt;escaped anchor&lt;/a&gt; tail"#,
        r#"<a href="https://x.test">never closed https://x.test/in"#,
    ];
    for input in inputs {
        assert_clean(&sanitize(input));
    }
    assert_eq!(sanitize(inputs[1]), "Before after");
    assert_eq!(sanitize(inputs[2]), "Photo: caption");
    assert_eq!(sanitize(inputs[3]), "text more");
}

#[test]
fn output_never_exceeds_budget() {
    for n in [0usize, 1, 179, 180, 181, 500, 5_000] {
        let out = sanitize(&format!("<p>{}</p>", "a".repeat(n)));
        assert!(out.chars().count() <= MAX_BODY_CHARS);
    }
}

#[test]
fn long_text_is_cut_to_exactly_budget_with_ellipsis() {
    let words = "lorem ipsum dolor sit amet ".repeat(20);
    let out = sanitize(&words);
    assert_eq!(out.chars().count(), MAX_BODY_CHARS);
    assert!(out.ends_with(ELLIPSIS));
    assert!(words.starts_with(&out[..out.len() - ELLIPSIS.len()]));
}

#[test]
fn points_and_comments_markers_mean_metadata() {
    let s = "<p>A genuinely interesting paragraph.</p><p>Points: 120</p><p>More prose</p><p># Comments: 45</p>";
    assert_eq!(sanitize(s), "");
    // One marker alone is just prose.
    assert_eq!(sanitize("Points: are made"), "Points: are made");
}

#[test]
fn article_url_marker_means_metadata() {
    assert_eq!(sanitize("Article URL: something"), "");
}

#[test]
fn collapses_and_trims_whitespace() {
    assert_eq!(sanitize("  <p>a\n\n\tb</p>   <p>c</p>  "), "a b c");
}

#[test]
fn empty_input_is_empty_string() {
    assert_eq!(sanitize(""), "");
    assert_eq!(sanitize(r#"<a href="https://x.test">only a link</a>"#), "");
}

#[test]
fn gt_inside_attribute_values_does_not_leak() {
    let cases = [
        (
            r#"<p>Caption <img alt="secret > alt text" src="https://x.test/p.png"> end</p>"#,
            "Caption end",
        ),
        (
            r#"Read <a href="https://x.test/a" title="a > b">link text</a> here"#,
            "Read here",
        ),
        (
            r#"<img alt='x > y' src='https://x.test/i.png'/>Single quotes"#,
            "Single quotes",
        ),
        (
            r#"<div data-rule="a>b" class='c>d'>Kept</div>"#,
            "Kept",
        ),
        (
            r#"Tail <a title='1 > 0' href="https://x.test">never closed"#,
            "Tail",
        ),
    ];
    for (input, want) in cases {
        let out = sanitize(input);
        assert_clean(&out);
        assert_eq!(out, want, "input: {input}");
    }
}

#[test]
fn comparison_operators_in_prose_are_kept_as_text() {
    assert_eq!(
        sanitize("Latency stays < 5ms while throughput is > 2GB per node."),
        "Latency stays 5ms while throughput is 2GB per node."
    );
    assert_eq!(
        sanitize("<p>If x &lt; 3 and y &gt; 4, then 2 < 5.</p>"),
        "If x 3 and y 4, then 2 5."
    );
    assert_eq!(sanitize("a <= b >= c"), "a = b = c");
}

#[test]
fn unterminated_quote_in_tag_is_still_stripped() {
    let out = sanitize(r#"<span title="oops>Body text"#);
    assert_clean(&out);
    assert_eq!(out, "Body text");
}
