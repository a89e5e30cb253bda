//! Markup parsing against a shared tree

use trellis_dom::{parse_fragment, to_markup, FixKind, NodeKind, Tree};

#[test]
fn test_fragments_share_one_tree() {
    let mut tree = Tree::new();
    let first = parse_fragment(&mut tree, "<b>one</b>");
    let second = parse_fragment(&mut tree, "<i>two</i>");

    let b = tree.first_child(first.root).unwrap();
    tree.append_child(second.root, b).unwrap();

    assert_eq!(to_markup(&tree, first.root), "");
    assert_eq!(to_markup(&tree, second.root), "<i>two</i><b>one</b>");
}

#[test]
fn test_nested_repairs_reported_innermost_first() {
    let mut tree = Tree::new();
    let parsed = parse_fragment(&mut tree, "<div><ul><li>x");

    let tags: Vec<_> = parsed.fixes.iter().map(|f| f.tag.as_str()).collect();
    assert_eq!(tags, vec!["li", "ul", "div"]);
    assert!(parsed
        .fixes
        .iter()
        .all(|f| f.kind == FixKind::CloseUnclosedTag));
    assert_eq!(to_markup(&tree, parsed.root), "<div><ul><li>x</li></ul></div>");
}

#[test]
fn test_stray_angle_bracket_is_text() {
    let mut tree = Tree::new();
    let parsed = parse_fragment(&mut tree, "1 < 2");
    let only = tree.first_child(parsed.root).unwrap();

    assert_eq!(tree.kind(only), &NodeKind::Text("1 < 2".to_string()));
    assert_eq!(to_markup(&tree, parsed.root), "1 &lt; 2");
}

#[test]
fn test_uppercase_tags_normalised() {
    let mut tree = Tree::new();
    let parsed = parse_fragment(&mut tree, "<SPAN CLASS=begin></span>");
    let span = tree.first_child(parsed.root).unwrap();

    assert_eq!(tree.tag(span), Some("span"));
    assert!(tree.has_class(span, "begin"));
    assert!(parsed.fixes.is_empty());
}

#[test]
fn test_empty_markup_gives_empty_fragment() {
    let mut tree = Tree::new();
    let parsed = parse_fragment(&mut tree, "");
    assert_eq!(tree.first_child(parsed.root), None);
}

#[cfg(feature = "pretty-errors")]
#[test]
fn test_format_fixes_mentions_tag() {
    let source = "<p>text</em>";
    let mut tree = Tree::new();
    let parsed = parse_fragment(&mut tree, source);

    let report = trellis_dom::format_fixes(source, "page.html", &parsed.fixes);
    assert!(report.contains("</em>"));
    assert!(report.contains("</p>"));
}
