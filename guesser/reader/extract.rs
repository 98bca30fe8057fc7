use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text counts as document content.
const CONTENT_TAGS: &[&str] = &[
    "title", "h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "blockquote", "td", "pre",
];

/// Subtrees never read.
const IGNORE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "header", "aside", "template",
];

static CONTENT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("title, h1, h2, h3, h4, h5, h6, p, li, blockquote, td, pre")
        .expect("valid content selector")
});

/// Visible text of the content elements of `html`, one block per line.
///
/// Content nested inside another content element is read once, as part of its outermost
/// container.
#[must_use]
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut blocks = Vec::new();
    for element in document.select(&CONTENT) {
        if nested_or_ignored(&element) {
            continue;
        }
        let mut buf = String::new();
        collect_text(element, &mut buf);
        let block = normalize_whitespace(&buf);
        if !block.is_empty() {
            blocks.push(block);
        }
    }
    blocks.join("\n")
}

fn nested_or_ignored(element: &ElementRef<'_>) -> bool {
    if IGNORE_TAGS.contains(&element.value().name()) {
        return true;
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| {
            let name = ancestor.value().name();
            IGNORE_TAGS.contains(&name) || CONTENT_TAGS.contains(&name)
        })
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !IGNORE_TAGS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_content_and_drops_chrome() {
        let html = r#"
            <html>
              <head><title>Pets</title><style>p { color: red }</style></head>
              <body>
                <header><h1>Site name</h1></header>
                <nav><ul><li>Home</li></ul></nav>
                <h2>Cats</h2>
                <p>Cats are <b>great</b>.<script>track()</script></p>
                <ul><li><p>Dogs too</p></li></ul>
                <footer><p>Copyright</p></footer>
              </body>
            </html>"#;
        assert_eq!(extract_text(html), "Pets\nCats\nCats are great .\nDogs too");
    }

    #[test]
    fn empty_for_pages_without_content() {
        assert_eq!(extract_text("<html><body><div> </div></body></html>"), "");
    }
}
