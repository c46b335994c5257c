//! Text, link and embed extraction from HTML

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::Extracted;
use super::video::extract_video_id;

/// CSS selectors tried in order to find the main content region
pub const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    "#content",
    ".content",
    ".user_content",
    ".show-content",
];

/// Elements removed before anything is extracted
const STRIPPED_ELEMENTS: &str =
    "script, style, noscript, template, nav, form, header, footer, aside, button, select";

/// Elements whose text is collected, each on its own line
const TEXT_ELEMENTS: &[&str] = &[
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "td",
    "th",
    "pre",
    "blockquote",
    "dt",
    "dd",
    "figcaption",
    "caption",
    "div",
    "section",
];

/// Extract visible text, absolute links and video identifiers from HTML
///
/// # Arguments
///
/// * `html` - The HTML source; may be empty or malformed
/// * `base_url` - The URL relative hrefs are resolved against
///
/// # Returns
///
/// The extracted text, links and video ids. Never fails; unusable input gives
/// an empty [`Extracted`].
pub fn extract(html: &str, base_url: &str) -> Extracted {
    if html.trim().is_empty() {
        return Extracted::default();
    }

    let mut document = Html::parse_document(html);
    strip_non_content(&mut document);

    let base = match Url::parse(base_url) {
        Ok(base) => Some(base),
        Err(e) => {
            debug!("Unusable base URL {:?}: {}", base_url, e);
            None
        }
    };

    let Some(region) = content_region(&document) else {
        return Extracted::default();
    };

    let text = collect_text(region);
    let (links, video_ids) = collect_links(region, base.as_ref());

    Extracted {
        text,
        links,
        video_ids,
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Failed to parse selector '{}': {}", selector, e);
            None
        }
    }
}

/// Detach scripts, navigation, forms and similar chrome from the tree
fn strip_non_content(document: &mut Html) {
    let Some(selector) = parse_selector(STRIPPED_ELEMENTS) else {
        return;
    };
    let ids: Vec<_> = document.select(&selector).map(|element| element.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// The first main-content match, else `<body>`, else the root element
fn content_region(document: &Html) -> Option<ElementRef<'_>> {
    for selector_str in MAIN_CONTENT_SELECTORS {
        if let Some(selector) = parse_selector(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                debug!("Using main content region '{}'", selector_str);
                return Some(element);
            }
        }
    }

    parse_selector("body")
        .and_then(|body| document.select(&body).next())
        .or_else(|| Some(document.root_element()))
}

fn is_text_element(element: &ElementRef<'_>) -> bool {
    TEXT_ELEMENTS.contains(&element.value().name())
}

/// Text of the text-bearing elements in document order, one run per line
///
/// A nested text-bearing element closes the run of its parent, so loose text
/// on either side of it lands on separate lines and nothing is emitted twice.
fn collect_text(region: ElementRef<'_>) -> String {
    let mut lines = Vec::new();
    let mut outside = None;
    visit_element(region, &mut lines, &mut outside);
    lines.join("\n")
}

/// `run` holds the raw text of the enclosing text element, `None` outside any
fn visit_element(element: ElementRef<'_>, lines: &mut Vec<String>, run: &mut Option<String>) {
    if element.value().name() == "br" {
        if let Some(text) = run.as_mut() {
            text.push(' ');
        }
        return;
    }
    if !is_text_element(&element) {
        visit_children(element, lines, run);
        return;
    }

    flush_run(run, lines);
    let mut own = Some(String::new());
    visit_children(element, lines, &mut own);
    flush_run(&mut own, lines);
}

fn visit_children(element: ElementRef<'_>, lines: &mut Vec<String>, run: &mut Option<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            if let Some(pending) = run.as_mut() {
                pending.push_str(text);
            }
        } else if let Some(child) = ElementRef::wrap(child) {
            visit_element(child, lines, run);
        }
    }
}

/// Whitespace-collapse the pending run into a line
fn flush_run(run: &mut Option<String>, lines: &mut Vec<String>) {
    if let Some(pending) = run.as_mut() {
        let line = pending.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
        pending.clear();
    }
}

/// Walk anchors and iframes in document order
fn collect_links(region: ElementRef<'_>, base: Option<&Url>) -> (Vec<String>, Vec<String>) {
    let mut links = Vec::new();
    let mut video_ids: Vec<String> = Vec::new();

    for element in region.descendants().filter_map(ElementRef::wrap) {
        let (target, is_anchor) = match element.value().name() {
            "a" => (element.value().attr("href"), true),
            "iframe" => (element.value().attr("src"), false),
            _ => continue,
        };
        let Some(resolved) = target.and_then(|target| resolve(target, base)) else {
            continue;
        };

        if let Some(id) = extract_video_id(resolved.as_str()) {
            if !video_ids.contains(&id) {
                video_ids.push(id);
            }
        } else if is_anchor {
            links.push(resolved.to_string());
        }
    }

    (links, video_ids)
}

/// Resolve an href against the base, keeping only `http` and `https` targets
fn resolve(href: &str, base: Option<&Url>) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };
    match resolved {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            debug!("Skipping {} link {:?}", url.scheme(), href);
            None
        }
        Err(e) => {
            debug!("Skipping unresolvable href {:?}: {}", href, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_malformed_input() {
        let inputs = [
            "",
            "   \n  ",
            "<<<>>>",
            "</div></p>",
            "<a href=",
            "<script>alert(1)</script>",
        ];
        for html in inputs {
            assert_eq!(extract(html, "https://example.test/"), Extracted::default(), "{:?}", html);
        }
    }

    #[test]
    fn test_relative_link_resolution() {
        let extracted = extract(
            r#"<p><a href="files/1">Syllabus</a></p>"#,
            "https://example.test/course/",
        );
        assert_eq!(extracted.links, vec!["https://example.test/course/files/1"]);
        assert_eq!(extracted.text, "Syllabus");
    }

    #[test]
    fn test_video_link_is_not_a_link() {
        let extracted = extract(
            r#"<p>Watch <a href="https://youtu.be/dQw4w9WgXcQ">this</a></p>"#,
            "https://example.test/",
        );
        assert_eq!(extracted.video_ids, vec!["dQw4w9WgXcQ"]);
        assert!(extracted.links.is_empty());
    }

    #[test]
    fn test_iframe_embeds_and_dedup() {
        let html = r#"
            <div>
              <p>Lecture</p>
              <iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ"></iframe>
              <iframe src="https://player.example.test/video/1"></iframe>
              <p><a href="https://www.youtube.com/watch?v=dQw4w9WgXcQ">again</a></p>
              <p><a href="https://youtu.be/aaaaaaaaaaa">other</a></p>
            </div>"#;
        let extracted = extract(html, "https://example.test/");

        assert_eq!(extracted.video_ids, vec!["dQw4w9WgXcQ", "aaaaaaaaaaa"]);
        // Non-video iframes are not treated as links.
        assert!(extracted.links.is_empty());
    }

    #[test]
    fn test_skipped_hrefs_and_document_order() {
        let html = r##"
            <p>
              <a href="#top">top</a>
              <a href="javascript:void(0)">js</a>
              <a href="">empty</a>
              <a href="/b.pdf">b</a>
              <a href="https://other.test/a">a</a>
              <a href="/b.pdf">b again</a>
            </p>"##;
        let extracted = extract(html, "https://example.test/course/");
        assert_eq!(
            extracted.links,
            vec![
                "https://example.test/b.pdf",
                "https://other.test/a",
                "https://example.test/b.pdf",
            ]
        );
    }

    #[test]
    fn test_strips_non_content_and_prefers_main() {
        let html = r#"
            <html><body>
              <nav><a href="/home">Home</a> Navigation</nav>
              <p>Outside main</p>
              <main>
                <h1>Essay  prompt</h1>
                <p>Write   about
                   rivers.</p>
                <script>var x = "hidden";</script>
                <form><p>Login</p></form>
              </main>
              <footer>Footer</footer>
            </body></html>"#;
        let extracted = extract(html, "https://example.test/");

        assert_eq!(extracted.text, "Essay prompt\nWrite about rivers.");
        assert!(extracted.links.is_empty());
    }

    #[test]
    fn test_nested_blocks_emitted_once() {
        let html = "<ul><li><p>First</p></li><li>Second</li></ul><div>Loose</div>";
        let extracted = extract(html, "https://example.test/");
        assert_eq!(extracted.text, "First\nSecond\nLoose");
    }

    #[test]
    fn test_loose_text_beside_nested_blocks_is_kept() {
        let nested_list =
            "<ul><li>Part A: write an outline<ul><li>use three sections</li></ul></li></ul>";
        assert_eq!(
            extract(nested_list, "https://example.test/").text,
            "Part A: write an outline\nuse three sections"
        );

        let mixed_div = "<div><p>Read chapter 3.</p>Submit as a PDF by Friday.</div>";
        assert_eq!(
            extract(mixed_div, "https://example.test/").text,
            "Read chapter 3.\nSubmit as a PDF by Friday."
        );
    }

    #[test]
    fn test_inline_children_stay_on_one_line() {
        let html = r#"<li>Due <b>Friday</b>, see <a href="/rubric">the rubric</a>.<p>Late work loses 10%</p>then<br>zero</li>"#;
        assert_eq!(
            extract(html, "https://example.test/").text,
            "Due Friday, see the rubric.\nLate work loses 10%\nthen zero"
        );
    }

    #[test]
    fn test_non_web_schemes_are_not_links() {
        let html = r#"<p>
              <a href="mailto:prof@example.test">Email me</a>
              <a href="tel:+15550100">Call</a>
              <a href="data:text/plain,hi">inline</a>
              <a href="ftp://files.example.test/a.txt">ftp</a>
              <a href="HTTPS://example.test/notes.pdf">notes</a>
            </p>"#;
        let extracted = extract(html, "https://example.test/");
        assert_eq!(extracted.links, vec!["https://example.test/notes.pdf"]);
    }

    #[test]
    fn test_invalid_base_keeps_absolute_links_only() {
        let html = r#"<p><a href="rel/1">rel</a><a href="https://example.test/abs">abs</a></p>"#;
        let extracted = extract(html, "not a base");
        assert_eq!(extracted.links, vec!["https://example.test/abs"]);
    }
}
