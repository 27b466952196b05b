// ============================================================================
// spark-bind - HTML Fragment Parser
// Lenient markup -> Node tree conversion
// ============================================================================
//
// Handles the HTML that templates are written in: elements with quoted or
// unquoted attributes, void and self-closing elements, comments, doctype
// declarations, raw-text `<script>`/`<style>` bodies and character
// references. Attribute names are taken verbatim, so binding markers like
// `.value:input`, `[disabled]`, `on:click` and `@for` survive intact.
//
// Malformed input never fails: stray end tags are ignored and unclosed
// elements are closed at the end of input.
// ============================================================================

use super::node::Node;

/// Elements that never have children or an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text up to the matching end tag
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse markup into a document fragment.
///
/// # Example
///
/// ```
/// use spark_bind::dom::parse_html;
///
/// let fragment = parse_html(r#"<p class="greeting">Hi &amp; bye<br></p>"#);
/// let p = fragment.first_child().unwrap();
/// assert_eq!(p.get_attribute("class").as_deref(), Some("greeting"));
/// assert_eq!(p.text_content(), "Hi & bye");
/// ```
pub fn parse_html(markup: &str) -> Node {
    let fragment = Node::fragment();
    HtmlParser::new(markup, fragment.clone()).run();
    fragment
}

/// Parse markup that holds a single element and return that element.
///
/// Leading and trailing whitespace text is ignored. Returns `None` when the
/// markup contains no element.
pub fn parse_element(markup: &str) -> Option<Node> {
    let element = parse_html(markup).children().into_iter().find(Node::is_element)?;
    element.remove();
    Some(element)
}

// =============================================================================
// PARSER
// =============================================================================

struct HtmlParser {
    chars: Vec<char>,
    pos: usize,
    /// Open elements, innermost last; the fragment sits at the bottom
    stack: Vec<Node>,
}

impl HtmlParser {
    fn new(markup: &str, root: Node) -> Self {
        Self {
            chars: markup.chars().collect(),
            pos: 0,
            stack: vec![root],
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i).is_some_and(|p| p.eq_ignore_ascii_case(&c)))
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn current(&self) -> &Node {
        // The fragment is never popped
        &self.stack[self.stack.len() - 1]
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Consume up to (not including) `terminator`, or to the end of input.
    fn take_until(&mut self, terminator: &str) -> String {
        let start = self.pos;
        while !self.at_end() && !self.starts_with(terminator) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn run(mut self) {
        while !self.at_end() {
            if self.starts_with("<!--") {
                self.pos += 4;
                let data = self.take_until("-->");
                self.pos = (self.pos + 3).min(self.chars.len());
                self.current().append_child(&Node::comment(data));
            } else if self.starts_with("<!") || self.starts_with("<?") {
                self.take_until(">");
                self.pos += 1;
            } else if self.starts_with("</") && self.peek_at(2).is_some_and(|c| c.is_ascii_alphabetic()) {
                self.parse_end_tag();
            } else if self.peek() == Some('<') && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
                self.parse_start_tag();
            } else {
                self.parse_text();
            }
        }
    }

    fn parse_text(&mut self) {
        let start = self.pos;
        // Always take at least one char so a lone `<` is text
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c == '<'
                && self
                    .peek_at(1)
                    .is_some_and(|n| n.is_ascii_alphabetic() || n == '/' || n == '!' || n == '?')
            {
                break;
            }
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        self.append_text(&decode_entities(&raw));
    }

    fn append_text(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        // Merge with a preceding text node
        if let Some(last) = self.current().children().last().filter(|n| n.is_text()) {
            let mut data = last.data().unwrap_or_default();
            data.push_str(text);
            last.set_data(&data);
            return;
        }
        self.current().append_child(&Node::text(text));
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && c != '>' && c != '/' && c != '=')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_end_tag(&mut self) {
        self.pos += 2;
        let name = self.read_name().to_ascii_lowercase();
        self.take_until(">");
        self.pos += 1;

        let open = self
            .stack
            .iter()
            .rposition(|n| n.tag_name().as_deref() == Some(name.as_str()));
        if let Some(index) = open.filter(|&i| i > 0) {
            self.stack.truncate(index);
        }
    }

    fn parse_start_tag(&mut self) {
        self.pos += 1;
        let tag = self.read_name().to_ascii_lowercase();
        let element = Node::element(&tag);
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.pos += 1;
                    break;
                }
                Some('/') if self.peek_at(1) == Some('>') => {
                    self.pos += 2;
                    self_closing = true;
                    break;
                }
                Some('/') => self.pos += 1,
                Some(_) => {
                    let name = self.read_name();
                    if name.is_empty() {
                        // A stray `=`
                        self.pos += 1;
                        continue;
                    }
                    let value = self.parse_attribute_value();
                    if !element.has_attribute(&name) {
                        element.set_attribute(&name, &value);
                    }
                }
            }
        }

        self.current().append_child(&element);

        if self_closing || is_void_element(&tag) {
            return;
        }

        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            let close = format!("</{tag}");
            let raw = self.take_until(&close);
            let text = if tag == "script" || tag == "style" {
                raw
            } else {
                decode_entities(&raw)
            };
            if !text.is_empty() {
                element.append_child(&Node::text(text));
            }
            self.take_until(">");
            self.pos += 1;
            return;
        }

        self.stack.push(element);
    }

    fn parse_attribute_value(&mut self) -> String {
        self.skip_whitespace();
        if self.peek() != Some('=') {
            return String::new();
        }
        self.pos += 1;
        self.skip_whitespace();

        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let raw = self.take_until(&quote.to_string());
                self.pos += 1;
                decode_entities(&raw)
            }
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(|c| !c.is_whitespace() && c != '>') {
                    self.pos += 1;
                }
                let raw: String = self.chars[start..self.pos].iter().collect();
                decode_entities(&raw)
            }
        }
    }
}

// =============================================================================
// CHARACTER REFERENCES
// =============================================================================

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "hellip" => '\u{2026}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "times" => '\u{d7}',
        _ => return None,
    })
}

/// Replace character references. Unknown references are kept verbatim.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let body = &rest[1..semi];
            let c = if let Some(num) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(num, 16).ok().and_then(char::from_u32)
            } else if let Some(num) = body.strip_prefix('#') {
                num.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            c.map(|c| (c, semi + 1))
        });

        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

// =============================================================================
// TESTS
// =============================================================================
