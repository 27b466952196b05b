// ============================================================================
// spark-bind - Selectors
// A subset of CSS selectors for locating templates and test fixtures
// ============================================================================
//
// Supported: type (`li`), id (`#main`), class (`.item`), attribute presence
// and equality (`[data-x]`, `[type="text"]`), any compound of those
// (`li.item[data-x]`), and the descendant combinator (`ul li`).
// ============================================================================

use super::node::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        let Some(tag) = node.tag_name() else {
            return false;
        };
        if self.tag.as_ref().is_some_and(|t| *t != tag) {
            return false;
        }
        if self.id.as_ref().is_some_and(|id| node.get_attribute("id").as_ref() != Some(id)) {
            return false;
        }
        if !self.classes.is_empty() {
            let class_attr = node.get_attribute("class").unwrap_or_default();
            let classes: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
                return false;
            }
        }
        self.attributes.iter().all(|(name, value)| match value {
            Some(value) => node.get_attribute(name).as_ref() == Some(value),
            None => node.has_attribute(name),
        })
    }
}

/// A parsed selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Outermost ancestor first, subject last
    compounds: Vec<Compound>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &[char], pos: &mut usize) -> Option<String> {
    let start = *pos;
    while chars.get(*pos).is_some_and(|&c| is_ident_char(c)) {
        *pos += 1;
    }
    (*pos > start).then(|| chars[start..*pos].iter().collect())
}

fn parse_compound(text: &str) -> Option<Compound> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut compound = Compound {
        tag: None,
        id: None,
        classes: Vec::new(),
        attributes: Vec::new(),
    };

    if chars.first() == Some(&'*') {
        pos = 1;
    } else if chars.first().is_some_and(|&c| is_ident_char(c)) {
        compound.tag = read_ident(&chars, &mut pos).map(|t| t.to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                compound.id = Some(read_ident(&chars, &mut pos)?);
            }
            '.' => {
                pos += 1;
                compound.classes.push(read_ident(&chars, &mut pos)?);
            }
            '[' => {
                let close = chars[pos..].iter().position(|&c| c == ']')? + pos;
                let body: String = chars[pos + 1..close].iter().collect();
                let attribute = match body.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                        (name.trim().to_string(), Some(value.to_string()))
                    }
                    None => (body.trim().to_string(), None),
                };
                if attribute.0.is_empty() {
                    return None;
                }
                compound.attributes.push(attribute);
                pos = close + 1;
            }
            _ => return None,
        }
    }

    Some(compound)
}

impl Selector {
    /// Parse a selector, returning `None` for unsupported syntax.
    pub fn parse(text: &str) -> Option<Selector> {
        let compounds = text
            .split_whitespace()
            .map(parse_compound)
            .collect::<Option<Vec<_>>>()?;
        if compounds.is_empty() {
            return None;
        }
        Some(Selector { compounds })
    }

    /// Whether `node` matches, looking at all of its ancestors for the
    /// descendant parts.
    pub fn matches(&self, node: &Node) -> bool {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !subject.matches(node) {
            return false;
        }

        let mut remaining = ancestors.iter().rev().peekable();
        let mut current = node.parent();
        while let Some(wanted) = remaining.peek() {
            let Some(ancestor) = current else {
                return false;
            };
            if wanted.matches(&ancestor) {
                remaining.next();
            }
            current = ancestor.parent();
        }
        true
    }
}

impl Node {
    /// First descendant matching `selector`. Unsupported selectors match
    /// nothing.
    pub fn query_selector(&self, selector: &str) -> Option<Node> {
        let selector = Selector::parse(selector)?;
        self.descendants().into_iter().find(|n| selector.matches(n))
    }

    /// Every descendant matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Vec<Node> {
        match Selector::parse(selector) {
            Some(selector) => self
                .descendants()
                .into_iter()
                .filter(|n| selector.matches(n))
                .collect(),
            None => Vec::new(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
