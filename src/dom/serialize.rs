// ============================================================================
// spark-bind - HTML Serialization
// ============================================================================

use super::node::{Node, NodeType};
use super::parser::is_void_element;

impl Node {
    /// Markup for this node and its descendants.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }

    /// Markup for the descendants only.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            write_node(&child, &mut out);
        }
        out
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node.node_type() {
        NodeType::Text => out.push_str(&escape_text(&node.data().unwrap_or_default())),
        NodeType::Comment => {
            out.push_str("<!--");
            out.push_str(&node.data().unwrap_or_default());
            out.push_str("-->");
        }
        NodeType::Fragment => {
            for child in node.children() {
                write_node(&child, out);
            }
        }
        NodeType::Element => {
            let tag = node.tag_name().unwrap_or_default();
            out.push('<');
            out.push_str(&tag);
            for (name, value) in node.attributes() {
                out.push(' ');
                out.push_str(&name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(&value));
                    out.push('"');
                }
            }
            out.push('>');

            if is_void_element(&tag) {
                return;
            }
            for child in node.children() {
                write_node(&child, out);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

// =============================================================================
// TESTS
// =============================================================================
