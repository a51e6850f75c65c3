//! A minimal view tree. Components render into it; the host (or the dev
//! harness) decides how to display it.

use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViewNode {
    Element {
        tag: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        classes: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        children: Vec<ViewNode>,
    },
    Text {
        text: String,
    },
    Button {
        action: String,
        label: String,
        disabled: bool,
    },
}

impl ViewNode {
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element { tag: tag.into(), classes: Vec::new(), children: Vec::new() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn button(action: impl Into<String>, label: impl Into<String>, disabled: bool) -> Self {
        Self::Button { action: action.into(), label: label.into(), disabled }
    }

    /// Adds a class. No-op on non-element nodes.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        if let Self::Element { classes, .. } = &mut self {
            classes.push(class.into());
        }
        self
    }

    /// Appends a child. No-op on non-element nodes.
    pub fn child(mut self, node: ViewNode) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    pub fn children(self, nodes: impl IntoIterator<Item = ViewNode>) -> Self {
        nodes.into_iter().fold(self, Self::child)
    }

    pub fn has_class(&self, class: &str) -> bool {
        matches!(self, Self::Element { classes, .. } if classes.iter().any(|c| c == class))
    }

    /// Depth-first search for the first node satisfying `pred`.
    pub fn find(&self, pred: &dyn Fn(&ViewNode) -> bool) -> Option<&ViewNode> {
        if pred(self) {
            return Some(self);
        }
        match self {
            Self::Element { children, .. } => children.iter().find_map(|c| c.find(pred)),
            _ => None,
        }
    }

    pub fn find_class(&self, class: &str) -> Option<&ViewNode> {
        self.find(&|n: &ViewNode| n.has_class(class))
    }

    pub fn find_button(&self, action: &str) -> Option<&ViewNode> {
        self.find(&|n: &ViewNode| matches!(n, Self::Button { action: a, .. } if a == action))
    }

    /// All text in document order, space separated.
    pub fn text_content(&self) -> String {
        let mut out = Vec::new();
        self.collect_text(&mut out);
        out.join(" ")
    }

    fn collect_text<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Text { text } => out.push(text),
            Self::Button { label, .. } => out.push(label),
            Self::Element { children, .. } => children.iter().for_each(|c| c.collect_text(out)),
        }
    }

    /// Indented plain-text rendering for terminals.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        match self {
            Self::Element { tag, classes, children } => {
                if classes.is_empty() {
                    let _ = writeln!(out, "{pad}<{tag}>");
                } else {
                    let _ = writeln!(out, "{pad}<{tag} .{}>", classes.join("."));
                }
                children.iter().for_each(|c| c.write_pretty(out, depth + 1));
            }
            Self::Text { text } => {
                let _ = writeln!(out, "{pad}{text}");
            }
            Self::Button { label, disabled, .. } => {
                let state = if *disabled { " (disabled)" } else { "" };
                let _ = writeln!(out, "{pad}[{label}]{state}");
            }
        }
    }
}
