//! In-memory document model for the mock driver

use std::collections::BTreeMap;

use super::selector::{Selector, SelectorTarget};
use crate::driver::traits::Rect;

/// What happens when an element is clicked or focused, beyond the built-in form behavior
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    /// Focusing the element sets its rendered width
    ExpandOnFocus { width: f64 },
    /// Clicking loads this URL
    Navigate(String),
    /// Clicking hides the element with this id
    Dismiss { target_id: String },
    /// Clicking a checkbox submits its form after toggling it
    AutoSubmit,
    /// Clicking renders the form's submission and swaps in the element with this id, keeping
    /// the document
    RenderInPlace { target_id: String },
}

/// Declarative description of an element and its subtree
///
/// Sites served through [`super::MockSite`] build their pages out of these.
#[derive(Debug, Clone, PartialEq)]
pub struct MockNode {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub value: String,
    pub displayed: bool,
    pub selected: bool,
    pub rect: Rect,
    pub behaviors: Vec<Behavior>,
    pub children: Vec<MockNode>,
}

impl MockNode {
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
            displayed: true,
            selected: false,
            rect: Rect::default(),
            behaviors: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn id<S: Into<String>>(self, id: S) -> Self {
        self.attr("id", id)
    }

    pub fn class<S: Into<String>>(self, class: S) -> Self {
        self.attr("class", class)
    }

    pub fn attr<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }

    pub fn value<S: Into<String>>(mut self, value: S) -> Self {
        self.value = value.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.selected = checked;
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Rect::new(x, y, width, height);
        self
    }

    pub fn on(mut self, behavior: Behavior) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn child(mut self, child: MockNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children<I: IntoIterator<Item = MockNode>>(mut self, children: I) -> Self {
        self.children.extend(children);
        self
    }

    /// First node in this subtree whose id is `id`
    pub fn find_by_id(&self, id: &str) -> Option<&MockNode> {
        if self.attributes.get("id").map(String::as_str) == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_by_id(id))
    }
}

/// Live element state
#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub value: String,
    pub displayed: bool,
    pub selected: bool,
    pub rect: Rect,
    pub behaviors: Vec<Behavior>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl NodeData {
    pub fn input_type(&self) -> &str {
        self.attributes.get("type").map(String::as_str).unwrap_or("text")
    }

    pub fn is_checkable(&self) -> bool {
        self.tag == "input" && matches!(self.input_type(), "checkbox" | "radio")
    }

    pub fn is_submit_control(&self) -> bool {
        match self.tag.as_str() {
            "button" => self.attributes.get("type").map_or(true, |t| t == "submit"),
            "input" => self.input_type() == "submit",
            _ => false,
        }
    }
}

/// One loaded document, flattened into an arena; node 0 is the root
#[derive(Debug, Clone)]
pub(crate) struct Document {
    pub generation: u64,
    pub nodes: Vec<NodeData>,
}

impl Document {
    pub fn new(root: MockNode, generation: u64) -> Self {
        let mut document = Self {
            generation,
            nodes: Vec::new(),
        };
        document.insert(root, None);
        document
    }

    fn insert(&mut self, node: MockNode, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(NodeData {
            tag: node.tag.to_ascii_lowercase(),
            attributes: node.attributes,
            text: node.text,
            value: node.value,
            displayed: node.displayed,
            selected: node.selected,
            rect: node.rect,
            behaviors: node.behaviors,
            parent,
            children: Vec::new(),
        });

        for child in node.children {
            let child_index = self.insert(child, Some(index));
            self.nodes[index].children.push(child_index);
        }
        index
    }

    /// Overwrite `target` and its subtree with `replacement`, keeping its place in the tree
    ///
    /// The old descendants become unreachable but stay in the arena.
    pub fn replace_subtree(&mut self, target: usize, replacement: MockNode) {
        let parent = self.nodes[target].parent;
        let data = &mut self.nodes[target];
        data.tag = replacement.tag.to_ascii_lowercase();
        data.attributes = replacement.attributes;
        data.text = replacement.text;
        data.value = replacement.value;
        data.displayed = replacement.displayed;
        data.selected = replacement.selected;
        data.rect = replacement.rect;
        data.behaviors = replacement.behaviors;
        data.parent = parent;
        data.children = Vec::new();

        for child in replacement.children {
            let child_index = self.insert(child, Some(target));
            self.nodes[target].children.push(child_index);
        }
    }

    /// Descendants of `node` in document order, excluding `node`
    pub fn descendants(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[node].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev());
        }
        out
    }

    /// Nodes matching `selector` below `scope`; `None` searches the whole document
    pub fn query(&self, scope: Option<usize>, selector: &Selector) -> Vec<usize> {
        let candidates = match scope {
            Some(node) => self.descendants(node),
            None => {
                let mut all = vec![0];
                all.extend(self.descendants(0));
                all
            }
        };
        candidates
            .into_iter()
            .filter(|node| selector.matches(self, *node))
            .collect()
    }

    pub fn find_by_id(&self, id: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.attributes.get("id").map(String::as_str) == Some(id))
    }

    /// Rendered text: own text and displayed descendants' text, whitespace-joined
    pub fn text_of(&self, node: usize) -> String {
        if !self.nodes[node].displayed {
            return String::new();
        }
        let mut parts = Vec::new();
        let own = self.nodes[node].text.trim();
        if !own.is_empty() {
            parts.push(own.to_string());
        }
        for child in &self.nodes[node].children {
            let text = self.text_of(*child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        parts.join(" ")
    }

    /// Displayed when the node and all its ancestors are
    pub fn is_displayed(&self, node: usize) -> bool {
        let mut current = Some(node);
        while let Some(index) = current {
            if !self.nodes[index].displayed {
                return false;
            }
            current = self.nodes[index].parent;
        }
        true
    }

    /// Nearest `form` at or above `node`
    pub fn enclosing_form(&self, node: usize) -> Option<usize> {
        let mut current = Some(node);
        while let Some(index) = current {
            if self.nodes[index].tag == "form" {
                return Some(index);
            }
            current = self.nodes[index].parent;
        }
        None
    }

    /// Name/value pairs a GET submission of `form` sends
    pub fn form_data(&self, form: usize) -> Vec<(String, String)> {
        self.descendants(form)
            .into_iter()
            .filter_map(|index| {
                let node = &self.nodes[index];
                if !matches!(node.tag.as_str(), "input" | "select" | "textarea") || node.is_submit_control() {
                    return None;
                }
                let name = node.attributes.get("name")?;
                if node.is_checkable() {
                    if !node.selected {
                        return None;
                    }
                    let value = node.attributes.get("value").cloned().unwrap_or_else(|| "on".to_string());
                    return Some((name.clone(), value));
                }
                Some((name.clone(), node.value.clone()))
            })
            .collect()
    }

    pub fn to_html(&self, node: usize) -> String {
        let data = &self.nodes[node];
        let mut html = format!("<{}", data.tag);
        for (name, value) in &data.attributes {
            html.push_str(&format!(" {}=\"{}\"", name, value.replace('"', "&quot;")));
        }
        html.push('>');
        html.push_str(&data.text);
        for child in &data.children {
            html.push_str(&self.to_html(*child));
        }
        html.push_str(&format!("</{}>", data.tag));
        html
    }
}

impl SelectorTarget for Document {
    fn tag(&self, node: usize) -> &str {
        &self.nodes[node].tag
    }

    fn attribute(&self, node: usize, name: &str) -> Option<&str> {
        self.nodes[node].attributes.get(name).map(String::as_str)
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.nodes[node].parent
    }
}
