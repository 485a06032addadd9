//! Generic element tree produced by the parser.

/// A node inside an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data with entities already resolved.
    Text(String),
    /// Raw `<![CDATA[...]]>` section content.
    CData(String),
    /// Comment body without the `<!--`/`-->` delimiters.
    Comment(String),
}

impl Node {
    /// Return the nested element, if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Mutable variant of [`Node::as_element`].
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    fn is_structural(&self) -> bool {
        matches!(self, Node::Element(_) | Node::Comment(_))
    }
}

/// An XML element with its attributes kept apart from its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified tag name as written in the source.
    pub name: String,
    /// Attributes in source order, including `xmlns` declarations.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in source order.
    pub children: Vec<Node>,
}

impl Element {
    /// Empty element without attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute by its exact name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over the child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Iterate over the child elements named `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |child| child.name == name)
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|child| child.name == name)
    }

    /// Mutable variant of [`Element::child`].
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .filter_map(Node::as_element_mut)
            .find(|child| child.name == name)
    }

    /// Concatenated text and CDATA content of this element.
    ///
    /// Returns `None` when the element has structural children (elements or
    /// comments) and therefore no scalar value.
    pub fn text(&self) -> Option<String> {
        if self.has_structure() {
            return None;
        }
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(text) | Node::CData(text) => out.push_str(text),
                Node::Element(_) | Node::Comment(_) => {}
            }
        }
        Some(out)
    }

    /// Text of the child element `name`, trimmed.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .and_then(Element::text)
            .map(|text| text.trim().to_string())
    }

    /// True when at least one child is an element or a comment.
    pub fn has_structure(&self) -> bool {
        self.children.iter().any(Node::is_structural)
    }

    /// Normalise whitespace once the element is complete.
    ///
    /// Elements with structural children lose whitespace-only text nodes and
    /// get their remaining text trimmed; leaf elements are left verbatim.
    pub(crate) fn normalize_whitespace(&mut self) {
        if !self.has_structure() {
            return;
        }
        self.children.retain_mut(|child| match child {
            Node::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    false
                } else {
                    if trimmed.len() != text.len() {
                        *text = trimmed.to_string();
                    }
                    true
                }
            }
            _ => true,
        });
    }
}

/// A parsed Custom Object document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The `CustomObject` root element.
    pub root: Element,
}
