//! Element locators

use std::fmt;

/// How to find an element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    Id(String),
    Name(String),
    XPath(String),
}

impl Locator {
    pub fn css<S: Into<String>>(selector: S) -> Self {
        Locator::Css(selector.into())
    }

    pub fn id<S: Into<String>>(id: S) -> Self {
        Locator::Id(id.into())
    }

    pub fn name<S: Into<String>>(name: S) -> Self {
        Locator::Name(name.into())
    }

    pub fn xpath<S: Into<String>>(xpath: S) -> Self {
        Locator::XPath(xpath.into())
    }

    /// Equivalent CSS selector; `None` for XPath
    pub fn as_css(&self) -> Option<String> {
        match self {
            Locator::Css(selector) => Some(selector.clone()),
            Locator::Id(id) if is_css_ident(id) => Some(format!("#{}", id)),
            Locator::Id(id) => Some(format!("[id=\"{}\"]", escape_attribute(id))),
            Locator::Name(name) => Some(format!("[name=\"{}\"]", escape_attribute(name))),
            Locator::XPath(_) => None,
        }
    }
}

fn is_css_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn escape_attribute(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css selector '{}'", s),
            Locator::Id(s) => write!(f, "id '{}'", s),
            Locator::Name(s) => write!(f, "name '{}'", s),
            Locator::XPath(s) => write!(f, "xpath '{}'", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_css() {
        assert_eq!(Locator::id("main-q").as_css().as_deref(), Some("#main-q"));
        assert_eq!(Locator::id("1st").as_css().as_deref(), Some("[id=\"1st\"]"));
        assert_eq!(Locator::name("q").as_css().as_deref(), Some("[name=\"q\"]"));
        assert_eq!(Locator::xpath("//a").as_css(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Locator::css(".result-list-item").to_string(), "css selector '.result-list-item'");
    }
}
