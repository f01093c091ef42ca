//! CSS selector subset for the in-memory document
//!
//! Supported: type and universal selectors, `#id`, `.class`, `[attr]`, `[attr="value"]`,
//! `[attr~="word"]`, descendant and child (`>`) combinators, and comma-separated lists.

use crate::{Error, Result};

/// Read access to a tree the selector is matched against
pub trait SelectorTarget {
    fn tag(&self, node: usize) -> &str;
    fn attribute(&self, node: usize, name: &str) -> Option<&str>;
    fn parent(&self, node: usize) -> Option<usize>;
}

#[derive(Debug, Clone, PartialEq)]
enum AttrOp {
    Exists,
    Equals(String),
    Includes(String),
}

#[derive(Debug, Clone, PartialEq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches<T: SelectorTarget + ?Sized>(&self, target: &T, node: usize) -> bool {
        if let Some(tag) = &self.tag {
            if !target.tag(node).eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if target.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let classes = target.attribute(node, "class").unwrap_or("");
            if !self
                .classes
                .iter()
                .all(|wanted| classes.split_whitespace().any(|c| c == wanted))
            {
                return false;
            }
        }
        self.attrs.iter().all(|attr| {
            let value = target.attribute(node, &attr.name);
            match (&attr.op, value) {
                (_, None) => false,
                (AttrOp::Exists, Some(_)) => true,
                (AttrOp::Equals(expected), Some(v)) => v == expected,
                (AttrOp::Includes(word), Some(v)) => v.split_whitespace().any(|w| w == word),
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

/// One selector of a comma-separated list
#[derive(Debug, Clone, PartialEq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches<T: SelectorTarget + ?Sized>(&self, target: &T, node: usize) -> bool {
        self.matches_from(target, node, self.compounds.len() - 1)
    }

    fn matches_from<T: SelectorTarget + ?Sized>(&self, target: &T, node: usize, pos: usize) -> bool {
        if !self.compounds[pos].matches(target, node) {
            return false;
        }
        if pos == 0 {
            return true;
        }

        match self.combinators[pos - 1] {
            Combinator::Child => target
                .parent(node)
                .map_or(false, |parent| self.matches_from(target, parent, pos - 1)),
            Combinator::Descendant => {
                let mut ancestor = target.parent(node);
                while let Some(candidate) = ancestor {
                    if self.matches_from(target, candidate, pos - 1) {
                        return true;
                    }
                    ancestor = target.parent(candidate);
                }
                false
            }
        }
    }
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::script_execution_failed(format!("SyntaxError: '{}' is not a valid selector", input));

        let mut alternatives = Vec::new();
        for part in input.split(',') {
            let complex = Parser::new(part).parse_complex().ok_or_else(invalid)?;
            alternatives.push(complex);
        }
        Ok(Self { alternatives })
    }

    pub fn matches<T: SelectorTarget + ?Sized>(&self, target: &T, node: usize) -> bool {
        self.alternatives.iter().any(|c| c.matches(target, node))
    }
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.trim().chars().peekable(),
        }
    }

    fn parse_complex(&mut self) -> Option<Complex> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let saw_space = self.skip_whitespace();
            match self.chars.peek() {
                None => break,
                Some('>') => {
                    self.chars.next();
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                }
                Some(_) if saw_space => combinators.push(Combinator::Descendant),
                Some(_) => return None,
            }
            compounds.push(self.parse_compound()?);
        }

        Some(Complex { compounds, combinators })
    }

    fn parse_compound(&mut self) -> Option<Compound> {
        let mut compound = Compound::default();
        let mut universal = false;

        match self.chars.peek() {
            Some('*') => {
                self.chars.next();
                universal = true;
            }
            Some(c) if is_ident_char(*c) => compound.tag = Some(self.ident()?),
            _ => {}
        }

        loop {
            match self.chars.peek() {
                Some('#') => {
                    self.chars.next();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.chars.next();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.chars.next();
                    compound.attrs.push(self.attribute()?);
                }
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return None;
        }
        Some(compound)
    }

    fn attribute(&mut self) -> Option<AttrSelector> {
        self.skip_whitespace();
        let name = self.ident()?;
        self.skip_whitespace();

        let op = match self.chars.next()? {
            ']' => return Some(AttrSelector { name, op: AttrOp::Exists }),
            '=' => AttrOp::Equals(self.attribute_value()?),
            '~' => {
                if self.chars.next() != Some('=') {
                    return None;
                }
                AttrOp::Includes(self.attribute_value()?)
            }
            _ => return None,
        };

        self.skip_whitespace();
        match self.chars.next() {
            Some(']') => Some(AttrSelector { name, op }),
            _ => None,
        }
    }

    fn attribute_value(&mut self) -> Option<String> {
        self.skip_whitespace();
        match self.chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                self.chars.next();
                let mut value = String::new();
                loop {
                    match self.chars.next()? {
                        '\\' => value.push(self.chars.next()?),
                        c if c == quote => return Some(value),
                        c => value.push(c),
                    }
                }
            }
            _ => self.ident(),
        }
    }

    fn ident(&mut self) -> Option<String> {
        let mut ident = String::new();
        while let Some(c) = self.chars.peek() {
            if !is_ident_char(*c) {
                break;
            }
            ident.push(*c);
            self.chars.next();
        }
        (!ident.is_empty()).then_some(ident)
    }

    /// Returns whether any whitespace was skipped
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
            skipped = true;
        }
        skipped
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// html > body > div.column-container#layout > [div.column-strip, div.column-main > a[href]]
    struct Tree {
        tags: Vec<&'static str>,
        attrs: Vec<HashMap<&'static str, &'static str>>,
        parents: Vec<Option<usize>>,
    }

    impl SelectorTarget for Tree {
        fn tag(&self, node: usize) -> &str {
            self.tags[node]
        }

        fn attribute(&self, node: usize, name: &str) -> Option<&str> {
            self.attrs[node].get(name).copied()
        }

        fn parent(&self, node: usize) -> Option<usize> {
            self.parents[node]
        }
    }

    fn tree() -> Tree {
        Tree {
            tags: vec!["html", "body", "div", "div", "div", "a"],
            attrs: vec![
                HashMap::new(),
                HashMap::new(),
                HashMap::from([("class", "column-container wide"), ("id", "layout")]),
                HashMap::from([("class", "column-strip")]),
                HashMap::from([("class", "column-main")]),
                HashMap::from([("href", "/en-US/docs/Web/CSS"), ("rel", "next nofollow")]),
            ],
            parents: vec![None, Some(0), Some(1), Some(2), Some(2), Some(4)],
        }
    }

    fn matching(selector: &str) -> Vec<usize> {
        let tree = tree();
        let selector = Selector::parse(selector).unwrap();
        (0..tree.tags.len()).filter(|n| selector.matches(&tree, *n)).collect()
    }

    #[test]
    fn test_simple_selectors() {
        assert_eq!(matching("div"), vec![2, 3, 4]);
        assert_eq!(matching("#layout"), vec![2]);
        assert_eq!(matching(".column-container.wide"), vec![2]);
        assert_eq!(matching("a[href]"), vec![5]);
        assert_eq!(matching("[href=\"/en-US/docs/Web/CSS\"]"), vec![5]);
        assert_eq!(matching("a[rel~=next]"), vec![5]);
    }

    #[test]
    fn test_combinators() {
        assert_eq!(matching(".column-container a"), vec![5]);
        assert_eq!(matching(".column-container > a"), Vec::<usize>::new());
        assert_eq!(matching(".column-container > .column-main"), vec![4]);
        assert_eq!(matching("body>div>div"), vec![3, 4]);
    }

    #[test]
    fn test_selector_list() {
        assert_eq!(matching(".column-strip, .column-main"), vec![3, 4]);
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("div >").is_err());
        assert!(Selector::parse("[href").is_err());
        assert!(Selector::parse("a:hover").is_err());
    }
}
