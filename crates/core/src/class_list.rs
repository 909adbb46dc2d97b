//! Ordered class-token set backing the reserved class attribute.
//!
//! A class list is always a derived view of a whitespace-separated string:
//! tokens are trimmed, empty tokens are dropped and a repeated token keeps
//! its first position.

use std::fmt;

use indexmap::IndexSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList {
    tokens: IndexSet<String>,
}

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whitespace-separated class string.
    pub fn parse(value: &str) -> Self {
        let mut list = Self::new();
        for token in value.split_whitespace() {
            list.push(token);
        }
        list
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Append `token` unless it is already present. Returns whether it was added.
    pub fn push(&mut self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() || self.tokens.contains(token) {
            return false;
        }
        self.tokens.insert(token.to_string())
    }

    /// Append every token in order, skipping ones already present.
    pub fn extend<'a, I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for token in tokens {
            self.push(token);
        }
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.tokens.retain(|t| keep(t));
    }

    /// Drop every token starting with `prefix`. Returns how many were removed.
    pub fn strip_prefix_tokens(&mut self, prefix: &str) -> usize {
        let before = self.tokens.len();
        self.retain(|t| !t.starts_with(prefix));
        before - self.tokens.len()
    }

    /// Subset test: every token in `required` is present here.
    pub fn is_superset_of<'a, I>(&self, required: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        required.into_iter().all(|t| self.contains(t))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Serialized attribute value, `None` when the list is empty.
    pub fn to_attr(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for ClassList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(token)?;
        }
        Ok(())
    }
}

impl<'a> FromIterator<&'a str> for ClassList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(list: &ClassList) -> Vec<&str> {
        list.iter().collect()
    }

    #[test]
    fn parse_trims_and_collapses() {
        let list = ClassList::parse("  one\ttwo \n one  three ");
        assert_eq!(tokens(&list), vec!["one", "two", "three"]);
    }

    #[test]
    fn parse_empty_string() {
        assert!(ClassList::parse("   ").is_empty());
        assert_eq!(ClassList::parse("").to_attr(), None);
    }

    #[test]
    fn push_skips_present_and_blank() {
        let mut list = ClassList::parse("a");
        assert!(!list.push("a"));
        assert!(!list.push("  "));
        assert!(list.push("b"));
        assert_eq!(list.to_attr().as_deref(), Some("a b"));
    }

    #[test]
    fn strip_prefix_tokens_drops_style_tokens() {
        let mut list = ClassList::parse("is-style-old custom is-style-other");
        assert_eq!(list.strip_prefix_tokens("is-style-"), 2);
        assert_eq!(tokens(&list), vec!["custom"]);
    }

    #[test]
    fn superset_check() {
        let list = ClassList::parse("highlighted wide dark");
        assert!(list.is_superset_of(["dark", "highlighted"]));
        assert!(!list.is_superset_of(["dark", "narrow"]));
        assert!(list.is_superset_of(std::iter::empty()));
    }

    #[test]
    fn collect_from_tokens() {
        let list: ClassList = ["x", "y", "x"].into_iter().collect();
        assert_eq!(list.to_string(), "x y");
    }
}
