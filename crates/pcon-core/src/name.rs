//! Hierarchical NDN-style names.
//!
//! A name is an ordered list of components. Prefixes of a name are names
//! themselves, which is what the FIB, PIT and measurement tables key on.
//! Sequence numbers are carried as a trailing decimal component.

use std::fmt;

/// A hierarchical name such as `/video/segment/4`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    components: Vec<String>,
}

impl Name {
    /// The empty (root) name, `/`.
    pub fn root() -> Self {
        Name { components: Vec::new() }
    }

    /// Parse a name from a URI such as `/a/b/c` or `ndn:/a/b/c`.
    ///
    /// Empty path segments are ignored, so `//a//b/` parses the same as `/a/b`.
    pub fn from_uri(uri: &str) -> Self {
        let path = uri.strip_prefix("ndn:").unwrap_or(uri);
        Name {
            components: path
                .split('/')
                .filter(|c| !c.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component at position `i`, if present.
    pub fn component(&self, i: usize) -> Option<&str> {
        self.components.get(i).map(String::as_str)
    }

    /// Returns a new name with `component` appended.
    pub fn child(&self, component: impl Into<String>) -> Self {
        let mut components = self.components.clone();
        components.push(component.into());
        Name { components }
    }

    /// Returns a new name with `seq` appended as the final component.
    pub fn with_sequence(&self, seq: u64) -> Self {
        self.child(seq.to_string())
    }

    /// Reads the final component back as a sequence number.
    pub fn sequence(&self) -> Option<u64> {
        self.components.last()?.parse().ok()
    }

    /// True if `self` is a (non-strict) prefix of `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.len() <= other.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| a == b)
    }

    /// All prefixes of this name, longest first, ending with the root name.
    pub fn prefixes(&self) -> impl Iterator<Item = Name> + '_ {
        (0..=self.len()).rev().map(move |n| Name {
            components: self.components[..n].to_vec(),
        })
    }

    /// Approximate wire size of the name, for queue byte accounting.
    pub fn encoded_len(&self) -> usize {
        2 + self
            .components
            .iter()
            .map(|c| c.len() + 2)
            .sum::<usize>()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for c in &self.components {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl From<&str> for Name {
    fn from(uri: &str) -> Self {
        Name::from_uri(uri)
    }
}
