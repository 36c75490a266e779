//! Route trie
//!
//! Routes are `/`-delimited segment lists. A segment starting with `:` is a
//! parameter and captures whatever single input segment sits at that depth.
//! The trie is built during registration and only read afterwards.

#[cfg(test)]
mod proptests;

use crate::error::{Error, Result};
use crate::handler::BoxHandler;
use std::collections::HashMap;

/// Prefix marking a parameter segment
pub const PARAM_SIGIL: char = ':';

/// Split a route or input path into segments. Empty segments are dropped,
/// so `""` and `"/"` both name the root and `"a//b"` equals `"a/b"`.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Successful lookup
pub struct RouteMatch<'a> {
    pub handler: &'a BoxHandler,
    pub params: HashMap<String, String>,
}

impl std::fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// One segment level of the trie
#[derive(Default)]
pub struct RouteTree {
    handler: Option<BoxHandler>,
    literals: HashMap<String, RouteTree>,
    /// Parameter children in registration order, keyed by parameter name
    params: Vec<(String, RouteTree)>,
}

impl RouteTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `path`.
    ///
    /// Routes are compared by shape: literal segments must be equal and any
    /// two parameters are interchangeable. `users/:name` therefore collides
    /// with an existing `users/:id`, since lookup would always pick the
    /// first one. Collisions are a configuration error.
    pub fn insert(&mut self, path: &str, handler: BoxHandler) -> Result<()> {
        let segments = split_path(path);
        if segments.iter().any(|segment| *segment == ":") {
            return Err(Error::bad_request(
                "tree.insert",
                format!("parameter without a name in route {path:?}"),
            ));
        }
        if self.has_shape(&segments) {
            return Err(Error::duplicate(
                "tree.insert",
                format!("route {path:?} is already registered"),
            ));
        }

        let mut node = self;
        for segment in segments {
            node = match segment.strip_prefix(PARAM_SIGIL) {
                Some(name) => node.param_child(name),
                None => node.literals.entry(segment.to_string()).or_default(),
            };
        }
        node.handler = Some(handler);
        Ok(())
    }

    /// Whether a handler sits at the same shape as `segments`, whatever the
    /// parameter names
    fn has_shape(&self, segments: &[&str]) -> bool {
        let Some((head, rest)) = segments.split_first() else {
            return self.handler.is_some();
        };
        if head.starts_with(PARAM_SIGIL) {
            self.params.iter().any(|(_, child)| child.has_shape(rest))
        } else {
            self.literals
                .get(*head)
                .is_some_and(|child| child.has_shape(rest))
        }
    }

    fn param_child(&mut self, name: &str) -> &mut RouteTree {
        let index = match self.params.iter().position(|(existing, _)| existing == name) {
            Some(index) => index,
            None => {
                self.params.push((name.to_string(), RouteTree::new()));
                self.params.len() - 1
            }
        };
        &mut self.params[index].1
    }

    /// Resolve a full segment list. Every segment must be consumed and the
    /// final node must carry a handler.
    ///
    /// At each level the literal child is tried before parameter children,
    /// and parameter children are tried in registration order. Captures are
    /// collected on the way back up, so a branch that fails leaves nothing behind.
    pub fn find(&self, segments: &[&str]) -> Option<RouteMatch<'_>> {
        let Some((head, rest)) = segments.split_first() else {
            return self.handler.as_ref().map(|handler| RouteMatch {
                handler,
                params: HashMap::new(),
            });
        };

        if let Some(found) = self.literals.get(*head).and_then(|child| child.find(rest)) {
            return Some(found);
        }

        self.params.iter().find_map(|(name, child)| {
            let mut found = child.find(rest)?;
            found.params.insert(name.clone(), (*head).to_string());
            Some(found)
        })
    }

    /// Convenience over [`find`](Self::find) taking an unsplit path
    pub fn find_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.find(&split_path(path))
    }

    /// Whether a handler is registered under exactly this route
    /// (parameter names included)
    pub fn contains(&self, path: &str) -> bool {
        let mut node = self;
        for segment in split_path(path) {
            let next = match segment.strip_prefix(PARAM_SIGIL) {
                Some(name) => node
                    .params
                    .iter()
                    .find(|(existing, _)| existing == name)
                    .map(|(_, child)| child),
                None => node.literals.get(segment),
            };
            match next {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.handler.is_some()
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        usize::from(self.handler.is_some())
            + self.literals.values().map(RouteTree::len).sum::<usize>()
            + self.params.iter().map(|(_, child)| child.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
