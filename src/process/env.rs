/*!
 * Environment Overlays
 *
 * Per-process variable bindings that shadow the process-wide environment.
 * Lookups take the overlay explicitly; the real environment is only read,
 * never written, so concurrent logical processes cannot clobber each other.
 */

use serde::{Deserialize, Serialize};
use std::env;

/// Variable bindings owned by one logical process
///
/// Declaration order is kept so listings are stable. Setting a name that is
/// already bound replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvOverlay {
    vars: Vec<(String, String)>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `NAME=value` entries
    ///
    /// An entry without `=` binds the empty string; an empty name is skipped.
    pub fn from_envp<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overlay = Self::new();
        for entry in entries {
            let entry = entry.as_ref();
            let (name, value) = entry.split_once('=').unwrap_or((entry, ""));
            if !name.is_empty() {
                overlay.set(name, value);
            }
        }
        overlay
    }

    /// Bind `name`, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((name, value)),
        }
    }

    /// Builder-style [`set`](Self::set)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Value bound to exactly `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for EnvOverlay
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut overlay = Self::new();
        for (name, value) in iter {
            overlay.set(name, value);
        }
        overlay
    }
}

/// Resolve `name` through an optional overlay, then the process environment
pub fn lookup(overlay: Option<&EnvOverlay>, name: &str) -> Option<String> {
    if let Some(value) = overlay.and_then(|o| o.get(name)) {
        return Some(value.to_owned());
    }
    env::var_os(name).map(|v| v.to_string_lossy().into_owned())
}

/// Full environment as seen through an overlay
///
/// Process-wide variables come first, in their original order, with
/// overlay values substituted; overlay-only variables follow.
pub fn merged(overlay: Option<&EnvOverlay>) -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = env::vars_os()
        .map(|(n, v)| {
            (
                n.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        })
        .collect();

    if let Some(overlay) = overlay {
        for (name, value) in overlay.iter() {
            match vars.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = value.to_owned(),
                None => vars.push((name.to_owned(), value.to_owned())),
            }
        }
    }
    vars
}
