/*!
 * Builtins
 *
 * Registry of utilities the runner executes as in-process routines. A name
 * with no registered routine resolves to an external program.
 */

mod utilities;

pub use utilities::{echo, false_, printenv, true_};

use crate::process::{EntryPoint, ProcessContext, Routine};
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

/// Name to routine table
#[derive(Clone, Default)]
pub struct Builtins {
    routines: AHashMap<String, Routine>,
}

impl Builtins {
    /// Empty registry; every utility runs as an external program
    pub fn new() -> Self {
        Self::default()
    }

    /// `echo`, `printenv`, `true` and `false`
    pub fn standard() -> Self {
        let mut builtins = Self::new();
        builtins.register("echo", echo);
        builtins.register("printenv", printenv);
        builtins.register("true", true_);
        builtins.register("false", false_);
        builtins
    }

    /// Register (or replace) a routine under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, routine: F) -> &mut Self
    where
        F: Fn(&mut ProcessContext) -> i32 + Send + Sync + 'static,
    {
        self.routines.insert(name.into(), Arc::new(routine));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Routine> {
        self.routines.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routines.contains_key(name)
    }

    /// Entry point for `name`: the registered routine, else the program
    pub fn resolve(&self, name: &str) -> EntryPoint {
        match self.get(name) {
            Some(routine) => EntryPoint::Routine(Arc::clone(routine)),
            None => EntryPoint::Program(name.to_owned()),
        }
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Builtins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtins")
            .field("routines", &self.names())
            .finish()
    }
}
