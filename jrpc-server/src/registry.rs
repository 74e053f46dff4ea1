//! Method registry
//!
//! The registry maps method names to handlers and keeps, for each method, the
//! declared parameter names reported by introspection. Registration order is
//! preserved; registering a name again replaces the handler in place.
//!
//! # Registration
//!
//! A method is described by a [`MethodDefinition`]. It can be built by hand,
//! generated by the `#[method]` attribute macro (which takes the name and the
//! parameter names from the function signature), or converted from a tuple:
//!
//! - `(name, handler)`
//! - `(name, handler, params)`, where a parameter spelled `"...name"` is a
//!   rest parameter
//!
//! [`MethodRegistry::add_all`] validates every definition before touching the
//! registry, so a batch with one nameless definition registers nothing.
//!
//! # Introspection
//!
//! [`MethodRegistry::describe`] returns one [`MethodDescriptor`] per method.
//! The list is computed on first use and cached until the next registration.
//! It is served under the reserved method name [`DISCOVERY_METHOD`] unless a
//! user method with that name exists.
//!
//! # Examples
//!
//! ```rust
//! use jrpc_server::{from_fn, MethodDefinition, MethodRegistry};
//!
//! let mut registry = MethodRegistry::new();
//! registry
//!     .add(
//!         MethodDefinition::new("mirror", from_fn(|p| async move { Ok(p.into_value()) }))
//!             .param("first")
//!             .rest("others"),
//!     )
//!     .unwrap();
//!
//! let descriptors = registry.describe();
//! assert_eq!(descriptors[0].name, "mirror");
//! assert_eq!(descriptors[0].params, vec!["first", "...others"]);
//! ```

use crate::handler::Handler;
use jrpc_core::{Error, MethodDescriptor, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Reserved method name answering with the method descriptor list
pub const DISCOVERY_METHOD: &str = "rpc:api.description";

const REST_PREFIX: &str = "...";

/// A declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// A single named argument
    Fixed(String),
    /// Collects every remaining positional argument
    Rest(String),
}

impl Param {
    /// Parse a parameter name; a `...` prefix marks a rest parameter
    pub fn parse(name: &str) -> Self {
        match name.strip_prefix(REST_PREFIX) {
            Some(rest) => Param::Rest(rest.to_string()),
            None => Param::Fixed(name.to_string()),
        }
    }

    /// Bare parameter name
    pub fn name(&self) -> &str {
        match self {
            Param::Fixed(name) | Param::Rest(name) => name,
        }
    }

    /// Whether this is a rest parameter
    pub fn is_rest(&self) -> bool {
        matches!(self, Param::Rest(_))
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Fixed(name) => f.write_str(name),
            Param::Rest(name) => write!(f, "{}{}", REST_PREFIX, name),
        }
    }
}

/// A method ready to be registered: name, declared parameters and handler
#[derive(Clone)]
pub struct MethodDefinition {
    name: String,
    params: Vec<Param>,
    handler: Arc<dyn Handler>,
}

impl MethodDefinition {
    /// Definition without declared parameters
    pub fn new(name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Declare the next parameter
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::Fixed(name.into()));
        self
    }

    /// Declare the rest parameter
    pub fn rest(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param::Rest(name.into()));
        self
    }

    /// Declare parameters from their names (`"...name"` for a rest parameter)
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.params
            .extend(names.into_iter().map(|n| Param::parse(n.as_ref())));
        self
    }

    /// Use another name
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters
    pub fn declared_params(&self) -> &[Param] {
        &self.params
    }

    /// Shared handler
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Introspection entry for this method
    pub fn descriptor(&self) -> MethodDescriptor {
        MethodDescriptor::new(
            self.name.clone(),
            self.params.iter().map(ToString::to_string).collect(),
        )
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidArgument(
                "'name' must be specified for every method definition".to_string(),
            ));
        }
        let rest_position = self.params.iter().position(Param::is_rest);
        if let Some(position) = rest_position {
            if position + 1 != self.params.len() {
                return Err(Error::InvalidArgument(format!(
                    "rest parameter of '{}' must be declared last",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MethodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDefinition")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl<S, H> From<(S, H)> for MethodDefinition
where
    S: Into<String>,
    H: Handler + 'static,
{
    fn from((name, handler): (S, H)) -> Self {
        MethodDefinition::new(name, handler)
    }
}

impl<S, H, P> From<(S, H, Vec<P>)> for MethodDefinition
where
    S: Into<String>,
    H: Handler + 'static,
    P: AsRef<str>,
{
    fn from((name, handler, params): (S, H, Vec<P>)) -> Self {
        MethodDefinition::new(name, handler).params(params)
    }
}

/// Name to handler mapping with cached introspection
#[derive(Clone, Default)]
pub struct MethodRegistry {
    entries: Vec<MethodDefinition>,
    index: HashMap<String, usize>,
    descriptors: OnceLock<Vec<MethodDescriptor>>,
}

impl MethodRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one method
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` if the definition has no name or declares a
    /// rest parameter before another parameter. The registry is unchanged.
    pub fn add(&mut self, definition: impl Into<MethodDefinition>) -> Result<&mut Self> {
        let definition = definition.into();
        definition.validate()?;
        self.insert(definition);
        Ok(self)
    }

    /// Register a handler under `name`
    pub fn add_named(
        &mut self,
        name: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Result<&mut Self> {
        self.add(MethodDefinition::new(name, handler))
    }

    /// Register several methods, all or nothing
    pub fn add_all<I, D>(&mut self, definitions: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = D>,
        D: Into<MethodDefinition>,
    {
        let definitions: Vec<MethodDefinition> = definitions.into_iter().map(Into::into).collect();
        for definition in &definitions {
            definition.validate()?;
        }
        for definition in definitions {
            self.insert(definition);
        }
        Ok(self)
    }

    fn insert(&mut self, definition: MethodDefinition) {
        tracing::debug!(method = %definition.name, "Registering method");
        match self.index.get(&definition.name) {
            Some(&slot) => self.entries[slot] = definition,
            None => {
                self.index
                    .insert(definition.name.clone(), self.entries.len());
                self.entries.push(definition);
            }
        }
        self.descriptors = OnceLock::new();
    }

    /// Look up a user-registered method
    pub fn get(&self, name: &str) -> Option<&MethodDefinition> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    /// Whether a user method with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered method names, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.name.as_str())
    }

    /// Number of registered methods
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no method is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One descriptor per registered method, in registration order
    pub fn describe(&self) -> &[MethodDescriptor] {
        self.descriptors
            .get_or_init(|| self.entries.iter().map(MethodDefinition::descriptor).collect())
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.entries)
            .finish()
    }
}
