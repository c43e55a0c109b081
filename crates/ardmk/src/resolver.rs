//! Board aware `{key}` interpolation over a frozen [PropertyStore]
use crate::property_store::PropertyStore;
use crate::template;
use std::path::Path;

/// Expansion deeper than this is treated as a cycle
pub const MAX_DEPTH: usize = 64;

/// Call scoped substitutions that take precedence over the store
pub type Extras = indexmap::IndexMap<String, String>;

/// Keys whose value is computed from other keys instead of being looked up
///
/// These are intercepted before any lookup, a literal entry in the store is never used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKey<'k> {
    /// `build.core.path` = `{runtime.hardware.path}/cores/{build.core}`
    CorePath,
    /// `build.variant.path` = `{runtime.hardware.path}/variants/{build.variant}`
    VariantPath,
    /// `build.system.path` = `{runtime.hardware.path}/system`
    SystemPath,
    Plain(&'k str),
}

impl<'k> From<&'k str> for DerivedKey<'k> {
    fn from(key: &'k str) -> Self {
        match key {
            "build.core.path" => DerivedKey::CorePath,
            "build.variant.path" => DerivedKey::VariantPath,
            "build.system.path" => DerivedKey::SystemPath,
            _ => DerivedKey::Plain(key),
        }
    }
}

/// Resolves keys against one store for one board
#[derive(derive_new::new, Debug, Clone, Copy)]
pub struct Resolver<'s> {
    store: &'s PropertyStore,
    board: &'s str,
}

impl<'s> Resolver<'s> {
    pub fn store(&self) -> &'s PropertyStore {
        self.store
    }

    /// Fully expanded value of `key`
    pub fn resolve(&self, key: &str, extras: &Extras) -> Result<String, ResolveError> {
        self.resolve_in(key, extras, &mut vec![])
    }

    /// Like [Resolver::resolve] but `Ok(None)` when `key` is not defined at all
    ///
    /// A key that exists but references something undefined is still an error.
    pub fn resolve_optional(
        &self,
        key: &str,
        extras: &Extras,
    ) -> Result<Option<String>, ResolveError> {
        if let DerivedKey::Plain(key) = DerivedKey::from(key) {
            if self.resolve_with_fallback(key, extras).is_none() {
                tracing::debug!(%key, "optional key not defined");
                return Ok(None);
            }
        }

        self.resolve(key, extras).map(Some)
    }

    /// Expand every placeholder in `raw`
    pub fn expand(&self, raw: &str, extras: &Extras) -> Result<String, ResolveError> {
        self.expand_in(raw, extras, &mut vec![])
    }

    /// Raw (unexpanded) value of `key`, preferring `<board>.<key>`
    ///
    /// At each level `extras` shadow the store.
    pub fn resolve_with_fallback<'a>(&'a self, key: &str, extras: &'a Extras) -> Option<&'a str> {
        if !self.board.is_empty() {
            let is_scoped = key
                .strip_prefix(self.board)
                .is_some_and(|rest| rest.starts_with('.'));

            if !is_scoped {
                let scoped_key = format!("{}.{}", self.board, key);
                if let Some(value) = self.lookup(&scoped_key, extras) {
                    tracing::trace!(%key, %scoped_key, "board specific value");
                    return Some(value);
                }
            }
        }

        self.lookup(key, extras)
    }

    fn lookup<'a>(&'a self, key: &str, extras: &'a Extras) -> Option<&'a str> {
        extras
            .get(key)
            .map(String::as_str)
            .or_else(|| self.store.get(key))
    }

    #[tracing::instrument(level = "trace", skip_all, fields(key = %key))]
    fn resolve_in(
        &self,
        key: &str,
        extras: &Extras,
        stack: &mut Vec<String>,
    ) -> Result<String, ResolveError> {
        // resolution is pure, seeing the same key again means we would never finish
        if stack.iter().any(|entry| entry == key) || stack.len() >= MAX_DEPTH {
            let mut chain = stack.clone();
            chain.push(key.to_string());
            return Err(ResolveError::InterpolationCycle { chain });
        }

        stack.push(key.to_string());
        let result = self.resolve_key(key, extras, stack);
        stack.pop();

        result
    }

    fn resolve_key(
        &self,
        key: &str,
        extras: &Extras,
        stack: &mut Vec<String>,
    ) -> Result<String, ResolveError> {
        match DerivedKey::from(key) {
            DerivedKey::CorePath => {
                let hardware = self.resolve_in("runtime.hardware.path", extras, stack)?;
                let core = self.resolve_in("build.core", extras, stack)?;
                Ok(join(&hardware, &["cores", &core]))
            }
            DerivedKey::VariantPath => {
                let hardware = self.resolve_in("runtime.hardware.path", extras, stack)?;
                let variant = self.resolve_in("build.variant", extras, stack)?;
                Ok(join(&hardware, &["variants", &variant]))
            }
            DerivedKey::SystemPath => {
                let hardware = self.resolve_in("runtime.hardware.path", extras, stack)?;
                Ok(join(&hardware, &["system"]))
            }
            DerivedKey::Plain(key) => {
                let Some(raw) = self.resolve_with_fallback(key, extras) else {
                    return Err(ResolveError::UnresolvedKey {
                        key: key.to_string(),
                    });
                };

                tracing::trace!(%key, %raw, "expanding");
                self.expand_in(raw, extras, stack)
            }
        }
    }

    fn expand_in(
        &self,
        raw: &str,
        extras: &Extras,
        stack: &mut Vec<String>,
    ) -> Result<String, ResolveError> {
        template::substitute(raw, |key| self.resolve_in(key, extras, stack))
    }
}

fn join(base: &str, parts: &[&str]) -> String {
    let mut path = Path::new(base).to_path_buf();
    for part in parts {
        path.push(part);
    }
    path.display().to_string()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("Key {key} not found in properties")]
    UnresolvedKey { key: String },
    #[error("Interpolation cycle: {}", chain.join(" -> "))]
    InterpolationCycle { chain: Vec<String> },
}

/// Utility macro to create [Extras]
///
/// ```
/// # use ardmk::extras;
/// let extras = extras! {
///   "source_file" => "$<",
///   "object_file" => "$@"
/// };
/// assert_eq!(extras["object_file"], "$@");
/// ```
#[macro_export]
macro_rules! extras {
    {} => {
        $crate::resolver::Extras::new()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {{
        let mut extras = $crate::resolver::Extras::new();
        $(
            extras.insert($key.to_string(), $value.to_string());
        )+

        extras
    }};
}
