//! collection of property tables (`key=value` lines and the path they came from)
//!
//! [PropertyStore] tracks
//! - the source path of every loaded table
//! - every property, with the index of the source that wrote it last
//!
//! Later tables overwrite earlier ones key for key. Once the load phase is over the store is
//! only ever read from, see [crate::resolver::Resolver].
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static PLATFORM_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(linux|windows|macos)$").unwrap());

#[derive(Default, Debug)]
pub struct PropertyStore {
    sources: Vec<Source>,
    properties: IndexMap<String, Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub value: String,
    pub source_index: usize,
}

impl PropertyStore {
    /// Inserts every property of a table, overwriting existing keys
    pub fn insert<K, V>(
        &mut self,
        table: impl IntoIterator<Item = (K, V)>,
        path: impl Into<Option<std::path::PathBuf>>,
    ) where
        K: Into<String>,
        V: Into<String>,
    {
        let source_index = self.sources.len();
        self.sources.push(path.into());

        for (key, value) in table {
            self.properties.insert(
                key.into(),
                Property {
                    value: value.into(),
                    source_index,
                },
            );
        }
    }

    /// Sets a single property
    ///
    /// The property is attributed to the most recent source, or to a new anonymous source if
    /// nothing has been loaded yet.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if self.sources.is_empty() {
            self.sources.push(None);
        }

        let source_index = self.sources.len() - 1;
        self.properties.insert(
            key.into(),
            Property {
                value: value.into(),
                source_index,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|property| property.value.as_str())
    }

    pub fn get_property(&self, key: &str) -> Option<(&Source, &Property)> {
        self.properties
            .get(key)
            .map(|property| (&self.sources[property.source_index], property))
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Source, &str)> {
        self.properties.iter().map(|(key, property)| {
            (
                key.as_str(),
                &self.sources[property.source_index],
                property.value.as_str(),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// All keys (with any platform suffix removed) matching `pattern`
    ///
    /// `foo.linux` and `foo` both collapse to `foo` and are reported once.
    pub fn keys_matching(&self, pattern: &Regex) -> IndexSet<String> {
        self.collapsed_keys()
            .filter(|key| pattern.is_match(key))
            .map(str::to_string)
            .collect()
    }

    /// Capture group `group` of every collapsed key matching `pattern`
    pub fn captures_matching(&self, pattern: &Regex, group: usize) -> IndexSet<String> {
        self.collapsed_keys()
            .filter_map(|key| pattern.captures(key))
            .filter_map(|captures| captures.get(group).map(|m| m.as_str().to_string()))
            .collect()
    }

    fn collapsed_keys(&self) -> impl Iterator<Item = &str> {
        self.properties
            .keys()
            .map(|key| strip_platform_suffix(key))
            .collect::<IndexSet<_>>()
            .into_iter()
    }

    /// Promote `<key>.<platform>` entries of the active platform onto `<key>`
    ///
    /// Must happen before resolution starts, the store is frozen afterwards.
    pub fn apply_platform(&mut self, platform: Platform) {
        let suffix = format!(".{}", platform.as_str());
        let promoted: Vec<(String, Property)> = self
            .properties
            .iter()
            .filter_map(|(key, property)| {
                key.strip_suffix(&suffix)
                    .map(|base| (base.to_string(), property.clone()))
            })
            .collect();

        for (key, property) in promoted {
            tracing::trace!(%key, platform = platform.as_str(), "platform specific override");
            self.properties.insert(key, property);
        }
    }
}

impl PropertyStore {
    pub fn load_file(&mut self, file_path: &Path) -> Result<(), LoadError> {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading file");

        let file_contents = std::fs::read_to_string(&file_path)?;
        self.insert(parse_table(&file_contents), Some(file_path));
        Ok(())
    }

    /// Loads every `*.txt` table in `dir_path`, in file name order
    pub fn load_directory(&mut self, dir_path: &Path) -> Result<(), LoadError> {
        let mut tables = vec![];

        for dir_entry in std::fs::read_dir(dir_path)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }

            let is_table = dir_entry.file_name().to_string_lossy().ends_with(".txt");
            if is_table {
                tables.push(dir_entry.path());
            }
        }

        if tables.is_empty() {
            return Err(LoadError::NoFilesFound);
        }

        tables.sort();
        for file_path in tables {
            self.load_file(&file_path)?;
        }

        Ok(())
    }
}

/// Parse a flat property table
///
/// One property per line, split on the first `=`. Blank lines, lines starting with `#` and
/// lines without `=` are skipped.
pub fn parse_table(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub fn strip_platform_suffix(key: &str) -> &str {
    match PLATFORM_SUFFIX.find(key) {
        Some(suffix) => &key[..suffix.start()],
        None => key,
    }
}

/// Operating system a platform specific property applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
    Macos,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else {
            Platform::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::Macos => "macos",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No property tables found in directory")]
    NoFilesFound,
    #[error("IO error")]
    IoError(#[from] std::io::Error),
}

impl From<&str> for PropertyStore {
    fn from(value: &str) -> Self {
        let mut store = PropertyStore::default();
        store.insert(parse_table(value), None);
        store
    }
}

/// Utility macro to create a [PropertyStore]
///
/// Create from a single table
/// ```
/// # use ardmk::property_store;
/// let store = property_store!("build.core=arduino");
/// assert_eq!(store.get("build.core"), Some("arduino"));
/// ```
///
/// Create from key/value pairs
/// ```
/// # use ardmk::property_store;
/// let store = property_store! {
///   "uno.build.core" => "arduino",
///   "recipe.ar.pattern" => "ar rcs {archive_file} {object_file}"
/// };
/// assert_eq!(store.len(), 2);
/// ```
#[macro_export]
macro_rules! property_store {
    // single table without source
    { $table:expr } => {
        $crate::property_store::PropertyStore::from($table)
    };
    // individual properties
    { $($key:expr => $value:expr),+ $(,)? } => {{
        let mut store = $crate::property_store::PropertyStore::default();
        $(
            store.set($key, $value);
        )+

        store
    }};
}

pub type Source = Option<std::path::PathBuf>;
