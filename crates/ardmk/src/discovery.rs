//! Locating installed hardware platforms, tools and libraries
//!
//! Layout of a package installation:
//!
//! ```text
//! <packages>/<vendor>/hardware/<arch>/<version>/{platform,boards,programmers}.txt
//! <packages>/<vendor>/tools/<name>/<version>/
//! ```
//!
//! Distribution packaged IDEs install the `arduino` vendor into a system root instead
//! (`/usr/share/arduino/hardware/<arch>`, without a version directory level of its own).
use std::path::{Path, PathBuf};

#[derive(derive_new::new, Debug, Clone, PartialEq)]
pub struct ToolchainRoots {
    /// Per user package directory, usually `~/.arduino15/packages`
    pub packages: PathBuf,
    /// System wide IDE installation, usually `/usr/share/arduino`
    pub system: PathBuf,
}

impl ToolchainRoots {
    pub fn from_home(home: &Path) -> Self {
        Self::new(
            home.join(".arduino15").join("packages"),
            PathBuf::from("/usr/share/arduino"),
        )
    }

    pub fn from_env() -> Option<Self> {
        std::env::var_os("HOME").map(|home| Self::from_home(Path::new(&home)))
    }
}

/// Newest installed version of the `vendor`/`arch` platform
///
/// Versions are ordered by directory name.
pub fn find_hardware_path(
    roots: &ToolchainRoots,
    vendor: &str,
    arch: &str,
) -> Result<PathBuf, DiscoveryError> {
    let mut hardware_root = roots.packages.join(vendor).join("hardware").join(arch);

    if !hardware_root.is_dir() && vendor == "arduino" {
        hardware_root = roots.system.join("hardware").join(arch);
    }

    if !hardware_root.is_dir() {
        return Err(DiscoveryError::HardwareRootNotFound {
            path: hardware_root,
        });
    }

    let mut versions = vec![];
    for dir_entry in std::fs::read_dir(&hardware_root)? {
        versions.push(dir_entry?.file_name());
    }
    versions.sort();

    let Some(version) = versions.pop() else {
        return Err(DiscoveryError::NoHardwareVersions {
            path: hardware_root,
        });
    };

    let hardware_path = hardware_root.join(version);
    tracing::info!(path=%hardware_path.display(), "found hardware");
    Ok(hardware_path)
}

/// Directories that may contain `tools/` and `libraries/`, most specific first
pub fn arduino_dirs(roots: &ToolchainRoots, hardware_path: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![hardware_path.to_path_buf()];
    if let Some(parent) = hardware_path.parent() {
        dirs.push(parent.to_path_buf());
    }
    dirs.push(roots.packages.join("arduino"));
    dirs.push(roots.system.clone());
    dirs
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

impl Tool {
    /// `runtime.tools.<name>.path` and `runtime.tools.<name>-<version>.path`
    pub fn properties(&self) -> [(String, String); 2] {
        let path = self.path.display().to_string();
        [
            (format!("runtime.tools.{}.path", self.name), path.clone()),
            (
                format!("runtime.tools.{}-{}.path", self.name, self.version),
                path,
            ),
        ]
    }
}

/// Every `<dir>/tools/<name>/<version>` directory
///
/// Tools are reported in `dirs` order, versions of one tool in ascending order, so loading the
/// properties in sequence leaves the newest version of the last directory as the unversioned
/// path.
pub fn discover_tools(dirs: &[PathBuf]) -> Result<Vec<Tool>, DiscoveryError> {
    let mut tools = vec![];

    for dir in dirs {
        let tools_dir = dir.join("tools");
        if !tools_dir.is_dir() {
            continue;
        }

        for name in sorted_subdirectories(&tools_dir)? {
            let tool_dir = tools_dir.join(&name);
            for version in sorted_subdirectories(&tool_dir)? {
                let path = tool_dir.join(&version);
                tracing::debug!(%name, %version, path=%path.display(), "found tool");
                tools.push(Tool {
                    name: name.clone(),
                    version,
                    path,
                });
            }
        }
    }

    Ok(tools)
}

fn sorted_subdirectories(dir: &Path) -> Result<Vec<String>, DiscoveryError> {
    let mut names = vec![];
    for dir_entry in std::fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        if dir_entry.file_type()?.is_dir() {
            names.push(dir_entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort();
    Ok(names)
}

/// `libraries/` of the platform, of every arduino dir, then the user supplied directories
pub fn library_directories(
    platform_path: &Path,
    arduino_dirs: &[PathBuf],
    user_dirs: &[PathBuf],
) -> Vec<PathBuf> {
    std::iter::once(platform_path)
        .chain(arduino_dirs.iter().map(PathBuf::as_path))
        .map(|dir| dir.join("libraries"))
        .chain(user_dirs.iter().cloned())
        .collect()
}

/// First `<dir>/<name>` directory in search order, made absolute
///
/// Relative search directories are taken relative to the working directory.
pub fn find_library(library_dirs: &[PathBuf], name: &str) -> Result<PathBuf, DiscoveryError> {
    let path = library_dirs
        .iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_dir())
        .ok_or_else(|| DiscoveryError::LibraryNotFound {
            name: name.to_string(),
        })?;

    Ok(std::path::absolute(path)?)
}

#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    #[error("Hardware folder not found: {}", path.display())]
    HardwareRootNotFound { path: PathBuf },
    #[error("No versions found in hardware root {}", path.display())]
    NoHardwareVersions { path: PathBuf },
    #[error("Library {name} not found")]
    LibraryNotFound { name: String },
    #[error("IO error")]
    IoError(#[from] std::io::Error),
}
