//! One generation run: seed and load the [PropertyStore], then resolve a [BuildPlan]
use crate::discovery::{self, DiscoveryError, Tool, ToolchainRoots};
use crate::extras;
use crate::property_store::{LoadError, Platform, PropertyStore};
use crate::resolver::{ResolveError, Resolver};
use crate::rules::{self, BuildRule, CompileRecipes, DirectoryMappings};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const IDE_VERSION: &str = "10611";

/// Tables read from the hardware path, in load order
const HARDWARE_TABLES: [(&str, bool); 3] = [
    ("platform.txt", true),
    ("boards.txt", false),
    ("programmers.txt", false),
];

/// Selector context and paths of the project being built
#[derive(Debug, Clone)]
pub struct Project {
    pub board: String,
    pub vendor: String,
    pub arch: String,
    /// Absolute root of the sketch
    pub root_dir: PathBuf,
    pub name: Option<String>,
    /// Relative to `root_dir` unless absolute
    pub source_dir: PathBuf,
    /// Relative to `root_dir` unless absolute
    pub build_dir: PathBuf,
    pub libraries: Vec<String>,
    pub library_directories: Vec<PathBuf>,
    pub verbose: bool,
    /// Appended verbatim to every compile command
    pub compile_flags: String,
    pub serial_port: String,
    /// User supplied properties, loaded last
    pub overrides: Vec<(String, String)>,
    pub platform: Platform,
}

/// Where the selected platform is installed
#[derive(Debug, Clone)]
pub struct Installation {
    /// Version specific install root, also used as `runtime.hardware.path`
    pub hardware_path: PathBuf,
    pub arduino_dirs: Vec<PathBuf>,
    pub tools: Vec<Tool>,
}

impl Installation {
    pub fn discover(
        roots: &ToolchainRoots,
        vendor: &str,
        arch: &str,
    ) -> Result<Self, DiscoveryError> {
        let hardware_path = discovery::find_hardware_path(roots, vendor, arch)?;
        let arduino_dirs = discovery::arduino_dirs(roots, &hardware_path);
        let tools = discovery::discover_tools(&arduino_dirs)?;

        Ok(Self {
            hardware_path,
            arduino_dirs,
            tools,
        })
    }
}

/// Everything a build script emitter needs, fully resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildPlan {
    pub project_name: String,
    pub board: String,
    pub source_dir: String,
    pub build_dir: String,
    pub core_path: String,
    pub variant_path: String,
    pub include_paths: Vec<String>,
    pub library_dirs: Vec<String>,
    pub verbose: bool,
    pub compile_flags: String,
    pub archive: String,
    pub combine: String,
    pub upload: String,
    pub extract_extensions: Vec<String>,
    pub extractions: Vec<BuildRule>,
    pub compile_rules: Vec<BuildRule>,
}

impl Project {
    pub fn project_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.root_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    pub fn source_path(&self) -> PathBuf {
        self.root_dir.join(&self.source_dir)
    }

    pub fn build_path(&self) -> PathBuf {
        self.root_dir.join(&self.build_dir)
    }

    /// Discover the installation, load it and resolve the plan
    pub fn generate(&self, roots: &ToolchainRoots) -> Result<BuildPlan, GenerateError> {
        let installation = Installation::discover(roots, &self.vendor, &self.arch)?;
        let store = self.load(&installation)?;
        self.plan(&store, &installation)
    }

    /// Build the property store for this project
    ///
    /// Load order (later wins): runtime properties, hardware tables, tool paths, user
    /// overrides. Platform specific keys are promoted right before the user overrides.
    pub fn load(&self, installation: &Installation) -> Result<PropertyStore, GenerateError> {
        let mut store = PropertyStore::default();
        store.insert(self.runtime_properties(installation), None);

        for (file_name, required) in HARDWARE_TABLES {
            let path = installation.hardware_path.join(file_name);
            if !required && !path.is_file() {
                tracing::debug!(path=%path.display(), "optional table not found");
                continue;
            }

            store.load_file(&path)?;
        }

        store.insert(
            installation.tools.iter().flat_map(Tool::properties),
            None,
        );

        store.apply_platform(self.platform);

        if !self.overrides.is_empty() {
            store.insert(self.overrides.iter().cloned(), None);
        }

        tracing::info!(properties = store.len(), sources = store.source_count(), "store loaded");

        Ok(store)
    }

    fn runtime_properties(&self, installation: &Installation) -> Vec<(String, String)> {
        let hardware_path = installation.hardware_path.display().to_string();
        let ide_path = installation
            .arduino_dirs
            .last()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();
        let serial_port_file = Path::new(&self.serial_port)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        vec![
            ("runtime.platform.path".into(), hardware_path.clone()),
            ("runtime.hardware.path".into(), hardware_path),
            ("runtime.ide.path".into(), ide_path),
            ("runtime.ide.version".into(), IDE_VERSION.into()),
            ("runtime.os".into(), self.platform.to_string()),
            ("ide_version".into(), "{runtime.ide.version}".into()),
            ("build.path".into(), self.build_path().display().to_string()),
            ("build.project_name".into(), self.project_name()),
            ("build.arch".into(), self.arch.to_uppercase()),
            ("serial.port".into(), self.serial_port.clone()),
            ("serial.port.file".into(), serial_port_file),
        ]
    }

    /// Resolve every recipe and rule against a loaded store
    pub fn plan(
        &self,
        store: &PropertyStore,
        installation: &Installation,
    ) -> Result<BuildPlan, GenerateError> {
        let resolver = Resolver::new(store, &self.board);
        let no_extras = extras! {};

        let platform_path = resolver.resolve("runtime.platform.path", &no_extras)?;
        let library_dirs = discovery::library_directories(
            Path::new(&platform_path),
            &installation.arduino_dirs,
            &self.library_directories,
        );
        let lib_dirs = self
            .libraries
            .iter()
            .map(|library| discovery::find_library(&library_dirs, library))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>();

        let core_path = resolver.resolve("build.core.path", &no_extras)?;
        let variant_path = resolver.resolve("build.variant.path", &no_extras)?;
        let system_path = resolver.resolve("build.system.path", &no_extras)?;

        let mut include_paths = vec![core_path.clone(), variant_path.clone(), system_path];
        include_paths.extend(lib_dirs.iter().cloned());

        let mut mappings = DirectoryMappings::new();
        mappings.insert("$(SRCDIR)".into(), "$(OBJDIR)".into());
        mappings.insert("$(CORE_PATH)".into(), "$(OBJDIR)/core".into());
        mappings.insert("$(VARIANT_PATH)".into(), "$(OBJDIR)/core".into());
        for lib_dir in &lib_dirs {
            mappings.insert(lib_dir.clone(), "$(OBJDIR)/libs".into());
        }

        let compile_recipes = CompileRecipes::resolve(&resolver)?;
        let compile_rules = rules::enumerate_rules(&mappings, &compile_recipes, &self.compile_flags);

        let project_name = self.project_name();
        let mut extraction_recipes = vec![];
        for ext in rules::discover_extraction_extensions(store) {
            let recipe = resolver.extract_recipe(&ext)?;
            if !recipe.is_empty() {
                extraction_recipes.push(recipe);
            }
        }
        let extract_extensions: Vec<String> = extraction_recipes
            .iter()
            .filter_map(|recipe| recipe.kind.extension())
            .map(str::to_string)
            .collect();
        let extractions = rules::enumerate_extraction_rules(&project_name, &extraction_recipes);

        Ok(BuildPlan {
            board: self.board.clone(),
            source_dir: self.source_path().display().to_string(),
            build_dir: self.build_path().display().to_string(),
            core_path,
            variant_path,
            include_paths,
            library_dirs: lib_dirs,
            verbose: self.verbose,
            compile_flags: self.compile_flags.clone(),
            archive: resolver.core_archive_recipe()?.command,
            combine: resolver.combine_recipe()?.command,
            upload: resolver.upload_recipe(self.verbose)?.command,
            extract_extensions,
            extractions,
            compile_rules,
            project_name,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GenerateError {
    #[error("Unable to load property tables")]
    Load(#[from] LoadError),
    #[error("Toolchain discovery failed")]
    Discovery(#[from] DiscoveryError),
    #[error("Unable to resolve build plan")]
    Resolve(#[from] ResolveError),
}
