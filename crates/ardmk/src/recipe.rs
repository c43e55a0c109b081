//! Named recipes: compile, archive, combine, extract and upload command lines
//!
//! Every recipe is resolved from a well known `recipe.*` (or `tools.*`) key with a set of
//! default extras. The defaults fill in placeholders such as `{source_file}` with make tokens
//! (`$<`, `$@`, ...) so the downstream build script decides the concrete file names.
use crate::extras;
use crate::resolver::{Extras, ResolveError, Resolver};
use regex::Regex;
use serde::Serialize;

/// Source language of a compile recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
    Asm,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Cpp, Language::Asm, Language::C];

    /// Name used in recipe keys and file extensions
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Asm => "S",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum RecipeKind {
    Compile(Language),
    Archive,
    Combine,
    Extract(String),
    Upload,
}

impl RecipeKind {
    /// Property key the recipe is resolved from
    ///
    /// The upload recipe depends on the active tool, see [Resolver::upload_recipe].
    pub fn key(&self) -> Option<String> {
        match self {
            RecipeKind::Compile(language) => Some(format!("recipe.{}.o.pattern", language.as_str())),
            RecipeKind::Archive => Some("recipe.ar.pattern".to_string()),
            RecipeKind::Combine => Some("recipe.c.combine.pattern".to_string()),
            RecipeKind::Extract(ext) => Some(format!("recipe.objcopy.{ext}.pattern")),
            RecipeKind::Upload => None,
        }
    }

    pub fn default_extras(&self) -> Extras {
        match self {
            RecipeKind::Compile(_) => extras! {
                "includes" => "$(INCLUDES)",
                "source_file" => "$<",
                "object_file" => "$@"
            },
            RecipeKind::Archive => extras! {
                "object_file" => "$$obj",
                "archive_file" => "core.a"
            },
            RecipeKind::Combine => extras! {
                "object_files" => "$^",
                "archive_file" => "core.a"
            },
            RecipeKind::Extract(_) | RecipeKind::Upload => extras! {},
        }
    }

    /// Output format of an extraction recipe
    pub fn extension(&self) -> Option<&str> {
        match self {
            RecipeKind::Extract(ext) => Some(ext),
            _ => None,
        }
    }
}

/// A resolved command line
///
/// Never mutated, recomputed from the store whenever it is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub kind: RecipeKind,
    pub command: String,
}

impl Recipe {
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }
}

impl<'s> Resolver<'s> {
    /// Resolve the recipe for `kind` with its default extras
    pub fn recipe(&self, kind: RecipeKind) -> Result<Recipe, ResolveError> {
        match kind {
            RecipeKind::Upload => self.upload_recipe(false),
            RecipeKind::Extract(ext) => self.extract_recipe(&ext),
            kind => {
                let defaults = kind.default_extras();
                self.recipe_with(kind, &defaults)
            }
        }
    }

    /// Resolve the recipe for `kind` with caller supplied extras
    ///
    /// For [RecipeKind::Upload] the caller's extras are layered over the tool properties, see
    /// [Resolver::upload_recipe_with].
    pub fn recipe_with(&self, kind: RecipeKind, extras: &Extras) -> Result<Recipe, ResolveError> {
        let Some(key) = kind.key() else {
            return self.upload_recipe_with(false, extras);
        };

        let command = self.resolve(&key, extras)?;
        Ok(Recipe { kind, command })
    }

    pub fn compile_recipe(&self, language: Language) -> Result<Recipe, ResolveError> {
        self.recipe(RecipeKind::Compile(language))
    }

    pub fn core_archive_recipe(&self) -> Result<Recipe, ResolveError> {
        self.recipe(RecipeKind::Archive)
    }

    pub fn combine_recipe(&self) -> Result<Recipe, ResolveError> {
        self.recipe(RecipeKind::Combine)
    }

    /// Object copy recipe for output format `ext`
    ///
    /// Not every board produces every format, a missing pattern yields an empty recipe.
    pub fn extract_recipe(&self, ext: &str) -> Result<Recipe, ResolveError> {
        let kind = RecipeKind::Extract(ext.to_string());
        let key = kind.key().unwrap_or_default();
        let command = self
            .resolve_optional(&key, &kind.default_extras())?
            .unwrap_or_default();

        if command.is_empty() {
            tracing::debug!(%ext, "no extraction recipe");
        }

        Ok(Recipe { kind, command })
    }

    /// Upload command of the tool named by `upload.tool`
    ///
    /// Every `tools.<tool>.<subkey>` property is made available to the pattern as `{<subkey>}`.
    /// `upload.verbose` and `upload.quiet` are set from the tool's `upload.params.*`, exactly
    /// one of them depending on `verbose`.
    pub fn upload_recipe(&self, verbose: bool) -> Result<Recipe, ResolveError> {
        self.upload_recipe_with(verbose, &extras! {})
    }

    /// [Resolver::upload_recipe] with `caller_extras` taking precedence over the tool's
    /// sub keys when the pattern is resolved
    ///
    /// Sub keys that only exist for another platform (`tools.<tool>.<subkey>.windows` on linux)
    /// have no base value and are skipped.
    pub fn upload_recipe_with(
        &self,
        verbose: bool,
        caller_extras: &Extras,
    ) -> Result<Recipe, ResolveError> {
        let tool = self.resolve("upload.tool", &extras! {})?;
        tracing::debug!(%tool, verbose, "resolving upload recipe");

        let verbose_params = format!("{{tools.{tool}.upload.params.verbose}}");
        let quiet_params = format!("{{tools.{tool}.upload.params.quiet}}");
        let mut extras = if verbose {
            extras! { "upload.verbose" => verbose_params, "upload.quiet" => "" }
        } else {
            extras! { "upload.verbose" => "", "upload.quiet" => quiet_params }
        };

        let tool_keys = Regex::new(&format!(r"^tools\.{}\.(.*)$", regex::escape(&tool)))
            .expect("escaped tool name is a valid pattern");

        for subkey in self.store().captures_matching(&tool_keys, 1) {
            if subkey == "upload.pattern" {
                continue;
            }

            let key = format!("tools.{tool}.{subkey}");
            let Some(value) = self.resolve_optional(&key, &extras)? else {
                tracing::debug!(%key, "tool property not defined for this platform");
                continue;
            };

            tracing::trace!(%subkey, %value, "tool property");
            extras.insert(subkey, value);
        }

        extras.extend(caller_extras.clone());

        let command = self.resolve(&format!("tools.{tool}.upload.pattern"), &extras)?;
        Ok(Recipe {
            kind: RecipeKind::Upload,
            command,
        })
    }
}
