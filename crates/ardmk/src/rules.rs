//! Build rules handed to the build script emitter
use crate::property_store::PropertyStore;
use crate::recipe::{Language, Recipe};
use crate::resolver::{ResolveError, Resolver};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static OBJCOPY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^recipe\.objcopy\.([a-zA-Z0-9_-]+)\.pattern$").unwrap());

/// Source directory to object directory, in insertion order
pub type DirectoryMappings = IndexMap<String, String>;

/// One pattern rule: build `target` from `source` by running `recipe`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRule {
    pub target: String,
    pub source: String,
    pub recipe: String,
}

/// The compile recipe of each language
#[derive(Debug, Clone)]
pub struct CompileRecipes {
    recipes: IndexMap<Language, Recipe>,
}

impl CompileRecipes {
    pub fn resolve(resolver: &Resolver) -> Result<Self, ResolveError> {
        let recipes = Language::ALL
            .into_iter()
            .map(|language| {
                resolver
                    .compile_recipe(language)
                    .map(|recipe| (language, recipe))
            })
            .collect::<Result<_, ResolveError>>()?;

        Ok(Self { recipes })
    }

    pub fn get(&self, language: Language) -> Option<&Recipe> {
        self.recipes.get(&language)
    }
}

impl FromIterator<(Language, Recipe)> for CompileRecipes {
    fn from_iter<T: IntoIterator<Item = (Language, Recipe)>>(iter: T) -> Self {
        Self {
            recipes: iter.into_iter().collect(),
        }
    }
}

/// Output formats (`hex`, `eep`, `bin`, ...) the platform knows an objcopy recipe for
pub fn discover_extraction_extensions(store: &PropertyStore) -> IndexSet<String> {
    store.captures_matching(&OBJCOPY_PATTERN, 1)
}

/// One rule per mapping and language, mappings in insertion order
///
/// Languages without a recipe are skipped. `extra_flags` is appended to every command
/// verbatim.
pub fn enumerate_rules(
    mappings: &DirectoryMappings,
    recipes: &CompileRecipes,
    extra_flags: &str,
) -> Vec<BuildRule> {
    let mut rules = vec![];

    for (source_dir, object_dir) in mappings {
        for language in Language::ALL {
            let Some(recipe) = recipes.get(language) else {
                continue;
            };

            let ext = language.as_str();
            rules.push(BuildRule {
                target: format!("{object_dir}/%.{ext}.o"),
                source: format!("{source_dir}/%.{ext}"),
                recipe: with_flags(&recipe.command, extra_flags),
            });
        }
    }

    rules
}

/// `$(OBJDIR)/<project>.<ext>` from the linked elf, one per non-empty extraction recipe
pub fn enumerate_extraction_rules(
    project_name: &str,
    extractions: &[Recipe],
) -> Vec<BuildRule> {
    extractions
        .iter()
        .filter(|recipe| !recipe.is_empty())
        .filter_map(|recipe| {
            let ext = recipe.kind.extension()?;
            Some(BuildRule {
                target: format!("$(OBJDIR)/{project_name}.{ext}"),
                source: format!("$(OBJS) $(OBJDIR)/{project_name}.elf"),
                recipe: recipe.command.clone(),
            })
        })
        .collect()
}

fn with_flags(command: &str, extra_flags: &str) -> String {
    if extra_flags.is_empty() {
        command.to_string()
    } else {
        format!("{command} {extra_flags}")
    }
}
