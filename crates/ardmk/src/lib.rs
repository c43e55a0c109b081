//! # ardmk - build plans from arduino style hardware definitions
//!
//! ## Introduction for developers
//!
//! Read this to understand how `ardmk` works internally.
//!
//! ### Property tables
//!
//! A hardware platform describes itself in flat `key=value` tables (`platform.txt`,
//! `boards.txt`, `programmers.txt`). Values may refer to other keys with `{key}` placeholders:
//!
//! ```text
//! # comments start with a hash
//! compiler.path={runtime.tools.avr-gcc.path}/bin/
//! compiler.c.cmd=avr-gcc
//! recipe.c.o.pattern="{compiler.path}{compiler.c.cmd}" -c {includes} "{source_file}" -o "{object_file}"
//!
//! uno.name=Arduino Uno
//! uno.build.core=arduino
//! ```
//!
//! ### Loading
//!
//! Tables are merged into a [property_store::PropertyStore] in a fixed order (runtime
//! properties, hardware tables, discovered tools, user overrides). The last table to define a
//! key wins. The store remembers the source of every key for diagnostics.
//!
//! Keys may carry a platform suffix (`tools.avrdude.cmd.windows`). The suffix of the active
//! platform is promoted onto the base key while loading
//! ([property_store::PropertyStore::apply_platform]); for enumeration every suffixed key
//! collapses onto its base name.
//!
//! Once loading is done the store is never written to again.
//!
//! ### Resolution
//!
//! see [resolver::Resolver::resolve]
//!
//! 1. Three **derived keys** (`build.core.path`, `build.variant.path`, `build.system.path`)
//!    are computed from `runtime.hardware.path` and the board's core/variant, no matter what
//!    the tables say about them.
//! 2. Everything else is looked up with **board scoping**: `<board>.<key>` is preferred over
//!    `<key>`. At both levels the call's extras shadow the store.
//! 3. Every `{key}` in the raw value is resolved the same way and substituted.
//!
//! A key that is seen again while it is still being resolved, or a chain deeper than
//! [resolver::MAX_DEPTH], is reported as an interpolation cycle.
//!
//! **Example** (board `uno`)
//!
//! | **key**              | **raw value**                   | **resolved**               |
//! |----------------------|---------------------------------|----------------------------|
//! | `uno.build.core`     | `arduino`                       | `arduino`                  |
//! | `build.core`         | -                               | `arduino`                  |
//! | `build.core.path`    | -                               | `<hardware>/cores/arduino` |
//! | `ide_version`        | `{runtime.ide.version}`         | `10611`                    |
//!
//! ### Recipes and rules
//!
//! [recipe] resolves the well known `recipe.*` keys with default extras that leave make
//! tokens (`$<`, `$@`, `$(INCLUDES)`) in place, and assembles the upload command from the
//! `tools.<upload.tool>.*` family. [rules] turns the compile recipes and a list of
//! source/object directory pairs into pattern rules.
//!
//! ### Output
//!
//! [project::Project::plan] collects everything into a [project::BuildPlan] which is
//! serialized via [serde]. Rendering an actual Makefile is left to the consumer.
//!
pub mod discovery;
pub mod project;
pub mod property_store;
pub mod recipe;
pub mod resolver;
pub mod rules;
mod template;
