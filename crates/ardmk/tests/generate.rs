//! End to end tests
//!
//! Lays out a package installation in a temporary directory using the tables in
//! /tests/fixtures/avr/ and resolves complete build plans against it.
use ardmk::discovery::{DiscoveryError, ToolchainRoots};
use ardmk::project::{BuildPlan, GenerateError, Project};
use ardmk::property_store::Platform;
use ardmk::resolver::ResolveError;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

struct Installation {
    tmp: tempfile::TempDir,
    hardware: PathBuf,
    roots: ToolchainRoots,
}

impl Installation {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let packages = tmp.path().join("packages");
        let hardware = packages.join("arduino/hardware/avr/1.8.6");

        for dir in [
            hardware.join("libraries/SPI"),
            packages.join("arduino/hardware/avr/1.6.0"),
            packages.join("arduino/tools/avr-gcc/7.3.0"),
            packages.join("arduino/tools/avrdude/6.3.0"),
        ] {
            std::fs::create_dir_all(dir).unwrap();
        }

        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/avr");
        for table in ["platform.txt", "boards.txt"] {
            std::fs::copy(fixtures.join(table), hardware.join(table)).unwrap();
        }

        let roots = ToolchainRoots::new(packages, tmp.path().join("system"));
        Self {
            tmp,
            hardware,
            roots,
        }
    }

    /// Add lines to the end of the installed platform.txt
    fn append_platform(&self, lines: &str) {
        use std::io::Write;
        let mut platform = std::fs::OpenOptions::new()
            .append(true)
            .open(self.hardware.join("platform.txt"))
            .unwrap();
        writeln!(platform, "{lines}").unwrap();
    }

    fn generate(&self, project: &Project) -> Result<BuildPlan, GenerateError> {
        project.generate(&self.roots)
    }

    /// Replace the temporary directory so values are stable
    fn scrub(&self, value: &str) -> String {
        value.replace(&self.tmp.path().display().to_string(), "<tmp>")
    }
}

fn project(board: &str) -> Project {
    Project {
        board: board.into(),
        vendor: "arduino".into(),
        arch: "avr".into(),
        root_dir: PathBuf::from("/work/blink"),
        name: None,
        source_dir: "src".into(),
        build_dir: "build".into(),
        libraries: vec![],
        library_directories: vec![],
        verbose: false,
        compile_flags: String::new(),
        serial_port: "/dev/ttyACM0".into(),
        overrides: vec![],
        platform: Platform::Linux,
    }
}

#[test]
fn uno_recipes() {
    let installation = Installation::new();
    let plan = installation.generate(&project("uno")).unwrap();

    insta::assert_snapshot!(
        installation.scrub(&plan.archive),
        @r#""<tmp>/packages/arduino/tools/avr-gcc/7.3.0/bin/avr-gcc-ar" rcs "/work/blink/build/core.a" "$$obj""#
    );
    insta::assert_snapshot!(
        installation.scrub(&plan.combine),
        @r#""<tmp>/packages/arduino/tools/avr-gcc/7.3.0/bin/avr-gcc" -Os -mmcu=atmega328p -o "/work/blink/build/blink.elf" $^ "/work/blink/build/core.a" -lm"#
    );
    insta::assert_snapshot!(
        installation.scrub(&plan.upload),
        @r#""<tmp>/packages/arduino/tools/avrdude/6.3.0/bin/avrdude" "-C<tmp>/packages/arduino/tools/avrdude/6.3.0/etc/avrdude.conf" -q -q -patmega328p -carduino -P/dev/ttyACM0 -b115200 -D "-Uflash:w:/work/blink/build/blink.hex:i""#
    );

    assert_eq!(
        installation.scrub(&plan.core_path),
        "<tmp>/packages/arduino/hardware/avr/1.8.6/cores/arduino"
    );
    assert_eq!(
        installation.scrub(&plan.variant_path),
        "<tmp>/packages/arduino/hardware/avr/1.8.6/variants/standard"
    );
    assert_eq!(plan.project_name, "blink");
    assert_eq!(plan.source_dir, "/work/blink/src");
    assert_eq!(plan.build_dir, "/work/blink/build");
}

#[test]
fn uno_compile_rules() {
    let installation = Installation::new();
    let plan = installation.generate(&project("uno")).unwrap();

    let targets: Vec<_> = plan
        .compile_rules
        .iter()
        .map(|rule| format!("{} <- {}", rule.target, rule.source))
        .collect();
    assert_eq!(
        targets,
        vec![
            "$(OBJDIR)/%.cpp.o <- $(SRCDIR)/%.cpp",
            "$(OBJDIR)/%.S.o <- $(SRCDIR)/%.S",
            "$(OBJDIR)/%.c.o <- $(SRCDIR)/%.c",
            "$(OBJDIR)/core/%.cpp.o <- $(CORE_PATH)/%.cpp",
            "$(OBJDIR)/core/%.S.o <- $(CORE_PATH)/%.S",
            "$(OBJDIR)/core/%.c.o <- $(CORE_PATH)/%.c",
            "$(OBJDIR)/core/%.cpp.o <- $(VARIANT_PATH)/%.cpp",
            "$(OBJDIR)/core/%.S.o <- $(VARIANT_PATH)/%.S",
            "$(OBJDIR)/core/%.c.o <- $(VARIANT_PATH)/%.c",
        ]
    );

    insta::assert_snapshot!(
        installation.scrub(&plan.compile_rules[2].recipe),
        @r#""<tmp>/packages/arduino/tools/avr-gcc/7.3.0/bin/avr-gcc" -c -Os -w -mmcu=atmega328p -DF_CPU=16000000L -DARDUINO=10611 -DARDUINO_ARCH_AVR $(INCLUDES) "$<" -o "$@""#
    );
    insta::assert_snapshot!(
        installation.scrub(&plan.compile_rules[1].recipe),
        @r#""<tmp>/packages/arduino/tools/avr-gcc/7.3.0/bin/avr-gcc" -c -x assembler-with-cpp -mmcu=atmega328p $(INCLUDES) "$<" -o "$@""#
    );
}

#[test]
fn board_overrides_platform_default() {
    let installation = Installation::new();

    let uno = installation.generate(&project("uno")).unwrap();
    let mega = installation.generate(&project("mega")).unwrap();

    assert!(uno.compile_rules[0]
        .recipe
        .contains("-DF_CPU=16000000L  $(INCLUDES)"));
    assert!(mega.compile_rules[0]
        .recipe
        .contains("-mmcu=atmega2560 -DF_CPU=16000000L -DMEGA $(INCLUDES)"));
    assert!(installation
        .scrub(&mega.variant_path)
        .ends_with("/variants/mega"));
}

#[test]
fn extraction_rules() {
    let installation = Installation::new();
    let plan = installation.generate(&project("uno")).unwrap();

    assert_eq!(plan.extract_extensions, vec!["eep", "hex"]);
    assert_eq!(plan.extractions.len(), 2);
    assert_eq!(plan.extractions[1].target, "$(OBJDIR)/blink.hex");
    assert_eq!(plan.extractions[1].source, "$(OBJS) $(OBJDIR)/blink.elf");
    insta::assert_snapshot!(
        installation.scrub(&plan.extractions[1].recipe),
        @r#""<tmp>/packages/arduino/tools/avr-gcc/7.3.0/bin/avr-objcopy" -O ihex -R .eeprom "/work/blink/build/blink.elf" "/work/blink/build/blink.hex""#
    );
}

#[test]
fn extension_of_other_platform_is_skipped() {
    let installation = Installation::new();
    installation.append_platform(
        r#"recipe.objcopy.bin.pattern.windows="{compiler.path}{compiler.objcopy.cmd}.exe" -O binary "{build.path}/{build.project_name}.elf" "{build.path}/{build.project_name}.bin""#,
    );

    let plan = installation.generate(&project("uno")).unwrap();
    assert_eq!(plan.extract_extensions, vec!["eep", "hex"]);
    assert_eq!(plan.extractions.len(), 2);

    let mut project = project("uno");
    project.platform = Platform::Windows;
    let plan = installation.generate(&project).unwrap();
    assert_eq!(plan.extract_extensions, vec!["eep", "hex", "bin"]);
    assert_eq!(plan.extractions[2].target, "$(OBJDIR)/blink.bin");
}

#[test]
fn upload_ignores_tool_keys_of_other_platforms() {
    let installation = Installation::new();
    let expected = installation.generate(&project("uno")).unwrap().upload;

    installation.append_platform("tools.avrdude.erase.params.windows=-e");
    let plan = installation.generate(&project("uno")).unwrap();
    assert_eq!(plan.upload, expected);
}

#[test]
fn define_beats_platform_specific_key() {
    let installation = Installation::new();
    installation.append_platform("compiler.c.cmd.linux=avr-gcc-linux");

    let plan = installation.generate(&project("uno")).unwrap();
    assert!(plan.compile_rules[2].recipe.contains("/bin/avr-gcc-linux\""));

    let mut project = project("uno");
    project.overrides = vec![("compiler.c.cmd".into(), "from-user".into())];
    let plan = installation.generate(&project).unwrap();
    assert!(plan.compile_rules[2].recipe.contains("/bin/from-user\""));
}

#[test]
fn windows_variant_selected() {
    let installation = Installation::new();
    let mut project = project("uno");
    project.platform = Platform::Windows;

    let plan = installation.generate(&project).unwrap();
    assert_eq!(plan.extract_extensions, vec!["eep", "hex"]);
    insta::assert_snapshot!(
        installation.scrub(&plan.extractions[1].recipe),
        @r#""<tmp>/packages/arduino/tools/avr-gcc/7.3.0/bin/avr-objcopy.exe" -O ihex "/work/blink/build/blink.elf" "/work/blink/build/blink.hex""#
    );
}

#[test]
fn verbose_upload_and_flags() {
    let installation = Installation::new();
    let mut project = project("uno");
    project.verbose = true;
    project.compile_flags = "-DDEBUG=1".into();
    project.serial_port = "/dev/ttyUSB3".into();

    let plan = installation.generate(&project).unwrap();
    assert!(plan.verbose);
    assert!(plan
        .compile_rules
        .iter()
        .all(|rule| rule.recipe.ends_with("\"$@\" -DDEBUG=1")));
    assert!(plan.upload.contains(" -v -patmega328p "));
    assert!(plan.upload.contains("-P/dev/ttyUSB3"));
}

#[test]
fn libraries_and_overrides() {
    let installation = Installation::new();
    let mut project = project("uno");
    project.libraries = vec!["SPI".into()];
    project.overrides = vec![
        ("uno.build.f_cpu".into(), "8000000L".into()),
        ("name".into(), "{build.arch} from the command line".into()),
    ];

    let plan = installation.generate(&project).unwrap();
    let spi = "<tmp>/packages/arduino/hardware/avr/1.8.6/libraries/SPI";

    assert_eq!(
        plan.library_dirs
            .iter()
            .map(|dir| installation.scrub(dir))
            .collect::<Vec<_>>(),
        vec![spi]
    );
    assert_eq!(
        installation.scrub(plan.include_paths.last().unwrap()),
        spi
    );
    assert_eq!(plan.include_paths.len(), 4);
    assert_eq!(plan.compile_rules.len(), 12);
    assert_eq!(installation.scrub(&plan.compile_rules[9].source), format!("{spi}/%.cpp"));
    assert_eq!(plan.compile_rules[9].target, "$(OBJDIR)/libs/%.cpp.o");
    assert!(plan.compile_rules[0].recipe.contains("-DF_CPU=8000000L"));
}

#[test]
fn missing_library() {
    let installation = Installation::new();
    let mut project = project("uno");
    project.libraries = vec!["Servo".into()];

    let result = installation.generate(&project);
    assert!(matches!(
        result,
        Err(GenerateError::Discovery(DiscoveryError::LibraryNotFound { name })) if name == "Servo"
    ));
}

#[test]
fn board_without_upload_tool() {
    let installation = Installation::new();

    let result = installation.generate(&project("bare"));
    assert!(matches!(
        result,
        Err(GenerateError::Resolve(ResolveError::UnresolvedKey { key })) if key == "upload.tool"
    ));
}

#[test]
fn unknown_vendor() {
    let installation = Installation::new();
    let mut project = project("uno");
    project.vendor = "nobody".into();

    let result = installation.generate(&project);
    assert!(matches!(
        result,
        Err(GenerateError::Discovery(DiscoveryError::HardwareRootNotFound { .. }))
    ));
}

#[test]
fn plan_serializes() {
    let installation = Installation::new();
    let plan = installation.generate(&project("uno")).unwrap();

    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["board"], "uno");
    assert_eq!(json["compile_rules"][0]["target"], "$(OBJDIR)/%.cpp.o");
    assert_eq!(json["extract_extensions"][1], "hex");
}
