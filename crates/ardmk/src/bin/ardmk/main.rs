mod cli;

use anyhow::Context;
use ardmk::discovery::ToolchainRoots;
use ardmk::project::{BuildPlan, Installation, Project};
use ardmk::property_store::{Platform, PropertyStore};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("ARDMK_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let command_result = match cli.command {
        cli::Command::Generate(generate_cli) => generate(&cli.target, generate_cli),
        cli::Command::Get(get_cli) => get(&cli.target, get_cli),
        cli::Command::Keys(keys_cli) => keys(&cli.target, keys_cli),
        cli::Command::Dev => dev(&cli.target),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn generate(target: &cli::TargetArgs, cli: cli::GenerateCommand) -> anyhow::Result<()> {
    let root_dir = match cli.root_dir {
        Some(root_dir) => std::path::absolute(root_dir)?,
        None => std::env::current_dir()?,
    };

    let project = Project {
        root_dir,
        name: cli.name,
        source_dir: cli.source_dir,
        build_dir: cli.build_dir,
        libraries: cli.libraries,
        library_directories: cli.library_directories,
        verbose: cli.verbose,
        compile_flags: cli.compile_flags,
        serial_port: cli.serial_port,
        ..project(target)?
    };

    let plan = project.generate(&roots(target)?)?;
    output(&cli.output, &plan)
}

pub fn get(target: &cli::TargetArgs, cli: cli::GetCommand) -> anyhow::Result<()> {
    let project = project(target)?;
    let store = load(&project, target)?;

    let resolver = ardmk::resolver::Resolver::new(&store, &project.board);
    let value = resolver.resolve(&cli.key, &ardmk::extras! {})?;
    println!("{value}");

    Ok(())
}

pub fn keys(target: &cli::TargetArgs, cli: cli::KeysCommand) -> anyhow::Result<()> {
    let pattern = regex::Regex::new(&cli.pattern)?;
    let store = load(&project(target)?, target)?;

    for key in store.keys_matching(&pattern) {
        println!("{key}");
    }

    Ok(())
}

/// (ardmk-)developer utilities
///
/// A quick way to expose the loaded store for debugging purposes
pub fn dev(target: &cli::TargetArgs) -> anyhow::Result<()> {
    let store = load(&project(target)?, target)?;

    for (key, source, value) in store.properties() {
        let source = source
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<runtime>".to_string());
        println!("{key}={value}\t# {source}");
    }

    Ok(())
}

fn project(target: &cli::TargetArgs) -> anyhow::Result<Project> {
    let board = target.board.clone().context("-b/--board is required")?;
    let vendor = target.vendor.clone().context("-v/--vendor is required")?;
    let arch = target.arch.clone().context("-a/--arch is required")?;

    Ok(Project {
        board,
        vendor,
        arch,
        root_dir: std::env::current_dir()?,
        name: None,
        source_dir: "src".into(),
        build_dir: "build".into(),
        libraries: vec![],
        library_directories: vec![],
        verbose: false,
        compile_flags: String::new(),
        serial_port: "/dev/ttyACM0".into(),
        overrides: target.defines.clone(),
        platform: Platform::current(),
    })
}

fn roots(target: &cli::TargetArgs) -> anyhow::Result<ToolchainRoots> {
    let roots = match &target.packages {
        Some(packages) => ToolchainRoots::new(packages.clone(), target.system_root.clone()),
        None => {
            let mut roots = ToolchainRoots::from_env().context("HOME is not set")?;
            roots.system = target.system_root.clone();
            roots
        }
    };

    tracing::debug!(?roots, "toolchain roots");
    Ok(roots)
}

fn load(project: &Project, target: &cli::TargetArgs) -> anyhow::Result<PropertyStore> {
    let installation = Installation::discover(&roots(target)?, &project.vendor, &project.arch)?;
    Ok(project.load(&installation)?)
}

fn output(output: &cli::OutputArgs, plan: &BuildPlan) -> anyhow::Result<()> {
    let writer: Box<dyn std::io::Write> = match &output.file {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(writer, plan)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(writer, plan)?,
    };

    Ok(())
}
