mod fetch;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};

use sdkforge_core::config::{self, CONFIG_FILE_NAME, SdkforgeConfig, TargetVersion};
use sdkforge_core::ir::{ApiModel, TypeDefinition};
use sdkforge_core::{CodeGenerator, GenerateOptions, GeneratedFile, generate};
use sdkforge_python::{PythonClientConfig, PythonClientGenerator, RESERVED_NAMES};

#[derive(Parser)]
#[command(
    name = "sdkforge",
    about = "Generate a Python client SDK from an OpenAPI 3.x spec",
    version,
    disable_help_flag = true
)]
struct Cli {
    /// Path or http(s) URL of the OpenAPI spec (YAML or JSON)
    spec: Option<String>,

    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Header sent when fetching a remote spec, `Name: Value` (repeatable)
    #[arg(short = 'h', long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    /// Oldest Python version the generated client must run on
    #[arg(long, value_name = "X.Y")]
    target_version: Option<TargetVersion>,

    /// Import name of the generated package
    #[arg(long)]
    package_name: Option<String>,

    /// Config file [default: .sdkforge.yaml if present]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print a summary of the resolved model instead of writing files
    #[arg(long, value_name = "FORMAT")]
    inspect: Option<InspectFormat>,

    /// Write a default config file and exit
    #[arg(long)]
    init: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

#[derive(Clone, ValueEnum)]
enum InspectFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if cli.init {
        return cmd_init();
    }

    let cfg = load_settings(&cli)?;
    let input = cfg
        .input
        .clone()
        .context("no spec given: pass a path or URL, or set `input` in the config file")?;

    let document = fetch::load_document(&input, &cfg.headers)?;
    let options =
        GenerateOptions::from_config(&cfg).with_reserved_names(RESERVED_NAMES.iter().copied());
    let model = generate(&document, &options)?;

    match cli.inspect {
        Some(format) => cmd_inspect(&model, format),
        None => cmd_generate(&model, &cfg),
    }
}

/// Load the config file, then apply command-line overrides.
fn load_settings(cli: &Cli) -> Result<SdkforgeConfig> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?
            .with_context(|| format!("config file {} does not exist", path.display()))?,
        None => config::load_config(Path::new(CONFIG_FILE_NAME))?.unwrap_or_default(),
    };

    if let Some(spec) = &cli.spec {
        cfg.input = Some(spec.clone());
    }
    if let Some(output) = &cli.output {
        cfg.output = output.display().to_string();
    }
    if !cli.headers.is_empty() {
        cfg.headers = cli.headers.clone();
    }
    if let Some(version) = cli.target_version {
        cfg.target_version = version;
    }
    if let Some(name) = &cli.package_name {
        cfg.package_name = Some(name.clone());
    }
    Ok(cfg)
}

/// Write generated files to disk under the given base directory.
fn write_files(base: &Path, files: &[GeneratedFile]) -> Result<()> {
    for file in files {
        let path = base.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, &file.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("  wrote {}", path.display());
    }
    Ok(())
}

fn cmd_generate(model: &ApiModel, cfg: &SdkforgeConfig) -> Result<()> {
    let files = PythonClientGenerator.generate(model, &PythonClientConfig::from_config(cfg))?;

    let output_dir = PathBuf::from(&cfg.output);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    eprintln!("Generating {} → {}", model.info.title, output_dir.display());
    write_files(&output_dir, &files)?;

    if model.warnings.is_empty() {
        eprintln!("Generated {} files in {}", files.len(), output_dir.display());
    } else {
        eprintln!(
            "Generated {} files in {} ({} warnings)",
            files.len(),
            output_dir.display(),
            model.warnings.len()
        );
    }
    Ok(())
}

fn cmd_inspect(model: &ApiModel, format: InspectFormat) -> Result<()> {
    let summary = build_inspect_summary(model);

    match format {
        InspectFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&summary)?;
            print!("{}", yaml);
        }
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn build_inspect_summary(model: &ApiModel) -> serde_json::Value {
    let types: Vec<serde_json::Value> = model
        .types()
        .map(|t| {
            serde_json::json!({
                "name": t.name,
                "kind": match &t.definition {
                    TypeDefinition::Object(_) => "object",
                    TypeDefinition::Enumeration(_) => "enum",
                    TypeDefinition::Union(_) => "union",
                    TypeDefinition::Alias { .. } => "alias",
                },
                "source": t.source,
            })
        })
        .collect();

    let modules: Vec<serde_json::Value> = model
        .modules
        .iter()
        .map(|m| {
            let operations: Vec<serde_json::Value> = m
                .operations
                .iter()
                .map(|op| {
                    serde_json::json!({
                        "name": op.name.camel_case,
                        "method": op.method.as_str(),
                        "path": op.path,
                        "parameters": op.parameters.iter().map(|p| &p.name.original).collect::<Vec<_>>(),
                        "returns": op.return_type(),
                    })
                })
                .collect();
            serde_json::json!({
                "name": m.name.original,
                "file": m.file_name,
                "types": m.types.len(),
                "operations": operations,
            })
        })
        .collect();

    serde_json::json!({
        "info": {
            "title": model.info.title,
            "version": model.info.version,
        },
        "target_version": model.target_version,
        "security_schemes": model.security_schemes.keys().collect::<Vec<_>>(),
        "types": types,
        "modules": modules,
        "warnings": model.warnings,
    })
}

fn cmd_init() -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() {
        anyhow::bail!("{} already exists", config_path.display());
    }

    fs::write(&config_path, config::default_config_content())
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
