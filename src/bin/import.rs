//! Schema Import CLI
//!
//! Converts schema files into model text, and compares or fingerprints the
//! result.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use similar::TextDiff;
use tracing::info;
use tracing_subscriber::EnvFilter;
use unischema::format::{self, FORMATS};
use unischema::importer::read_source;
use unischema::{configured, Checksum, ImportConfig, ImporterArg, ModelText, TypeList};

#[derive(Parser)]
#[command(name = "unischema-import")]
#[command(about = "Import external schema definitions as model text")]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a file or directory and print its model text
    Import {
        /// Input file or directory
        input: PathBuf,

        #[command(flatten)]
        opts: ImportOpts,

        /// Write the model text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Omit the generated-code banner
        #[arg(long)]
        no_header: bool,

        /// Append a checksum comment
        #[arg(long)]
        checksum: bool,
    },

    /// List supported formats
    Formats,

    /// Print the format an input is detected as
    Detect {
        input: PathBuf,

        /// Format to resolve instead of sniffing
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Show how the model text of two inputs differs
    Diff {
        old: PathBuf,
        new: PathBuf,

        #[command(flatten)]
        opts: ImportOpts,
    },

    /// Print or verify the checksum of an input's model text
    Checksum {
        input: PathBuf,

        #[command(flatten)]
        opts: ImportOpts,

        /// Expected checksum; exits non-zero on mismatch
        #[arg(long)]
        verify: Option<String>,
    },
}

/// Overrides for the `[importer]` config section
#[derive(Args)]
struct ImportOpts {
    /// Input format token (sniffed when omitted)
    #[arg(short, long)]
    format: Option<String>,

    /// Application name
    #[arg(short, long)]
    app: Option<String>,

    /// Package attribute
    #[arg(short, long)]
    package: Option<String>,

    /// Comma-separated import paths
    #[arg(short, long)]
    imports: Option<String>,

    /// Keep references to other documents as string aliases
    #[arg(long)]
    shallow: bool,
}

impl ImportOpts {
    fn apply(&self, config: &ImportConfig) -> (ImporterArg, Option<String>) {
        let mut arg = config.importer_arg();
        if let Some(app) = &self.app {
            arg.app_name = app.clone();
        }
        if let Some(package) = &self.package {
            arg.package_name = package.clone();
        }
        if let Some(imports) = &self.imports {
            arg.imports = imports.clone();
        }
        arg.shallow |= self.shallow;

        let format = self
            .format
            .clone()
            .or_else(|| config.format_name().map(str::to_string));
        (arg, format)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ImportConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Import {
            input,
            opts,
            output,
            no_header,
            checksum,
        } => {
            let (arg, format) = opts.apply(&config);
            let types = import(&input, format.as_deref(), &arg)?;

            let mut text = ModelText::new(&arg, &types)
                .with_header(config.output.header && !no_header)
                .to_string();
            if checksum || config.output.checksum {
                Checksum::append_to(&mut text);
            }

            match output.or(config.output.path) {
                Some(path) => {
                    fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), types = types.len(), "wrote model");
                }
                None => print!("{}", text),
            }
        }

        Commands::Formats => {
            println!("{:<16} {:<6} {}", "FORMAT", "KIND", "EXTENSIONS");
            for f in FORMATS {
                let kind = if f.directory { "dir" } else { "file" };
                println!("{:<16} {:<6} {}", f.name, kind, f.extensions.join(" "));
            }
        }

        Commands::Detect { input, format } => {
            let format = format.or_else(|| config.format_name().map(str::to_string));
            let content = sniff_content(&input)?;
            let detected = format::detect(&input, input.is_dir(), format.as_deref(), &content)?;
            println!("{}", detected.name);
        }

        Commands::Diff { old, new, opts } => {
            let (arg, format) = opts.apply(&config);
            let before = ModelText::new(&arg, &import(&old, format.as_deref(), &arg)?)
                .with_header(false)
                .to_string();
            let after = ModelText::new(&arg, &import(&new, format.as_deref(), &arg)?)
                .with_header(false)
                .to_string();

            if before == after {
                println!("✅ No differences");
            } else {
                let diff = TextDiff::from_lines(&before, &after);
                let old_name = old.display().to_string();
                let new_name = new.display().to_string();
                print!("{}", diff.unified_diff().context_radius(3).header(&old_name, &new_name));
            }
        }

        Commands::Checksum { input, opts, verify } => {
            let (arg, format) = opts.apply(&config);
            let types = import(&input, format.as_deref(), &arg)?;
            let text = ModelText::new(&arg, &types)
                .with_header(config.output.header)
                .to_string();
            let checksum = Checksum::from_text(&text);

            match verify {
                Some(expected) => {
                    let expected = expected.trim_start_matches("sha256:");
                    if checksum.as_str() != expected {
                        bail!("checksum mismatch: expected {}, got {}", expected, checksum);
                    }
                    println!("✅ {}", checksum);
                }
                None => println!("{}", checksum),
            }
        }
    }

    Ok(())
}

/// Detect, configure and run the importer for `input`
fn import(input: &Path, format: Option<&str>, arg: &ImporterArg) -> anyhow::Result<TypeList> {
    let content = sniff_content(input)?;
    let importer = configured(input, input.is_dir(), format, &content, arg)?;

    let source = read_source(input, &importer.format())
        .with_context(|| format!("failed to read {}", input.display()))?;
    let types = importer.import(&source)?;
    info!(input = %input.display(), format = importer.format().name, types = types.len(), "imported");
    Ok(types)
}

/// Bytes used for signature sniffing; directories are matched by extension only
fn sniff_content(input: &Path) -> anyhow::Result<Vec<u8>> {
    if input.is_dir() {
        return Ok(Vec::new());
    }
    fs::read(input).with_context(|| format!("failed to read {}", input.display()))
}
