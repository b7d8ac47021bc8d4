use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use protopod_compiler::{file, Artifact, CompileOpts, CopyBytes, VerifyMode};

#[derive(Parser)]
#[command(name = "protopod")]
#[command(about = "Compile proto2 schemas into wire-format codec modules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema file (JSON raw-definition format) to codec sources
    Compile {
        /// Input schema file
        input: PathBuf,

        /// Directory to add to the import search path (repeatable)
        #[arg(short = 'I', long = "include")]
        include: Vec<PathBuf>,

        /// Output directory (defaults to the input file's directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Emit typed message structs in the generated types file
        #[arg(long)]
        type_specs: bool,

        /// When generated encoding verifies values first
        #[arg(long, value_enum, default_value = "optionally")]
        verify: VerifyArg,

        /// `bytes` copy strategy: never, always, auto, or a numeric threshold
        #[arg(long, default_value = "auto")]
        copy_bytes: String,
    },

    /// Print a schema's compiled definitions as JSON
    Defs {
        /// Input schema file
        input: PathBuf,

        /// Directory to add to the import search path (repeatable)
        #[arg(short = 'I', long = "include")]
        include: Vec<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum VerifyArg {
    Always,
    Optionally,
    Never,
}

impl From<VerifyArg> for VerifyMode {
    fn from(arg: VerifyArg) -> VerifyMode {
        match arg {
            VerifyArg::Always => VerifyMode::Always,
            VerifyArg::Optionally => VerifyMode::Optionally,
            VerifyArg::Never => VerifyMode::Never,
        }
    }
}

fn parse_copy_bytes(text: &str) -> Result<CopyBytes, String> {
    match text {
        "never" => Ok(CopyBytes::Never),
        "always" => Ok(CopyBytes::Always),
        "auto" => Ok(CopyBytes::Auto),
        other => other
            .parse::<u32>()
            .map(CopyBytes::Threshold)
            .map_err(|_| format!("invalid copy_bytes value {:?}", other)),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Compile {
            input,
            include,
            out_dir,
            type_specs,
            verify,
            copy_bytes,
        } => {
            let opts = CompileOpts {
                import_dirs: include,
                out_dir,
                type_specs,
                verify: verify.into(),
                copy_bytes: parse_copy_bytes(&copy_bytes)?,
                ..Default::default()
            };
            let compiled = file(&input, &opts).map_err(|e| e.to_string())?;
            for warning in &compiled.warnings {
                eprintln!("warning: {}", warning);
            }
            if let Artifact::Files(paths) = compiled.artifact {
                for path in paths {
                    println!("wrote {}", path.display());
                }
            }
            Ok(())
        }

        Commands::Defs { input, include } => {
            let opts = CompileOpts {
                import_dirs: include,
                binary: true,
                ..Default::default()
            };
            let compiled = file(&input, &opts).map_err(|e| e.to_string())?;
            let Artifact::Module(module) = compiled.artifact else {
                return Err("expected an in-memory module".to_string());
            };
            let json = serde_json::to_string_pretty(module.get_msg_defs())
                .map_err(|e| e.to_string())?;
            println!("{}", json);
            Ok(())
        }
    }
}
