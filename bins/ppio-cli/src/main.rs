mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::{DecodeArgs, EncodeArgs};

#[derive(Parser)]
#[command(name = "ppio", about = "Decode and encode process parameters through format codecs")]
struct Cli {
    /// Engine configuration (TOML, or HCL for `.hcl` files). Without one,
    /// only the default CSV codec is registered.
    #[arg(long, env = "PPIO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode external content into a feature collection (JSON on stdout).
    Decode {
        /// Declared content type; guessed from the input extension if omitted.
        #[arg(long, short = 't')]
        content_type: Option<String>,
        /// Input file, `-` for stdin.
        #[arg(long, short = 'i', conflicts_with = "inline")]
        input: Option<PathBuf>,
        /// Inline text instead of a file.
        #[arg(long)]
        inline: Option<String>,
        /// Output file instead of stdout.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
    /// Encode a feature collection (JSON) into the target format.
    Encode {
        /// Target content type; guessed from the output extension if omitted.
        #[arg(long, short = 't')]
        content_type: Option<String>,
        /// Feature collection JSON, `-` or omitted for stdin.
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,
        /// Output file instead of stdout.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// List registered content types.
    Formats,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let engine = match commands::load_engine(cli.config.as_deref()) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!(error = %e, "failed to bootstrap engine");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Decode {
            content_type,
            input,
            inline,
            output,
            pretty,
        } => commands::decode_to(
            &engine,
            DecodeArgs {
                content_type,
                input,
                inline,
                pretty,
            },
            output.as_deref(),
        )
        .map(|n| tracing::info!(features = n, "decode complete")),
        Command::Encode {
            content_type,
            input,
            output,
        } => commands::encode_to(
            &engine,
            EncodeArgs {
                content_type,
                input,
                output,
            },
        )
        .map(|n| tracing::info!(features = n, "encode complete")),
        Command::Formats => commands::formats(&engine, &mut std::io::stdout().lock()),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}
