// src/main.rs
mod logger;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use huff::{Format, files};

#[derive(Parser)]
#[command(name = "huff", version)]
#[command(about = "Huffman-compress files into .huff and back.", long_about = None)]
struct Cli {
    /// Show per-stage debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum FormatArg {
    #[clap(help = "Length-prefixed header with a bit count; any input (Default).")]
    Framed,
    #[clap(help = "Byte records ended by a 1,1,1,1,0,0,0,0 marker and a terminator symbol.")]
    Marker,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file to <FILE>.huff
    Compress {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = FormatArg::Framed)]
        format: FormatArg,
    },
    /// Decompress a .huff file to <FILE>.unhuff
    Decompress {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Describe a .huff file without writing anything
    Inspect { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let span = tracing::info_span!("command_execution", command = ?std::env::args().collect::<Vec<_>>());
    let _enter = span.enter();

    match cli.command {
        Commands::Compress { file, output, format } => {
            let format = match format {
                FormatArg::Framed => Format::Framed,
                FormatArg::Marker => Format::Marker,
            };
            let report = files::compress_file(&file, output.as_deref(), format)
                .with_context(|| format!("compressing {}", file.display()))?;
            println!(
                "{} bytes written ({} -> {}) to {}",
                report.bytes_written,
                files::format_bytes(report.bytes_read),
                files::format_bytes(report.bytes_written),
                report.output.display()
            );
        }
        Commands::Decompress { file, output } => {
            let report = files::decompress_file(&file, output.as_deref())
                .with_context(|| format!("decompressing {}", file.display()))?;
            println!(
                "{} bytes written to {}",
                report.bytes_written,
                report.output.display()
            );
        }
        Commands::Inspect { file } => {
            let summary = files::inspect_file(&file)
                .with_context(|| format!("inspecting {}", file.display()))?;
            let info = &summary.info;
            println!("format:   {:?}", info.format);
            println!("nodes:    {} ({} leaves)", info.nodes, info.leaves);
            println!(
                "sizes:    {} header + {} payload = {}",
                info.header_bytes,
                info.payload_bytes,
                files::format_bytes(summary.compressed_len)
            );
            if let Some(bits) = info.payload_bits {
                println!("bits:     {bits}");
            }
            println!("content:  {}", files::format_bytes(summary.original_len));
            println!("sha256:   {}", summary.sha256);
        }
    }
    Ok(())
}
