// Operator CLI for linkpress.
//
// `list` and `config` report what this binary can do. `simulate` pushes a
// file through a sender handle and a separate receiver handle, packet by
// packet, the way a link would, and verifies every packet on the way.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use log::info;
use serde_json::json;

use crate::config::{CompressionConfig, DEFAULT_COMPRESS_THRESHOLD, MAX_PAYLOAD_SIZE};
use crate::handle::{CompressHandle, CompressOutcome};
use crate::registry::{MODEL_NONE, Registry};
use crate::stats::CompressStats;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Typical link MTU minus transport headers.
const DEFAULT_PACKET_SIZE: usize = 1400;

/// Level used when `--level` is omitted, clamped into the model's range.
const PREFERRED_LEVEL: i32 = 6;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Per-link payload compression toolkit.
#[derive(Parser, Debug)]
#[command(
    name = "linkpress",
    version,
    about = "Per-link payload compression toolkit",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Print reports as JSON.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List known compression models.
    List,
    /// Print build/configuration details.
    Config,
    /// Compress and decompress a file packet by packet.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Model name, or "none".
    #[arg(long, short = 'm')]
    model: String,

    /// Model-specific level (default: 6, clamped to the model's range).
    #[arg(long, short = 'l', allow_negative_numbers = true)]
    level: Option<i32>,

    /// Payloads of this many bytes or fewer are sent uncompressed.
    #[arg(long, short = 't', default_value_t = DEFAULT_COMPRESS_THRESHOLD)]
    threshold: usize,

    /// Bytes per packet.
    #[arg(
        long = "packet-size",
        value_parser = parse_packet_size,
        default_value_t = DEFAULT_PACKET_SIZE
    )]
    packet_size: usize,

    /// Input file (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,
}

fn parse_packet_size(s: &str) -> Result<usize, String> {
    let n: usize = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid packet size '{s}': {e}"))?;
    if n == 0 || n > MAX_PAYLOAD_SIZE {
        return Err(format!("packet size must be in 1..={MAX_PAYLOAD_SIZE}"));
    }
    Ok(n)
}

struct Output {
    quiet: bool,
    verbose: u8,
    json: bool,
}

// ---------------------------------------------------------------------------
// List command
// ---------------------------------------------------------------------------

fn cmd_list(out: &Output) -> i32 {
    let registry = Registry::builtin();

    if out.json {
        let models: Vec<_> = registry
            .iter()
            .map(|m| {
                let levels = m.backend().ok().map(|b| b.levels());
                json!({
                    "id": m.id,
                    "name": m.name,
                    "built_in": levels.is_some(),
                    "min_level": levels.as_ref().map(|r| *r.start()),
                    "max_level": levels.as_ref().map(|r| *r.end()),
                })
            })
            .collect();
        println!("{:#}", json!(models));
        return 0;
    }

    println!("{:>3}  {:<8} {:<9} levels", "id", "name", "built-in");
    for m in registry.iter() {
        match m.backend() {
            Ok(backend) => {
                let levels = backend.levels();
                println!(
                    "{:>3}  {:<8} {:<9} {}..={}",
                    m.id,
                    m.name,
                    "yes",
                    levels.start(),
                    levels.end()
                );
            }
            Err(_) => println!("{:>3}  {:<8} {:<9} -", m.id, m.name, "no"),
        }
    }
    0
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("linkpress version {version} (Rust)");

    let zlib = cfg!(feature = "zlib") as u8;
    let lz4 = cfg!(feature = "lz4") as u8;
    let lzma = cfg!(feature = "lzma") as u8;
    let zstd = cfg!(feature = "zstd") as u8;

    eprintln!("FEATURE_ZLIB={zlib}");
    eprintln!("FEATURE_LZ4={lz4}");
    eprintln!("FEATURE_LZMA={lzma}");
    eprintln!("FEATURE_ZSTD={zstd}");
    eprintln!("MAX_PAYLOAD_SIZE={MAX_PAYLOAD_SIZE}");
    eprintln!("DEFAULT_COMPRESS_THRESHOLD={DEFAULT_COMPRESS_THRESHOLD}");
    eprintln!("DEFAULT_PACKET_SIZE={DEFAULT_PACKET_SIZE}");

    0
}

// ---------------------------------------------------------------------------
// Simulate command
// ---------------------------------------------------------------------------

/// Sender-side configuration for `args`, with the default level filled in.
fn simulate_config(registry: &Registry, args: &SimulateArgs) -> Result<CompressionConfig, String> {
    let probe = CompressionConfig::by_name(registry, &args.model, 0).map_err(|e| e.to_string())?;
    let level = match (args.level, probe.model) {
        (Some(level), _) => level,
        (None, None) => 0,
        (None, Some(id)) => {
            let backend = registry
                .lookup(id)
                .and_then(|m| m.backend())
                .map_err(|e| e.to_string())?;
            let levels = backend.levels();
            PREFERRED_LEVEL.clamp(*levels.start(), *levels.end())
        }
    };
    Ok(CompressionConfig {
        level,
        threshold: args.threshold,
        ..probe
    })
}

fn read_input(path: Option<&PathBuf>) -> io::Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path),
        None => {
            let mut data = Vec::new();
            io::stdin().lock().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

fn cmd_simulate(args: &SimulateArgs, out: &Output) -> i32 {
    let registry = Registry::builtin();
    let config = match simulate_config(&registry, args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("linkpress: {e}");
            return 1;
        }
    };

    let data = match read_input(args.input.as_ref()) {
        Ok(d) => d,
        Err(e) => {
            let name = args
                .input
                .as_ref()
                .map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
            eprintln!("linkpress: input: {name}: {e}");
            return 1;
        }
    };

    let sender = CompressHandle::with_registry(registry);
    if let Err(e) = sender.configure(&config) {
        eprintln!("linkpress: {e}");
        return 1;
    }
    // The receiver is never configured: it decodes by the id on the wire.
    let receiver = CompressHandle::with_registry(registry);

    let mut wire = vec![0u8; args.packet_size];
    let mut plain = vec![0u8; args.packet_size];
    let mut packets = 0u64;
    let mut wire_bytes = 0u64;

    for (index, packet) in data.chunks(args.packet_size).enumerate() {
        packets += 1;
        let wire = &mut wire[..packet.len()];
        match sender.compress(packet, wire) {
            Ok(CompressOutcome::Compressed { model, len }) => {
                wire_bytes += len as u64;
                let n = match receiver.decompress(model, &wire[..len], &mut plain) {
                    Ok(n) => n,
                    Err(e) => {
                        eprintln!("linkpress: packet {index}: {e}");
                        return 1;
                    }
                };
                if plain[..n] != *packet {
                    eprintln!("linkpress: packet {index}: round trip mismatch");
                    return 1;
                }
            }
            Ok(CompressOutcome::PassThrough(reason)) => {
                wire_bytes += packet.len() as u64;
                if out.verbose > 1 {
                    eprintln!("linkpress: packet {index}: sent raw ({reason:?})");
                }
            }
            Err(e) => {
                eprintln!("linkpress: packet {index}: {e}");
                return 1;
            }
        }
    }

    let model_name = config
        .model
        .and_then(|id| registry.lookup(id).ok())
        .map_or("none", |m| m.name);
    info!("simulated {packets} packets with '{model_name}'");

    report_simulation(
        out,
        model_name,
        &config,
        data.len() as u64,
        wire_bytes,
        packets,
        &sender.stats(),
        &receiver.stats(),
    );
    0
}

#[allow(clippy::too_many_arguments)]
fn report_simulation(
    out: &Output,
    model: &str,
    config: &CompressionConfig,
    input_bytes: u64,
    wire_bytes: u64,
    packets: u64,
    tx: &CompressStats,
    rx: &CompressStats,
) {
    if out.json {
        let report = json!({
            "command": "simulate",
            "model": model,
            "model_id": config.model.unwrap_or(MODEL_NONE),
            "level": config.level,
            "threshold": config.threshold,
            "packets": packets,
            "input_bytes": input_bytes,
            "wire_bytes": wire_bytes,
            "tx": {
                "compressed_packets": tx.tx_compressed_packets,
                "passthrough_packets": tx.tx_passthrough_packets,
                "failed": tx.tx_failed_to_compress,
                "original_bytes": tx.tx_compressed_original_bytes,
                "compressed_bytes": tx.tx_compressed_size_bytes,
                "ratio": tx.tx_ratio(),
                "avg_us": tx.tx_compress_time.avg_us(),
                "max_us": tx.tx_compress_time.max_us,
            },
            "rx": {
                "decompressed_packets": rx.rx_compressed_packets,
                "failed": rx.rx_failed_to_decompress,
                "avg_us": rx.rx_decompress_time.avg_us(),
                "max_us": rx.rx_decompress_time.max_us,
            },
        });
        println!("{report:#}");
        return;
    }

    if out.quiet {
        return;
    }
    println!(
        "linkpress: {model} level {}: {packets} packets, {input_bytes} -> {wire_bytes} bytes",
        config.level
    );
    println!(
        "linkpress: compressed {} packets, sent {} raw, ratio {:.3}",
        tx.tx_compressed_packets,
        tx.tx_passthrough_packets,
        tx.tx_ratio()
    );
    if out.verbose > 0 {
        println!(
            "linkpress: compress avg {}us max {}us, decompress avg {}us max {}us",
            tx.tx_compress_time.avg_us(),
            tx.tx_compress_time.max_us,
            rx.rx_decompress_time.avg_us(),
            rx.rx_decompress_time.max_us
        );
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(cli.quiet, cli.verbose)),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    let out = Output {
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json: cli.json_output,
    };

    let exit_code = match &cli.command {
        Cmd::List => cmd_list(&out),
        Cmd::Config => cmd_config(),
        Cmd::Simulate(args) => cmd_simulate(args, &out),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv: Vec<String> = std::iter::once("linkpress".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        Cli::try_parse_from(argv).expect("cli parse failed")
    }

    fn simulate_args(args: &[&str]) -> SimulateArgs {
        match parse(args).command {
            Cmd::Simulate(a) => a,
            other => panic!("expected simulate, got {other:?}"),
        }
    }

    #[test]
    fn simulate_defaults() {
        let args = simulate_args(&["simulate", "--model", "zlib", "in.bin"]);
        assert_eq!(args.model, "zlib");
        assert_eq!(args.level, None);
        assert_eq!(args.threshold, DEFAULT_COMPRESS_THRESHOLD);
        assert_eq!(args.packet_size, DEFAULT_PACKET_SIZE);
        assert_eq!(args.input, Some(PathBuf::from("in.bin")));
    }

    #[test]
    fn packet_size_bounds() {
        assert_eq!(parse_packet_size("1").unwrap(), 1);
        assert_eq!(parse_packet_size("65536").unwrap(), MAX_PAYLOAD_SIZE);
        assert!(parse_packet_size("0").is_err());
        assert!(parse_packet_size("65537").is_err());
        assert!(parse_packet_size("big").is_err());
    }

    #[test]
    fn global_flags() {
        let cli = parse(&["-vv", "--json", "list"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.json_output);
        assert!(matches!(cli.command, Cmd::List));

        let argv = ["linkpress", "-q", "-v", "list"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn log_filter_levels() {
        assert_eq!(log_filter(true, 0), "error");
        assert_eq!(log_filter(false, 0), "warn");
        assert_eq!(log_filter(false, 1), "info");
        assert_eq!(log_filter(false, 5), "debug");
    }

    #[test]
    fn default_level_is_clamped() {
        let registry = Registry::builtin();

        #[cfg(feature = "zlib")]
        {
            let args = simulate_args(&["simulate", "-m", "zlib"]);
            assert_eq!(simulate_config(&registry, &args).unwrap().level, 6);
            let args = simulate_args(&["simulate", "-m", "deflate", "-l", "1", "-t", "0"]);
            let cfg = simulate_config(&registry, &args).unwrap();
            assert_eq!((cfg.model, cfg.level, cfg.threshold), (Some(2), 1, 0));
        }

        let args = simulate_args(&["simulate", "-m", "none"]);
        assert_eq!(simulate_config(&registry, &args).unwrap().model, None);

        let args = simulate_args(&["simulate", "-m", "lzo2"]);
        assert!(simulate_config(&registry, &args).is_err());
        let args = simulate_args(&["simulate", "-m", "snappy"]);
        assert!(simulate_config(&registry, &args).is_err());
    }

    #[test]
    fn negative_level_parses() {
        let args = simulate_args(&["simulate", "-m", "zstd", "--level", "-5"]);
        assert_eq!(args.level, Some(-5));
    }
}
