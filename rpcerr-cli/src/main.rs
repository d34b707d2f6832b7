//! # rpcerr CLI
//!
//! Command-line tool for inspecting rich error statuses.
//!
//! Usage:
//!   rpcerr codes
//!   rpcerr decode <grpc-status-details-bin>
//!   rpcerr encode <CODE:MESSAGE>...
//!
//! Examples:
//!   rpcerr encode "Internal:lookup failed" "NotFound:record id42 not found"
//!   rpcerr decode --verbose "$(rpcerr encode Internal:oops)"

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use clap::{Parser, Subcommand};
use rpcerr::{Code, CodecConfig, Error, StackTrace, StatusCodec};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rpcerr")]
#[command(author, version, about = "rpcerr - inspect rich RPC error statuses")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Longest error chain to encode or rebuild
    #[arg(long, global = true, default_value = "64")]
    max_chain_depth: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// List the error codes
    Codes,
    /// Decode a base64 grpc-status-details-bin value
    Decode {
        /// The base64 payload (padding optional)
        #[arg(required = true)]
        payload: String,

        /// Print the whole chain with stack traces
        #[arg(short, long)]
        verbose: bool,

        /// Print the chain as JSON, outermost first
        #[arg(long, conflicts_with = "verbose")]
        json: bool,
    },
    /// Build an error chain and print its base64 details payload
    Encode {
        /// Links as CODE:MESSAGE, outermost first
        #[arg(required = true)]
        links: Vec<String>,
    },
}

/// One link of a decoded chain, as printed by `decode --json`
#[derive(Serialize)]
struct LinkView<'a> {
    code: Code,
    message: &'a str,
    stack: &'a StackTrace,
}

fn parse_link(arg: &str) -> Result<(Code, &str)> {
    let Some((name, message)) = arg.split_once(':') else {
        bail!("expected CODE:MESSAGE, got '{}'", arg);
    };
    let code = name
        .trim()
        .parse::<Code>()
        .with_context(|| format!("in link '{}'", arg))?;
    Ok((code, message))
}

fn build_chain(links: &[String]) -> Result<Error> {
    let mut parsed = links
        .iter()
        .map(|arg| parse_link(arg))
        .collect::<Result<Vec<_>>>()?;

    let Some((code, message)) = parsed.pop() else {
        bail!("at least one link is required");
    };
    let mut err = Error::new(code, message);
    while let Some((code, message)) = parsed.pop() {
        err = Error::with_cause(code, err, message);
    }
    Ok(err)
}

fn print_codes() {
    println!("{:>3}  {:<20} {}", "#", "NAME", "GRPC");
    for code in Code::ALL {
        println!("{:>3}  {:<20} {:?}", code.ordinal(), code.as_str(), code.to_rpc());
    }
}

fn decode(codec: &StatusCodec, payload: &str, verbose: bool, json: bool) -> Result<()> {
    let bytes = STANDARD_NO_PAD
        .decode(payload.trim().trim_end_matches('='))
        .context("payload is not valid base64")?;
    let err = codec.decode_details_bytes(&bytes);
    tracing::debug!(links = err.chain().count(), code = %err.code(), "decoded status details");

    if json {
        let links: Vec<LinkView<'_>> = err
            .chain()
            .map(|link| LinkView {
                code: link.code(),
                message: link.message(),
                stack: link.stack_trace(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&links)?);
    } else if verbose {
        println!("{}", err.stack_chain());
    } else {
        for (depth, link) in err.chain().enumerate() {
            println!("{}{}", "  ".repeat(depth), link.summary());
        }
    }
    Ok(())
}

fn encode(codec: &StatusCodec, links: &[String]) -> Result<()> {
    let err = build_chain(links)?;
    tracing::debug!(links = links.len(), "encoding error chain");
    let bytes = codec
        .encode_details_bytes(&err)
        .map_err(|e| anyhow::anyhow!("cannot attach chain: {}", e))?;
    println!("{}", STANDARD_NO_PAD.encode(bytes));
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let codec = StatusCodec::with_config(
        CodecConfig::default().with_max_chain_depth(cli.max_chain_depth),
    );

    match cli.command {
        Commands::Codes => print_codes(),
        Commands::Decode {
            payload,
            verbose,
            json,
        } => decode(&codec, &payload, verbose, json)?,
        Commands::Encode { links } => encode(&codec, &links)?,
    }
    Ok(())
}
