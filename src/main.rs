use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use ftotp::{
    commands::{generate_key, generate_totp},
    totp::{self, DEFAULT_PERIOD},
    unix_seconds_now, KeyCipher,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_KEY_FILE: &str = "ft_otp.key";
const HIDDEN_SEED: &str = "<hidden>";

const HEADER: &str = r"
███████╗████████╗      ██████╗ ████████╗██████╗
██╔════╝╚══██╔══╝     ██╔═══██╗╚══██╔══╝██╔══██╗
█████╗     ██║        ██║   ██║   ██║   ██████╔╝
██╔══╝     ██║        ██║   ██║   ██║   ██╔═══╝
██║        ██║███████╗╚██████╔╝   ██║   ██║
╚═╝        ╚═╝╚══════╝ ╚═════╝    ╚═╝   ╚═╝
";

// ANSI colours
const HEADER_COLOR: &str = "\x1b[36m";
const INFO: &str = "\x1b[96m";
const SUCCESS: &str = "\x1b[92m";
const ERROR: &str = "\x1b[91m";
const RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(
    name = "ft_otp",
    version,
    about = "A Time-based One Time Password generator"
)]
struct Cli {
    /// Generate a Time-based One Time Password with the given encrypted key file.
    #[arg(short, long, value_name = "PATH")]
    key: Option<PathBuf>,

    /// Generate a key for TOTPs from a string of 64 hexadecimal characters, or a file containing one.
    #[arg(short = 'g', long = "generate-key", value_name = "HEX|PATH")]
    hex: Option<String>,

    /// Where `--generate-key` writes the encrypted key.
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_KEY_FILE)]
    output: PathBuf,

    /// Passphrase the key file is encrypted under. Falls back to the built-in application key.
    #[arg(short, long, env = "FT_OTP_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Enable verbose mode.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    print_header();
    if cli.key.is_none() && cli.hex.is_none() {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    init_tracing(cli.verbose);
    if cli.verbose {
        print_args(&cli);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{ERROR}ft_otp: error: {error:#}{RESET}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cipher = match &cli.passphrase {
        Some(passphrase) => KeyCipher::from_passphrase(passphrase),
        None => KeyCipher::default(),
    };

    if let Some(hex) = &cli.hex {
        generate_key(hex, &cli.output, &cipher)
            .with_context(|| format!("could not create {}", cli.output.display()))?;
        println!(
            "{SUCCESS}Key was successfully saved in {}.{RESET}",
            cli.output.display()
        );
    }

    if let Some(key) = &cli.key {
        let now = unix_seconds_now()?;
        let code = generate_totp(key, now, &cipher)
            .with_context(|| format!("could not generate a code from {}", key.display()))?;

        if cli.verbose {
            let remaining = totp::remaining_seconds(now, DEFAULT_PERIOD);
            println!("[+] Code valid for {INFO}{remaining}{RESET} more seconds");
        }
        println!("{code}");
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "ftotp=debug,warn" } else { "warn" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn print_header() {
    for line in HEADER.lines() {
        println!("{HEADER_COLOR}{line:^70}{RESET}");
    }
}

fn print_args(cli: &Cli) {
    println!("{:-^80}", "");
    if let Some(key) = &cli.key {
        println!(
            "[+] Key to generate TOTP with: {INFO}{}{RESET}",
            key.display()
        );
    }
    if let Some(hex) = &cli.hex {
        println!(
            "[+] Hexadecimal key to encrypt: {INFO}{}{RESET}",
            shown_seed_argument(hex)
        );
        println!(
            "[+] Encrypted key destination: {INFO}{}{RESET}",
            cli.output.display()
        );
    }
    println!("[+] Verbose mode: {INFO}{}{RESET}", cli.verbose);
    println!("{:-^80}", "");
}

/// Only a path to an existing seed file is echoed; anything else may be key material.
fn shown_seed_argument(hex: &str) -> &str {
    if Path::new(hex).exists() {
        hex
    } else {
        HIDDEN_SEED
    }
}
