//! `scip-terminal` binary.

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use scip_protocol::{DEFAULT_PROBE_TIMEOUT, DEFAULT_READ_TIMEOUT};
use scip_telemetry::{init_telemetry, TelemetryConfig};
use scip_terminal::{render, ClientError, Command, TerminalClient, HELP_TEXT};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// SCiPnet terminal.
#[derive(Debug, Parser)]
#[command(name = "scip-terminal", version, about)]
struct Args {
    /// Server address
    #[arg(short, long, env = "SCIP_SERVER", default_value = "127.0.0.1:65432")]
    server: SocketAddr,

    /// User id (prompted for when omitted)
    #[arg(short, long)]
    user_id: Option<i64>,

    /// Password (prompted for when omitted)
    #[arg(short, long, env = "SCIP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Skip the connection probe handshake
    #[arg(long)]
    no_probe: bool,

    /// Read timeout in seconds
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT.as_secs())]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::for_service("scip-terminal");
    if std::env::var("SCIP_LOG_LEVEL").is_err() && std::env::var("RUST_LOG").is_err() {
        telemetry.log_level = "warn".to_string();
    }
    let _telemetry = init_telemetry(telemetry).context("initializing telemetry")?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let user_id = match args.user_id {
        Some(id) => id,
        None => prompt(&mut input, "User ID: ")
            .await?
            .trim()
            .parse()
            .context("user id must be a whole number")?,
    };
    let password = match args.password {
        Some(password) => password,
        None => prompt(&mut input, "Password: ").await?,
    };

    let probe = (!args.no_probe).then_some(DEFAULT_PROBE_TIMEOUT);
    let mut client = TerminalClient::connect(args.server, Duration::from_secs(args.timeout), probe)
        .await
        .with_context(|| format!("connecting to {}", args.server))?;

    let user = match client.login(user_id, &password).await {
        Ok(user) => user,
        Err(ClientError::Rejected { field }) => bail!("Access denied: invalid {field}"),
        Err(e) => return Err(e).context("logging in"),
    };
    println!("{}", render::welcome(&user));

    loop {
        let Some(line) = prompt_opt(&mut input, "> ").await? else {
            break;
        };
        match Command::parse(&line) {
            Ok(Command::Access { f_type, f_id }) => {
                match client.access(&f_type, f_id).await {
                    Ok(reply) => println!("{}", render::reply(&reply)),
                    // Refused locally before anything was sent.
                    Err(ClientError::Protocol(e)) => println!("{e}"),
                    Err(e) => return Err(e).context("requesting file"),
                }
            }
            Ok(Command::Help) => println!("{HELP_TEXT}"),
            Ok(Command::Clear) => print!("{}", render::CLEAR_SCREEN),
            Ok(Command::Logout) => break,
            Ok(Command::Empty) => {}
            Err(e) => println!("{e}"),
        }
    }

    client.logout().await;
    println!("Session closed.");
    Ok(())
}

async fn prompt(input: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<String> {
    prompt_opt(input, label)
        .await?
        .context("input closed before login")
}

async fn prompt_opt(input: &mut Lines<BufReader<Stdin>>, label: &str) -> Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}
