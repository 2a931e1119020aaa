// Demos are allowed to use expect/unwrap for simplicity
#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Periodic Logger Demo
//!
//! Installs itself as a service that appends a timestamp to a log file every
//! second until the init system or service manager stops it.
//!
//! # Usage
//!
//! ```bash
//! # Register (root / Administrator required)
//! periodic-logger --add demo-logger [username] [password] [dependency ...]
//!
//! # Show the artifact this host would receive
//! periodic-logger --print demo-logger
//!
//! # Deregister
//! periodic-logger --remove demo-logger
//!
//! # What the installed service runs
//! periodic-logger --run /tmp/demo-logger.log
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use servitor::prelude::*;
use tracing_subscriber::EnvFilter;

fn usage() {
    println!("Periodic Logger Demo");
    println!();
    println!("Usage:");
    println!("  periodic-logger --add <name> [username] [password] [dependency ...]");
    println!("  periodic-logger --remove <name>");
    println!("  periodic-logger --print <name>");
    println!("  periodic-logger --run <log-file>");
}

fn log_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{name}.log"))
}

fn descriptor(name: &str, rest: &[String]) -> ServiceDescriptor {
    let mut descriptor = ServiceDescriptor::new(name, log_path(name))
        .with_display_name(format!("{name} (periodic logger)"))
        .with_executable_args(["--run"]);

    if let Some(username) = rest.first() {
        descriptor = descriptor.with_credentials(username.clone(), rest.get(1).cloned());
    }
    for dependency in rest.iter().skip(2) {
        descriptor = descriptor.with_dependency(dependency.clone());
    }
    descriptor
}

async fn run(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;

    Supervisor::global().run(OutputSinks::combined(log.try_clone()?)?, || {
        tracing::info!("stop requested, exiting");
        Supervisor::global().request_shutdown(0);
    })?;

    tracing::info!(log = %path.display(), "periodic logger running");
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        ticker.tick().await;
        writeln!(log, "{}", humantime::format_rfc3339_seconds(SystemTime::now()))?;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (Some(command), Some(target)) = (args.first(), args.get(1)) else {
        usage();
        return Ok(());
    };
    let rest = &args[2..];

    match command.as_str() {
        "--add" => {
            ServiceManager::new().install(&descriptor(target, rest)).await?;
            println!("service {target} installed");
        }
        "--remove" => {
            ServiceManager::new().remove(target).await?;
            println!("service {target} removed");
        }
        "--print" => match ServiceManager::new().render(&descriptor(target, rest)).await? {
            Some(artifact) => {
                println!("# {}", artifact.path().display());
                print!("{}", artifact.contents());
            }
            None => println!("{target} is registered with the native service manager; no artifact"),
        },
        "--run" => run(PathBuf::from(target)).await?,
        _ => usage(),
    }

    Ok(())
}
