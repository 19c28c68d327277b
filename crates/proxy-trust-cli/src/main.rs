//! ProxyTrust CLI: the `ptrust` command.
//!
//! Negotiates connection constraints across cipher suites, verifies
//! proxies described in JSON files, and manages the verifier config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use proxy_trust::proxy::describe;
use proxy_trust::time::{millis_to_rfc3339, now_millis};
use proxy_trust::{
    verify_object_trust, BasicProxy, BasicTrustContext, ConnectionContext, ContextItem,
    InvocationConstraints, MethodConstraints, NamedTrustVerifier, Principal, ProxyDescriptor,
    ProxyRef, ProxyTrustInvocationHandler, ProxyTrustVerifier, TrustConfig, TrustError,
};

const DEFAULT_CONFIG_FILE: &str = "ptrust.json";

// ── CLI structure ─────────────────────────────────────────────────────────────

/// ProxyTrust CLI: negotiate connection constraints and verify proxy trust.
#[derive(Parser, Debug)]
#[command(
    name = "ptrust",
    about = "ProxyTrust CLI",
    version,
    long_about = "ptrust: ProxyTrust CLI\n\nNegotiate invocation constraints across cipher suites,\nverify smart proxies through their bootstrap proxies, and manage verifier config."
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find the cipher suite best satisfying a set of constraints
    Negotiate {
        /// Candidate cipher suite (repeatable, in preference order)
        #[arg(long = "suite", required = true)]
        suites: Vec<String>,

        /// Authenticated client principal (X.500 name)
        #[arg(long)]
        client: Option<String>,

        /// Authenticated server principal (X.500 name)
        #[arg(long)]
        server: Option<String>,

        /// Require codebase integrity to be enforceable
        #[arg(long)]
        integrity: bool,

        /// Negotiate as the client side of the connection
        #[arg(long)]
        client_side: bool,

        /// JSON file holding the invocation constraints
        #[arg(long)]
        constraints: Option<PathBuf>,

        /// Verifier config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Verify a proxy through its bootstrap proxy
    Verify {
        /// JSON proxy descriptor
        #[arg(long)]
        proxy: PathBuf,

        /// Name of a trusted proxy (repeatable)
        #[arg(long)]
        trust: Vec<String>,

        /// JSON file holding method constraints to attach to bootstrap calls
        #[arg(long)]
        constraints: Option<PathBuf>,

        /// Verifier config file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show a proxy's string form, interfaces and fingerprints
    Inspect {
        /// JSON proxy descriptor
        #[arg(long)]
        proxy: PathBuf,
    },

    /// Manage the verifier config
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write the default config
    Init {
        /// Output file path
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config
    Show {
        /// Config file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = match cli.command {
        Commands::Negotiate {
            suites,
            client,
            server,
            integrity,
            client_side,
            constraints,
            config,
        } => cmd_negotiate(
            &suites,
            client.as_deref(),
            server.as_deref(),
            integrity,
            client_side,
            constraints.as_deref(),
            config.as_deref(),
            verbose,
        ),
        Commands::Verify {
            proxy,
            trust,
            constraints,
            config,
        } => cmd_verify(
            &proxy,
            &trust,
            constraints.as_deref(),
            config.as_deref(),
            verbose,
        ),
        Commands::Inspect { proxy } => cmd_inspect(&proxy, verbose),
        Commands::Config { subcommand } => match subcommand {
            ConfigCommands::Init { output, force } => cmd_config_init(&output, force),
            ConfigCommands::Show { config } => cmd_config_show(config.as_deref()),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Loading helpers ───────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<TrustConfig> {
    match path {
        Some(p) => TrustConfig::load(p)
            .with_context(|| format!("failed to load config from {}", p.display())),
        None => Ok(TrustConfig::default()),
    }
}

fn load_proxy(path: &Path) -> Result<ProxyRef> {
    let descriptor = ProxyDescriptor::load(path)
        .with_context(|| format!("failed to read proxy descriptor {}", path.display()))?;
    let proxy = descriptor.materialize().context("invalid proxy descriptor")?;
    log::debug!("loaded {} from {}", describe(&proxy), path.display());
    Ok(proxy)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `ptrust negotiate --suite S... [--client C] [--server S] [--integrity] [--client-side]`
#[allow(clippy::too_many_arguments)]
fn cmd_negotiate(
    suites: &[String],
    client: Option<&str>,
    server: Option<&str>,
    integrity: bool,
    client_side: bool,
    constraints_path: Option<&Path>,
    config_path: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    log::debug!("negotiating over {} suites", suites.len());
    let mut constraints: InvocationConstraints = match constraints_path {
        Some(p) => read_json(p)?,
        None => InvocationConstraints::default(),
    };
    // Only the server can track time since accept; clients pin deadlines now.
    if client_side && constraints.has_relative_time() {
        let now = now_millis();
        constraints = constraints.make_absolute(now);
        if verbose {
            println!("Relative times made absolute at {}", millis_to_rfc3339(now));
        }
    }

    let client = client.map(Principal::x500);
    let server = server.map(Principal::x500);

    let mut supported = Vec::new();
    for suite in suites {
        let context = ConnectionContext::get_instance_with_config(
            suite,
            client.as_ref(),
            server.as_ref(),
            integrity,
            client_side,
            &constraints,
            &config,
        );
        println!("Suite {suite}");
        match context {
            Some(ctx) => {
                println!("  Supported:           yes");
                println!("  Integrity required:  {}", yes_no(ctx.integrity_required()));
                println!("  Integrity preferred: {}", yes_no(ctx.integrity_preferred()));
                match ctx.connection_time() {
                    Some(t) => println!(
                        "  Connect deadline:    {}",
                        millis_to_rfc3339(i64::try_from(t).unwrap_or(i64::MAX))
                    ),
                    None => println!("  Connect deadline:    none"),
                }
                println!("  Preferences met:     {}", ctx.preferences());
                if verbose {
                    println!("  Context:             {ctx}");
                }
                supported.push(ctx);
            }
            None => println!("  Supported:           no"),
        }
    }

    let best = ConnectionContext::select_best(supported)
        .ok_or_else(|| anyhow!("no cipher suite satisfies the constraints"))?;
    println!();
    println!("Selected: {}", best.cipher_suite());
    Ok(())
}

/// `ptrust verify --proxy FILE [--trust NAME]... [--constraints FILE] [--config FILE]`
fn cmd_verify(
    proxy_path: &Path,
    trust: &[String],
    constraints_path: Option<&Path>,
    config_path: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let proxy = load_proxy(proxy_path)?;

    let mut ctx = BasicTrustContext::new()
        .with_verifier(Arc::new(ProxyTrustVerifier::with_config(config.clone())))
        .with_verifier(Arc::new(NamedTrustVerifier::new(trust.iter().cloned())))
        .with_loader(proxy_path.display().to_string());
    if let Some(p) = constraints_path {
        let constraints: MethodConstraints = read_json(p)?;
        ctx = ctx.with_item(ContextItem::Constraints(constraints));
    }

    if verbose {
        println!("Proxy:   {}", describe(&proxy));
        println!("Trusted: {}", trust.join(", "));
        println!("Budget:  {} objects", config.max_examined);
    }

    match verify_object_trust(&proxy, &ctx, &config) {
        Ok(()) => {
            println!("TRUSTED");
            Ok(())
        }
        Err(TrustError::Untrusted(what)) => {
            println!("NOT TRUSTED");
            Err(anyhow!("{what} is not trusted"))
        }
        Err(e) => Err(e).context("verification failed"),
    }
}

/// `ptrust inspect --proxy FILE`
fn cmd_inspect(proxy_path: &Path, verbose: bool) -> Result<()> {
    let proxy = load_proxy(proxy_path)?;
    print_proxy("Proxy", &proxy, 0, verbose);
    Ok(())
}

fn print_proxy(label: &str, proxy: &ProxyRef, depth: usize, verbose: bool) {
    let pad = "  ".repeat(depth);
    println!("{pad}{label}: {}", describe(proxy));
    let interfaces: Vec<String> = proxy.interfaces().iter().map(|i| i.to_string()).collect();
    println!("{pad}  Interfaces:  {}", interfaces.join(", "));
    if let Some(basic) = proxy.as_any().downcast_ref::<BasicProxy>() {
        println!("{pad}  Fingerprint: {}", basic.fingerprint());
        if basic.is_offline() {
            println!("{pad}  Offline:     yes");
        }
        if verbose {
            if let Some(c) = basic.constraints() {
                let json = serde_json::to_string(c).unwrap_or_default();
                println!("{pad}  Constraints: {json}");
            }
        }
    }
    let handler = proxy
        .invocation_handler()
        .and_then(|h| h.as_any().downcast_ref::<ProxyTrustInvocationHandler>());
    if let Some(handler) = handler {
        print_proxy("Main", handler.main(), depth + 1, verbose);
        print_proxy("Boot", handler.boot(), depth + 1, verbose);
    }
}

/// `ptrust config init [--output FILE] [--force]`
fn cmd_config_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            output.display()
        ));
    }
    let config = TrustConfig::default();
    config
        .save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote default config to {}", output.display());
    Ok(())
}

/// `ptrust config show [--config FILE]`
fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    println!("max_examined:              {}", config.max_examined);
    println!(
        "require_trusted_bootstrap: {}",
        config.require_trusted_bootstrap
    );
    println!("max_alternative_depth:     {}", config.max_alternative_depth);
    Ok(())
}
