//! hq — entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serde_json::{json, Value};

use hateoas_query::{selector, QueryOptions};
use hateoas_query_cli::config::{load_config, resolve_base_url};
use hateoas_query_cli::session::QuerySession;
use hateoas_query_cli::types::{exit_codes, CliError, CliResult};

#[derive(Parser)]
#[command(
    name = "hq",
    about = "Query hypermedia (HATEOAS) APIs by following dotted selectors",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Base URL that relative hrefs resolve against.
    /// Also reads from HQ_BASE_URL env var.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Use `_links` / `_actions` instead of `links` / `actions`.
    #[arg(long, global = true)]
    hal: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a selector from a root node and print the result as JSON.
    Query {
        /// Selector, e.g. `accounts[].invoices[0].@pay`.
        selector: String,

        /// Root node: an href, a JSON file, or `-` for stdin.
        /// Defaults to the base URL.
        #[arg(short, long)]
        root: Option<String>,

        /// Fail when a step matches no link, action or attribute.
        #[arg(long, conflicts_with = "lenient")]
        strict: bool,

        /// Prune unresolved steps even if the config enables strict mode.
        #[arg(long)]
        lenient: bool,

        /// Keep only these keys of the final nodes (comma-separated).
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// JSON sent as `params` with action steps.
        #[arg(long)]
        action_params: Option<String>,

        /// Print the unreduced, nested fan-out result.
        #[arg(long)]
        isolated: bool,

        /// Include `_origin` back-references in the output.
        #[arg(long)]
        with_origin: bool,

        /// Also print every response met, most recent first.
        #[arg(long)]
        responses: bool,
    },

    /// Show how a selector is parsed into steps.
    Parse {
        selector: String,
    },

    /// Launch an interactive selector shell.
    Repl {
        /// Root node: an href, a JSON file, or `-` for stdin.
        #[arg(short, long)]
        root: Option<String>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   hq completions bash > ~/.local/share/bash-completion/completions/hq
    ///   hq completions zsh > ~/.zfunc/_hq
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<CliError>()
            .map(CliError::exit_code)
            .unwrap_or(exit_codes::FAILURE);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Query {
            ref selector,
            ref root,
            strict,
            lenient,
            ref only,
            ref action_params,
            isolated,
            with_origin,
            responses,
        } => {
            let options = query_options(strict, lenient, only, action_params.as_deref())?;

            let session = open_session(&cli, root.as_deref()).await?;
            let (result, seen) = if isolated {
                let (raw, seen) = session.query_isolated(selector, &options).await?;
                (raw.to_json(with_origin), seen)
            } else {
                let (outcome, seen) = session.query(selector, &options).await?;
                (outcome.to_json(with_origin), seen)
            };

            let output = if responses {
                json!({ "result": result, "responses": seen })
            } else {
                result
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Parse { ref selector } => {
            let steps = selector::parse(selector);
            println!("{}", serde_json::to_string_pretty(&steps)?);
        }

        Commands::Repl { ref root } => {
            let session = open_session(&cli, root.as_deref()).await?;
            hateoas_query_cli::repl::run(session).await?;
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "hq", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Build per-call options from the `query` flags.
fn query_options(
    strict: bool,
    lenient: bool,
    only: &[String],
    action_params: Option<&str>,
) -> CliResult<QueryOptions> {
    let mut options = QueryOptions::new();
    if strict {
        options = options.strict(true);
    } else if lenient {
        options = options.strict(false);
    }
    if !only.is_empty() {
        options = options.only_keys(only.iter().cloned());
    }
    if let Some(raw) = action_params {
        let params: Value = serde_json::from_str(raw).map_err(|e| {
            CliError::InvalidParams(format!("--action-params is not valid JSON: {e}"))
        })?;
        options = options.action_params(params);
    }
    Ok(options)
}

async fn open_session(cli: &Cli, root: Option<&str>) -> anyhow::Result<QuerySession> {
    let mut config = load_config(cli.config.as_deref())?;
    if cli.hal {
        config.traversal.use_hal_keys();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = Some(timeout_ms);
    }
    let base_url = resolve_base_url(cli.base_url.as_deref(), &config);
    tracing::info!("Base URL: {}", base_url.as_deref().unwrap_or("<none>"));

    Ok(QuerySession::open(&config, base_url.as_deref(), root).await?)
}
