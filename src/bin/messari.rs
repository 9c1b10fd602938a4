//! Messari API playground CLI.
//!
//! Three operations over the endpoint registry: `list`, `describe` and
//! `call`. With no subcommand it drops into an interactive read-eval loop
//! over the same operations. `list` and `describe` work without an API key;
//! a client is only constructed when a call is actually dispatched.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use messari_api_client::{
    CallParams, EndpointDescriptor, EndpointRegistry, MessariClient, MessariError, pretty,
};

/// Responses longer than this are truncated on the terminal.
const DISPLAY_LIMIT: usize = 3000;

#[derive(Parser)]
#[command(
    name = "messari",
    version,
    about = "Explore and call Messari REST API endpoints"
)]
struct Cli {
    /// Messari API key; falls back to the MESSARI_API_KEY environment variable
    #[arg(long, global = true, env = "MESSARI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List registered endpoint keys
    List {
        /// Only show keys starting with this prefix (e.g. "assets.")
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Show the descriptor for one endpoint
    Describe {
        /// Endpoint key (e.g. "assets.list")
        key: String,
        /// Emit the descriptor as JSON
        #[arg(long)]
        json: bool,
    },
    /// Call an endpoint and pretty-print the response
    Call {
        /// Endpoint key (e.g. "assets.list")
        key: String,
        /// Path parameters as a JSON object
        #[arg(long)]
        path: Option<String>,
        /// Query parameters as a JSON object
        #[arg(long)]
        query: Option<String>,
        /// JSON body for non-GET endpoints
        #[arg(long)]
        body: Option<String>,
    },
}

/// Failures surfaced to the terminal with an `error[<label>]:` prefix.
enum CliError {
    /// Malformed command input (bad JSON argument, unknown REPL command)
    Usage(String),
    /// An error from the client library
    Client(MessariError),
}

impl CliError {
    fn label(&self) -> &'static str {
        match self {
            CliError::Usage(_) => "usage",
            CliError::Client(err) => err.label(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Client(err) => write!(f, "{err}"),
        }
    }
}

impl From<MessariError> for CliError {
    fn from(err: MessariError) -> Self {
        CliError::Client(err)
    }
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = EndpointRegistry::new();

    let result = match &cli.command {
        Some(Command::List { prefix }) => {
            list_endpoints(&registry, prefix.as_deref());
            Ok(())
        }
        Some(Command::Describe { key, json }) => describe_endpoint(&registry, key, *json),
        Some(Command::Call {
            key,
            path,
            query,
            body,
        }) => build_client(&cli, registry.clone()).and_then(|client| {
            call_endpoint(
                &client,
                key,
                path.as_deref(),
                query.as_deref(),
                body.as_deref(),
            )
        }),
        None => interactive(&cli, &registry),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &CliError) {
    eprintln!("error[{}]: {err}", err.label());
}

fn build_client(cli: &Cli, registry: EndpointRegistry) -> Result<MessariClient, CliError> {
    let mut builder = MessariClient::builder().registry(registry);
    if let Some(key) = &cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(base_url) = &cli.base_url {
        builder = builder.base_url(base_url);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

fn list_endpoints(registry: &EndpointRegistry, prefix: Option<&str>) {
    let keys: Vec<&str> = registry
        .keys()
        .filter(|key| prefix.is_none_or(|p| key.starts_with(p)))
        .collect();

    if keys.is_empty() {
        println!("No endpoints found (prefix filter may be too narrow).");
        return;
    }

    println!("Available Messari endpoints:");
    for key in keys {
        // Keys come from the registry itself, so the lookup cannot miss.
        if let Ok(descriptor) = registry.get(key) {
            println!(" - {} [{} {}]", key, descriptor.method, descriptor.path);
            println!("   {}", descriptor.description);
        }
    }
}

fn describe_endpoint(registry: &EndpointRegistry, key: &str, json: bool) -> Result<(), CliError> {
    let descriptor = registry.describe(key)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(descriptor)
                .map_err(|e| CliError::Usage(format!("could not render descriptor: {e}")))?
        );
        return Ok(());
    }
    print_descriptor(descriptor);
    Ok(())
}

fn print_descriptor(descriptor: &EndpointDescriptor) {
    println!("Endpoint: {}", descriptor.key);
    println!("Method  : {}", descriptor.method);
    println!("Path    : {}", descriptor.path);
    println!("Path params : {}", join_or_none(descriptor.path_params));
    println!("Query params: {}", join_or_none(descriptor.query_params));
    println!();
    println!("{}", descriptor.description);
}

fn join_or_none(names: &[&str]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

fn call_endpoint(
    client: &MessariClient,
    key: &str,
    path_json: Option<&str>,
    query_json: Option<&str>,
    body_json: Option<&str>,
) -> Result<(), CliError> {
    let mut params = CallParams::new()
        .paths(parse_json_object("--path", path_json)?)
        .queries(parse_json_object("--query", query_json)?);
    if let Some(raw) = body_json {
        let body: Value = serde_json::from_str(raw)
            .map_err(|e| CliError::Usage(format!("--body is not valid JSON: {e}")))?;
        params = params.body(body);
    }

    let data = client.call(key, &params)?;
    print_payload(&data);
    Ok(())
}

fn print_payload(data: &Value) {
    let rendered = pretty(data);
    if rendered.len() <= DISPLAY_LIMIT {
        println!("{rendered}");
        return;
    }
    let mut end = DISPLAY_LIMIT;
    while !rendered.is_char_boundary(end) {
        end -= 1;
    }
    println!("{}", &rendered[..end]);
    println!("... (truncated)");
}

/// Parse an optional JSON-object argument into key/value pairs.
fn parse_json_object(label: &str, raw: Option<&str>) -> Result<Map<String, Value>, CliError> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CliError::Usage(format!("{label} is not valid JSON: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(CliError::Usage(format!(
            "{label} must be a JSON object (e.g. '{{\"key\": \"value\"}}'), got: {other}"
        ))),
    }
}

fn interactive(cli: &Cli, registry: &EndpointRegistry) -> Result<(), CliError> {
    println!("Messari playground. Commands: list [prefix], describe <key>, call <key>, help, quit");

    let stdin = io::stdin();
    let mut client: Option<MessariClient> = None;

    loop {
        print!("messari> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break; // EOF
        }
        let mut parts = line.split_whitespace();

        match parts.next() {
            None => {}
            Some("quit") | Some("exit") => break,
            Some("help") => {
                println!("  list [prefix]   list endpoint keys, optionally filtered");
                println!("  describe <key>  show one endpoint's descriptor");
                println!("  call <key>      call an endpoint (prompts for parameters)");
                println!("  quit            leave the playground");
            }
            Some("list") => list_endpoints(registry, parts.next()),
            Some("describe") => match parts.next() {
                Some(key) => {
                    if let Err(err) = describe_endpoint(registry, key, false) {
                        report(&err);
                    }
                }
                None => report(&CliError::Usage("usage: describe <key>".to_string())),
            },
            Some("call") => {
                let Some(key) = parts.next() else {
                    report(&CliError::Usage("usage: call <key>".to_string()));
                    continue;
                };
                if let Err(err) = interactive_call(cli, registry, &mut client, key, &stdin) {
                    report(&err);
                }
            }
            Some(other) => {
                report(&CliError::Usage(format!(
                    "unknown command `{other}` (try `help`)"
                )));
            }
        }
    }
    Ok(())
}

fn interactive_call(
    cli: &Cli,
    registry: &EndpointRegistry,
    client: &mut Option<MessariClient>,
    key: &str,
    stdin: &io::Stdin,
) -> Result<(), CliError> {
    // Surface bad keys before prompting for parameters.
    registry.get(key)?;

    let path_json = prompt_line(stdin, "path params JSON (blank for none) > ")?;
    let query_json = prompt_line(stdin, "query params JSON (blank for none) > ")?;
    let body_json = prompt_line(stdin, "body JSON (blank for none) > ")?;

    if client.is_none() {
        *client = Some(build_client(cli, registry.clone())?);
    }
    if let Some(client) = client.as_ref() {
        call_endpoint(
            client,
            key,
            non_empty(&path_json),
            non_empty(&query_json),
            non_empty(&body_json),
        )?;
    }
    Ok(())
}

fn prompt_line(stdin: &io::Stdin, prompt: &str) -> Result<String, CliError> {
    print!("{prompt}");
    io::stdout().flush().ok();
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .map_err(|e| CliError::Usage(format!("could not read input: {e}")))?;
    Ok(line.trim().to_string())
}

fn non_empty(raw: &str) -> Option<&str> {
    if raw.is_empty() { None } else { Some(raw) }
}
