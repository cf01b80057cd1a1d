//! # Till Host
//!
//! CLI host wiring the whole stack together: store profiles → migrations →
//! store extension → transaction engine → tool executor → a line-oriented
//! REPL an operator (or an orchestrator harness) can drive.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  till-host [index.toml] [store-id]                                     │
//! │                                                                         │
//! │  load profile index ── failure ──► exit 2                              │
//! │       │  no profiles ────────────► exit 3                              │
//! │       ▼                                                                 │
//! │  pick store (argument or first profile)                                │
//! │       ▼                                                                 │
//! │  run migrations on the store database (fail fast → exit 1)            │
//! │       ▼                                                                 │
//! │  activate extension, build engine + client + tool registry             │
//! │       ▼                                                                 │
//! │  REPL:  <tool> key=value ...   /   help   /   quit                     │
//! │       ▼                                                                 │
//! │  EOF or quit ──► close session ──► exit 0                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use till_core::{KernelError, SessionManager, StoreProfile, TransactionEngine};
use till_store::{load_profiles, reference_migrations, run_migrations, SqlStoreExtension, StoreDb, StoreDbConfig};
use till_tools::{register_reference_tools, KernelClient, ToolContext, ToolExecutor};

const EXIT_PROFILE_LOAD: i32 = 2;
const EXIT_NO_PROFILES: i32 = 3;

#[tokio::main]
async fn main() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let index_path = PathBuf::from(args.next().unwrap_or_else(|| "stores/stores.toml".to_string()));
    let store_id = args.next();

    let profiles = match load_profiles(&index_path) {
        Ok(profiles) => profiles,
        Err(e) => {
            error!(index = %index_path.display(), error = %e, "profile load failed");
            exit(EXIT_PROFILE_LOAD);
        }
    };
    if profiles.is_empty() {
        error!(index = %index_path.display(), "no store profiles discovered");
        exit(EXIT_NO_PROFILES);
    }

    let profile = match select_profile(profiles, store_id.as_deref()) {
        Ok(profile) => profile,
        Err(message) => {
            error!("{message}");
            exit(1);
        }
    };
    info!(store = %profile.store_id, name = %profile.display_name, "store selected");

    if let Err(e) = run(profile, &index_path).await {
        error!(error = %e, "host failed");
        exit(1);
    }
    exit(0);
}

fn select_profile(profiles: Vec<StoreProfile>, wanted: Option<&str>) -> Result<StoreProfile, String> {
    match wanted {
        None => Ok(profiles.into_iter().next().expect("profiles not empty")),
        Some(id) => profiles
            .into_iter()
            .find(|p| p.store_id.eq_ignore_ascii_case(id))
            .ok_or_else(|| format!("store '{}' not found in the profile index", id)),
    }
}

async fn run(profile: StoreProfile, index_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let database = profile.database.clone().ok_or_else(|| {
        KernelError::configuration_missing(
            format!("database for store '{}'", profile.store_id),
            "add a [database] section with a connection_string to the store profile",
        )
    })?;

    // Connection strings in profiles resolve relative to the index file.
    let base = index_path.parent().unwrap_or_else(|| Path::new("."));
    let db_path = base.join(&database.connection_string);

    let migrations = reference_migrations(profile.store_id.clone());
    let outcome = run_migrations(&db_path, &migrations).await?;
    info!(
        schema_version = outcome.schema_version,
        applied = outcome.applied.len(),
        "store database ready"
    );

    let db = StoreDb::open(StoreDbConfig::new(&db_path)).await?;
    let extension = Arc::new(SqlStoreExtension::activate(profile, db).await?);

    let sessions = Arc::new(SessionManager::new());
    let engine = Arc::new(TransactionEngine::new(
        sessions,
        Arc::new(extension.payment_rules()),
    ));
    let client = Arc::new(KernelClient::new(engine));

    let terminal_id = std::env::var("TILL_TERMINAL").unwrap_or_else(|_| "TERM1".to_string());
    let operator_id = std::env::var("TILL_OPERATOR").unwrap_or_else(|_| "OP1".to_string());
    let session = client.create_session(&terminal_id, &operator_id).await?;
    info!(session = %session, terminal = %terminal_id, operator = %operator_id, "session open");

    let ctx = Arc::new(ToolContext::new(client.clone(), extension, session.clone()));
    let mut executor = ToolExecutor::new();
    register_reference_tools(&mut executor, ctx);

    repl(&executor).await;

    client.close_session(&session).await?;
    info!("session closed, goodbye");
    Ok(())
}

async fn repl(executor: &ToolExecutor) {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    println!("till ready. 'help' lists tools, 'quit' exits.");
    loop {
        print!("till> ");
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        if line == "help" {
            for def in executor.definitions() {
                let params: Vec<String> = def
                    .parameters
                    .iter()
                    .map(|p| {
                        if p.required {
                            format!("{}=<{:?}>", p.name, p.param_type)
                        } else {
                            format!("[{}=<{:?}>]", p.name, p.param_type)
                        }
                    })
                    .collect();
                println!("  {} {} - {}", def.name, params.join(" "), def.description);
            }
            continue;
        }

        let (tool, bag) = match parse_invocation(line) {
            Ok(parsed) => parsed,
            Err(message) => {
                println!("! {message}");
                continue;
            }
        };

        match executor.execute_tool(tool, &bag).await {
            Ok(reply) => println!("{}", reply.text),
            Err(e) => println!("! {e}"),
        }
    }
}

/// Parses `tool key=value key=value`. Values stay strings; the executor's
/// declared types drive coercion.
fn parse_invocation(line: &str) -> Result<(&str, HashMap<String, Value>), String> {
    let mut parts = line.split_whitespace();
    let tool = parts.next().ok_or("empty invocation")?;

    let mut bag = HashMap::new();
    for part in parts {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{}'", part))?;
        bag.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok((tool, bag))
}
