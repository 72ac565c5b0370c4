//! deployctl - Entry Point
//!
//! Operator console for deployments gated by pull-request review: builds
//! deployment requests, follows them to the cluster and works the approval
//! queue.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use colored::{ColoredString, Colorize};
use tracing::{error, info};

use deploy_console::app::options::AppOptions;
use deploy_console::app::run::{self, parse_list, parse_pairs, DeployArgs};
use deploy_console::app::state::AppState;
use deploy_console::authn::session::{SessionAuth, TOKEN_ENV_VAR};
use deploy_console::logs::{init_logging, LogLevel, LogOptions};
use deploy_console::models::deployment::{
    DeploymentStatus, Env, NamespaceType, SubmissionReceipt,
};
use deploy_console::storage::layout::StorageLayout;
use deploy_console::storage::settings::Settings;
use deploy_console::utils::version_info;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to render version: {e}"),
        }
        return;
    }

    if let Err(e) = dispatch(&cli_args).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn dispatch(cli_args: &HashMap<String, String>) -> anyhow::Result<()> {
    let layout = StorageLayout::default();
    let settings_file = match cli_args.get("config") {
        Some(path) => PathBuf::from(path),
        None => layout.settings_file(),
    };

    // Write a default settings file and exit
    if cli_args.contains_key("init-config") {
        Settings::default()
            .save(&settings_file)
            .await
            .context("writing settings file")?;
        println!("Settings written to {}", settings_file.display());
        return Ok(());
    }

    let mut settings = Settings::load(&settings_file)
        .await
        .with_context(|| format!("reading {}", settings_file.display()))?;
    if let Some(level) = cli_args.get("log-level") {
        settings.log_level = level.parse::<LogLevel>().map_err(|e| anyhow!(e))?;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        json_format: settings.log_json,
        log_dir: settings.log_to_file.then(|| layout.logs_dir()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let auth = Arc::new(SessionAuth::from_env());
    if !auth.is_authorized() {
        info!("No session token; set {} to authorize requests", TOKEN_ENV_VAR);
    }

    let options = AppOptions::from_settings(&settings);
    info!("Running deployctl with options: {:?}", options);
    let state = AppState::init(&options, auth)?;

    let result = run_command(&state, cli_args).await;
    state.shutdown();
    result
}

async fn run_command(state: &AppState, cli_args: &HashMap<String, String>) -> anyhow::Result<()> {
    if cli_args.contains_key("services") {
        for service in run::list_services(state).await? {
            println!("{}\t{}", service.name, service.envs.join(","));
        }
        return Ok(());
    }

    if let Some(service) = cli_args.get("schema") {
        let schema = run::show_schema(state, service).await;
        println!("Variables:");
        for key in &schema.keys {
            println!("  {}", key);
        }
        println!("Suggested tags: {}", schema.suggested_tags.join(", "));
        return Ok(());
    }

    if cli_args.contains_key("deploy") {
        let args = deploy_args(cli_args)?;
        let receipt = run::deploy(state, &args).await?;
        println!("Pull request: {}", receipt.pr_reference);
        println!("Tracking id:  {}", receipt.tracking_id);
        return watch(state, &receipt).await;
    }

    if let Some(tracking_id) = cli_args.get("watch") {
        let receipt = SubmissionReceipt {
            pr_reference: cli_args.get("pr").cloned().unwrap_or_default(),
            tracking_id: tracking_id.clone(),
        };
        return watch(state, &receipt).await;
    }

    if cli_args.contains_key("approvals") {
        for record in run::list_approvals(state).await? {
            println!(
                "{}\t{}\t{}\t{}\t{}",
                record.id, record.service, record.env, record.tag, record.pr_reference
            );
        }
        return Ok(());
    }

    if let Some(id) = cli_args.get("approve") {
        run::decide(state, id, true).await?;
        println!("Approved {}", id);
        return Ok(());
    }

    if let Some(id) = cli_args.get("reject") {
        run::decide(state, id, false).await?;
        println!("Rejected {}", id);
        return Ok(());
    }

    Err(anyhow!(
        "no command given; use --services, --schema=, --deploy, --watch=, --approvals, --approve= or --reject="
    ))
}

fn deploy_args(cli_args: &HashMap<String, String>) -> anyhow::Result<DeployArgs> {
    let required = |key: &str| {
        cli_args
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("--{} is required", key))
    };

    let env: Env = required("env")?.parse().map_err(|e: String| anyhow!(e))?;
    let namespace_type: NamespaceType = match cli_args.get("namespace") {
        Some(ns) => ns.parse().map_err(|e: String| anyhow!(e))?,
        None => NamespaceType::default(),
    };

    Ok(DeployArgs {
        service: required("service")?,
        tag: required("tag")?,
        env,
        namespace_type,
        vars: parse_pairs(cli_args.get("vars").map(String::as_str).unwrap_or(""))?,
        custom_vars: parse_pairs(cli_args.get("custom-vars").map(String::as_str).unwrap_or(""))?,
        secrets: parse_list(cli_args.get("secrets").map(String::as_str).unwrap_or("")),
    })
}

async fn watch(state: &AppState, receipt: &SubmissionReceipt) -> anyhow::Result<()> {
    let status = run::watch(
        state,
        receipt,
        |status| println!("Status: {}", paint(status)),
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Ctrl+C received, shutting down...");
        },
    )
    .await;
    println!("Last status: {}", paint(status));
    Ok(())
}

fn paint(status: DeploymentStatus) -> ColoredString {
    match status {
        DeploymentStatus::Synced => status.as_str().green().bold(),
        DeploymentStatus::Rejected | DeploymentStatus::Error => status.as_str().red().bold(),
        DeploymentStatus::Merged => status.as_str().cyan(),
        DeploymentStatus::Pending | DeploymentStatus::Approved => status.as_str().yellow(),
    }
}
