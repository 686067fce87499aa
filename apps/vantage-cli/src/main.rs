use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value as JsonValue};
use vantage_core::{config_schema_json, AdvisoryRuntime, Config, NavigationRequest};
use vantage_protocol::{InsightResponse, PersonaTag, PercentileStats};

#[derive(Debug, Parser)]
#[command(
    name = "vantage",
    version,
    about = "Persona-aware navigation telemetry and advisory insights"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "VANTAGE_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Overrides the state directory from config and environment
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
    /// Navigation URL used for persona resolution (e.g. /orders?persona=operator)
    #[arg(long, global = true)]
    url: Option<String>,
    /// Print JSON instead of a human summary
    #[arg(long, default_value_t = false, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the active persona, or persist a new one
    Persona {
        #[arg(long)]
        set: Option<String>,
    },
    /// Evaluate insights for a view under the active persona
    Insights {
        #[arg(long)]
        view: String,
        /// Extra request context as key=value; values that parse as JSON are kept typed
        #[arg(long = "context", value_name = "KEY=VALUE")]
        context: Vec<String>,
    },
    /// Record one navigation: start marker, optional delay, view ready
    Navigate {
        #[arg(long)]
        view: String,
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Navigation timing percentiles
    Stats {
        #[arg(long, default_value_t = false)]
        by_view: bool,
    },
    /// Clear recorded navigation timings
    Reset,
    /// Recent advisory calls, newest first
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Clear the advisory log
    AuditClear,
    /// Print the configuration JSON schema
    ConfigSchema,
}

#[tokio::main]
async fn main() -> Result<()> {
    vantage_logging::init();
    let cli = Cli::parse();

    if let Command::ConfigSchema = cli.command {
        let schema = config_schema_json()?;
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.state_dir.as_ref() {
        config.state.dir = Some(dir.display().to_string());
    }
    let runtime = AdvisoryRuntime::new(config);
    let navigation = cli
        .url
        .as_deref()
        .map(NavigationRequest::from_url)
        .unwrap_or_default();

    match cli.command {
        Command::Persona { set } => {
            let persona = match set {
                Some(raw) => {
                    let persona = parse_persona(&raw)?;
                    runtime.persona().select(persona);
                    persona
                }
                None => runtime.persona().resolve(&navigation),
            };
            if cli.json {
                println!("{}", json!({ "persona": persona }));
            } else {
                println!("{} ({})", persona.display_label(), persona.as_str());
            }
        }
        Command::Insights { view, context } => {
            let context = parse_context(&context)?;
            runtime.persona().resolve(&navigation);
            let response = runtime.request_insights(&view, context).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_insights(&view, runtime.persona().current(), &response);
            }
        }
        Command::Navigate { view, delay_ms } => {
            runtime.navigate(&view, &navigation);
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            let sample = runtime.recorder().record_view_ready(&view);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&sample)?);
            } else {
                println!("{} ready in {:.1} ms", sample.view, sample.elapsed_ms);
            }
        }
        Command::Stats { by_view } => {
            let overall = runtime.reporter().compute_stats();
            if by_view {
                let views = runtime.reporter().stats_by_view();
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "overall": overall, "views": views }))?
                    );
                } else {
                    println!("{}", stats_line("overall", &overall));
                    for (view, stats) in &views {
                        println!("{}", stats_line(view, stats));
                    }
                }
            } else if cli.json {
                println!("{}", serde_json::to_string_pretty(&overall)?);
            } else {
                println!("{}", stats_line("overall", &overall));
            }
        }
        Command::Reset => {
            runtime.reporter().reset();
            if !cli.json {
                println!("navigation timings cleared");
            }
        }
        Command::Audit { limit } => {
            let entries: Vec<_> = runtime.audit().read_all().into_iter().take(limit).collect();
            let summary = runtime.audit().summary();
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "summary": summary, "entries": entries }))?
                );
            } else {
                println!(
                    "{} call(s), {} failed ({:.0}%), p50 {:.1} ms, p95 {:.1} ms",
                    summary.total,
                    summary.failures,
                    summary.error_rate * 100.0,
                    summary.latency_p50_ms,
                    summary.latency_p95_ms
                );
                for entry in entries {
                    let status = if entry.success { "ok" } else { "fail" };
                    println!(
                        "{}  {:<4} {:<8} {:<12} {:>8.1} ms  {}",
                        entry.captured_at.format("%Y-%m-%d %H:%M:%S"),
                        status,
                        entry.persona.as_str(),
                        entry.view,
                        entry.latency_ms,
                        entry.error.as_deref().unwrap_or("")
                    );
                }
            }
        }
        Command::AuditClear => {
            runtime.audit().clear();
            if !cli.json {
                println!("advisory log cleared");
            }
        }
        // printed before the runtime is built
        Command::ConfigSchema => {}
    }
    Ok(())
}

fn parse_persona(raw: &str) -> Result<PersonaTag> {
    match PersonaTag::from_slug(raw) {
        Some(persona) => Ok(persona),
        None => {
            let known: Vec<&str> = PersonaTag::ALL.iter().map(|p| p.as_str()).collect();
            bail!("unknown persona {raw:?} (expected one of {})", known.join(", "))
        }
    }
}

fn parse_context(pairs: &[String]) -> Result<Map<String, JsonValue>> {
    let mut out = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("context entry {pair:?} is not KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("context entry {pair:?} has an empty key");
        }
        if key == "view" || key == "persona" {
            bail!("context key {key:?} is reserved");
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::from(value));
        out.insert(key.to_string(), value);
    }
    Ok(out)
}

fn stats_line(label: &str, stats: &PercentileStats) -> String {
    format!(
        "{label:<12} p50 {:>8.1} ms  p95 {:>8.1} ms  n={}",
        stats.p50, stats.p95, stats.count
    )
}

fn print_insights(view: &str, persona: PersonaTag, response: &InsightResponse) {
    if let Some(err) = response.error.as_deref() {
        println!("{view} [{}]: unavailable: {err}", persona.as_str());
        return;
    }
    if response.insights.is_empty() {
        println!("{view} [{}]: no insights", persona.as_str());
        return;
    }
    for insight in &response.insights {
        println!(
            "[{}] {} ({:.0}%)\n    {}",
            insight.severity.as_str(),
            insight.title,
            insight.confidence * 100.0,
            insight.subtitle
        );
        for action in &insight.actions {
            println!("    -> {} ({})", action.label, action.action_id);
        }
    }
    if let Some(first) = response.insights.first() {
        println!(
            "via {} in {:.1} ms",
            first.audit.provider_id, first.audit.latency_ms
        );
    }
}
