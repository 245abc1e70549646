//! Reporter CLI
//!
//! Command-line client for a running reporter API:
//! - Inspect the store and configured territories
//! - Count, aggregate and list messages
//! - Follow a streamed time series
//! - Print a default config file

use clap::{Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reporter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query harvested territories through the reporter API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:2345", global = true)]
    pub api_url: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

/// Time window shared by the territory commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Window {
    /// Start day (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,
    /// End day (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show store and server status
    Info,

    /// List configured territories
    Territories,

    /// Count rows of a series
    Count {
        territory: String,
        series: String,
        /// Field compared against --value
        field: String,
        #[command(flatten)]
        window: Window,
        #[arg(short, long)]
        network: Option<String>,
        /// Only count rows where the field equals this value
        #[arg(short, long)]
        value: Option<String>,
    },

    /// Grouped counts for one or more fields
    Aggregate {
        territory: String,
        series: String,
        /// Fields, comma-separated (e.g. contributor_lang,LOWER(tag))
        #[arg(long)]
        fields: String,
        #[command(flatten)]
        window: Window,
        #[arg(short, long)]
        limit: Option<u64>,
        #[arg(short, long)]
        skip: Option<u64>,
    },

    /// Top-N report (images, videos, audio, links, keywords, hashtags, locations)
    Top {
        kind: String,
        territory: String,
        #[command(flatten)]
        window: Window,
        #[arg(short, long)]
        limit: Option<u64>,
        #[arg(short, long)]
        skip: Option<u64>,
        /// Geohash prefix length for locations
        #[arg(short, long)]
        precision: Option<i64>,
    },

    /// List messages, newest first
    Messages {
        territory: String,
        #[command(flatten)]
        window: Window,
        #[arg(short, long)]
        network: Option<String>,
        #[arg(short, long)]
        limit: Option<u64>,
        #[arg(short, long)]
        skip: Option<u64>,
        /// f, m or u
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        lang: Option<String>,
        #[arg(long)]
        country: Option<String>,
        /// Geohash prefix
        #[arg(long)]
        geohash: Option<String>,
        /// Only questions
        #[arg(long)]
        questions: bool,
    },

    /// Counts per time window, printed as they arrive
    Timeseries {
        territory: String,
        series: String,
        field: String,
        #[command(flatten)]
        window: Window,
        /// Window width in minutes
        #[arg(short, long, default_value = "60")]
        resolution: i64,
        #[arg(short, long)]
        network: Option<String>,
        #[arg(short, long)]
        value: Option<String>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let api = cli.api_url.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Info => {
            let info = match client.get(format!("{}/database/info", api)).send().await {
                Ok(resp) => resp.json::<serde_json::Value>().await?,
                Err(e) => {
                    eprintln!("Cannot connect to reporter API at {}", api);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the reporter server is running:");
                    eprintln!("  cargo run --bin reporter");
                    std::process::exit(1);
                }
            };
            let health = get_json(&client, &format!("{}/health", api), &[]).await?;

            if cli.format == Format::Json {
                let both = serde_json::json!({ "database": info["data"], "health": health });
                println!("{}", serde_json::to_string_pretty(&both)?);
            } else {
                println!("Reporter v{}", health["version"].as_str().unwrap_or("unknown"));
                println!();
                println!("Status: {}", health["status"].as_str().unwrap_or("unknown"));
                println!(
                    "Store:  {} (access: {})",
                    info["data"]["type"].as_str().unwrap_or("-"),
                    info["data"]["hasAccess"].as_bool().unwrap_or(false)
                );
                if let Some(uptime) = health["uptime_seconds"].as_u64() {
                    println!("Uptime: {}", format_duration(uptime));
                }
            }
        }

        Commands::Territories => {
            let body = get_json(&client, &format!("{}/territory/list", api), &[]).await?;

            if cli.format == Format::Json {
                println!("{}", serde_json::to_string_pretty(&body["data"])?);
            } else {
                let territories = body["data"]["territories"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default();

                if territories.is_empty() {
                    println!("No territories configured.");
                } else {
                    println!("{:<20} {:<25} {}", "Name", "Networks", "Keywords");
                    println!("{}", "-".repeat(70));
                    for territory in territories {
                        println!(
                            "{:<20} {:<25} {}",
                            territory["name"].as_str().unwrap_or("-"),
                            join_strings(&territory["networks"]),
                            join_strings(&territory["keywords"])
                        );
                    }
                }
            }
        }

        Commands::Count {
            territory,
            series,
            field,
            window,
            network,
            value,
        } => {
            let url = format!("{}/territory/count/{}/{}/{}", api, territory, series, field);
            let query = query_pairs(&[
                ("from", window.from),
                ("to", window.to),
                ("network", network),
                ("fieldValue", value),
            ]);
            let body = get_json(&client, &url, &query).await?;

            if cli.format == Format::Json {
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("{}", body["data"]["count"].as_u64().unwrap_or(0));
            }
        }

        Commands::Aggregate {
            territory,
            series,
            fields,
            window,
            limit,
            skip,
        } => {
            let url = format!("{}/territory/aggregate/{}/{}", api, territory, series);
            let query = query_pairs(&[
                ("from", window.from),
                ("to", window.to),
                ("fields", Some(fields)),
                ("limit", limit.map(|l| l.to_string())),
                ("skip", skip.map(|s| s.to_string())),
            ]);
            let body = get_json(&client, &url, &query).await?;
            print_aggregate(&body, cli.format)?;
        }

        Commands::Top {
            kind,
            territory,
            window,
            limit,
            skip,
            precision,
        } => {
            let url = format!("{}/territory/top/{}/{}", api, kind, territory);
            let query = query_pairs(&[
                ("from", window.from),
                ("to", window.to),
                ("limit", limit.map(|l| l.to_string())),
                ("skip", skip.map(|s| s.to_string())),
                ("precision", precision.map(|p| p.to_string())),
            ]);
            let body = get_json(&client, &url, &query).await?;
            print_aggregate(&body, cli.format)?;
        }

        Commands::Messages {
            territory,
            window,
            network,
            limit,
            skip,
            gender,
            lang,
            country,
            geohash,
            questions,
        } => {
            let url = format!("{}/territory/messages/{}", api, territory);
            let query = query_pairs(&[
                ("from", window.from),
                ("to", window.to),
                ("network", network),
                ("limit", limit.map(|l| l.to_string())),
                ("skip", skip.map(|s| s.to_string())),
                ("gender", gender),
                ("lang", lang),
                ("country", country),
                ("geohash", geohash),
                ("questions", questions.then(|| "1".to_string())),
            ]);
            let body = get_json(&client, &url, &query).await?;

            if cli.format == Format::Json {
                println!("{}", serde_json::to_string_pretty(&body["data"])?);
            } else {
                let data = &body["data"];
                let messages = data["messages"].as_array().cloned().unwrap_or_default();

                println!("{:<20} {:<10} {:<16} {}", "Time", "Network", "Contributor", "Message");
                println!("{}", "-".repeat(80));
                for message in &messages {
                    println!(
                        "{:<20} {:<10} {:<16} {}",
                        message["time"].as_str().unwrap_or("-"),
                        message["network"].as_str().unwrap_or("-"),
                        message["contributorScreenName"].as_str().unwrap_or("-"),
                        message["message"].as_str().unwrap_or("")
                    );
                }
                println!();
                println!(
                    "{} of {} (skip {})",
                    messages.len(),
                    data["total"].as_u64().unwrap_or(0),
                    data["skip"].as_u64().unwrap_or(0)
                );
            }
        }

        Commands::Timeseries {
            territory,
            series,
            field,
            window,
            resolution,
            network,
            value,
        } => {
            let url = format!(
                "{}/territory/timeseries/count/{}/{}/{}",
                api, territory, series, field
            );
            let query = query_pairs(&[
                ("from", window.from),
                ("to", window.to),
                ("resolution", Some(resolution.to_string())),
                ("network", network),
                ("fieldValue", value),
            ]);

            let response = client.get(&url).query(&query).send().await?;
            if !response.status().is_success() {
                fail(response).await;
            }

            if cli.format == Format::Table {
                println!("{:<20} {:<20} {}", "From", "To", "Count");
                println!("{}", "-".repeat(50));
            }

            let mut pending = Vec::new();
            let mut chunks = response.bytes_stream();
            while let Some(chunk) = chunks.next().await {
                pending.extend_from_slice(&chunk?);
                while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = pending.drain(..=pos).collect();
                    print_window(&line, cli.format)?;
                }
            }
            if !pending.is_empty() {
                print_window(&pending, cli.format)?;
            }
        }

        Commands::Config { output } => {
            let config = harvest_reporter::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// Query string pairs for the values that are set
fn query_pairs(pairs: &[(&'static str, Option<String>)]) -> Vec<(&'static str, String)> {
    pairs
        .iter()
        .filter_map(|(key, value)| value.clone().map(|v| (*key, v)))
        .collect()
}

async fn get_json(
    client: &reqwest::Client,
    url: &str,
    query: &[(&'static str, String)],
) -> CliResult<serde_json::Value> {
    let response = client.get(url).query(query).send().await?;

    if !response.status().is_success() {
        fail(response).await;
    }

    Ok(response.json().await?)
}

/// Print the API error and exit
async fn fail(response: reqwest::Response) -> ! {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| body["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(text);

    eprintln!("Request failed ({}): {}", status, message);
    std::process::exit(1);
}

fn print_aggregate(body: &serde_json::Value, format: Format) -> CliResult<()> {
    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(&body["data"])?);
        return Ok(());
    }

    let data = &body["data"];
    if data["totalFailed"].as_bool().unwrap_or(false) {
        println!("Total: unavailable (query failed)");
    } else {
        println!("Total: {}", data["total"].as_u64().unwrap_or(0));
    }

    for field in data["aggregate"].as_array().cloned().unwrap_or_default() {
        println!();
        println!(
            "{} ({} distinct)",
            field["field"].as_str().unwrap_or("-"),
            field["distinct"].as_u64().unwrap_or(0)
        );
        println!("{}", "-".repeat(60));
        for entry in field["counts"].as_array().cloned().unwrap_or_default() {
            println!(
                "{:<50} {}",
                entry["value"].as_str().unwrap_or(""),
                entry["count"].as_u64().unwrap_or(0)
            );
        }
    }

    if data["skipped"].is_array() {
        println!();
        println!("Skipped (query failed): {}", join_strings(&data["skipped"]));
    }

    Ok(())
}

fn print_window(line: &[u8], format: Format) -> CliResult<()> {
    let line = std::str::from_utf8(line)?.trim();
    if line.is_empty() {
        return Ok(());
    }

    let window: serde_json::Value = serde_json::from_str(line)?;
    if let Some(message) = window["error"]["message"].as_str() {
        eprintln!("Time series stopped: {}", message);
        std::process::exit(1);
    }

    match format {
        Format::Json => println!("{}", line),
        Format::Table => println!(
            "{:<20} {:<20} {}",
            window["timeFrom"].as_str().unwrap_or("-"),
            window["timeTo"].as_str().unwrap_or("-"),
            window["count"].as_u64().unwrap_or(0)
        ),
    }

    Ok(())
}

fn join_strings(values: &serde_json::Value) -> String {
    values
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_skip_unset() {
        let pairs = query_pairs(&[
            ("from", Some("2014-10-01".to_string())),
            ("to", None),
            ("questions", true.then(|| "1".to_string())),
        ]);

        assert_eq!(
            pairs,
            vec![("from", "2014-10-01".to_string()), ("questions", "1".to_string())]
        );
    }

    #[test]
    fn test_parse_timeseries_command() {
        let cli = Cli::parse_from([
            "reporter",
            "--format",
            "json",
            "timeseries",
            "north",
            "messages",
            "network",
            "--from",
            "2014-10-01",
            "--resolution",
            "720",
        ]);

        assert_eq!(cli.format, Format::Json);
        match cli.command {
            Commands::Timeseries { window, resolution, .. } => {
                assert_eq!(window.from.as_deref(), Some("2014-10-01"));
                assert_eq!(resolution, 720);
            }
            _ => panic!("expected timeseries"),
        }
    }

    #[test]
    fn test_join_strings() {
        let value = serde_json::json!(["twitter", "facebook"]);
        assert_eq!(join_strings(&value), "twitter, facebook");
        assert_eq!(join_strings(&serde_json::Value::Null), "");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(3661), "1h 1m");
        assert_eq!(format_duration(90000), "1d 1h");
    }
}
