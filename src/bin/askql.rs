//! askql CLI: run the question pipeline from a terminal.

use anyhow::{Context, Result};
use askql::config::{expand_path, DatabaseConfig, LlmConfig};
use askql::telemetry::init_tracing;
use askql::{ChartSeries, Config, Pipeline, ResponsePayload, ResultTable};
use clap::{Parser, Subcommand};
use colored::*;

#[derive(Parser)]
#[command(name = "askql")]
#[command(about = "Ask questions about a SQL database in plain language", long_about = None)]
struct Cli {
    /// Config file (JSON or YAML; default: ~/.askql/config.{json,yaml})
    #[arg(long, global = true)]
    config: Option<String>,

    /// Database service URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Local SQLite database file (instead of the database service)
    #[arg(long, global = true)]
    sqlite: Option<String>,

    /// Language-model service URL
    #[arg(long, global = true)]
    llm_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Reject generated SQL that is not a plain query
    #[arg(long, global = true)]
    read_only: bool,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question and show the SQL, rows and chart
    Ask {
        /// Natural-language question
        question: String,

        /// Print the response payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the discovered schema
    Schema,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        config.apply_env();

        if let Some(url) = &self.database_url {
            config.database = DatabaseConfig::Http { url: url.clone() };
        }
        if let Some(path) = &self.sqlite {
            config.database = DatabaseConfig::Sqlite {
                path: expand_path(path),
            };
        }
        if let Some(url) = &self.llm_url {
            config.llm = LlmConfig::Nl2sql { url: url.clone() };
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = secs;
        }
        if self.read_only {
            config.read_only = true;
        }
        if self.log_json {
            config.telemetry.json = true;
        }
        Ok(config)
    }
}

fn print_table(table: &ResultTable) {
    if table.columns().is_empty() {
        println!("{}", "(statement returned no columns)".dimmed());
        return;
    }

    let widths: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            table
                .column_values(i)
                .map(|v| v.to_string().chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = table
        .columns()
        .iter()
        .zip(&widths)
        .map(|(name, w)| format!("{:<w$}", name, w = *w))
        .collect();
    println!("{}", header.join(" | ").bold());
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );

    for row in table.rows() {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(value, w)| format!("{:<w$}", value.to_string(), w = *w))
            .collect();
        println!("{}", cells.join(" | "));
    }
    println!("{}", format!("({} rows)", table.row_count()).dimmed());
}

fn print_chart(chart: &ChartSeries) {
    if chart.is_empty() {
        return;
    }

    let max = chart.values().iter().cloned().fold(0.0_f64, f64::max);
    let label_width = chart.labels().iter().map(|l| l.chars().count()).max().unwrap_or(0);

    println!("\n{}", "Chart:".bold());
    for (label, value) in chart.iter() {
        let bar = if max > 0.0 {
            ((value / max) * 40.0).round().max(0.0) as usize
        } else {
            0
        };
        println!(
            "  {:<w$} {} {}",
            label,
            "█".repeat(bar).cyan(),
            value,
            w = label_width
        );
    }
}

fn print_payload(payload: &ResponsePayload) {
    if let Some(sql) = payload.sql() {
        println!("{}", "SQL:".bold());
        println!("  {}\n", sql.as_str().green());
    }

    if let Some(error) = payload.error() {
        println!("{} {}", "✗".red(), error.red());
        return;
    }

    if let Some(table) = payload.result() {
        print_table(table);
    }
    if let Some(chart) = payload.chart() {
        print_chart(chart);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;
    let _guard = init_tracing("askql", &config.telemetry)?;

    let pipeline = Pipeline::from_config(&config).context("failed to build pipeline")?;

    match &cli.command {
        Commands::Ask { question, json } => {
            let payload = pipeline.handle_form(Some(question.as_str())).await?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_payload(&payload);
            }

            if payload.is_error() {
                std::process::exit(1);
            }
        }

        Commands::Schema => {
            let schema = pipeline.introspector().try_fetch_schema().await?;
            if schema.is_empty() {
                println!("{}", "No tables found".yellow());
            }
            for line in schema.to_text().as_str().lines() {
                match line.strip_prefix("Table: ") {
                    Some(name) => println!("{} {}", "Table:".bold(), name.green()),
                    None => println!("{}", line),
                }
            }
        }
    }

    Ok(())
}
