use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pd_assist::{
    app::App,
    client::ChatClient,
    config::{self, Config},
    handler,
    highlight::Highlighter,
    markup, tui, ui,
};

#[derive(Parser, Debug)]
#[command(name = "pd-assist")]
#[command(version)]
#[command(about = "Terminal chat client for Parkinson's disease treatment questions")]
struct Cli {
    /// Backend base URL (defaults to the config file, then http://127.0.0.1:5000)
    #[arg(long, env = "PD_ASSIST_URL", global = true)]
    base_url: Option<String>,

    /// Where to write logs while the chat view owns the terminal
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the medications the backend knows about
    Drugs,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
        /// Print the highlighted markup instead of plain text
        #[arg(long)]
        markup: bool,
    },
    /// Show side effects and resources for one medication
    Info {
        /// Medication name, as listed by `drugs`
        name: String,
    },
    /// Remember a backend URL in the config file
    SetUrl {
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.command.is_none(), cli.log_file.as_deref())?;

    let mut config = Config::load()?;

    if let Some(Commands::SetUrl { url }) = &cli.command {
        // Validate before persisting
        ChatClient::new(url)?;
        config.base_url = Some(url.clone());
        config.save()?;
        println!("Saved backend URL {url}");
        return Ok(());
    }

    let base_url = config.resolve_base_url(cli.base_url.as_deref());
    let client = ChatClient::new(&base_url)
        .with_context(|| format!("invalid backend URL {base_url:?}"))?;
    let highlighter =
        Highlighter::with_extra_terms(&config.extra_common_terms, &config.extra_severe_terms)
            .context("invalid side-effect term in config")?;

    tracing::info!(base_url = %client.base_url(), "starting");

    match cli.command {
        None => run_tui(client, highlighter).await,
        Some(Commands::Drugs) => list_drugs(&client).await,
        Some(Commands::Ask { question, markup }) => {
            ask_question(&client, &highlighter, &question, markup).await
        }
        Some(Commands::Info { name }) => show_drug_info(&client, &name).await,
        Some(Commands::SetUrl { .. }) => Ok(()),
    }
}

/// The chat view owns the terminal, so it logs to a file. One-shot commands
/// log warnings to stderr.
fn init_logging(to_file: bool, log_file: Option<&Path>) -> Result<()> {
    if !to_file {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .init();
        return Ok(());
    }

    let path = match log_file {
        Some(path) => path.to_path_buf(),
        None => config::data_dir()?.join("pd-assist.log"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("could not open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    Ok(())
}

async fn run_tui(client: ChatClient, highlighter: Highlighter) -> Result<()> {
    let transcript_dir = config::data_dir()?.join("transcripts");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = App::new(client, highlighter, transcript_dir);
    app.start_catalog_fetch();

    let mut events = tui::EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            let Some(event) = events.next().await else {
                break;
            };
            handler::handle_event(&mut app, event);
            app.poll_tasks().await;
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn list_drugs(client: &ChatClient) -> Result<()> {
    let entries = client.fetch_catalog().await?;
    if entries.is_empty() {
        println!("No medications found");
        return Ok(());
    }
    for entry in entries {
        println!("  • {}", entry.name);
    }
    Ok(())
}

async fn ask_question(
    client: &ChatClient,
    highlighter: &Highlighter,
    question: &str,
    as_markup: bool,
) -> Result<()> {
    let response = client.exchange(question.trim()).await?;

    if as_markup {
        println!("{}", highlighter.highlight_markup(&response));
    } else {
        let mut document = markup::parse(&response);
        highlighter.annotate(&mut document);
        println!("{}", document.plain_text());
    }
    Ok(())
}

async fn show_drug_info(client: &ChatClient, name: &str) -> Result<()> {
    let info = client.drug_info(name).await?;

    println!("{}", info.name);
    println!("{}", "=".repeat(info.name.chars().count()));

    for (label, effects) in [
        ("Common side effects", &info.common_side_effects),
        ("Severe side effects", &info.severe_side_effects),
    ] {
        if !effects.is_empty() {
            println!("\n{label}:");
            for effect in effects {
                println!("  • {effect}");
            }
        }
    }

    if !info.resources.is_empty() || !info.case_studies.is_empty() {
        println!("\nResources:");
        for resource in &info.resources {
            println!("  • {} ({})", resource.name, resource.url);
        }
        for case in &info.case_studies {
            println!("  • Case Study: {} ({})", case.title, case.url);
        }
    }
    Ok(())
}
