use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use prodclass_client::{ClassificationService, ClientConfig, HttpClassifier};
use prodclass_core::report::{EMPTY_GROUP, ReportFormat, generate_report, save_report};
use prodclass_core::{
    AttributePresenter, ErrorView, RenderedResult, RequestController, RequestState, SubmitError,
};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Level;
use url::Url;

// Helper functions for classify handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&String>,
    urls_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(urls_file_path) = urls_file {
        load_urls_from_file(urls_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.clone()])
    } else {
        Err("Either a URL or --urls-file must be provided".to_string())
    }
}

/// Load URLs from a file, one per line. Blank lines and `#` comments are skipped; validation is
/// left to the controller so bad lines are reported alongside the rest of the batch.
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let content = fs::read_to_string(&expanded)
        .map_err(|e| format!("Failed to read URLs file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(format!("No URLs found in {}", path.display()));
    }

    Ok(urls)
}

pub fn client_config(args: &ArgMatches) -> ClientConfig {
    let mut config = ClientConfig::default();
    if let Some(endpoint) = args.get_one::<Url>("endpoint") {
        config = config.with_endpoint(endpoint.as_str());
    }
    if let Some(timeout) = args.get_one::<u64>("timeout") {
        config = config.with_timeout(*timeout);
    }
    config
}

/// Installs the stderr log subscriber. Quiet by default; `--verbose` shows the request lifecycle.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

pub fn print_banner() {
    print_divider();
    println!("{}", "  PRODCLASS - product attribute classifier".bright_white().bold());
    print_divider();
    println!();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn build_controller(config: ClientConfig) -> Option<RequestController<HttpClassifier>> {
    match HttpClassifier::new(config) {
        Ok(classifier) => Some(RequestController::new(classifier)),
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            None
        }
    }
}

/// Submits `url` with a spinner bound to the controller's state until the outcome lands.
pub async fn submit_with_spinner<S: ClassificationService>(
    controller: &RequestController<S>,
    url: &str,
) -> Result<RequestState, SubmitError> {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut updates = controller.subscribe();
    let follow_state = async {
        while updates.changed().await.is_ok() {
            let message = describe_state(&updates.borrow_and_update());
            spinner.set_message(message);
        }
    };

    let submitted = tokio::select! {
        submitted = controller.submit(url) => submitted,
        _ = follow_state => Ok(()),
    };

    spinner.finish_and_clear();
    submitted.map(|_| controller.state())
}

/// One-line summary of a state, for spinners and the `state` command.
pub fn describe_state(state: &RequestState) -> String {
    match state {
        RequestState::Idle => "Idle - enter a product URL".to_string(),
        RequestState::Pending(url) => format!("Classifying {}", url),
        RequestState::Succeeded(result) => format!("Classified: {}", result.product_title),
        RequestState::Failed(message) => format!("Failed: {}", message),
    }
}

/// Prints a rendered result with coloured headings.
pub fn print_rendered(rendered: &RenderedResult) {
    println!();
    println!("{}", rendered.title.bright_white().bold());
    println!();

    for group in &rendered.groups {
        println!("{}", group.heading.bright_blue().bold());
        println!("{}", "─".repeat(group.heading.chars().count()).blue());
        if group.is_empty() {
            println!("  {}", EMPTY_GROUP.dimmed());
        }
        let width = group.name_width();
        for row in &group.rows {
            println!(
                "  {}  {}",
                format!("{:<width$}", row.name, width = width).cyan(),
                row.value
            );
        }
        println!();
    }
}

fn print_error_view(view: &ErrorView) {
    eprintln!("{}", view.render().red().bold());
}

/// Displays the terminal state of one submission. Returns `false` if it failed.
fn show_outcome(state: &RequestState, format: ReportFormat, output: Option<&PathBuf>) -> bool {
    if let Some(view) = ErrorView::from_state(state) {
        print_error_view(&view);
        return false;
    }

    let Some(result) = state.result() else {
        return false;
    };
    let rendered = AttributePresenter::new().render(result);

    if output.is_none() && format == ReportFormat::Text {
        print_rendered(&rendered);
        return true;
    }

    let report = match generate_report(&rendered, format) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} Failed to generate report: {}", "✗".red().bold(), e);
            return false;
        }
    };

    match output {
        Some(path) => match save_report(&report, path) {
            Ok(()) => {
                println!(
                    "{} Report saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                );
                true
            }
            Err(e) => {
                eprintln!(
                    "{} Failed to save report to {}: {}",
                    "✗".red().bold(),
                    path.display(),
                    e
                );
                false
            }
        },
        None => {
            print!("{}", report);
            true
        }
    }
}

pub async fn handle_classify(args: &ArgMatches) {
    let urls = match load_urls_from_source(
        args.get_one::<String>("URL"),
        args.get_one::<PathBuf>("urls-file"),
    ) {
        Ok(urls) => urls,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = args.get_one::<PathBuf>("output");
    if output.is_some() && urls.len() > 1 {
        eprintln!(
            "{} --output only applies to a single URL; reports will be printed instead",
            "⚠".yellow().bold()
        );
    }
    let output = output.filter(|_| urls.len() == 1);

    let Some(controller) = build_controller(client_config(args)) else {
        std::process::exit(1);
    };

    let mut failures = 0;
    for (idx, url) in urls.iter().enumerate() {
        if urls.len() > 1 {
            println!(
                "{} [{}/{}] {}",
                "→".blue(),
                idx + 1,
                urls.len(),
                url.bright_white()
            );
        }

        match submit_with_spinner(&controller, url).await {
            Ok(state) => {
                if !show_outcome(&state, format, output) {
                    failures += 1;
                }
            }
            Err(e) => {
                eprintln!("{} {}", "✗".red().bold(), e);
                failures += 1;
            }
        }
    }

    if urls.len() > 1 {
        println!(
            "{} {} classified, {} failed",
            "✓".green().bold(),
            urls.len() - failures,
            failures
        );
    }

    if failures > 0 {
        std::process::exit(1);
    }
}

/// A line typed into an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Empty,
    Help,
    State,
    Dismiss,
    Quit,
    Classify(String),
}

pub fn parse_session_command(line: &str) -> SessionCommand {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "" => SessionCommand::Empty,
        "help" | "?" => SessionCommand::Help,
        "state" | "status" => SessionCommand::State,
        "dismiss" | "clear" => SessionCommand::Dismiss,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        _ => SessionCommand::Classify(trimmed.to_string()),
    }
}

fn print_session_help() {
    println!("{}", "Commands:".bright_white().bold());
    println!("  {}   classify a product page", "<url>".cyan());
    println!("  {}   show the current request state", "state".cyan());
    println!("  {} dismiss the current error", "dismiss".cyan());
    println!("  {}    leave the session", "quit".cyan());
}

fn print_prompt() -> io::Result<()> {
    print!("{} ", "prodclass>".bright_cyan().bold());
    io::stdout().flush()
}

pub async fn handle_interactive(args: &ArgMatches) -> anyhow::Result<()> {
    let Some(controller) = build_controller(client_config(args)) else {
        anyhow::bail!("could not create the classification client");
    };

    println!("Type a product URL to classify it, 'help' for commands, 'quit' to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt()?;

    while let Some(line) = lines.next_line().await? {
        match parse_session_command(&line) {
            SessionCommand::Empty => {}
            SessionCommand::Help => print_session_help(),
            SessionCommand::State => println!("{}", describe_state(&controller.state())),
            SessionCommand::Dismiss => {
                let state = controller.state();
                match ErrorView::from_state(&state) {
                    Some(view) => {
                        view.dismiss(&controller);
                        println!("{} Error dismissed", "✓".green().bold());
                    }
                    None => println!("{} Nothing to dismiss", "→".blue()),
                }
            }
            SessionCommand::Quit => break,
            SessionCommand::Classify(url) => match submit_with_spinner(&controller, &url).await {
                Ok(state) => {
                    show_outcome(&state, ReportFormat::Text, None);
                }
                Err(e) => eprintln!("{} {}", "✗".red().bold(), e),
            },
        }
        print_prompt()?;
    }

    println!();
    Ok(())
}
