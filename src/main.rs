//! CLI entry point for `mailcloud`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailcloud::cloud::frequency::subject_frequencies;
use mailcloud::cloud::render::{render, FontFace};
use mailcloud::cloud::CloudOptions;
use mailcloud::config::{ClockMode, Config};
use mailcloud::export::csv::load_table;
use mailcloud::fetch::imap_client::ImapSource;
use mailcloud::model::record::{FinalRecord, RawRecord};
use mailcloud::model::table::MessageTable;
use mailcloud::pipeline;
use mailcloud::stats::RunSummary;

#[derive(Parser)]
#[command(
    name = "mailcloud",
    version,
    about = "Export mailbox header analytics to CSV and draw a subject word cloud",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch headers, write the three snapshots and draw the cloud (default)
    Run(RunArgs),
    /// Re-run enrichment and the cloud from a raw snapshot, offline
    Rebuild {
        /// Stage-1 snapshot (emails.csv)
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
        /// Clock the date columns are read on
        #[arg(long, value_enum)]
        clock: Option<ClockMode>,
    },
    /// Draw the word cloud from a final snapshot
    Cloud {
        /// Stage-3 snapshot (emails_final.csv)
        input: PathBuf,
        /// Image path (defaults to the configured name next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Open the image in the system viewer
        #[arg(long)]
        show: bool,
    },
    /// Print the effective configuration
    Config {
        /// Write a template config file instead
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Args, Default)]
struct RunArgs {
    /// IMAP server host
    #[arg(long)]
    host: Option<String>,
    /// IMAP server port
    #[arg(long)]
    port: Option<u16>,
    /// Account identifier (usually the email address)
    #[arg(short, long)]
    user: Option<String>,
    /// Folder to read
    #[arg(short, long)]
    folder: Option<String>,
    /// Walk the folder from the oldest message
    #[arg(long)]
    oldest_first: bool,
    /// Clock the date columns are read on
    #[arg(long, value_enum)]
    clock: Option<ClockMode>,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Default)]
struct OutputArgs {
    /// Directory receiving the snapshots and the image
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,
    /// Skip the word cloud
    #[arg(long)]
    no_cloud: bool,
    /// Open the word cloud in the system viewer
    #[arg(long)]
    show: bool,
    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = mailcloud::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    setup_logging(&log_level, &config);

    match cli.command {
        None => cmd_run(cli.run, &mut config),
        Some(Commands::Run(args)) => cmd_run(args, &mut config),
        Some(Commands::Rebuild {
            input,
            output,
            clock,
        }) => cmd_rebuild(&input, output, clock, &mut config),
        Some(Commands::Cloud {
            input,
            output,
            show,
        }) => cmd_cloud(&input, output.as_deref(), show, &config),
        Some(Commands::Config { init }) => cmd_config(init, &config),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = mailcloud::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailcloud.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Apply command-line overrides on top of the file configuration.
fn apply_output_overrides(output: &OutputArgs, clock: Option<ClockMode>, config: &mut Config) {
    if let Some(dir) = &output.output_dir {
        config.general.output_dir = dir.clone();
    }
    if let Some(clock) = clock {
        config.enrich.clock = clock;
    }
}

/// Fetch, process and export a whole folder.
fn cmd_run(args: RunArgs, config: &mut Config) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.imap.host = host;
    }
    if let Some(port) = args.port {
        config.imap.port = port;
    }
    if let Some(user) = args.user {
        config.imap.username = user;
    }
    if let Some(folder) = args.folder {
        config.imap.folder = folder;
    }
    if args.oldest_first {
        config.imap.newest_first = false;
    }
    apply_output_overrides(&args.output, args.clock, config);

    config.imap.require_username()?;
    let password = config.imap.resolve_password()?;

    let start = Instant::now();
    let source = ImapSource::connect(&config.imap, &password)
        .with_context(|| format!("Connecting to {}", config.imap.host))?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Fetching headers [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let raw = pipeline::build::fetch_table(
        source,
        &config.imap.folder,
        config.imap.newest_first,
        Some(&|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        }),
    )
    .with_context(|| format!("Reading folder '{}'", config.imap.folder))?;
    pb.finish_and_clear();

    finish_pipeline(&raw, &args.output, config, start)
}

/// Re-run stages 2 and 3 from a raw snapshot.
fn cmd_rebuild(
    input: &Path,
    output: OutputArgs,
    clock: Option<ClockMode>,
    config: &mut Config,
) -> anyhow::Result<()> {
    apply_output_overrides(&output, clock, config);
    let start = Instant::now();
    let raw: MessageTable<RawRecord> =
        load_table(input, ',').with_context(|| format!("Loading {}", input.display()))?;
    finish_pipeline(&raw, &output, config, start)
}

/// Write the snapshots, draw the cloud and print the summary.
fn finish_pipeline(
    raw: &MessageTable<RawRecord>,
    output: &OutputArgs,
    config: &Config,
    start: Instant,
) -> anyhow::Result<()> {
    let dir = config.general.output_dir.clone();
    let processed = pipeline::process(raw, &dir, config).context("Writing snapshots")?;

    let mut summary = RunSummary::new(&processed.finals, &processed.files, start.elapsed());
    if !output.no_cloud {
        let image_path = dir.join(&config.cloud.output);
        let words = draw_cloud(&processed.finals, &image_path, config, output.show)?;
        summary = summary.with_cloud(&image_path, words);
    }
    summary.elapsed_ms = start.elapsed().as_millis() as u64;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary_table(&summary);
    }
    Ok(())
}

/// Draw the cloud from a final snapshot.
fn cmd_cloud(input: &Path, output: Option<&Path>, show: bool, config: &Config) -> anyhow::Result<()> {
    let finals: MessageTable<FinalRecord> = load_table(input, config.export.final_separator)
        .with_context(|| format!("Loading {}", input.display()))?;

    let image_path = match output {
        Some(path) => path.to_path_buf(),
        None => input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&config.cloud.output),
    };
    let words = draw_cloud(&finals, &image_path, config, show)?;
    println!(
        "  Drew {} distinct word(s) to {}",
        words,
        image_path.display()
    );
    Ok(())
}

/// Render the subject cloud, save it as PNG and optionally open it.
/// Returns the number of distinct words counted.
fn draw_cloud(
    finals: &MessageTable<FinalRecord>,
    image_path: &Path,
    config: &Config,
    show: bool,
) -> anyhow::Result<usize> {
    let options = CloudOptions::from_config(&config.cloud);
    let freqs = subject_frequencies(finals, &options.stopwords);
    let font = FontFace::discover(config.cloud.font.as_deref())?;
    tracing::debug!(font = %font.path().display(), "Using font");

    let image = render(&freqs, &options, &font);
    image
        .save(image_path)
        .with_context(|| format!("Saving {}", image_path.display()))?;

    if show {
        open::that(image_path).with_context(|| format!("Opening {}", image_path.display()))?;
    }
    Ok(freqs.len())
}

/// Print or initialize the configuration.
fn cmd_config(init: bool, config: &Config) -> anyhow::Result<()> {
    if init {
        let path = mailcloud::config::write_template()?;
        println!("  Wrote {}", path.display());
        return Ok(());
    }

    let mut shown = config.clone();
    if shown.imap.password.is_some() {
        shown.imap.password = Some("********".to_string());
    }
    if let Some(path) = mailcloud::config::config_file_path() {
        println!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailcloud", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print the run summary in a human-readable table.
fn print_summary_table(summary: &RunSummary) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<20} {}", "Messages", summary.message_count);
    println!("  {:<20} {}", "Undated", summary.undated);
    if let (Some(oldest), Some(newest)) = (summary.oldest, summary.newest) {
        println!("  {:<20} {} to {}", "Date range", oldest, newest);
    }
    if let Some(words) = summary.distinct_words {
        println!("  {:<20} {}", "Distinct words", words);
    }
    println!("  {:<20} {} ms", "Elapsed", summary.elapsed_ms);

    if !summary.top_senders.is_empty() {
        println!();
        println!("  Top senders:");
        for item in &summary.top_senders {
            println!("    {:>6}  {}", item.count, item.label);
        }
    }

    if !summary.busiest_hours.is_empty() {
        println!();
        println!("  Busiest hours:");
        for item in &summary.busiest_hours {
            println!("    {:>6}  {}", item.count, item.label);
        }
    }

    if !summary.weekdays.is_empty() {
        println!();
        println!("  Weekdays:");
        for item in &summary.weekdays {
            println!("    {:>6}  {}", item.count, item.label);
        }
    }

    println!();
    println!("  Files written:");
    for file in &summary.files {
        println!(
            "    {:>10}  {}",
            format_size(file.size, BINARY),
            file.path.display()
        );
    }
    println!();
}
