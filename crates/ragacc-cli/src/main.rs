mod config;
mod corpus;
mod render;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use ragacc_core::harness::{load_fixtures, run_questions};
use ragacc_core::{
    corpus as corpus_check, run_accuracy, CancelFlag, Fixtures, HarnessError, Note, RunIdentity,
    RunOptions, Silent, TestCase,
};
use ragacc_http::HttpNoteService;

use crate::config::Config;
use crate::render::StderrProgress;

const EXIT_FAILED: i32 = 1;
const EXIT_SETUP_FAILURE: i32 = 2;
const EXIT_LEAKED: i32 = 3;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(
    name = "ragacc",
    version,
    about = "Recall/Precision/F1 accuracy harness for RAG note services"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug); RUST_LOG also applies
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the corpus, ask every question, report accuracy, clean up
    Run {
        /// Service base URL (overrides config and API_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Parallel question workers
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Also write the report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Print every response, not only failures
        #[arg(long)]
        verbose_cases: bool,
    },

    /// List the fixture corpus (no network)
    Corpus {
        /// Check corpus invariants and exit non-zero on problems
        #[arg(long)]
        validate: bool,
    },

    /// Check that two run identities cannot see each other's notes
    Isolation {
        /// Service base URL (overrides config and API_URL)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match cli.command {
        Commands::Run {
            base_url,
            jobs,
            json,
            verbose_cases,
        } => {
            let mut cfg = config::load_config(cli.config.as_deref())?;
            if let Some(url) = base_url {
                cfg.service.base_url = Some(url);
            }
            if let Some(jobs) = jobs {
                cfg.run.jobs = jobs;
            }
            cmd_run(&cfg, json.as_deref(), verbose_cases)?
        }
        Commands::Corpus { validate } => cmd_corpus(validate),
        Commands::Isolation { base_url } => {
            let mut cfg = config::load_config(cli.config.as_deref())?;
            if let Some(url) = base_url {
                cfg.service.base_url = Some(url);
            }
            cmd_isolation(&cfg)?
        }
        Commands::Config => cmd_config(cli.config.as_deref())?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing_subscriber::filter::LevelFilter::WARN,
        1 => tracing_subscriber::filter::LevelFilter::INFO,
        _ => tracing_subscriber::filter::LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

/// First Ctrl-C stops at the next call boundary and lets teardown run;
/// a second one exits immediately.
fn install_interrupt_handler(cancel: CancelFlag) -> Result<()> {
    ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            eprintln!("\nforced exit: notes created by this run may be left behind");
            std::process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("\ninterrupt: finishing the current call, then cleaning up (Ctrl-C again to force)");
        cancel.cancel();
    })
    .context("installing Ctrl-C handler")
}

fn open_service(cfg: &Config) -> Result<HttpNoteService> {
    let client = cfg.client_config()?;
    info!(base_url = %client.base_url, "using service");
    Ok(HttpNoteService::new(client))
}

// ---------------------------------------------------------------------------
// Accuracy run
// ---------------------------------------------------------------------------

fn cmd_run(cfg: &Config, json: Option<&Path>, verbose_cases: bool) -> Result<i32> {
    let service = open_service(cfg)?;
    let notes = corpus::notes();
    let cases = corpus::test_cases();

    let issues = corpus_check::validate(&notes, &cases);
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("corpus: {issue}");
        }
        anyhow::bail!("fixture corpus is inconsistent ({} issues)", issues.len());
    }

    let cancel = CancelFlag::new();
    install_interrupt_handler(cancel.clone())?;

    let identity = RunIdentity::generate(&cfg.run.identity_prefix);
    let opts = RunOptions {
        jobs: cfg.run.jobs.max(1),
        settle: Duration::from_millis(cfg.run.index_settle_ms),
    };
    let progress = StderrProgress {
        show_responses: verbose_cases,
    };

    eprintln!("=== Run {identity} against {} ===", service.base_url());
    eprintln!(
        "Loading {} notes, then asking {} questions ({} worker{})",
        notes.len(),
        cases.len(),
        opts.jobs,
        if opts.jobs == 1 { "" } else { "s" }
    );

    let report = match run_accuracy(
        &service, identity, &notes, &cases, &opts, &cancel, &progress,
    ) {
        Ok(report) => report,
        Err(e @ HarnessError::Setup { .. }) => {
            eprintln!("ABORTED before asking any question: {e}");
            return Ok(EXIT_SETUP_FAILURE);
        }
        Err(e @ HarnessError::Interrupted { .. }) => {
            eprintln!("ABORTED: {e}");
            return Ok(EXIT_INTERRUPTED);
        }
    };

    render::print_report(&report, verbose_cases);
    if let Some(path) = json {
        render::write_json(&report, path)?;
        eprintln!("JSON report written to {}", path.display());
    }

    Ok(if report.interrupted {
        EXIT_INTERRUPTED
    } else if !report.leaked.is_empty() {
        EXIT_LEAKED
    } else {
        0
    })
}

// ---------------------------------------------------------------------------
// Corpus listing
// ---------------------------------------------------------------------------

fn cmd_corpus(validate: bool) -> i32 {
    let notes = corpus::notes();
    let cases = corpus::test_cases();

    println!("Notes ({}):", notes.len());
    for (i, n) in notes.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, n.title);
    }
    println!();
    println!("Questions ({}):", cases.len());
    for (i, c) in cases.iter().enumerate() {
        println!(
            "  {:>2}. {}  [{}]",
            i + 1,
            c.question,
            c.accepted_answers.join(" | ")
        );
    }

    if !validate {
        return 0;
    }

    println!();
    let shared = corpus_check::shared_forms(&notes, &cases);
    if !shared.is_empty() {
        println!("Accepted forms found in more than one note (audit when extending):");
        for (question, form, titles) in &shared {
            println!("  \"{form}\" for \"{question}\": {}", titles.join(", "));
        }
        println!();
    }

    let issues = corpus_check::validate(&notes, &cases);
    if issues.is_empty() {
        println!("Corpus OK");
        0
    } else {
        for issue in &issues {
            println!("  {issue}");
        }
        println!("{} corpus issues", issues.len());
        EXIT_FAILED
    }
}

// ---------------------------------------------------------------------------
// Isolation check
// ---------------------------------------------------------------------------

fn cmd_isolation(cfg: &Config) -> Result<i32> {
    let service = open_service(cfg)?;
    let cancel = CancelFlag::new();
    install_interrupt_handler(cancel.clone())?;

    let canary = [Note::new(corpus::CANARY_NOTE.0, corpus::CANARY_NOTE.1)];
    let canary_case = [TestCase::new(
        corpus::CANARY_QUESTION,
        corpus::CANARY_ANSWERS.iter().copied(),
    )];
    let seeded = RunIdentity::generate(&cfg.run.identity_prefix);
    let outsider = RunIdentity::generate(&cfg.run.identity_prefix);

    eprintln!("Seeding canary under {seeded}; probing from {outsider}");
    let mut fixtures = Fixtures::new(&service, seeded.clone());
    if let Err(e) = load_fixtures(&service, fixtures.context_mut(), &canary, &cancel, &Silent) {
        eprintln!("ABORTED: {e}");
        render::print_leaked(&fixtures.release());
        return Ok(EXIT_SETUP_FAILURE);
    }
    if cfg.run.index_settle_ms > 0 {
        std::thread::sleep(Duration::from_millis(cfg.run.index_settle_ms));
    }

    let from_outsider = run_questions(&service, &outsider, &canary_case, 1, &cancel, &Silent);
    let from_owner = run_questions(&service, &seeded, &canary_case, 1, &cancel, &Silent);
    let leaked = fixtures.release();

    let leaked_across = from_outsider.iter().any(|o| o.correct);
    let owner_answered = from_owner.iter().all(|o| o.correct);

    println!("Isolation check");
    println!("{}", "\u{2500}".repeat(60));
    println!(
        "{:<44} {}",
        "Other run can read the canary",
        if leaked_across { "YES (violation)" } else { "no" }
    );
    println!(
        "{:<44} {}",
        "Seeding run can read the canary",
        if owner_answered { "yes" } else { "NO" }
    );
    render::print_leaked(&leaked);

    Ok(if leaked_across {
        println!("FAIL: notes leak across run identities");
        EXIT_FAILED
    } else if !owner_answered {
        println!("INCONCLUSIVE: the seeding run could not answer from its own note");
        EXIT_FAILED
    } else if !leaked.is_empty() {
        EXIT_LEAKED
    } else {
        println!("PASS: runs are isolated");
        0
    })
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config(explicit: Option<&Path>) -> Result<i32> {
    let cfg = config::load_config(explicit)?;
    println!("Config: {}", config::show_config_path(explicit));
    println!();
    println!("[service]");
    println!(
        "  base_url = {}",
        cfg.service.base_url.as_deref().unwrap_or("(unset)")
    );
    println!(
        "  secret = {}",
        cfg.service
            .secret
            .as_deref()
            .map(config::mask_secret)
            .unwrap_or_else(|| "(unset)".into())
    );
    println!();
    println!("[timeouts]");
    println!("  note_secs = {}", cfg.timeouts.note_secs);
    println!("  ask_secs = {}", cfg.timeouts.ask_secs);
    println!();
    println!("[retry]");
    println!("  max_retries = {}", cfg.retry.max_retries);
    println!("  base_delay_ms = {}", cfg.retry.base_delay_ms);
    println!("  max_delay_ms = {}", cfg.retry.max_delay_ms);
    println!();
    println!("[run]");
    println!("  jobs = {}", cfg.run.jobs);
    println!("  identity_prefix = {}", cfg.run.identity_prefix);
    println!("  index_settle_ms = {}", cfg.run.index_settle_ms);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_accepts_verbose_cases() {
        let cli = Cli::try_parse_from(["ragacc", "run", "--verbose-cases", "-j", "4"]).unwrap();
        match cli.command {
            Commands::Run {
                verbose_cases,
                jobs,
                ..
            } => {
                assert!(verbose_cases);
                assert_eq!(jobs, Some(4));
            }
            _ => panic!("expected run"),
        }
        assert!(Cli::try_parse_from(["ragacc", "run", "--show-responses"]).is_err());
    }
}
