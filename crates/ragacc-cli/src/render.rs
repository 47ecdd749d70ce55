//! Human-readable run output: progress lines on stderr, report on stdout.

use std::path::Path;

use anyhow::{Context, Result};

use ragacc_core::{Observer, Outcome, RunReport, TeardownFailure};

const WIDTH: usize = 78;

/// One stderr line per fixture and per answered question.
pub struct StderrProgress {
    pub show_responses: bool,
}

impl Observer for StderrProgress {
    fn note_created(&self, index: usize, total: usize, title: &str) {
        eprintln!("  note {}/{total} created: {title}", index + 1);
    }

    fn case_finished(&self, index: usize, total: usize, outcome: &Outcome) {
        let verdict = if outcome.correct { "PASS" } else { "FAIL" };
        let detail = match &outcome.error {
            Some(e) => format!(" ({})", truncate_words(e, 60)),
            None => format!(" ({:.1}s)", outcome.latency_ms as f64 / 1000.0),
        };
        eprintln!("  Q{}/{total} {verdict}{detail}", index + 1);
        if self.show_responses && outcome.error.is_none() {
            eprintln!("    Response: {}", truncate_words(&outcome.response, 200));
        }
    }
}

pub fn print_report(report: &RunReport, show_all: bool) {
    let m = &report.metrics;
    let elapsed = report.finished_at - report.started_at;

    println!();
    println!(
        "RAG Accuracy Report ({} notes, {} questions, run {})",
        report.notes_loaded, m.total, report.identity
    );
    println!("{}", "\u{2550}".repeat(WIDTH));
    println!("{:<4} {:<56} {:>6} {:>9}", "#", "Question", "Result", "Latency");
    println!("{}", "\u{2500}".repeat(WIDTH));
    for (i, o) in report.outcomes.iter().enumerate() {
        println!(
            "{:<4} {:<56} {:>6} {:>9}",
            i + 1,
            truncate_words(&o.question, 56),
            if o.correct { "PASS" } else { "FAIL" },
            format_latency(o.latency_ms)
        );
    }
    println!("{}", "\u{2500}".repeat(WIDTH));

    let failures: Vec<(usize, &Outcome)> = report
        .outcomes
        .iter()
        .enumerate()
        .filter(|(_, o)| show_all || !o.correct)
        .collect();
    if !failures.is_empty() {
        println!();
        println!(
            "{}",
            if show_all { "Responses:" } else { "Failures:" }
        );
        for (i, o) in failures {
            println!("  [{}] {}", i + 1, o.question);
            println!("      expected any of: {}", o.accepted_answers.join(" | "));
            match &o.error {
                Some(e) => println!("      error:    {e}"),
                None => println!("      actual:   {}", truncate_words(&o.response, 300)),
            }
        }
    }

    println!();
    println!(
        "{:<24} {}/{}",
        "Correct answers",
        report.correct(),
        m.total
    );
    println!(
        "{:<24} tp={} fp={} fn={}",
        "Counts", m.true_positives, m.false_positives, m.false_negatives
    );
    println!("{:<24} {:.1}%", "Recall", m.recall * 100.0);
    println!("{:<24} {:.1}%", "Precision", m.precision * 100.0);
    println!("{:<24} {:.1}%", "F1", m.f1 * 100.0);
    println!(
        "{:<24} {:.1}s",
        "Duration",
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    println!("{}", "\u{2550}".repeat(WIDTH));

    if report.interrupted {
        println!("Run was interrupted; unasked questions are counted as failures.");
    }
    if !report.leaked.is_empty() {
        println!();
        println!(
            "WARNING: {} notes could not be deleted (run identity {}):",
            report.leaked.len(),
            report.identity
        );
        for leak in &report.leaked {
            println!("  {} \"{}\": {}", leak.id, leak.title, leak.error);
        }
    }
}

pub fn print_leaked(leaked: &[TeardownFailure]) {
    for line in leak_lines(leaked) {
        println!("{line}");
    }
}

fn leak_lines(leaked: &[TeardownFailure]) -> Vec<String> {
    leaked
        .iter()
        .map(|leak| format!("WARNING: note {} not deleted: {}", leak.id, leak.error))
        .collect()
}

pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = report.to_json_pretty()?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn format_latency(ms: u64) -> String {
    if ms == 0 {
        "-".into()
    } else if ms < 1000 {
        format!("{ms} ms")
    } else {
        format!("{:.2} s", ms as f64 / 1000.0)
    }
}

pub fn truncate_words(s: &str, max_chars: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_chars {
        s
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
