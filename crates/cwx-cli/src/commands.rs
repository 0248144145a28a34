//! Subcommand implementations for the `cwx` binary.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context as _, Result, bail};
use tracing::{debug, info, warn};

use cwx_cli::backlog::{BacklogFetcher, ParseReport, RecordKind, parse_lines};
use cwx_cli::logging::redact_value;
use cwx_context::{ContextRegistry, ResourceContext, names};
use cwx_inbox::{
    InboxProcessor, ItemAction, ItemHandler, ItemStore, ProcessorStatus, SessionSummary,
};
use cwx_model::NotificationItem;

use crate::cli::{ActionArg, DrainArgs, ParseArgs, RecordKindArg};
use crate::tables;

/// Parses a record file and prints the items as a table.
pub fn run_parse(args: &ParseArgs) -> Result<ParseReport> {
    let report = read_records(&args.file, args.kind.into())?;
    tables::print_items(&report.items);
    for (line, message) in &report.failures {
        eprintln!("line {line}: {message}");
    }
    if !report.is_clean() {
        warn!(
            failed = report.failures.len(),
            parsed = report.items.len(),
            "some records were rejected"
        );
    }
    Ok(report)
}

/// Replays an inbox processing session over a file of delivered records,
/// answering prompts from the scripted `--actions` list.
pub fn run_drain(args: &DrainArgs) -> Result<SessionSummary> {
    let report = read_records(&args.file, RecordKind::Delivered)?;
    if !report.is_clean() {
        for (line, message) in &report.failures {
            eprintln!("line {line}: {message}");
        }
        bail!(
            "{} record(s) failed to parse; fix the input before draining",
            report.failures.len()
        );
    }

    let mut registry = ContextRegistry::new();
    registry.register_standard()?;
    let patient = ResourceContext::new(
        registry.require(names::PATIENT)?,
        Rc::new(BacklogFetcher::from_items(&report.items)),
    );

    let mut processor = InboxProcessor::new(patient);
    for alert_type in &args.handle {
        processor.register_handler(alert_type.clone(), Box::new(LoggingHandler));
    }
    processor.set_store(Box::new(LoggingStore));

    let mut script = args.actions.iter().copied();
    let mut status = processor.process(report.items);
    let summary = loop {
        match status {
            ProcessorStatus::Completed(summary) | ProcessorStatus::Canceled(summary) => {
                break summary;
            }
            ProcessorStatus::AwaitingUser { offered } => {
                let requested = script
                    .next()
                    .map(ItemAction::from)
                    .unwrap_or(ItemAction::Skip);
                let action = if offered.contains(&requested) {
                    requested
                } else {
                    // An unresolved item only offers Cancel; honor its menu.
                    warn!(%requested, fallback = %offered[0], "action not offered for this item");
                    offered[0]
                };
                debug!(%action, "resolving presented item");
                status = processor.resolve(action)?;
            }
            ProcessorStatus::Paused => {
                status = processor.advance()?;
            }
        }
    };
    tables::print_summary(&summary);
    Ok(summary)
}

fn read_records(path: &Path, kind: RecordKind) -> Result<ParseReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading record file {}", path.display()))?;
    let report = parse_lines(&content, kind);
    info!(
        parsed = report.items.len(),
        rejected = report.failures.len(),
        file = %path.display(),
        "record file read"
    );
    Ok(report)
}

impl From<RecordKindArg> for RecordKind {
    fn from(arg: RecordKindArg) -> Self {
        match arg {
            RecordKindArg::Delivered => RecordKind::Delivered,
            RecordKindArg::Scheduled => RecordKind::Scheduled,
        }
    }
}

impl From<ActionArg> for ItemAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Skip => ItemAction::Skip,
            ActionArg::SkipAll => ItemAction::SkipAll,
            ActionArg::Delete => ItemAction::Delete,
            ActionArg::DeleteAll => ItemAction::DeleteAll,
            ActionArg::Cancel => ItemAction::Cancel,
            ActionArg::View => ItemAction::ViewSubject,
        }
    }
}

/// Dispatch target that records the follow-up instead of launching one.
struct LoggingHandler;

impl ItemHandler for LoggingHandler {
    fn dispatch(&mut self, item: &NotificationItem) -> Result<()> {
        info!(
            item = %item.ident(),
            patient = redact_value(item.patient_name().unwrap_or("-")),
            "dispatched follow-up action"
        );
        Ok(())
    }
}

/// Delete sink that only records the request.
struct LoggingStore;

impl ItemStore for LoggingStore {
    fn delete(&mut self, item: &NotificationItem) -> Result<()> {
        info!(item = %item.ident(), "deleted from store");
        Ok(())
    }
}
