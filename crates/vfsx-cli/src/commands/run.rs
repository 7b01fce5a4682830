//! Shared driver for the extract and undo commands.
//!
//! Registers every target from the target list with a [`Scheduler`], queues
//! the requested ones, renders scheduler events until each queued job has
//! finished, then prints a per-target summary.

use super::resolve_root;
use crate::cli::RunArgs;
use crate::error::add_target_context;
use crate::error::convert_error;
use crate::output::OutputFormatter;
use crate::output::TargetRun;
use crate::progress::CliProgress;
use anyhow::Result;
use anyhow::bail;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use vfsx_core::ExtractConfig;
use vfsx_core::JobKind;
use vfsx_core::JobResult;
use vfsx_core::LogLevel;
use vfsx_core::Scheduler;
use vfsx_core::SchedulerEvent;
use vfsx_core::TargetState;
use vfsx_core::formats::ZipProvider;
use vfsx_core::store::TargetList;

pub fn execute(
    kind: JobKind,
    args: &RunArgs,
    targets_file: &Path,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
    verbose: bool,
) -> Result<()> {
    let registered = add_target_context(TargetList::new(targets_file).load(), targets_file)?;
    let provider = ZipProvider::new(&args.filter.archive, args.filter.namespace.as_str());
    let config = ExtractConfig::new(&args.filter.prefixes);
    let (mut scheduler, events) =
        Scheduler::new(Arc::new(provider), config).map_err(|e| convert_error(&e, targets_file))?;

    for target in registered {
        let root = target.root.clone();
        if let Err(err) = scheduler.add_target(target) {
            tracing::warn!(root = %root.display(), error = %err, "target not registered with scheduler");
            formatter.format_warning(&format!("skipping {}: {err}", root.display()));
        }
    }

    let mut runs = Vec::new();
    let queued = if args.all {
        match kind {
            JobKind::Extract => scheduler.extract_all(),
            JobKind::Undo => scheduler.undo_all(),
        }
    } else {
        let mut queued = Vec::new();
        for root in &args.roots {
            let root = resolve_root(root)?;
            let enqueued = match kind {
                JobKind::Extract => scheduler.enqueue_extract(&root),
                JobKind::Undo => scheduler.enqueue_undo(&root),
            };
            match enqueued {
                Ok(()) => queued.push(root),
                Err(err) => {
                    tracing::debug!(root = %root.display(), error = %err, "enqueue rejected");
                    runs.push(TargetRun {
                        result: JobResult::Failed(Arc::new(err)),
                        root,
                    });
                }
            }
        }
        queued
    };
    tracing::debug!(kind = ?kind, queued = queued.len(), rejected = runs.len(), "jobs queued");

    let mut progress = (show_progress && CliProgress::should_show()).then(CliProgress::new);
    let display = EventDisplay {
        kind,
        verbose: verbose && show_progress,
    };
    runs.extend(display.collect(&events, queued.len(), progress.as_mut()));
    scheduler.shutdown();
    drop(progress);

    formatter.format_run(kind, &runs)?;

    let failed = runs.iter().filter(|run| run.failed()).count();
    if failed > 0 {
        bail!("{failed} of {} targets failed", runs.len());
    }
    Ok(())
}

struct EventDisplay {
    kind: JobKind,
    verbose: bool,
}

impl EventDisplay {
    /// Consumes events until `pending` jobs have finished.
    fn collect(
        &self,
        events: &Receiver<SchedulerEvent>,
        mut pending: usize,
        mut progress: Option<&mut CliProgress>,
    ) -> Vec<TargetRun> {
        let mut runs = Vec::with_capacity(pending);
        while pending > 0 {
            let Ok(event) = events.recv() else {
                break;
            };
            match event {
                SchedulerEvent::StateChanged {
                    root,
                    state: TargetState::Running,
                } => {
                    if let Some(progress) = progress.as_deref_mut() {
                        progress.begin(&root, self.verb());
                    }
                }
                SchedulerEvent::Progress { snapshot, .. } => {
                    if let Some(progress) = progress.as_deref_mut() {
                        progress.update(&snapshot);
                    }
                }
                SchedulerEvent::Log {
                    root,
                    level: LogLevel::Info,
                    message,
                } if self.verbose => {
                    print_line(progress.as_deref(), &format!("{}: {message}", root.display()));
                }
                SchedulerEvent::Indexed { root, elapsed } if self.verbose => {
                    print_line(
                        progress.as_deref(),
                        &format!("{}: archive indexed in {elapsed:?}", root.display()),
                    );
                }
                SchedulerEvent::Finished { root, result, .. } => {
                    if let Some(progress) = progress.as_deref_mut() {
                        progress.finish();
                    }
                    runs.push(TargetRun { root, result });
                    pending -= 1;
                }
                _ => {}
            }
        }
        runs
    }

    const fn verb(&self) -> &'static str {
        match self.kind {
            JobKind::Extract => "Extracting",
            JobKind::Undo => "Undoing",
        }
    }
}

fn print_line(progress: Option<&CliProgress>, line: &str) {
    match progress {
        Some(progress) => progress.println(line),
        None => eprintln!("{line}"),
    }
}
