use chrono::{DateTime, Local, Utc};
use jobsync_core::{Cadence, DashboardView, DetailsView, JobRowView, Severity};

const HELP: &str =
    "commands: pause|resume|stop|restart <id>, create <structure> <leads> [notes], history [status] [name], details <id>, close, refresh, watch, summary, quit";

fn job_line(row: &JobRowView) -> String {
    let mut line = format!(
        "#{:<5} {:<32} {:<12} {:>3}%  {:<10} {}/{} leads  {}",
        row.job_id,
        truncate(&row.name, 32),
        row.status.as_str(),
        row.progress,
        row.task_status.as_str(),
        row.unique_leads,
        row.leads_allocated,
        row.current_step,
    );
    if let Some(action) = row.pending {
        line.push_str(&format!("  [{action} pending]"));
    }
    if row.provisional {
        line.push_str("  [awaiting server]");
    }
    line
}

/// Server timestamps are UTC; the dashboard shows them in local time.
fn local_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn details_lines(details: &DetailsView) -> Vec<String> {
    let mut lines = vec![
        format!("-- job #{} {}", details.job_id, details.name),
        format!(
            "status {} / task {} ({}%)  {}",
            details.status.as_str(),
            details.task_status.as_str(),
            details.progress,
            details.current_step
        ),
        format!(
            "leads {}/{} allocated, {} found, {} pages, {}s",
            details.unique_leads,
            details.leads_allocated,
            details.leads_found,
            details.pages_explored,
            details.duration_seconds
        ),
        format!("created {}", local_time(details.created_at)),
    ];
    if let Some(structure) = &details.structure {
        lines.push(format!("structure {structure}"));
    }
    if !details.search_query.is_empty() {
        lines.push(format!("query {}", details.search_query));
    }
    if let Some(error) = &details.error_message {
        lines.push(format!("error {error}"));
    }
    lines
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

/// Renders the dashboard as plain text lines.
pub(crate) fn render_lines(view: &DashboardView) -> Vec<String> {
    let cadence = match view.cadence {
        Cadence::Watch => "watch",
        Cadence::Summary => "summary",
    };
    let mut lines = vec![format!(
        "== jobsync ({cadence}) == {} active job(s), workers {}/{}",
        view.jobs.len(),
        view.active_workers,
        view.total_workers
    )];

    if let Some(error) = &view.refresh_error {
        lines.push(format!("!! last refresh failed: {error}"));
    }

    if view.jobs.is_empty() {
        lines.push("no active jobs".to_string());
    }
    lines.extend(view.jobs.iter().map(job_line));

    if !view.workers.is_empty() {
        lines.push("-- workers".to_string());
        for worker in &view.workers {
            let mut line = format!("{:<20} {:<8}", worker.worker_name, worker.status);
            if let Some(label) = &worker.job_label {
                line.push_str(&format!(" {label}"));
            }
            if worker.orphaned {
                line.push_str(" (finished)");
            }
            if let Some(url) = &worker.current_url {
                line.push_str(&format!(" {url}"));
            }
            lines.push(line);
        }
    }

    if !view.history.is_empty() {
        lines.push("-- history".to_string());
        for row in &view.history {
            let updated = local_time(row.updated_at);
            lines.push(format!(
                "#{:<5} {:<32} {:<10} {:>6} leads  {}",
                row.job_id,
                truncate(&row.name, 32),
                row.status.as_str(),
                row.leads_found,
                updated
            ));
        }
    }

    if let Some(details) = &view.details {
        lines.extend(details_lines(details));
    }

    if let Some(notice) = &view.notice {
        let marker = match notice.severity {
            Severity::Info => "ok",
            Severity::Error => "error",
        };
        lines.push(format!("[{marker}] {}", notice.text));
    }
    lines.push(HELP.to_string());
    lines
}
