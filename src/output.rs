use crate::deps::{NextTask, StreamReport, TaskRef};
use crate::model::{Task, TaskList};

pub fn format_task_tree(list: &TaskList) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", list.title));
    for task in &list.tasks {
        write_task(&mut out, task, 0);
    }
    let stats = list.stats();
    if stats.total > 0 {
        out.push_str(&format!(
            "\n{}/{} completed, {} in progress\n",
            stats.completed, stats.total, stats.in_progress
        ));
    }
    out
}

fn write_task(out: &mut String, task: &Task, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut annotations = Vec::new();
    if let Some(stream) = task.stream {
        annotations.push(format!("stream {stream}"));
    }
    if let Some(owner) = &task.owner {
        annotations.push(format!("owner {owner}"));
    }
    if !task.blocked_by.is_empty() {
        annotations.push(format!("blocked by {}", task.blocked_by.join(", ")));
    }
    let suffix = if annotations.is_empty() {
        String::new()
    } else {
        format!("  ({})", annotations.join("; "))
    };
    out.push_str(&format!(
        "{}{} {}. {}{}\n",
        indent,
        task.status.checkbox(),
        task.id,
        task.title,
        suffix
    ));
    for child in &task.children {
        write_task(out, child, depth + 1);
    }
}

pub fn format_stream_report(report: &StreamReport) -> String {
    if report.streams.is_empty() {
        return "No incomplete tasks.\n".to_string();
    }
    let mut out = String::new();
    for info in &report.streams {
        out.push_str(&format!("Stream {}:\n", info.stream));
        write_task_refs(&mut out, "ready", &info.ready);
        write_task_refs(&mut out, "active", &info.active);
        write_task_refs(&mut out, "blocked", &info.blocked);
    }
    let available: Vec<String> = report.available.iter().map(|s| s.to_string()).collect();
    if available.is_empty() {
        out.push_str("Available streams: none\n");
    } else {
        out.push_str(&format!("Available streams: {}\n", available.join(", ")));
    }
    out
}

fn write_task_refs(out: &mut String, label: &str, refs: &[TaskRef]) {
    for r in refs {
        let mut line = format!("  [{label}] {}. {}", r.id, r.title);
        if let Some(owner) = &r.owner {
            line.push_str(&format!(" (owner: {owner})"));
        }
        if !r.blocked_by.is_empty() {
            line.push_str(&format!(" (blocked by: {})", r.blocked_by.join(", ")));
        }
        line.push('\n');
        out.push_str(&line);
    }
}

pub fn format_next_task(next: &NextTask) -> String {
    let mut out = format!("{}. {} [{}]\n", next.id, next.title, next.status);
    for child in &next.incomplete_children {
        out.push_str(&format!("  {}. {}\n", child.id, child.title));
    }
    out
}
