use std::fmt::Write as _;

use crate::model::{PhaseMarker, Task, TaskList};

/// Renders a task list (with optional phase markers) back to document
/// text. The output is the canonical form: `parse_document` on it yields
/// the same model, and rendering that model reproduces the bytes.
pub fn render_document(list: &TaskList, markers: &[PhaseMarker]) -> String {
    let body = render_body(list, markers);
    match &list.front_matter {
        Some(fm) if !fm.is_empty() => {
            let yaml = serde_yaml::to_string(fm).unwrap_or_default();
            format!("---\n{yaml}---\n{body}")
        }
        _ => body,
    }
}

fn render_body(list: &TaskList, markers: &[PhaseMarker]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", list.title);

    let mut emitted = vec![false; markers.len()];
    let mut prev_id = "";

    for task in &list.tasks {
        out.push('\n');
        for (i, marker) in markers.iter().enumerate() {
            if !emitted[i] && marker.after_task_id == prev_id {
                emitted[i] = true;
                let _ = writeln!(out, "## {}\n", marker.name);
            }
        }
        render_task(&mut out, task, 0, list.requirements_file());
        prev_id = &task.id;
    }

    // Markers anchored to the last task, to no tasks at all, or to an ID
    // that no longer exists land at the end of the document.
    for (i, marker) in markers.iter().enumerate() {
        if !emitted[i] {
            let _ = writeln!(out, "\n## {}", marker.name);
        }
    }

    out
}

fn render_task(out: &mut String, task: &Task, depth: usize, requirements_file: &str) {
    let indent = "  ".repeat(depth);

    match &task.stable_id {
        Some(sid) => {
            let _ = writeln!(
                out,
                "{indent}- {} {}. {} <!-- id:{sid} -->",
                task.status.checkbox(),
                task.id,
                task.title
            );
        }
        None => {
            let _ = writeln!(
                out,
                "{indent}- {} {}. {}",
                task.status.checkbox(),
                task.id,
                task.title
            );
        }
    }

    for detail in &task.details {
        let _ = writeln!(out, "{indent}  - {detail}");
    }
    if !task.references.is_empty() {
        let _ = writeln!(out, "{indent}  - References: {}", task.references.join(", "));
    }
    if !task.requirements.is_empty() {
        let links: Vec<String> = task
            .requirements
            .iter()
            .map(|id| format!("[{id}]({requirements_file}#{id})"))
            .collect();
        let _ = writeln!(out, "{indent}  - Requirements: {}", links.join(", "));
    }
    // Metadata sub-lines are omitted entirely for tasks that carry none,
    // so legacy files keep their historical shape.
    if let Some(stream) = task.stream {
        let _ = writeln!(out, "{indent}  - Stream: {stream}");
    }
    if let Some(owner) = &task.owner {
        let _ = writeln!(out, "{indent}  - Owner: {owner}");
    }
    if !task.blocked_by.is_empty() {
        let _ = writeln!(out, "{indent}  - Blocked-by: {}", task.blocked_by.join(", "));
    }

    for child in &task.children {
        render_task(out, child, depth + 1, requirements_file);
    }
}
