use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{FrontMatter, PhaseMarker, Status, Task, TaskList};
use crate::validate::is_valid_id;

/// Maximum allowed size for a task document (10 MB), checked before any
/// parsing work.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Spaces per nesting level.
const INDENT_WIDTH: usize = 2;

static TASK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)- (\[[ \-xX]\]) (\d+(?:\.\d+)*)\. (.+)$").unwrap());

static PHASE_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^## (.+)$").unwrap());

static STABLE_ID_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*id:([a-z0-9]{7})\s*-->").unwrap());

static BLOCKED_BY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^blocked-by:\s*(.+)$").unwrap());

// Matches stable ID references with optional title hints:
// "abc1234 (Some title)" or plain "abc1234". The trailing class keeps a
// 7-char prefix of a longer token from matching.
static BLOCKED_BY_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-z0-9]{7})(\s*\([^)]*\))?($|[,\s])").unwrap());

static STREAM_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^stream:\s*(\d+)$").unwrap());

static OWNER_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^owner:\s*(.+)$").unwrap());

// Requirement links: [1.2](requirements.md#1.2)
static REQUIREMENT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^#)]+)#[^)]+\)").unwrap());

/// Parses a complete document: front matter, title, task tree, and phase
/// markers. The inverse of `render::render_document`.
pub fn parse_document(content: &str) -> Result<(TaskList, Vec<PhaseMarker>)> {
    if content.len() as u64 > MAX_FILE_SIZE {
        return Err(Error::limit(format!(
            "file exceeds maximum size of {MAX_FILE_SIZE} bytes"
        )));
    }

    let (front_matter, body) = split_front_matter(content)?;

    let mut lines: Vec<&str> = body.lines().collect();
    // lines() drops a trailing newline but not a trailing empty segment
    // from "\n\n"; blank lines are skipped during parsing either way.

    let mut title = String::new();
    if let Some(idx) = lines
        .iter()
        .position(|l| l.trim_start().starts_with("# "))
    {
        title = lines[idx].trim_start()[1..].trim().to_string();
        lines.remove(idx);
    }

    let mut parser = Parser {
        lines: &lines,
        pos: 0,
        requirements_file: None,
    };
    let tasks = parser.parse_siblings(0, "")?;
    let requirements_file = parser.requirements_file.take();

    let markers = extract_phase_markers(&lines);

    let list = TaskList {
        title,
        tasks,
        front_matter: front_matter.filter(|fm| !fm.is_empty()),
        requirements_file,
    };
    Ok((list, markers))
}

/// Splits a leading `---` delimited YAML block off the content.
fn split_front_matter(content: &str) -> Result<(Option<FrontMatter>, &str)> {
    let Some(rest) = content.strip_prefix("---\n") else {
        return Ok((None, content));
    };

    let (yaml, body) = if let Some(body) = rest.strip_prefix("---\n") {
        ("", body)
    } else if let Some(end) = rest.find("\n---\n") {
        (&rest[..end], &rest[end + 5..])
    } else {
        return Err(Error::validation("unclosed front matter block"));
    };

    if yaml.trim().is_empty() {
        return Ok((None, body));
    }

    let fm: FrontMatter = serde_yaml::from_str(yaml)
        .map_err(|e| Error::validation(format!("parsing front matter: {e}")))?;
    Ok((Some(fm), body))
}

struct Parser<'a> {
    lines: &'a [&'a str],
    pos: usize,
    requirements_file: Option<String>,
}

impl Parser<'_> {
    /// Parses a run of sibling tasks at the given depth, consuming each
    /// task's continuation lines and children. Stops at the first line
    /// shallower than `depth`.
    fn parse_siblings(&mut self, depth: usize, parent_id: &str) -> Result<Vec<Task>> {
        let expected = depth * INDENT_WIDTH;
        let mut tasks: Vec<Task> = Vec::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.trim().is_empty() {
                self.pos += 1;
                continue;
            }

            let indent = count_indent(line).ok_or_else(|| self.err("tabs are not allowed"))?;
            if indent < expected {
                break;
            }
            if indent > expected {
                return Err(self.err("unexpected indentation"));
            }

            if let Some(mut task) = self.parse_task_line(line)? {
                task.id = if parent_id.is_empty() {
                    format!("{}", tasks.len() + 1)
                } else {
                    format!("{parent_id}.{}", tasks.len() + 1)
                };
                self.pos += 1;
                self.parse_task_body(&mut task, depth + 1)?;
                tasks.push(task);
                continue;
            }

            // Phase headers live between top-level tasks; anything else at
            // this depth is malformed.
            if depth == 0 && PHASE_HEADER.is_match(line) {
                self.pos += 1;
                continue;
            }
            return Err(self.err("unexpected content at this indentation level"));
        }

        Ok(tasks)
    }

    /// Consumes detail/metadata lines and child tasks belonging to the
    /// task just parsed. Details precede children.
    fn parse_task_body(&mut self, task: &mut Task, depth: usize) -> Result<()> {
        let expected = depth * INDENT_WIDTH;

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.trim().is_empty() {
                self.pos += 1;
                continue;
            }

            let indent = count_indent(line).ok_or_else(|| self.err("tabs are not allowed"))?;
            if indent < expected {
                break;
            }
            if indent > expected {
                return Err(self.err("unexpected indentation"));
            }

            if self.parse_task_line(line)?.is_some() {
                task.children = self.parse_siblings(depth, &task.id)?;
                break;
            }

            let Some(text) = line.trim_start().strip_prefix("- ") else {
                return Err(self.err("unexpected content at this indentation level"));
            };
            self.classify_sub_line(task, text);
            self.pos += 1;
        }

        Ok(())
    }

    /// Classifies one continuation bullet as metadata, references,
    /// requirements, or plain detail text.
    fn classify_sub_line(&mut self, task: &mut Task, text: &str) {
        if let Some(ids) = parse_blocked_by(text) {
            task.blocked_by = ids;
        } else if let Some(stream) = parse_stream(text) {
            task.stream = Some(stream);
        } else if let Some(owner) = parse_owner(text) {
            task.owner = Some(owner);
        } else if let Some(reqs) = text.strip_prefix("Requirements: ") {
            let (ids, file) = parse_requirements(reqs);
            if ids.is_empty() {
                // Malformed requirements line stays as plain detail text.
                task.details.push(text.to_string());
            } else {
                task.requirements = ids;
                if self.requirements_file.is_none() {
                    self.requirements_file = file;
                }
            }
        } else if let Some(refs) = text.strip_prefix("References: ") {
            task.references = refs
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect();
        } else {
            task.details.push(text.to_string());
        }
    }

    /// Returns the task when the line is a task line, `None` when it is
    /// something else, and an error when it is a malformed task line.
    fn parse_task_line(&self, line: &str) -> Result<Option<Task>> {
        if let Some(caps) = TASK_LINE.captures(line) {
            let status = Status::from_checkbox(&caps[2])
                .ok_or_else(|| self.err(&format!("invalid status: {}", &caps[2])))?;
            let (title, stable_id) = extract_stable_id(&caps[4]);
            if !is_valid_id(&caps[3]) {
                return Err(self.err(&format!("invalid task ID: {}", &caps[3])));
            }
            return Ok(Some(Task {
                title,
                status,
                stable_id,
                ..Task::default()
            }));
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with("- [") {
            if let Some(end) = trimmed.find(']') {
                let checkbox = &trimmed[2..=end];
                if Status::from_checkbox(checkbox).is_none() {
                    return Err(self.err(&format!("invalid status: {checkbox}")));
                }
                let after = &trimmed[end + 1..];
                if let Some(rest) = after.strip_prefix(' ') {
                    if !rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                        return Err(self.err("invalid task format: missing task number"));
                    }
                } else if after.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                    return Err(self.err("invalid task format: missing space after checkbox"));
                }
                return Err(self.err("invalid task format"));
            }
        }
        if trimmed.starts_with("- []") || trimmed.starts_with("-[]") {
            return Err(self.err("invalid task format: missing space in checkbox"));
        }

        Ok(None)
    }

    fn err(&self, msg: &str) -> Error {
        Error::validation(format!("line {}: {msg}", self.pos + 1))
    }
}

/// Leading space count, or `None` when the indentation contains a tab.
fn count_indent(line: &str) -> Option<usize> {
    let mut count = 0;
    for c in line.chars() {
        match c {
            ' ' => count += 1,
            '\t' => return None,
            _ => break,
        }
    }
    Some(count)
}

/// Pulls the `<!-- id:xxxxxxx -->` comment out of a raw title.
fn extract_stable_id(raw: &str) -> (String, Option<String>) {
    match STABLE_ID_COMMENT.captures(raw) {
        Some(caps) => {
            let id = caps[1].to_string();
            let title = STABLE_ID_COMMENT.replace(raw, "").trim_end().to_string();
            (title, Some(id))
        }
        None => (raw.to_string(), None),
    }
}

fn parse_blocked_by(text: &str) -> Option<Vec<String>> {
    let caps = BLOCKED_BY_LINE.captures(text)?;
    let ids: Vec<String> = BLOCKED_BY_REF
        .captures_iter(&caps[1])
        .map(|c| c[1].to_string())
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

fn parse_stream(text: &str) -> Option<u32> {
    let caps = STREAM_LINE.captures(text)?;
    caps[1].parse::<u32>().ok().filter(|s| *s > 0)
}

fn parse_owner(text: &str) -> Option<String> {
    let caps = OWNER_LINE.captures(text)?;
    let owner = caps[1].trim().to_string();
    if owner.is_empty() {
        None
    } else {
        Some(owner)
    }
}

/// Extracts requirement IDs and the requirements file path from markdown
/// links like `[1.1](requirements.md#1.1)`.
fn parse_requirements(text: &str) -> (Vec<String>, Option<String>) {
    let mut ids = Vec::new();
    let mut file = None;
    for part in text.split(',') {
        if let Some(caps) = REQUIREMENT_LINK.captures(part.trim()) {
            let id = caps[1].trim().to_string();
            if is_valid_id(&id) {
                if file.is_none() {
                    file = Some(caps[2].to_string());
                }
                ids.push(id);
            }
        }
    }
    (ids, file)
}

/// True when the text would be classified as task metadata rather than
/// plain detail text if it came back through the parser. Mirrors the
/// branches of `classify_sub_line`.
pub(crate) fn is_metadata_line(text: &str) -> bool {
    if parse_blocked_by(text).is_some()
        || parse_stream(text).is_some()
        || parse_owner(text).is_some()
        || text.starts_with("References: ")
    {
        return true;
    }
    match text.strip_prefix("Requirements: ") {
        Some(reqs) => !parse_requirements(reqs).0.is_empty(),
        None => false,
    }
}

/// Scans document lines for `## Name` headers, anchoring each to the
/// top-level task line that precedes it in the file.
pub fn extract_phase_markers(lines: &[&str]) -> Vec<PhaseMarker> {
    let mut markers = Vec::new();
    let mut last_top_level = String::new();
    let mut top_count = 0usize;

    for line in lines {
        if let Some(caps) = PHASE_HEADER.captures(line) {
            markers.push(PhaseMarker {
                name: caps[1].trim().to_string(),
                after_task_id: last_top_level.clone(),
            });
        } else if let Some(caps) = TASK_LINE.captures(line) {
            // Only unindented task lines move the anchor; positional IDs
            // in the file may be stale, so anchor by document order.
            if caps[1].is_empty() {
                top_count += 1;
                last_top_level = top_count.to_string();
            }
        }
    }

    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> (TaskList, Vec<PhaseMarker>) {
        parse_document(content).unwrap()
    }

    #[test]
    fn parses_title_and_flat_tasks() {
        let (list, markers) = parse("# My Tasks\n\n- [ ] 1. First\n\n- [x] 2. Second\n");
        assert_eq!(list.title, "My Tasks");
        assert_eq!(list.tasks.len(), 2);
        assert_eq!(list.tasks[0].id, "1");
        assert_eq!(list.tasks[0].title, "First");
        assert_eq!(list.tasks[0].status, Status::Pending);
        assert_eq!(list.tasks[1].status, Status::Completed);
        assert!(markers.is_empty());
    }

    #[test]
    fn parses_nested_tasks_with_details() {
        let content = "# T\n\n- [ ] 1. Parent\n  - a detail\n  - [-] 1.1. Child\n    - nested detail\n";
        let (list, _) = parse(content);
        assert_eq!(list.tasks.len(), 1);
        let parent = &list.tasks[0];
        assert_eq!(parent.details, vec!["a detail"]);
        assert_eq!(parent.children.len(), 1);
        let child = &parent.children[0];
        assert_eq!(child.id, "1.1");
        assert_eq!(child.status, Status::InProgress);
        assert_eq!(child.details, vec!["nested detail"]);
    }

    #[test]
    fn ids_come_from_position_not_file_contents() {
        // Stale IDs in the file are replaced by document order.
        let (list, _) = parse("# T\n\n- [ ] 3. A\n\n- [ ] 7. B\n");
        assert_eq!(list.tasks[0].id, "1");
        assert_eq!(list.tasks[1].id, "2");
    }

    #[test]
    fn parses_metadata_sub_lines() {
        let content = "# T\n\n- [ ] 1. A <!-- id:abc1234 -->\n\n- [ ] 2. B <!-- id:def5678 -->\n  - Stream: 2\n  - Owner: agent-1\n  - Blocked-by: abc1234 (A)\n";
        let (list, _) = parse(content);
        let b = &list.tasks[1];
        assert_eq!(b.stable_id.as_deref(), Some("def5678"));
        assert_eq!(b.stream, Some(2));
        assert_eq!(b.owner.as_deref(), Some("agent-1"));
        assert_eq!(b.blocked_by, vec!["abc1234"]);
        assert!(b.details.is_empty());
        assert_eq!(list.tasks[0].title, "A");
    }

    #[test]
    fn metadata_keys_are_case_insensitive() {
        let content = "# T\n\n- [ ] 1. A\n  - stream: 4\n  - OWNER: bot\n  - BLOCKED-BY: zzz9999\n";
        let (list, _) = parse(content);
        let a = &list.tasks[0];
        assert_eq!(a.stream, Some(4));
        assert_eq!(a.owner.as_deref(), Some("bot"));
        assert_eq!(a.blocked_by, vec!["zzz9999"]);
    }

    #[test]
    fn unrecognized_sub_lines_are_details() {
        let content = "# T\n\n- [ ] 1. A\n  - Stream: -3\n  - Streaming: 4\n  - Owner:\n";
        let (list, _) = parse(content);
        let a = &list.tasks[0];
        assert_eq!(a.stream, None);
        assert_eq!(a.owner, None);
        assert_eq!(a.details.len(), 3);
    }

    #[test]
    fn parses_references_and_requirements() {
        let content = "# T\n\n- [ ] 1. A\n  - References: a.md, b.md\n  - Requirements: [1.1](reqs.md#1.1), [2.3](reqs.md#2.3)\n";
        let (list, _) = parse(content);
        let a = &list.tasks[0];
        assert_eq!(a.references, vec!["a.md", "b.md"]);
        assert_eq!(a.requirements, vec!["1.1", "2.3"]);
        assert_eq!(list.requirements_file.as_deref(), Some("reqs.md"));
    }

    #[test]
    fn malformed_requirements_stay_as_detail() {
        let content = "# T\n\n- [ ] 1. A\n  - Requirements: just words\n";
        let (list, _) = parse(content);
        assert!(list.tasks[0].requirements.is_empty());
        assert_eq!(list.tasks[0].details, vec!["Requirements: just words"]);
    }

    #[test]
    fn parses_phase_markers() {
        let content = "# T\n\n## Planning\n\n- [ ] 1. A\n\n- [ ] 2. B\n\n## Execution\n\n- [ ] 3. C\n";
        let (list, markers) = parse(content);
        assert_eq!(list.tasks.len(), 3);
        assert_eq!(
            markers,
            vec![
                PhaseMarker {
                    name: "Planning".into(),
                    after_task_id: String::new()
                },
                PhaseMarker {
                    name: "Execution".into(),
                    after_task_id: "2".into()
                },
            ]
        );
    }

    #[test]
    fn deeper_headers_are_not_phases() {
        let content = "# T\n\n- [ ] 1. A\n\n### Not a phase\n";
        // H3 at root level is unexpected content.
        assert!(parse_document(content).is_err());
    }

    #[test]
    fn header_without_space_is_not_a_phase() {
        let content = "# T\n\n##NotAPhase\n\n- [ ] 1. A\n";
        assert!(parse_document(content).is_err());
    }

    #[test]
    fn parses_front_matter() {
        let content = "---\nreferences:\n- design.md\nmetadata:\n  project: alpha\n---\n# T\n\n- [ ] 1. A\n";
        let (list, _) = parse(content);
        let fm = list.front_matter.unwrap();
        assert_eq!(fm.references, vec!["design.md"]);
        assert_eq!(fm.metadata.get("project").map(String::as_str), Some("alpha"));
        assert_eq!(list.title, "T");
    }

    #[test]
    fn unclosed_front_matter_fails() {
        assert!(parse_document("---\nreferences:\n- a.md\n# T\n").is_err());
    }

    #[test]
    fn rejects_tabs_and_bad_indentation() {
        assert!(parse_document("# T\n\n- [ ] 1. A\n\t- detail\n").is_err());
        assert!(parse_document("# T\n\n   - [ ] 1. A\n").is_err());
        assert!(parse_document("# T\n\n- [ ] 1. A\n     - detail\n").is_err());
    }

    #[test]
    fn rejects_malformed_task_lines() {
        let err = parse_document("# T\n\n- [?] 1. A\n").unwrap_err();
        assert!(err.to_string().contains("invalid status"), "{err}");

        let err = parse_document("# T\n\n- [ ] no number\n").unwrap_err();
        assert!(err.to_string().contains("missing task number"), "{err}");

        let err = parse_document("# T\n\n- [ ]1. A\n").unwrap_err();
        assert!(
            err.to_string().contains("missing space after checkbox"),
            "{err}"
        );
    }

    #[test]
    fn accepts_uppercase_x_checkbox() {
        let (list, _) = parse("# T\n\n- [X] 1. Done\n");
        assert_eq!(list.tasks[0].status, Status::Completed);
    }

    #[test]
    fn oversized_content_is_rejected_before_parsing() {
        let huge = "x".repeat((MAX_FILE_SIZE + 1) as usize);
        assert!(matches!(
            parse_document(&huge),
            Err(Error::ResourceLimit(_))
        ));
    }
}
