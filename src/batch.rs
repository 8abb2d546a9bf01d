use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{PhaseMarker, Status, TaskList};
use crate::ops::{root_id, AddOptions, UpdateOptions};
use crate::render::render_document;
use crate::validate::validate_phase_name;

/// Maximum operations per batch request.
pub const MAX_BATCH_OPERATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    Add,
    Remove,
    Update,
    AddPhase,
}

impl OpType {
    /// Operation types arrive from assorted agent toolchains; accept any
    /// casing. An unrecognized type is a per-operation validation error,
    /// never a request-level parse failure, so the caller still gets an
    /// indexed `BatchResponse` entry for it.
    fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "add" => Ok(OpType::Add),
            "remove" => Ok(OpType::Remove),
            "update" => Ok(OpType::Update),
            "add-phase" | "add_phase" => Ok(OpType::AddPhase),
            other => Err(Error::validation(format!(
                "unknown operation type: {other}"
            ))),
        }
    }
}

/// One requested mutation inside a batch. `type` and `status` stay raw
/// here and are validated per operation during execution, so malformed
/// values surface as indexed errors instead of failing the whole request
/// at deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationError {
    /// Index of the failing operation in the request as submitted.
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub applied: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OperationError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auto_completed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Runs a batch atomically: every operation is applied to a scratch copy
/// of the document, and the copy replaces the live tree only when all of
/// them succeed. Each failing operation contributes one entry to
/// `errors`; a batch with any error changes nothing.
pub fn execute_batch(
    list: &mut TaskList,
    markers: &mut Vec<PhaseMarker>,
    request: &BatchRequest,
) -> Result<BatchResponse> {
    if request.operations.is_empty() {
        return Err(Error::validation("batch contains no operations"));
    }
    if request.operations.len() > MAX_BATCH_OPERATIONS {
        return Err(Error::limit(format!(
            "batch exceeds maximum of {MAX_BATCH_OPERATIONS} operations"
        )));
    }

    let ordered = order_operations(&request.operations);

    let mut work = list.clone();
    let mut work_markers = markers.clone();
    let mut errors = Vec::new();
    let mut applied = 0usize;
    let mut auto_completed: Vec<String> = Vec::new();

    for (index, op) in ordered {
        match apply_operation(&mut work, &mut work_markers, op) {
            Ok(completed) => {
                applied += 1;
                auto_completed.extend(completed);
            }
            Err(err) => errors.push(OperationError {
                index,
                error: err.to_string(),
            }),
        }
    }
    errors.sort_by_key(|e| e.index);
    auto_completed.sort_by(|a, b| compare_ids(a, b));
    auto_completed.dedup();

    if !errors.is_empty() {
        return Ok(BatchResponse {
            success: false,
            applied: 0,
            errors,
            auto_completed: Vec::new(),
            preview: None,
        });
    }

    let preview = if request.dry_run {
        Some(render_document(&work, &work_markers))
    } else {
        *list = work;
        *markers = work_markers;
        None
    };

    Ok(BatchResponse {
        success: true,
        applied,
        errors: Vec::new(),
        auto_completed,
        preview,
    })
}

/// Orders operations so earlier ones cannot shift the targets of later
/// ones: positional adds run first, highest position first, and removes
/// run highest ID first among themselves while keeping their place
/// relative to the other operations. Original request indices ride along
/// for error reporting.
fn order_operations(operations: &[Operation]) -> Vec<(usize, &Operation)> {
    let mut positional: Vec<(usize, &Operation)> = Vec::new();
    let mut rest: Vec<(usize, &Operation)> = Vec::new();
    for (i, op) in operations.iter().enumerate() {
        let op_type = OpType::parse(&op.op_type);
        if matches!(op_type, Ok(OpType::Add)) && op.position.is_some() && op.phase.is_none() {
            positional.push((i, op));
        } else {
            rest.push((i, op));
        }
    }
    positional.sort_by(|a, b| {
        compare_ids(
            b.1.position.as_deref().unwrap_or(""),
            a.1.position.as_deref().unwrap_or(""),
        )
    });

    let remove_slots: Vec<usize> = rest
        .iter()
        .enumerate()
        .filter(|(_, (_, op))| matches!(OpType::parse(&op.op_type), Ok(OpType::Remove)))
        .map(|(slot, _)| slot)
        .collect();
    let mut removes: Vec<(usize, &Operation)> = remove_slots
        .iter()
        .map(|&slot| rest[slot])
        .collect();
    removes.sort_by(|a, b| compare_ids(&b.1.id, &a.1.id));
    for (slot, entry) in remove_slots.into_iter().zip(removes) {
        rest[slot] = entry;
    }

    positional.extend(rest);
    positional
}

/// Numeric component-wise comparison of dotted hierarchical IDs, so that
/// "10" orders after "9" and "1.10" after "1.9".
pub(crate) fn compare_ids(a: &str, b: &str) -> Ordering {
    let mut xs = a.split('.').map(|p| p.parse::<u64>().unwrap_or(0));
    let mut ys = b.split('.').map(|p| p.parse::<u64>().unwrap_or(0));
    loop {
        match (xs.next(), ys.next()) {
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Equal => continue,
                other => return other,
            },
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Parses the raw status value with the same numeric/named forms the
/// model accepts, reporting failures as validation errors.
fn parse_status(raw: &serde_json::Value) -> Result<Status> {
    serde_json::from_value(raw.clone()).map_err(|e| Error::validation(e.to_string()))
}

fn apply_operation(
    list: &mut TaskList,
    markers: &mut Vec<PhaseMarker>,
    op: &Operation,
) -> Result<Vec<String>> {
    match OpType::parse(&op.op_type)? {
        OpType::Add => {
            if op.title.is_empty() {
                return Err(Error::validation("add operation requires a title"));
            }
            let opts = AddOptions {
                position: op.position.clone(),
                details: op.details.clone().unwrap_or_default(),
                references: op.references.clone().unwrap_or_default(),
                requirements: op.requirements.clone().unwrap_or_default(),
                stream: op.stream,
                blocked_by: op.blocked_by.clone().unwrap_or_default(),
                owner: op.owner.clone(),
            };
            match &op.phase {
                Some(phase) => {
                    if !op.parent.is_empty() {
                        return Err(Error::validation(
                            "phase cannot be combined with a parent",
                        ));
                    }
                    add_task_to_phase(list, markers, phase, &op.title, opts)?;
                }
                None => {
                    list.add_task(&op.parent, &op.title, opts)?;
                }
            }
            Ok(Vec::new())
        }
        OpType::Remove => {
            if op.id.is_empty() {
                return Err(Error::validation("remove operation requires an id"));
            }
            let is_top_level = !op.id.contains('.');
            let anchor = op.id.clone();
            list.remove_task(&op.id)?;
            if is_top_level {
                adjust_markers_for_removal(markers, &anchor);
            }
            Ok(Vec::new())
        }
        OpType::Update => {
            if op.id.is_empty() {
                return Err(Error::validation("update operation requires an id"));
            }
            let status = match &op.status {
                Some(raw) => Some(parse_status(raw)?),
                None => None,
            };
            let opts = UpdateOptions {
                title: if op.title.is_empty() {
                    None
                } else {
                    Some(op.title.clone())
                },
                status,
                details: op.details.clone(),
                references: op.references.clone(),
                requirements: op.requirements.clone(),
                stream: op.stream,
                blocked_by: op.blocked_by.clone(),
                owner: op.owner.clone(),
                release: false,
            };
            let outcome = list.update_task(&op.id, opts)?;
            Ok(outcome.auto_completed)
        }
        OpType::AddPhase => {
            let name = op
                .phase
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| Error::validation("add-phase operation requires a phase name"))?;
            add_phase(list, markers, name)?;
            Ok(Vec::new())
        }
    }
}

/// Appends a phase header after the current last top-level task.
pub fn add_phase(list: &TaskList, markers: &mut Vec<PhaseMarker>, name: &str) -> Result<()> {
    validate_phase_name(name)?;
    if markers.iter().any(|m| m.name == name) {
        return Err(Error::validation(format!("phase already exists: {name}")));
    }
    let anchor = match list.tasks.last() {
        Some(task) => task.id.clone(),
        None => String::new(),
    };
    markers.push(PhaseMarker {
        name: name.to_string(),
        after_task_id: anchor,
    });
    Ok(())
}

/// Inserts a task as the last task of the named phase, repairing the
/// immediately following phase marker's anchor. Earlier markers cannot be
/// affected by an insertion at the phase's end; later markers past the
/// next one are deliberately left alone. A phase that does not exist yet
/// is created at the end of the document.
pub fn add_task_to_phase(
    list: &mut TaskList,
    markers: &mut Vec<PhaseMarker>,
    phase: &str,
    title: &str,
    mut opts: AddOptions,
) -> Result<String> {
    let Some(marker_index) = markers.iter().position(|m| m.name == phase) else {
        add_phase(list, markers, phase)?;
        opts.position = None;
        return list.add_task("", title, opts);
    };

    match markers.get(marker_index + 1).cloned() {
        None => {
            // Last phase extends to the end of the document.
            opts.position = None;
            list.add_task("", title, opts)
        }
        Some(next) => {
            let boundary: usize = if next.after_task_id.is_empty() {
                0
            } else {
                root_id(&next.after_task_id)
                    .parse()
                    .map_err(|_| Error::validation(format!(
                        "phase marker has invalid anchor: {}",
                        next.after_task_id
                    )))?
            };
            opts.position = Some(format!("{}", boundary + 1));
            let id = list.add_task("", title, opts)?;
            markers[marker_index + 1].after_task_id = id.clone();
            Ok(id)
        }
    }
}

/// Re-anchors markers after a top-level task was removed: later anchors
/// shift down by one, and a marker anchored to the removed task itself
/// falls back to the preceding task.
pub fn adjust_markers_for_removal(markers: &mut [PhaseMarker], removed_id: &str) {
    let removed: u64 = match removed_id.parse() {
        Ok(n) => n,
        Err(_) => return,
    };
    for marker in markers {
        if marker.after_task_id.is_empty() {
            continue;
        }
        let Ok(anchor) = marker.after_task_id.parse::<u64>() else {
            continue;
        };
        match anchor.cmp(&removed) {
            Ordering::Equal => {
                marker.after_task_id = if removed > 1 {
                    format!("{}", removed - 1)
                } else {
                    String::new()
                };
            }
            Ordering::Greater => {
                marker.after_task_id = format!("{}", anchor - 1);
            }
            Ordering::Less => {}
        }
    }
}
