use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{PhaseMarker, TaskList};
use crate::ops::MAX_TASK_COUNT;
use crate::parse::{parse_document, MAX_FILE_SIZE};
use crate::render::render_document;

/// Loads and parses a task file. File size is checked before reading and
/// the task count after parsing, so oversized input is rejected cheaply.
pub fn read_document(path: &Path) -> Result<(TaskList, Vec<PhaseMarker>)> {
    let meta = fs::metadata(path)
        .map_err(|e| Error::io(format!("stat {}", path.display()), e))?;
    if meta.len() > MAX_FILE_SIZE {
        return Err(Error::limit(format!(
            "file exceeds maximum size of {} bytes",
            MAX_FILE_SIZE
        )));
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("read {}", path.display()), e))?;
    let (list, markers) = parse_document(&content)?;
    if list.count_tasks() > MAX_TASK_COUNT {
        return Err(Error::limit(format!(
            "file contains more than {MAX_TASK_COUNT} tasks"
        )));
    }
    Ok((list, markers))
}

/// Renders and writes the document atomically: the full content goes to a
/// temp file in the target directory, which is then persisted over the
/// original so readers never observe a partial write. Existing file
/// permissions survive the rewrite.
pub fn write_document(path: &Path, list: &TaskList, markers: &[PhaseMarker]) -> Result<()> {
    let content = render_document(list, markers);
    write_atomic(path, content.as_bytes())
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir),
        None => tempfile::NamedTempFile::new_in("."),
    }
    .map_err(|e| Error::io(format!("create temp file for {}", path.display()), e))?;

    tmp.write_all(content)
        .map_err(|e| Error::io(format!("write {}", path.display()), e))?;

    #[cfg(unix)]
    if let Ok(meta) = fs::metadata(path) {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(meta.permissions().mode());
        tmp.as_file()
            .set_permissions(perms)
            .map_err(|e| Error::io(format!("set permissions on {}", path.display()), e))?;
    }

    tmp.persist(path)
        .map_err(|e| Error::io(format!("replace {}", path.display()), e.error))?;
    Ok(())
}

/// Copies the file's current bytes to a sibling `<file>.bak` before a
/// destructive rewrite. Permissions are carried over.
pub fn write_backup(path: &Path) -> Result<std::path::PathBuf> {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    let backup = std::path::PathBuf::from(backup);
    fs::copy(path, &backup)
        .map_err(|e| Error::io(format!("back up {}", path.display()), e))?;
    Ok(backup)
}
