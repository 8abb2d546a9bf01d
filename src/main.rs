mod batch;
mod cli;
mod deps;
mod error;
mod file;
mod model;
mod ops;
mod output;
mod parse;
mod render;
mod stable_id;
mod validate;

use std::io::Read as _;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;

use batch::BatchRequest;
use cli::{Cli, Command};
use model::{FrontMatter, Status, TaskList};
use ops::{AddOptions, UpdateOptions};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn report_auto_completed(ids: &[String]) {
    for id in ids {
        eprintln!("Auto-completed parent task {id}");
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Create { file, title } => {
            if file.exists() {
                bail!("file already exists: {}", file.display());
            }
            let list = TaskList::new(title);
            file::write_document(&file, &list, &[])?;
            eprintln!("Created {}", file.display());
        }

        Command::Add {
            file,
            title,
            parent,
            position,
            phase,
        } => {
            let (mut list, mut markers) = file::read_document(&file)?;
            let opts = AddOptions {
                position,
                ..AddOptions::default()
            };
            let id = match phase {
                Some(phase) => {
                    if !parent.is_empty() {
                        bail!("--phase cannot be combined with --parent");
                    }
                    batch::add_task_to_phase(&mut list, &mut markers, &phase, &title, opts)?
                }
                None => list.add_task(&parent, &title, opts)?,
            };
            file::write_document(&file, &list, &markers)?;
            eprintln!("Added task {id}");
        }

        Command::AddPhase { file, name } => {
            let (list, mut markers) = file::read_document(&file)?;
            batch::add_phase(&list, &mut markers, &name)?;
            file::write_document(&file, &list, &markers)?;
            eprintln!("Added phase '{name}'");
        }

        Command::AddFrontmatter {
            file,
            references,
            meta,
        } => {
            let (mut list, markers) = file::read_document(&file)?;
            let fm = list.front_matter.get_or_insert_with(FrontMatter::default);
            fm.references.extend(references);
            for entry in meta {
                let (key, value) = entry
                    .split_once(':')
                    .with_context(|| format!("invalid metadata entry (want key:value): {entry}"))?;
                let key = key.trim();
                validate::validate_metadata_key(key)?;
                fm.metadata.insert(key.to_string(), value.trim().to_string());
            }
            file::write_document(&file, &list, &markers)?;
            eprintln!("Updated front matter in {}", file.display());
        }

        Command::Update {
            file,
            id,
            title,
            details,
            references,
            requirements,
            stream,
            owner,
            release,
            blocked_by,
        } => {
            let (mut list, markers) = file::read_document(&file)?;
            let outcome = list.update_task(
                &id,
                UpdateOptions {
                    title,
                    status: None,
                    details,
                    references,
                    requirements,
                    stream,
                    blocked_by,
                    owner,
                    release,
                },
            )?;
            file::write_document(&file, &list, &markers)?;
            eprintln!("Updated task {id}");
            report_auto_completed(&outcome.auto_completed);
        }

        Command::Complete { file, id } => {
            let (mut list, markers) = file::read_document(&file)?;
            let outcome = list.update_task(
                &id,
                UpdateOptions {
                    status: Some(Status::Completed),
                    ..UpdateOptions::default()
                },
            )?;
            file::write_document(&file, &list, &markers)?;
            eprintln!("Completed task {id}");
            report_auto_completed(&outcome.auto_completed);
        }

        Command::Uncomplete { file, id } => {
            let (mut list, markers) = file::read_document(&file)?;
            list.update_task(
                &id,
                UpdateOptions {
                    status: Some(Status::Pending),
                    ..UpdateOptions::default()
                },
            )?;
            file::write_document(&file, &list, &markers)?;
            eprintln!("Reopened task {id}");
        }

        Command::Remove { file, id } => {
            let (mut list, mut markers) = file::read_document(&file)?;
            let is_top_level = !id.contains('.');
            let outcome = list.remove_task(&id)?;
            if is_top_level {
                batch::adjust_markers_for_removal(&mut markers, &id);
            }
            file::write_document(&file, &list, &markers)?;
            eprintln!(
                "Removed task {id} ({} tasks including subtasks)",
                outcome.removed
            );
            for dep in &outcome.dependents {
                eprintln!("warning: task {dep} was blocked by a removed task");
            }
        }

        Command::List { file, json } => {
            let (list, _) = file::read_document(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                print!("{}", output::format_task_tree(&list));
            }
        }

        Command::Batch {
            file,
            input,
            dry_run,
        } => {
            let raw = match input {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let mut request: BatchRequest =
                serde_json::from_str(&raw).context("invalid batch request")?;
            request.dry_run = request.dry_run || dry_run;

            let (mut list, mut markers) = file::read_document(&file)?;
            let response = batch::execute_batch(&mut list, &mut markers, &request)?;
            if response.success && !request.dry_run {
                file::write_document(&file, &list, &markers)?;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.success {
                std::process::exit(1);
            }
        }

        Command::Streams {
            file,
            available,
            json,
        } => {
            let (list, _) = file::read_document(&file)?;
            let report = deps::analyze_streams(&list);
            if available {
                if json {
                    println!("{}", serde_json::to_string_pretty(&report.available)?);
                } else {
                    for stream in &report.available {
                        println!("{stream}");
                    }
                }
            } else if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", output::format_stream_report(&report));
            }
        }

        Command::Next {
            file,
            stream,
            claim,
            json,
        } => {
            run_next(&file, stream, claim, json)?;
        }

        Command::Renumber { file } => {
            let (mut list, markers) = file::read_document(&file)?;
            let backup = file::write_backup(&file)?;
            list.renumber();
            file::write_document(&file, &list, &markers)?;
            eprintln!(
                "Renumbered {} (backup at {})",
                file.display(),
                backup.display()
            );
        }
    }

    Ok(())
}

fn run_next(file: &Path, stream: Option<u32>, claim: Option<String>, json: bool) -> Result<()> {
    let (mut list, markers) = file::read_document(file)?;

    if let Some(agent) = claim {
        let Some(candidate) = deps::ready_tasks(&list, stream).into_iter().next() else {
            eprintln!("No ready tasks");
            std::process::exit(1);
        };
        deps::claim_task(&mut list, &candidate.id, &agent)?;
        file::write_document(file, &list, &markers)?;
        let task = list.find_task(&candidate.id).context("claimed task vanished")?;
        if json {
            println!("{}", serde_json::to_string_pretty(task)?);
        } else {
            println!("{}", task.id);
            eprintln!("Claimed task {} for '{agent}'", task.id);
        }
        return Ok(());
    }

    if let Some(stream) = stream {
        let ready = deps::ready_tasks(&list, Some(stream));
        let Some(task) = ready.first() else {
            eprintln!("No ready tasks in stream {stream}");
            std::process::exit(1);
        };
        if json {
            println!("{}", serde_json::to_string_pretty(task)?);
        } else {
            println!("{}. {}", task.id, task.title);
        }
        return Ok(());
    }

    match deps::next_task(&list) {
        Some(next) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&next)?);
            } else {
                print!("{}", output::format_next_task(&next));
            }
        }
        None => {
            eprintln!("All tasks complete");
        }
    }
    Ok(())
}
