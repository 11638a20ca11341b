//! One-shot commands operating on watched files.

use confwatch_core::{Engine, ErrorKind};
use tracing::warn;

/// List watched files and any histories left behind by removed entries.
pub async fn handle_list(engine: &Engine) -> anyhow::Result<()> {
    let files = engine.files().await?;

    if files.is_empty() {
        println!("No files are being watched.");
        println!("Add paths under `watch:` in the configuration file.");
    } else {
        println!("{:<9} {:>9}  FILE", "STATUS", "SNAPSHOTS");
        println!("{}", "-".repeat(60));
        for file in &files {
            let status = if !file.exists {
                "missing"
            } else if file.has_history {
                "tracked"
            } else {
                "new"
            };
            println!("{:<9} {:>9}  {}", status, file.history_count, file.name);
        }
    }

    let orphaned = engine.orphaned_paths().await?;
    if !orphaned.is_empty() {
        println!();
        println!("Histories for files no longer watched:");
        for path in orphaned {
            println!("  {}", path.display());
        }
    }

    Ok(())
}

/// Snapshot the given files, or every watched file when none are given.
///
/// In the every-file case a file that cannot be read is skipped with a
/// warning; a named file that cannot be read is an error.
pub async fn handle_snapshot(
    engine: &Engine,
    files: &[String],
    comment: Option<&str>,
    force: bool,
) -> anyhow::Result<()> {
    let all = files.is_empty();
    let names: Vec<String> = if all {
        engine
            .registry()
            .targets()
            .iter()
            .map(|t| t.name.clone())
            .collect()
    } else {
        files.to_vec()
    };

    if names.is_empty() {
        println!("No files are being watched.");
        return Ok(());
    }

    for name in &names {
        match engine.snapshot(name, comment, force).await {
            Ok(outcome) if outcome.is_created() => {
                println!(
                    "Snapshot {} created for {}",
                    outcome.snapshot().hash.short(),
                    name
                );
            }
            Ok(_) => println!("No changes detected in {}", name),
            Err(e) if all && e.kind() == ErrorKind::Io => {
                warn!(file = %name, error = %e, "Skipping unreadable file");
                println!("Skipped {}: {}", name, e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Print the history of a file, oldest first.
pub async fn handle_history(engine: &Engine, file: &str) -> anyhow::Result<()> {
    let records = engine.history(file).await?;

    if records.is_empty() {
        println!("No snapshots recorded for {}", file);
        return Ok(());
    }

    println!(
        "{:>4}  {:<12}  {:<27}  {:<8}  COMMENT",
        "SEQ", "HASH", "DATE", "ACTION"
    );
    println!("{}", "-".repeat(78));
    for record in &records {
        println!(
            "{:>4}  {:<12}  {:<27}  {:<8}  {}",
            record.seq,
            record.hash.short(),
            record.date,
            record.action.as_str(),
            record.comment.as_deref().unwrap_or("")
        );
    }

    let tags = engine.tags(file).await?;
    if !tags.is_empty() {
        println!();
        println!("Tags:");
        for (name, hash) in &tags {
            println!("  {:<16} {}", name, hash.short());
        }
    }

    Ok(())
}

/// Print a diff: two snapshots when `range` is set, otherwise the working
/// copy against the latest snapshot.
pub async fn handle_diff(
    engine: &Engine,
    file: &str,
    range: Option<(String, String)>,
) -> anyhow::Result<()> {
    let diff = match range {
        Some((from, to)) => engine.diff_between(file, &from, &to).await?,
        None => engine.diff_working(file).await?,
    };

    if diff.is_empty() {
        println!("No differences");
    } else {
        print!("{}", diff);
    }
    Ok(())
}

pub async fn handle_rollback(engine: &Engine, file: &str, hash: &str) -> anyhow::Result<()> {
    let outcome = engine.rollback(file, hash).await?;
    println!("{}", outcome.message());
    Ok(())
}

pub async fn handle_tag(engine: &Engine, file: &str, name: &str) -> anyhow::Result<()> {
    let snapshot = engine.tag(file, name).await?;
    println!(
        "Tagged snapshot {} as '{}' for {}",
        snapshot.hash.short(),
        name,
        file
    );
    Ok(())
}
