use anyhow::Result;
use colored::Colorize;
use entrack_store::diff::{DiffLineType, ValueDiff};
use entrack_store::{Storage, UpdateKind};
use std::path::PathBuf;

pub fn run(flush_id: String, db: Option<PathBuf>) -> Result<()> {
    let db_path = super::get_db_path(db);

    if !db_path.exists() {
        anyhow::bail!("No entrack database found. Run 'entrack demo' first.");
    }

    let storage = Storage::new(&db_path)?;
    let flush = storage.find_flush(&flush_id)?;
    let updates = storage.get_updates_for_flush(&flush.id)?;

    println!("{}", format!("Diff for flush {}", flush.id).bold().cyan());
    println!(
        "{}: {}",
        "Date".bold(),
        flush.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
    println!();

    if updates.is_empty() {
        println!("{}", "No property changes recorded".green());
        return Ok(());
    }

    for update in updates {
        println!("{}", "━".repeat(80).bright_black());

        let status = match update.kind {
            UpdateKind::Forced => "FRC".magenta(),
            UpdateKind::Notified => "NTF".blue(),
        };

        let diff = ValueDiff::from_update(&update);
        println!("{} {}", status, diff.label.white().bold());
        println!();

        if !diff.has_changes() {
            println!("  {}", "[Values render identically]".dimmed());
        }

        for hunk in &diff.hunks {
            println!("{}", hunk.header().cyan());
            for line in &hunk.lines {
                let color: fn(&str) -> colored::ColoredString = match line.line_type {
                    DiffLineType::Addition => |s| s.green(),
                    DiffLineType::Deletion => |s| s.red(),
                    DiffLineType::Context => |s| s.normal(),
                };
                let line_number = line
                    .new_line_number
                    .or(line.old_line_number)
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                print!(
                    "{:>4} {}",
                    line_number.dimmed(),
                    color(&format!("{}{}", line.line_type.prefix(), line.content))
                );
            }
        }
        println!();
    }

    Ok(())
}
