use anyhow::Result;
use colored::Colorize;
use entrack_store::Storage;
use std::path::PathBuf;

pub fn run(limit: Option<usize>, db: Option<PathBuf>) -> Result<()> {
    let db_path = super::get_db_path(db);

    if !db_path.exists() {
        anyhow::bail!("No entrack database found. Run 'entrack demo' first.");
    }

    let storage = Storage::new(&db_path)?;
    let flushes = storage.list_flushes()?;

    if flushes.is_empty() {
        println!("{}", "No flushes yet".yellow());
        return Ok(());
    }

    println!("{}", "Flush History".bold().cyan());
    println!();

    let to_show = limit.unwrap_or(flushes.len()).min(flushes.len());

    for info in flushes.iter().take(to_show) {
        let flush = &info.flush;

        println!(
            "{} {}",
            "flush".yellow().bold(),
            flush.id.to_string().yellow()
        );
        println!(
            "{}: {}",
            "Date".bold(),
            flush.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
        println!(
            "    {} insert(s), {} update(s)",
            flush.inserted.to_string().cyan(),
            flush.updated.to_string().cyan()
        );
        println!(
            "    {} property change(s), {} forced",
            info.update_count.to_string().cyan(),
            info.forced_count.to_string().magenta()
        );

        for property in info.properties_affected.iter().take(5) {
            println!("      • {}", property.dimmed());
        }
        if info.properties_affected.len() > 5 {
            println!(
                "      {} and {} more...",
                "...".dimmed(),
                (info.properties_affected.len() - 5).to_string().dimmed()
            );
        }

        println!();
    }

    if flushes.len() > to_show {
        println!(
            "{}",
            format!("... and {} more flushes", flushes.len() - to_show).dimmed()
        );
        println!("Use {} to see more", "--limit N".cyan());
    }

    Ok(())
}
