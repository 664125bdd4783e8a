use anyhow::Result;
use colored::Colorize;
use entrack_store::Storage;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub fn run(db: Option<PathBuf>) -> Result<()> {
    let db_path = super::get_db_path(db);

    if !db_path.exists() {
        println!("{}", "No entrack database found".red());
        println!("Run {} to create one", "entrack demo".cyan());
        return Ok(());
    }

    let storage = Storage::new(&db_path)?;
    let entities = storage.list_entities(None)?;

    println!("{}", "Store Status".bold().cyan());
    println!("  {}: {}", "Database".bold(), db_path.display());
    println!(
        "  {}: {}",
        "Entities".bold(),
        storage.entity_count()?.to_string().yellow()
    );

    let mut per_class: BTreeMap<&str, usize> = BTreeMap::new();
    for entity in &entities {
        *per_class.entry(entity.class.as_str()).or_default() += 1;
    }
    for (class, count) in &per_class {
        println!("    {} {}", class, format!("({})", count).dimmed());
    }
    println!();

    match storage.latest_flush()? {
        Some(flush) => {
            println!(
                "{} {}",
                "Last flush:".bold(),
                flush.id.to_string().yellow()
            );
            println!(
                "  {}: {}",
                "Date".bold(),
                flush.timestamp.format("%Y-%m-%d %H:%M:%S")
            );
            println!(
                "  {} insert(s), {} update(s), {} property change(s)",
                flush.inserted.to_string().cyan(),
                flush.updated.to_string().cyan(),
                flush.updates.len().to_string().cyan()
            );
        }
        None => {
            println!("{}", "No flushes yet".green());
        }
    }

    Ok(())
}
