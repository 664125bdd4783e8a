use crate::sample::{self, Playlist};
use anyhow::{Context, Result};
use colored::Colorize;
use entrack_core::{EntityClass, TrackerOptions};
use entrack_store::{EntityManager, UpdateKind};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub fn run(
    tracks: Vec<String>,
    no_tracker: bool,
    discard: bool,
    db: Option<PathBuf>,
) -> Result<()> {
    let db_path = super::get_db_path(db);

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let registry = Arc::new(sample::registry());
    let mut manager = EntityManager::open(&db_path, registry)?;
    if !no_tracker {
        manager = manager.with_change_tracker(TrackerOptions::default());
    }

    let mut handles = manager.find_all(Playlist::CLASS)?;
    if handles.is_empty() {
        println!("{}", "No playlists stored yet, seeding one".yellow());
        manager.persist(Playlist::new("Road trip", &["Intro", "Highway"]))?;
        manager.flush()?;
        manager.clear()?;
        handles = manager.find_all(Playlist::CLASS)?;
    }

    println!(
        "{} {} playlist(s)",
        "Loaded".bold(),
        handles.len().to_string().cyan()
    );

    for handle in &handles {
        let Some(playlist) = manager.get_mut::<Playlist>(*handle) else {
            continue;
        };

        let appended = if tracks.is_empty() {
            vec![format!("Track {}", playlist.tracks.len() + 1)]
        } else {
            tracks.clone()
        };
        debug!("Appending {:?} to {}", appended, playlist.id);

        println!(
            "  {} {} {}",
            "~".yellow(),
            playlist.title.white().bold(),
            format!("+{}", appended.join(", ")).green()
        );
        playlist.tracks.extend(appended);
    }
    println!();

    if discard {
        let mut restored = 0;
        for handle in &handles {
            restored += manager.revert(*handle)?;
        }
        println!(
            "{} {} propert(ies) from their snapshots",
            "Reverted".bold(),
            restored.to_string().cyan()
        );
    }

    let flush = manager.flush()?;

    if flush.is_empty() {
        println!("{}", "Nothing was written".yellow());
        if no_tracker {
            println!(
                "In-place changes are invisible without the tracker. Run {} without {}",
                "entrack demo".cyan(),
                "--no-tracker".cyan()
            );
        }
        return Ok(());
    }

    println!(
        "{} {}",
        "Flushed".green().bold(),
        flush.id.to_string().yellow()
    );
    println!(
        "  {} insert(s), {} update(s)",
        flush.inserted.to_string().cyan(),
        flush.updated.to_string().cyan()
    );

    for update_id in &flush.updates {
        let update = manager.storage().get_update(update_id)?;
        let kind = match update.kind {
            UpdateKind::Forced => "forced".magenta(),
            UpdateKind::Notified => "notified".blue(),
        };
        println!(
            "  {} {}.{} ({})",
            kind,
            update.class,
            update.property,
            update.entity_id.to_string().dimmed()
        );
    }

    println!();
    println!(
        "Run {} to see the changes",
        format!("entrack diff {}", &flush.id.to_string()[..8]).cyan()
    );

    Ok(())
}
