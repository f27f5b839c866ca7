use crate::cli::IndexArgs;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::extract::FieldRecord;
use crate::index::{TantivyBackend, TantivyIndex};
use crate::indexer::{PathChange, XmlIndexer};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Run the index command
pub fn run(args: IndexArgs) -> Result<()> {
    if !args.dir.is_dir() {
        return Err(Error::ConfigError {
            message: format!("{} is not a directory", args.dir.display()),
        });
    }

    let start = Instant::now();
    let config = Config::load()?;
    let name = args.index.clone().unwrap_or_else(|| args.repo.clone());
    let index_dir = Config::index_dir(&name)?;
    info!(index = %name, dir = %index_dir.display(), rev = args.rev, "Indexing revision");

    let index = Arc::new(TantivyIndex::open_or_create(&index_dir)?);
    let backend = TantivyBackend::new(Arc::clone(&index), config.index.writer_heap_bytes)?;
    let max_file_size = config.index.max_file_size;
    let mut indexer = XmlIndexer::new(config, backend, index)?;

    let indexed_at = chrono::Utc::now().to_rfc3339();
    let base = |path: &str| {
        let mut base = FieldRecord::new();
        base.set("repo", args.repo.as_str());
        base.set("path", path);
        base.set("rev", args.rev.to_string());
        base.set("indexed_at", indexed_at.as_str());
        for (key, value) in &args.properties {
            base.add(key.as_str(), value.as_str());
        }
        base
    };

    let mut changes: Vec<PathChange> = args
        .deleted
        .iter()
        .map(|path| PathChange::delete(base(&normalize_path(path))))
        .collect();

    for entry in WalkDir::new(&args.dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Failed to walk entry");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_xml(path) {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if size > max_file_size {
            warn!(path = %path.display(), size, "Skipping file over size limit");
            continue;
        }

        let content = std::fs::read(path)?;
        let relative = repository_path(&args.dir, path);
        debug!(path = %relative, bytes = content.len(), "Queued");
        // The walker cannot tell new files from changed ones
        changes.push(PathChange::modify(base(&relative), content));
    }

    let report = indexer.index_changes(&changes)?;
    let stats = indexer.finish()?;
    let elapsed = start.elapsed();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Indexed {} documents ({} elements) in {:.2}s, {} deleted",
        report.indexed,
        report.elements,
        elapsed.as_secs_f64(),
        report.deleted
    );
    println!(
        "Wrote {} records in {} batches",
        stats.records_written, stats.batches_flushed
    );
    for path in &report.malformed {
        println!("  malformed: {}", path);
    }
    for failure in &report.failed {
        println!("  failed: {} ({})", failure.path, failure.message);
    }
    Ok(())
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// `/`-separated path below `root`, with a leading `/`
fn repository_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", joined.join("/"))
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
