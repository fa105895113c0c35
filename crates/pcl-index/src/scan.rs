use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use pcl_syntax::{Configuration, Parse};
use rayon::prelude::*;

use crate::error::IndexError;
use crate::options::ScanOptions;
use crate::shared::SharedTree;

/// Outcome of [`SharedTree::scan_directory`].
#[derive(Debug, Default)]
pub struct ScanReport {
    pub indexed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, IndexError)>,
}

impl ScanReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

type ParseResult = Result<(PathBuf, Configuration), (PathBuf, IndexError)>;

type Discovered = (Vec<PathBuf>, Vec<(PathBuf, IndexError)>);

/// Files under `root` with `extension`, plus the entries glob could not read.
fn discover_extension(
    root: &str,
    extension: &str,
    match_options: glob::MatchOptions,
) -> Result<Discovered, IndexError> {
    let pattern = format!("{}/**/*.{}", root, extension);
    let mut paths = Vec::new();
    let mut failed = Vec::new();

    for entry in glob::glob_with(&pattern, match_options)? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("Skipping unreadable path {}: {}", err.path().display(), err);
                failed.push((err.path().to_path_buf(), IndexError::Glob(err)));
            }
        }
    }
    Ok((paths, failed))
}

/// Source files under `root` with one of the configured extensions, one
/// glob walk per extension on `pool`.
fn discover(root: &Path, options: &ScanOptions, pool: &rayon::ThreadPool) -> Result<Discovered, IndexError> {
    let match_options = glob::MatchOptions {
        require_literal_leading_dot: !options.follow_hidden,
        ..Default::default()
    };
    let base = glob::Pattern::escape(&root.to_string_lossy());

    let walks = pool.install(|| {
        options
            .extensions
            .par_iter()
            .map(|extension| discover_extension(&base, extension, match_options))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let (paths, failed): (Vec<_>, Vec<_>) = walks.into_iter().unzip();
    Ok((
        paths.into_iter().flatten().sorted().dedup().collect(),
        failed.into_iter().flatten().collect(),
    ))
}

fn parse_file(parser: &dyn Parse, path: PathBuf) -> ParseResult {
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(source) => {
            let err = IndexError::Io {
                path: path.clone(),
                source,
            };
            return Err((path, err));
        }
    };

    match parser.parse(&path, &text) {
        Ok(config) => Ok((path, config)),
        Err(source) => {
            let err = IndexError::Parse {
                path: path.clone(),
                source,
            };
            Err((path, err))
        }
    }
}

impl SharedTree {
    /// Indexes every matching file under `root`.
    ///
    /// Discovery and parsing run on a dedicated pool of
    /// `options.concurrency` threads. Results come back over a channel to
    /// the calling thread, which applies each file, under its own write
    /// lock, as soon as every path sorting before it has been applied.
    /// References are resolved once at the end.
    pub fn scan_directory(
        &self,
        root: &Path,
        parser: Arc<dyn Parse>,
        options: &ScanOptions,
    ) -> Result<ScanReport, IndexError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.concurrency.max(1))
            .thread_name(|index| format!("pcl-scan-{index}"))
            .build()?;

        let (paths, failed) = discover(root, options, &pool)?;
        let mut report = ScanReport {
            failed,
            ..Default::default()
        };
        tracing::debug!("Discovered {} files under {}", paths.len(), root.display());

        let (tx, rx) = crossbeam_channel::unbounded::<(usize, ParseResult)>();
        for (index, path) in paths.into_iter().enumerate() {
            let tx = tx.clone();
            let parser = Arc::clone(&parser);
            pool.spawn(move || {
                let _ = tx.send((index, parse_file(parser.as_ref(), path)));
            });
        }
        drop(tx);

        // Results arrive in any order; only those ahead of the next path
        // to apply are held.
        let mut pending = BTreeMap::new();
        let mut next = 0;
        for (index, result) in rx {
            pending.insert(index, result);
            while let Some(result) = pending.remove(&next) {
                next += 1;
                match result {
                    Ok((path, config)) => {
                        self.add_file(path.clone(), &config);
                        report.indexed.push(path);
                    }
                    Err((path, err)) => {
                        tracing::warn!("Skipping {}: {}", path.display(), err);
                        report.failed.push((path, err));
                    }
                }
            }
        }

        report.failed.sort_by(|(a, _), (b, _)| a.cmp(b));
        let unresolved = self.resolve_references();

        tracing::info!(
            "Indexed {} files under {} ({} failed, {} unresolved references)",
            report.indexed.len(),
            root.display(),
            report.failed.len(),
            unresolved
        );
        Ok(report)
    }
}
