use crate::config::LocalFileOrder;
use crate::models::{LocalFileRecord, Release};
use crate::parser::{MetadataExtractor, normalize_title};
use std::cmp::Reverse;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LocalStateError {
    #[error("failed to create {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to list {path}: {source}")]
    List { path: PathBuf, source: io::Error },

    #[error("failed to stat {path}: {source}")]
    Stat { path: PathBuf, source: io::Error },

    #[error("directory scan interrupted: {0}")]
    Interrupted(String),
}

/// Blocking filesystem access used by the reconciler.
pub trait LibraryFs: Send + Sync {
    fn ensure_directory(&self, path: &Path) -> io::Result<()>;

    /// File names (not paths) directly inside `path`.
    fn list_directory(&self, path: &Path) -> io::Result<Vec<String>>;

    fn modified_time(&self, path: &Path) -> io::Result<SystemTime>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LibraryFs for LocalFs {
    fn ensure_directory(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn list_directory(&self, path: &Path) -> io::Result<Vec<String>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect()
    }

    fn modified_time(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }
}

/// Compares releases against what already sits in their save directory.
#[derive(Clone)]
pub struct LocalStateReconciler {
    fs: Arc<dyn LibraryFs>,
    extractor: Arc<dyn MetadataExtractor>,
    order: LocalFileOrder,
    allow_upgrade: bool,
}

impl LocalStateReconciler {
    #[must_use]
    pub fn new(
        fs: Arc<dyn LibraryFs>,
        extractor: Arc<dyn MetadataExtractor>,
        order: LocalFileOrder,
        allow_upgrade: bool,
    ) -> Self {
        Self {
            fs,
            extractor,
            order,
            allow_upgrade,
        }
    }

    /// Whether `release` is still worth downloading. Runs on the blocking pool.
    ///
    /// # Errors
    /// Fails when the save directory cannot be created, listed or stat'ed.
    pub async fn should_download(&self, release: &Release) -> Result<bool, LocalStateError> {
        let this = self.clone();
        let release = release.clone();

        tokio::task::spawn_blocking(move || this.should_download_blocking(&release))
            .await
            .map_err(|e| LocalStateError::Interrupted(e.to_string()))?
    }

    /// # Errors
    /// Fails when the save directory cannot be created, listed or stat'ed.
    pub fn should_download_blocking(&self, release: &Release) -> Result<bool, LocalStateError> {
        let records = self.scan(release)?;
        let keep = should_keep(release, &records, self.allow_upgrade);

        if !keep {
            debug!(
                event = "release_already_held",
                release = %release.raw_title,
                local_files = records.len(),
                "Local files supersede release"
            );
        }

        Ok(keep)
    }

    /// Local files of the release's show, in walk order.
    ///
    /// # Errors
    /// Fails when the save directory cannot be created, listed or stat'ed.
    pub fn scan(&self, release: &Release) -> Result<Vec<LocalFileRecord>, LocalStateError> {
        let dir = &release.save_path;

        self.fs
            .ensure_directory(dir)
            .map_err(|source| LocalStateError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let names = self
            .fs
            .list_directory(dir)
            .map_err(|source| LocalStateError::List {
                path: dir.clone(),
                source,
            })?;

        let mut records = Vec::new();
        for name in names {
            let Some(parsed) = self.extractor.parse(&name) else {
                debug!(event = "local_file_unparseable", file = %name, "Ignoring local file");
                continue;
            };

            let normalized_title = normalize_title(&parsed.title);
            if normalized_title != release.normalized_title {
                continue;
            }

            let path = dir.join(&name);
            let modified_at = self
                .fs
                .modified_time(&path)
                .map_err(|source| LocalStateError::Stat { path, source })?;

            records.push(LocalFileRecord {
                file_name: name,
                normalized_title,
                season: parsed.season,
                episode: parsed.episode,
                source: parsed.source,
                proper: parsed.proper,
                repack: parsed.repack,
                modified_at,
            });
        }

        match self.order {
            LocalFileOrder::Modified => records.sort_by_key(|r| Reverse(r.modified_at)),
            LocalFileOrder::Episode => {
                records.sort_by_key(|r| (Reverse(r.season), Reverse(r.episode), Reverse(r.modified_at)));
            }
        }

        Ok(records)
    }
}

fn exceeds(local: Option<u32>, candidate: Option<u32>) -> bool {
    matches!((local, candidate), (Some(l), Some(c)) if l > c)
}

fn is_upgrade(release: &Release, file: &LocalFileRecord) -> bool {
    (release.proper && !file.proper)
        || (release.repack && !file.repack)
        || (release.proper && release.repack && !(file.proper && file.repack))
}

/// Walks `records` (newest first) and decides whether `release` is kept.
#[must_use]
pub fn should_keep(release: &Release, records: &[LocalFileRecord], allow_upgrade: bool) -> bool {
    let mut keep = true;

    for file in records {
        if exceeds(file.season, release.season) {
            keep = false;
        } else if file.season == release.season && exceeds(file.episode, release.episode) {
            keep = false;
        }

        if file.season == release.season && file.episode == release.episode {
            keep = false;

            if !allow_upgrade || file.source != release.source {
                return false;
            }

            if is_upgrade(release, file) {
                keep = true;
            }
        }

        if !keep {
            break;
        }
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SceneParser;
    use crate::test_support::release;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    fn record(name: &str, age_secs: u64) -> LocalFileRecord {
        let parsed = SceneParser.parse(name).unwrap();
        LocalFileRecord {
            file_name: name.to_string(),
            normalized_title: normalize_title(&parsed.title),
            season: parsed.season,
            episode: parsed.episode,
            source: parsed.source,
            proper: parsed.proper,
            repack: parsed.repack,
            modified_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 - age_secs),
        }
    }

    #[test]
    fn test_no_local_files_keeps() {
        assert!(should_keep(&release("Show.A.S02E05.1080p.WEB"), &[], false));
    }

    #[test]
    fn test_later_season_rejects_even_proper() {
        let r = release("Show.A.S02E05.PROPER.REPACK.1080p.WEB");
        let files = [record("Show.A.S03E01.1080p.WEB.torrent", 0)];
        assert!(!should_keep(&r, &files, true));
    }

    #[test]
    fn test_later_episode_same_season_rejects() {
        let r = release("Show.A.S02E05.1080p.WEB");
        let files = [record("Show.A.S02E06.1080p.WEB.torrent", 0)];
        assert!(!should_keep(&r, &files, true));
    }

    #[test]
    fn test_older_episode_keeps() {
        let r = release("Show.A.S02E05.1080p.WEB");
        let files = [
            record("Show.A.S02E04.1080p.WEB.torrent", 0),
            record("Show.A.S01E10.1080p.WEB.torrent", 100),
        ];
        assert!(should_keep(&r, &files, false));
    }

    #[test]
    fn test_exact_match_without_upgrade_rejects() {
        let files = [record("Show.A.S02E05.1080p.WEB.torrent", 0)];
        assert!(!should_keep(&release("Show.A.S02E05.1080p.WEB"), &files, false));
        assert!(!should_keep(
            &release("Show.A.S02E05.PROPER.1080p.WEB"),
            &files,
            false
        ));
    }

    #[test]
    fn test_proper_upgrade_accepted() {
        let files = [record("Show.A.S02E05.1080p.WEB.torrent", 0)];
        assert!(should_keep(
            &release("Show.A.S02E05.PROPER.1080p.WEB"),
            &files,
            true
        ));
    }

    #[test]
    fn test_upgrade_requires_same_source() {
        let files = [record("Show.A.S02E05.1080p.HDTV.torrent", 0)];
        assert!(!should_keep(
            &release("Show.A.S02E05.PROPER.1080p.WEB"),
            &files,
            true
        ));
    }

    #[test]
    fn test_repack_over_existing_proper() {
        let files = [record("Show.A.S02E05.PROPER.1080p.WEB.torrent", 0)];
        assert!(should_keep(
            &release("Show.A.S02E05.REPACK.1080p.WEB"),
            &files,
            true
        ));
        assert!(!should_keep(
            &release("Show.A.S02E05.PROPER.1080p.WEB"),
            &files,
            true
        ));
    }

    #[test]
    fn test_proper_repack_needs_both_on_file() {
        let r = release("Show.A.S02E05.PROPER.REPACK.1080p.WEB");
        let partial = [record("Show.A.S02E05.PROPER.1080p.WEB.torrent", 0)];
        let full = [record("Show.A.S02E05.PROPER.REPACK.1080p.WEB.torrent", 0)];
        assert!(should_keep(&r, &partial, true));
        assert!(!should_keep(&r, &full, true));
    }

    #[derive(Default)]
    struct FakeFs {
        files: Mutex<HashMap<PathBuf, Vec<(String, u64)>>>,
        created: Mutex<Vec<PathBuf>>,
    }

    impl FakeFs {
        fn with(dir: &str, files: &[(&str, u64)]) -> Self {
            let fs = Self::default();
            fs.files.lock().unwrap().insert(
                PathBuf::from(dir),
                files.iter().map(|(n, t)| ((*n).to_string(), *t)).collect(),
            );
            fs
        }
    }

    impl LibraryFs for FakeFs {
        fn ensure_directory(&self, path: &Path) -> io::Result<()> {
            self.created.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }

        fn list_directory(&self, path: &Path) -> io::Result<Vec<String>> {
            Ok(self
                .files
                .lock()
                .unwrap()
                .get(path)
                .map(|files| files.iter().map(|(n, _)| n.clone()).collect())
                .unwrap_or_default())
        }

        fn modified_time(&self, path: &Path) -> io::Result<SystemTime> {
            let dir = path.parent().unwrap();
            let name = path.file_name().unwrap().to_string_lossy();
            let files = self.files.lock().unwrap();
            let (_, t) = files[dir].iter().find(|(n, _)| *n == name).unwrap();
            Ok(SystemTime::UNIX_EPOCH + Duration::from_secs(*t))
        }
    }

    fn reconciler(fs: FakeFs, order: LocalFileOrder, allow_upgrade: bool) -> LocalStateReconciler {
        LocalStateReconciler::new(Arc::new(fs), Arc::new(SceneParser), order, allow_upgrade)
    }

    #[test]
    fn test_scan_filters_and_sorts_by_modified() {
        let fs = FakeFs::with(
            "/data/tv/Show A",
            &[
                ("Show.A.S02E03.1080p.WEB.torrent", 10),
                ("Show.A.S02E01.1080p.WEB.torrent", 30),
                ("Other.Show.S09E09.1080p.WEB.torrent", 40),
                ("notes", 50),
            ],
        );
        let records = reconciler(fs, LocalFileOrder::Modified, true)
            .scan(&release("Show.A.S02E05.1080p.WEB"))
            .unwrap();

        let names: Vec<_> = records.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Show.A.S02E01.1080p.WEB.torrent", "Show.A.S02E03.1080p.WEB.torrent"]
        );
    }

    #[test]
    fn test_scan_sorts_by_episode_when_configured() {
        let fs = FakeFs::with(
            "/data/tv/Show A",
            &[
                ("Show.A.S02E03.1080p.WEB.torrent", 10),
                ("Show.A.S02E01.1080p.WEB.torrent", 30),
            ],
        );
        let records = reconciler(fs, LocalFileOrder::Episode, true)
            .scan(&release("Show.A.S02E05.1080p.WEB"))
            .unwrap();
        assert_eq!(records[0].episode, Some(3));
    }

    #[test]
    fn test_directory_created_before_listing() {
        let fs = Arc::new(FakeFs::default());
        let reconciler = LocalStateReconciler::new(
            fs.clone(),
            Arc::new(SceneParser),
            LocalFileOrder::Modified,
            true,
        );
        assert!(
            reconciler
                .should_download_blocking(&release("Show.A.S02E05.1080p.WEB"))
                .unwrap()
        );
        assert_eq!(
            fs.created.lock().unwrap().as_slice(),
            &[PathBuf::from("/data/tv/Show A")]
        );
    }

    #[tokio::test]
    async fn test_should_download_on_blocking_pool() {
        let fs = FakeFs::with("/data/tv/Show A", &[("Show.A.S02E05.1080p.WEB.torrent", 10)]);
        let keep = reconciler(fs, LocalFileOrder::Modified, false)
            .should_download(&release("Show.A.S02E05.1080p.WEB"))
            .await
            .unwrap();
        assert!(!keep);
    }

    struct BrokenFs;

    impl LibraryFs for BrokenFs {
        fn ensure_directory(&self, _path: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }

        fn list_directory(&self, _path: &Path) -> io::Result<Vec<String>> {
            Ok(vec![])
        }

        fn modified_time(&self, _path: &Path) -> io::Result<SystemTime> {
            Ok(SystemTime::UNIX_EPOCH)
        }
    }

    #[test]
    fn test_create_failure_is_reported() {
        let reconciler = LocalStateReconciler::new(
            Arc::new(BrokenFs),
            Arc::new(SceneParser),
            LocalFileOrder::Modified,
            true,
        );
        assert!(matches!(
            reconciler.scan(&release("Show.A.S02E05.1080p.WEB")),
            Err(LocalStateError::CreateDir { .. })
        ));
    }
}
