use crate::upload::AcceptedFile;
use std::cmp::Ordering;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Identifies the owner of one incoming and one outgoing area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Hyphenated lowercase, which is also the directory name.
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionId)
    }
}

/// Incoming and outgoing areas, one directory per session under each root:
/// `<incoming_root>/<session>/work-*/` and `<outgoing_root>/<session>/`.
#[derive(Debug, Clone)]
pub struct Storage {
    incoming_root: PathBuf,
    outgoing_root: PathBuf,
}

impl Storage {
    /// Open both roots, creating them if needed.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        incoming_root: P,
        outgoing_root: Q,
    ) -> io::Result<Self> {
        let incoming_root = incoming_root.as_ref().to_path_buf();
        let outgoing_root = outgoing_root.as_ref().to_path_buf();
        std::fs::create_dir_all(&incoming_root)?;
        std::fs::create_dir_all(&outgoing_root)?;
        Ok(Storage {
            incoming_root,
            outgoing_root,
        })
    }

    pub fn incoming_root(&self) -> &Path {
        &self.incoming_root
    }

    pub fn outgoing_root(&self) -> &Path {
        &self.outgoing_root
    }

    pub fn incoming_dir(&self, session: SessionId) -> PathBuf {
        self.incoming_root.join(session.to_string())
    }

    pub fn outgoing_dir(&self, session: SessionId) -> PathBuf {
        self.outgoing_root.join(session.to_string())
    }

    /// Empty both areas of `session`.
    pub fn clear_session(&self, session: SessionId) -> io::Result<()> {
        clear_area(&self.incoming_dir(session))?;
        clear_area(&self.outgoing_dir(session))?;
        debug!(%session, "cleared session storage");
        Ok(())
    }

    /// A fresh incoming work directory for one request.
    pub fn work_dir(&self, session: SessionId) -> io::Result<WorkDir> {
        let parent = self.incoming_dir(session);
        std::fs::create_dir_all(&parent)?;
        let dir = tempfile::Builder::new().prefix("work-").tempdir_in(&parent)?;
        Ok(WorkDir { dir })
    }

    /// The session's outgoing area, created on first use.
    pub fn ensure_outgoing(&self, session: SessionId) -> io::Result<PathBuf> {
        let dir = self.outgoing_dir(session);
        std::fs::create_dir_all(&dir)?;
        self.touch(session);
        Ok(dir)
    }

    /// Mark the session as in use so the expiry sweep counts from now.
    pub fn touch(&self, session: SessionId) {
        let now = SystemTime::now();
        for dir in [self.incoming_dir(session), self.outgoing_dir(session)] {
            match std::fs::File::open(&dir).and_then(|f| f.set_modified(now)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => debug!(path = %dir.display(), error = %e, "failed to refresh session"),
            }
        }
    }

    /// Names of the files in the session's outgoing area, naturally sorted.
    /// Hidden entries are in-progress staging files and are never listed.
    pub fn list_outgoing(&self, session: SessionId) -> io::Result<Vec<String>> {
        let dir = self.outgoing_dir(session);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.file_name().to_str() {
                Some(name) if !name.starts_with('.') => names.push(name.to_string()),
                _ => {}
            }
        }
        names.sort_by(|a, b| natural_cmp(a, b));
        Ok(names)
    }

    /// Path of `name` in the session's outgoing area, if it is one of the
    /// files currently listed there. Anything else, traversal included, is
    /// `None`.
    pub fn resolve_download(&self, session: SessionId, name: &str) -> io::Result<Option<PathBuf>> {
        let listed = self.list_outgoing(session)?;
        Ok(listed
            .iter()
            .any(|candidate| candidate == name)
            .then(|| self.outgoing_dir(session).join(name)))
    }

    /// Remove every session directory, e.g. leftovers from a previous run.
    pub fn purge_sessions(&self) -> io::Result<usize> {
        self.remove_sessions_where(|_| true)
    }

    /// Remove session directories not modified within `ttl`.
    pub fn sweep_expired(&self, ttl: Duration) -> io::Result<usize> {
        let now = SystemTime::now();
        self.remove_sessions_where(|path| {
            path.metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > ttl)
        })
    }

    fn remove_sessions_where<F: Fn(&Path) -> bool>(&self, predicate: F) -> io::Result<usize> {
        let mut removed = 0;
        for root in [&self.incoming_root, &self.outgoing_root] {
            for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
                let entry = entry.map_err(io::Error::from)?;
                let is_session = entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.parse::<SessionId>().is_ok());
                // Only ever touch directories this service created.
                if !is_session || !entry.file_type().is_dir() || !predicate(entry.path()) {
                    continue;
                }
                match std::fs::remove_dir_all(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "failed to remove session directory"
                    ),
                }
            }
        }
        Ok(removed)
    }
}

/// Delete everything inside `dir`. A missing directory is already clear.
pub fn clear_area(dir: &Path) -> io::Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        let result = if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(entry.path())
        } else {
            std::fs::remove_file(entry.path())
        };
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Scratch directory holding one request's uploads. Removed on drop, whichever
/// way the request ends.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Persist an accepted upload under its sanitised name.
    pub fn save(&self, file: &AcceptedFile) -> io::Result<PathBuf> {
        let path = self.dir.path().join(&file.stored_name);
        std::fs::write(&path, &file.content)?;
        Ok(path)
    }
}

/// Orders embedded numbers by value, so `page_2.pdf` sorts before `page_10.pdf`.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        let (chunk_a, rest_a) = split_chunk(a);
        let (chunk_b, rest_b) = split_chunk(b);
        let ord = match (chunk_a.parse::<u64>(), chunk_b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y).then(chunk_a.len().cmp(&chunk_b.len())),
            _ => chunk_a.cmp(chunk_b),
        };
        if ord != Ordering::Equal {
            return ord;
        }
        a = rest_a;
        b = rest_b;
    }
}

/// Split off the leading run of digits or non-digits.
fn split_chunk(s: &str) -> (&str, &str) {
    let digits = s.starts_with(|c: char| c.is_ascii_digit());
    let end = s
        .find(|c: char| c.is_ascii_digit() != digits)
        .unwrap_or(s.len());
    s.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn storage() -> (tempfile::TempDir, Storage) {
        let root = tempfile::tempdir().unwrap();
        let storage =
            Storage::open(root.path().join("uploads"), root.path().join("downloads")).unwrap();
        (root, storage)
    }

    fn accepted(name: &str) -> AcceptedFile {
        AcceptedFile {
            stored_name: name.into(),
            content: Bytes::from_static(b"%PDF-1.5"),
        }
    }

    #[test]
    fn open_creates_roots() {
        let (root, storage) = storage();
        assert!(root.path().join("uploads").is_dir());
        assert!(root.path().join("downloads").is_dir());
        assert_eq!(storage.incoming_root(), root.path().join("uploads"));
    }

    #[test]
    fn session_ids_round_trip_through_strings() {
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!("../etc".parse::<SessionId>().is_err());
        assert!("".parse::<SessionId>().is_err());
    }

    #[test]
    fn work_dir_is_removed_on_drop() {
        let (_root, storage) = storage();
        let session = SessionId::new();

        let work = storage.work_dir(session).unwrap();
        let saved = work.save(&accepted("a.pdf")).unwrap();
        assert!(saved.exists());
        assert!(saved.starts_with(storage.incoming_dir(session)));

        let path = work.path().to_path_buf();
        drop(work);
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(storage.incoming_dir(session)).unwrap().count(), 0);
    }

    #[test]
    fn clear_session_empties_both_areas() {
        let (_root, storage) = storage();
        let session = SessionId::new();
        let incoming = storage.incoming_dir(session).join("work-left");
        std::fs::create_dir_all(&incoming).unwrap();
        std::fs::write(incoming.join("a.pdf"), b"x").unwrap();
        let out = storage.ensure_outgoing(session).unwrap();
        std::fs::write(out.join("page_1.pdf"), b"x").unwrap();

        storage.clear_session(session).unwrap();

        assert_eq!(std::fs::read_dir(storage.incoming_dir(session)).unwrap().count(), 0);
        assert!(storage.list_outgoing(session).unwrap().is_empty());
    }

    #[test]
    fn clearing_an_unknown_session_is_fine() {
        let (_root, storage) = storage();
        storage.clear_session(SessionId::new()).unwrap();
    }

    #[test]
    fn sessions_are_isolated() {
        let (_root, storage) = storage();
        let (a, b) = (SessionId::new(), SessionId::new());
        std::fs::write(storage.ensure_outgoing(a).unwrap().join("merged.pdf"), b"a").unwrap();
        std::fs::write(storage.ensure_outgoing(b).unwrap().join("page_1.pdf"), b"b").unwrap();

        storage.clear_session(b).unwrap();

        assert_eq!(storage.list_outgoing(a).unwrap(), vec!["merged.pdf"]);
        assert!(storage.list_outgoing(b).unwrap().is_empty());
    }

    #[test]
    fn listing_is_natural_and_files_only() {
        let (_root, storage) = storage();
        let session = SessionId::new();
        let out = storage.ensure_outgoing(session).unwrap();
        for name in ["page_10.pdf", "page_2.pdf", "page_1.pdf", "merged.pdf"] {
            std::fs::write(out.join(name), b"x").unwrap();
        }
        std::fs::create_dir(out.join("nested")).unwrap();

        assert_eq!(
            storage.list_outgoing(session).unwrap(),
            vec!["merged.pdf", "page_1.pdf", "page_2.pdf", "page_10.pdf"]
        );
    }

    #[test]
    fn hidden_staging_files_are_not_listed_or_served() {
        let (_root, storage) = storage();
        let session = SessionId::new();
        let out = storage.ensure_outgoing(session).unwrap();
        std::fs::write(out.join("page_1.pdf"), b"x").unwrap();
        std::fs::write(out.join(".tmpAb12Cd"), b"partial").unwrap();

        assert_eq!(storage.list_outgoing(session).unwrap(), vec!["page_1.pdf"]);
        assert_eq!(storage.resolve_download(session, ".tmpAb12Cd").unwrap(), None);
    }

    #[test]
    fn downloads_resolve_only_listed_names() {
        let (root, storage) = storage();
        let session = SessionId::new();
        let out = storage.ensure_outgoing(session).unwrap();
        std::fs::write(out.join("page_1.pdf"), b"x").unwrap();
        std::fs::write(root.path().join("secret.txt"), b"secret").unwrap();

        assert_eq!(
            storage.resolve_download(session, "page_1.pdf").unwrap(),
            Some(out.join("page_1.pdf"))
        );
        for name in ["page_2.pdf", "../../secret.txt", "..", "", "nested", "/etc/passwd"] {
            assert_eq!(storage.resolve_download(session, name).unwrap(), None, "{name}");
        }
    }

    #[test]
    fn purge_only_touches_session_directories() {
        let (root, storage) = storage();
        let session = SessionId::new();
        storage.ensure_outgoing(session).unwrap();
        std::fs::create_dir_all(storage.incoming_dir(session)).unwrap();
        std::fs::write(root.path().join("downloads").join("keep.txt"), b"x").unwrap();
        std::fs::create_dir(root.path().join("uploads").join("not-a-session")).unwrap();

        assert_eq!(storage.purge_sessions().unwrap(), 2);
        assert!(!storage.outgoing_dir(session).exists());
        assert!(root.path().join("downloads").join("keep.txt").exists());
        assert!(root.path().join("uploads").join("not-a-session").exists());
    }

    #[test]
    fn sweep_keeps_fresh_sessions() {
        let (_root, storage) = storage();
        let session = SessionId::new();
        storage.ensure_outgoing(session).unwrap();

        assert_eq!(storage.sweep_expired(Duration::from_secs(3600)).unwrap(), 0);
        assert!(storage.outgoing_dir(session).exists());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(storage.sweep_expired(Duration::from_millis(1)).unwrap(), 1);
        assert!(!storage.outgoing_dir(session).exists());
    }

    #[test]
    fn touch_postpones_expiry() {
        let (_root, storage) = storage();
        let session = SessionId::new();
        let out = storage.ensure_outgoing(session).unwrap();
        let two_hours_ago = SystemTime::now() - Duration::from_secs(7200);
        let age = |dir: &Path| std::fs::File::open(dir).unwrap().set_modified(two_hours_ago);

        age(&out).unwrap();
        storage.touch(session);
        assert_eq!(storage.sweep_expired(Duration::from_secs(3600)).unwrap(), 0);

        age(&out).unwrap();
        assert_eq!(storage.sweep_expired(Duration::from_secs(3600)).unwrap(), 1);
        assert!(!out.exists());
    }

    #[test]
    fn natural_ordering() {
        let mut names = vec!["b", "a10", "a2", "a", "a02"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["a", "a2", "a02", "a10", "b"]);
    }
}
