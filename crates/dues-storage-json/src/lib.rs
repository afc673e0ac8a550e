use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use dues_core::{
    storage::{integrity_warnings, validate_snapshot, DuesStorage},
    CoreError, MemoryDuesStorage,
};
use dues_domain::{DuesSnapshot, Member, MemberUpdate, Payment};

const DATA_FILE: &str = "dues";
const FILE_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S%3f";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Directories used by [`JsonDuesStorage`].
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub data_root: PathBuf,
    pub backup_root: PathBuf,
}

impl StoragePaths {
    /// `data/` and `backups/` below `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            data_root: root.join("data"),
            backup_root: root.join("backups"),
        }
    }
}

/// Describes a backup file on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupInfo {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// Filesystem-backed JSON persistence for members and payments.
///
/// The whole dataset lives in a single snapshot file. Every mutation is applied to
/// an in-memory copy and written through with a tmp-file rename, so each record
/// change lands atomically or not at all.
pub struct JsonDuesStorage {
    paths: StoragePaths,
    retention: usize,
    state: MemoryDuesStorage,
    write_lock: Mutex<()>,
}

impl JsonDuesStorage {
    pub fn open(paths: StoragePaths) -> Result<Self, CoreError> {
        Self::with_retention(paths, DEFAULT_RETENTION)
    }

    pub fn with_retention(paths: StoragePaths, retention: usize) -> Result<Self, CoreError> {
        fs::create_dir_all(&paths.data_root)?;
        fs::create_dir_all(&paths.backup_root)?;
        let data_path = data_path(&paths);
        let snapshot = if data_path.exists() {
            load_snapshot_from_path(&data_path)?
        } else {
            DuesSnapshot::new(Utc::now())
        };
        for warning in integrity_warnings(&snapshot.members, &snapshot.payments) {
            warn!(path = %data_path.display(), "{}", warning);
        }
        info!(
            path = %data_path.display(),
            members = snapshot.members.len(),
            payments = snapshot.payments.len(),
            "dues data loaded"
        );
        Ok(Self {
            paths,
            retention: retention.max(1),
            state: MemoryDuesStorage::from_snapshot(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_path(&self) -> PathBuf {
        data_path(&self.paths)
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// `(members, payments)` currently stored.
    pub fn counts(&self) -> Result<(usize, usize), CoreError> {
        Ok((self.state.member_count()?, self.state.payment_count()?))
    }

    /// Copies the current data file into the backup directory.
    pub fn backup(&self, note: Option<&str>) -> Result<BackupInfo, CoreError> {
        let _guard = self.lock()?;
        self.write_backup(note)
    }

    /// Backups sorted newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>, CoreError> {
        let dir = &self.paths.backup_root;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let created_at = parse_backup_timestamp(file_name);
            if created_at.is_none() {
                warn!(file = %file_name, "skipping unrecognized backup file");
                continue;
            }
            let size_bytes = fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0);
            entries.push(BackupInfo {
                id: file_name.to_string(),
                created_at,
                size_bytes,
                path: path.clone(),
            });
        }
        entries.sort_by(|a, b| {
            Reverse(a.created_at)
                .cmp(&Reverse(b.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    /// Replaces the current data with a backup. The current data is backed up first.
    pub fn restore_backup(&self, backup: &BackupInfo) -> Result<DuesSnapshot, CoreError> {
        if !backup.path.exists() {
            return Err(CoreError::Storage(format!(
                "backup `{}` not found",
                backup.id
            )));
        }
        let snapshot = load_snapshot_from_path(&backup.path)?;
        self.replace_all(&snapshot, "pre-restore")?;
        info!(backup = %backup.id, "backup restored");
        Ok(snapshot)
    }

    /// Writes a snapshot of all data to `path`.
    pub fn export_to_path(&self, path: &Path) -> Result<DuesSnapshot, CoreError> {
        let snapshot = self.state.export_snapshot(Utc::now())?;
        save_snapshot_to_path(&snapshot, path)?;
        info!(
            path = %path.display(),
            members = snapshot.members.len(),
            payments = snapshot.payments.len(),
            "data exported"
        );
        Ok(snapshot)
    }

    /// Replaces all data with the snapshot stored at `path`.
    pub fn import_from_path(&self, path: &Path) -> Result<DuesSnapshot, CoreError> {
        let snapshot = load_snapshot_from_path(path)?;
        self.import_snapshot(&snapshot)?;
        info!(path = %path.display(), "data imported");
        Ok(snapshot)
    }

    /// Deletes every member and payment after taking a backup.
    pub fn clear(&self) -> Result<(), CoreError> {
        self.replace_all(&DuesSnapshot::new(Utc::now()), "pre-reset")?;
        info!("all data cleared");
        Ok(())
    }

    fn replace_all(&self, snapshot: &DuesSnapshot, note: &str) -> Result<(), CoreError> {
        validate_snapshot(snapshot)?;
        let _guard = self.lock()?;
        if self.data_path().exists() {
            self.write_backup(Some(note))?;
        }
        self.mutate(|state| state.import_snapshot(snapshot))
    }

    /// Applies `change` to the working set and persists it, rolling back on failure.
    fn mutate<T>(
        &self,
        change: impl FnOnce(&MemoryDuesStorage) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let before = self.state.export_snapshot(Utc::now())?;
        let result = change(&self.state)?;
        let after = self.state.export_snapshot(Utc::now())?;
        if let Err(err) = save_snapshot_to_path(&after, &self.data_path()) {
            self.state.import_snapshot(&before)?;
            return Err(err);
        }
        Ok(result)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, CoreError> {
        self.write_lock
            .lock()
            .map_err(|_| CoreError::Storage("storage write lock poisoned".into()))
    }

    fn write_backup(&self, note: Option<&str>) -> Result<BackupInfo, CoreError> {
        fs::create_dir_all(&self.paths.backup_root)?;
        let created_at = Utc::now();
        let mut stem = format!(
            "{}_{}",
            DATA_FILE,
            created_at.format(BACKUP_TIMESTAMP_FORMAT)
        );
        if let Some(label) = sanitize_backup_note(note) {
            stem.push('_');
            stem.push_str(&label);
        }
        let mut file_name = format!("{}.{}", stem, FILE_EXTENSION);
        let mut attempt = 1;
        while self.paths.backup_root.join(&file_name).exists() {
            attempt += 1;
            file_name = format!("{}_{}.{}", stem, attempt, FILE_EXTENSION);
        }
        let path = self.paths.backup_root.join(&file_name);
        let snapshot = self.state.export_snapshot(created_at)?;
        save_snapshot_to_path(&snapshot, &path)?;
        self.prune_backups()?;
        info!(backup = %file_name, "backup written");
        Ok(BackupInfo {
            created_at: parse_backup_timestamp(&file_name),
            id: file_name,
            size_bytes: fs::metadata(&path).map(|meta| meta.len()).unwrap_or(0),
            path,
        })
    }

    fn prune_backups(&self) -> Result<(), CoreError> {
        for entry in self.list_backups()?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&entry.path) {
                warn!(backup = %entry.id, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl DuesStorage for JsonDuesStorage {
    fn list_members(&self) -> Result<Vec<Member>, CoreError> {
        self.state.list_members()
    }

    fn get_member(&self, id: Uuid) -> Result<Option<Member>, CoreError> {
        self.state.get_member(id)
    }

    fn list_payments(&self, member_id: Option<Uuid>) -> Result<Vec<Payment>, CoreError> {
        self.state.list_payments(member_id)
    }

    fn insert_member(&self, member: Member) -> Result<Uuid, CoreError> {
        let _guard = self.lock()?;
        self.mutate(|state| state.insert_member(member))
    }

    fn update_member(&self, id: Uuid, update: &MemberUpdate) -> Result<(), CoreError> {
        let _guard = self.lock()?;
        self.mutate(|state| state.update_member(id, update))
    }

    fn insert_payment(&self, payment: Payment) -> Result<Uuid, CoreError> {
        let _guard = self.lock()?;
        self.mutate(|state| state.insert_payment(payment))
    }

    fn delete_payment(&self, id: Uuid) -> Result<(), CoreError> {
        let _guard = self.lock()?;
        self.mutate(|state| state.delete_payment(id))
    }

    fn remove_member_record(&self, id: Uuid) -> Result<(), CoreError> {
        let _guard = self.lock()?;
        self.mutate(|state| state.remove_member_record(id))
    }

    /// Cascades in memory and persists once, so the file never holds a half-deleted member.
    fn delete_member(&self, id: Uuid) -> Result<(), CoreError> {
        let _guard = self.lock()?;
        self.mutate(|state| state.delete_member(id))
    }

    fn import_snapshot(&self, snapshot: &DuesSnapshot) -> Result<(), CoreError> {
        self.replace_all(snapshot, "pre-import")
    }
}

/// Writes a snapshot to an arbitrary path on disk.
pub fn save_snapshot_to_path(snapshot: &DuesSnapshot, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    write_atomic(&tmp, &serialize_snapshot(snapshot)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Loads and validates a snapshot from the provided filesystem path.
pub fn load_snapshot_from_path(path: &Path) -> Result<DuesSnapshot, CoreError> {
    let data = fs::read_to_string(path)?;
    let snapshot: DuesSnapshot =
        serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))?;
    validate_snapshot(&snapshot)?;
    Ok(snapshot)
}

fn data_path(paths: &StoragePaths) -> PathBuf {
    paths
        .data_root
        .join(format!("{}.{}", DATA_FILE, FILE_EXTENSION))
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !sanitized.is_empty() && !last_dash {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Reads the timestamp out of `dues_YYYYMMDD_HHMMSSmmm[_note].json`.
fn parse_backup_timestamp(name: &str) -> Option<DateTime<Utc>> {
    let file_name = Path::new(name).file_name()?.to_str()?;
    let stem = file_name.strip_suffix(&format!(".{}", FILE_EXTENSION))?;
    let mut segments = stem.split('_');
    if segments.next()? != DATA_FILE {
        return None;
    }
    let date = segments.next()?;
    let time = segments.next()?;
    if !is_digits(date, 8) || !is_digits(time, 9) {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{}{}", date, time), "%Y%m%d%H%M%S%3f")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn serialize_snapshot(snapshot: &DuesSnapshot) -> Result<String, CoreError> {
    serde_json::to_string_pretty(snapshot).map_err(|err| CoreError::Serde(err.to_string()))
}
