use crate::Result;
use crate::error::PostcodeError;
use fs2::FileExt;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// 批量写入中的一步
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put(String, Value),
    Delete(String),
}

/// 无模式的键值区域
///
/// 主存储和凭据库各占一个区域，键空间和底层文件都不共享。
pub trait KeyValueRegion: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn keys(&self) -> Result<Vec<String>>;

    /// 要么全部生效，要么都不生效
    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<()>;

    fn put(&self, key: &str, value: Value) -> Result<()> {
        self.write_batch(vec![WriteOp::Put(key.to_string(), value)])
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.write_batch(vec![WriteOp::Delete(key.to_string())])
    }
}

fn apply(map: &mut BTreeMap<String, Value>, ops: Vec<WriteOp>) {
    for op in ops {
        match op {
            WriteOp::Put(key, value) => {
                map.insert(key, value);
            }
            WriteOp::Delete(key) => {
                map.remove(&key);
            }
        }
    }
}

/// 以单个 JSON 对象文件为后端的区域
///
/// 先写临时文件再重命名覆盖，读者只会看到旧快照或新快照。
pub struct JsonFileRegion {
    file_path: PathBuf,
    private: bool,
}

impl JsonFileRegion {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
            private: false,
        }
    }

    /// 文件仅所有者可读写（unix 下 0600）
    pub fn private(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
            private: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn sidecar(&self, extension: &str) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(extension);
        self.file_path.with_file_name(name)
    }

    fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(PostcodeError::IoError)?;
        }
        Ok(())
    }

    fn open_lock(&self) -> Result<File> {
        self.ensure_dir()?;
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.sidecar(".lock"))
            .map_err(PostcodeError::IoError)
    }

    /// 读取整个映射，调用方须持有锁
    fn read_unlocked(&self) -> Result<BTreeMap<String, Value>> {
        if !self.file_path.exists() {
            return Ok(BTreeMap::new());
        }

        let mut content = String::new();
        File::open(&self.file_path)
            .and_then(|mut f| f.read_to_string(&mut content))
            .map_err(PostcodeError::IoError)?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            PostcodeError::PersistenceError(format!(
                "{} is not a valid store file: {}",
                self.file_path.display(),
                e
            ))
        })
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>> {
        if !self.file_path.exists() {
            return Ok(BTreeMap::new());
        }
        let lock = self.open_lock()?;
        lock.lock_shared().map_err(PostcodeError::IoError)?;
        // drop 时解锁
        self.read_unlocked()
    }

    fn write_unlocked(&self, map: &BTreeMap<String, Value>) -> Result<()> {
        let tmp_path = self.sidecar(".tmp");
        let json = serde_json::to_string_pretty(map)?;

        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        if self.private {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp_path).map_err(PostcodeError::IoError)?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(PostcodeError::IoError)?;
        drop(file);

        fs::rename(&tmp_path, &self.file_path).map_err(PostcodeError::IoError)?;
        Ok(())
    }
}

impl KeyValueRegion for JsonFileRegion {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.read_all()?.into_keys().collect())
    }

    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }

        let lock = self.open_lock()?;
        lock.lock_exclusive().map_err(PostcodeError::IoError)?;

        let mut map = self.read_unlocked()?;
        let count = ops.len();
        apply(&mut map, ops);
        self.write_unlocked(&map)?;

        debug!(path = %self.file_path.display(), ops = count, "Region written");
        Ok(())
    }
}

/// 内存区域，用于测试和临时会话
#[derive(Default)]
pub struct MemoryRegion {
    map: Mutex<BTreeMap<String, Value>>,
    read_only: Mutex<bool>,
}

impl MemoryRegion {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的写入全部失败，模拟磁盘写满
    pub fn set_read_only(&self, read_only: bool) {
        *self.read_only.lock().unwrap_or_else(PoisonError::into_inner) = read_only;
    }
}

impl KeyValueRegion for MemoryRegion {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(key).cloned())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.keys().cloned().collect())
    }

    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        if *self.read_only.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(PostcodeError::PersistenceError(
                "region is read-only".to_string(),
            ));
        }
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut map, ops);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_file_region_put_get_delete() {
        let temp_dir = TempDir::new().unwrap();
        let region = JsonFileRegion::new(temp_dir.path().join("store.json"));

        assert_eq!(region.get("missing").unwrap(), None);

        region.put("a", json!([1, 2])).unwrap();
        region.put("b", json!("x")).unwrap();
        assert_eq!(region.get("a").unwrap(), Some(json!([1, 2])));
        assert_eq!(region.keys().unwrap(), vec!["a", "b"]);

        region.delete("a").unwrap();
        assert_eq!(region.get("a").unwrap(), None);
    }

    #[test]
    fn test_file_region_batch_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("store.json");

        JsonFileRegion::new(&path)
            .write_batch(vec![
                WriteOp::Put("collections".to_string(), json!([])),
                WriteOp::Put("requests".to_string(), json!({})),
            ])
            .unwrap();

        let reopened = JsonFileRegion::new(&path);
        assert_eq!(reopened.keys().unwrap(), vec!["collections", "requests"]);
        assert!(!path.with_file_name("store.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let region = JsonFileRegion::new(&path);
        assert!(matches!(
            region.get("x"),
            Err(PostcodeError::PersistenceError(_))
        ));
        // 写入失败不改动文件
        assert!(region.put("x", json!(1)).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[cfg(unix)]
    #[test]
    fn test_private_region_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vault.json");
        JsonFileRegion::private(&path).put("k", json!("v")).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_region_read_only() {
        let region = MemoryRegion::new();
        region.put("a", json!(1)).unwrap();
        region.set_read_only(true);

        assert!(region.put("a", json!(2)).is_err());
        assert_eq!(region.get("a").unwrap(), Some(json!(1)));
    }
}
