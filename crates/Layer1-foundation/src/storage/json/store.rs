//! JSON 파일 저장소

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 앱 설정 디렉토리 이름
pub const APP_DIR: &str = "hostwarden";

/// JSON 설정 저장소
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// 글로벌 설정 (~/.config/hostwarden/)
    pub fn global() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?
            .join(APP_DIR);
        Ok(Self::new(dir))
    }

    /// 파일 경로 하나로부터 저장소 + 파일명 분리
    pub fn for_file(path: &Path) -> Result<(Self, String)> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Config(format!("Invalid file path: {}", path.display())))?
            .to_string();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok((Self::new(dir), filename))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            std::fs::create_dir_all(&self.base_dir)
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }
        Ok(())
    }

    /// JSON 로드
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        let path = self.file_path(filename);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// JSON 로드 (Optional) - 파일이 없으면 None
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        if !path.exists() {
            return Ok(None);
        }
        self.load(filename).map(Some)
    }

    /// JSON 저장 (원자적)
    ///
    /// 같은 디렉토리의 임시 파일에 쓰고 fsync 후 rename 한다.
    /// 실패하면 기존 파일은 그대로 남는다.
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.file_path(filename);
        let tmp_path = self.file_path(&format!(".{}.tmp", filename));

        let content = serde_json::to_string_pretty(data)
            .map_err(|e| Error::Storage(format!("Failed to serialize: {}", e)))?;

        let write_tmp = || -> std::io::Result<()> {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()
        };

        if let Err(e) = write_tmp() {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(Error::Storage(format!(
                "Failed to write {}: {}",
                tmp_path.display(),
                e
            )));
        }

        std::fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            Error::Storage(format!("Failed to replace {}: {}", path.display(), e))
        })
    }

    /// 파일 존재 여부
    pub fn exists(&self, filename: &str) -> bool {
        self.file_path(filename).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("nested"));

        let mut data = BTreeMap::new();
        data.insert("a".to_string(), 1u32);
        store.save("data.json", &data).unwrap();

        let loaded: BTreeMap<String, u32> = store.load("data.json").unwrap();
        assert_eq!(loaded, data);
        // 임시 파일은 남지 않아야 함
        assert!(!store.exists(".data.json.tmp"));
    }

    #[test]
    fn test_load_optional_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let loaded: Option<BTreeMap<String, u32>> = store.load_optional("missing.json").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let store = JsonStore::new(dir.path());

        let result: Result<Option<BTreeMap<String, u32>>> = store.load_optional("bad.json");
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.save("data.json", &vec![1, 2, 3]).unwrap();

        // base_dir 자리에 파일이 있으면 디렉토리를 만들 수 없음
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let broken = JsonStore::new(blocker.join("sub"));
        assert!(broken.save("data.json", &vec![4]).is_err());

        let loaded: Vec<i32> = store.load("data.json").unwrap();
        assert_eq!(loaded, vec![1, 2, 3]);
    }

    #[test]
    fn test_for_file() {
        let (store, name) = JsonStore::for_file(Path::new("/tmp/x/users.json")).unwrap();
        assert_eq!(store.base_dir(), Path::new("/tmp/x"));
        assert_eq!(name, "users.json");

        let (store, name) = JsonStore::for_file(Path::new("users.json")).unwrap();
        assert_eq!(store.base_dir(), Path::new("."));
        assert_eq!(name, "users.json");
    }
}
