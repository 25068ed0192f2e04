use crate::core::normalize::normalize;
use crate::domain::model::Locator;
use crate::domain::ports::{ExistingSet, LocatorStore};
use crate::utils::error::{ImportError, Result};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

fn poisoned(what: &str) -> ImportError {
    ImportError::ExistingSetUnavailable {
        reason: format!("{} lock poisoned", what),
    }
}

fn canonical_set<'a>(lines: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    lines
        .into_iter()
        .filter_map(|line| normalize(line).ok())
        .map(|locator| locator.canonical().to_string())
        .collect()
}

/// 記憶體中的既有集合
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    known: Mutex<HashSet<String>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以原始字串建立，無法正規化的項目會被略過
    pub fn from_raw<'a>(locators: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            known: Mutex::new(canonical_set(locators)),
        }
    }

    pub fn len(&self) -> usize {
        self.known.lock().map(|known| known.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExistingSet for InMemoryRegistry {
    fn is_already_present(&self, locator: &Locator) -> Result<bool> {
        let known = self.known.lock().map_err(|_| poisoned("registry"))?;
        Ok(known.contains(locator.canonical()))
    }
}

impl LocatorStore for InMemoryRegistry {
    fn persist(&self, locators: &[Locator]) -> Result<usize> {
        let mut known = self.known.lock().map_err(|_| poisoned("registry"))?;
        Ok(locators
            .iter()
            .filter(|locator| known.insert(locator.canonical().to_string()))
            .count())
    }
}

/// 以換行分隔檔案保存的既有集合，第一次查詢時才讀檔。
///
/// 檔案不存在視為空集合；其他讀取錯誤會使批次中止。
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    cache: Mutex<Option<HashSet<String>>>,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_known(&self) -> Result<HashSet<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(canonical_set(content.lines())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Registry {} does not exist yet", self.path.display());
                Ok(HashSet::new())
            }
            Err(e) => Err(ImportError::ExistingSetUnavailable {
                reason: format!("{}: {}", self.path.display(), e),
            }),
        }
    }

    fn loaded(&self) -> Result<MutexGuard<'_, Option<HashSet<String>>>> {
        let mut cache = self.cache.lock().map_err(|_| poisoned("registry cache"))?;
        if cache.is_none() {
            let known = self.read_known()?;
            tracing::debug!(
                "Loaded {} known locators from {}",
                known.len(),
                self.path.display()
            );
            *cache = Some(known);
        }
        Ok(cache)
    }
}

impl ExistingSet for FileRegistry {
    fn is_already_present(&self, locator: &Locator) -> Result<bool> {
        let cache = self.loaded()?;
        Ok(cache
            .as_ref()
            .is_some_and(|known| known.contains(locator.canonical())))
    }
}

impl LocatorStore for FileRegistry {
    fn persist(&self, locators: &[Locator]) -> Result<usize> {
        let mut cache = self.loaded()?;
        let known = cache.get_or_insert_with(HashSet::new);

        // 寫入成功後才更新快取
        let mut pending = HashSet::new();
        let fresh: Vec<&Locator> = locators
            .iter()
            .filter(|locator| {
                !known.contains(locator.canonical()) && pending.insert(locator.canonical())
            })
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // 手動編輯過的檔案可能沒有結尾換行
        let needs_newline = fs::read(&self.path)
            .map(|bytes| bytes.last().is_some_and(|b| *b != b'\n'))
            .unwrap_or(false);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if needs_newline {
            writeln!(file)?;
        }
        for locator in &fresh {
            writeln!(file, "{}", locator.canonical())?;
        }
        known.extend(fresh.iter().map(|locator| locator.canonical().to_string()));

        tracing::debug!("Persisted {} locators to {}", fresh.len(), self.path.display());
        Ok(fresh.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_registry_membership_and_persist() {
        let registry = InMemoryRegistry::from_raw(["https://Known.io/repo", "garbage"]);
        assert_eq!(registry.len(), 1);

        let known = normalize("HTTPS://known.io/repo").unwrap();
        let fresh = normalize("https://fresh.io/repo").unwrap();
        assert!(registry.is_already_present(&known).unwrap());
        assert!(!registry.is_already_present(&fresh).unwrap());

        assert_eq!(registry.persist(&[fresh.clone(), known]).unwrap(), 1);
        assert!(registry.is_already_present(&fresh).unwrap());
    }

    #[test]
    fn test_file_registry_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = FileRegistry::new(dir.path().join("repos.txt"));
        let locator = normalize("https://a.io/repo").unwrap();
        assert!(!registry.is_already_present(&locator).unwrap());
    }

    #[test]
    fn test_file_registry_reads_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("repos.txt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "https://A.io/repo\n\nnot a url\n").unwrap();

        let registry = FileRegistry::new(&path);
        let a = normalize("https://a.io/repo").unwrap();
        let b = normalize("https://b.io/repo").unwrap();
        assert!(registry.is_already_present(&a).unwrap());
        assert!(!registry.is_already_present(&b).unwrap());

        assert_eq!(registry.persist(&[a, b.clone()]).unwrap(), 1);

        let reopened = FileRegistry::new(&path);
        assert!(reopened.is_already_present(&b).unwrap());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("https://b.io/repo\n"));
    }

    #[test]
    fn test_failed_persist_does_not_mark_locators_present() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("sub");
        let registry = FileRegistry::new(blocker.join("repos.txt"));
        let locator = normalize("https://a.io/repo").unwrap();

        // cache is loaded while the file is still missing
        assert!(!registry.is_already_present(&locator).unwrap());

        // a plain file where the parent directory should be
        fs::write(&blocker, "").unwrap();
        assert!(registry.persist(std::slice::from_ref(&locator)).is_err());
        assert!(!registry.is_already_present(&locator).unwrap());

        fs::remove_file(&blocker).unwrap();
        assert_eq!(registry.persist(std::slice::from_ref(&locator)).unwrap(), 1);
        assert!(registry.is_already_present(&locator).unwrap());
    }

    #[test]
    fn test_file_registry_unreadable_is_fatal() {
        let dir = TempDir::new().unwrap();
        // a directory cannot be read as a file
        let registry = FileRegistry::new(dir.path());
        let locator = normalize("https://a.io/repo").unwrap();

        let err = registry.is_already_present(&locator).unwrap_err();
        assert!(err.is_fatal());
    }
}
