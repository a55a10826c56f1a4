//! 설정 계층 저장소
//!
//! 설정은 여러 디렉토리에 나뉘어 있고 뒤쪽 계층이 앞쪽을 덮어씁니다.
//!
//! ```text
//! ~/.config/decor/decorations.json   (global)
//!          ▼
//! <project>/.decor/decorations.json  (project)
//! ```

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

/// 글로벌/프로젝트 설정 디렉토리 이름
pub const CONFIG_DIR_NAME: &str = "decor";

/// 한 설정 계층이 위치한 디렉토리
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 글로벌 계층 (`dirs::config_dir()/decor`)
    pub fn global() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::at(dir.join(CONFIG_DIR_NAME)))
    }

    /// 프로젝트 계층 (`<root>/.decor`)
    pub fn project(root: impl AsRef<Path>) -> Self {
        Self::at(root.as_ref().join(format!(".{}", CONFIG_DIR_NAME)))
    }

    /// 우선순위 오름차순 계층 목록 (global → project)
    pub fn layers(project_root: impl AsRef<Path>) -> Vec<Self> {
        Self::global()
            .into_iter()
            .chain(std::iter::once(Self::project(project_root)))
            .collect()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 계층 파일 읽기 (파일이 없으면 None)
    pub fn read<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.dir.join(filename);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        trace!(path = %path.display(), "Read config layer");
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// 계층 파일 쓰기 (디렉토리 생성 포함)
    pub fn write<T: Serialize>(&self, filename: &str, data: &T) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, serde_json::to_string_pretty(data)?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn test_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::project(dir.path());
        assert_eq!(store.read::<Sample>("sample.json").unwrap(), None);
        assert!(!store.dir().exists());
    }

    #[test]
    fn test_write_creates_layer_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::project(dir.path());

        let path = store.write("sample.json", &Sample { value: 3 }).unwrap();
        assert_eq!(path, dir.path().join(".decor").join("sample.json"));
        assert_eq!(
            store.read::<Sample>("sample.json").unwrap(),
            Some(Sample { value: 3 })
        );
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let store = ConfigStore::at(dir.path());

        match store.read::<Sample>("broken.json").unwrap_err() {
            Error::Config(message) => assert!(message.contains("broken.json")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_layers_end_with_project() {
        let dir = tempfile::tempdir().unwrap();
        let layers = ConfigStore::layers(dir.path());
        assert_eq!(layers.last(), Some(&ConfigStore::project(dir.path())));
    }
}
