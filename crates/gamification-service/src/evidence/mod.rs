//! 活动证据文件存储边界
//!
//! 证据文件的上传、压缩由外部存储负责，核心流程只在活动删除
//! 或编辑移除证据时调用 [`EvidenceStore::delete_files`]。删除逐个 key 尽力执行，
//! 单个文件失败只记录日志，不影响其余文件和数据库操作。

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

/// 一次批量删除的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceDeletion {
    pub deleted: Vec<String>,
    /// 文件已不存在
    pub missing: Vec<String>,
    /// (key, 错误信息)
    pub failed: Vec<(String, String)>,
}

impl EvidenceDeletion {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 证据存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// 尽力删除给定 key 的文件，从不返回错误
    async fn delete_files(&self, keys: &[String]) -> EvidenceDeletion;
}

/// 基于本地目录的证据存储，对象 key 即相对路径
#[derive(Debug, Clone)]
pub struct LocalEvidenceStore {
    root_dir: PathBuf,
}

impl LocalEvidenceStore {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// 将 key 解析为根目录下的路径，拒绝绝对路径和 `..`
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty() {
            return None;
        }
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root_dir.join(relative))
    }
}

#[async_trait]
impl EvidenceStore for LocalEvidenceStore {
    async fn delete_files(&self, keys: &[String]) -> EvidenceDeletion {
        let mut outcome = EvidenceDeletion::default();

        for key in keys {
            let Some(path) = self.resolve(key) else {
                warn!(key = %key, "证据 key 非法，已跳过");
                outcome
                    .failed
                    .push((key.clone(), "key escapes evidence root".to_string()));
                continue;
            };

            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(key = %key, "证据文件已删除");
                    outcome.deleted.push(key.clone());
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(key = %key, "证据文件不存在");
                    outcome.missing.push(key.clone());
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "证据文件删除失败");
                    outcome.failed.push((key.clone(), e.to_string()));
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("eco-evidence-{}-{}", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_resolve_rejects_escaping_keys() {
        let store = LocalEvidenceStore::new("/srv/evidence");
        assert!(store.resolve("../etc/passwd").is_none());
        assert!(store.resolve("a/../../b").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("").is_none());
        assert_eq!(
            store.resolve("activities/1/photo.jpg"),
            Some(PathBuf::from("/srv/evidence/activities/1/photo.jpg"))
        );
    }

    #[tokio::test]
    async fn test_delete_files_is_best_effort() {
        let root = temp_root("delete");
        fs::create_dir_all(root.join("activities/1")).await.unwrap();
        fs::write(root.join("activities/1/a.jpg"), b"a").await.unwrap();
        fs::write(root.join("activities/1/b.jpg"), b"b").await.unwrap();

        let store = LocalEvidenceStore::new(&root);
        let keys = vec![
            "activities/1/a.jpg".to_string(),
            "../outside.jpg".to_string(),
            "activities/1/gone.jpg".to_string(),
            "activities/1/b.jpg".to_string(),
        ];
        let outcome = store.delete_files(&keys).await;

        assert_eq!(
            outcome.deleted,
            vec!["activities/1/a.jpg".to_string(), "activities/1/b.jpg".to_string()]
        );
        assert_eq!(outcome.missing, vec!["activities/1/gone.jpg".to_string()]);
        assert_eq!(outcome.failed.len(), 1);
        assert!(!outcome.is_complete());
        assert!(!root.join("activities/1/a.jpg").exists());

        fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_key_list() {
        let store = LocalEvidenceStore::new(temp_root("empty"));
        let outcome = store.delete_files(&[]).await;
        assert!(outcome.is_complete());
        assert!(outcome.deleted.is_empty());
    }
}
