/// In-memory storage backend, chiefly for tests.
use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{StorageBackend, StorageError};
use crate::path::StorePath;

enum Node {
    File(Vec<u8>),
    Directory(BTreeMap<String, Node>),
}

impl Node {
    fn new_dir() -> Node {
        Node::Directory(BTreeMap::new())
    }
}

/// A tree of maps. Unlike the disk backend it rejects file-vs-directory
/// name collisions with [`StorageError::AlreadyExists`].
pub struct MemoryStorage {
    root: RwLock<Node>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            root: RwLock::new(Node::new_dir()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn find_dir<'a>(root: &'a Node, dir: &StorePath) -> Option<&'a BTreeMap<String, Node>> {
    let mut current = root;
    for segment in dir.segments() {
        match current {
            Node::Directory(children) => current = children.get(segment)?,
            Node::File(_) => return None,
        }
    }
    match current {
        Node::Directory(children) => Some(children),
        Node::File(_) => None,
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn list_files(&self, dir: &StorePath) -> Result<Vec<String>, StorageError> {
        let root = self.root.read().expect("storage lock poisoned");
        let Some(children) = find_dir(&root, dir) else {
            return Ok(Vec::new());
        };
        Ok(children
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn list_directories(&self, dir: &StorePath) -> Result<Vec<String>, StorageError> {
        let root = self.root.read().expect("storage lock poisoned");
        let Some(children) = find_dir(&root, dir) else {
            return Ok(Vec::new());
        };
        Ok(children
            .iter()
            .filter(|(_, node)| matches!(node, Node::Directory(_)))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn get_file(&self, path: &StorePath) -> Result<Vec<u8>, StorageError> {
        let root = self.root.read().expect("storage lock poisoned");
        let parent = find_dir(&root, &path.parent())
            .ok_or_else(|| StorageError::FileNotFound(path.clone()))?;
        let name = path
            .basename()
            .ok_or_else(|| StorageError::FileNotFound(path.clone()))?;
        match parent.get(name) {
            Some(Node::File(contents)) => Ok(contents.clone()),
            _ => Err(StorageError::FileNotFound(path.clone())),
        }
    }

    async fn put_file(&self, path: &StorePath, contents: Vec<u8>) -> Result<(), StorageError> {
        let name = path
            .basename()
            .ok_or_else(|| StorageError::InvalidPath {
                path: path.to_string(),
                reason: "cannot write to the root path".to_string(),
            })?
            .to_string();

        let mut root = self.root.write().expect("storage lock poisoned");
        let mut current = &mut *root;
        for segment in path.parent().segments() {
            let Node::Directory(children) = current else {
                return Err(StorageError::AlreadyExists(path.clone()));
            };
            current = children
                .entry(segment.clone())
                .or_insert_with(Node::new_dir);
        }
        let Node::Directory(children) = current else {
            return Err(StorageError::AlreadyExists(path.clone()));
        };
        if matches!(children.get(&name), Some(Node::Directory(_))) {
            return Err(StorageError::AlreadyExists(path.clone()));
        }
        children.insert(name, Node::File(contents));
        Ok(())
    }

    async fn file_exists(&self, path: &StorePath) -> Result<bool, StorageError> {
        let root = self.root.read().expect("storage lock poisoned");
        let Some(parent) = find_dir(&root, &path.parent()) else {
            return Ok(false);
        };
        let Some(name) = path.basename() else {
            return Ok(false);
        };
        Ok(matches!(parent.get(name), Some(Node::File(_))))
    }

    async fn delete_file(&self, path: &StorePath) -> Result<(), StorageError> {
        let Some(name) = path.basename() else {
            return Ok(());
        };
        let mut root = self.root.write().expect("storage lock poisoned");
        let mut current = &mut *root;
        for segment in path.parent().segments() {
            let Node::Directory(children) = current else {
                return Ok(());
            };
            match children.get_mut(segment) {
                Some(node) => current = node,
                None => return Ok(()),
            }
        }
        if let Node::Directory(children) = current {
            if matches!(children.get(name), Some(Node::File(_))) {
                children.remove(name);
            }
        }
        Ok(())
    }

    async fn download_file(
        &self,
        path: &StorePath,
        destination: &std::path::Path,
    ) -> Result<u64, StorageError> {
        let contents = self.get_file(path).await?;
        tokio::fs::write(destination, &contents)
            .await
            .map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(contents.len() as u64)
    }
}
