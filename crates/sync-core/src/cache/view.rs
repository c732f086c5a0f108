//! Client view projection

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sync_fs::checksum::content_digest;

use super::{FileDigest, Package};
use crate::Result;

/// One folder as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderView {
    #[serde(skip)]
    pub name: String,
    pub mode: String,
    pub server_path: String,
    pub files: BTreeMap<String, FileDigest>,
}

/// Wire payload for one package.
///
/// Serializes as `{"data": [names], <name>: {mode, serverPath, files}, ...,
/// "files": {...}}` with folders in `data` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientView {
    pub data: Vec<String>,
    pub folders: Vec<FolderView>,
    pub files: BTreeMap<String, FileDigest>,
}

impl ClientView {
    /// Project `package`, dropping everything only the operator needs.
    pub fn project(package: &Package) -> Self {
        Self {
            data: package.folder_names().map(str::to_string).collect(),
            folders: package
                .folders
                .iter()
                .map(|folder| FolderView {
                    name: folder.name.clone(),
                    mode: folder.mode.clone(),
                    server_path: folder.server_path.clone(),
                    files: folder.files.clone(),
                })
                .collect(),
            files: package.files.clone(),
        }
    }

    /// Compact JSON bytes of the payload.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Lowercase hex digest of [`ClientView::to_json`].
    pub fn fingerprint(&self) -> Result<String> {
        Ok(content_digest(&self.to_json()?))
    }
}

impl Serialize for ClientView {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.folders.len() + 2))?;
        map.serialize_entry("data", &self.data)?;
        for folder in &self.folders {
            map.serialize_entry(&folder.name, folder)?;
        }
        map.serialize_entry("files", &self.files)?;
        map.end()
    }
}
