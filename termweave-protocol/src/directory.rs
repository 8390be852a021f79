//! Directory listing request/response types.

use serde::{Deserialize, Serialize};

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
    Link,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub permissions: String,
    pub owner: String,
    pub group: String,
    pub size: u64,
    /// Modification timestamp as reported by the server.
    pub modified: String,
}

/// Ask the remote side to list `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListRequest {
    pub session_id: String,
    pub path: String,
}

/// Reply delivered on `/topic/terminal/{id}/directory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListResponse {
    pub success: bool,
    #[serde(default)]
    pub current_path: Option<String>,
    #[serde(default)]
    pub entries: Vec<DirectoryEntry>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DirectoryListResponse {
    /// Decode a response from a topic body.
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_listing() {
        let body = r#"{"success":true,"currentPath":"/home/deploy","entries":[
            {"name":"logs","type":"directory","permissions":"drwxr-xr-x","owner":"deploy",
             "group":"deploy","size":4096,"modified":"2025-01-01 10:00"},
            {"name":"current","type":"link","permissions":"lrwxrwxrwx","owner":"root",
             "group":"root","size":12,"modified":"2025-01-02 08:30"}
        ],"errorMessage":null}"#;
        let resp = DirectoryListResponse::from_body(body).unwrap();
        assert!(resp.success);
        assert_eq!(resp.current_path.as_deref(), Some("/home/deploy"));
        assert_eq!(resp.entries.len(), 2);
        assert_eq!(resp.entries[0].entry_type, EntryType::Directory);
        assert_eq!(resp.entries[1].entry_type, EntryType::Link);
    }

    #[test]
    fn test_parse_failure_listing() {
        let body = r#"{"success":false,"currentPath":null,"entries":[],"errorMessage":"denied"}"#;
        let resp = DirectoryListResponse::from_body(body).unwrap();
        assert!(!resp.success);
        assert!(resp.entries.is_empty());
        assert_eq!(resp.error_message.as_deref(), Some("denied"));
    }

    #[test]
    fn test_entry_type_rejects_unknown() {
        let body = r#"{"name":"x","type":"socket","permissions":"","owner":"",
            "group":"","size":0,"modified":""}"#;
        assert!(serde_json::from_str::<DirectoryEntry>(body).is_err());
    }
}
