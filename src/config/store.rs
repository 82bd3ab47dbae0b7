//! Multi-profile credential file.
//!
//! The file at `~/.cdis/config` holds one fixed six-line block per profile:
//!
//! ```text
//! [profile]
//! key_id=...
//! api_key=...
//! access_key=...
//! api_endpoint=...
//!
//! ```
//!
//! Blocks are parsed into [`ProfileRecord`]s and validated on read, so a
//! reordered or truncated block is rejected instead of being misindexed.
//! Serialization is deterministic: rewriting a well-formed file with the same
//! values reproduces it byte for byte.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::credential::Credential;
use crate::error::ClientError;

/// Number of lines occupied by one profile block, separator included.
pub const BLOCK_STRIDE: usize = 6;

const KEY_ID: &str = "key_id";
const API_KEY: &str = "api_key";
const ACCESS_KEY: &str = "access_key";
const API_ENDPOINT: &str = "api_endpoint";

/// One named profile as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub name: String,
    pub key_id: String,
    pub api_key: String,
    pub access_key: String,
    pub api_endpoint: String,
}

impl ProfileRecord {
    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            key_id: String::new(),
            api_key: String::new(),
            access_key: String::new(),
            api_endpoint: String::new(),
        }
    }

    pub fn credential(&self) -> Credential {
        Credential {
            key_id: self.key_id.clone(),
            api_key: self.api_key.clone(),
            access_key: self.access_key.clone(),
            api_endpoint: Some(self.api_endpoint.clone()).filter(|e| !e.is_empty()),
        }
    }

    fn to_block(&self) -> String {
        format!(
            "[{}]\n{KEY_ID}={}\n{API_KEY}={}\n{ACCESS_KEY}={}\n{API_ENDPOINT}={}\n\n",
            self.name, self.key_id, self.api_key, self.access_key, self.api_endpoint
        )
    }
}

/// Returns the fixed credential file location, `~/.cdis/config`.
///
/// # Errors
/// - `Environment` if the home directory cannot be resolved
pub fn locate_profile_store_path() -> Result<PathBuf, ClientError> {
    let home = dirs::home_dir().ok_or(ClientError::Environment)?;
    Ok(home.join(".cdis").join("config"))
}

/// Finds the start line of the first block whose header is exactly `[name]`.
///
/// Only lines at multiples of [`BLOCK_STRIDE`] are considered headers.
pub fn find_profile_block(lines: &[&str], name: &str) -> Option<usize> {
    let header = format!("[{name}]");
    (0..lines.len())
        .step_by(BLOCK_STRIDE)
        .find(|&i| lines[i] == header)
}

/// Overwrites each stored field for which a non-empty value is supplied.
pub fn apply_credential_updates(record: &mut ProfileRecord, credential: &Credential, endpoint: &str) {
    let updates = [
        (&mut record.key_id, credential.key_id.as_str()),
        (&mut record.api_key, credential.api_key.as_str()),
        (&mut record.access_key, credential.access_key.as_str()),
        (&mut record.api_endpoint, endpoint),
    ];
    for (field, value) in updates {
        if !value.is_empty() {
            *field = value.to_string();
        }
    }
}

/// Checks that `name` and every supplied value fit on a single line of a block.
///
/// Runs before any disk access so a rejected update leaves the file as it was.
fn validate_update(name: &str, credential: &Credential, endpoint: &str) -> Result<(), ClientError> {
    if name.is_empty() || name.contains(['\n', '\r', '[', ']']) {
        return Err(ClientError::InvalidInput(format!(
            "profile name {name:?}: it must be non-empty and free of line breaks and brackets"
        )));
    }
    let values = [
        (KEY_ID, credential.key_id.as_str()),
        (API_KEY, credential.api_key.as_str()),
        (ACCESS_KEY, credential.access_key.as_str()),
        (API_ENDPOINT, endpoint),
    ];
    if let Some((key, _)) = values.iter().find(|(_, v)| v.contains(['\n', '\r'])) {
        return Err(ClientError::InvalidInput(format!(
            "{key} for profile '{name}': value contains a line break"
        )));
    }
    Ok(())
}

/// Splits file content into lines, dropping the artifact after a final newline.
fn split_lines(content: &str) -> Vec<&str> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    content
        .strip_suffix('\n')
        .unwrap_or(content)
        .split('\n')
        .collect()
}

/// Parses and validates every block in the file.
///
/// The final block may omit its blank separator; every other deviation from
/// the six-line shape is a `ConfigParse` error naming the offending line.
pub fn parse_profiles(content: &str) -> Result<Vec<ProfileRecord>, ClientError> {
    let lines = split_lines(content);
    let mut records = Vec::with_capacity(lines.len() / BLOCK_STRIDE + 1);

    for start in (0..lines.len()).step_by(BLOCK_STRIDE) {
        let name = lines[start]
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| malformed(start, "expected a [profile] header"))?;

        let record = ProfileRecord {
            name: name.to_string(),
            key_id: field(&lines, start + 1, KEY_ID)?,
            api_key: field(&lines, start + 2, API_KEY)?,
            access_key: field(&lines, start + 3, ACCESS_KEY)?,
            api_endpoint: field(&lines, start + 4, API_ENDPOINT)?,
        };

        let separator = start + BLOCK_STRIDE - 1;
        if lines.get(separator).is_some_and(|l| !l.is_empty()) {
            return Err(malformed(separator, "expected a blank separator line"));
        }

        records.push(record);
    }

    Ok(records)
}

/// Reads the value of a `key=value` line, requiring the expected key.
fn field(lines: &[&str], index: usize, key: &str) -> Result<String, ClientError> {
    let line = lines
        .get(index)
        .ok_or_else(|| malformed(index, &format!("missing '{key}=' line")))?;
    line.split_once('=')
        .filter(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
        .ok_or_else(|| malformed(index, &format!("expected '{key}='")))
}

fn malformed(index: usize, message: &str) -> ClientError {
    ClientError::parse("credential file", format!("line {}: {message}", index + 1))
}

/// The credential file and the operations that read and update it.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Store at the default `~/.cdis/config` location.
    pub fn locate() -> Result<Self, ClientError> {
        Ok(Self::at(locate_profile_store_path()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file; a missing file reads as empty.
    pub fn read_raw(&self) -> Result<String, ClientError> {
        match fs::read(&self.path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map_err(|e| ClientError::parse("credential file", e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(ClientError::storage(&self.path, e)),
        }
    }

    pub fn load(&self) -> Result<Vec<ProfileRecord>, ClientError> {
        parse_profiles(&self.read_raw()?)
    }

    /// Loads the credential stored under `name`.
    ///
    /// # Errors
    /// - `ProfileNotFound` if no block has a `[name]` header
    /// - `ConfigParse` if the file is malformed
    pub fn profile(&self, name: &str) -> Result<Credential, ClientError> {
        let content = self.read_raw()?;
        let records = parse_profiles(&content)?;
        find_profile_block(&split_lines(&content), name)
            .map(|start| records[start / BLOCK_STRIDE].credential())
            .ok_or_else(|| ClientError::ProfileNotFound(name.to_string()))
    }

    /// Applies a (possibly partial) update to `name`, creating the profile if needed.
    ///
    /// Names that are empty or contain line breaks or brackets, and values with
    /// line breaks, are rejected with `InvalidInput` before the file is read.
    ///
    /// An existing profile is updated by rewriting the whole file; a new
    /// profile is appended as a fresh block. Nothing is written if the file
    /// fails validation.
    pub fn update(&self, name: &str, credential: &Credential, endpoint: &str) -> Result<(), ClientError> {
        validate_update(name, credential, endpoint)?;
        let content = self.read_raw()?;
        let mut records = parse_profiles(&content)?;

        match find_profile_block(&split_lines(&content), name) {
            Some(start) => {
                apply_credential_updates(&mut records[start / BLOCK_STRIDE], credential, endpoint);
                self.persist(&records)?;
                tracing::info!("Updated profile '{}' in {}", name, self.path.display());
            }
            None => {
                let mut record = ProfileRecord::empty(name);
                apply_credential_updates(&mut record, credential, endpoint);
                let clean_tail = content.is_empty() || (!records.is_empty() && content.ends_with("\n\n"));
                if clean_tail {
                    self.append(&record)?;
                } else {
                    // Missing final separator or stray blank lines; a full rewrite normalizes them.
                    records.push(record);
                    self.persist(&records)?;
                }
                tracing::info!("Added profile '{}' to {}", name, self.path.display());
            }
        }
        Ok(())
    }

    fn persist(&self, records: &[ProfileRecord]) -> Result<(), ClientError> {
        let content: String = records.iter().map(ProfileRecord::to_block).collect();
        let mut file = self.open(false)?;
        file.write_all(content.as_bytes())
            .map_err(|e| ClientError::storage(&self.path, e))
    }

    fn append(&self, record: &ProfileRecord) -> Result<(), ClientError> {
        let mut file = self.open(true)?;
        file.write_all(record.to_block().as_bytes())
            .map_err(|e| ClientError::storage(&self.path, e))
    }

    fn open(&self, append: bool) -> Result<fs::File, ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ClientError::storage(parent, e))?;
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        options
            .open(&self.path)
            .map_err(|e| ClientError::storage(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TWO_PROFILES: &str = "[default]\nkey_id=kid\napi_key=secret\naccess_key=tok\napi_endpoint=https://x.test\n\n\
[user1]\nkey_id=kid1\napi_key=secret1\naccess_key=tok1\napi_endpoint=https://y.test\n\n";

    fn store_with(content: &str) -> (TempDir, ProfileStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, content).unwrap();
        (dir, ProfileStore::at(path))
    }

    fn key_material(key_id: &str, api_key: &str) -> Credential {
        Credential {
            key_id: key_id.to_string(),
            api_key: api_key.to_string(),
            ..Credential::default()
        }
    }

    #[test]
    fn test_find_profile_block_at_stride() {
        let lines = split_lines(TWO_PROFILES);
        assert_eq!(find_profile_block(&lines, "default"), Some(0));
        assert_eq!(find_profile_block(&lines, "user1"), Some(6));
        assert_eq!(find_profile_block(&lines, "missing"), None);
    }

    #[test]
    fn test_find_profile_block_ignores_off_stride_headers() {
        let lines = vec!["[a]", "[b]", "x", "y", "z", "", "[c]"];
        assert_eq!(find_profile_block(&lines, "b"), None);
        assert_eq!(find_profile_block(&lines, "c"), Some(6));
    }

    #[test]
    fn test_find_profile_block_first_duplicate_wins() {
        let content = format!("{}{}", TWO_PROFILES, "[default]\nkey_id=a\napi_key=b\naccess_key=c\napi_endpoint=d\n\n");
        let lines = split_lines(&content);
        assert_eq!(find_profile_block(&lines, "default"), Some(0));
    }

    #[test]
    fn test_parse_profiles() {
        let records = parse_profiles(TWO_PROFILES).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "user1");
        assert_eq!(records[1].api_endpoint, "https://y.test");
    }

    #[test]
    fn test_parse_allows_missing_final_separator() {
        let records = parse_profiles("[a]\nkey_id=1\napi_key=2\naccess_key=3\napi_endpoint=4\n").unwrap();
        assert_eq!(records[0].access_key, "3");
    }

    #[test]
    fn test_parse_keeps_equals_in_values() {
        let records = parse_profiles("[a]\nkey_id=1\napi_key=ab==\naccess_key=x.y=\napi_endpoint=e\n\n").unwrap();
        assert_eq!(records[0].api_key, "ab==");
        assert_eq!(records[0].access_key, "x.y=");
    }

    #[test]
    fn test_parse_rejects_reordered_fields() {
        let err = parse_profiles("[a]\napi_key=2\nkey_id=1\naccess_key=3\napi_endpoint=4\n\n").unwrap_err();
        assert!(matches!(err, ClientError::ConfigParse { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_rejects_truncated_block() {
        let err = parse_profiles("[a]\nkey_id=1\napi_key=2\n").unwrap_err();
        assert!(err.to_string().contains("access_key"));
    }

    #[test]
    fn test_parse_rejects_missing_separator_between_blocks() {
        let err = parse_profiles("[a]\nkey_id=1\napi_key=2\naccess_key=3\napi_endpoint=4\n[b]\n").unwrap_err();
        assert!(err.to_string().contains("line 6"));
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::at(dir.path().join("nope"));
        assert_eq!(store.read_raw().unwrap(), "");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_profile_not_found() {
        let (_dir, store) = store_with(TWO_PROFILES);
        let err = store.profile("ghost").unwrap_err();
        assert!(matches!(err, ClientError::ProfileNotFound(name) if name == "ghost"));
    }

    #[test]
    fn test_update_creates_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".cdis").join("config");
        let store = ProfileStore::at(&path);

        store.update("default", &key_material("kid", "secret"), "https://x.test").unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[default]\nkey_id=kid\napi_key=secret\naccess_key=\napi_endpoint=https://x.test\n\n"
        );
        let cred = store.profile("default").unwrap();
        assert_eq!(cred.key_id, "kid");
        assert_eq!(cred.api_key, "secret");
        assert_eq!(cred.endpoint(), Some("https://x.test"));
        assert!(cred.access_key.is_empty());
    }

    #[test]
    fn test_new_profile_is_appended_verbatim() {
        let (_dir, store) = store_with(TWO_PROFILES);
        store.update("user2", &key_material("k2", "s2"), "https://z.test").unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with(TWO_PROFILES));
        assert!(content.ends_with("[user2]\nkey_id=k2\napi_key=s2\naccess_key=\napi_endpoint=https://z.test\n\n"));
    }

    #[test]
    fn test_append_after_unterminated_block_normalizes_file() {
        let (_dir, store) = store_with("[a]\nkey_id=1\napi_key=2\naccess_key=3\napi_endpoint=4");
        store.update("b", &key_material("5", "6"), "7").unwrap();

        let records = store.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "b");
    }

    #[test]
    fn test_blank_file_is_replaced_by_first_profile() {
        let (_dir, store) = store_with("\n\n");
        store.update("a", &key_material("1", "2"), "3").unwrap();

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "[a]\nkey_id=1\napi_key=2\naccess_key=\napi_endpoint=3\n\n"
        );
    }

    #[test]
    fn test_access_token_refresh_touches_only_that_line() {
        let (_dir, store) = store_with(TWO_PROFILES);
        store.update("default", &Credential::access_only("fresh"), "").unwrap();

        let expected = TWO_PROFILES.replace("access_key=tok\n", "access_key=fresh\n");
        assert_eq!(fs::read_to_string(store.path()).unwrap(), expected);
    }

    #[test]
    fn test_identical_update_is_byte_identical() {
        let (_dir, store) = store_with(TWO_PROFILES);
        let cred = Credential {
            key_id: "kid1".to_string(),
            api_key: "secret1".to_string(),
            access_key: "tok1".to_string(),
            api_endpoint: None,
        };

        store.update("user1", &cred, "https://y.test").unwrap();
        let first = fs::read(store.path()).unwrap();
        store.update("user1", &cred, "https://y.test").unwrap();

        assert_eq!(fs::read(store.path()).unwrap(), first);
        assert_eq!(first, TWO_PROFILES.as_bytes());
    }

    #[test]
    fn test_empty_profile_name_is_rejected() {
        let (_dir, store) = store_with(TWO_PROFILES);

        let err = store.update("", &key_material("k", "s"), "https://y.test").unwrap_err();

        assert!(matches!(err, ClientError::InvalidInput(_)));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), TWO_PROFILES);
        assert_eq!(store.profile("default").unwrap().key_id, "kid");
    }

    #[test]
    fn test_profile_name_with_line_break_is_rejected() {
        let (_dir, store) = store_with(TWO_PROFILES);

        for name in ["a\nb", "a\rb", "a]b"] {
            let err = store.update(name, &key_material("k", "s"), "e").unwrap_err();
            assert!(matches!(err, ClientError::InvalidInput(_)), "{name:?}");
        }
        assert_eq!(fs::read_to_string(store.path()).unwrap(), TWO_PROFILES);
    }

    #[test]
    fn test_multiline_token_is_rejected_and_store_stays_readable() {
        let (_dir, store) = store_with(TWO_PROFILES);

        let err = store
            .update("default", &Credential::access_only("tok\nen"), "")
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidInput(ref m) if m.contains("access_key")));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), TWO_PROFILES);
        assert_eq!(store.profile("default").unwrap().access_key, "tok");
        assert_eq!(store.profile("user1").unwrap().access_key, "tok1");
    }

    #[test]
    fn test_multiline_key_material_and_endpoint_are_rejected() {
        let (_dir, store) = store_with(TWO_PROFILES);

        assert!(store.update("user2", &key_material("k\r\n", "s"), "e").is_err());
        assert!(store.update("user2", &key_material("k", "s\n"), "e").is_err());
        assert!(store.update("user2", &key_material("k", "s"), "https://z.test\n").is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), TWO_PROFILES);
    }

    #[test]
    fn test_malformed_file_is_not_rewritten() {
        let broken = "[a]\nkey_id=1\nbogus\n";
        let (_dir, store) = store_with(broken);

        assert!(store.update("a", &Credential::access_only("t"), "").is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), broken);
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = ProfileStore::at(dir.path().join("config"));
        store.update("default", &key_material("k", "s"), "e").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
