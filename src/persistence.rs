//! JSON-backed list files (allowed senders, saved emails).

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// Reads a JSON array from `path`.
///
/// A missing, unreadable or malformed file yields an empty vector.
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Vec<T> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            debug!("{} not loaded: {}", path.display(), err);
            return Vec::new();
        }
    };

    match serde_json::from_reader(BufReader::new(file)) {
        Ok(items) => items,
        Err(err) => {
            debug!("{} is not a JSON list: {}", path.display(), err);
            Vec::new()
        }
    }
}

/// Writes `data` to `path` as indented JSON, creating the parent directory
/// first. Failures are logged and otherwise ignored.
pub fn save<T: Serialize + ?Sized>(path: impl AsRef<Path>, data: &T) {
    let path = path.as_ref();
    if let Err(err) = write_json(path, data) {
        error!("Error saving {}: {}", path.display(), err);
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> std::io::Result<()> {
    if let Some(directory) = path.parent() {
        if !directory.as_os_str().is_empty() && !directory.exists() {
            fs::create_dir_all(directory)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    data.serialize(&mut serializer)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Vec<String> = load(dir.path().join("nope.json"));
        assert!(loaded.is_empty());
    }

    #[test]
    fn malformed_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let loaded: Vec<String> = load(&path);
        assert!(loaded.is_empty());
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lists").join("nested").join("allowed.json");

        save(&path, &["x@example.com".to_string()]);

        assert!(path.exists());
        let loaded: Vec<String> = load(&path);
        assert_eq!(loaded, vec!["x@example.com".to_string()]);
    }

    #[test]
    fn save_uses_four_space_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowed.json");

        save(&path, &["a@example.com"]);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "[\n    \"a@example.com\"\n]");
    }

    #[test]
    fn load_save_load_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        save(
            &first,
            &vec![json!({"id": 7, "tags": ["a", "b"]}), json!("plain"), json!(null)],
        );

        let loaded: Vec<Value> = load(&first);
        save(&second, &loaded);

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
        let reloaded: Vec<Value> = load(&second);
        assert_eq!(loaded, reloaded);
    }

    #[test]
    fn save_into_file_path_collision_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        save(blocker.join("allowed.json"), &["a@example.com"]);

        assert!(blocker.is_file());
    }
}
