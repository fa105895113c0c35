use std::io::Write;
use std::{fs::File, path::Path, path::PathBuf};

pub type TempDir = PathBuf;
pub type TempFile = PathBuf;

pub fn create_file(name: &str, content: &str) -> (TempDir, TempFile) {
    let temp_dir = std::env::temp_dir();
    let temp_file_path = temp_dir.join(name);
    write_file(&temp_file_path, content);

    (temp_dir, temp_file_path)
}

/// Fresh, empty directory under the system temp dir.
pub fn create_dir(name: &str) -> TempDir {
    let temp_dir = std::env::temp_dir().join(name);
    if temp_dir.exists() {
        std::fs::remove_dir_all(&temp_dir).expect("Failed to clear temp dir");
    }
    std::fs::create_dir_all(&temp_dir).expect("Failed to create temp dir");
    temp_dir
}

/// Writes `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) -> TempFile {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    let mut file = File::create(path).expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dir_and_write_file() {
        let dir = create_dir("pcl-test-fs");
        let file = write_file(&dir.join("nested/a.pcl"), "A = 1");

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "A = 1");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
