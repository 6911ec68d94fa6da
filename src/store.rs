/// Line-oriented storage for the HAProxy configuration file
///
/// Every other component operates on the ordered line sequence held here:
/// the scanner locates section ranges in it, the mutator splices server
/// lines in and out of it, and a save rewrites the whole file. There is no
/// partial or append mode.
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use fs4::FileExt;

use crate::error::{PorteroError, PorteroResult};

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// An ordered sequence of configuration lines, without terminators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineStore {
    lines: Vec<String>,
}

impl LineStore {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Load a file into memory, splitting on line terminators.
    pub fn load<P: AsRef<Path>>(path: P) -> PorteroResult<Self> {
        let mut content = String::new();
        File::open(path)?.read_to_string(&mut content)?;

        let lines = content
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect();

        Ok(Self { lines })
    }

    /// Rewrite the whole file, holding an exclusive advisory lock for the
    /// duration of the write. The lock does not span load + save; two
    /// concurrent edit cycles race last-writer-wins.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> PorteroResult<()> {
        let mut file = OpenOptions::new().create(true).write(true).open(path)?;
        file.lock_exclusive()?;

        let result = file
            .set_len(0)
            .map_err(PorteroError::from)
            .and_then(|()| self.write_to(&mut file));
        let _ = file.unlock();
        result
    }

    fn write_to(&self, file: &mut File) -> PorteroResult<()> {
        for line in &self.lines {
            file.write_all(line.as_bytes())?;
            file.write_all(LINE_ENDING.as_bytes())?;
        }
        file.flush()?;
        Ok(())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn insert(&mut self, index: usize, line: String) {
        self.lines.insert(index, line);
    }

    pub fn replace(&mut self, index: usize, line: String) {
        self.lines[index] = line;
    }

    pub fn remove(&mut self, index: usize) -> String {
        self.lines.remove(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_splits_lines() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "global\n    daemon\n\nbackend web_back\n").unwrap();

        let store = LineStore::load(file.path()).unwrap();
        assert_eq!(
            store.lines(),
            &["global", "    daemon", "", "backend web_back"]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = LineStore::load("/nonexistent/haproxy.cfg");
        assert!(result.is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let store = LineStore::new(vec![
            "backend web_back".to_string(),
            "    server web1 10.0.0.1:80 check".to_string(),
        ]);

        store.save(file.path()).unwrap();
        let reloaded = LineStore::load(file.path()).unwrap();
        assert_eq!(reloaded, store);
    }

    #[test]
    fn test_save_truncates_previous_content() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "a much longer original content\nspanning lines\n").unwrap();

        let store = LineStore::new(vec!["short".to_string()]);
        store.save(file.path()).unwrap();

        let reloaded = LineStore::load(file.path()).unwrap();
        assert_eq!(reloaded.lines(), &["short"]);
    }

    #[test]
    fn test_splice_operations() {
        let mut store = LineStore::new(vec!["a".to_string(), "c".to_string()]);
        store.insert(1, "b".to_string());
        assert_eq!(store.lines(), &["a", "b", "c"]);

        store.replace(1, "B".to_string());
        assert_eq!(store.lines(), &["a", "B", "c"]);

        assert_eq!(store.remove(1), "B");
        assert_eq!(store.lines(), &["a", "c"]);
        assert_eq!(store.len(), 2);
    }
}
