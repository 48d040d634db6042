use anyhow::{bail, Result};
use log::{debug, warn};
use std::path::PathBuf;
use walkdir::WalkDir;

/// Collects the Rust sources of a project.
///
/// Walks the project directory recursively and skips `target` and hidden
/// directories. Files come back sorted by path so that module order, and
/// with it every tie-break downstream, does not depend on the file system.
///
/// # Example
///
/// ```no_run
/// use gql_from_source::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-server"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} Rust files", result.rust_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// Paths of all discovered `.rs` files, sorted
    pub rust_files: Vec<PathBuf>,
    /// Inaccessible entries that were skipped
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all `.rs` files.
    ///
    /// A single `.rs` file as root is returned as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the root path does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.exists() {
            bail!("Project path does not exist: {}", self.root_path.display());
        }

        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("rs") {
                        rust_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        rust_files.sort();
        debug!(
            "Found {} Rust files under {}",
            rust_files.len(),
            self.root_path.display()
        );

        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn relative_names(result: &ScanResult, root: &std::path::Path) -> Vec<String> {
        result
            .rust_files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_scan_nested_directories_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("src/schema")).unwrap();
        fs::write(root.join("src/schema/user.rs"), "pub struct User;").unwrap();
        fs::write(root.join("src/lib.rs"), "pub mod schema;").unwrap();
        fs::write(root.join("src/a_context.rs"), "pub struct Ctx;").unwrap();
        fs::write(root.join("build.rs"), "fn main() {}").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(
            relative_names(&result, root),
            vec!["build.rs", "src/a_context.rs", "src/lib.rs", "src/schema/user.rs"]
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new(temp_dir.path().to_path_buf()).scan().unwrap();

        assert!(result.rust_files.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_skips_target_and_hidden_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("target")).unwrap();
        fs::write(root.join("target/generated.rs"), "pub struct Generated;").unwrap();
        fs::create_dir(root.join(".cache")).unwrap();
        fs::write(root.join(".cache/stale.rs"), "pub struct Stale;").unwrap();
        fs::write(root.join("lib.rs"), "pub struct Query;").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(relative_names(&result, root), vec!["lib.rs"]);
    }

    #[test]
    fn test_scan_filters_non_rust_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("schema.rs"), "pub struct Query;").unwrap();
        fs::write(root.join("schema.graphql"), "type Query").unwrap();
        fs::write(root.join("Cargo.toml"), "[package]").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(relative_names(&result, root), vec!["schema.rs"]);
    }

    #[test]
    fn test_scan_single_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("schema.rs");
        fs::write(&file, "pub struct Query;").unwrap();

        let result = FileScanner::new(file.clone()).scan().unwrap();

        assert_eq!(result.rust_files, vec![file]);
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        assert!(FileScanner::new(missing).scan().is_err());
    }
}
