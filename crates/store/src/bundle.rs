//! Entry-file discovery inside a package directory

use hotswap_errors::Error;
use std::path::Path;

/// Find the first file named `entry_file_name` under `package_dir`.
///
/// Directories are searched depth first with entries in lexicographic order.
/// Returns the `/`-separated path relative to `package_dir`.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub async fn find_entry_file(
    package_dir: &Path,
    entry_file_name: &str,
) -> Result<Option<String>, Error> {
    search(package_dir, "", entry_file_name).await
}

async fn search(dir: &Path, prefix: &str, entry_file_name: &str) -> Result<Option<String>, Error> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::io_with_path(&e, dir))?;

    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let is_dir = entry.file_type().await?.is_dir();
        entries.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
    }
    entries.sort();

    for (name, is_dir) in entries {
        let relative = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };

        if is_dir {
            if let Some(found) =
                Box::pin(search(&dir.join(&name), &relative, entry_file_name)).await?
            {
                return Ok(Some(found));
            }
        } else if name == entry_file_name {
            return Ok(Some(relative));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_finds_first_in_lexicographic_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        tokio::fs::create_dir_all(root.join("b/inner")).await.unwrap();
        tokio::fs::create_dir_all(root.join("a")).await.unwrap();
        tokio::fs::write(root.join("b/inner/index.bundle"), b"b")
            .await
            .unwrap();
        tokio::fs::write(root.join("a/index.bundle"), b"a")
            .await
            .unwrap();

        let found = find_entry_file(root, "index.bundle").await.unwrap();
        assert_eq!(found.as_deref(), Some("a/index.bundle"));
    }

    #[tokio::test]
    async fn test_missing_entry_file() {
        let temp = TempDir::new().unwrap();
        tokio::fs::write(temp.path().join("other.js"), b"x")
            .await
            .unwrap();
        assert!(find_entry_file(temp.path(), "index.bundle")
            .await
            .unwrap()
            .is_none());
    }
}
