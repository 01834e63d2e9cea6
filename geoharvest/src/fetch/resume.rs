//! Filesystem-derived resume state.
//!
//! Progress is recovered purely from artifact files on disk, so an
//! interrupted run can be restarted with the same arguments and only the
//! missing work is redone.

use super::FetchError;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Matches sequentially numbered artifact files like `image3.png`,
/// capturing the extension.
fn image_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^image\d+\.([a-z]+)$").unwrap())
}

/// Counts `image<N>.<ext>` artifacts already present in `dir`.
///
/// Only files with the given extension count, so a directory holding
/// artifacts from a differently-configured run never inflates the resume
/// state beyond the names [`next_free_image_names`] would reserve. A
/// missing directory counts as zero; other files (journals, strays) are
/// ignored.
pub fn count_existing_images(dir: &Path, ext: &str) -> Result<usize, FetchError> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            let matches_ext = image_name_pattern()
                .captures(name)
                .is_some_and(|c| &c[1] == ext);
            if matches_ext {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// Picks `count` unused `image<N>.<ext>` names in `dir`, lowest indices
/// first. Existing files are skipped, never reused.
pub fn next_free_image_names(dir: &Path, ext: &str, count: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(count);
    let mut index = 0usize;
    while names.len() < count {
        let name = format!("image{index}.{ext}");
        if !dir.join(&name).exists() {
            names.push(name);
        }
        index += 1;
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory_counts_zero() {
        let dir = tempdir().unwrap();
        assert_eq!(
            count_existing_images(&dir.path().join("absent"), "png").unwrap(),
            0
        );
    }

    #[test]
    fn test_count_ignores_non_artifact_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("image0.png"), b"x").unwrap();
        std::fs::write(dir.path().join("image1.png"), b"x").unwrap();
        std::fs::write(dir.path().join("loc.csv"), b"name,location\n").unwrap();
        std::fs::write(dir.path().join("imagex.png"), b"x").unwrap();
        std::fs::write(dir.path().join("image2.PNG"), b"x").unwrap();

        assert_eq!(count_existing_images(dir.path(), "png").unwrap(), 2);
    }

    #[test]
    fn test_count_only_matches_the_configured_extension() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("image0.png"), b"x").unwrap();
        std::fs::write(dir.path().join("image1.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("image2.jpg"), b"x").unwrap();

        // Counting matches the names next_free_image_names would reserve
        assert_eq!(count_existing_images(dir.path(), "png").unwrap(), 1);
        assert_eq!(count_existing_images(dir.path(), "jpg").unwrap(), 2);
    }

    #[test]
    fn test_free_names_skip_existing_indices() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("image0.png"), b"x").unwrap();
        std::fs::write(dir.path().join("image2.png"), b"x").unwrap();

        let names = next_free_image_names(dir.path(), "png", 3);
        assert_eq!(names, vec!["image1.png", "image3.png", "image4.png"]);
    }

    #[test]
    fn test_free_names_in_empty_directory_start_at_zero() {
        let dir = tempdir().unwrap();
        let names = next_free_image_names(dir.path(), "png", 2);
        assert_eq!(names, vec!["image0.png", "image1.png"]);
    }
}
