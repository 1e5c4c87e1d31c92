use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;

use crate::model::FileCategory;

const EXTENSION_TABLE: &[(FileCategory, &[&str])] = &[
    (FileCategory::Video, &[".mp4", ".avi", ".mkv", ".mov", ".wmv"]),
    (FileCategory::Archive, &[".zip", ".rar", ".7z", ".tar", ".gz"]),
    (FileCategory::Log, &[".log", ".txt"]),
    (FileCategory::Image, &[".jpg", ".png", ".bmp", ".gif", ".tiff"]),
    (FileCategory::Document, &[".pdf", ".doc", ".docx"]),
];

static CATEGORY_BY_EXTENSION: Lazy<HashMap<&'static str, FileCategory>> = Lazy::new(|| {
    EXTENSION_TABLE
        .iter()
        .flat_map(|(category, extensions)| {
            extensions
                .iter()
                .map(move |extension| (*extension, *category))
        })
        .collect()
});

/// Lowercased final extension including the dot (`".mp4"`), or `""` when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

pub fn classify_extension(extension: &str) -> FileCategory {
    CATEGORY_BY_EXTENSION
        .get(extension.to_lowercase().as_str())
        .copied()
        .unwrap_or(FileCategory::Other)
}

pub fn classify_path(path: &Path) -> (String, FileCategory) {
    let extension = extension_of(path);
    let category = classify_extension(&extension);
    (extension, category)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{classify_extension, classify_path, extension_of};
    use crate::model::FileCategory;

    #[test]
    fn classifies_case_insensitively() {
        assert_eq!(classify_extension(".MKV"), FileCategory::Video);
        assert_eq!(classify_extension(".7z"), FileCategory::Archive);
        assert_eq!(classify_extension(".txt"), FileCategory::Log);
        assert_eq!(classify_extension(".tiff"), FileCategory::Image);
        assert_eq!(classify_extension(".docx"), FileCategory::Document);
        assert_eq!(classify_extension(".iso"), FileCategory::Other);
        assert_eq!(classify_extension(""), FileCategory::Other);
    }

    #[test]
    fn uses_only_the_final_extension() {
        assert_eq!(
            classify_path(Path::new("/backups/db.tar.GZ")),
            (".gz".to_string(), FileCategory::Archive)
        );
        assert_eq!(extension_of(Path::new("/home/u/.bashrc")), "");
        assert_eq!(extension_of(Path::new("/home/u/Makefile")), "");
    }
}
