use std::path::{Path, PathBuf};

/// Where receipt images live on disk and how they are referenced publicly.
///
/// Every name is a pure function of the receipt number, so rendering the same
/// receipt twice targets the same file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    dir: PathBuf,
    public_prefix: String,
}

impl ArtifactLayout {
    pub fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        let public_prefix = public_prefix.into().trim_matches('/').to_string();
        Self {
            dir: dir.into(),
            public_prefix,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(receipt_number: i64) -> String {
        format!("receipt_{receipt_number}.png")
    }

    /// Filesystem location handed to the renderer and the dispatcher.
    pub fn file_path(&self, receipt_number: i64) -> PathBuf {
        self.dir.join(Self::file_name(receipt_number))
    }

    /// Path recorded on the delivery, relative to the public static root.
    pub fn public_path(&self, receipt_number: i64) -> String {
        let name = Self::file_name(receipt_number);
        if self.public_prefix.is_empty() {
            name
        } else {
            format!("{}/{name}", self.public_prefix)
        }
    }

    /// Map a recorded public path back to the file on disk.
    pub fn resolve_public_path(&self, public_path: &str) -> PathBuf {
        let relative = public_path
            .trim_start_matches('/')
            .strip_prefix(self.public_prefix.as_str())
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(public_path);
        self.dir.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_depend_only_on_the_receipt_number() {
        let layout = ArtifactLayout::new("/srv/boxdrop/static", "static");
        assert_eq!(
            layout.file_path(17421),
            PathBuf::from("/srv/boxdrop/static/receipt_17421.png")
        );
        assert_eq!(layout.file_path(17421), layout.file_path(17421));
        assert_eq!(layout.public_path(17421), "static/receipt_17421.png");
    }

    #[test]
    fn public_paths_resolve_back_to_files() {
        let layout = ArtifactLayout::new("/srv/out", "/static/");
        let public = layout.public_path(17500);
        assert_eq!(public, "static/receipt_17500.png");
        assert_eq!(layout.resolve_public_path(&public), layout.file_path(17500));
    }

    #[test]
    fn empty_prefix_records_bare_file_names() {
        let layout = ArtifactLayout::new("/srv/out", "");
        assert_eq!(layout.public_path(17421), "receipt_17421.png");
        assert_eq!(
            layout.resolve_public_path("receipt_17421.png"),
            PathBuf::from("/srv/out/receipt_17421.png")
        );
    }
}
