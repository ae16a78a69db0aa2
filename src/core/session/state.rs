use std::collections::{BTreeMap, HashMap};

use crate::models::{FileCategory, ProjectName, UploadedFile};

/// Files known for one project, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileIndex {
    by_category: BTreeMap<FileCategory, Vec<UploadedFile>>,
}

impl FileIndex {
    pub fn from_files(files: impl IntoIterator<Item = UploadedFile>) -> Self {
        let mut index = Self::default();
        for file in files {
            index.push(file);
        }
        index
    }

    pub fn push(&mut self, file: UploadedFile) {
        self.by_category.entry(file.category).or_default().push(file);
    }

    pub fn category(&self, category: FileCategory) -> &[UploadedFile] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Category a file named `filename` was filed under, if any.
    pub fn category_of(&self, filename: &str) -> Option<FileCategory> {
        self.by_category
            .iter()
            .find(|(_, files)| files.iter().any(|f| f.filename == filename))
            .map(|(category, _)| *category)
    }

    /// All files, category by category in [`FileCategory::ALL`] order.
    pub fn files(&self) -> Vec<UploadedFile> {
        self.by_category.values().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything the session controller remembers between operations.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    current_project: Option<ProjectName>,
    file_cache: HashMap<ProjectName, FileIndex>,
}

impl SessionState {
    pub fn current_project(&self) -> Option<&ProjectName> {
        self.current_project.as_ref()
    }

    pub fn set_current_project(&mut self, project: ProjectName) {
        self.current_project = Some(project);
    }

    pub fn clear_current_project(&mut self) -> Option<ProjectName> {
        self.current_project.take()
    }

    pub fn files(&self, project: &ProjectName) -> Option<&FileIndex> {
        self.file_cache.get(project)
    }

    /// Replaces the cached listing for `project` wholesale.
    pub fn replace_files(&mut self, project: ProjectName, index: FileIndex) {
        self.file_cache.insert(project, index);
    }

    pub fn clear_files(&mut self, project: &ProjectName) {
        self.file_cache.remove(project);
    }

    pub fn record_upload(&mut self, project: &ProjectName, file: UploadedFile) {
        self.file_cache.entry(project.clone()).or_default().push(file);
    }
}
