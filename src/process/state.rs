//! Accumulated CSS for one build.

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::resource::file::FileId;

/// How a stylesheet entered the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// A configured global stylesheet.
    Global,
    /// Pulled in through `@import` or `composes … from`.
    Imported,
    /// Any other transformed stylesheet.
    Local,
}

impl Bucket {
    /// All buckets, in injection order.
    pub const ORDER: [Bucket; 3] = [Bucket::Global, Bucket::Imported, Bucket::Local];
}

/// Three insertion-ordered maps of scoped CSS, keyed by file.
///
/// Created empty per plugin instance and never cleared. Writing a file a
/// second time replaces its CSS but keeps its original position. Locks are
/// only held for a single map operation, never across an `.await`.
#[derive(Debug, Default)]
pub struct BuildState {
    global: Mutex<IndexMap<FileId, String>>,
    imported: Mutex<IndexMap<FileId, String>>,
    local: Mutex<IndexMap<FileId, String>>,
}

impl BuildState {
    /// Create empty buckets.
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket(&self, bucket: Bucket) -> &Mutex<IndexMap<FileId, String>> {
        match bucket {
            Bucket::Global => &self.global,
            Bucket::Imported => &self.imported,
            Bucket::Local => &self.local,
        }
    }

    /// Store the CSS of `id` in `bucket`.
    pub fn insert(&self, bucket: Bucket, id: FileId, css: String) {
        self.bucket(bucket).lock().insert(id, css);
    }

    /// Get the CSS stored for `id` in `bucket`.
    pub fn get(&self, bucket: Bucket, id: &FileId) -> Option<String> {
        self.bucket(bucket).lock().get(id).cloned()
    }

    /// Whether any bucket holds `id`.
    pub fn contains(&self, id: &FileId) -> bool {
        Bucket::ORDER
            .iter()
            .any(|&bucket| self.bucket(bucket).lock().contains_key(id))
    }

    /// Files stored in `bucket`, in insertion order.
    pub fn ids(&self, bucket: Bucket) -> Vec<FileId> {
        self.bucket(bucket).lock().keys().cloned().collect()
    }

    /// Number of entries in `bucket`.
    pub fn len(&self, bucket: Bucket) -> usize {
        self.bucket(bucket).lock().len()
    }

    /// Whether every bucket is empty.
    pub fn is_empty(&self) -> bool {
        Bucket::ORDER
            .iter()
            .all(|&bucket| self.bucket(bucket).lock().is_empty())
    }

    /// Concatenate global, imported and local CSS, each in insertion order.
    pub fn concat(&self) -> String {
        let mut css = String::new();
        for bucket in Bucket::ORDER {
            for fragment in self.bucket(bucket).lock().values() {
                css.push_str(fragment);
            }
        }
        css
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_order() {
        let state = BuildState::new();
        state.insert(Bucket::Local, FileId::new("/a.css"), "a;".into());
        state.insert(Bucket::Imported, FileId::new("/b.css"), "b;".into());
        state.insert(Bucket::Global, FileId::new("/g.css"), "g;".into());
        state.insert(Bucket::Imported, FileId::new("/c.css"), "c;".into());

        assert_eq!(state.concat(), "g;b;c;a;");
    }

    #[test]
    fn test_rewrite_keeps_position() {
        let state = BuildState::new();
        state.insert(Bucket::Local, FileId::new("/a.css"), "old;".into());
        state.insert(Bucket::Local, FileId::new("/b.css"), "b;".into());
        state.insert(Bucket::Local, FileId::new("/a.css"), "new;".into());

        assert_eq!(state.len(Bucket::Local), 2);
        assert_eq!(state.concat(), "new;b;");
    }

    #[test]
    fn test_lookup() {
        let state = BuildState::new();
        assert!(state.is_empty());

        let id = FileId::new("/a.css");
        state.insert(Bucket::Global, id.clone(), "a;".into());
        assert!(state.contains(&id));
        assert_eq!(state.get(Bucket::Global, &id).as_deref(), Some("a;"));
        assert_eq!(state.get(Bucket::Local, &id), None);
        assert_eq!(state.ids(Bucket::Global), [id]);
    }
}
