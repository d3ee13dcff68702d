//! In-memory archive for testing.

use crate::error::{ErrorKind, Result};
use crate::{Archive, Entry};
use std::collections::{HashMap, HashSet};

/// In-memory archive for testing.
///
/// Entries receive ids in insertion order, so tests control the order in
/// which the conversion pipeline sees them.
///
/// # Examples
///
/// ```
/// use zimdb_archive::{Archive, MockArchive};
///
/// let archive = MockArchive::default()
///     .with_redirect("A/Dog", "Dog", 1)
///     .with_content("A/Canine", "Canine", "<p>Canine</p>");
/// assert_eq!(archive.entry_count(), 2);
/// assert_eq!(archive.entry_by_path("A/Canine").unwrap().index, 1);
/// ```
#[derive(Default)]
pub struct MockArchive {
    entries: Vec<Entry>,
    content: HashMap<u32, Vec<u8>>,
    by_path: HashMap<String, u32>,
    unreadable: HashSet<u32>,
}

impl MockArchive {
    fn push(mut self, entry: Entry, content: Option<Vec<u8>>) -> Self {
        let index = entry.index;
        self.by_path.insert(entry.path.clone(), index);
        if let Some(content) = content {
            self.content.insert(index, content);
        }
        self.entries.push(entry);
        self
    }

    fn next_index(&self) -> u32 {
        u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
    }

    /// Add a content entry; the MIME type is left unset.
    pub fn with_content(self, path: &str, title: &str, content: impl Into<Vec<u8>>) -> Self {
        let entry = Entry::content(self.next_index(), path, title, None);
        self.push(entry, Some(content.into()))
    }

    /// Add a redirect pointing at the entry with id `target`.
    pub fn with_redirect(self, path: &str, title: &str, target: u32) -> Self {
        let entry = Entry::redirect(self.next_index(), path, title, target);
        self.push(entry, None)
    }

    /// Add an entry whose lookups by id always fail, as if it were corrupt.
    pub fn with_unreadable(mut self, path: &str) -> Self {
        let index = self.next_index();
        self.unreadable.insert(index);
        self.push(Entry::content(index, path, "", None), None)
    }
}

impl Archive for MockArchive {
    fn entry_count(&self) -> u32 {
        self.next_index()
    }

    fn entry_by_id(&self, id: u32) -> Result<Entry> {
        if self.unreadable.contains(&id) {
            exn::bail!(ErrorKind::CorruptEntry(id));
        }
        match self.entries.get(id as usize) {
            Some(entry) => Ok(entry.clone()),
            None => exn::bail!(ErrorKind::IdOutOfRange(id)),
        }
    }

    fn entry_by_path(&self, path: &str) -> Result<Entry> {
        match self.by_path.get(path) {
            Some(&id) => self.entry_by_id(id),
            None => exn::bail!(ErrorKind::NotFound(path.to_string())),
        }
    }

    fn content(&self, id: u32) -> Result<Vec<u8>> {
        let entry = self.entry_by_id(id)?;
        if entry.is_redirect() {
            exn::bail!(ErrorKind::NoContent(id));
        }
        match self.content.get(&id) {
            Some(bytes) => Ok(bytes.clone()),
            None => exn::bail!(ErrorKind::NoContent(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_insertion_order() {
        let archive = MockArchive::default()
            .with_content("A/Cat", "Cat", "<p>Cat</p>")
            .with_unreadable("A/Broken")
            .with_redirect("A/Kitty", "Kitty", 0);
        assert_eq!(archive.entry_by_path("A/Kitty").unwrap().redirect_target(), Some(0));
        assert_eq!(archive.content(0).unwrap(), b"<p>Cat</p>");
        assert!(matches!(*archive.entry_by_id(1).unwrap_err(), ErrorKind::CorruptEntry(1)));
        assert!(matches!(*archive.content(2).unwrap_err(), ErrorKind::NoContent(2)));
        assert!(matches!(*archive.entry_by_id(3).unwrap_err(), ErrorKind::IdOutOfRange(3)));
    }
}
