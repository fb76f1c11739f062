//! Persist directory: persist object id → offset in the `PowerPoint Document`
//! stream.
//!
//! The `Current User` stream points at the newest `UserEditAtom`; each edit
//! names its `PersistDirectoryAtom` and the previous edit. Walking the chain
//! from newest to oldest, the first offset seen for an id wins.
use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::common::binary::read_u32_le;
use crate::ole::ppt::records::{Record, record_type};

#[derive(Debug, Clone, Default)]
pub struct PersistDirectory {
    offsets: HashMap<u32, u32>,
    document_persist_id: u32,
}

impl PersistDirectory {
    /// Build the directory, or `None` when the edit chain cannot be followed.
    pub fn load(current_user: &[u8], document: &[u8]) -> Option<Self> {
        let user = Record::parse(current_user, 0).ok()?;
        if user.rec_type() != record_type::CURRENT_USER_ATOM {
            return None;
        }
        let mut edit_offset = read_u32_le(user.body, 8).ok()?;

        let mut directory = Self::default();
        let mut seen = HashSet::new();
        let mut newest = true;
        while seen.insert(edit_offset) {
            let edit = Record::parse(document, edit_offset as usize).ok()?;
            if edit.rec_type() != record_type::USER_EDIT_ATOM {
                debug!(offset = edit_offset, "edit chain points at a non-UserEditAtom");
                return None;
            }
            let last_edit = read_u32_le(edit.body, 8).ok()?;
            let persist_offset = read_u32_le(edit.body, 12).ok()?;
            if newest {
                directory.document_persist_id = read_u32_le(edit.body, 16).ok()?;
                newest = false;
            }
            directory.merge(document, persist_offset as usize);
            if last_edit == 0 {
                break;
            }
            edit_offset = last_edit;
        }
        Some(directory)
    }

    fn merge(&mut self, document: &[u8], offset: usize) {
        let Ok(atom) = Record::parse(document, offset) else {
            return;
        };
        if atom.rec_type() != record_type::PERSIST_DIRECTORY_ATOM {
            return;
        }
        let mut words = atom
            .body
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]));
        while let Some(info) = words.next() {
            let first_id = info & 0x000F_FFFF;
            let count = info >> 20;
            for i in 0..count {
                let Some(target) = words.next() else {
                    return;
                };
                self.offsets.entry(first_id + i).or_insert(target);
            }
        }
    }

    #[inline]
    pub fn offset(&self, persist_id: u32) -> Option<u32> {
        self.offsets.get(&persist_id).copied()
    }

    /// Persist id of the `DocumentContainer` named by the newest edit.
    #[inline]
    pub fn document_persist_id(&self) -> u32 {
        self.document_persist_id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Builders for the edit chain in tests.
#[cfg(test)]
pub(crate) mod build {
    use crate::ole::ppt::records::build::atom;
    use crate::ole::ppt::records::record_type;

    pub fn persist_directory(first_id: u32, offsets: &[u32]) -> Vec<u8> {
        let mut body = (first_id | ((offsets.len() as u32) << 20)).to_le_bytes().to_vec();
        for offset in offsets {
            body.extend_from_slice(&offset.to_le_bytes());
        }
        atom(0, record_type::PERSIST_DIRECTORY_ATOM, &body)
    }

    pub fn user_edit(last_edit: u32, persist_directory: u32, document_persist_id: u32) -> Vec<u8> {
        let mut body = Vec::with_capacity(28);
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&[0, 0, 0, 3]);
        body.extend_from_slice(&last_edit.to_le_bytes());
        body.extend_from_slice(&persist_directory.to_le_bytes());
        body.extend_from_slice(&document_persist_id.to_le_bytes());
        body.extend_from_slice(&16u32.to_le_bytes());
        body.extend_from_slice(&[1, 0, 0, 0]);
        atom(0, record_type::USER_EDIT_ATOM, &body)
    }

    pub fn current_user(edit_offset: u32) -> Vec<u8> {
        let mut body = Vec::with_capacity(20);
        body.extend_from_slice(&0x14u32.to_le_bytes());
        body.extend_from_slice(&0xE391_C05Fu32.to_le_bytes());
        body.extend_from_slice(&edit_offset.to_le_bytes());
        body.extend_from_slice(&[0, 0, 0xF4, 0x03, 3, 0, 0, 0]);
        atom(0, record_type::CURRENT_USER_ATOM, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    #[test]
    fn test_newest_edit_wins() {
        // Older edit maps 1→0 and 2→100; newer edit remaps 2→200.
        let mut document = vec![0u8; 16];
        let old_dir = document.len() as u32;
        document.extend(persist_directory(1, &[0, 100]));
        let old_edit = document.len() as u32;
        document.extend(user_edit(0, old_dir, 1));
        let new_dir = document.len() as u32;
        document.extend(persist_directory(2, &[200]));
        let new_edit = document.len() as u32;
        document.extend(user_edit(old_edit, new_dir, 1));

        let directory = PersistDirectory::load(&current_user(new_edit), &document).unwrap();
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.offset(1), Some(0));
        assert_eq!(directory.offset(2), Some(200));
        assert_eq!(directory.offset(3), None);
        assert_eq!(directory.document_persist_id(), 1);
    }

    #[test]
    fn test_broken_chain() {
        let document = vec![0u8; 32];
        assert!(PersistDirectory::load(&current_user(8), &document).is_none());
        assert!(PersistDirectory::load(&[], &document).is_none());
    }

    #[test]
    fn test_cyclic_chain_terminates() {
        let mut document = persist_directory(1, &[0]);
        let edit = document.len() as u32;
        document.extend(user_edit(edit, 0, 1));
        let directory = PersistDirectory::load(&current_user(edit), &document).unwrap();
        assert_eq!(directory.offset(1), Some(0));
    }
}
