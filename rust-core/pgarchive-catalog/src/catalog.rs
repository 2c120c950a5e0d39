// SPDX-License-Identifier: PMPL-1.0-or-later
//! Ordered collection of backup records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::backup::BackupRecord;

/// Backups in the order they were added. Duplicates are not detected here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupCatalog {
    backups: Vec<BackupRecord>,
}

impl BackupCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, backup: BackupRecord) {
        self.backups.push(backup);
    }

    pub fn len(&self) -> usize {
        self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BackupRecord> {
        self.backups.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, BackupRecord> {
        self.backups.iter_mut()
    }

    /// First backup whose id equals `id`.
    pub fn find(&self, id: &str) -> Option<&BackupRecord> {
        self.backups
            .iter()
            .find(|backup| backup.id().is_some_and(|own| own == id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut BackupRecord> {
        self.backups
            .iter_mut()
            .find(|backup| backup.id().is_some_and(|own| own == id))
    }

    /// The backup with the newest id. Among equal ids the one added first
    /// wins; records without an id are ignored.
    pub fn latest(&self) -> Option<&BackupRecord> {
        self.select(|candidate, best| candidate > best)
    }

    /// The backup with the oldest id. Among equal ids the one added first
    /// wins; records without an id are ignored.
    pub fn oldest(&self) -> Option<&BackupRecord> {
        self.select(|candidate, best| candidate < best)
    }

    fn select(
        &self,
        replaces: impl Fn(NaiveDateTime, NaiveDateTime) -> bool,
    ) -> Option<&BackupRecord> {
        let mut best: Option<(&BackupRecord, NaiveDateTime)> = None;
        for backup in &self.backups {
            let Some(id) = backup.id() else {
                continue;
            };
            let taken = id.timestamp();
            match best {
                Some((_, best_taken)) if !replaces(taken, best_taken) => {}
                _ => best = Some((backup, taken)),
            }
        }
        best.map(|(backup, _)| backup)
    }
}

impl From<Vec<BackupRecord>> for BackupCatalog {
    fn from(backups: Vec<BackupRecord>) -> Self {
        Self { backups }
    }
}

impl FromIterator<BackupRecord> for BackupCatalog {
    fn from_iter<I: IntoIterator<Item = BackupRecord>>(iter: I) -> Self {
        Self {
            backups: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for BackupCatalog {
    type Item = BackupRecord;
    type IntoIter = std::vec::IntoIter<BackupRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.backups.into_iter()
    }
}

impl<'a> IntoIterator for &'a BackupCatalog {
    type Item = &'a BackupRecord;
    type IntoIter = std::slice::Iter<'a, BackupRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.backups.iter()
    }
}
