//! Favorites record and the set operations applied to it.
//!
//! A visitor's favorites are stored remotely as a single document of the
//! shape `{"experiences": ["exp1", "exp2"]}`. Locally the list is always a
//! set: inserting an id twice keeps one copy, and removing an absent id is a
//! no-op. Backends apply a [`FavoritesPatch`] through these operations rather
//! than relying on a store-specific array primitive.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::id::{ExperienceId, VisitorId};

/// An ordered set of experience identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteSet(BTreeSet<ExperienceId>);

impl FavoriteSet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Whether `id` is in the set.
    #[must_use]
    pub fn contains(&self, id: &ExperienceId) -> bool {
        self.0.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExperienceId> {
        self.0.iter()
    }

    /// Set union with a single id. Returns `true` if the set changed.
    pub fn union_with(&mut self, id: ExperienceId) -> bool {
        self.0.insert(id)
    }

    /// Set difference with a single id. Returns `true` if the set changed.
    pub fn difference_with(&mut self, id: &ExperienceId) -> bool {
        self.0.remove(id)
    }

    /// Set union, returning a new set.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Set difference, returning a new set.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        Self(self.0.difference(&other.0).cloned().collect())
    }
}

impl FromIterator<ExperienceId> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = ExperienceId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FavoriteSet {
    type Item = &'a ExperienceId;
    type IntoIter = std::collections::btree_set::Iter<'a, ExperienceId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The persisted favorites document for one visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritesRecord {
    /// Favorited experiences. Missing in stored data means empty.
    #[serde(default)]
    pub experiences: FavoriteSet,
}

impl FavoritesRecord {
    /// A record holding exactly one experience.
    #[must_use]
    pub fn single(id: ExperienceId) -> Self {
        Self {
            experiences: std::iter::once(id).collect(),
        }
    }

    /// Apply a patch in place. Returns `true` if the record changed.
    pub fn apply(&mut self, patch: &FavoritesPatch) -> bool {
        match patch {
            FavoritesPatch::Add(id) => self.experiences.union_with(id.clone()),
            FavoritesPatch::Remove(id) => self.experiences.difference_with(id),
        }
    }
}

/// A single-id change to a favorites record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "id", rename_all = "snake_case")]
pub enum FavoritesPatch {
    /// Union the id into the set.
    Add(ExperienceId),
    /// Remove the id from the set.
    Remove(ExperienceId),
}

impl FavoritesPatch {
    /// The experience the patch refers to.
    #[must_use]
    pub const fn experience_id(&self) -> &ExperienceId {
        match self {
            Self::Add(id) | Self::Remove(id) => id,
        }
    }
}

/// Location of a visitor's favorites document in the store.
///
/// Always `artifacts/{app_id}/users/{visitor_id}/data/favorites`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Path of the favorites document for `visitor` under `app_id`.
    #[must_use]
    pub fn favorites(app_id: &str, visitor: &VisitorId) -> Self {
        Self(format!("artifacts/{app_id}/users/{visitor}/data/favorites"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, for URL building.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl std::fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
