//! Per-entity ranking policy.
//!
//! Entity types disagree on how ranks are stored: some persist a zero-based
//! `display_order`, others a one-based `attraction_rank`. The policy makes
//! that explicit so the diff engine never hard-codes either convention.

use serde::{Deserialize, Serialize};

/// How an in-page index maps to a persisted rank value.
///
/// `rank = page_base_offset + index (+1 if one_based)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingPolicy {
    /// Name of the persisted rank field.
    pub field_name: String,

    /// Whether the first slot is rank 1 instead of 0.
    pub one_based: bool,

    /// Whether ranks continue across pages (`(page - 1) * page_size`)
    /// or restart at every page.
    pub offset_by_page: bool,
}

impl RankingPolicy {
    /// Zero-based policy over the given field.
    pub fn zero_based(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            one_based: false,
            offset_by_page: true,
        }
    }

    /// One-based policy over the given field.
    pub fn one_based(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            one_based: true,
            offset_by_page: true,
        }
    }

    /// Restart ranks at every page.
    pub fn without_page_offset(mut self) -> Self {
        self.offset_by_page = false;
        self
    }

    /// Rank offset contributed by the page a slot lives on.
    ///
    /// `page_number` is 1-based; page 0 is treated as page 1.
    pub fn page_base_offset(&self, page_number: u32, page_size: u32) -> i64 {
        if !self.offset_by_page {
            return 0;
        }
        i64::from(page_number.saturating_sub(1)) * i64::from(page_size)
    }

    /// Rank for a zero-based index on a page starting at `page_base_offset`.
    pub fn rank_for(&self, page_base_offset: i64, index: usize) -> i64 {
        page_base_offset + index as i64 + i64::from(self.one_based)
    }
}

/// Content types whose admin lists support drag ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Tourism regions.
    Region,

    /// Photo galleries.
    PhotoCollection,

    /// Activities and attractions.
    Activity,
}

impl EntityKind {
    /// All rankable kinds.
    pub const ALL: [EntityKind; 3] = [Self::Region, Self::PhotoCollection, Self::Activity];

    /// Collection path segment in the CMS API.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Region => "regions",
            Self::PhotoCollection => "photo-collections",
            Self::Activity => "activities",
        }
    }

    /// Ranking policy the CMS applies to this kind.
    pub fn policy(&self) -> RankingPolicy {
        match self {
            Self::Region | Self::PhotoCollection => RankingPolicy::zero_based("display_order"),
            Self::Activity => RankingPolicy::one_based("attraction_rank"),
        }
    }

    /// Parse a collection name or kind name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "region" | "regions" => Some(Self::Region),
            "photo_collection" | "photo-collection" | "photo-collections" | "photos" => {
                Some(Self::PhotoCollection)
            }
            "activity" | "activities" => Some(Self::Activity),
            _ => None,
        }
    }
}
