//! Seasonal content detection.
//!
//! Holiday songs are hidden outside their season unless the list they are
//! in has been exempted.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::PlaylistItem;

/// Seasonal filter settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalSettings {
    pub enabled: bool,
    /// Lists whose seasonal items are always shown
    pub bypass_lists: BTreeSet<String>,
}

impl SeasonalSettings {
    pub fn bypasses(&self, list_id: Option<&str>) -> bool {
        list_id.is_some_and(|id| self.bypass_lists.contains(id))
    }
}

/// A holiday an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeasonalCategory {
    Christmas,
    Halloween,
}

impl SeasonalCategory {
    const ALL: [SeasonalCategory; 2] = [SeasonalCategory::Christmas, SeasonalCategory::Halloween];

    fn keywords(self) -> &'static [&'static str] {
        match self {
            SeasonalCategory::Christmas => &[
                "christmas",
                "xmas",
                "navidad",
                "jingle bell",
                "santa claus",
                "sleigh ride",
                "silent night",
                "deck the halls",
                "let it snow",
                "rudolph",
                "mistletoe",
            ],
            SeasonalCategory::Halloween => &["halloween", "monster mash", "spooky scary"],
        }
    }

    /// Category of an item, judged from its title.
    pub fn of(item: &PlaylistItem) -> Option<Self> {
        let title = item.title.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.keywords().iter().any(|k| title.contains(k)))
    }

    /// Christmas runs Nov 15 to Jan 6, Halloween through Oct to Nov 1.
    pub fn in_season(self, today: NaiveDate) -> bool {
        let (month, day) = (today.month(), today.day());
        match self {
            SeasonalCategory::Christmas => {
                (month == 11 && day >= 15) || month == 12 || (month == 1 && day <= 6)
            }
            SeasonalCategory::Halloween => month == 10 || (month == 11 && day == 1),
        }
    }
}

impl fmt::Display for SeasonalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SeasonalCategory::Christmas => "christmas",
            SeasonalCategory::Halloween => "halloween",
        })
    }
}
