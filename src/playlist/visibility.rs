//! Per-item visibility: blacklist, per-list removals, seasonal filter and
//! duplicate detection.
//!
//! Classification never reorders anything. Duplicate detection is the only
//! order-sensitive rule: the first occurrence of a dedup key wins.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use super::seasonal::{SeasonalCategory, SeasonalSettings};
use super::{ItemId, PlaylistItem};

/// User filter settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilitySettings {
    /// Items hidden everywhere
    pub blacklist: BTreeSet<ItemId>,
    /// Items removed from one specific list, keyed by list id
    pub removed: BTreeMap<String, BTreeSet<ItemId>>,
    pub hide_duplicates: bool,
    /// Dedup on artist, featuring and title (keeps covers and live versions)
    /// instead of the title alone
    pub allow_different_versions: bool,
    pub seasonal: SeasonalSettings,
}

/// Why an item is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenReason {
    Blacklisted,
    RemovedFromList,
    OutOfSeason(SeasonalCategory),
    Duplicate,
}

impl fmt::Display for HiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HiddenReason::Blacklisted => f.write_str("blacklisted"),
            HiddenReason::RemovedFromList => f.write_str("removed from list"),
            HiddenReason::OutOfSeason(category) => write!(f, "{category} item out of season"),
            HiddenReason::Duplicate => f.write_str("duplicate"),
        }
    }
}

/// Classifies items for one list on one day.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityClassifier<'a> {
    settings: &'a VisibilitySettings,
    list_id: Option<&'a str>,
    today: NaiveDate,
}

impl<'a> VisibilityClassifier<'a> {
    pub fn new(settings: &'a VisibilitySettings, list_id: Option<&'a str>, today: NaiveDate) -> Self {
        Self {
            settings,
            list_id,
            today,
        }
    }

    /// Decide one item. `seen` holds the dedup keys of visible items earlier
    /// in this pass and is the only state touched.
    pub fn classify(&self, item: &PlaylistItem, seen: &mut HashSet<String>) -> Option<HiddenReason> {
        let s = self.settings;
        if s.blacklist.contains(&item.id) {
            return Some(HiddenReason::Blacklisted);
        }
        if self
            .list_id
            .and_then(|list| s.removed.get(list))
            .is_some_and(|removed| removed.contains(&item.id))
        {
            return Some(HiddenReason::RemovedFromList);
        }

        if s.seasonal.enabled
            && !s.seasonal.bypasses(self.list_id)
            && let Some(category) = SeasonalCategory::of(item)
            && !category.in_season(self.today)
        {
            return Some(HiddenReason::OutOfSeason(category));
        }

        if s.hide_duplicates {
            let key = self.dedup_key(item);
            // Nothing left after normalization: too little to call it a duplicate
            if !key.is_empty() && !seen.insert(key) {
                return Some(HiddenReason::Duplicate);
            }
        }
        None
    }

    /// Dedup key under the current settings.
    pub fn dedup_key(&self, item: &PlaylistItem) -> String {
        if self.settings.allow_different_versions {
            version_key(&item.artist, &item.title)
        } else {
            title_key(&item.title)
        }
    }

    /// Classify a whole list in order, setting `hidden` on every item.
    ///
    /// Returns the number of visible items.
    pub fn apply(&self, items: &mut [PlaylistItem]) -> usize {
        let mut seen = HashSet::new();
        let mut visible = 0;
        for item in items.iter_mut() {
            let reason = self.classify(item, &mut seen);
            if let Some(reason) = reason {
                tracing::trace!(target: "playlist::visibility", "Hiding {} ({})", item.id, reason);
            } else {
                visible += 1;
            }
            item.set_hidden(reason.is_some());
        }
        visible
    }
}

/// Title-only dedup key: parenthetical text dropped, lowercase,
/// alphanumerics only.
pub fn title_key(title: &str) -> String {
    normalize(&strip_parenthetical(title))
}

/// `artist|featuring|title` dedup key.
///
/// Featuring credits are collected from both strings. Other parenthetical
/// text (live, remix, ...) stays part of the title so versions differ.
pub fn version_key(artist: &str, title: &str) -> String {
    let artist = split_credits(artist);
    let title = split_credits(title);
    let mut featuring: Vec<String> = artist
        .featuring
        .iter()
        .chain(&title.featuring)
        .map(|name| normalize(name))
        .filter(|name| !name.is_empty())
        .collect();
    featuring.sort();
    featuring.dedup();
    let title_part = normalize(&title.main);
    if title_part.is_empty() {
        return String::new();
    }
    format!("{}|{}|{}", normalize(&artist.main), featuring.join(","), title_part)
}

fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn strip_parenthetical(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

struct Credits {
    main: String,
    featuring: Vec<String>,
}

const GROUP_MARKERS: [&str; 4] = ["featuring", "feat", "ft", "with"];
const INLINE_MARKERS: [&str; 5] = [" featuring ", " feat. ", " feat ", " ft. ", " ft "];

/// Pull featuring credits out of an artist or title string.
fn split_credits(text: &str) -> Credits {
    let text = text.to_lowercase();
    let mut main = String::with_capacity(text.len());
    let mut featuring = Vec::new();
    let mut group = String::new();
    let mut depth = 0usize;

    for ch in text.chars() {
        match ch {
            '(' | '[' => {
                if depth > 0 {
                    group.push(ch);
                }
                depth += 1;
            }
            ')' | ']' if depth > 0 => {
                depth -= 1;
                if depth > 0 {
                    group.push(ch);
                } else {
                    match group_credit(&group) {
                        Some(name) => featuring.push(name.to_string()),
                        None => {
                            main.push(' ');
                            main.push_str(&group);
                        }
                    }
                    group.clear();
                }
            }
            _ if depth > 0 => group.push(ch),
            _ => main.push(ch),
        }
    }
    // Unbalanced bracket: keep the text
    if depth > 0 {
        main.push(' ');
        main.push_str(&group);
    }

    let split_at = INLINE_MARKERS
        .iter()
        .filter_map(|marker| main.find(marker).map(|pos| (pos, marker.len())))
        .min();
    if let Some((pos, len)) = split_at {
        featuring.push(main[pos + len..].to_string());
        main.truncate(pos);
    }

    Credits { main, featuring }
}

/// `feat. X`, `ft X`, `featuring X`, `with X` inside a bracket group.
fn group_credit(group: &str) -> Option<&str> {
    let group = group.trim();
    GROUP_MARKERS.iter().find_map(|marker| {
        let rest = group.strip_prefix(marker)?;
        let rest = rest.strip_prefix('.').unwrap_or(rest);
        rest.starts_with(char::is_whitespace).then(|| rest.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
    }

    fn items(specs: &[(&str, &str, &str)]) -> Vec<PlaylistItem> {
        specs
            .iter()
            .map(|(id, title, artist)| PlaylistItem::new(*id, *title).by(*artist))
            .collect()
    }

    fn visible_ids(items: &[PlaylistItem]) -> Vec<&str> {
        items
            .iter()
            .filter(|i| !i.is_hidden())
            .map(|i| i.id.as_str())
            .collect()
    }

    #[test]
    fn test_title_key() {
        assert_eq!(title_key("Song Name (Official Video)"), "songname");
        assert_eq!(title_key("SONG-NAME [HD]"), "songname");
        assert_eq!(title_key("Café del Mar"), "cafédelmar");
        assert_eq!(title_key("(Intro)"), "");
    }

    #[test]
    fn test_version_key_extracts_featuring() {
        let a = version_key("Artist feat. Guest", "Song");
        let b = version_key("Artist", "Song (feat. Guest)");
        let c = version_key("Artist", "Song ft. Guest");
        assert_eq!(a, "artist|guest|song");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_version_key_keeps_versions_apart() {
        assert_ne!(version_key("Artist", "Song"), version_key("Artist", "Song (Live)"));
        assert_ne!(version_key("Artist", "Song"), version_key("Cover Band", "Song"));
        // "with" only counts as a credit inside brackets
        assert_eq!(version_key("A", "Dance with Me"), "a||dancewithme");
    }

    #[test]
    fn test_blacklist_hides() {
        let mut settings = VisibilitySettings::default();
        settings.blacklist.insert(ItemId::from("x"));
        let mut list = items(&[("x", "One", ""), ("y", "Two", "")]);
        let visible = VisibilityClassifier::new(&settings, None, today()).apply(&mut list);
        assert_eq!(visible, 1);
        assert!(list[0].is_hidden());
        assert!(!list[1].is_hidden());
    }

    #[test]
    fn test_per_list_removal() {
        let mut settings = VisibilitySettings::default();
        settings
            .removed
            .entry("mix".to_string())
            .or_default()
            .insert(ItemId::from("a"));
        let mut list = items(&[("a", "One", ""), ("b", "Two", "")]);
        VisibilityClassifier::new(&settings, Some("mix"), today()).apply(&mut list);
        assert_eq!(visible_ids(&list), vec!["b"]);

        VisibilityClassifier::new(&settings, Some("other"), today()).apply(&mut list);
        assert_eq!(visible_ids(&list), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicates_first_wins() {
        let settings = VisibilitySettings {
            hide_duplicates: true,
            ..VisibilitySettings::default()
        };
        let mut list = items(&[
            ("1", "Song (Official Video)", "A"),
            ("2", "Other", "B"),
            ("3", "song", "C"),
        ]);
        VisibilityClassifier::new(&settings, None, today()).apply(&mut list);
        assert_eq!(visible_ids(&list), vec!["1", "2"]);
    }

    #[test]
    fn test_allow_different_versions() {
        let settings = VisibilitySettings {
            hide_duplicates: true,
            allow_different_versions: true,
            ..VisibilitySettings::default()
        };
        let mut list = items(&[
            ("1", "Song", "A"),
            ("2", "Song", "B"),
            ("3", "Song (Official Audio)", "A"),
        ]);
        VisibilityClassifier::new(&settings, None, today()).apply(&mut list);
        // "(Official Audio)" is a version tag under this rule, so it stays visible
        assert_eq!(visible_ids(&list), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_seasonal_filter_and_bypass() {
        let mut settings = VisibilitySettings::default();
        settings.seasonal.enabled = true;
        let mut list = items(&[("1", "Last Christmas", "W"), ("2", "Summer", "X")]);

        VisibilityClassifier::new(&settings, Some("mix"), today()).apply(&mut list);
        assert_eq!(visible_ids(&list), vec!["2"]);

        let december = NaiveDate::from_ymd_opt(2026, 12, 20).unwrap();
        VisibilityClassifier::new(&settings, Some("mix"), december).apply(&mut list);
        assert_eq!(visible_ids(&list), vec!["1", "2"]);

        settings.seasonal.bypass_lists.insert("mix".to_string());
        VisibilityClassifier::new(&settings, Some("mix"), today()).apply(&mut list);
        assert_eq!(visible_ids(&list), vec!["1", "2"]);
    }

    #[test]
    fn test_hidden_items_do_not_claim_dedup_keys() {
        let mut settings = VisibilitySettings {
            hide_duplicates: true,
            ..VisibilitySettings::default()
        };
        settings.blacklist.insert(ItemId::from("1"));
        let mut list = items(&[("1", "Song", "A"), ("2", "Song", "B")]);
        VisibilityClassifier::new(&settings, None, today()).apply(&mut list);
        assert_eq!(visible_ids(&list), vec!["2"]);
    }
}

/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arbitrary_items() -> impl Strategy<Value = Vec<PlaylistItem>> {
        prop::collection::vec(("[a-c]{1,2}", "[A-Ca-c ()]{0,6}"), 0..20).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (title, artist))| PlaylistItem::new(format!("id{i}"), title).by(artist))
                .collect()
        })
    }

    fn settings() -> VisibilitySettings {
        let mut s = VisibilitySettings {
            hide_duplicates: true,
            ..VisibilitySettings::default()
        };
        s.blacklist.insert(ItemId::from("id3"));
        s
    }

    proptest! {
        /// Visible items keep their input order and nothing is dropped
        #[test]
        fn classification_preserves_order(mut list in arbitrary_items()) {
            let before: Vec<ItemId> = list.iter().map(|i| i.id.clone()).collect();
            let s = settings();
            VisibilityClassifier::new(&s, None, NaiveDate::MIN).apply(&mut list);
            let after: Vec<ItemId> = list.iter().map(|i| i.id.clone()).collect();
            prop_assert_eq!(before, after);
        }

        /// Classifying the same list twice gives the same answer
        #[test]
        fn classification_is_idempotent(mut list in arbitrary_items()) {
            let s = settings();
            let classifier = VisibilityClassifier::new(&s, None, NaiveDate::MIN);
            classifier.apply(&mut list);
            let first: Vec<bool> = list.iter().map(PlaylistItem::is_hidden).collect();
            classifier.apply(&mut list);
            let second: Vec<bool> = list.iter().map(PlaylistItem::is_hidden).collect();
            prop_assert_eq!(first, second);
        }

        /// Removing the first occurrence reveals the duplicate it hid
        #[test]
        fn removing_original_reveals_duplicate(title in "[a-z]{1,8}", suffix in "[ ()a-z]{0,6}") {
            let s = VisibilitySettings { hide_duplicates: true, ..VisibilitySettings::default() };
            let classifier = VisibilityClassifier::new(&s, None, NaiveDate::MIN);
            let mut list = vec![
                PlaylistItem::new("first", title.clone()),
                PlaylistItem::new("dup", format!("{title}{suffix}")),
            ];
            classifier.apply(&mut list);
            let dup_hidden = list[1].is_hidden();
            let mut without_first = vec![list[1].clone()];
            classifier.apply(&mut without_first);
            prop_assert!(!without_first[0].is_hidden());
            if title_key(&list[0].title) == title_key(&list[1].title) {
                prop_assert!(dup_hidden);
            }
        }
    }
}
