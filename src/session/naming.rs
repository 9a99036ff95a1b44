//! Display-name utilities for channel lists
//!
//! Both derived names are memoized per content id for the life of the
//! process. The memo is never invalidated: a channel renamed by a later
//! refresh keeps its first normalized name and sort key until restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::LiveChannel;

/// Width every run of digits is left-padded to in a sort key
pub const SORT_KEY_DIGIT_WIDTH: usize = 10;

/// Strip diacritics: canonical decomposition, then drop combining marks
pub fn strip_diacritics(name: &str) -> String {
    name.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Key whose lexicographic order is the human "natural" order of names
///
/// Every maximal run of ASCII digits is zero-padded to
/// [`SORT_KEY_DIGIT_WIDTH`]; everything else is lower-cased.
pub fn natural_sort_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + SORT_KEY_DIGIT_WIDTH);
    let mut digits = String::new();

    for c in name.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if !digits.is_empty() {
            push_padded(&mut key, &digits);
            digits.clear();
        }
        key.extend(c.to_lowercase());
    }
    if !digits.is_empty() {
        push_padded(&mut key, &digits);
    }

    key
}

fn push_padded(key: &mut String, digits: &str) {
    for _ in digits.len()..SORT_KEY_DIGIT_WIDTH {
        key.push('0');
    }
    key.push_str(digits);
}

#[derive(Debug, Clone)]
struct DerivedNames {
    normalized: String,
    sort_key: String,
}

/// Per-content-id memo of derived names
#[derive(Debug, Default)]
pub struct NameCache {
    entries: Mutex<HashMap<i64, DerivedNames>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, DerivedNames>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn derived(&self, channel: &LiveChannel) -> DerivedNames {
        self.lock()
            .entry(channel.content_id)
            .or_insert_with(|| DerivedNames {
                normalized: strip_diacritics(&channel.name),
                sort_key: natural_sort_key(&channel.name),
            })
            .clone()
    }

    pub fn normalized_name(&self, channel: &LiveChannel) -> String {
        self.derived(channel).normalized
    }

    pub fn natural_sort_key(&self, channel: &LiveChannel) -> String {
        self.derived(channel).sort_key
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stable sort by natural key
    pub fn sort_naturally(&self, channels: &mut [LiveChannel]) {
        channels.sort_by_cached_key(|channel| self.natural_sort_key(channel));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::live_channel;

    #[test]
    fn test_strip_diacritics() {
        assert_eq!(strip_diacritics("Télé Música Ñandú"), "Tele Musica Nandu");
        assert_eq!(strip_diacritics("plain"), "plain");
    }

    #[test]
    fn test_natural_sort_key_pads_digit_runs() {
        assert_eq!(natural_sort_key("Channel 2"), "channel 0000000002");
        assert_eq!(natural_sort_key("HD1 x22"), "hd0000000001 x0000000022");
    }

    #[test]
    fn test_natural_order() {
        let mut names = vec!["Channel 2", "Channel 10", "Channel 1"];
        names.sort_by_key(|name| natural_sort_key(name));
        assert_eq!(names, vec!["Channel 1", "Channel 2", "Channel 10"]);
    }

    #[test]
    fn test_memo_keeps_first_name() {
        let cache = NameCache::new();
        let mut channel = live_channel(7, "Canal Él", "1");
        assert_eq!(cache.normalized_name(&channel), "Canal El");

        channel.name = "Renamed".to_string();
        assert_eq!(cache.normalized_name(&channel), "Canal El");
        assert_eq!(cache.natural_sort_key(&channel), "canal él");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sort_naturally_is_stable() {
        let cache = NameCache::new();
        let mut channels = vec![
            live_channel(3, "Channel 10", "1"),
            live_channel(1, "channel 2", "1"),
            live_channel(2, "Channel 2", "1"),
        ];
        cache.sort_naturally(&mut channels);
        let ids: Vec<i64> = channels.iter().map(|c| c.content_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
