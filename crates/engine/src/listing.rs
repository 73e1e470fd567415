//! Listing Engine
//!
//! Computes one ListObjectsV2 page from a catalog snapshot. Keys under the
//! prefix are walked in sorted order; with a delimiter, every key whose
//! remainder after the prefix contains it collapses into a common prefix.
//! Keys sharing a common prefix are contiguous in sorted order, so literal
//! keys and common prefixes come out merged in lexicographic order and a
//! common prefix is never split across pages.
//!
//! The continuation token is the last entry of the page, key or common
//! prefix. Resuming skips every entry at or before it.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use fs3_core::{ListOptions, ListPage};

use crate::catalog::StoredObject;

enum Entry<'a> {
    Key(&'a StoredObject),
    Prefix(&'a str),
}

impl Entry<'_> {
    fn as_str(&self) -> &str {
        match self {
            Entry::Key(object) => &object.info.key,
            Entry::Prefix(prefix) => prefix,
        }
    }
}

/// The common prefix `key` rolls up into, if any
fn common_prefix<'a>(key: &'a str, prefix: &str, delimiter: &str) -> Option<&'a str> {
    let rest = &key[prefix.len()..];
    rest.find(delimiter)
        .map(|pos| &key[..prefix.len() + pos + delimiter.len()])
}

/// Compute one page
///
/// `limit` is both the default and the maximum page size.
pub fn list_page(
    objects: &BTreeMap<String, Arc<StoredObject>>,
    options: &ListOptions,
    limit: usize,
) -> ListPage {
    let prefix = options.prefix.as_deref().unwrap_or("");
    let delimiter = options.delimiter.as_deref().filter(|d| !d.is_empty());
    let max_keys = options.max_keys.unwrap_or(limit).min(limit);
    let token = options.continuation_token.as_deref();
    let start_after = match token {
        Some(_) => None,
        None => options.start_after.as_deref(),
    };

    let mut page = ListPage::default();
    if max_keys == 0 {
        return page;
    }

    let start = [Some(prefix), token, start_after]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(prefix);

    let mut last_prefix: Option<&str> = None;
    let mut last_entry: Option<String> = None;
    let mut count = 0;

    for (key, object) in objects.range::<str, _>((Bound::Included(start), Bound::Unbounded)) {
        if !key.starts_with(prefix) {
            break;
        }
        if start_after.is_some_and(|after| key.as_str() <= after) {
            continue;
        }

        let entry = match delimiter.and_then(|d| common_prefix(key, prefix, d)) {
            Some(common) => {
                if last_prefix == Some(common) {
                    continue;
                }
                last_prefix = Some(common);
                Entry::Prefix(common)
            }
            None => Entry::Key(object.as_ref()),
        };

        if token.is_some_and(|token| entry.as_str() <= token) {
            continue;
        }

        if count == max_keys {
            page.is_truncated = true;
            break;
        }

        last_entry = Some(entry.as_str().to_string());
        match entry {
            Entry::Key(object) => page.objects.push(object.info.clone()),
            Entry::Prefix(common) => page.common_prefixes.push(common.to_string()),
        }
        count += 1;
    }

    if page.is_truncated {
        page.next_continuation_token = last_entry;
    }
    page.key_count = count;
    page
}
