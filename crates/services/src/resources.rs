//! Flat resource files under the configured resources directory, parsed once
//! and cached until an explicit reload.
//!
//! Layout:
//! - `custom/<prefix>/content.html`
//! - `<prefix>/rules.txt`
//! - `news/news.txt`
//! - `res/custom_links.txt`, `res/friends.txt`, `res/lang_name_map.txt`, `res/ip_ban.txt`
//!
//! Locale-aware files prefer `<stem>_<locale>.<ext>` over `<stem>.<ext>`.
//! A missing file yields an empty value.

use crate::cache::SmallObjectCache;
use crate::ip_range::IpBanTable;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomLink {
    pub text: String,
    pub url: String,
    pub image_url: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Friend {
    pub url: String,
    pub name: String,
    pub title: Option<String>,
}

/// Splits a line on whitespace; double quotes group words and `\"` is a
/// literal quote. Returns `None` when a quote is left open.
pub fn split_command(line: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
                pending = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    parts.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if in_quotes {
        return None;
    }
    if pending {
        parts.push(current);
    }
    Some(parts)
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_custom_links(text: &str) -> Vec<CustomLink> {
    non_empty_lines(text)
        .iter()
        .filter_map(|line| split_command(line))
        .filter_map(|fields| {
            let mut it = fields.into_iter();
            let text = it.next().filter(|s| !s.is_empty())?;
            let url = it.next().filter(|s| !s.is_empty())?;
            Some(CustomLink { text, url, image_url: it.next(), target: it.next() })
        })
        .collect()
}

fn parse_friends(text: &str) -> Vec<Friend> {
    non_empty_lines(text)
        .iter()
        .filter_map(|line| split_command(line))
        .filter(|fields| (2..=3).contains(&fields.len()))
        .filter_map(|fields| {
            let mut it = fields.into_iter();
            let url = it.next().filter(|s| !s.is_empty())?;
            let name = it.next().filter(|s| !s.is_empty())?;
            Some(Friend { url, name, title: it.next() })
        })
        .collect()
}

fn parse_lang_names(text: &str) -> HashMap<String, String> {
    non_empty_lines(text)
        .iter()
        .filter_map(|line| {
            let (id, name) = line.split_once(' ')?;
            (!id.is_empty()).then(|| (id.to_string(), name.trim().to_string()))
        })
        .collect()
}

type LocaleKey = (String, String);

pub struct ResourceStore {
    root: PathBuf,
    custom_content: SmallObjectCache<LocaleKey, String>,
    rules: SmallObjectCache<LocaleKey, Vec<String>>,
    news: SmallObjectCache<String, Vec<String>>,
    custom_links: SmallObjectCache<String, Vec<CustomLink>>,
    friends: SmallObjectCache<(), Vec<Friend>>,
    lang_names: SmallObjectCache<(), HashMap<String, String>>,
    ip_bans: SmallObjectCache<(), IpBanTable>,
}

impl ResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            custom_content: SmallObjectCache::new(),
            rules: SmallObjectCache::new(),
            news: SmallObjectCache::new(),
            custom_links: SmallObjectCache::new(),
            friends: SmallObjectCache::new(),
            lang_names: SmallObjectCache::new(),
            ip_bans: SmallObjectCache::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<stem>_<locale>.<ext>` when it exists, else the plain file.
    pub fn locale_file(&self, relative: &str, locale: &str) -> PathBuf {
        let plain = self.root.join(relative);
        if locale.is_empty() {
            return plain;
        }
        let stem = plain.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let localized = match plain.extension().and_then(|e| e.to_str()) {
            Some(ext) => plain.with_file_name(format!("{stem}_{locale}.{ext}")),
            None => plain.with_file_name(format!("{stem}_{locale}")),
        };
        if localized.is_file() {
            localized
        } else {
            plain
        }
    }

    fn read(&self, path: &Path) -> String {
        match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read resource file");
                String::new()
            }
        }
    }

    pub fn custom_content(&self, prefix: &str, locale: &str) -> Arc<String> {
        self.custom_content
            .get_or_insert_with((prefix.to_string(), locale.to_string()), || {
                self.read(&self.locale_file(&format!("custom/{prefix}/content.html"), locale))
            })
    }

    pub fn rules(&self, prefix: &str, locale: &str) -> Arc<Vec<String>> {
        self.rules.get_or_insert_with((prefix.to_string(), locale.to_string()), || {
            non_empty_lines(&self.read(&self.locale_file(&format!("{prefix}/rules.txt"), locale)))
        })
    }

    pub fn news(&self, locale: &str) -> Arc<Vec<String>> {
        self.news.get_or_insert_with(locale.to_string(), || {
            non_empty_lines(&self.read(&self.locale_file("news/news.txt", locale)))
        })
    }

    pub fn custom_links(&self, locale: &str) -> Arc<Vec<CustomLink>> {
        self.custom_links.get_or_insert_with(locale.to_string(), || {
            parse_custom_links(&self.read(&self.locale_file("res/custom_links.txt", locale)))
        })
    }

    pub fn friends(&self) -> Arc<Vec<Friend>> {
        self.friends
            .get_or_insert_with((), || parse_friends(&self.read(&self.root.join("res/friends.txt"))))
    }

    /// Display name of a language id, if listed.
    pub fn lang_name(&self, id: &str) -> Option<String> {
        self.lang_names
            .get_or_insert_with((), || {
                parse_lang_names(&self.read(&self.root.join("res/lang_name_map.txt")))
            })
            .get(id)
            .cloned()
    }

    pub fn ip_ban_table(&self) -> Arc<IpBanTable> {
        self.ip_bans
            .get_or_insert_with((), || IpBanTable::parse(&self.read(&self.root.join("res/ip_ban.txt"))))
    }

    /// Drops every cached file; the next read goes to disk.
    pub fn clear(&self) {
        self.custom_content.clear();
        self.rules.clear();
        self.news.clear();
        self.custom_links.clear();
        self.friends.clear();
        self.lang_names.clear();
        self.ip_bans.clear();
        tracing::info!(root = %self.root.display(), "resource caches cleared");
    }
}
