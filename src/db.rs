//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Key-value backend.
//!
//! The datastore consults its backend through the [`KvStore`] trait:
//! an ordered map from xml keys to optional values, scannable by
//! regular expression. Two implementations are provided, an in-memory
//! map and a write-through text file. Any sorted embedded store can be
//! plugged in instead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::trace;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;

use crate::error::{Error, ErrorKind, Result};

/// Characters escaped in the text file line format.
const LINE_ESCAPE: &AsciiSet = &CONTROLS.add(b'%').add(b'\t');

/// Contract between the datastore and its key-value backend.
pub trait KvStore {
    /// (Re)create an empty database.
    fn init(&mut self) -> Result<()>;

    /// Destroy the database and any backing storage.
    fn unlink(&mut self) -> Result<()>;

    /// Returns whether a key is present.
    fn exists(&self, key: &str) -> Result<bool>;

    /// Value stored under a key. The outer `Option` distinguishes an
    /// absent key from a key stored without a value.
    fn get(&self, key: &str) -> Result<Option<Option<String>>>;

    /// Store a key, with or without a value.
    fn set(&mut self, key: &str, value: Option<&str>) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn del(&mut self, key: &str) -> Result<()>;

    /// All pairs whose key matches the regular expression. The empty
    /// pattern matches every pair. Result ordering is unspecified.
    fn scan(&self, pattern: &str) -> Result<Vec<(String, Option<String>)>>;
}

fn scan_map(
    map: &BTreeMap<String, Option<String>>,
    pattern: &str,
) -> Result<Vec<(String, Option<String>)>> {
    let re = Regex::new(pattern).map_err(|err| {
        Error::msg(ErrorKind::KvScan, format!("bad scan pattern: {}", err))
    })?;
    Ok(map
        .iter()
        .filter(|(key, _)| re.is_match(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect())
}

/// An in-memory store.
#[derive(Debug, Default)]
pub struct MemStore {
    map: BTreeMap<String, Option<String>>,
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }
}

impl KvStore for MemStore {
    fn init(&mut self) -> Result<()> {
        self.map.clear();
        Ok(())
    }

    fn unlink(&mut self) -> Result<()> {
        self.map.clear();
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.map.contains_key(key))
    }

    fn get(&self, key: &str) -> Result<Option<Option<String>>> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        self.map.insert(key.to_owned(), value.map(str::to_owned));
        Ok(())
    }

    fn del(&mut self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    fn scan(&self, pattern: &str) -> Result<Vec<(String, Option<String>)>> {
        scan_map(&self.map, pattern)
    }
}

/// A write-through store backed by a text file, one percent-encoded
/// `key<TAB>value` line per pair.
///
/// The whole file is rewritten on every mutation, which is adequate for
/// configuration databases of moderate size.
#[derive(Debug)]
pub struct TextStore {
    path: PathBuf,
    map: BTreeMap<String, Option<String>>,
}

impl TextStore {
    /// Open a store, loading the backing file if it exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<TextStore> {
        let mut store = TextStore {
            path: path.as_ref().to_owned(),
            map: BTreeMap::new(),
        };
        if store.path.exists() {
            store.load()?;
        }
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) -> Result<()> {
        let text = std::fs::read_to_string(&self.path).map_err(|err| {
            Error::msg(ErrorKind::KvInit, err.to_string())
                .with_path(self.path.display().to_string())
        })?;
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            let (key, value) = match line.split_once('\t') {
                Some((key, value)) => (key, Some(value)),
                None => (line, None),
            };
            let key = decode(key, &self.path)?;
            let value = value.map(|value| decode(value, &self.path)).transpose()?;
            self.map.insert(key, value);
        }
        trace!("{}: loaded {} pairs", self.path.display(), self.map.len());
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut text = String::new();
        for (key, value) in &self.map {
            text.push_str(&utf8_percent_encode(key, LINE_ESCAPE).to_string());
            if let Some(value) = value {
                text.push('\t');
                text.push_str(&utf8_percent_encode(value, LINE_ESCAPE).to_string());
            }
            text.push('\n');
        }
        std::fs::write(&self.path, text).map_err(|err| {
            Error::msg(ErrorKind::KvWrite, err.to_string())
                .with_path(self.path.display().to_string())
        })
    }
}

fn decode(field: &str, path: &Path) -> Result<String> {
    percent_decode_str(field)
        .decode_utf8()
        .map(|value| value.into_owned())
        .map_err(|err| {
            Error::msg(ErrorKind::KvInit, format!("corrupt line: {}", err))
                .with_path(path.display().to_string())
        })
}

impl KvStore for TextStore {
    fn init(&mut self) -> Result<()> {
        self.map.clear();
        std::fs::write(&self.path, "").map_err(|err| {
            Error::msg(ErrorKind::KvInit, err.to_string())
                .with_path(self.path.display().to_string())
        })
    }

    fn unlink(&mut self) -> Result<()> {
        self.map.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::msg(ErrorKind::KvWrite, err.to_string())
                .with_path(self.path.display().to_string())),
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.map.contains_key(key))
    }

    fn get(&self, key: &str) -> Result<Option<Option<String>>> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        self.map.insert(key.to_owned(), value.map(str::to_owned));
        self.flush()
    }

    fn del(&mut self, key: &str) -> Result<()> {
        if self.map.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn scan(&self, pattern: &str) -> Result<Vec<(String, Option<String>)>> {
        scan_map(&self.map, pattern)
    }
}
