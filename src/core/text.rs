//! Line-oriented text table reading.
//!
//! The static region table, the cache miss table and the memory profile are all
//! newline-delimited rows of tab- or whitespace-separated fields. This module
//! splits such text into numbered rows and parses typed fields, reporting the
//! 1-based line number and the column name on failure.

use super::error::{PlanError, PlanResult};
use std::path::Path;
use std::str::FromStr;

/// How the fields of a row are separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldSplit {
    /// Fields separated by single tabs; each field is trimmed, so names may contain spaces.
    Tabs,
    /// Fields separated by runs of whitespace.
    Whitespace,
    /// Tabs when the row contains a tab, whitespace otherwise.
    #[default]
    Auto,
}

/// One non-blank row of a text table.
#[derive(Debug, Clone)]
pub struct TextLine<'a> {
    /// 1-based line number in the source text.
    pub number: usize,
    fields: Vec<&'a str>,
}

impl<'a> TextLine<'a> {
    fn split(number: usize, line: &'a str, split: FieldSplit) -> Self {
        let use_tabs = match split {
            FieldSplit::Tabs => true,
            FieldSplit::Whitespace => false,
            FieldSplit::Auto => line.contains('\t'),
        };

        let fields = if use_tabs {
            line.split('\t').map(str::trim).collect()
        } else {
            line.split_whitespace().collect()
        };

        Self { number, fields }
    }

    /// Number of fields in this row.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fail unless the row has at least `count` fields.
    pub fn expect_fields(&self, count: usize) -> PlanResult<()> {
        if self.fields.len() < count {
            return Err(PlanError::parse(
                self.number,
                format!("expected {} fields but found {}", count, self.fields.len()),
            ));
        }
        Ok(())
    }

    /// Raw text of field `index`.
    pub fn field(&self, index: usize, name: &str) -> PlanResult<&'a str> {
        self.fields
            .get(index)
            .copied()
            .ok_or_else(|| PlanError::parse(self.number, format!("missing field '{name}'")))
    }

    /// Parse field `index` into `T`.
    pub fn parse<T>(&self, index: usize, name: &str) -> PlanResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.field(index, name)?;
        raw.parse::<T>().map_err(|e| {
            PlanError::parse(self.number, format!("invalid {name} '{raw}': {e}"))
        })
    }
}

/// Split `text` into non-blank rows.
pub fn rows(text: &str, split: FieldSplit) -> impl Iterator<Item = TextLine<'_>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(move |(idx, line)| TextLine::split(idx + 1, line, split))
}

/// Read a whole text file, attaching the path to I/O failures.
pub fn read_text(path: &Path) -> PlanResult<String> {
    std::fs::read_to_string(path).map_err(|e| PlanError::io(path, e))
}
