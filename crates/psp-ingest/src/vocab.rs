#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;

/// Append-only string interning table backing a dictionary column.
///
/// Codes are handed out in first-seen order and never reassigned.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    strings: Vec<Arc<str>>,
    codes: HashMap<Arc<str>, u32>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code for `s`, assigning the next sequential code on first sight.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(code) = self.codes.get(s) {
            return *code;
        }

        let code = self.strings.len() as u32;
        let s: Arc<str> = Arc::from(s);
        self.strings.push(s.clone());
        self.codes.insert(s, code);
        code
    }

    pub fn lookup(&self, s: &str) -> Option<u32> {
        self.codes.get(s).copied()
    }

    pub fn unintern(&self, code: u32) -> Option<&Arc<str>> {
        self.strings.get(code as usize)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Interned strings in code order.
    pub fn strings(&self) -> &[Arc<str>] {
        &self.strings
    }
}
