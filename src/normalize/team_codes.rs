//! Team name → three-letter display code.
//!
//! Upstream sources spell team names inconsistently ("Bayern München",
//! "FC Bayern Munich", "Bayern"). Names are matched against the competition
//! roster when one is available, otherwise a code is derived from the name
//! itself. Results are cached for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use crate::models::Team;

/// Maximum length of a team code.
pub const CODE_LEN: usize = 3;

/// Default similarity a scraped name must exceed to match a roster entry.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.6;

/// Append-only cache of resolved team codes.
///
/// Once a name has a code it keeps it, even if a later roster would resolve
/// it differently.
#[derive(Debug)]
pub struct TeamCodeCache {
    codes: RwLock<HashMap<String, String>>,
    threshold: f64,
}

impl Default for TeamCodeCache {
    fn default() -> Self {
        TeamCodeCache::new(DEFAULT_FUZZY_THRESHOLD)
    }
}

impl TeamCodeCache {
    pub fn new(threshold: f64) -> Self {
        TeamCodeCache {
            codes: RwLock::new(HashMap::new()),
            threshold,
        }
    }

    /// Code for `name`, matching it against `roster` on first sight.
    pub fn resolve(&self, name: &str, roster: &[Team]) -> String {
        if let Some(code) = self
            .codes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return code.clone();
        }

        let code = fuzzy_resolve(name, roster, self.threshold);
        debug!("Resolved team '{}' -> '{}'", name, code);

        let mut codes = self.codes.write().unwrap_or_else(PoisonError::into_inner);
        codes.entry(name.to_string()).or_insert(code).clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.codes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Code derived from the name alone: ASCII alphanumerics only, uppercased,
/// first three characters. Non-ASCII characters are dropped.
pub fn derive_code(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(CODE_LEN)
        .collect()
}

/// Code for a roster entry: explicit code, then short name, then full name.
pub fn team_code(team: &Team) -> String {
    [team.code.as_deref(), team.short_name.as_deref()]
        .into_iter()
        .flatten()
        .map(derive_code)
        .find(|c| !c.is_empty())
        .unwrap_or_else(|| derive_code(&team.name))
}

/// Match a free-text name against the roster.
///
/// The first team (in roster order) whose full or short name is more than
/// `threshold` similar wins. Falls back to [`derive_code`] on the name.
pub fn fuzzy_resolve(name: &str, roster: &[Team], threshold: f64) -> String {
    roster
        .iter()
        .find(|team| {
            similarity(name, &team.name) > threshold
                || team
                    .short_name
                    .as_deref()
                    .is_some_and(|short| similarity(name, short) > threshold)
        })
        .map(team_code)
        .unwrap_or_else(|| derive_code(name))
}

/// Ratcliff/Obershelp similarity: `2 * matches / (len(a) + len(b))`.
///
/// Returns 0.0 when either side is empty. The pair is ordered before
/// matching so `similarity(a, b) == similarity(b, a)`.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (a, b) = if a <= b { (a, b) } else { (b, a) };
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let matches = matching_chars(&a, &b);
    2.0 * matches as f64 / (a.len() + b.len()) as f64
}

/// Total length of the matching blocks: the longest common block, then
/// recursively whatever matches to its left and right.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, len) = longest_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + len..], &b[j + len..])
}

/// Longest common contiguous block as `(start_a, start_b, len)`.
/// Ties go to the block that starts earliest in `a`, then in `b`.
fn longest_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // run[j + 1] = length of the common run ending at a[i], b[j]
    let mut prev = vec![0usize; b.len() + 1];
    let mut run = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            run[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let len = run[j + 1];
            if len > best.2 {
                best = (i + 1 - len, j + 1 - len, len);
            }
        }
        std::mem::swap(&mut prev, &mut run);
    }
    best
}
