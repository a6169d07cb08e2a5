//! Locating the folder the external library produced for a comic
//!
//! The library names album folders according to its version and the configured
//! naming rule: bare id, `ID_Title`, `[ID]Title`, `Title - ID`, or just the title.
//! The resolver survives that variance with an ordered table of match rules:
//!
//! 1. [`MatchTier::Exact`] - `base_dir/<id>` is a directory
//! 2. [`MatchTier::Boundary`] - the id sits at a decorated edge of the name
//! 3. [`MatchTier::Token`] - the id appears as a standalone token anywhere
//!
//! Inside a tier the most recently modified folder wins, then the smallest name.

use crate::types::ComicId;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// How well a folder name matches an identifier (lower is better)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// `base_dir/<id>` itself
    Exact,
    /// `id`, `id_*`, `*_id`, `[id]*`, `* - id`
    Boundary,
    /// `id` delimited by non-alphanumeric characters
    Token,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTier::Exact => f.write_str("exact"),
            MatchTier::Boundary => f.write_str("boundary"),
            MatchTier::Token => f.write_str("token"),
        }
    }
}

/// One named predicate over (folder name, id)
struct MatchRule {
    tier: MatchTier,
    name: &'static str,
    matches: fn(&str, &str) -> bool,
}

/// Rules in priority order; the first rule that matches decides the tier
const RULES: &[MatchRule] = &[
    MatchRule {
        tier: MatchTier::Boundary,
        name: "equals",
        matches: |name, id| name == id,
    },
    MatchRule {
        tier: MatchTier::Boundary,
        name: "id_prefix",
        matches: |name, id| {
            name.strip_prefix(id)
                .is_some_and(|rest| rest.starts_with('_'))
        },
    },
    MatchRule {
        tier: MatchTier::Boundary,
        name: "id_suffix",
        matches: |name, id| {
            name.strip_suffix(id)
                .is_some_and(|rest| rest.ends_with('_'))
        },
    },
    MatchRule {
        tier: MatchTier::Boundary,
        name: "bracket_prefix",
        matches: |name, id| {
            name.strip_prefix('[')
                .and_then(|rest| rest.strip_prefix(id))
                .is_some_and(|rest| rest.starts_with(']'))
        },
    },
    MatchRule {
        tier: MatchTier::Boundary,
        name: "dash_suffix",
        matches: |name, id| {
            name.strip_suffix(id)
                .is_some_and(|rest| rest.ends_with(" - "))
        },
    },
    MatchRule {
        tier: MatchTier::Token,
        name: "token",
        matches: contains_token,
    },
];

/// True if `id` occurs in `name` with no alphanumeric character directly on either side
fn contains_token(name: &str, id: &str) -> bool {
    if id.is_empty() {
        return false;
    }
    name.match_indices(id).any(|(start, _)| {
        let before = name[..start].chars().next_back();
        let after = name[start + id.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Diagnostic view of one child folder
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FolderMatch {
    /// Folder name
    pub name: String,
    /// Tier it matched, if any
    pub tier: Option<MatchTier>,
    /// Name of the rule that matched, if any
    pub rule: Option<&'static str>,
}

/// Maps a comic identifier to the folder the download produced
pub struct FolderResolver;

impl FolderResolver {
    /// Find the folder for `id` directly under `base_dir`
    ///
    /// Returns `None` when nothing matches or `base_dir` cannot be read. Absence is
    /// an expected outcome (the download failed silently or used a title-only name).
    pub fn resolve(id: &ComicId, base_dir: &Path) -> Option<PathBuf> {
        let exact = base_dir.join(id.as_str());
        if exact.is_dir() {
            debug!(comic_id = %id, folder = ?exact, "resolved by exact name");
            return Some(exact);
        }

        let entries = match std::fs::read_dir(base_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(comic_id = %id, ?base_dir, error = %e, "cannot read download directory");
                return None;
            }
        };

        let mut best: Option<(MatchTier, std::cmp::Reverse<SystemTime>, String, PathBuf)> = None;

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some((tier, rule)) = Self::classify_with_rule(&name, id.as_str()) else {
                continue;
            };

            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            debug!(comic_id = %id, folder = %name, %tier, rule, "candidate folder");

            let candidate = (tier, std::cmp::Reverse(modified), name, path);
            let better = match &best {
                None => true,
                Some(current) => (&candidate.0, &candidate.1, &candidate.2)
                    < (&current.0, &current.1, &current.2),
            };
            if better {
                best = Some(candidate);
            }
        }

        match best {
            Some((tier, _, name, path)) => {
                debug!(comic_id = %id, folder = %name, %tier, "resolved folder");
                Some(path)
            }
            None => {
                debug!(comic_id = %id, ?base_dir, "no folder matched");
                None
            }
        }
    }

    /// Tier a folder name would match for `id`, ignoring the exact-path check
    pub fn classify(name: &str, id: &str) -> Option<MatchTier> {
        Self::classify_with_rule(name, id).map(|(tier, _)| tier)
    }

    fn classify_with_rule(name: &str, id: &str) -> Option<(MatchTier, &'static str)> {
        RULES
            .iter()
            .find(|rule| (rule.matches)(name, id))
            .map(|rule| (rule.tier, rule.name))
    }

    /// Classify every child folder of `base_dir`, sorted by name
    pub fn diagnose(id: &ComicId, base_dir: &Path) -> std::io::Result<Vec<FolderMatch>> {
        let mut matches = Vec::new();
        for entry in std::fs::read_dir(base_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let classified = Self::classify_with_rule(&name, id.as_str());
            let tier = if name == id.as_str() {
                Some(MatchTier::Exact)
            } else {
                classified.map(|(tier, _)| tier)
            };
            matches.push(FolderMatch {
                tier,
                rule: classified.map(|(_, rule)| rule),
                name,
            });
        }
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matches)
    }
}
