//! Version tags, indexed once per calculation.

use std::collections::HashMap;

use semver::Version;
use tracing::{debug, instrument};

use crate::git::TagRef;

/// Versions recovered from tag names.
///
/// Names are kept with the prefix stripped (`v1.2.3` is indexed as
/// `1.2.3`). Tags that lack the prefix or whose remainder is not a SemVer
/// version are ignored.
#[derive(Debug, Clone, Default)]
pub struct TagMap {
    by_name: HashMap<String, Version>,
    by_commit: HashMap<String, Version>,
}

impl TagMap {
    /// Index `refs`, keeping tags named `<prefix><semver>`.
    #[instrument(skip(refs))]
    pub fn from_refs<I>(prefix: &str, refs: I) -> Self
    where
        I: IntoIterator<Item = TagRef>,
    {
        let mut map = Self::default();
        let mut skipped = 0usize;

        for tag in refs {
            let Some((name, version)) = parse_tag(prefix, &tag.name) else {
                skipped += 1;
                continue;
            };

            // A commit carrying several version tags reports the highest.
            map.by_commit
                .entry(tag.commit)
                .and_modify(|existing| {
                    if version > *existing {
                        *existing = version.clone();
                    }
                })
                .or_insert_with(|| version.clone());
            map.by_name.insert(name.to_string(), version);
        }

        debug!(versions = map.by_name.len(), skipped, "indexed tags");
        map
    }

    /// Version recorded under a tag name, given without the prefix.
    pub fn get(&self, name: &str) -> Option<&Version> {
        self.by_name.get(name)
    }

    /// Highest version tagged directly on `commit`.
    pub fn version_at(&self, commit: &str) -> Option<&Version> {
        self.by_commit.get(commit)
    }

    /// Version of the first tagged commit in `walk` (ordered nearest-first).
    pub fn latest_in<'a, I>(&self, walk: I) -> Option<&Version>
    where
        I: IntoIterator<Item = &'a str>,
    {
        walk.into_iter().find_map(|commit| self.version_at(commit))
    }

    /// Number of version tags indexed.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no version tags were found.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Split `<prefix><semver>` into the unprefixed name and its version.
fn parse_tag<'n>(prefix: &str, name: &'n str) -> Option<(&'n str, Version)> {
    let rest = name.strip_prefix(prefix)?;
    Version::parse(rest).ok().map(|version| (rest, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, commit: &str) -> TagRef {
        TagRef {
            name: name.to_string(),
            commit: commit.to_string(),
        }
    }

    #[test]
    fn ignores_foreign_and_unparsable_tags() {
        let map = TagMap::from_refs(
            "v",
            vec![
                tag("v1.2.3", "c1"),
                tag("release-2.0.0", "c2"),
                tag("vNext", "c3"),
                tag("v1.2", "c4"),
            ],
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("1.2.3"), Some(&Version::new(1, 2, 3)));
        assert!(map.get("v1.2.3").is_none());
        assert!(map.get("2.0.0").is_none());
        assert!(map.version_at("c4").is_none());
    }

    #[test]
    fn parse_tag_strips_prefix() {
        let (name, version) = parse_tag("release-", "release-2.0.0-rc.1").unwrap();
        assert_eq!(name, "2.0.0-rc.1");
        assert_eq!(version.to_string(), "2.0.0-rc.1");
        assert!(parse_tag("release-", "v2.0.0").is_none());
    }

    #[test]
    fn empty_prefix_accepts_bare_versions() {
        let map = TagMap::from_refs("", vec![tag("1.0.0", "c1"), tag("v2.0.0", "c2")]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.version_at("c1"), Some(&Version::new(1, 0, 0)));
    }

    #[test]
    fn highest_version_wins_per_commit() {
        let map = TagMap::from_refs(
            "v",
            vec![
                tag("v1.2.4-beta.3", "c1"),
                tag("v1.2.4", "c1"),
                tag("v1.2.3", "c1"),
            ],
        );
        assert_eq!(map.version_at("c1"), Some(&Version::new(1, 2, 4)));
    }

    #[test]
    fn latest_in_takes_nearest_tagged_commit() {
        let map = TagMap::from_refs("v", vec![tag("v1.0.0", "old"), tag("v1.1.0", "mid")]);
        let walk = ["head", "mid", "old"];
        assert_eq!(map.latest_in(walk), Some(&Version::new(1, 1, 0)));
        assert_eq!(map.latest_in(["head", "other"]), None);
    }

    #[test]
    fn prerelease_tags_are_kept() {
        let map = TagMap::from_refs("v", vec![tag("v1.2.4-beta", "d1")]);
        assert_eq!(
            map.version_at("d1").map(ToString::to_string).as_deref(),
            Some("1.2.4-beta")
        );
    }
}
