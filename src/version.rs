//! "Latest tag" heuristic.
//!
//! Only a leading `vMAJOR.MINOR.PATCH` (the `v` is optional) is understood. Anything
//! after the patch number (pre-release, build metadata) is ignored, so this is not
//! semver precedence.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::Tag;

static VERSION_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn version_pattern() -> Option<&'static Regex> {
    VERSION_PATTERN
        .get_or_init(|| Regex::new(r"^[vV]?(\d+)\.(\d+)\.(\d+)").ok())
        .as_ref()
}

/// Leading `MAJOR.MINOR.PATCH`; anything after the patch number is ignored.
pub fn parse_version(name: &str) -> Option<(u64, u64, u64)> {
    let caps = version_pattern()?.captures(name)?;
    let number = |index: usize| caps.get(index)?.as_str().parse::<u64>().ok();
    Some((number(1)?, number(2)?, number(3)?))
}

fn compare(a: &Tag, b: &Tag) -> Ordering {
    match (parse_version(&a.name), parse_version(&b.name)) {
        (Some(left), Some(right)) => left.cmp(&right).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.name.cmp(&b.name),
    }
}

/// Highest version-looking tag, else the lexicographic maximum.
pub fn latest_tag(tags: &[Tag]) -> Option<&Tag> {
    tags.iter().max_by(|a, b| compare(a, b))
}

pub fn sort_newest_first(tags: &mut [Tag]) {
    tags.sort_by(|a, b| compare(b, a));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tag;

    #[test]
    fn parses_leading_triplet() {
        assert_eq!(parse_version("v1.2.3"), Some((1, 2, 3)));
        assert_eq!(parse_version("2.10.0"), Some((2, 10, 0)));
        assert_eq!(parse_version("v1.2.3-rc.1"), Some((1, 2, 3)));
        assert_eq!(parse_version("v1.2"), None);
        assert_eq!(parse_version("release-1.2.3"), None);
        assert_eq!(parse_version("v1.x.3"), None);
        assert_eq!(parse_version("V3.0.12+build.7"), Some((3, 0, 12)));
        assert_eq!(parse_version("v99999999999999999999.0.0"), None);
    }

    #[test]
    fn numeric_order_beats_lexicographic() {
        let tags = vec![tag("v1.9.0", "a"), tag("v1.10.0", "b"), tag("v1.2.0", "c")];
        assert_eq!(latest_tag(&tags).unwrap().name, "v1.10.0");
    }

    #[test]
    fn versioned_tags_win_over_free_form() {
        let tags = vec![tag("zeta", "a"), tag("v0.1.0", "b")];
        assert_eq!(latest_tag(&tags).unwrap().name, "v0.1.0");
    }

    #[test]
    fn free_form_tags_fall_back_to_lexicographic_max() {
        let tags = vec![tag("alpha", "a"), tag("nightly", "b"), tag("beta", "c")];
        assert_eq!(latest_tag(&tags).unwrap().name, "nightly");
        assert!(latest_tag(&[]).is_none());
    }

    #[test]
    fn sorting_puts_newest_first() {
        let mut tags = vec![
            tag("build-7", "a"),
            tag("v1.0.0", "b"),
            tag("v2.0.0", "c"),
            tag("v1.10.1", "d"),
        ];
        sort_newest_first(&mut tags);
        let names: Vec<&str> = tags.iter().map(|tag| tag.name.as_str()).collect();
        assert_eq!(names, vec!["v2.0.0", "v1.10.1", "v1.0.0", "build-7"]);
    }
}
