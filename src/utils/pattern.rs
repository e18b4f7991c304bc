// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 seqc contributors

//! Wildcard matching for dataset paths and `waitfor` patterns
//!
//! Only `*` is special. It matches any run of characters, including an
//! empty one. Matching is anchored at both ends.

/// Check whether `text` matches `pattern`
pub fn matches(text: &str, pattern: &str) -> bool {
    let fragments: Vec<&str> = pattern.split('*').collect();
    if fragments.len() == 1 {
        return text == pattern;
    }

    let first = fragments[0];
    let last = fragments[fragments.len() - 1];

    // Prefix and suffix may not overlap
    if text.len() < first.len() + last.len() {
        return false;
    }
    if !text.starts_with(first) || !text.ends_with(last) {
        return false;
    }

    let mut rest = &text[first.len()..text.len() - last.len()];
    for fragment in &fragments[1..fragments.len() - 1] {
        if fragment.is_empty() {
            continue;
        }
        match rest.find(fragment) {
            Some(pos) => rest = &rest[pos + fragment.len()..],
            None => return false,
        }
    }

    true
}

/// Whether a path segment contains a wildcard
pub fn is_pattern(segment: &str) -> bool {
    segment.contains('*')
}

/// Two path segments denote the same selection when they are equal or one
/// pattern covers the other
pub fn segments_agree(a: &str, b: &str) -> bool {
    a == b || matches(a, b) || matches(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern() {
        assert!(matches("run1", "run1"));
        assert!(!matches("run1", "run2"));
        assert!(!matches("run10", "run1"));
        assert!(matches("", ""));
    }

    #[test]
    fn test_star_alone() {
        assert!(matches("", "*"));
        assert!(matches("anything", "*"));
        assert!(matches("anything", "**"));
    }

    #[test]
    fn test_prefix_and_suffix_are_anchored() {
        assert!(matches("run1", "run*"));
        assert!(matches("run", "run*"));
        assert!(!matches("xrun1", "run*"));
        assert!(matches("scan.img", "*.img"));
        assert!(!matches("scan.img.gz", "*.img"));
    }

    #[test]
    fn test_prefix_and_suffix_cannot_overlap() {
        assert!(!matches("aba", "ab*ba"));
        assert!(matches("abba", "ab*ba"));
    }

    #[test]
    fn test_interior_fragments_in_order() {
        assert!(matches("s01_run2_final", "s*run*final"));
        assert!(matches("abcXdefYghi", "abc*def*ghi"));
        assert!(!matches("abcYghiXdef", "abc*def*ghi"));
        assert!(!matches("aXb", "a*c*b"));
    }

    #[test]
    fn test_segments_agree() {
        assert!(segments_agree("*", "s1"));
        assert!(segments_agree("s1", "*"));
        assert!(segments_agree("run*", "run*"));
        assert!(!segments_agree("s1", "s2"));
    }
}
