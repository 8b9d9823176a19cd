use openpenpal_models::opcode::OpCode;
use std::collections::HashSet;

/// A courier's managed prefix matches a code iff it is a string-prefix of
/// the code (spec §4.4). The empty prefix (`L4`, city-wide) matches every
/// code.
pub fn prefix_matches(prefix: &str, code: &OpCode) -> bool {
    code.as_str().starts_with(prefix)
}

/// Central permission rule: a courier may operate on `code` iff any of its
/// managed prefixes matches it.
pub fn courier_can_operate(managed_prefixes: &HashSet<String>, code: &OpCode) -> bool {
    managed_prefixes.iter().any(|prefix| prefix_matches(prefix, code))
}

/// `child` is a strict refinement of `parent` iff it extends `parent` with
/// at least one more character (spec §4.4 hierarchy integrity).
pub fn is_strict_refinement(child_prefix: &str, parent_prefix: &str) -> bool {
    child_prefix.starts_with(parent_prefix) && child_prefix.len() > parent_prefix.len()
}

/// Validates that every prefix a child courier would manage strictly
/// refines at least one of the parent's prefixes. A parent with no
/// prefixes at all refines nothing — reject everything under it.
pub fn child_prefixes_are_valid(child_prefixes: &HashSet<String>, parent_prefixes: &HashSet<String>) -> bool {
    if parent_prefixes.is_empty() {
        return child_prefixes.is_empty();
    }
    child_prefixes
        .iter()
        .all(|child| parent_prefixes.iter().any(|parent| is_strict_refinement(child, parent)))
}

/// On reassigning prefixes to a courier that already has children, none of
/// the existing children's prefixes may become orphaned by the change.
pub fn reassignment_preserves_children(
    new_prefixes: &HashSet<String>,
    children_prefixes: &[HashSet<String>],
) -> bool {
    children_prefixes.iter().all(|child| child_prefixes_are_valid(child, new_prefixes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> OpCode {
        OpCode::parse(s).unwrap()
    }

    #[test]
    fn empty_prefix_matches_every_code() {
        let mut prefixes = HashSet::new();
        prefixes.insert(String::new());
        assert!(courier_can_operate(&prefixes, &code("BJDX01")));
    }

    #[test]
    fn l3_prefix_matches_same_school_only() {
        let mut prefixes = HashSet::new();
        prefixes.insert("BJ".to_string());
        assert!(courier_can_operate(&prefixes, &code("BJDX01")));
        assert!(!courier_can_operate(&prefixes, &code("SHDX01")));
    }

    #[test]
    fn strict_refinement_requires_longer_prefix() {
        assert!(is_strict_refinement("BJDX01", "BJDX"));
        assert!(is_strict_refinement("BJDX", "BJ"));
        assert!(!is_strict_refinement("BJ", "BJ"));
        assert!(!is_strict_refinement("SH", "BJ"));
    }

    #[test]
    fn child_prefixes_rejected_when_not_refining_parent() {
        let mut parent = HashSet::new();
        parent.insert("BJ".to_string());
        let mut child = HashSet::new();
        child.insert("SHDX".to_string());
        assert!(!child_prefixes_are_valid(&child, &parent));
    }

    #[test]
    fn reassignment_rejected_when_it_orphans_a_child() {
        let mut new_prefixes = HashSet::new();
        new_prefixes.insert("SH".to_string());
        let mut child = HashSet::new();
        child.insert("BJDX".to_string());
        assert!(!reassignment_preserves_children(&new_prefixes, &[child]));
    }
}
