//! Unscoped-action registry.

use std::collections::BTreeSet;
use std::sync::OnceLock;

const UNSCOPED_ACTIONS: &str = include_str!("../data/unscoped_actions.txt");

static REGISTRY: OnceLock<BTreeSet<&'static str>> = OnceLock::new();

fn registry() -> &'static BTreeSet<&'static str> {
    REGISTRY.get_or_init(|| {
        let mut set = BTreeSet::new();
        for line in UNSCOPED_ACTIONS.lines() {
            let entry = line.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }
            assert!(
                entry.contains(':'),
                "malformed unscoped action entry '{entry}': expected service:ActionName"
            );
            set.insert(entry);
        }
        set
    })
}

/// True when `action` cannot be restricted to a specific resource and must
/// carry a wildcard resource target.
pub fn is_unscoped(action: &str) -> bool {
    registry().contains(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_not_empty() {
        assert!(!registry().is_empty());
    }

    #[test]
    fn bucket_location_is_unscoped() {
        assert!(is_unscoped("s3:GetBucketLocation"));
        assert!(is_unscoped("s3:ListAllMyBuckets"));
    }

    #[test]
    fn scopable_actions_are_not_registered() {
        assert!(!is_unscoped("s3:GetObject"));
        assert!(!is_unscoped("dynamodb:DeleteTable"));
        assert!(!is_unscoped("iam:CreateRole"));
    }

    #[test]
    fn lookup_is_exact() {
        assert!(!is_unscoped("s3:getbucketlocation"));
        assert!(!is_unscoped("GetBucketLocation"));
    }
}
