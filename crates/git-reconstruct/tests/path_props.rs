//! Accepted paths always stay below the output root.

use std::path::Component;

use bstr::BStr;
use git_reconstruct::safe_relative_path;
use proptest::prelude::*;

fn component() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("..".to_string()),
        Just(".".to_string()),
        Just(String::new()),
        Just(".git".to_string()),
        Just(".GiT".to_string()),
        "[a-zA-Z0-9._-]{1,12}",
    ]
}

proptest! {
    #[test]
    fn accepted_paths_are_contained(
        parts in proptest::collection::vec(component(), 1..8),
        absolute in any::<bool>(),
    ) {
        let mut raw = parts.join("/");
        if absolute {
            raw.insert(0, '/');
        }
        if let Some(path) = safe_relative_path(BStr::new(&raw)) {
            for c in path.components() {
                prop_assert!(matches!(c, Component::Normal(_)), "{raw:?} -> {path:?}");
                let name = c.as_os_str().to_string_lossy().to_ascii_lowercase();
                prop_assert_ne!(name, ".git");
            }
            prop_assert_eq!(path.components().count(), parts.len());
        }
    }

    #[test]
    fn plain_names_are_accepted(parts in proptest::collection::vec("[a-z][a-z0-9_]{0,10}", 1..6)) {
        let raw = parts.join("/");
        prop_assert!(safe_relative_path(BStr::new(&raw)).is_some());
    }
}
