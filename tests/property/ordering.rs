//! Persisted list order does not depend on input order

use proptest::prelude::*;
use scriptdeploy::reconcile::{derive_state, AggregateState};
use scriptdeploy::tracked::{render_tracked, sort_tracked, TrackedFile};
use scriptdeploy::types::Flag;

fn tracked_file() -> impl Strategy<Value = TrackedFile> {
    (
        "[a-c]{1,2}\\.php",
        "[A-C]{1,2}",
        prop::sample::select(vec!["", "Scripts", "Scripts\\Helpers"]),
        0u64..4,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(filename, name, location, id, missing, outdated)| {
            let mut file = TrackedFile::new(&filename, &name, location);
            file.live_object_id = if id == 0 { 0 } else { 10000 + id };
            if missing {
                file.missing = Flag::Present;
            }
            if outdated {
                file.outdated = Flag::Present;
            }
            file
        })
}

proptest! {
    #[test]
    fn sort_is_independent_of_input_order(
        files in prop::collection::vec(tracked_file(), 0..12),
        seed in any::<u64>(),
    ) {
        let mut shuffled = files.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
        }

        let mut a = files;
        let mut b = shuffled;
        sort_tracked(&mut a);
        sort_tracked(&mut b);
        prop_assert_eq!(
            a.iter().map(|f| f.sort_key()).collect::<Vec<_>>(),
            b.iter().map(|f| f.sort_key()).collect::<Vec<_>>()
        );
        prop_assert!(render_tracked(&b).unwrap().ends_with('\n'));
    }

    #[test]
    fn state_is_synced_only_without_flags(files in prop::collection::vec(tracked_file(), 0..12)) {
        let any_flag = files.iter().any(|f| !f.set_flags().is_empty());
        let state = derive_state(&files);
        prop_assert_eq!(state == AggregateState::Synced, !any_flag);
        if files.iter().any(|f| f.missing.is_set()) {
            prop_assert_eq!(state, AggregateState::Unclear);
        }
    }
}
