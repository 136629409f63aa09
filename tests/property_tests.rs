//! Property-based tests for the context stack and suppression matching

use proptest::prelude::*;
use rtsan::context;
use rtsan::suppression::{Pattern, SuppressionList};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_balanced_guards_restore_state(ops in prop::collection::vec(any::<bool>(), 0..32)) {
        // Property: any sequence of nested guards leaves the thread clean
        let before = context::current();
        {
            let mut realtime = Vec::new();
            let mut disabled = Vec::new();
            for enter_realtime in &ops {
                if *enter_realtime {
                    realtime.push(rtsan::ScopedRealtime::new());
                } else {
                    disabled.push(rtsan::ScopedDisabler::new());
                }
            }
            if cfg!(feature = "enabled") {
                let expect_active = !realtime.is_empty() && disabled.is_empty();
                prop_assert_eq!(context::is_active(), expect_active);
            }
        }
        prop_assert_eq!(context::current(), before);
        prop_assert!(!context::is_active());
    }

    #[test]
    fn prop_unbalanced_exits_never_underflow(exits in 0usize..16) {
        for _ in 0..exits {
            context::exit_constrained();
            context::exit_disabled();
        }
        prop_assert_eq!(context::realtime_depth(), 0);
        prop_assert_eq!(context::disabled_depth(), 0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_literal_pattern_matches_itself(text in "[a-z_:]{1,24}") {
        let pattern = Pattern::new(&text).unwrap();
        prop_assert!(pattern.matches_exact(&text));
        let nested = format!("crate::{}::inner", text);
        prop_assert!(pattern.matches_within(&nested));
    }

    #[test]
    fn prop_star_glob_matches_any_suffix(prefix in "[a-z]{1,8}", suffix in "[a-z:]{0,16}") {
        let pattern = Pattern::new(&format!("{}*", prefix)).unwrap();
        let candidate = format!("{}{}", prefix, suffix);
        prop_assert!(pattern.matches_exact(&candidate));
    }

    #[test]
    fn prop_regex_metacharacters_are_literal(text in "[a-z.+()\\[\\]{}|^$]{1,16}") {
        // Only `*` and `?` are wildcards; every other character matches itself
        let pattern = Pattern::new(&format!("{}*", text)).unwrap();
        let with_tail = format!("{}tail", text);
        let with_head = format!("x{}", text);
        prop_assert!(pattern.matches_exact(&with_tail));
        prop_assert!(!pattern.matches_exact(&with_head));
    }

    #[test]
    fn prop_suppression_parser_never_panics(text in "\\PC{0,200}") {
        let list = SuppressionList::parse(&text);
        prop_assert!(list.len() <= text.lines().count());
    }
}
