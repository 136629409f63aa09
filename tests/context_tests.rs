//! Context stack behaviour through the public API

#![cfg(feature = "enabled")]

use rtsan::context;
use rtsan::{Classification, ScopedDisabler, ScopedRealtime};

rtsan::nonblocking! {
    fn process_block(samples: &mut [f32]) -> usize {
        for sample in samples.iter_mut() {
            *sample = -*sample;
        }
        context::realtime_depth() as usize
    }

    fn early_exit(flag: bool) -> bool {
        if flag {
            return context::is_active();
        }
        false
    }

    fn panics_inside() {
        panic!("render failed");
    }
}

rtsan::blocking! {
    fn flush_to_disk() {}
}

struct Voice {
    gain: f32,
}

impl Voice {
    rtsan::nonblocking! {
        fn render(&self, out: &mut [f32]) -> bool {
            for sample in out.iter_mut() {
                *sample *= self.gain;
            }
            context::is_active()
        }
    }
}

#[test]
fn test_annotated_function_opens_region() {
    assert!(!context::is_active());
    let mut samples = [1.0_f32; 8];
    assert_eq!(process_block(&mut samples), 1);
    assert_eq!(samples[0], -1.0);
    assert!(!context::is_active());
}

#[test]
fn test_region_nests_under_guard() {
    let _outer = ScopedRealtime::new();
    let mut samples = [0.5_f32; 4];
    assert_eq!(process_block(&mut samples), 2);
    assert_eq!(context::realtime_depth(), 1);
    assert!(context::is_active());
}

#[test]
fn test_early_return_pops_region() {
    assert!(early_exit(true));
    assert!(!early_exit(false));
    assert_eq!(context::realtime_depth(), 0);
}

#[test]
fn test_method_annotation() {
    let voice = Voice { gain: 2.0 };
    let mut out = [1.5_f32; 2];
    assert!(voice.render(&mut out));
    assert_eq!(out, [3.0, 3.0]);
    assert!(!context::is_active());
}

#[test]
fn test_panic_unwinds_region() {
    let result = std::panic::catch_unwind(panics_inside);
    assert!(result.is_err());
    assert_eq!(context::realtime_depth(), 0);
    assert!(!context::is_active());
}

#[test]
fn test_disabler_suppresses_blocking_call() {
    let _rt = ScopedRealtime::new();
    {
        let _off = ScopedDisabler::new();
        assert!(!context::is_active());
        flush_to_disk();
    }
    assert!(context::is_active());
}

#[test]
fn test_disabler_covers_nested_region() {
    let _off = ScopedDisabler::new();
    let mut samples = [1.0_f32; 1];
    process_block(&mut samples);
    assert!(!context::is_active());
}

#[test]
fn test_blocking_call_outside_region_is_silent() {
    flush_to_disk();
}

#[test]
fn test_threads_do_not_share_context() {
    let _rt = ScopedRealtime::new();
    let depth = std::thread::spawn(context::realtime_depth).join().unwrap();
    assert_eq!(depth, 0);
    assert_eq!(context::realtime_depth(), 1);
}

#[test]
fn test_manual_entry_points_pair_up() {
    rtsan::realtime_enter();
    rtsan::realtime_enter();
    rtsan::realtime_exit();
    assert!(context::is_active());
    rtsan::disable();
    assert!(!context::is_active());
    rtsan::enable();
    rtsan::realtime_exit();
    assert!(!context::is_active());
}

#[test]
fn test_annotations_are_registered() {
    let registry = rtsan::runtime::get().registry();
    assert_eq!(
        registry.classify("context_tests::process_block"),
        Classification::Constrained
    );
    assert_eq!(
        registry.classify("context_tests::flush_to_disk"),
        Classification::Forbidden
    );
    assert_eq!(
        registry.classify("context_tests::not_annotated"),
        Classification::Unclassified
    );
}

#[test]
fn test_function_scope_uses_registry() {
    {
        let _scope = rtsan::function_scope("context_tests::process_block");
        assert!(context::is_active());
    }
    assert!(!context::is_active());

    let _scope = rtsan::function_scope("context_tests::not_annotated");
    assert!(!context::is_active());
}
