//! Annotation macros
//!
//! `nonblocking!` marks functions as entry points of a constrained region and
//! `blocking!` marks functions that must never run inside one. Each annotated
//! function is registered in the classification registry at link time and
//! gets a prologue, so calls through function pointers and trait objects are
//! covered the same as direct calls.
//!
//! The registered symbol is `module_path!()::name`. Methods in an `impl` block
//! do not include the type, so two `tick` methods in one module share a
//! symbol; give them distinct symbols with `as "..."` after the signature:
//!
//! ```
//! struct Voice;
//!
//! impl Voice {
//!     rtsan::nonblocking! {
//!         fn tick(&mut self) -> f32 as "synth::Voice::tick" {
//!             0.0
//!         }
//!     }
//! }
//! ```
//!
//! ```
//! rtsan::nonblocking! {
//!     /// Fill the output buffer
//!     pub fn process(buffer: &mut [f32]) {
//!         for sample in buffer.iter_mut() {
//!             *sample *= 0.5;
//!         }
//!     }
//! }
//!
//! rtsan::blocking! {
//!     pub fn wait_for_worker() {}
//! }
//!
//! let mut buffer = [1.0_f32; 64];
//! process(&mut buffer);
//! ```
//!
//! Both macros accept attributes, visibility, a `self` receiver (so they can be
//! used inside `impl` blocks), and an optional return type. Generic functions
//! are not supported; wrap the generic part in an inner function or use
//! [`ScopedRealtime`](crate::ScopedRealtime) directly.

#[doc(hidden)]
#[macro_export]
macro_rules! __rtsan_symbol {
    ($name:ident) => {
        concat!(module_path!(), "::", stringify!($name))
    };
    ($name:ident, $symbol:literal) => {
        $symbol
    };
}

/// Declare functions that open a constrained region for their whole body
#[macro_export]
macro_rules! nonblocking {
    ($(
        $(#[$attr:meta])*
        $vis:vis fn $name:ident ( $($params:tt)* ) $(-> $ret:ty)? $(as $symbol:literal)? $body:block
    )*) => {$(
        $(#[$attr])*
        $vis fn $name($($params)*) $(-> $ret)? {
            $crate::inventory::submit! {
                $crate::ClassificationEntry::new(
                    $crate::__rtsan_symbol!($name $(, $symbol)?),
                    $crate::Classification::Constrained,
                )
            }
            let __rtsan_region = $crate::ScopedRealtime::new();
            // Temporaries of the body's tail expression drop here, inside the region
            let __rtsan_ret = $body;
            __rtsan_ret
        }
    )*};
}

/// Declare functions that are forbidden inside a constrained region
#[macro_export]
macro_rules! blocking {
    ($(
        $(#[$attr:meta])*
        $vis:vis fn $name:ident ( $($params:tt)* ) $(-> $ret:ty)? $(as $symbol:literal)? $body:block
    )*) => {$(
        $(#[$attr])*
        $vis fn $name($($params)*) $(-> $ret)? {
            $crate::inventory::submit! {
                $crate::ClassificationEntry::new(
                    $crate::__rtsan_symbol!($name $(, $symbol)?),
                    $crate::Classification::Forbidden,
                )
            }
            $crate::intercept::blocking_call($crate::__rtsan_symbol!($name $(, $symbol)?));
            $body
        }
    )*};
}

#[cfg(all(test, feature = "enabled"))]
mod tests {
    use crate::classification::Classification;
    use crate::context;
    use std::cell::Cell;

    struct Engine {
        calls: u32,
    }

    impl Engine {
        crate::nonblocking! {
            fn tick(&mut self) -> u32 {
                self.calls += 1;
                context::realtime_depth()
            }

            fn nested(&mut self) -> (u32, bool) {
                let inner = self.tick();
                (inner, context::is_active())
            }
        }

        crate::nonblocking! {
            fn early_exit(&self, bail: bool) -> Result<u32, String> {
                if bail {
                    return Err("bail".to_string());
                }
                Ok(context::realtime_depth())
            }
        }
    }

    struct Voice;

    impl Voice {
        crate::nonblocking! {
            fn tick(&self) -> bool as "macros::Voice::tick" {
                context::is_active()
            }
        }

        crate::blocking! {
            fn drain(&self) as "macros::Voice::drain" {}
        }
    }

    thread_local! {
        static ACTIVE_AT_DROP: Cell<Option<bool>> = const { Cell::new(None) };
    }

    struct DropMarker;

    impl DropMarker {
        fn value(&self) -> u32 {
            7
        }
    }

    impl Drop for DropMarker {
        fn drop(&mut self) {
            ACTIVE_AT_DROP.with(|active| active.set(Some(context::is_active())));
        }
    }

    crate::nonblocking! {
        fn tail_temporary() -> u32 {
            DropMarker.value()
        }
    }

    #[test]
    fn test_method_opens_region() {
        let mut engine = Engine { calls: 0 };
        assert_eq!(engine.tick(), 1);
        assert_eq!(engine.calls, 1);
        assert_eq!(context::realtime_depth(), 0);
    }

    #[test]
    fn test_nested_annotated_calls() {
        let mut engine = Engine { calls: 0 };
        let (inner_depth, still_active) = engine.nested();
        assert_eq!(inner_depth, 2);
        assert!(still_active);
        assert!(!context::is_active());
    }

    #[test]
    fn test_early_return_pops_region() {
        let engine = Engine { calls: 0 };
        assert!(engine.early_exit(true).is_err());
        assert_eq!(context::realtime_depth(), 0);
        assert_eq!(engine.early_exit(false), Ok(1));
        assert_eq!(context::realtime_depth(), 0);
    }

    #[test]
    fn test_through_function_pointer() {
        crate::nonblocking! {
            fn depth() -> u32 {
                context::realtime_depth()
            }
        }
        let f: fn() -> u32 = depth;
        assert_eq!(f(), 1);
    }

    #[test]
    fn test_tail_temporary_dropped_inside_region() {
        ACTIVE_AT_DROP.with(|active| active.set(None));
        assert_eq!(tail_temporary(), 7);
        assert_eq!(ACTIVE_AT_DROP.with(Cell::get), Some(true));
        assert!(!context::is_active());
    }

    #[test]
    fn test_explicit_symbol_registered() {
        assert!(Voice.tick());
        Voice.drain();

        let registry = crate::runtime::get().registry();
        assert_eq!(registry.classify("macros::Voice::tick"), Classification::Constrained);
        assert_eq!(registry.classify("macros::Voice::drain"), Classification::Forbidden);
        assert_eq!(
            registry.classify(concat!(module_path!(), "::tick")),
            Classification::Constrained
        );
    }
}
