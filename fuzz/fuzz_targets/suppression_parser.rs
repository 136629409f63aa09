#![no_main]

use libfuzzer_sys::fuzz_target;
use rtsan::suppression::SuppressionList;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must not panic, and the strict parser must agree with the lenient one
        let lenient = SuppressionList::parse(input);
        if let Ok(strict) = SuppressionList::parse_strict(input) {
            assert_eq!(strict.len(), lenient.len());
        }
    }
});
