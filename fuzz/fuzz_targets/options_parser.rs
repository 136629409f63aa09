#![no_main]

use libfuzzer_sys::fuzz_target;
use rtsan::options::Options;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let options = Options::parse(input);
        // Rendering and reparsing a parsed configuration is lossless
        assert_eq!(Options::parse(&options.to_env_string()), options);
    }
});
