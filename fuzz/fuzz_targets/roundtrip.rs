#![no_main]

use libfuzzer_sys::fuzz_target;
use xdm::{containing_node, flush, parse};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(doc) = parse(input) else {
        return;
    };
    let text = flush(&doc);
    assert_eq!(text, input, "flush must reproduce the parsed text");
    for offset in (0..text.len()).step_by(7) {
        assert!(containing_node(&doc, offset).is_some());
    }
    assert!(containing_node(&doc, text.len()).is_none());
});
