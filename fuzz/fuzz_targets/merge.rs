#![no_main]

use libfuzzer_sys::fuzz_target;
use xdm::{MergeConfig, flush, merge, parse};

// Input is two documents separated by a NUL byte.
fuzz_target!(|data: &[u8]| {
    let Some(split) = data.iter().position(|&b| b == 0) else {
        return;
    };
    let (Ok(old_text), Ok(new_text)) = (
        std::str::from_utf8(&data[..split]),
        std::str::from_utf8(&data[split + 1..]),
    ) else {
        return;
    };
    let (Ok(mut old), Ok(new)) = (parse(old_text), parse(new_text)) else {
        return;
    };

    let shell = merge(&old, &new, &MergeConfig::default());
    let mut shell_doc = old.clone();
    let undo = shell_doc.apply(shell).expect("shell plan applies");
    shell_doc.apply(undo).expect("undo applies");
    assert_eq!(flush(&shell_doc), old_text);

    old.merge_from(&new, &MergeConfig::deep()).expect("deep plan applies");
    if old.tokens() == new.tokens() {
        assert_eq!(flush(&old), new_text);
    }
});
