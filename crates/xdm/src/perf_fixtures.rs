pub const BLOCK_TEMPLATE: &str =
    "\n  <item id=\"n\" kind='box'>\n    <name>hello &amp; bye</name>\n    <flag/>\n  </item>";

/// `<root>` holding `blocks` copies of [`BLOCK_TEMPLATE`].
pub fn make_blocks(blocks: usize) -> String {
    let mut xml = String::with_capacity(BLOCK_TEMPLATE.len() * blocks + 16);
    xml.push_str("<root>");
    for _ in 0..blocks {
        xml.push_str(BLOCK_TEMPLATE);
    }
    xml.push_str("\n</root>\n");
    xml
}

/// Like [`make_blocks`], but every `stride`-th block has a different
/// attribute value and name text, so a merge has work to do.
pub fn make_edited_blocks(blocks: usize, stride: usize) -> String {
    let stride = stride.max(1);
    let mut xml = String::with_capacity(BLOCK_TEMPLATE.len() * blocks + 16);
    xml.push_str("<root>");
    for i in 0..blocks {
        if i % stride == 0 {
            xml.push_str(
                "\n  <item id=\"m\" kind='box'>\n    <name>edited</name>\n    <flag/>\n  </item>",
            );
        } else {
            xml.push_str(BLOCK_TEMPLATE);
        }
    }
    xml.push_str("\n</root>\n");
    xml
}
