/// Parser limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseConfig {
    /// Maximum element nesting depth. Walkers, flush and comparison recurse
    /// over the tree, so this bounds their stack usage as well.
    pub max_depth: usize,
}

impl ParseConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 1024;
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

/// What the merge engine inserts for positions that exist only in the new tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsertMode {
    /// Shallow placeholder: an element keeps its name and tokens but none of
    /// its attributes or children. Text-like nodes are copied whole.
    #[default]
    Shell,
    /// Full copy of the new subtree.
    Deep,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeConfig {
    pub insert_mode: InsertMode,
}

impl MergeConfig {
    pub fn deep() -> Self {
        Self {
            insert_mode: InsertMode::Deep,
        }
    }
}
