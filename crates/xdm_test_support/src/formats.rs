pub const EXPECTED_OUTLINE_FORMAT_V1: &str = "xdm-outline-v1";
pub const MERGE_CASES_FORMAT_V1: &str = "xdm-merge-cases-v1";
