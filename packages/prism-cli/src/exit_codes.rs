pub const SUCCESS: i32 = 0;
pub const EXECUTION_ERROR: i32 = 1;
pub const INPUT_ERROR: i32 = 2;
/// Processing finished but at least one record is not GOOD
pub const QUALITY_FAILURE: i32 = 3;
