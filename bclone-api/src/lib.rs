// builders + helpers shared by the integration tests
pub mod builders;
pub mod test_utils;
