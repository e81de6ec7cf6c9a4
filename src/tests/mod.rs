mod filter_tests;
mod set_algebra_tests;
