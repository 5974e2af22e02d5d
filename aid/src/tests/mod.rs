mod privileged_tests;
mod property_tests;
mod test_error;
mod test_identity;
mod test_trace;
