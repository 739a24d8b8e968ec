mod patient;
mod profile;
mod treatment;

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
