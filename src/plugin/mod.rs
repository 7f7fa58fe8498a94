pub mod commands;
pub mod middleware;

#[cfg(test)]
pub(crate) mod test_support;
