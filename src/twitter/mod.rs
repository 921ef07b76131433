pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
