pub(crate) mod coding;
#[cfg(test)]
pub(crate) mod testutil;
