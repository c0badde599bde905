pub mod path;
#[cfg(test)]
pub mod test_utils;
