pub mod fs;
pub mod split;
