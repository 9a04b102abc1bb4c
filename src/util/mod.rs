//! Misc non-public utility code for the byml crate itself.
pub(crate) mod debug;
pub(crate) mod log;
