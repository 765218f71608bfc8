mod artifacts;
mod common;
