//! Commonly used test utilities.
//!
//! Use `use iba_test::prelude::*;` to import the essentials.

pub use crate::fixtures::{
    fixed_instant, healthcare_declaration, healthcare_scope, limited_declaration, manual_clock,
    test_declaration, validator_at,
};

pub use crate::harness::{
    setup_test_logging, setup_test_logging_default, test_dir, test_file_in_dir,
};
