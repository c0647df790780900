//! # Validation
//!
//! Boundary checks for tool arguments. Model-level rules for teams live on the
//! request types in [`crate::teams::models`] via `validator` derives.

pub mod parameters;

pub use parameters::{
    bool_flag, email, in_range, matches_pattern, non_empty_string, one_of, optional_string,
    path_segment, positive_integer, require_params, string_list, unique_items, Arguments,
};
