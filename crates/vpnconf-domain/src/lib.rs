#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod error;
pub mod identity;
pub mod limits;
pub mod options;
pub mod profile;

pub use error::{codes, MergeError, ProfileError};
pub use identity::Principal;
pub use limits::{
    MergeLimits, OptionBudget, MAX_DIRECTIVE_SIZE, MAX_INCLUDE_DEPTH, MAX_LINE_SIZE,
    MAX_PROFILE_SIZE, OPT_OVERHEAD, TERM_OVERHEAD,
};
pub use options::{
    closing_tag, is_comment, opening_tag, split_terms_lenient, Directive, OptionList, ParseError,
};
pub use profile::{
    ConfigProfile, NewProfile, ProfilePath, ProfileProperties, ProfileState, CONFIGURATION_ROOT,
};
