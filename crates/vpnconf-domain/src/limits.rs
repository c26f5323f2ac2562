use serde::{Deserialize, Serialize};

use crate::error::MergeError;

pub const MAX_PROFILE_SIZE: usize = 262_144;
pub const MAX_LINE_SIZE: usize = 512;
pub const MAX_DIRECTIVE_SIZE: usize = 64;
pub const OPT_OVERHEAD: usize = 64;
pub const TERM_OVERHEAD: usize = 2;
pub const MAX_INCLUDE_DEPTH: usize = 8;

/// Size policy applied to every imported profile.
///
/// `opt_overhead` is charged once per directive and `term_overhead` once per
/// term (directive name, argument or inline body) on top of the term length.
/// The running total shares the `max_profile_size` ceiling with the raw size
/// of the merged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeLimits {
    pub max_profile_size: usize,
    pub max_line_size: usize,
    pub max_directive_size: usize,
    pub opt_overhead: usize,
    pub term_overhead: usize,
    pub max_include_depth: usize,
}

impl Default for MergeLimits {
    fn default() -> Self {
        Self {
            max_profile_size: MAX_PROFILE_SIZE,
            max_line_size: MAX_LINE_SIZE,
            max_directive_size: MAX_DIRECTIVE_SIZE,
            opt_overhead: OPT_OVERHEAD,
            term_overhead: TERM_OVERHEAD,
            max_include_depth: MAX_INCLUDE_DEPTH,
        }
    }
}

impl MergeLimits {
    #[must_use]
    pub fn budget(&self) -> OptionBudget {
        OptionBudget::new(*self)
    }

    pub fn check_profile_size(&self, size: usize) -> Result<(), MergeError> {
        if size > self.max_profile_size {
            return Err(MergeError::ProfileTooLarge {
                size,
                limit: self.max_profile_size,
            });
        }
        Ok(())
    }

    pub fn check_line(&self, origin: &str, line: usize, text: &str) -> Result<(), MergeError> {
        if text.len() > self.max_line_size {
            return Err(MergeError::LineTooLong {
                origin: origin.to_string(),
                line,
                length: text.len(),
                limit: self.max_line_size,
            });
        }
        Ok(())
    }
}

/// Running per-directive overhead accounting.
#[derive(Debug, Clone)]
pub struct OptionBudget {
    limits: MergeLimits,
    used: usize,
}

impl OptionBudget {
    #[must_use]
    pub fn new(limits: MergeLimits) -> Self {
        Self { limits, used: 0 }
    }

    #[must_use]
    pub fn used(&self) -> usize {
        self.used
    }

    /// Charges one directive: its name followed by its remaining terms.
    pub fn add_directive<'a, I>(&mut self, name: &str, terms: I) -> Result<(), MergeError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if name.len() > self.limits.max_directive_size {
            return Err(MergeError::DirectiveTooLong {
                directive: name.chars().take(self.limits.max_directive_size).collect(),
                limit: self.limits.max_directive_size,
            });
        }
        self.charge(self.limits.opt_overhead)?;
        self.charge(self.limits.term_overhead + name.len())?;
        for term in terms {
            self.charge(self.limits.term_overhead + term.len())?;
        }
        Ok(())
    }

    fn charge(&mut self, amount: usize) -> Result<(), MergeError> {
        self.used = self.used.saturating_add(amount);
        if self.used > self.limits.max_profile_size {
            return Err(MergeError::OptionBudgetExceeded {
                used: self.used,
                limit: self.limits.max_profile_size,
            });
        }
        Ok(())
    }
}
