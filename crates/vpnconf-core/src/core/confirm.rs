use std::io::{self, BufRead, BufReader, Write};

use parking_lot::Mutex;
use tracing::debug;

/// The literal answer that affirms a destructive operation.
pub const AFFIRMATIVE_TOKEN: &str = "YES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Affirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfirmRequest<'a> {
    pub operation: &'a str,
    pub warning: &'a str,
}

/// Human-safety gate consulted before seal and remove.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, request: &ConfirmRequest<'_>) -> Confirmation;
}

/// Pre-affirmed intent (`--force`, non-interactive callers).
pub struct AlwaysAffirm;

impl Confirmer for AlwaysAffirm {
    fn confirm(&self, request: &ConfirmRequest<'_>) -> Confirmation {
        debug!(operation = request.operation, "confirmation forced");
        Confirmation::Affirmed
    }
}

static ALWAYS_AFFIRM: AlwaysAffirm = AlwaysAffirm;

#[must_use]
pub fn confirmer_for(force: bool, interactive: &dyn Confirmer) -> &dyn Confirmer {
    if force {
        &ALWAYS_AFFIRM
    } else {
        interactive
    }
}

/// Prints the warning and reads exactly one answer line.
///
/// End of input, a read error or a warning that could not be shown counts as
/// a declined prompt.
pub struct LinePrompt {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
}

impl LinePrompt {
    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            input: Mutex::new(Box::new(input)),
            output: Mutex::new(Box::new(output)),
        }
    }

    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stderr())
    }

    fn show_warning(&self, request: &ConfirmRequest<'_>) -> io::Result<()> {
        let mut out = self.output.lock();
        writeln!(out, "{}", request.warning)?;
        write!(
            out,
            "Are you sure you want to do this? (enter yes in upper case) "
        )?;
        out.flush()
    }
}

impl Confirmer for LinePrompt {
    fn confirm(&self, request: &ConfirmRequest<'_>) -> Confirmation {
        if let Err(err) = self.show_warning(request) {
            debug!(operation = request.operation, %err, "confirmation prompt not shown");
            return Confirmation::Cancelled;
        }

        let mut answer = String::new();
        match self.input.lock().read_line(&mut answer) {
            Ok(0) => {
                debug!(operation = request.operation, "confirmation abandoned");
                Confirmation::Cancelled
            }
            Ok(_) if answer.trim() == AFFIRMATIVE_TOKEN => Confirmation::Affirmed,
            Ok(_) => Confirmation::Cancelled,
            Err(err) => {
                debug!(operation = request.operation, %err, "confirmation read failed");
                Confirmation::Cancelled
            }
        }
    }
}
