use tracing::warn;
use vpnconf_domain::{Directive, MergeLimits, OptionList, ParseError};

pub const PERSIST_TUN: &str = "persist-tun";

/// Strictly parses `content` and returns the first occurrence of `name`.
pub fn lookup_directive(
    content: &str,
    name: &str,
    limits: &MergeLimits,
) -> Result<Option<Directive>, ParseError> {
    let list = OptionList::parse(content, limits)?;
    Ok(list.get(name).cloned())
}

/// Best-effort detection: a profile that cannot be parsed is treated as not
/// carrying the directive.
pub fn detect_persist_tun(content: &str, limits: &MergeLimits) -> bool {
    match lookup_directive(content, PERSIST_TUN, limits) {
        Ok(found) => found.is_some(),
        Err(err) => {
            warn!(%err, "could not scan profile for persist-tun; assuming absent");
            false
        }
    }
}
