use atty::Stream;
use color_eyre::Result;
use serde_json::Value;
use vpnconf_core::api as vpnconf_core;
use vpnconf_core::{diag_commands, CommandInfo, CommandStatus, ExecutionOutcome};

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

pub fn exit_code(status: CommandStatus) -> i32 {
    match status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
        CommandStatus::PartialFailure => 3,
    }
}

pub fn emit_output(opts: &OutputOptions, info: CommandInfo, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = exit_code(outcome.status);

    if opts.json {
        let payload = vpnconf_core::to_json_response(info, outcome, code);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    let style_out = Style::new(opts.no_color, atty::is(Stream::Stdout));
    let style_err = Style::new(opts.no_color, atty::is(Stream::Stderr));

    match outcome.status {
        CommandStatus::Ok => {
            if !opts.quiet && !outcome.message.is_empty() {
                println!("{}", outcome.message);
            }
        }
        CommandStatus::PartialFailure => {
            if !opts.quiet {
                println!("{}", outcome.message);
            }
            let summary = vpnconf_core::format_status_message(info, &partial_summary(&outcome.details));
            eprintln!("{}", style_err.status(outcome.status, &summary));
        }
        CommandStatus::UserError | CommandStatus::Failure => {
            for line in completed_lines(&outcome.details) {
                if !opts.quiet {
                    println!("{}", style_out.info(line));
                }
            }
            let header = format!(
                "{}  {}",
                error_code(info, &outcome.details),
                strip_code_prefix(&outcome.message)
            );
            eprintln!("{}", style_err.error_header(&header));
            eprintln!();
            eprintln!("Why:");
            for reason in collect_why_bullets(&outcome.details, &outcome.message) {
                eprintln!("  • {reason}");
            }
            let fixes = collect_fix_bullets(&outcome.details);
            if !fixes.is_empty() {
                eprintln!();
                eprintln!("Fix:");
                for fix in fixes {
                    eprintln!("{}", style_err.fix_bullet(&format!("  • {fix}")));
                }
            }
        }
    }

    Ok(code)
}

fn partial_summary(details: &Value) -> String {
    let failed = details
        .get("failures")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if failed == 1 {
        "1 request failed".to_string()
    } else {
        format!("{failed} requests failed")
    }
}

fn completed_lines(details: &Value) -> impl Iterator<Item = &str> {
    details
        .get("completed")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn error_code(info: CommandInfo, details: &Value) -> String {
    if let Some(code) = details
        .as_object()
        .and_then(|map| map.get("code"))
        .and_then(Value::as_str)
        .filter(|code| code.starts_with("VC"))
    {
        return code.to_string();
    }
    if details.get("reason").and_then(Value::as_str) == Some("internal_error") {
        return diag_commands::GENERIC.to_string();
    }
    info.group.code().to_string()
}

fn strip_code_prefix(message: &str) -> &str {
    match message.strip_prefix("[VC") {
        Some(rest) => rest
            .split_once("] ")
            .map_or(message, |(_, text)| text),
        None => message,
    }
}

fn collect_why_bullets(details: &Value, fallback: &str) -> Vec<String> {
    let mut bullets = Vec::new();
    if let Some(reason) = details.get("reason").and_then(Value::as_str) {
        push_unique(&mut bullets, reason_display(reason).unwrap_or(reason));
    }
    if let Some(constraint) = details.get("constraint").and_then(Value::as_str) {
        push_unique(&mut bullets, format!("Violated limit: {constraint}"));
    }
    if let Some(failures) = details.get("failures").and_then(Value::as_array) {
        for failure in failures.iter().filter_map(Value::as_str) {
            push_unique(&mut bullets, failure);
        }
    }
    if let Some(issues) = details.get("issues").and_then(Value::as_array) {
        for issue in issues.iter().filter_map(Value::as_str).skip(1) {
            push_unique(&mut bullets, issue);
        }
    }
    if bullets.is_empty() {
        bullets.push(strip_code_prefix(fallback).to_string());
    }
    bullets
}

fn collect_fix_bullets(details: &Value) -> Vec<String> {
    let mut fixes = Vec::new();
    if let Some(hint) = details.get("hint").and_then(Value::as_str) {
        push_unique(&mut fixes, hint);
    }
    if let Some(reason) = details.get("reason").and_then(Value::as_str) {
        if let Some(fix) = reason_fix(reason) {
            push_unique(&mut fixes, fix);
        }
    }
    fixes
}

fn push_unique(vec: &mut Vec<String>, text: impl Into<String>) {
    let entry = text.into();
    if entry.trim().is_empty() {
        return;
    }
    if !vec.iter().any(|existing| existing == &entry) {
        vec.push(entry);
    }
}

fn reason_display(code: &str) -> Option<&'static str> {
    match code {
        "merge_failed" => Some("The profile or a file it references could not be embedded."),
        "invalid_identity" => Some("A user name did not map to a valid account."),
        "sealed" => Some("The profile is sealed and cannot be changed."),
        "already_sealed" => Some("The profile was sealed earlier."),
        "not_found" => Some("No profile you may see exists at that path."),
        "unauthorized" => Some("Only the profile owner may do this."),
        "content_restricted" => Some("The profile is locked down to its owner."),
        "transport" => Some("The configuration store could not be reached."),
        "invalid_request" => Some("The requested options cannot be combined."),
        "unparseable_profile" => Some("The stored profile does not parse as directives."),
        "internal_error" => Some("vpnconf hit an unexpected error."),
        _ => None,
    }
}

fn reason_fix(code: &str) -> Option<&'static str> {
    match code {
        "not_found" => Some("Run `vpnconf configs-list` to see the available paths."),
        "unauthorized" | "content_restricted" => {
            Some("Ask the owner to grant access with `vpnconf config-acl --grant`.")
        }
        "invalid_request" => Some("Re-run with --help for usage."),
        _ => None,
    }
}
