use std::path::{Path, PathBuf};

use base64::prelude::{Engine as _, BASE64_STANDARD};
use tracing::debug;
use vpnconf_domain::{
    closing_tag, is_comment, opening_tag, split_terms_lenient, MergeError, MergeLimits,
    OptionBudget,
};

use crate::core::effects::FileSystem;

const INLINE_MARKER: &str = "[inline]";
const BASE64_LINE_WIDTH: usize = 64;

/// Which external references may be followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowMode {
    /// Any readable path.
    #[default]
    Full,
    /// Only files below the profile's own directory.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedProfile {
    pub content: String,
    /// Canonical paths of every embedded or included file, in merge order.
    pub embedded: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Text,
    Base64,
}

#[derive(Debug, Clone, Copy)]
struct Embed<'t> {
    directive: &'t str,
    file: &'t str,
    tag: &'t str,
    encoding: Encoding,
    key_direction: Option<&'t str>,
    /// Replacement directive line emitted ahead of the block, if any.
    keep_line: Option<&'t [String]>,
}

#[derive(Debug, Clone, Copy)]
enum Reference<'t> {
    Plain,
    Embed(Embed<'t>),
    Include(&'t str),
}

fn classify<'t>(name: &'t str, args: &'t [String]) -> Result<Reference<'t>, MergeError> {
    let file_arg = |idx: usize| -> Result<&'t str, MergeError> {
        args.get(idx)
            .map(String::as_str)
            .ok_or_else(|| MergeError::MissingFileArgument {
                directive: name.to_string(),
            })
    };
    let text = |file: &'t str| Embed {
        directive: name,
        file,
        tag: name,
        encoding: Encoding::Text,
        key_direction: None,
        keep_line: None,
    };

    let reference = match name {
        "ca" | "cert" | "key" | "extra-certs" | "tls-crypt" | "tls-crypt-v2" => {
            Reference::Embed(text(file_arg(0)?))
        }
        "dh" => match file_arg(0)? {
            "none" => Reference::Plain,
            file => Reference::Embed(text(file)),
        },
        "tls-auth" | "secret" => Reference::Embed(Embed {
            key_direction: args.get(1).map(String::as_str),
            ..text(file_arg(0)?)
        }),
        "crl-verify" => {
            if args.get(1).map(String::as_str) == Some("dir") {
                Reference::Plain
            } else {
                Reference::Embed(text(file_arg(0)?))
            }
        }
        "auth-user-pass" => match args.first().map(String::as_str) {
            Some(file) => Reference::Embed(text(file)),
            None => Reference::Plain,
        },
        "pkcs12" => Reference::Embed(Embed {
            encoding: Encoding::Base64,
            ..text(file_arg(0)?)
        }),
        "http-proxy" => match args.get(2).map(String::as_str) {
            None | Some("auto" | "auto-nct" | "stdin") => Reference::Plain,
            Some(file) => Reference::Embed(Embed {
                tag: "http-proxy-user-pass",
                keep_line: Some(&args[..2]),
                ..text(file)
            }),
        },
        "config" => Reference::Include(file_arg(0)?),
        _ => Reference::Plain,
    };

    match reference {
        Reference::Embed(embed) if embed.file == INLINE_MARKER => Ok(Reference::Plain),
        other => Ok(other),
    }
}

/// Transitively embeds every file a profile references.
pub struct ProfileMerge<'a> {
    fs: &'a dyn FileSystem,
    mode: FollowMode,
    limits: MergeLimits,
    root: Option<PathBuf>,
    budget: OptionBudget,
    out: String,
    stack: Vec<PathBuf>,
    embedded: Vec<PathBuf>,
}

impl<'a> ProfileMerge<'a> {
    fn new(fs: &'a dyn FileSystem, base_path: &Path, mode: FollowMode, limits: MergeLimits) -> Self {
        Self {
            fs,
            mode,
            limits,
            root: fs.canonicalize(base_path).ok(),
            budget: limits.budget(),
            out: String::new(),
            stack: Vec::new(),
            embedded: Vec::new(),
        }
    }

    /// Merges `text` whose relative references resolve against `base_path`.
    pub fn merge_text(
        fs: &'a dyn FileSystem,
        text: &str,
        base_path: &Path,
        origin: &str,
        mode: FollowMode,
        limits: MergeLimits,
    ) -> Result<MergedProfile, MergeError> {
        let mut merge = Self::new(fs, base_path, mode, limits);
        merge.process(text, base_path, origin, 0)?;
        Ok(merge.finish())
    }

    /// Merges the profile stored at `path`, resolving against its directory.
    pub fn merge_file(
        fs: &'a dyn FileSystem,
        path: &Path,
        mode: FollowMode,
        limits: MergeLimits,
    ) -> Result<MergedProfile, MergeError> {
        let display = path.display().to_string();
        let canonical = fs
            .canonicalize(path)
            .map_err(|err| unresolved("config", &display, &err))?;
        let base = canonical
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let text = read_text(fs, "config", &display, &canonical, &limits)?;

        let mut merge = Self::new(fs, &base, mode, limits);
        merge.stack.push(canonical);
        merge.process(&text, &base, &display, 0)?;
        Ok(merge.finish())
    }

    fn finish(self) -> MergedProfile {
        debug!(
            bytes = self.out.len(),
            embedded = self.embedded.len(),
            option_bytes = self.budget.used(),
            "profile merged"
        );
        MergedProfile {
            content: self.out,
            embedded: self.embedded,
        }
    }

    fn process(
        &mut self,
        text: &str,
        base: &Path,
        origin: &str,
        depth: usize,
    ) -> Result<(), MergeError> {
        self.limits.check_profile_size(text.len())?;
        let mut lines = text.lines().enumerate().map(|(idx, line)| (idx + 1, line));

        while let Some((line_no, raw)) = lines.next() {
            self.limits.check_line(origin, line_no, raw)?;
            let trimmed = raw.trim();
            if trimmed.is_empty() || is_comment(trimmed) {
                self.emit(raw)?;
                continue;
            }

            if let Some(tag) = opening_tag(trimmed) {
                self.emit(raw)?;
                let mut body = String::new();
                for (inner_no, inner) in lines.by_ref() {
                    self.limits.check_line(origin, inner_no, inner)?;
                    self.emit(inner)?;
                    if closing_tag(inner.trim()) == Some(tag) {
                        break;
                    }
                    body.push_str(inner);
                    body.push('\n');
                }
                self.budget.add_directive(tag, [body.as_str()])?;
                continue;
            }

            let terms = split_terms_lenient(trimmed);
            let Some((name, args)) = terms.split_first() else {
                continue;
            };
            match classify(name, args)? {
                Reference::Plain => {
                    self.budget
                        .add_directive(name, args.iter().map(String::as_str))?;
                    self.emit(raw)?;
                }
                Reference::Embed(embed) => self.embed(embed, base)?,
                Reference::Include(file) => self.include(file, base, depth)?,
            }
        }
        Ok(())
    }

    fn embed(&mut self, embed: Embed<'_>, base: &Path) -> Result<(), MergeError> {
        let path = self.resolve(embed.directive, embed.file, base)?;
        let display_name = path.display().to_string();
        let body = match embed.encoding {
            Encoding::Text => read_text(self.fs, embed.directive, embed.file, &path, &self.limits)?,
            Encoding::Base64 => {
                let bytes = self
                    .fs
                    .read(&path)
                    .map_err(|err| unresolved(embed.directive, embed.file, &err))?;
                self.limits.check_profile_size(bytes.len())?;
                wrap_base64(&BASE64_STANDARD.encode(bytes))
            }
        };
        for (idx, line) in body.lines().enumerate() {
            self.limits.check_line(&display_name, idx + 1, line)?;
        }
        let mut block = body;
        if !block.is_empty() && !block.ends_with('\n') {
            block.push('\n');
        }

        if let Some(kept) = embed.keep_line {
            self.budget
                .add_directive(embed.directive, kept.iter().map(String::as_str))?;
            let line = std::iter::once(embed.directive)
                .chain(kept.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            self.emit(&line)?;
        }
        self.budget.add_directive(embed.tag, [block.as_str()])?;
        self.emit(&format!("<{}>", embed.tag))?;
        self.out.push_str(&block);
        self.emit(&format!("</{}>", embed.tag))?;
        if let Some(direction) = embed.key_direction {
            self.budget.add_directive("key-direction", [direction])?;
            self.emit(&format!("key-direction {direction}"))?;
        }
        debug!(directive = embed.directive, file = %display_name, "embedded file reference");
        self.embedded.push(path);
        Ok(())
    }

    fn include(&mut self, file: &str, base: &Path, depth: usize) -> Result<(), MergeError> {
        let path = self.resolve("config", file, base)?;
        let display_name = path.display().to_string();
        if self.stack.contains(&path) {
            return Err(MergeError::IncludeCycle { file: display_name });
        }
        if depth + 1 > self.limits.max_include_depth {
            return Err(MergeError::IncludeTooDeep {
                file: display_name,
                limit: self.limits.max_include_depth,
            });
        }
        let text = read_text(self.fs, "config", file, &path, &self.limits)?;
        let nested_base = path
            .parent()
            .map_or_else(|| base.to_path_buf(), Path::to_path_buf);

        self.stack.push(path.clone());
        self.process(&text, &nested_base, &display_name, depth + 1)?;
        self.stack.pop();
        debug!(file = %display_name, depth = depth + 1, "included nested profile");
        self.embedded.push(path);
        Ok(())
    }

    fn resolve(&self, directive: &str, file: &str, base: &Path) -> Result<PathBuf, MergeError> {
        let candidate = Path::new(file);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            base.join(candidate)
        };
        let canonical = self
            .fs
            .canonicalize(&joined)
            .map_err(|err| unresolved(directive, file, &err))?;
        if self.mode == FollowMode::Partial {
            let inside = !candidate.is_absolute()
                && self
                    .root
                    .as_ref()
                    .is_some_and(|root| canonical.starts_with(root));
            if !inside {
                return Err(MergeError::ReferenceOutsideBase {
                    directive: directive.to_string(),
                    file: file.to_string(),
                    base: self.root.as_ref().map_or_else(
                        || base.display().to_string(),
                        |root| root.display().to_string(),
                    ),
                });
            }
        }
        Ok(canonical)
    }

    fn emit(&mut self, line: &str) -> Result<(), MergeError> {
        self.out.push_str(line);
        self.out.push('\n');
        self.limits.check_profile_size(self.out.len())
    }
}

fn read_text(
    fs: &dyn FileSystem,
    directive: &str,
    file: &str,
    path: &Path,
    limits: &MergeLimits,
) -> Result<String, MergeError> {
    let bytes = fs.read(path).map_err(|err| unresolved(directive, file, &err))?;
    limits.check_profile_size(bytes.len())?;
    String::from_utf8(bytes).map_err(|_| MergeError::UnresolvedReference {
        directive: directive.to_string(),
        file: file.to_string(),
        reason: "file is not valid UTF-8 text".to_string(),
    })
}

fn unresolved(directive: &str, file: &str, err: &anyhow::Error) -> MergeError {
    MergeError::UnresolvedReference {
        directive: directive.to_string(),
        file: file.to_string(),
        reason: err.root_cause().to_string(),
    }
}

fn wrap_base64(encoded: &str) -> String {
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_WIDTH + 1);
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_WIDTH) {
        wrapped.push_str(&String::from_utf8_lossy(chunk));
        wrapped.push('\n');
    }
    wrapped
}
