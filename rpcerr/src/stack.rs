//! Call-site stack traces captured when an error is built

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of frames kept per trace.
pub const MAX_FRAMES: usize = 32;

const CRATE_NAME: &str = env!("CARGO_CRATE_NAME");

/// An ordered list of rendered frames, innermost (the call site) first.
///
/// Each frame has the form `"<file>:<line> - <function>\n"`. Frames are
/// symbolicated when the trace is captured, so a `StackTrace` is plain data
/// and can be shared across threads or sent over the wire as is.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackTrace(Vec<String>);

impl StackTrace {
    /// Capture the current call stack.
    ///
    /// Frames belonging to the unwinder and to this library are skipped, so
    /// the first frame is whoever called into the library.
    #[inline(never)]
    pub fn capture() -> Self {
        let internal = Prefixes::new();
        let mut frames = Vec::with_capacity(MAX_FRAMES);
        let mut skipping = true;

        backtrace::trace(|frame| {
            let mut resolved = false;
            backtrace::resolve_frame(frame, |symbol| {
                resolved = true;
                if frames.len() >= MAX_FRAMES {
                    return;
                }
                let name = symbol
                    .name()
                    .map(|n| format!("{:#}", n))
                    .unwrap_or_else(|| "<unknown>".to_string());
                if skipping && internal.matches(&name) {
                    return;
                }
                skipping = false;

                let file = symbol
                    .filename()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let line = symbol.lineno().unwrap_or(0);
                frames.push(render_frame(&file, line, &name));
            });

            if !resolved && !skipping && frames.len() < MAX_FRAMES {
                frames.push(render_frame("<unknown>", 0, "<unknown>"));
            }
            frames.len() < MAX_FRAMES
        });

        Self(frames)
    }

    /// Rebuild a trace from already rendered frames, e.g. received over the wire
    pub fn from_entries(entries: Vec<String>) -> Self {
        Self(entries)
    }

    pub fn frames(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.0
    }
}

fn render_frame(file: &str, line: u32, function: &str) -> String {
    format!("{}:{} - {}\n", file, line, function)
}

/// Symbol prefixes that identify frames to drop from the top of a trace.
struct Prefixes {
    crate_path: String,
    crate_impl: String,
}

impl Prefixes {
    fn new() -> Self {
        Self {
            crate_path: format!("{}::", CRATE_NAME),
            crate_impl: format!("<{}::", CRATE_NAME),
        }
    }

    fn matches(&self, name: &str) -> bool {
        if name.starts_with("backtrace::")
            || name.starts_with("<backtrace::")
            || name.starts_with("_Unwind")
            || name == "<unknown>"
            || is_conversion_glue(name)
        {
            return true;
        }
        let ours = name.starts_with(&self.crate_path) || name.starts_with(&self.crate_impl);
        ours && !name.contains("::tests::")
    }
}

/// `?` and `.into()` run through libcore before reaching our `From` impls.
fn is_conversion_glue(name: &str) -> bool {
    name.starts_with("core::ops::try_trait::")
        || name.contains("FromResidual")
        || name.starts_with("core::convert::")
        || name.starts_with("<T as core::convert::Into<U>>::into")
}

// Frames already end in '\n', so the joined form is the full dump.
impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.0 {
            f.write_str(frame)?;
        }
        Ok(())
    }
}

impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|frame| frame.trim_end()))
            .finish()
    }
}

impl From<Vec<String>> for StackTrace {
    fn from(entries: Vec<String>) -> Self {
        Self::from_entries(entries)
    }
}
