//! Usage text for a single command.
//!
//! ```text
//! greet [-n] <times>
//!   Greets someone a number of times.
//!
//!   OPTIONS:
//!     -n        who to greet
//!   PARAMETERS:
//!     times     how many greetings
//! ```

use crate::definition::{OptionSpec, ParameterSpec};
use std::fmt::Write;

/// Column at which descriptions wrap.
const WRAP_WIDTH: usize = 58;
/// Continuation lines line up under the first description column.
const CONTINUATION: &str = "              ";

pub(crate) struct HelpInput<'a> {
    pub keyword: &'a str,
    pub description: Option<&'a str>,
    /// Sorted by alias.
    pub options: &'a [&'a OptionSpec],
    /// In arity order.
    pub parameters: &'a [&'a ParameterSpec],
    pub subcommands: &'a [(&'a str, Option<&'a str>)],
}

pub(crate) fn render(input: HelpInput<'_>) -> String {
    let mut out = String::new();

    out.push_str(input.keyword);
    if !input.options.is_empty() {
        out.push_str(" [-");
        for option in input.options {
            out.push_str(&option.alias);
        }
        out.push(']');
    }
    for parameter in input.parameters {
        let _ = write!(out, " <{}>", parameter.name);
    }
    out.push('\n');

    if let Some(description) = input.description {
        let _ = writeln!(out, "  {description}\n");
    }

    if !input.options.is_empty() {
        out.push_str("  OPTIONS:\n");
        for option in input.options {
            push_entry(&mut out, &format!("-{}", option.alias), &option.description);
        }
    }

    if !input.parameters.is_empty() {
        out.push_str("  PARAMETERS:\n");
        for parameter in input.parameters {
            push_entry(&mut out, &parameter.name, &parameter.description);
        }
    }

    if !input.subcommands.is_empty() {
        out.push_str("  SUBCOMMANDS:\n");
        for (keyword, description) in input.subcommands {
            push_entry(&mut out, keyword, description.unwrap_or_default());
        }
    }

    out
}

fn push_entry(out: &mut String, label: &str, description: &str) {
    let _ = write!(out, "    {label:<10}");
    if label.chars().count() >= 10 && !description.is_empty() {
        out.push(' ');
    }
    out.push_str(&wrap_text(description, CONTINUATION, WRAP_WIDTH));
    out.push('\n');
}

/// Break `text` at the last space at or before `width` characters, indenting
/// every continuation line. A word longer than `width` is left whole.
pub(crate) fn wrap_text(text: &str, indent: &str, width: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while rest.chars().count() > width {
        // Byte range covering the first `width + 1` characters.
        let window = rest
            .char_indices()
            .nth(width + 1)
            .map_or(rest.len(), |(index, _)| index);
        let Some(split) = rest[..window].rfind(' ').or_else(|| rest.find(' ')) else {
            break;
        };
        out.push_str(&rest[..split]);
        out.push('\n');
        out.push_str(indent);
        rest = &rest[split + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(wrap_text("fits on one line", "  ", 58), "fits on one line");
        assert_eq!(wrap_text("", "  ", 58), "");
    }

    #[test]
    fn test_wraps_at_last_space_before_width() {
        assert_eq!(
            wrap_text("aaaa bbbb cccc dddd", ">>", 10),
            "aaaa bbbb\n>>cccc dddd"
        );
    }

    #[test]
    fn test_space_exactly_at_width_is_used() {
        assert_eq!(wrap_text("aaaaa bbbbb", "..", 5), "aaaaa\n..bbbbb");
    }

    #[test]
    fn test_long_word_overflows() {
        let text = "tiny supercalifragilisticexpialidocious end";
        assert_eq!(
            wrap_text(text, "_", 8),
            "tiny\n_supercalifragilisticexpialidocious\n_end"
        );
        assert_eq!(wrap_text("unbreakableword", "_", 4), "unbreakableword");
    }

    #[test]
    fn test_render_layout() {
        let name = OptionSpec::new("name", "n").description("who to greet");
        let loud = OptionSpec::new("loud", "l").description("shout");
        let times = ParameterSpec::new("times", 0).description("how many greetings");
        let text = render(HelpInput {
            keyword: "greet",
            description: Some("Greets someone."),
            options: &[&loud, &name],
            parameters: &[&times],
            subcommands: &[],
        });
        assert_eq!(
            text,
            "greet [-ln] <times>\n  Greets someone.\n\n  OPTIONS:\n    -l        shout\n    -n        who to greet\n  PARAMETERS:\n    times     how many greetings\n"
        );
    }

    #[test]
    fn test_render_bare_command_and_subcommands() {
        let text = render(HelpInput {
            keyword: "db",
            description: None,
            options: &[],
            parameters: &[],
            subcommands: &[("migrate", Some("apply migrations")), ("status", None)],
        });
        assert_eq!(
            text,
            "db\n  SUBCOMMANDS:\n    migrate   apply migrations\n    status    \n"
        );
    }

    #[test]
    fn test_no_description_means_no_blank_line() {
        let verbose = OptionSpec::new("verbose", "v").description("more output");
        let text = render(HelpInput {
            keyword: "status",
            description: None,
            options: &[&verbose],
            parameters: &[],
            subcommands: &[],
        });
        assert_eq!(text, "status [-v]\n  OPTIONS:\n    -v        more output\n");
    }

    #[test]
    fn test_long_labels_keep_a_gap() {
        let spec = ParameterSpec::new("destination", 0).description("where to");
        let text = render(HelpInput {
            keyword: "send",
            description: None,
            options: &[],
            parameters: &[&spec],
            subcommands: &[],
        });
        assert!(text.contains("    destination where to\n"));
    }
}
