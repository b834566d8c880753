//! Splitting command text into arguments.

/// Split `text` into at most `max_args` arguments.
///
/// The first `max_args - 1` arguments are single space-separated words. The
/// last one is whatever remains of the line, with surrounding spaces trimmed,
/// so that free-text trailing arguments (kick reasons, notes) keep their
/// spaces. An empty trailing remainder produces no argument.
pub fn tokenize(text: &str, max_args: usize) -> Vec<&str> {
    let mut args = Vec::new();

    if max_args == 0 {
        return args;
    }

    let mut rest = text;
    while args.len() < max_args - 1 {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        match rest.split_once(' ') {
            Some((word, remainder)) => {
                args.push(word);
                rest = remainder;
            }
            None => {
                args.push(rest);
                rest = "";
            }
        }
    }

    let trailing = rest.trim_matches(' ');
    if !trailing.is_empty() {
        args.push(trailing);
    }

    args
}

/// Split a full command line into the command word and its argument text.
/// Returns `None` for a blank line.
pub fn split_command(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start_matches(' ');
    if line.is_empty() {
        return None;
    }

    Some(line.split_once(' ').unwrap_or((line, "")))
}
