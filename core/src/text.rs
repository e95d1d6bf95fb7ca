//! Text helpers for multi-line descriptions and epilogs.

/// Strips one leading newline and the common tab/space margin from a
/// multi-line string.
///
/// Lines consisting only of whitespace are reduced to their line break
/// and do not participate in margin computation, so indented literals
/// with blank separator lines dedent cleanly.
///
/// # Examples
///
/// ```
/// use cmdtree_core::dedent;
///
/// let text = dedent(
///     "
///     lists tracked remotes.
///
///     with -v, shows the push URL as well.
///     ",
/// );
/// assert_eq!(text, "lists tracked remotes.\n\nwith -v, shows the push URL as well.\n");
/// ```
pub fn dedent(text: &str) -> String {
    let mut body = text;
    for newline in ["\n", "\r\n"] {
        if let Some(stripped) = body.strip_prefix(newline) {
            body = stripped;
            break;
        }
    }

    let is_newline = |s: &str| s == "\n" || s == "\r\n";

    let mut lines: Vec<&str> = Vec::new();
    let mut margin: Option<&str> = None;
    for line in body.split_inclusive('\n') {
        let Some(i) = line.find(|c: char| c != '\t' && c != ' ') else {
            // Whitespace-only trailing line without a newline.
            continue;
        };
        let rest = &line[i..];
        if is_newline(rest) {
            lines.push(rest);
            continue;
        }
        lines.push(line);
        let indent = &line[..i];
        margin = Some(match margin {
            None => indent,
            Some(current) if indent.starts_with(current) => current,
            Some(current) => common_prefix(current, indent),
        });
    }

    let margin = margin.unwrap_or("");
    let mut out = String::new();
    for line in lines {
        if is_newline(line) {
            out.push_str(line);
        } else {
            out.push_str(&line[margin.len()..]);
        }
    }
    out
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let mut end = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            break;
        }
        end += ca.len_utf8();
    }
    &a[..end]
}
