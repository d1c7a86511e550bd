use crate::block::Span;

/// Split a line into styled spans.
///
/// Recognises `***bold italic***`, `**bold**` and `*italic*` in one
/// left-to-right pass. An opening marker must be followed by a non-space
/// character and a closing marker preceded by one; anything else, including
/// an unterminated marker, stays literal. Only marker characters are ever
/// removed from the output text.
pub fn format(line: &str) -> Vec<Span> {
    let bytes = line.as_bytes();
    let mut spans = Vec::new();
    // Once a closer search for a marker width fails, no later search can
    // succeed, which keeps the scan linear.
    let mut exhausted = [false; 4];
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'*' {
            i += 1;
            continue;
        }

        let run = bytes[i..].iter().take_while(|&&b| b == b'*').count();
        let width = run.min(3);
        let open_end = i + width;

        let opens = line[open_end..]
            .chars()
            .next()
            .is_some_and(|c| !c.is_whitespace());
        let close = if opens {
            find_closer(line, open_end, width, &mut exhausted)
        } else {
            None
        };

        match close {
            Some(close) => {
                push_literal(&mut spans, &line[literal_start..i]);
                spans.push(Span {
                    text: line[open_end..close].to_string(),
                    bold: width >= 2,
                    italic: width != 2,
                });
                i = close + width;
                literal_start = i;
            }
            None => i += run,
        }
    }

    push_literal(&mut spans, &line[literal_start..]);
    spans
}

fn find_closer(line: &str, from: usize, width: usize, exhausted: &mut [bool; 4]) -> Option<usize> {
    if exhausted[width] {
        return None;
    }
    let marker = &"***"[..width];
    let mut search = from;
    while let Some(offset) = line[search..].find(marker) {
        let at = search + offset;
        if at > from && !line[..at].ends_with(char::is_whitespace) {
            return Some(at);
        }
        search = at + 1;
    }
    exhausted[width] = true;
    None
}

fn push_literal(spans: &mut Vec<Span>, text: &str) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if !last.bold && !last.italic => last.text.push_str(text),
        _ => spans.push(Span::plain(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::plain_text;
    use proptest::prelude::*;

    #[test]
    fn plain_line() {
        assert_eq!(format("Hello world"), vec![Span::plain("Hello world")]);
    }

    #[test]
    fn empty_line() {
        assert!(format("").is_empty());
    }

    #[test]
    fn bold_span() {
        assert_eq!(
            format("Ricavi **197.250€** in crescita."),
            vec![
                Span::plain("Ricavi "),
                Span::bold("197.250€"),
                Span::plain(" in crescita."),
            ]
        );
    }

    #[test]
    fn italic_span() {
        assert_eq!(
            format("un *trend* positivo"),
            vec![Span::plain("un "), Span::italic("trend"), Span::plain(" positivo")]
        );
    }

    #[test]
    fn bold_italic_span() {
        assert_eq!(
            format("***attenzione***"),
            vec![Span {
                text: "attenzione".to_string(),
                bold: true,
                italic: true,
            }]
        );
    }

    #[test]
    fn adjacent_styles() {
        assert_eq!(
            format("*a***b**"),
            vec![Span::italic("a"), Span::bold("b")]
        );
    }

    #[test]
    fn lone_trailing_star_is_literal() {
        assert_eq!(format("nota*"), vec![Span::plain("nota*")]);
        assert_eq!(format("**non chiuso"), vec![Span::plain("**non chiuso")]);
    }

    #[test]
    fn spaced_stars_are_literal() {
        assert_eq!(format("3 * 4 * 5"), vec![Span::plain("3 * 4 * 5")]);
    }

    #[test]
    fn empty_markers_are_literal() {
        assert_eq!(format("****"), vec![Span::plain("****")]);
    }

    #[test]
    fn literal_after_failed_marker_merges() {
        let spans = format("a * b **c**");
        assert_eq!(spans, vec![Span::plain("a * b "), Span::bold("c")]);
    }

    fn segment() -> impl Strategy<Value = String> {
        ("[a-zA-Z0-9àè€.,%]{1,8}( [a-zA-Z0-9€.,%]{1,8}){0,2}", 0..4usize).prop_map(
            |(words, style)| match style {
                0 => words,
                1 => format!("*{words}*"),
                2 => format!("**{words}**"),
                _ => format!("***{words}***"),
            },
        )
    }

    proptest! {
        #[test]
        fn spans_round_trip_without_markers(segments in prop::collection::vec(segment(), 0..6)) {
            let line = segments.join(" ");
            let expected: String = line.chars().filter(|&c| c != '*').collect();
            prop_assert_eq!(plain_text(&format(&line)), expected);
        }

        #[test]
        fn never_drops_non_marker_characters(line in "[ -~]{0,40}") {
            let kept: String = line.chars().filter(|&c| c != '*').collect();
            let output: String = plain_text(&format(&line)).chars().filter(|&c| c != '*').collect();
            prop_assert_eq!(output, kept);
        }
    }
}
