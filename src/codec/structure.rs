//! Line-break marker reconciliation between source and translation

/// In-text line break used by the source files
pub const LINE_BREAK: &str = "#n";

/// Make `translated` carry as many `#n` markers as `source` and drop repeated segments
pub fn reconcile(translated: &str, source: &str) -> String {
    let wanted = source.matches(LINE_BREAK).count();
    let normalized = fit_marker_count(translated, wanted);

    let mut segments: Vec<&str> = Vec::new();
    for segment in normalized.split(LINE_BREAK).map(str::trim) {
        if !segment.is_empty() && !segments.contains(&segment) {
            segments.push(segment);
        }
    }

    let mut out = segments.join(LINE_BREAK);
    let have = out.matches(LINE_BREAK).count();
    if have < wanted {
        out.push_str(&LINE_BREAK.repeat(wanted - have));
    }
    out
}

/// Drop trailing surplus markers or append missing ones
fn fit_marker_count(text: &str, wanted: usize) -> String {
    let positions: Vec<usize> = text.match_indices(LINE_BREAK).map(|(i, _)| i).collect();

    if positions.len() < wanted {
        return format!("{}{}", text, LINE_BREAK.repeat(wanted - positions.len()));
    }

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for &start in &positions[wanted..] {
        out.push_str(&text[pos..start]);
        pos = start + LINE_BREAK.len();
    }
    out.push_str(&text[pos..]);
    out
}
