/// Largest edit distance still offered as a "did you mean" suggestion
pub const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Levenshtein distance with unit cost for insertion, deletion and substitution.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let n = b_chars.len();

    // Single rolling row
    let mut prev_row: Vec<usize> = (0..=n).collect();
    let mut curr_row = vec![0usize; n + 1];

    for (i, a_ch) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = usize::from(a_ch != b_ch);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[n]
}

/// The closest candidate within [`MAX_SUGGESTION_DISTANCE`], if any.
///
/// Ties go to whichever candidate the iterator yields first; registry key
/// order is unspecified, so tied suggestions are not deterministic.
pub fn nearest<'a>(token: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for candidate in candidates {
        let dist = levenshtein(token, candidate);
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((candidate, dist));
        }
    }
    best.filter(|(_, d)| *d <= MAX_SUGGESTION_DISTANCE)
        .map(|(name, _)| name)
}
