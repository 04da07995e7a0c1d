//! Ref listing filters.

/// Match `text` against `pattern`.
///
/// A pattern containing `*` or `?` is a glob (`*` matches any run of
/// characters including `/`, `?` exactly one). Any other pattern is a
/// substring filter, and the empty pattern matches everything.
pub fn matches(pattern: &str, text: &str) -> bool {
    if pattern.contains(['*', '?']) {
        glob(pattern, text)
    } else {
        text.contains(pattern)
    }
}

fn glob(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` and the text index it is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}
