//! Shell-style name matching for `find -name` and `ls` patterns.
//!
//! - `*` matches zero or more characters
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]` match one character from the set
//! - `[!abc]` or `[^abc]` match one character not in the set
//! - `\x` matches `x` literally

/// Whether `pattern` contains any glob metacharacters.
pub fn contains_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Match a whole name against a glob pattern.
///
/// ```
/// use sluice_kernel::builtins::glob::glob_match;
///
/// assert!(glob_match("*.log", "app.log"));
/// assert!(glob_match("file?.[ch]", "file1.c"));
/// assert!(!glob_match("*.*", "Makefile"));
/// ```
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    // Position after the last `*` and the name index it is currently absorbing up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p + 1, n));
                p += 1;
                continue;
            }
            Some('?') => Some(1),
            Some('[') => match match_class(&pattern[p..], name[n]) {
                Some((true, len)) => Some(len),
                Some((false, _)) => None,
                None => (name[n] == '[').then_some(1),
            },
            Some('\\') if p + 1 < pattern.len() => (pattern[p + 1] == name[n]).then_some(2),
            Some(&c) => (c == name[n]).then_some(1),
            None => None,
        };

        match (step, backtrack) {
            (Some(consumed), _) => {
                p += consumed;
                n += 1;
            }
            (None, Some((star_p, star_n))) => {
                p = star_p;
                n = star_n + 1;
                backtrack = Some((star_p, star_n + 1));
            }
            (None, None) => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Match one character against a `[...]` class at the start of `class`.
///
/// Returns whether `ch` is in the class and how many pattern characters the
/// class spans, or `None` for an unterminated `[`.
fn match_class(class: &[char], ch: char) -> Option<(bool, usize)> {
    let mut i = 1;
    let negate = matches!(class.get(i), Some('!' | '^'));
    if negate {
        i += 1;
    }

    let start = i;
    let mut matched = false;
    loop {
        let c = *class.get(i)?;
        if c == ']' && i > start {
            i += 1;
            break;
        }
        match (class.get(i + 1), class.get(i + 2)) {
            (Some('-'), Some(&end)) if end != ']' => {
                matched |= (c..=end).contains(&ch);
                i += 3;
            }
            _ => {
                matched |= c == ch;
                i += 1;
            }
        }
    }

    Some((matched != negate, i))
}
