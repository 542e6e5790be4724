//! Small helpers for building human-readable error messages.

/// Computes the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut prev = row[0];
        row[0] = i + 1;

        for (j, cb) in b.iter().enumerate() {
            let substitution = if ca == cb { prev } else { prev + 1 };
            prev = row[j + 1];
            row[j + 1] = substitution.min(prev + 1).min(row[j] + 1);
        }
    }

    row[b.len()]
}

/// Produces a list of suggested alternatives for a (probably mistyped) input.
///
/// Candidates within half the length of the longer string are kept, ordered
/// first by ascending edit distance and then lexicographically.
pub fn suggestion_list(input: &str, options: &[String]) -> Vec<String> {
    let input_threshold = input.chars().count() / 2;

    let mut suggestions: Vec<(usize, &String)> = options
        .iter()
        .filter_map(|option| {
            let distance = levenshtein(input, option);
            let threshold = input_threshold.max(option.chars().count() / 2).max(1);
            (distance <= threshold).then_some((distance, option))
        })
        .collect();

    suggestions.sort_by(|(da, a), (db, b)| da.cmp(db).then_with(|| a.cmp(b)));
    suggestions.into_iter().map(|(_, s)| s.clone()).collect()
}

/// Transforms a string slice like `["A", "B", "C"]` into `A, B, or C`.
///
/// If `quoted` is true, every item is surrounded by double quotes. At most
/// `max_length` items are rendered; the rest are dropped.
pub fn or_list(items: &[String], max_length: usize, quoted: bool) -> String {
    if items.is_empty() {
        return String::new();
    }

    let items = &items[..items.len().min(max_length)];
    let num_items = items.len();

    let write_item = |s: &mut String, item: &str| {
        if quoted {
            s.push('"');
            s.push_str(item);
            s.push('"');
        } else {
            s.push_str(item);
        }
    };

    let mut s = String::new();
    write_item(&mut s, &items[0]);

    for (i, item) in items.iter().enumerate().skip(1) {
        if num_items > 2 {
            s.push_str(", ");
        } else {
            s.push(' ');
        }
        if i == num_items - 1 {
            s.push_str("or ");
        }
        write_item(&mut s, item);
    }

    s
}
