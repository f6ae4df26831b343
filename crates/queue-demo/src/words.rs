/// Uppercases the first character, leaves the rest untouched.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Deals `items` out to `n` sources, one at a time, so every source keeps
/// the relative order of its items.
pub fn split_round_robin(items: Vec<String>, n: usize) -> Vec<Vec<String>> {
    let mut sources = vec![Vec::new(); n.max(1)];
    let len = sources.len();
    for (i, item) in items.into_iter().enumerate() {
        sources[i % len].push(item);
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::{capitalize, split_round_robin};

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("apple"), "Apple");
        assert_eq!(capitalize("Capsicum"), "Capsicum");
        assert_eq!(capitalize("émile"), "Émile");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_split_round_robin() {
        let items = ["a", "b", "c", "d", "e"].map(String::from).to_vec();
        assert_eq!(
            split_round_robin(items, 2),
            vec![vec!["a", "c", "e"], vec!["b", "d"]]
        );
    }

    #[test]
    fn test_split_more_sources_than_items() {
        let sources = split_round_robin(vec!["x".to_string()], 3);
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0], vec!["x"]);
        assert!(sources[1].is_empty() && sources[2].is_empty());
    }
}
