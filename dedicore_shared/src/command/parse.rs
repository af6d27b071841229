/// Splits a command line into tokens, respecting double quotes.
///
/// Quotes are never part of a token. Whitespace inside quotes is kept
/// verbatim; outside quotes it separates tokens. An unterminated quote runs to
/// the end of the line.
pub fn parse_arguments(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quoted_args() {
        let tokens = parse_arguments(r#"foo "bar baz" qux"#);
        assert_eq!(tokens, vec!["foo", "bar baz", "qux"]);
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let tokens = parse_arguments(r#"foo "unterminated"#);
        assert_eq!(tokens, vec!["foo", "unterminated"]);

        let tokens = parse_arguments(r#"say "hello   there"#);
        assert_eq!(tokens, vec!["say", "hello   there"]);
    }

    #[test]
    fn collapses_unquoted_whitespace() {
        assert!(parse_arguments("").is_empty());
        assert!(parse_arguments(" \t  ").is_empty());
        assert_eq!(parse_arguments("  a \t b  "), vec!["a", "b"]);
    }

    #[test]
    fn quotes_join_adjacent_text() {
        assert_eq!(parse_arguments(r#"ab"c d"e"#), vec!["abc de"]);
    }
}
