//! Asset list files.
//!
//! One path per line. Surrounding whitespace is trimmed; blank lines and
//! lines starting with `#` are skipped.

/// Parse the contents of an asset list.
pub fn parse_asset_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_comments_and_blanks() {
        let text = "# startup assets\n\n  textures/logo.png  \n\t# audio\nsounds/click.wav\r\n   \n";
        assert_eq!(
            parse_asset_list(text),
            vec!["textures/logo.png", "sounds/click.wav"]
        );
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_asset_list("").is_empty());
        assert!(parse_asset_list("# nothing here\n").is_empty());
    }
}
