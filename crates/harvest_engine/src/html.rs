use scraper::Html;

/// Text content of an HTML fragment: tags dropped, entities decoded.
pub fn strip_html(input: &str) -> String {
    if !input.contains(['<', '&']) {
        return input.to_string();
    }
    Html::parse_fragment(input).root_element().text().collect()
}
