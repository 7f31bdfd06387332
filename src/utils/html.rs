// src/utils/html.rs

/// Sanitizes author-supplied rich text (question text, answer text,
/// descriptions) before it is stored.
///
/// Whitelist-based: formatting tags such as <b> or <p> survive, while
/// <script> (with its content), <iframe> and event-handler attributes are
/// dropped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_formatting_and_strips_scripts() {
        let cleaned = clean_html("<p>What is <b>2+2</b>?<script>alert(1)</script></p>");
        assert_eq!(cleaned, "<p>What is <b>2+2</b>?</p>");
    }

    #[test]
    fn strips_event_handlers() {
        let cleaned = clean_html(r#"<img src="a.png" onerror="steal()">"#);
        assert!(!cleaned.contains("onerror"));
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(clean_html("Pick the right answer"), "Pick the right answer");
    }
}
