// src/utils/html.rs

/// Sanitizes staff-entered rich text (course, class and exam descriptions).
///
/// Whitelist-based: safe formatting tags such as `<b>` and `<p>` survive,
/// `<script>` and `<iframe>` are removed with their content, and event
/// handler attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
