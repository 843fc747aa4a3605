// src/utils/html.rs

/// Sanitizes admin-authored free text (titles, question text, grade comments)
/// before it is stored.
///
/// Whitelist-based: harmless markup such as `<b>` survives, `<script>` and
/// event-handler attributes are dropped together with their content.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
