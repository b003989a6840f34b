use crate::model::CardModel;

/// The only fragment a failed load leaves in the container.
pub const FALLBACK_FRAGMENT: &str = "<p>Failed to load data. Please try again later.</p>";

/// Escape a value for use as text content or inside a double-quoted
/// attribute value.
pub fn escape_text(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render one card. The markup shape matches the original shelter page so
/// its stylesheet keeps applying; every interpolated value is escaped, field
/// values are text content and never raw markup.
pub fn card_fragment(card: &CardModel) -> String {
    let id_attr = card
        .fragment_id
        .as_deref()
        .map(|id| format!(" id=\"{}\"", escape_text(id)))
        .unwrap_or_default();

    format!(
        "<div class=\"card\"{id_attr}>\
<div class=\"card-content\">\
<h3>{name}</h3>\
<p>Email: {email}</p>\
<p>Phone: {phone}</p>\
<p>Address: {address}</p>\
</div>\
</div>\n<br />\n",
        name = escape_text(&card.name),
        email = escape_text(&card.email),
        phone = escape_text(&card.phone),
        address = escape_text(&card.address),
    )
}
