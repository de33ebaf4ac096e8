use pulldown_cmark::{html, Options, Parser};
use rocket_dyn_templates::tera::{self, Tera, Value};
use std::collections::HashMap;

pub(crate) fn register_custom_functions(tera: &mut Tera) {
    tera.register_filter("markdown", markdown_filter);
    tera.register_filter("stars", stars_filter);
}

fn markdown_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let input = tera::from_value::<String>(value.clone())?;
    Ok(Value::String(markdown(&input)))
}

/// Renders event descriptions. Raw HTML is escaped.
pub(crate) fn markdown(input: &str) -> String {
    const OPTIONS: Options = Options::empty()
        .union(Options::ENABLE_TABLES)
        .union(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(input, OPTIONS).map(|event| match event {
        pulldown_cmark::Event::Html(html) | pulldown_cmark::Event::InlineHtml(html) => {
            pulldown_cmark::Event::Text(html)
        }
        event => event,
    });
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

fn stars_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let score = tera::from_value::<u8>(value.clone())?;
    Ok(Value::String(stars(score)))
}

/// `3` becomes `★★★☆☆`.
pub(crate) fn stars(score: u8) -> String {
    let filled = usize::from(score.min(5));
    "★".repeat(filled) + &"☆".repeat(5 - filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_markdown() {
        assert_eq!(
            "<p>Bring <strong>cheese</strong></p>\n",
            markdown("Bring **cheese**")
        );
    }

    #[test]
    fn escapes_raw_html() {
        let html = markdown("<script>alert(1)</script>");
        assert!(!html.contains("<script>"), "{html}");
    }

    #[test]
    fn renders_stars() {
        assert_eq!("★★★☆☆", stars(3));
        assert_eq!("★★★★★", stars(9));
    }
}
