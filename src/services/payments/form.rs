use std::collections::BTreeMap;

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Minimal page that posts `fields` to `action` as soon as it loads
pub fn render_autosubmit_form(action: &str, fields: &BTreeMap<String, String>) -> String {
    let inputs = fields
        .iter()
        .map(|(name, value)| {
            format!(
                r#"    <input type="hidden" name="{}" value="{}">"#,
                escape_html(name),
                escape_html(value)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Redirecting to payment</title></head>
<body onload="document.forms[0].submit()">
  <form method="post" action="{}">
{}
    <noscript><button type="submit">Continue to payment</button></noscript>
  </form>
</body>
</html>
"#,
        escape_html(action),
        inputs
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_escaped() {
        let mut fields = BTreeMap::new();
        fields.insert("firstname".to_string(), "\"><script>x</script>".to_string());

        let html = render_autosubmit_form("https://test.payu.in/_payment", &fields);

        assert!(html.contains(r#"action="https://test.payu.in/_payment""#));
        assert!(html.contains("&quot;&gt;&lt;script&gt;"));
        assert!(!html.contains("<script>x"));
    }
}
