//! Filter/order/paging parameters for the hosted table API.
//!
//! Renders PostgREST-style query strings, e.g.
//! `model_id=eq.<uuid>&order=position.asc&limit=50`.

use std::fmt::Display;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    params: Vec<(String, String)>,
    filter_count: usize,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the returned columns (`select=id,name`)
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    fn filter(mut self, column: &str, op: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("{}.{}", op, value)));
        self.filter_count += 1;
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "neq", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lte", value)
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(column, "is", "null")
    }

    /// Case-insensitive substring match
    pub fn ilike_contains(self, column: &str, needle: &str) -> Self {
        let pattern = format!("*{}*", sanitize_literal(needle));
        self.filter(column, "ilike", pattern)
    }

    pub fn in_list<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let list = in_list_literal(values);
        self.filter(column, "in", list)
    }

    /// Rows matching any of the `(column, operator, value)` conditions
    pub fn or_any(mut self, conditions: &[(&str, &str, String)]) -> Self {
        let joined = conditions
            .iter()
            .map(|(column, op, value)| format!("{}.{}.{}", column, op, value))
            .collect::<Vec<_>>()
            .join(",");
        self.params.push(("or".to_string(), format!("({})", joined)));
        self.filter_count += 1;
        self
    }

    /// Append an ordering column; repeated calls add tie-breakers
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let term = format!("{}.{}", column, if ascending { "asc" } else { "desc" });
        match self.params.iter_mut().find(|(k, _)| k == "order") {
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(&term);
            }
            None => self.params.push(("order".to_string(), term)),
        }
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.params.push(("offset".to_string(), offset.to_string()));
        self
    }

    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.params.push(("on_conflict".to_string(), columns.to_string()));
        self
    }

    /// True when at least one row filter is present
    pub fn has_filters(&self) -> bool {
        self.filter_count > 0
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Percent-encoded `k=v&k=v` form, stable for identical builder calls
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// `(a,b,c)` literal for `in.` filters, double-quoting every element
pub fn in_list_literal<I, V>(values: I) -> String
where
    I: IntoIterator<Item = V>,
    V: Display,
{
    let items = values
        .into_iter()
        .map(|v| format!("\"{}\"", v.to_string().replace('"', "")))
        .collect::<Vec<_>>()
        .join(",");
    format!("({})", items)
}

/// Strip characters that carry meaning inside filter expressions
pub fn sanitize_literal(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '*' | '%' | ',' | '(' | ')' | '"' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_filters_in_call_order() {
        let q = TableQuery::new()
            .eq("model_id", "abc")
            .order("position", true)
            .limit(10);
        assert_eq!(q.to_query_string(), "model_id=eq.abc&order=position.asc&limit=10");
        assert!(q.has_filters());
    }

    #[test]
    fn test_order_tie_breakers_merge() {
        let q = TableQuery::new().order("created_at", false).order("id", true);
        assert_eq!(q.params(), &[("order".to_string(), "created_at.desc,id.asc".to_string())]);
        assert!(!q.has_filters());
    }

    #[test]
    fn test_in_list_and_or() {
        let q = TableQuery::new()
            .in_list("agency_id", ["a", "b"])
            .or_any(&[("client_id", "eq", "x".to_string()), ("model_user_id", "eq", "x".to_string())]);
        assert_eq!(q.params()[0].1, "in.(\"a\",\"b\")");
        assert_eq!(q.params()[1], ("or".to_string(), "(client_id.eq.x,model_user_id.eq.x)".to_string()));
    }

    #[test]
    fn test_ilike_strips_wildcards() {
        let q = TableQuery::new().ilike_contains("city", " Mum*bai,) ");
        assert_eq!(q.params()[0].1, "ilike.*Mumbai*");
    }
}
