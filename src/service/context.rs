//! Per-request browse parameters.

/// A raw request parameter: a single value, or a list from repeated `key[]=` entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s.as_str()),
            ParamValue::List(_) => None,
        }
    }
}

/// Parameters that steer the browse action itself and never become filters.
pub const RESERVED_KEYS: &[&str] = &["controller", "action", "page", "search", "update", "format"];

#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    /// In request order, one entry per key.
    pub params: Vec<(String, ParamValue)>,
    /// 1-based.
    pub page: u32,
    pub search: Option<String>,
    pub wants_js: bool,
    /// Client asked for a list replacement rather than the full fragment.
    pub update: bool,
}

impl RequestContext {
    /// Build from decoded query pairs. `key[]` entries collect into a list under `key`;
    /// a repeated plain key keeps its last value but its first position.
    pub fn from_pairs(pairs: Vec<(String, String)>, wants_js: bool) -> Self {
        let mut params: Vec<(String, ParamValue)> = Vec::new();
        for (key, value) in pairs {
            let (name, is_list) = match key.strip_suffix("[]") {
                Some(stripped) => (stripped.to_string(), true),
                None => (key, false),
            };
            match params.iter().position(|(k, _)| *k == name) {
                Some(i) => {
                    let slot = &mut params[i].1;
                    match (slot, is_list) {
                        (ParamValue::List(items), true) => items.push(value),
                        (slot, true) => *slot = ParamValue::List(vec![value]),
                        (slot, false) => *slot = ParamValue::Single(value),
                    }
                }
                None if is_list => params.push((name, ParamValue::List(vec![value]))),
                None => params.push((name, ParamValue::Single(value))),
            }
        }

        let single = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.as_single())
                .map(str::to_string)
        };
        let page = parse_page(single("page").as_deref());
        let search = single("search");
        let update = single("update").is_some();

        RequestContext {
            params,
            page,
            search,
            wants_js,
            update,
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

/// Page number; absent, unparsable or zero means 1.
pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn collects_bracketed_keys_into_lists() {
        let ctx = RequestContext::from_pairs(
            pairs(&[("id[]", "1"), ("name", "a"), ("id[]", "2"), ("id[]", "3")]),
            false,
        );
        assert_eq!(
            ctx.params,
            vec![
                ("id".to_string(), ParamValue::List(vec!["1".into(), "2".into(), "3".into()])),
                ("name".to_string(), ParamValue::Single("a".into())),
            ]
        );
    }

    #[test]
    fn repeated_plain_key_keeps_last_value() {
        let ctx = RequestContext::from_pairs(pairs(&[("name", "a"), ("name", "b")]), false);
        assert_eq!(ctx.param("name"), Some(&ParamValue::Single("b".into())));
    }

    #[test]
    fn page_defaults_to_one() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-3")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("4")), 4);
    }

    #[test]
    fn reads_search_page_and_update() {
        let ctx = RequestContext::from_pairs(pairs(&[("search", "jo"), ("page", "2"), ("update", "1")]), true);
        assert_eq!(ctx.search.as_deref(), Some("jo"));
        assert_eq!(ctx.page, 2);
        assert!(ctx.update);
        assert!(ctx.wants_js);
    }
}
