use super::snake_case;

/// Comparison operator of a filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
    Contains,
    StartsWith,
    EndsWith,
}

impl FilterOp {
    /// Bracket form (`filter[f][gte]`) and operator form (`filter[f][operator]=>=`)
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "eq" | "=" => FilterOp::Eq,
            "ne" | "!=" => FilterOp::Ne,
            "gt" | ">" => FilterOp::Gt,
            "lt" | "<" => FilterOp::Lt,
            "gte" | ">=" => FilterOp::Gte,
            "lte" | "<=" => FilterOp::Lte,
            "like" => FilterOp::Like,
            "contains" => FilterOp::Contains,
            "starts_with" => FilterOp::StartsWith,
            "ends_with" => FilterOp::EndsWith,
            _ => return None,
        })
    }

    /// LIKE pattern for the pattern operators, `None` for comparisons
    pub fn pattern(self, value: &str) -> Option<String> {
        match self {
            FilterOp::Like | FilterOp::Contains => Some(format!("%{}%", value)),
            FilterOp::StartsWith => Some(format!("{}%", value)),
            FilterOp::EndsWith => Some(format!("%{}", value)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Compare { op: FilterOp, value: String },
    In(Vec<String>),
    Range { from: Option<String>, to: Option<String> },
}

/// Parsed list parameters
#[derive(Clone, Debug, PartialEq)]
pub struct ListParams {
    pub with: Vec<String>,
    pub filters: Vec<(String, Filter)>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub all: bool,
    pub page: u64,
    pub per_page: u64,
}

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

impl Default for ListParams {
    fn default() -> Self {
        Self {
            with: Vec::new(),
            filters: Vec::new(),
            search: None,
            sort: None,
            all: false,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Everything given for one field before it is turned into filters
#[derive(Default)]
struct Pending {
    field: String,
    eq: Option<String>,
    list: Vec<String>,
    ops: Vec<(FilterOp, String)>,
    from: Option<String>,
    to: Option<String>,
    operator: Option<String>,
    value: Option<String>,
}

impl ListParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut params = ListParams::default();
        let mut pending: Vec<Pending> = Vec::new();

        for (key, value) in pairs {
            match key.as_str() {
                "with" => params.with.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| s.split('.').map(snake_case).collect::<Vec<_>>().join(".")),
                ),
                "search" if !value.trim().is_empty() => params.search = Some(value.trim().to_string()),
                "sort" if !value.trim().is_empty() => params.sort = Some(value.trim().to_string()),
                "all" => params.all = matches!(value.as_str(), "true" | "1"),
                "page" => params.page = value.parse().unwrap_or(1).max(1),
                "per_page" => {
                    params.per_page = value
                        .parse()
                        .unwrap_or(DEFAULT_PER_PAGE)
                        .clamp(1, MAX_PER_PAGE)
                }
                _ => {
                    if let Some((field, modifier)) = parse_filter_key(key) {
                        let entry = match pending.iter().position(|p| p.field == field) {
                            Some(i) => &mut pending[i],
                            None => {
                                pending.push(Pending { field: field.clone(), ..Default::default() });
                                let last = pending.len() - 1;
                                &mut pending[last]
                            }
                        };
                        entry.push(modifier.as_deref(), value);
                    }
                }
            }
        }

        for p in pending {
            p.finish(&mut params.filters);
        }
        params
    }

    pub fn filter(&self, field: &str) -> Option<&Filter> {
        self.filters.iter().find(|(f, _)| f == field).map(|(_, f)| f)
    }
}

impl Pending {
    fn push(&mut self, modifier: Option<&str>, value: &str) {
        let value = value.to_string();
        match modifier {
            None => self.eq = Some(value),
            // `filter[f][]=a` or `filter[f][0]=a`
            Some("") => self.list.push(value),
            Some(m) if m.chars().all(|c| c.is_ascii_digit()) => self.list.push(value),
            Some("from") => self.from = Some(value),
            Some("to") => self.to = Some(value),
            Some("operator") => self.operator = Some(value),
            Some("value") => self.value = Some(value),
            Some(m) => match FilterOp::parse(m) {
                Some(op) => self.ops.push((op, value)),
                None => tracing::debug!("Ignoring unknown filter operator {} on {}", m, self.field),
            },
        }
    }

    fn finish(self, out: &mut Vec<(String, Filter)>) {
        let field = self.field;
        if let Some(value) = self.eq {
            out.push((field.clone(), Filter::Compare { op: FilterOp::Eq, value }));
        }
        if !self.list.is_empty() {
            out.push((field.clone(), Filter::In(self.list)));
        }
        if self.from.is_some() || self.to.is_some() {
            out.push((field.clone(), Filter::Range { from: self.from, to: self.to }));
        }
        if let Some(value) = self.value {
            let op = self
                .operator
                .as_deref()
                .and_then(FilterOp::parse)
                .unwrap_or(FilterOp::Eq);
            out.push((field.clone(), Filter::Compare { op, value }));
        }
        for (op, value) in self.ops {
            out.push((field.clone(), Filter::Compare { op, value }));
        }
    }
}

/// `filter[a.b][gte]` -> (`a.b`, Some(`gte`)), `filter[a]` -> (`a`, None)
fn parse_filter_key(key: &str) -> Option<(String, Option<String>)> {
    let rest = key.strip_prefix("filter[")?;
    let (field, tail) = rest.split_once(']')?;
    if field.is_empty() {
        return None;
    }
    let field = match field.split_once('.') {
        Some((rel, col)) => format!("{}.{}", snake_case(rel), col),
        None => field.to_string(),
    };
    if tail.is_empty() {
        return Some((field, None));
    }
    let modifier = tail.strip_prefix('[')?.strip_suffix(']')?;
    Some((field, Some(modifier.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_parse_basic() {
        let params = ListParams::from_pairs(&pairs(&[
            ("with", "classroom, academicYear"),
            ("search", " budi "),
            ("sort", "-name"),
            ("page", "3"),
            ("per_page", "500"),
        ]));
        assert_eq!(params.with, vec!["classroom", "academic_year"]);
        assert_eq!(params.search.as_deref(), Some("budi"));
        assert_eq!(params.sort.as_deref(), Some("-name"));
        assert_eq!(params.page, 3);
        assert_eq!(params.per_page, MAX_PER_PAGE);
        assert!(!params.all);
    }

    #[test]
    fn test_parse_filters() {
        let params = ListParams::from_pairs(&pairs(&[
            ("filter[class_id]", "4"),
            ("filter[status][]", "hadir"),
            ("filter[status][]", "telat"),
            ("filter[date][from]", "2024-01-01"),
            ("filter[date][to]", "2024-01-31"),
            ("filter[id][gte]", "10"),
            ("filter[name][operator]", "starts_with"),
            ("filter[name][value]", "Bu"),
            ("filter[academicYear.name]", "2024/2025"),
            ("filter[x][bogus]", "1"),
        ]));

        assert_eq!(
            params.filter("class_id"),
            Some(&Filter::Compare { op: FilterOp::Eq, value: "4".into() })
        );
        assert_eq!(
            params.filter("status"),
            Some(&Filter::In(vec!["hadir".into(), "telat".into()]))
        );
        assert_eq!(
            params.filter("date"),
            Some(&Filter::Range {
                from: Some("2024-01-01".into()),
                to: Some("2024-01-31".into())
            })
        );
        assert_eq!(
            params.filter("id"),
            Some(&Filter::Compare { op: FilterOp::Gte, value: "10".into() })
        );
        assert_eq!(
            params.filter("name"),
            Some(&Filter::Compare { op: FilterOp::StartsWith, value: "Bu".into() })
        );
        assert!(params.filter("academic_year.name").is_some());
        assert!(params.filter("x").is_none());
    }

    #[test]
    fn test_patterns() {
        assert_eq!(FilterOp::Like.pattern("a").as_deref(), Some("%a%"));
        assert_eq!(FilterOp::StartsWith.pattern("a").as_deref(), Some("a%"));
        assert_eq!(FilterOp::EndsWith.pattern("a").as_deref(), Some("%a"));
        assert_eq!(FilterOp::Gt.pattern("a"), None);
    }

    #[test]
    fn test_filter_key() {
        assert_eq!(parse_filter_key("filter[a]"), Some(("a".into(), None)));
        assert_eq!(parse_filter_key("filter[a][]"), Some(("a".into(), Some("".into()))));
        assert_eq!(parse_filter_key("filter[]"), None);
        assert_eq!(parse_filter_key("sort"), None);
    }
}
