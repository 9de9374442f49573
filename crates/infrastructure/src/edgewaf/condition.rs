//! The only portable way to carry an IP set in this rule language is an
//! inline membership expression: `${http.request.ip} in ['a','b',…]`.

const CONDITION_PREFIX: &str = "${http.request.ip} in";

/// Extract the IP list embedded in a managed rule condition. Conditions
/// in any other shape yield an empty list.
pub fn parse_ip_condition(condition: &str) -> Vec<String> {
    let Some(rest) = condition.strip_prefix(CONDITION_PREFIX) else {
        return Vec::new();
    };
    let list = rest.trim().trim_start_matches('[').trim_end_matches(']');
    list.split(',')
        .map(|item| item.trim().trim_matches('\'').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Render an IP list back into the membership expression.
pub fn render_ip_condition(ips: &[String]) -> String {
    let items: Vec<String> = ips.iter().map(|ip| format!("'{ip}'")).collect();
    format!("{CONDITION_PREFIX} [{}]", items.join(","))
}
