use std::collections::BTreeSet;

use crate::expressions::ExpressionRenderer;

/// Render explicit host expressions into a de-duplicated, ordered host list.
///
/// A rendered value may itself hold a comma-separated list.
pub fn resolve_hosts(renderer: &dyn ExpressionRenderer, exprs: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut hosts = Vec::new();
    for expr in exprs {
        let rendered = renderer.render(expr);
        for host in rendered.split(',').map(str::trim).filter(|h| !h.is_empty()) {
            if seen.insert(host.to_string()) {
                hosts.push(host.to_string());
            }
        }
    }
    hosts
}
