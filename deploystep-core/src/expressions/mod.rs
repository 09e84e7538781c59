mod template;

pub use template::{parse_template, Segment, Template, TemplateError};

use crate::types::Variables;

/// Renders expressions against the orchestration context.
///
/// Implementations must be side-effect free; the core may render the same
/// expression any number of times.
pub trait ExpressionRenderer: Send + Sync {
    fn render(&self, expr: &str) -> String;
}

/// Substitutes `${name}` placeholders from a variable map in a single pass.
///
/// Unknown placeholders and malformed templates are left verbatim.
#[derive(Debug, Clone, Default)]
pub struct VariableRenderer {
    variables: Variables,
}

impl VariableRenderer {
    pub fn new(variables: Variables) -> Self {
        Self { variables }
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }
}

impl ExpressionRenderer for VariableRenderer {
    fn render(&self, expr: &str) -> String {
        let Ok(template) = parse_template(expr) else {
            return expr.to_string();
        };
        if template.is_literal() {
            return expr.to_string();
        }

        let mut out = String::with_capacity(expr.len());
        for seg in &template.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Variable(name) => match self.variables.get(name) {
                    Some(v) => out.push_str(v),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        out
    }
}

/// Renders every expression unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRenderer;

impl ExpressionRenderer for IdentityRenderer {
    fn render(&self, expr: &str) -> String {
        expr.to_string()
    }
}
