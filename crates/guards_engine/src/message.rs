//! Violation message rendering.

use crate::HandlerDescriptor;
use guards_core::{GuardDeclaration, Value};

/// Renders a descriptor's message template for one failed check.
///
/// Placeholders that name nothing known are kept verbatim, so a typo in a
/// template shows up in the message instead of disappearing.
pub fn render_message(
    descriptor: &HandlerDescriptor,
    declaration: &GuardDeclaration,
    value: &Value,
) -> String {
    let template = descriptor.message();
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let name = &after[..close];
        match lookup(name, descriptor, declaration, value) {
            Some(replacement) => out.push_str(&replacement),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

fn lookup(
    name: &str,
    descriptor: &HandlerDescriptor,
    declaration: &GuardDeclaration,
    value: &Value,
) -> Option<String> {
    match name {
        "value" => Some(value.to_string()),
        "site" => Some(declaration.site.to_string()),
        "kind" => Some(declaration.kind.to_string()),
        _ => {
            let param = match name.parse::<usize>() {
                Ok(index) => descriptor.params().get(index)?.as_str(),
                Err(_) => name,
            };
            declaration.args.get(param).map(ToString::to_string)
        }
    }
}
