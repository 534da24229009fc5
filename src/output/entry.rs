//! Entry document (`index.html`) assembly.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::json;

use crate::utils::html::{escape_attr, inject_before};

/// Final URLs to place in the document, in dependency order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPlan {
    /// Specifier to URL, emitted as `<script type="importmap">`.
    pub import_map: BTreeMap<String, String>,
    pub stylesheets: Vec<String>,
    pub preloads: Vec<String>,
    pub entries: Vec<String>,
}

/// Inject the plan into `template`: links before `</head>`, entry scripts
/// before `</body>`.
pub fn render(template: &str, plan: &DocumentPlan) -> Vec<u8> {
    let mut head = String::new();

    if !plan.import_map.is_empty() {
        let map = json!({ "imports": plan.import_map });
        let map = serde_json::to_string_pretty(&map).unwrap_or_default();
        // `</script>` inside a URL would end the element early
        let map = map.replace("</", "<\\/");
        let _ = write!(head, "<script type=\"importmap\">\n{map}\n</script>\n");
    }
    for href in &plan.stylesheets {
        let _ = writeln!(head, "<link rel=\"stylesheet\" href=\"{}\">", escape_attr(href));
    }
    for href in &plan.preloads {
        let _ = writeln!(head, "<link rel=\"modulepreload\" href=\"{}\">", escape_attr(href));
    }

    let mut body = String::new();
    for src in &plan.entries {
        let _ = writeln!(body, "<script type=\"module\" src=\"{}\"></script>", escape_attr(src));
    }

    let document = inject_before(template.as_bytes(), "</head>", &head);
    inject_before(&document, "</body>", &body)
}
