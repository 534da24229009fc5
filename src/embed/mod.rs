//! Embedded static resources.
//!
//! # Module Structure
//!
//! - `template` - Template types for typed variable injection
//! - `build` - Build-time templates (index.html shell, style injector)
//! - `serve` - Dev server templates (hotreload.js)
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{HOTRELOAD_JS, HotreloadVars};
//!
//! let js = HOTRELOAD_JS.render(&HotreloadVars { ws_port: 35729 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod build {
    use super::{Template, TemplateVars};
    use crate::transform::ClassMap;

    /// Variables for the built-in index.html shell.
    pub struct ShellVars<'a> {
        pub title: &'a str,
    }

    impl TemplateVars for ShellVars<'_> {
        fn apply(&self, content: &str) -> String {
            content.replace("__PW_TITLE__", &crate::utils::html::escape(self.title))
        }
    }

    /// Document shell used when the project has no template.
    pub const INDEX_HTML: Template<ShellVars<'static>> =
        Template::new(include_str!("build/index.html"));

    /// Variables for style_injector.js.
    pub struct StyleInjectorVars<'a> {
        pub module_id: &'a str,
        pub css: &'a str,
        pub class_map: Option<&'a ClassMap>,
    }

    impl TemplateVars for StyleInjectorVars<'_> {
        fn apply(&self, content: &str) -> String {
            let class_map = self
                .class_map
                .and_then(|map| serde_json::to_string(map).ok())
                .unwrap_or_else(|| "{}".into());
            // CSS last: it is the only value that may contain placeholder text
            content
                .replace("__PW_MODULE_ID__", &json_string(self.module_id))
                .replace("__PW_CLASS_MAP__", &class_map)
                .replace("__PW_CSS__", &json_string(self.css))
        }
    }

    /// Development stylesheet module: inserts or replaces a keyed `<style>`.
    pub const STYLE_INJECTOR_JS: Template<StyleInjectorVars<'static>> =
        Template::new(include_str!("build/style_injector.js"));

    fn json_string(s: &str) -> String {
        serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
    }
}

pub mod serve {
    use super::{Template, TemplateVars};

    /// Variables for hotreload.js.
    pub struct HotreloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for HotreloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__PW_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Live-reload client with WebSocket port injection.
    pub const HOTRELOAD_JS: Template<HotreloadVars> =
        Template::new(include_str!("serve/hotreload.js"));

    /// Inline `<script>` tag carrying the live-reload client.
    pub fn hotreload_tag(ws_port: u16) -> String {
        format!(
            "<script data-pw-hotreload>{}</script>",
            HOTRELOAD_JS.render(&HotreloadVars { ws_port })
        )
    }
}
