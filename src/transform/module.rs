//! `scope-class-names`: CSS modules via lightningcss.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use lightningcss::css_modules::{self, CssModuleExports, CssModuleReference};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

use super::{TransformContext, Unit};

/// Local class name to scoped class list, sorted for stable output.
pub type ClassMap = BTreeMap<String, String>;

/// Rename every local class and record the mapping on the unit.
pub fn scope_class_names(unit: &mut Unit, ctx: &TransformContext<'_>) -> Result<()> {
    // The scoped names hash the filename, so it must not depend on the machine
    let filename = ctx.display_path(&unit.source);

    // The stylesheet borrows the unit's bytes until it is printed
    let (code, exports) = {
        let options = ParserOptions {
            filename,
            css_modules: Some(css_modules::Config::default()),
            ..ParserOptions::default()
        };
        let stylesheet = match StyleSheet::parse(unit.text()?, options) {
            Ok(sheet) => sheet,
            Err(e) => bail!("{e}"),
        };
        match stylesheet.to_css(PrinterOptions::default()) {
            Ok(result) => (result.code, result.exports),
            Err(e) => bail!("{e}"),
        }
    };

    let class_map = match exports {
        Some(exports) => class_map(exports)?,
        None => ClassMap::new(),
    };
    unit.bytes = code.into_bytes();
    unit.class_map = Some(class_map);
    Ok(())
}

fn class_map(exports: CssModuleExports) -> Result<ClassMap> {
    let mut map = ClassMap::new();
    for (local, export) in exports {
        let mut classes = vec![export.name];
        for reference in export.composes {
            match reference {
                CssModuleReference::Local { name } | CssModuleReference::Global { name } => {
                    classes.push(name);
                }
                CssModuleReference::Dependency { name, specifier } => {
                    bail!("`composes: {name} from \"{specifier}\"` is not supported");
                }
            }
        }
        map.insert(local, classes.join(" "));
    }
    Ok(map)
}
