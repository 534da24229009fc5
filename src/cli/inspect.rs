//! `inspect` command: the effective pipeline for a mode, as JSON.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::config::ProjectConfig;
use crate::core::{BuildMode, ModePolicy, SourceKind};
use crate::transform::{self, TransformChain};

#[derive(Debug, Serialize)]
struct Inspection<'a> {
    mode: BuildMode,
    policy: &'static ModePolicy,
    entries: BTreeMap<&'a str, String>,
    aliases: BTreeMap<&'a str, String>,
    chains: Vec<TransformChain>,
}

fn inspection(config: &ProjectConfig, mode: BuildMode) -> Inspection<'_> {
    let relative = |path: &std::path::Path| {
        crate::utils::path::to_slash(&config.root_relative(path))
    };
    Inspection {
        mode,
        policy: mode.policy(),
        entries: config
            .build
            .entries
            .iter()
            .map(|(name, path)| (name.as_str(), relative(path.as_path())))
            .collect(),
        aliases: config
            .resolve
            .aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), relative(target.as_path())))
            .collect(),
        chains: SourceKind::ALL
            .into_iter()
            .map(|kind| transform::select(kind, mode, &config.assets))
            .collect(),
    }
}

pub fn inspect(config: &ProjectConfig, mode: BuildMode) -> Result<()> {
    let json = serde_json::to_string_pretty(&inspection(config, mode))?;
    println!("{json}");
    Ok(())
}
