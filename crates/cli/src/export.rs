use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chat::ChatOrchestrator;
use colored::Colorize;
use tokio::fs;
use uibuilder_core::{CodeBlock, Message};

/// Open `session_id` and write every generated code block into `dir`.
pub async fn export_session(chat: &ChatOrchestrator, session_id: &str, dir: &Path) -> Result<()> {
    chat.select_session(session_id).await?;
    let messages = chat.messages().await;

    let written = write_code_blocks(&messages, dir).await?;
    if written.is_empty() {
        println!("{}", "No generated files in this session.".bright_black());
        return Ok(());
    }

    for path in &written {
        println!("{} {}", "wrote".green(), path.display());
    }
    Ok(())
}

/// Write the code blocks of assistant messages, oldest first.
///
/// Only the final component of a block's filename is used. Repeated names
/// get a numeric suffix so later revisions do not overwrite earlier ones.
pub async fn write_code_blocks(messages: &[Message], dir: &Path) -> Result<Vec<PathBuf>> {
    let blocks: Vec<CodeBlock> = messages
        .iter()
        .filter(|m| m.is_assistant())
        .flat_map(|m| m.effective_code_blocks())
        .collect();

    if blocks.is_empty() {
        return Ok(Vec::new());
    }

    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut taken = HashSet::new();
    let mut written = Vec::with_capacity(blocks.len());
    for block in blocks {
        let name = unique_name(&safe_file_name(&block), &mut taken);
        let path = dir.join(name);
        fs::write(&path, &block.code)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!(path = %path.display(), language = %block.language, "Exported code block");
        written.push(path);
    }

    Ok(written)
}

fn safe_file_name(block: &CodeBlock) -> String {
    Path::new(&block.filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("component.{}", block.language))
}

fn unique_name(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };

    let mut n = 2;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
