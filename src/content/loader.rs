//! Post loader - reads a post and its images from disk

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::Post;
use crate::error::Result;

/// Markdown file name inside a post directory
pub const POST_FILE: &str = "knowledge.md";

/// Image folder name, relative to the post
pub const IMAGES_DIR: &str = "images";

/// Load a post from a markdown file or a post directory
///
/// A directory must hold `knowledge.md`. Files under `images/` next to the
/// markdown are attached under their relative path (`images/plot.png`),
/// which is how post markdown references them.
pub fn load_post<P: AsRef<Path>>(path: P) -> Result<Post> {
    let path = path.as_ref();
    let (markdown_path, post_dir) = if path.is_dir() {
        (path.join(POST_FILE), path.to_path_buf())
    } else {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (path.to_path_buf(), dir)
    };

    let text = fs::read_to_string(&markdown_path)?;
    let mut post = Post::from_markdown(text)?;

    let images_dir = post_dir.join(IMAGES_DIR);
    if images_dir.is_dir() {
        for entry in WalkDir::new(&images_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let file = entry.path();
            if !file.is_file() {
                continue;
            }
            let Some(name) = reference_name(&post_dir, file) else {
                continue;
            };
            match fs::read(file) {
                Ok(data) => post.insert_image(name, data),
                Err(e) => tracing::warn!("Failed to read image {:?}: {}", file, e),
            }
        }
    }

    tracing::debug!(
        "Loaded post {:?} with {} images",
        markdown_path,
        post.images().len()
    );
    Ok(post)
}

/// Path of `file` relative to `base`, with `/` separators
fn reference_name(base: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
