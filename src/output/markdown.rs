//! Artifact rendering
//!
//! Posts are stored twice: as markdown (metadata header plus the body
//! converted with `html2md`) and as a minimal standalone HTML page.

use crate::state::ExtractedPost;
use std::path::{Component, Path};

/// Stylesheet location, relative to the working directory
pub const STYLESHEET: &str = "assets/css/essay-styles.css";

/// Renders the markdown artifact of a post
///
/// # Format
///
/// ```text
/// # <title>
///
/// ## <subtitle>        (only when present)
///
/// **<date as shown>**
///
/// **Likes:** <n>
///
/// <body>
/// ```
pub fn render_markdown(post: &ExtractedPost) -> String {
    let mut md = format!("# {}\n\n", post.title);
    if !post.subtitle.is_empty() {
        md.push_str(&format!("## {}\n\n", post.subtitle));
    }
    md.push_str(&format!("**{}**\n\n", post.raw_date));
    md.push_str(&format!("**Likes:** {}\n\n", post.like_count));
    md.push_str(html2md::parse_html(&post.content_html).trim());
    md.push('\n');
    md
}

/// Renders the HTML artifact of a post
///
/// # Arguments
///
/// * `post` - The extracted post
/// * `css_href` - Link to the shared stylesheet, relative to the HTML file
pub fn render_html(post: &ExtractedPost, css_href: &str) -> String {
    let mut header = format!("<h1>{}</h1>\n", escape_html(&post.title));
    if !post.subtitle.is_empty() {
        header.push_str(&format!("    <h2>{}</h2>\n", escape_html(&post.subtitle)));
    }
    header.push_str(&format!(
        "    <p><strong>{}</strong></p>\n    <p><strong>Likes:</strong> {}</p>\n",
        escape_html(&post.raw_date),
        escape_html(&post.like_count)
    ));

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Substack Post</title>
    <link rel="stylesheet" href="{css_href}">
</head>
<body>
    <main class="markdown-content">
    {header}    {content}
    </main>
</body>
</html>"#,
        content = post.content_html
    )
}

/// Path from `html_dir` to the shared stylesheet
///
/// Relative directories are walked back to the working directory. Absolute
/// directories outside it get an absolute link.
pub fn stylesheet_href(html_dir: &Path) -> String {
    let relative = if html_dir.is_absolute() {
        match std::env::current_dir()
            .ok()
            .and_then(|cwd| html_dir.strip_prefix(&cwd).ok().map(Path::to_path_buf))
        {
            Some(rel) => rel,
            None => {
                let root = std::env::current_dir().unwrap_or_default();
                return root.join(STYLESHEET).to_string_lossy().replace('\\', "/");
            }
        }
    } else {
        html_dir.to_path_buf()
    };

    let mut depth: usize = 0;
    for component in relative.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    format!("{}{}", "../".repeat(depth), STYLESHEET)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
