//! HTML rendering of directory listings.
//!
//! The page loads `/assets/index.css` and `/assets/player.js`. Audio rows
//! carry `data-*` attributes read by the player.

use crate::listing::{DirEntry, Listing};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use quick_xml::escape::escape;
use std::fmt::Write;

/// Characters escaped inside one URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\\')
    .add(b'^')
    .add(b'|')
    .add(b'[')
    .add(b']')
    .add(b'\'');

/// Builds `<prefix>/<encoded rel>`, encoding each segment separately.
pub fn url(prefix: &str, rel: &str) -> String {
    let encoded = rel
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", prefix.trim_end_matches('/'), encoded)
}

/// File name without its extension, shown as the track title.
fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(i) => &name[..i],
    }
}

/// Renders the full listing page.
///
/// `background` is the image file name picked for this path, served from
/// `/backgrounds`.
pub fn render_listing(listing: &Listing, background: Option<&str>) -> String {
    let title = if listing.path.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", listing.path)
    };

    let mut html = String::with_capacity(4096 + listing.entries.len() * 512);
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>PMOFiles - {title}</title>
<link rel="stylesheet" href="/assets/index.css">
</head>
"#,
        title = escape(&title)
    );

    match background {
        Some(image) => {
            let _ = writeln!(
                html,
                r#"<body style="background-image: url('{}')">"#,
                escape(url("/backgrounds", image))
            );
        }
        None => html.push_str("<body>\n"),
    }

    let _ = write!(
        html,
        r#"<header>
<h1>{title}</h1>
<div class="toolbar">
<button id="theme-btn" type="button">Mode sombre</button>
<button id="auto-btn" type="button">Lecture auto : Oui</button>
<button id="shuffle-btn" type="button">Aléatoire : Non</button>
<button id="loop-btn" type="button">🔁 Non</button>
</div>
</header>
<main>
<table class="listing">
<tbody>
"#,
        title = escape(&title)
    );

    if let Some(parent) = &listing.parent {
        let _ = writeln!(
            html,
            r#"<tr class="parent-row"><td colspan="3"><a href="{}">⬆ Dossier parent</a></td></tr>"#,
            escape(url("", parent))
        );
    }

    for entry in &listing.entries {
        if entry.is_dir() {
            render_dir_row(&mut html, entry);
        } else {
            render_file_row(&mut html, entry);
        }
    }

    html.push_str(
        r#"</tbody>
</table>
</main>
<div id="player-container" class="player" style="display: none">
<img id="cover" alt="">
<div class="track">
<div id="song-title"></div>
<div id="album-name"></div>
</div>
<button id="prev-btn" type="button">⏮</button>
<audio id="audio-player" controls preload="none"></audio>
<button id="next-btn" type="button">⏭</button>
</div>
<script src="/assets/player.js"></script>
</body>
</html>
"#,
    );

    html
}

fn render_dir_row(html: &mut String, entry: &DirEntry) {
    let _ = writeln!(
        html,
        r#"<tr class="dir-row"><td>📁 <a href="{link}">{name}</a></td><td>{count} élément(s)</td><td><a href="{zip}">zip</a></td></tr>"#,
        link = escape(url("", &entry.path)),
        name = escape(&entry.name),
        count = entry.child_count.unwrap_or(0),
        zip = escape(url("/download/zip", &entry.path)),
    );
}

fn render_file_row(html: &mut String, entry: &DirEntry) {
    let download = escape(url("/download/file", &entry.path));
    let size = entry.human_size().unwrap_or_default();

    if entry.is_audio {
        let stream = escape(url("/stream", &entry.path));
        let cover = escape(url("/cover", &entry.path));
        let title = escape(stem(&entry.name));
        let album = escape(entry.album.as_deref().unwrap_or(""));
        let _ = writeln!(
            html,
            r#"<tr class="file-row" data-mp3="1" data-src="{stream}" data-cover="{cover}" data-name="{title}" data-album="{album}"><td>🎵 <a href="{stream}" class="play">{name}</a> <span class="album">{album}</span></td><td>{size}</td><td><a href="{download}">télécharger</a></td></tr>"#,
            name = escape(&entry.name),
        );
    } else {
        let _ = writeln!(
            html,
            r#"<tr class="file-row" data-mp3="0"><td>📄 <a href="{download}">{name}</a></td><td>{size}</td><td><a href="{download}">télécharger</a></td></tr>"#,
            name = escape(&entry.name),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::EntryKind;

    #[test]
    fn test_text_and_attributes_are_escaped() {
        let listing = Listing {
            path: "Tom & Jerry's".to_string(),
            name: "Tom & Jerry's".to_string(),
            parent: Some(String::new()),
            entries: vec![DirEntry {
                name: "say \"hi\".mp3".to_string(),
                path: "Tom & Jerry's/say \"hi\".mp3".to_string(),
                kind: EntryKind::File,
                size: Some(10),
                child_count: None,
                is_audio: true,
                album: Some("<b>Live</b>".to_string()),
            }],
        };

        let html = render_listing(&listing, None);
        assert!(html.contains("<h1>/Tom &amp; Jerry&apos;s</h1>"));
        assert!(html.contains(r#"data-name="say &quot;hi&quot;""#));
        assert!(html.contains(r#"data-album="&lt;b&gt;Live&lt;/b&gt;""#));
        assert!(!html.contains("<b>Live</b>"));
    }

    #[test]
    fn test_url_encodes_segments() {
        assert_eq!(url("/stream", "Music/Best of #1/a b.mp3"), "/stream/Music/Best%20of%20%231/a%20b.mp3");
        assert_eq!(url("", "Été"), "/%C3%89t%C3%A9");
        assert_eq!(url("", ""), "/");
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("a.mp3"), "a");
        assert_eq!(stem("archive.tar.gz"), "archive.tar");
        assert_eq!(stem(".hidden"), ".hidden");
        assert_eq!(stem("README"), "README");
    }

    #[test]
    fn test_render_listing() {
        let listing = Listing {
            path: "Music".to_string(),
            name: "Music".to_string(),
            parent: Some(String::new()),
            entries: vec![
                DirEntry {
                    name: "Disco".to_string(),
                    path: "Music/Disco".to_string(),
                    kind: EntryKind::Directory,
                    size: None,
                    child_count: Some(1),
                    is_audio: false,
                    album: None,
                },
                DirEntry {
                    name: "<a>.mp3".to_string(),
                    path: "Music/<a>.mp3".to_string(),
                    kind: EntryKind::File,
                    size: Some(2048),
                    child_count: None,
                    is_audio: true,
                    album: Some("Hits".to_string()),
                },
            ],
        };

        let html = render_listing(&listing, Some("disco.jpg"));
        assert!(html.contains(r#"href="/download/zip/Music/Disco""#));
        assert!(html.contains("1 élément(s)"));
        assert!(html.contains(r#"data-src="/stream/Music/%3Ca%3E.mp3""#));
        assert!(html.contains("&lt;a&gt;.mp3"));
        assert!(!html.contains("<a>.mp3"));
        assert!(html.contains("2.0KB"));
        assert!(html.contains("/backgrounds/disco.jpg"));
        assert!(html.contains("Dossier parent"));
    }
}
