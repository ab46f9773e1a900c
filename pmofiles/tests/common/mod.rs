//! Fixtures partagées par les tests d'intégration

#![allow(dead_code)]

use image::{ImageBuffer, Rgba};
use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::tag::{Tag, TagType};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, sans padding : 417 octets par trame
const MPEG_FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
const MPEG_FRAME_LEN: usize = 417;

/// Arborescence de test :
///
/// ```text
/// <tmp>/
///   outside/secret.txt
///   data/                      <- racine partagée
///     Music/
///       a.mp3                  (2048 octets, sans tag)
///       notes.txt
///       My Song.mp3            (ID3v2 : album "Hits" + pochette PNG 4x4)
///       broken.flac            (contenu invalide)
///       Disco/
///         track.mp3
/// ```
pub struct Fixture {
    pub tmp: TempDir,
    pub root: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("data");
        let music = root.join("Music");
        fs::create_dir_all(music.join("Disco")).unwrap();
        fs::create_dir_all(tmp.path().join("outside")).unwrap();

        fs::write(tmp.path().join("outside/secret.txt"), b"top secret").unwrap();
        fs::write(music.join("a.mp3"), vec![0u8; 2048]).unwrap();
        fs::write(music.join("notes.txt"), b"liner notes").unwrap();
        fs::write(music.join("broken.flac"), b"this is not a flac stream").unwrap();
        fs::write(music.join("My Song.mp3"), tagged_mp3("Hits", Some(&png(4, 4)))).unwrap();
        fs::write(music.join("Disco/track.mp3"), tagged_mp3("Disco Fever", None)).unwrap();

        Self { tmp, root }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn outside(&self) -> PathBuf {
        self.tmp.path().join("outside")
    }
}

/// Image PNG unie
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(width, height, Rgba([200, 30, 30, 255]));
    let mut buffer = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

/// Fichier MP3 minimal : tag ID3v2 suivi de quelques trames MPEG muettes
pub fn tagged_mp3(album: &str, cover_png: Option<&[u8]>) -> Vec<u8> {
    let mut tag = Tag::new(TagType::Id3v2);
    tag.set_album(album.to_string());
    if let Some(data) = cover_png {
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::Png),
            None,
            data.to_vec(),
        ));
    }

    let mut bytes = Vec::new();
    tag.dump_to(&mut bytes, WriteOptions::default()).unwrap();
    bytes.extend(mpeg_frames(16));
    bytes
}

pub fn mpeg_frames(count: usize) -> Vec<u8> {
    let mut frames = Vec::with_capacity(count * MPEG_FRAME_LEN);
    for _ in 0..count {
        frames.extend_from_slice(&MPEG_FRAME_HEADER);
        frames.extend(std::iter::repeat_n(0u8, MPEG_FRAME_LEN - MPEG_FRAME_HEADER.len()));
    }
    frames
}

/// Tous les fichiers sous `dir`, en chemins relatifs `/`
pub fn relative_files(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(base, &path, out);
            } else {
                let rel = path.strip_prefix(base).unwrap();
                let parts: Vec<_> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                out.push(parts.join("/"));
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
