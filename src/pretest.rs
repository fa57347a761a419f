//! Synthetic unsorted files for trying the sorter out.
//!
//! Fills a directory with one file per common category, spread over the root
//! and a few subfolders, plus a small zip archive. The output is
//! deterministic and existing files are never overwritten.

use crate::conflict::resolve_name;
use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// Files written by [`populate`]: name, signature bytes, filler length.
const SAMPLES: &[(&str, &[u8], usize)] = &[
    ("image1.jpg", b"\xff\xd8\xff\xe0", 1024),
    ("video1.mp4", b"\x00\x00\x00\x18ftypmp42", 2048),
    ("document1.pdf", b"%PDF-", 512),
    ("music1.mp3", b"ID3", 1024),
    ("script1.py", b"print('Hello, World!')\n", 256),
    ("font1.ttf", b"\x00\x01\x00\x00", 512),
    ("sheet1.csv", b"name,size\n", 128),
    ("unknown.xyz", b"", 128),
];

/// Where the n-th sample goes: the root or one of three subfolders.
fn placement(dir: &Path, index: usize) -> PathBuf {
    match index % 4 {
        0 => dir.to_path_buf(),
        n => dir.join(format!("subfolder_{n}")),
    }
}

/// Populates `dir` (created if missing) and returns the created files.
///
/// # Examples
///
/// ```no_run
/// let created = autosort::pretest::populate(std::path::Path::new("/tmp/unsorted"))?;
/// println!("created {} files", created.len());
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn populate(dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut created = Vec::new();

    for (index, (name, signature, filler)) in SAMPLES.iter().enumerate() {
        let mut content = signature.to_vec();
        content.extend((0..*filler).map(|i| (i % 251) as u8));
        created.push(write_new(&placement(dir, index), name, &content)?);
    }

    let archive = write_new(dir, "archive1.zip", &sample_zip()?)?;
    created.push(archive);

    tracing::info!("pretest files created in {}", dir.display());
    Ok(created)
}

/// Writes `content` under `name` in `dir`, numbering the name if it is taken.
fn write_new(dir: &Path, name: &str, content: &[u8]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let name = resolve_name(OsStr::new(name), |candidate| {
        dir.join(candidate).symlink_metadata().is_ok()
    });
    let path = dir.join(name);
    let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    file.write_all(content)?;
    Ok(path)
}

fn sample_zip() -> io::Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(io::Cursor::new(Vec::new()));
    let members: [(&str, &[u8]); 2] = [
        ("report.txt", b"quarterly numbers\n"),
        ("photos/holiday.png", b"\x89PNG\r\n\x1a\n"),
    ];
    for (name, content) in members {
        zip.start_file(name, SimpleFileOptions::default())
            .map_err(io::Error::other)?;
        zip.write_all(content)?;
    }
    Ok(zip.finish().map_err(io::Error::other)?.into_inner())
}
